use std::time::Duration;

use crate::elimination::EliminationDetector;
use crate::light::LightScheduler;
use crate::movement::{Direction, MovementIntegrator};
use crate::scheduler::{Scheduler, Task};
use crate::session::{EliminationReason, GameSession, Phase, Rules, Signal, Snapshot};

const SECOND: Duration = Duration::from_secs(1);

/// Top-level controller of one play-through.
///
/// Owns the session and every timer. Collaborators never touch the session on
/// their own initiative: they are handed the pieces they need and report back
/// through `report_position` / `report_elimination`.
#[derive(Debug)]
pub struct Game {
    rules: Rules,
    session: GameSession,
    scheduler: Scheduler,
    lights: LightScheduler,
    movement: MovementIntegrator,
    detector: EliminationDetector,
}

impl Game {
    pub fn new(rules: Rules) -> Self {
        if let Err(e) = rules.validate() {
            log::warn!("running with questionable rules: {e}");
        }
        Self {
            session: GameSession::new(&rules),
            scheduler: Scheduler::new(),
            lights: LightScheduler::new(&rules),
            movement: MovementIntegrator::new(&rules),
            detector: EliminationDetector::new(rules.grace),
            rules,
        }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn signal(&self) -> Signal {
        self.session.signal
    }

    pub fn countdown(&self) -> u32 {
        self.session.countdown
    }

    pub fn time_remaining(&self) -> u32 {
        self.session.time_remaining
    }

    pub fn progress(&self) -> f64 {
        self.session.progress()
    }

    pub fn elimination_reason(&self) -> Option<EliminationReason> {
        self.session.elimination_reason
    }

    /// Virtual time consumed by `advance` so far
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn is_pending(&self, task: Task) -> bool {
        self.scheduler.is_pending(task)
    }

    pub fn snapshot(&self) -> Snapshot {
        let position = self.movement.position();
        Snapshot {
            phase: self.session.phase,
            signal: self.session.signal,
            countdown: self.session.countdown,
            time_remaining: self.session.time_remaining,
            progress: self.session.progress(),
            lateral_position: position.x,
            longitudinal_position: self.session.longitudinal_position,
            is_moving: self.movement.is_moving(),
            elimination_reason: self.session.elimination_reason,
        }
    }

    /// Begin a new round with the countdown running. Valid from any phase.
    /// Without a countdown the round is in play immediately.
    pub fn start(&mut self) {
        self.begin_round(Phase::Countdown);
        if self.session.countdown == 0 {
            self.enter_playing();
        } else {
            self.scheduler.schedule(Task::CountdownTick, SECOND);
        }
    }

    /// Back to the idle screen with a fresh round. Valid from any phase.
    pub fn reset(&mut self) {
        self.begin_round(Phase::Waiting);
    }

    pub fn report_input_direction(&mut self, direction: Direction, pressed: bool) {
        self.movement.set_held(direction, pressed);
    }

    /// Record the player's longitudinal position. Ignored unless playing.
    pub fn report_position(&mut self, longitudinal_position: f64) -> bool {
        if self.session.phase != Phase::Playing {
            return false;
        }
        self.session.longitudinal_position = longitudinal_position;
        if self.session.progress() >= 1.0 {
            self.transition(Phase::Won);
        }
        true
    }

    /// End the round as a loss. Only the first request while playing counts.
    pub fn report_elimination(&mut self, reason: EliminationReason) -> bool {
        if self.session.phase != Phase::Playing {
            log::trace!("ignoring elimination ({}) in {}", reason, self.session.phase);
            return false;
        }
        self.session.elimination_reason = Some(reason);
        self.transition(Phase::Eliminated);
        true
    }

    /// Override the light while playing; the random schedule restarts from now.
    pub fn force_signal(&mut self, signal: Signal) -> bool {
        self.lights.force(&mut self.session, &mut self.scheduler, signal)
    }

    /// Run one render tick of `dt`: fire every timer that falls due inside the
    /// tick in order, then integrate movement if the round is in play.
    pub fn advance(&mut self, dt: Duration) {
        let until = self.scheduler.now() + dt;
        while let Some(task) = self.scheduler.pop_due(until) {
            self.fire(task);
        }
        self.scheduler.advance_to(until);

        if self.session.phase == Phase::Playing {
            self.tick_movement(dt);
        }
    }

    fn fire(&mut self, task: Task) {
        match task {
            Task::CountdownTick => self.on_countdown_tick(),
            Task::GameClockTick => self.on_game_clock_tick(),
            Task::LightFlip => {
                self.lights.on_flip(&mut self.session, &mut self.scheduler);
            }
            Task::ConfirmElimination => {
                if self.detector.confirm(&self.session) {
                    self.report_elimination(EliminationReason::RedLight);
                }
            }
        }
    }

    fn on_countdown_tick(&mut self) {
        if self.session.phase != Phase::Countdown {
            log::trace!("stale countdown tick in {}", self.session.phase);
            return;
        }
        if self.session.countdown <= 1 {
            self.session.countdown = 0;
            self.enter_playing();
        } else {
            self.session.countdown -= 1;
            self.scheduler.schedule(Task::CountdownTick, SECOND);
        }
    }

    fn on_game_clock_tick(&mut self) {
        if self.session.phase != Phase::Playing {
            log::trace!("stale game clock tick in {}", self.session.phase);
            return;
        }
        self.session.time_remaining = self.session.time_remaining.saturating_sub(1);
        if self.session.time_remaining == 0 {
            self.report_elimination(EliminationReason::TimeUp);
        } else {
            self.scheduler.schedule(Task::GameClockTick, SECOND);
        }
    }

    fn enter_playing(&mut self) {
        self.transition(Phase::Playing);
        self.session.time_remaining = self.rules.time_limit_secs;
        self.scheduler.schedule(Task::GameClockTick, SECOND);
        self.lights.start(&mut self.session, &mut self.scheduler);
    }

    fn tick_movement(&mut self, dt: Duration) {
        let signal = self.session.signal;
        let step = self.movement.step(signal, dt);
        self.detector.observe(signal, step.is_moving, &mut self.scheduler);
        self.report_position(step.position.z);
    }

    fn begin_round(&mut self, phase: Phase) {
        self.scheduler.cancel_all();
        self.session.reset_round(&self.rules);
        self.movement.reset();
        self.detector.reset(&mut self.scheduler);
        self.transition(phase);
    }

    fn transition(&mut self, to: Phase) {
        let from = self.session.phase;
        self.session.phase = to;
        let cancelled = self.scheduler.retain_owned_by(to);
        if !cancelled.is_empty() {
            log::debug!("cancelled {:?} leaving {}", cancelled, from);
        }
        match (to, self.session.elimination_reason) {
            (Phase::Eliminated, Some(reason)) => log::info!(
                "{} -> {} ({}) at {}ms, progress {:.2}",
                from,
                to,
                reason,
                self.scheduler.now().as_millis(),
                self.session.progress()
            ),
            _ => log::info!(
                "{} -> {} at {}ms",
                from,
                to,
                self.scheduler.now().as_millis()
            ),
        }
    }
}
