use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::scheduler::{Scheduler, Task};
use crate::session::{GameSession, Phase, Rules, Signal, MIN_LIGHT_INTERVAL};

/// Flips the session signal at randomized intervals while a round is in play.
///
/// Each flip re-arms `Task::LightFlip` with a fresh draw, so the schedule keeps
/// itself alive until the owning phase ends and the scheduler drops the task.
#[derive(Debug)]
pub struct LightScheduler {
    rng: StdRng,
    min_ms: u64,
    max_ms: u64,
}

impl LightScheduler {
    pub fn new(rules: &Rules) -> Self {
        let rng = match rules.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        // a zero interval would re-arm at the current instant and never let
        // `advance` finish, so unvalidated rules are floored here
        let floor = MIN_LIGHT_INTERVAL.as_millis() as u64;
        let min_ms = (rules.light_min.as_millis() as u64).max(floor);
        let max_ms = (rules.light_max.as_millis() as u64).max(min_ms);
        Self {
            rng,
            min_ms,
            max_ms,
        }
    }

    /// Uniform draw from `[light_min, light_max)`, never shorter than 1ms
    pub fn next_interval(&mut self) -> Duration {
        let ms = if self.max_ms > self.min_ms {
            self.rng.gen_range(self.min_ms..self.max_ms)
        } else {
            self.min_ms
        };
        Duration::from_millis(ms)
    }

    /// Begin a fresh schedule on entry to `Playing`
    pub fn start(&mut self, session: &mut GameSession, scheduler: &mut Scheduler) {
        session.signal = Signal::Green;
        let delay = self.next_interval();
        scheduler.schedule(Task::LightFlip, delay);
        log::debug!("light schedule armed, first flip in {}ms", delay.as_millis());
    }

    /// Handle a `Task::LightFlip` firing. Returns the new signal, or `None` when
    /// the firing is stale.
    pub fn on_flip(
        &mut self,
        session: &mut GameSession,
        scheduler: &mut Scheduler,
    ) -> Option<Signal> {
        if session.phase != Phase::Playing {
            log::trace!("ignoring light flip in {}", session.phase);
            return None;
        }
        let signal = session.signal.toggled();
        self.set(session, scheduler, signal);
        Some(signal)
    }

    /// Set the signal outright and restart the interval from now.
    pub fn force(
        &mut self,
        session: &mut GameSession,
        scheduler: &mut Scheduler,
        signal: Signal,
    ) -> bool {
        if session.phase != Phase::Playing {
            return false;
        }
        self.set(session, scheduler, signal);
        true
    }

    fn set(&mut self, session: &mut GameSession, scheduler: &mut Scheduler, signal: Signal) {
        session.signal = signal;
        let delay = self.next_interval();
        scheduler.schedule(Task::LightFlip, delay);
        log::debug!(
            "light is {} at {}ms, next flip in {}ms",
            signal,
            scheduler.now().as_millis(),
            delay.as_millis()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> (Rules, LightScheduler) {
        let rules = Rules {
            seed: Some(seed),
            ..Rules::default()
        };
        let lights = LightScheduler::new(&rules);
        (rules, lights)
    }

    #[test]
    fn test_intervals_within_range() {
        let (_, mut lights) = seeded(7);
        for _ in 0..1000 {
            let d = lights.next_interval();
            assert!(d >= Duration::from_millis(3000));
            assert!(d < Duration::from_millis(6000));
        }
    }

    #[test]
    fn test_sub_millisecond_intervals_are_floored() {
        for (min, max) in [
            (Duration::ZERO, Duration::ZERO),
            (Duration::ZERO, Duration::from_millis(1)),
            (Duration::from_micros(200), Duration::from_micros(900)),
        ] {
            let mut lights = LightScheduler::new(&Rules {
                light_min: min,
                light_max: max,
                seed: Some(1),
                ..Rules::default()
            });
            for _ in 0..50 {
                assert_eq!(lights.next_interval(), Duration::from_millis(1));
            }
        }
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let (_, mut a) = seeded(42);
        let (_, mut b) = seeded(42);
        let xs: Vec<Duration> = (0..20).map(|_| a.next_interval()).collect();
        let ys: Vec<Duration> = (0..20).map(|_| b.next_interval()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_degenerate_range_uses_min() {
        let rules = Rules {
            light_min: Duration::from_millis(500),
            light_max: Duration::from_millis(500),
            ..Rules::default()
        };
        let mut lights = LightScheduler::new(&rules);
        assert_eq!(lights.next_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_each_flip_toggles_and_rearms() {
        let (rules, mut lights) = seeded(3);
        let mut session = GameSession::new(&rules);
        let mut scheduler = Scheduler::new();
        session.phase = Phase::Playing;

        lights.start(&mut session, &mut scheduler);
        assert_eq!(session.signal, Signal::Green);

        let mut previous = session.signal;
        for _ in 0..10 {
            let fired = scheduler.pop_due(Duration::from_secs(3600));
            assert_eq!(fired, Some(Task::LightFlip));
            let signal = lights.on_flip(&mut session, &mut scheduler).unwrap();
            assert_ne!(signal, previous);
            assert!(scheduler.is_pending(Task::LightFlip));
            previous = signal;
        }
    }

    #[test]
    fn test_flip_outside_playing_is_stale() {
        let (rules, mut lights) = seeded(3);
        let mut session = GameSession::new(&rules);
        let mut scheduler = Scheduler::new();
        session.phase = Phase::Won;

        assert_eq!(lights.on_flip(&mut session, &mut scheduler), None);
        assert_eq!(session.signal, Signal::Green);
        assert!(!scheduler.is_pending(Task::LightFlip));
    }

    #[test]
    fn test_force_only_while_playing() {
        let (rules, mut lights) = seeded(9);
        let mut session = GameSession::new(&rules);
        let mut scheduler = Scheduler::new();

        assert!(!lights.force(&mut session, &mut scheduler, Signal::Red));
        assert_eq!(session.signal, Signal::Green);

        session.phase = Phase::Playing;
        assert!(lights.force(&mut session, &mut scheduler, Signal::Red));
        assert_eq!(session.signal, Signal::Red);
        assert!(scheduler.due_at(Task::LightFlip).unwrap() >= Duration::from_millis(3000));
    }
}
