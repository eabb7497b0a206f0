use std::time::Duration;

use crate::scheduler::{Scheduler, Task};
use crate::session::{GameSession, Phase, Signal};

/// Turns motion observed during a red light into a confirmed elimination after
/// a short grace window.
#[derive(Debug, Clone)]
pub struct EliminationDetector {
    grace: Duration,
    violation_observed: bool,
}

impl EliminationDetector {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            violation_observed: false,
        }
    }

    pub fn violation_observed(&self) -> bool {
        self.violation_observed
    }

    /// Feed one integrator tick into the detector. Motion on red arms the
    /// confirmation once; later red ticks leave its deadline alone.
    pub fn observe(&mut self, signal: Signal, is_moving: bool, scheduler: &mut Scheduler) {
        match signal {
            Signal::Green => {
                if self.violation_observed || scheduler.is_pending(Task::ConfirmElimination) {
                    log::debug!("green light, dropping pending red-light violation");
                }
                self.violation_observed = false;
                scheduler.cancel(Task::ConfirmElimination);
            }
            Signal::Red if is_moving => {
                self.violation_observed = true;
                if !scheduler.is_pending(Task::ConfirmElimination) {
                    scheduler.schedule(Task::ConfirmElimination, self.grace);
                    log::debug!(
                        "moved on red at {}ms, confirming in {}ms",
                        scheduler.now().as_millis(),
                        self.grace.as_millis()
                    );
                }
            }
            Signal::Red => {}
        }
    }

    /// Decide a `Task::ConfirmElimination` firing. The violation must still
    /// stand and the light must still be red at fire time.
    pub fn confirm(&mut self, session: &GameSession) -> bool {
        let confirmed = self.violation_observed
            && session.signal == Signal::Red
            && session.phase == Phase::Playing;
        if !confirmed {
            log::trace!(
                "elimination confirmation lapsed (violation={}, signal={}, phase={})",
                self.violation_observed,
                session.signal,
                session.phase
            );
        }
        confirmed
    }

    pub fn reset(&mut self, scheduler: &mut Scheduler) {
        self.violation_observed = false;
        scheduler.cancel(Task::ConfirmElimination);
    }
}
