//! Cancellable scheduled tasks on a virtual clock.
//!
//! Every delayed callback in the game (countdown, game clock, light flips and
//! elimination confirmation) lives in this table. A task has at most one due
//! time; re-arming replaces it. Each task belongs to a phase, and a phase change
//! cancels every task the new phase does not own, so a timer from a previous
//! round can never fire into the next one.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::session::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::Display)]
pub enum Task {
    CountdownTick,
    GameClockTick,
    LightFlip,
    ConfirmElimination,
}

impl Task {
    /// The phase whose lifetime bounds this task
    pub fn owner(self) -> Phase {
        match self {
            Task::CountdownTick => Phase::Countdown,
            Task::GameClockTick | Task::LightFlip | Task::ConfirmElimination => Phase::Playing,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    due: BTreeMap<Task, Duration>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Arm `task` to fire `delay` from now, superseding any pending arming.
    pub fn schedule(&mut self, task: Task, delay: Duration) {
        self.due.insert(task, self.now + delay);
    }

    pub fn cancel(&mut self, task: Task) -> bool {
        self.due.remove(&task).is_some()
    }

    pub fn is_pending(&self, task: Task) -> bool {
        self.due.contains_key(&task)
    }

    pub fn due_at(&self, task: Task) -> Option<Duration> {
        self.due.get(&task).copied()
    }

    /// Cancel every task not owned by `phase`. Returns the cancelled tasks.
    pub fn retain_owned_by(&mut self, phase: Phase) -> Vec<Task> {
        let stale: Vec<Task> = self
            .due
            .keys()
            .copied()
            .filter(|task| task.owner() != phase)
            .collect();
        for task in &stale {
            self.due.remove(task);
        }
        stale
    }

    pub fn cancel_all(&mut self) {
        self.due.clear();
    }

    /// Remove and return the earliest task due at or before `until`, moving the
    /// clock to its due time. Ties go to the task declared first.
    pub fn pop_due(&mut self, until: Duration) -> Option<Task> {
        let (task, due) = self
            .due
            .iter()
            .filter(|(_, due)| **due <= until)
            .min_by_key(|(task, due)| (**due, **task))
            .map(|(task, due)| (*task, *due))?;

        self.due.remove(&task);
        self.now = self.now.max(due);
        Some(task)
    }

    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_pop_due_in_chronological_order() {
        let mut s = Scheduler::new();
        s.schedule(Task::LightFlip, ms(300));
        s.schedule(Task::GameClockTick, ms(100));
        s.schedule(Task::ConfirmElimination, ms(200));

        let order: Vec<Task> = std::iter::from_fn(|| s.pop_due(ms(1000))).collect();
        assert_eq!(
            order,
            vec![Task::GameClockTick, Task::ConfirmElimination, Task::LightFlip]
        );
        assert_eq!(s.now(), ms(300));
    }

    #[test]
    fn test_pop_due_respects_horizon() {
        let mut s = Scheduler::new();
        s.schedule(Task::CountdownTick, ms(1000));

        assert!(s.pop_due(ms(999)).is_none());
        assert!(s.is_pending(Task::CountdownTick));

        assert_eq!(s.pop_due(ms(1000)), Some(Task::CountdownTick));
        assert_eq!(s.now(), ms(1000));
        assert!(!s.is_pending(Task::CountdownTick));
    }

    #[test]
    fn test_ties_break_by_task_order() {
        let mut s = Scheduler::new();
        s.schedule(Task::LightFlip, ms(1000));
        s.schedule(Task::GameClockTick, ms(1000));

        assert_eq!(s.pop_due(ms(1000)), Some(Task::GameClockTick));
        assert_eq!(s.pop_due(ms(1000)), Some(Task::LightFlip));
    }

    #[test]
    fn test_reschedule_replaces_due_time() {
        let mut s = Scheduler::new();
        s.schedule(Task::ConfirmElimination, ms(100));
        s.schedule(Task::ConfirmElimination, ms(50));
        assert_eq!(s.due_at(Task::ConfirmElimination), Some(ms(50)));

        // fires once, at the new time
        assert_eq!(s.pop_due(ms(200)), Some(Task::ConfirmElimination));
        assert_eq!(s.now(), ms(50));
        assert!(s.pop_due(ms(200)).is_none());
    }

    #[test]
    fn test_cancel_drops_task() {
        let mut s = Scheduler::new();
        s.schedule(Task::LightFlip, ms(4000));
        assert!(s.cancel(Task::LightFlip));
        assert!(!s.is_pending(Task::LightFlip));
        assert!(!s.cancel(Task::LightFlip));
        assert!(s.pop_due(ms(10_000)).is_none());
    }

    #[test]
    fn test_retain_owned_by_phase() {
        let mut s = Scheduler::new();
        s.schedule(Task::CountdownTick, ms(1000));
        s.schedule(Task::GameClockTick, ms(1000));
        s.schedule(Task::LightFlip, ms(3000));

        let cancelled = s.retain_owned_by(Phase::Playing);
        assert_eq!(cancelled, vec![Task::CountdownTick]);
        assert!(s.is_pending(Task::GameClockTick));
        assert!(s.is_pending(Task::LightFlip));

        let cancelled = s.retain_owned_by(Phase::Waiting);
        assert_eq!(cancelled, vec![Task::GameClockTick, Task::LightFlip]);
        assert!(s.pop_due(ms(10_000)).is_none());
    }

    #[test]
    fn test_delays_are_relative_to_virtual_now() {
        let mut s = Scheduler::new();
        s.advance_to(ms(500));
        s.schedule(Task::CountdownTick, ms(1000));
        assert_eq!(s.due_at(Task::CountdownTick), Some(ms(1500)));

        // the clock never runs backwards
        s.advance_to(ms(100));
        assert_eq!(s.now(), ms(500));
    }
}
