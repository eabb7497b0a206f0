use std::time::Duration;

use thiserror::Error;

/// Shortest gap between two light flips
pub const MIN_LIGHT_INTERVAL: Duration = Duration::from_millis(1);

/// Top-level lifecycle stage of a play-through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Phase {
    Waiting,
    Countdown,
    Playing,
    Won,
    Eliminated,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Won | Phase::Eliminated)
    }

    /// Whether the engine may move from `self` to `next` on its own, i.e. without
    /// an explicit start/reset command.
    pub fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Countdown, Phase::Playing)
                | (Phase::Playing, Phase::Won)
                | (Phase::Playing, Phase::Eliminated)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Signal {
    Green,
    Red,
}

impl Signal {
    pub fn toggled(self) -> Self {
        match self {
            Signal::Green => Signal::Red,
            Signal::Red => Signal::Green,
        }
    }
}

/// Why a round ended in `Phase::Eliminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum EliminationReason {
    RedLight,
    TimeUp,
}

/// Track geometry in track-local units. `x` is lateral, `z` is longitudinal
/// with the finish line at the far end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub lateral_min: f64,
    pub lateral_max: f64,
    pub longitudinal_min: f64,
    pub longitudinal_max: f64,
    pub spawn_z: f64,
    pub finish_z: f64,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            lateral_min: -10.0,
            lateral_max: 10.0,
            longitudinal_min: -5.0,
            longitudinal_max: 25.0,
            spawn_z: 0.0,
            finish_z: 25.0,
        }
    }
}

impl Track {
    pub fn length(&self) -> f64 {
        self.finish_z - self.spawn_z
    }

    /// Normalized distance travelled toward the finish line, clamped to [0, 1]
    pub fn progress(&self, z: f64) -> f64 {
        let length = self.length();
        if length <= 0.0 {
            return 1.0;
        }
        ((z - self.spawn_z) / length).clamp(0.0, 1.0)
    }
}

/// Gameplay constants consumed by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    pub countdown_secs: u32,
    pub time_limit_secs: u32,
    /// Units per second along the input direction
    pub speed: f64,
    /// Per-tick velocity multiplier
    pub damping: f64,
    pub light_min: Duration,
    pub light_max: Duration,
    pub grace: Duration,
    pub track: Track,
    pub seed: Option<u64>,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            countdown_secs: 3,
            time_limit_secs: 60,
            speed: 8.0,
            damping: 0.9,
            light_min: Duration::from_millis(3000),
            light_max: Duration::from_millis(6000),
            grace: Duration::from_millis(100),
            track: Track::default(),
            seed: None,
        }
    }
}

/// A `Rules` value the engine refuses to run with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RulesError {
    #[error("time limit must be at least 1s")]
    NoTimeLimit,

    #[error("speed must be positive, got {0}")]
    Speed(f64),

    #[error("damping must be in (0, 1], got {0}")]
    Damping(f64),

    #[error("light interval [{min:?}, {max:?}) must be non-empty and start at 1ms or later")]
    LightInterval { min: Duration, max: Duration },
}

impl Rules {
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.time_limit_secs == 0 {
            return Err(RulesError::NoTimeLimit);
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(RulesError::Speed(self.speed));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(RulesError::Damping(self.damping));
        }
        if self.light_min < MIN_LIGHT_INTERVAL || self.light_min >= self.light_max {
            return Err(RulesError::LightInterval {
                min: self.light_min,
                max: self.light_max,
            });
        }
        Ok(())
    }
}

/// The single mutable record of a play-through, exclusively owned by `Game`
#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    pub phase: Phase,
    pub signal: Signal,
    pub countdown: u32,
    pub time_remaining: u32,
    pub longitudinal_position: f64,
    pub elimination_reason: Option<EliminationReason>,
    track: Track,
}

impl GameSession {
    pub fn new(rules: &Rules) -> Self {
        Self {
            phase: Phase::Waiting,
            signal: Signal::Green,
            countdown: rules.countdown_secs,
            time_remaining: rules.time_limit_secs,
            longitudinal_position: rules.track.spawn_z,
            elimination_reason: None,
            track: rules.track,
        }
    }

    /// Restore every per-round field; the caller decides the phase.
    pub fn reset_round(&mut self, rules: &Rules) {
        self.signal = Signal::Green;
        self.countdown = rules.countdown_secs;
        self.time_remaining = rules.time_limit_secs;
        self.longitudinal_position = rules.track.spawn_z;
        self.elimination_reason = None;
    }

    pub fn progress(&self) -> f64 {
        self.track.progress(self.longitudinal_position)
    }
}

/// Read-only view of the session handed to the presentation layer each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub signal: Signal,
    pub countdown: u32,
    pub time_remaining: u32,
    pub progress: f64,
    pub lateral_position: f64,
    pub longitudinal_position: f64,
    pub is_moving: bool,
    pub elimination_reason: Option<EliminationReason>,
}
