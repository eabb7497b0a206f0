use std::collections::BTreeSet;
use std::ops::{Add, AddAssign, Mul, MulAssign};
use std::time::Duration;

use crate::session::{Rules, Signal, Track};

/// Logical input direction, independent of the physical key that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::Display)]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
}

/// Track-plane vector: `x` lateral, `z` longitudinal (forward is +z)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub z: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, z: 0.0 };

    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.z / len)
        } else {
            Self::ZERO
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.z * rhs)
    }
}

impl MulAssign<f64> for Vec2 {
    fn mul_assign(&mut self, rhs: f64) {
        self.x *= rhs;
        self.z *= rhs;
    }
}

/// Outcome of one integrator tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementStep {
    /// Input was requested this tick, whether or not it was applied
    pub is_moving: bool,
    pub position: Vec2,
}

/// Turns held directions into a clamped position on the track
#[derive(Debug, Clone)]
pub struct MovementIntegrator {
    held: BTreeSet<Direction>,
    velocity: Vec2,
    position: Vec2,
    is_moving: bool,
    speed: f64,
    damping: f64,
    track: Track,
}

impl MovementIntegrator {
    pub fn new(rules: &Rules) -> Self {
        Self {
            held: BTreeSet::new(),
            velocity: Vec2::ZERO,
            position: Vec2::new(0.0, rules.track.spawn_z),
            is_moving: false,
            speed: rules.speed,
            damping: rules.damping,
            track: rules.track,
        }
    }

    pub fn set_held(&mut self, direction: Direction, pressed: bool) {
        if pressed {
            self.held.insert(direction);
        } else {
            self.held.remove(&direction);
        }
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.held.contains(&direction)
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    /// Back to a standstill at the spawn point with nothing held
    pub fn reset(&mut self) {
        self.held.clear();
        self.velocity = Vec2::ZERO;
        self.position = Vec2::new(0.0, self.track.spawn_z);
        self.is_moving = false;
    }

    fn input_vector(&self) -> Vec2 {
        let mut v = Vec2::ZERO;
        for direction in &self.held {
            match direction {
                Direction::Forward => v.z += 1.0,
                Direction::Back => v.z -= 1.0,
                Direction::Left => v.x -= 1.0,
                Direction::Right => v.x += 1.0,
            }
        }
        v
    }

    /// Advance one render tick. Input only feeds velocity on green, but
    /// `is_moving` reflects it on red too so red-light motion can be detected.
    pub fn step(&mut self, signal: Signal, dt: Duration) -> MovementStep {
        let delta = self.input_vector().normalized() * (self.speed * dt.as_secs_f64());
        self.is_moving = delta.length() > 0.0;

        if signal == Signal::Green {
            self.velocity += delta;
        }
        self.velocity *= self.damping;
        self.position += self.velocity;

        self.position.x = self
            .position
            .x
            .clamp(self.track.lateral_min, self.track.lateral_max);
        self.position.z = self
            .position
            .z
            .clamp(self.track.longitudinal_min, self.track.longitudinal_max);

        MovementStep {
            is_moving: self.is_moving,
            position: self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(16);

    fn integrator() -> MovementIntegrator {
        MovementIntegrator::new(&Rules::default())
    }

    #[test]
    fn test_idle_tick_does_not_move() {
        let mut m = integrator();
        let step = m.step(Signal::Green, TICK);
        assert!(!step.is_moving);
        assert_eq!(step.position, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_forward_on_green_moves_forward() {
        let mut m = integrator();
        m.set_held(Direction::Forward, true);
        let step = m.step(Signal::Green, TICK);
        assert!(step.is_moving);
        assert!(step.position.z > 0.0);
        assert_eq!(step.position.x, 0.0);
        // 8 units/s * 16ms, damped once
        assert!((step.position.z - 8.0 * 0.016 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_diagonal_is_not_faster() {
        let mut straight = integrator();
        straight.set_held(Direction::Forward, true);
        straight.step(Signal::Green, TICK);

        let mut diagonal = integrator();
        diagonal.set_held(Direction::Forward, true);
        diagonal.set_held(Direction::Right, true);
        diagonal.step(Signal::Green, TICK);

        let (a, b) = (straight.velocity(), diagonal.velocity());
        assert!((a.length() - b.length()).abs() < 1e-12);
        assert!(b.x > 0.0 && b.z > 0.0);
    }

    #[test]
    fn test_opposite_directions_cancel() {
        let mut m = integrator();
        m.set_held(Direction::Left, true);
        m.set_held(Direction::Right, true);
        let step = m.step(Signal::Green, TICK);
        assert!(!step.is_moving);
    }

    #[test]
    fn test_red_reports_motion_without_applying_it() {
        let mut m = integrator();
        m.set_held(Direction::Forward, true);
        for _ in 0..10 {
            let step = m.step(Signal::Red, TICK);
            assert!(step.is_moving);
            assert_eq!(step.position.z, 0.0);
        }
        assert_eq!(m.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_glide_decays_after_release() {
        let mut m = integrator();
        m.set_held(Direction::Forward, true);
        for _ in 0..5 {
            m.step(Signal::Green, TICK);
        }
        m.set_held(Direction::Forward, false);

        let before = m.velocity().z;
        let step = m.step(Signal::Green, TICK);
        assert!(!step.is_moving);
        assert!((m.velocity().z - before * 0.9).abs() < 1e-12);
        // still coasting forward
        assert!(step.position.z > 0.0);
    }

    #[test]
    fn test_position_clamped_to_track() {
        let mut m = integrator();
        m.set_held(Direction::Back, true);
        m.set_held(Direction::Left, true);
        for _ in 0..500 {
            m.step(Signal::Green, Duration::from_millis(50));
        }
        assert_eq!(m.position(), Vec2::new(-10.0, -5.0));

        m.reset();
        m.set_held(Direction::Forward, true);
        m.set_held(Direction::Right, true);
        for _ in 0..500 {
            m.step(Signal::Green, Duration::from_millis(50));
        }
        assert_eq!(m.position(), Vec2::new(10.0, 25.0));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut m = integrator();
        m.set_held(Direction::Forward, true);
        m.step(Signal::Green, TICK);
        m.reset();
        assert!(!m.is_held(Direction::Forward));
        assert!(!m.is_moving());
        assert_eq!(m.velocity(), Vec2::ZERO);
        assert_eq!(m.position(), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_vec2_normalized_zero() {
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        let v = Vec2::new(3.0, 4.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-12);
    }
}
