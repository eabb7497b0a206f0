use std::collections::BTreeMap;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::movement::Direction;

/// What a key means to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    Start,
    Reset,
    Quit,
}

pub fn map_key(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => {
            Some(Action::Move(Direction::Forward))
        }
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => {
            Some(Action::Move(Direction::Back))
        }
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => {
            Some(Action::Move(Direction::Left))
        }
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => {
            Some(Action::Move(Direction::Right))
        }
        KeyCode::Char(' ') | KeyCode::Enter => Some(Action::Start),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Reset),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
        _ => None,
    }
}

/// A change in the held state of one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldChange {
    pub direction: Direction,
    pub pressed: bool,
}

/// Tracks which directions are held down.
///
/// Terminals that report key releases give exact edges. The rest only send a
/// press followed by auto-repeats, so a direction is dropped once no repeat has
/// arrived within `release_after`.
#[derive(Debug, Clone)]
pub struct HoldTracker {
    release_after: Option<Duration>,
    clock: Duration,
    last_seen: BTreeMap<Direction, Duration>,
}

impl HoldTracker {
    /// `release_after = None` trusts the terminal to report every release.
    pub fn new(release_after: Option<Duration>) -> Self {
        Self {
            release_after,
            clock: Duration::ZERO,
            last_seen: BTreeMap::new(),
        }
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.last_seen.contains_key(&direction)
    }

    /// Feed a direction key event. Returns a change only on a press or release edge.
    pub fn on_key(&mut self, direction: Direction, kind: KeyEventKind) -> Option<HoldChange> {
        match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                let newly_pressed = self.last_seen.insert(direction, self.clock).is_none();
                newly_pressed.then_some(HoldChange {
                    direction,
                    pressed: true,
                })
            }
            KeyEventKind::Release => self.last_seen.remove(&direction).map(|_| HoldChange {
                direction,
                pressed: false,
            }),
        }
    }

    /// Let `dt` pass and synthesize releases for keys that went quiet.
    pub fn tick(&mut self, dt: Duration) -> Vec<HoldChange> {
        self.clock += dt;
        let Some(release_after) = self.release_after else {
            return Vec::new();
        };
        let clock = self.clock;
        let expired: Vec<Direction> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| clock.saturating_sub(**seen) >= release_after)
            .map(|(direction, _)| *direction)
            .collect();
        expired
            .into_iter()
            .map(|direction| {
                self.last_seen.remove(&direction);
                HoldChange {
                    direction,
                    pressed: false,
                }
            })
            .collect()
    }

    /// Drop every held direction, returning the releases
    pub fn release_all(&mut self) -> Vec<HoldChange> {
        std::mem::take(&mut self.last_seen)
            .into_keys()
            .map(|direction| HoldChange {
                direction,
                pressed: false,
            })
            .collect()
    }
}
