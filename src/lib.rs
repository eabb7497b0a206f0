// Library surface for headless/integration tests and reuse.
// The terminal front end (CLI, rendering) stays in main.rs.
pub mod app_dirs;
pub mod config;
pub mod elimination;
pub mod game;
pub mod input;
pub mod light;
pub mod movement;
pub mod runtime;
pub mod scheduler;
pub mod session;

pub use game::Game;
pub use movement::Direction;
pub use session::{EliminationReason, Phase, Rules, RulesError, Signal, Snapshot};
