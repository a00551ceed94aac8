//! Boardwalk: a terminal 2D tile-based game engine.
//!
//! The engine manages a grid world where discrete items (the player,
//! NPCs, projectiles, structures, treasures, doors) occupy one cell
//! each and interact through movement, collision, pickup, activation
//! and overlap. The host program owns the loop; the engine owns the
//! rules.
//!
//! ```no_run
//! use boardwalk::{Board, BoardItem, BoardSettings, Direction, Game};
//!
//! fn main() -> boardwalk::Result<()> {
//!     let mut game = Game::new();
//!     let mut board = Board::new(BoardSettings::default())?;
//!     board.place_item(BoardItem::treasure("gold", "$", 100), 0, 1)?;
//!     game.add_board(0, board);
//!     game.set_player(BoardItem::player("hero", "@"))?;
//!     game.change_level(0)?;
//!
//!     game.move_player(Direction::Right, 1)?;
//!     game.actuate_npcs(0)?;
//!     game.actuate_projectiles(0)?;
//!     game.animate_items(0)?;
//!     game.display_board(&mut std::io::stdout())?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
pub mod ui;

pub use crate::config::ConfigStore;
pub use crate::domain::actuator::{
    Actuator, ActuatorSpec, ActuatorState, PathActuator, PatrolActuator, RandomActuator,
};
pub use crate::domain::direction::{
    Direction, EngineState, Orientation, Permission, Position,
};
pub use crate::domain::inventory::Inventory;
pub use crate::domain::item::{
    ActionCallback, BoardItem, ComplexStats, HitCallback, ItemId, ItemKind, MovableStats,
    MoverClass, ProjectileStats,
};
pub use crate::domain::particle::ParticleStats;
pub use crate::domain::vector::{distance, intersect, Vector2D};
pub use crate::error::{Error, Result};
pub use crate::sim::board::{Board, BoardSettings, Heading};
pub use crate::sim::game::Game;
pub use crate::sim::level::LoadedBoard;
pub use crate::ui::input::{read_key, Key};
pub use crate::ui::menu::{Menu, MenuEntry};
pub use crate::ui::screen::Screen;
pub use crate::ui::sprixel::{Animation, Sprixel};
