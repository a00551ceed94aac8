/// Engine-wide error type.
///
/// Every variant carries a short machine-readable code (see `code()`)
/// and a human message. The engine never catches its own errors;
/// callers decide. Silent refusals (out-of-bounds moves, projectiles
/// spawned off-board) are policy, not errors, and do not appear here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid type: {0}")]
    InvalidType(String),

    #[error("coordinates [{row},{column}] are out of the board boundaries ({width}x{height})")]
    OutOfBoardBound {
        row: usize,
        column: usize,
        width: usize,
        height: usize,
    },

    #[error("item '{0}' is not movable")]
    NotMovable(String),

    #[error("level {0} is not associated with any board")]
    InvalidLevel(usize),

    #[error("no player is attached to the game")]
    PlayerUndefined,

    #[error("not enough space in inventory (max {max}, used {used}, item needs {needed})")]
    NotEnoughSpace {
        max: usize,
        used: usize,
        needed: usize,
    },

    #[error("item '{0}' is not pickable")]
    NotPickable(String),

    #[error("there is no item named '{0}' in the inventory")]
    NoItemByThatName(String),

    #[error("board sanity check failed: {0}")]
    SanityCheck(String),

    #[error("unknown configuration section '{0}'")]
    UnknownSection(String),

    #[error("unknown menu category '{0}'")]
    UnknownMenuCategory(String),

    #[error("section '{0}' has no origin file; a filename is required to save it")]
    NoOriginFile(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short stable code, usable for matching without string-comparing
    /// the display message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidType(_) => "invalid_type",
            Error::OutOfBoardBound { .. } => "out_of_board_bound",
            Error::NotMovable(_) => "not_movable",
            Error::InvalidLevel(_) => "invalid_level",
            Error::PlayerUndefined => "player_undefined",
            Error::NotEnoughSpace { .. } => "not_enough_space",
            Error::NotPickable(_) => "not_pickable",
            Error::NoItemByThatName(_) => "no_item_by_that_name",
            Error::SanityCheck(_) => "sanity_check",
            Error::UnknownSection(_) => "unknown_section",
            Error::UnknownMenuCategory(_) => "unknown_menu_category",
            Error::NoOriginFile(_) => "no_origin_file",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::PlayerUndefined.code(), "player_undefined");
        assert_eq!(
            Error::OutOfBoardBound { row: 9, column: 0, width: 5, height: 5 }.code(),
            "out_of_board_bound"
        );
        assert_eq!(Error::NoItemByThatName("x".into()).code(), "no_item_by_that_name");
    }

    #[test]
    fn messages_mention_offending_values() {
        let e = Error::OutOfBoardBound { row: 9, column: 2, width: 5, height: 5 };
        let msg = e.to_string();
        assert!(msg.contains("[9,2]"));
        assert!(msg.contains("5x5"));
    }
}
