/// Core scalar types: positions, directions, permissions, engine state.
/// Semantics are centralized here as methods on the enums, so the rest
/// of the engine never pattern-matches on raw constants.

/// A cell coordinate. Row 0 is the top of the board; UP decreases row.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub fn new(row: usize, column: usize) -> Self {
        Position { row, column }
    }

    /// Apply a signed (row, column) delta, staying inside a
    /// `width` x `height` board. Returns None when the result would
    /// fall outside.
    pub fn offset(self, dr: i64, dc: i64, width: usize, height: usize) -> Option<Position> {
        let nr = self.row as i64 + dr;
        let nc = self.column as i64 + dc;
        if nr < 0 || nc < 0 || nr >= height as i64 || nc >= width as i64 {
            return None;
        }
        Some(Position::new(nr as usize, nc as usize))
    }
}

/// The eight movement directions plus "stay put".
///
/// The `Dr`/`Dl` prefixes read "diagonal right"/"diagonal left";
/// e.g. `DrUp` is up-and-right. Wire values are the integer constants
/// the level format uses on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    NoDir,
    Up,
    Down,
    Left,
    Right,
    DrUp,
    DrDown,
    DlUp,
    DlDown,
}

impl Direction {
    /// Signed (row, column) delta for `step` cells in this direction.
    pub fn delta(self, step: i64) -> (i64, i64) {
        match self {
            Direction::NoDir => (0, 0),
            Direction::Up => (-step, 0),
            Direction::Down => (step, 0),
            Direction::Left => (0, -step),
            Direction::Right => (0, step),
            Direction::DrUp => (-step, step),
            Direction::DrDown => (step, step),
            Direction::DlUp => (-step, -step),
            Direction::DlDown => (step, -step),
        }
    }

    /// The direction that undoes this one. Used by patrol actuators on
    /// the return leg.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::NoDir => Direction::NoDir,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::DrUp => Direction::DlDown,
            Direction::DrDown => Direction::DlUp,
            Direction::DlUp => Direction::DrDown,
            Direction::DlDown => Direction::DrUp,
        }
    }

    /// Integer constant used by the persisted level format.
    pub fn to_wire(self) -> i64 {
        match self {
            Direction::NoDir => 0,
            Direction::Up => 10,
            Direction::Down => 11,
            Direction::Left => 12,
            Direction::Right => 13,
            Direction::DrUp => 14,
            Direction::DrDown => 15,
            Direction::DlUp => 16,
            Direction::DlDown => 17,
        }
    }

    pub fn from_wire(value: i64) -> Option<Direction> {
        match value {
            0 => Some(Direction::NoDir),
            10 => Some(Direction::Up),
            11 => Some(Direction::Down),
            12 => Some(Direction::Left),
            13 => Some(Direction::Right),
            14 => Some(Direction::DrUp),
            15 => Some(Direction::DrDown),
            16 => Some(Direction::DlUp),
            17 => Some(Direction::DlDown),
            _ => None,
        }
    }

    /// Name used by the persisted level format ("UP", "DRDOWN", ...).
    pub fn as_name(self) -> &'static str {
        match self {
            Direction::NoDir => "NO_DIR",
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::DrUp => "DRUP",
            Direction::DrDown => "DRDOWN",
            Direction::DlUp => "DLUP",
            Direction::DlDown => "DLDOWN",
        }
    }

    pub fn from_name(name: &str) -> Option<Direction> {
        match name {
            "NO_DIR" => Some(Direction::NoDir),
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            "LEFT" => Some(Direction::Left),
            "RIGHT" => Some(Direction::Right),
            "DRUP" => Some(Direction::DrUp),
            "DRDOWN" => Some(Direction::DrDown),
            "DLUP" => Some(Direction::DlUp),
            "DLDOWN" => Some(Direction::DlDown),
            _ => None,
        }
    }
}

/// Who may activate an actionable structure by stepping into it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Permission {
    Player,
    Npc,
    AllCharacters,
    AllMovables,
}

impl Permission {
    pub fn as_name(self) -> &'static str {
        match self {
            Permission::Player => "PLAYER_AUTHORIZED",
            Permission::Npc => "NPC_AUTHORIZED",
            Permission::AllCharacters => "ALL_CHARACTERS_AUTHORIZED",
            Permission::AllMovables => "ALL_MOVABLE_AUTHORIZED",
        }
    }

    pub fn from_name(name: &str) -> Option<Permission> {
        match name {
            "PLAYER_AUTHORIZED" => Some(Permission::Player),
            "NPC_AUTHORIZED" => Some(Permission::Npc),
            "ALL_CHARACTERS_AUTHORIZED" => Some(Permission::AllCharacters),
            "ALL_MOVABLE_AUTHORIZED" => Some(Permission::AllMovables),
            _ => None,
        }
    }
}

/// Engine lifecycle. RUNNING <-> PAUSED, either -> STOPPED.
/// In PAUSED or STOPPED, the tick operations are no-ops.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EngineState {
    Running,
    Paused,
    Stopped,
}

/// Layout of a displayed menu category.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Orientation {
    /// One entry per line.
    Vertical,
    /// Entries separated by " | ".
    Horizontal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_match_screen_axes() {
        // Row 0 at top: UP decreases row.
        assert_eq!(Direction::Up.delta(1), (-1, 0));
        assert_eq!(Direction::Down.delta(2), (2, 0));
        assert_eq!(Direction::DlDown.delta(1), (1, -1));
        assert_eq!(Direction::NoDir.delta(5), (0, 0));
    }

    #[test]
    fn wire_round_trip() {
        for d in [
            Direction::NoDir,
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
            Direction::DrUp,
            Direction::DrDown,
            Direction::DlUp,
            Direction::DlDown,
        ] {
            assert_eq!(Direction::from_wire(d.to_wire()), Some(d));
            assert_eq!(Direction::from_name(d.as_name()), Some(d));
            assert_eq!(d.opposite().opposite(), d);
        }
        assert_eq!(Direction::from_wire(42), None);
    }

    #[test]
    fn position_offset_respects_bounds() {
        let p = Position::new(0, 0);
        assert_eq!(p.offset(-1, 0, 5, 5), None);
        assert_eq!(p.offset(4, 4, 5, 5), Some(Position::new(4, 4)));
        assert_eq!(p.offset(5, 0, 5, 5), None);
    }
}
