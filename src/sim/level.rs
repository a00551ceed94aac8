/// JSON level persistence.
///
/// ## File shape
///
/// ```json
/// { "name": "...", "size": [width, height],
///   "player_starting_position": [row, column],
///   "ui_border_top": "-", "ui_border_bottom": "-",
///   "ui_border_left": "|", "ui_border_right": "|",
///   "ui_board_void_cell": " ",
///   "library": [ itemRef, ... ],
///   "map_data": { "<row>": { "<column>": itemRef, ... }, ... } }
/// ```
///
/// An itemRef is `{"object": "<ClassName>", "name": ..., "model": ...,
/// "type": ..., + type-specific fields}`. NPC refs carry an `actuator`
/// sub-object; directions inside it may be names ("UP", "DRDOWN") or
/// the integer wire constants. Unknown fields are ignored, malformed
/// entries are skipped with a warning, and Void cells are never
/// written out.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::actuator::{Actuator, ActuatorSpec};
use crate::domain::direction::{Direction, Permission, Position};
use crate::domain::item::{BoardItem, ItemKind};
use crate::error::Result;
use crate::sim::board::{Board, BoardSettings};

// ── File schema (missing keys fall back to board defaults) ──

#[derive(Serialize, Deserialize)]
struct LevelSheet {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default = "default_size")]
    size: [usize; 2],
    #[serde(default)]
    player_starting_position: [usize; 2],
    #[serde(default = "default_horizontal_border")]
    ui_border_top: String,
    #[serde(default = "default_horizontal_border")]
    ui_border_bottom: String,
    #[serde(default = "default_vertical_border")]
    ui_border_left: String,
    #[serde(default = "default_vertical_border")]
    ui_border_right: String,
    #[serde(default = "default_void_cell")]
    ui_board_void_cell: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    library: Vec<Value>,
    #[serde(default)]
    map_data: BTreeMap<String, BTreeMap<String, Value>>,
}

fn default_name() -> String {
    "Board".to_string()
}

fn default_size() -> [usize; 2] {
    [10, 10]
}

fn default_horizontal_border() -> String {
    "-".to_string()
}

fn default_vertical_border() -> String {
    "|".to_string()
}

fn default_void_cell() -> String {
    " ".to_string()
}

/// What a level file yields: the board (non-NPC items already placed),
/// the object library, and the NPC refs with their recorded positions
/// (the Game routes those through `add_npc` so rosters and default
/// actuators apply.
pub struct LoadedBoard {
    pub board: Board,
    pub library: Vec<BoardItem>,
    pub npcs: Vec<(Position, BoardItem)>,
}

// ── Saving ──

/// Write a board to disk. Void cells and the Player are skipped, as
/// are items that cannot be persisted (particles, complex items);
/// those are logged and dropped.
pub fn save_board_file(board: &Board, library: &[BoardItem], path: &Path) -> Result<()> {
    let mut sheet = LevelSheet {
        name: board.name.clone(),
        size: [board.width(), board.height()],
        player_starting_position: [
            board.player_starting_position.row,
            board.player_starting_position.column,
        ],
        ui_border_top: board.ui_border_top.clone(),
        ui_border_bottom: board.ui_border_bottom.clone(),
        ui_border_left: board.ui_border_left.clone(),
        ui_border_right: board.ui_border_right.clone(),
        ui_board_void_cell: board.ui_board_void_cell.clone(),
        library: library.iter().filter_map(item_to_ref).collect(),
        map_data: BTreeMap::new(),
    };
    for row in 0..board.height() {
        for column in 0..board.width() {
            let item = board.item(row, column)?;
            if item.is_void() || matches!(item.kind, ItemKind::Player(_)) {
                continue;
            }
            match item_to_ref(item) {
                Some(entry) => {
                    sheet
                        .map_data
                        .entry(row.to_string())
                        .or_default()
                        .insert(column.to_string(), entry);
                }
                None => {
                    log::warn!(
                        "cell [{row},{column}]: {} cannot be persisted, skipped",
                        item.class_name()
                    );
                }
            }
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(&sheet)?)?;
    Ok(())
}

// ── Loading ──

pub fn load_board_file(path: &Path) -> Result<LoadedBoard> {
    let text = std::fs::read_to_string(path)?;
    let sheet: LevelSheet = serde_json::from_str(&text)?;
    let mut board = Board::new(BoardSettings {
        name: sheet.name,
        size: (sheet.size[0], sheet.size[1]),
        ui_border_left: sheet.ui_border_left,
        ui_border_right: sheet.ui_border_right,
        ui_border_top: sheet.ui_border_top,
        ui_border_bottom: sheet.ui_border_bottom,
        ui_board_void_cell: sheet.ui_board_void_cell,
        ui_board_void_cell_sprixel: None,
        player_starting_position: Position::new(
            sheet.player_starting_position[0],
            sheet.player_starting_position[1],
        ),
        display_size_warnings: true,
    })?;
    let library = sheet.library.iter().filter_map(ref_to_item).collect();
    let mut npcs = Vec::new();
    for (row_key, columns) in &sheet.map_data {
        let row = match row_key.parse::<usize>() {
            Ok(row) => row,
            Err(_) => {
                log::warn!("map_data row key '{row_key}' is not a number, row skipped");
                continue;
            }
        };
        for (column_key, entry) in columns {
            let column = match column_key.parse::<usize>() {
                Ok(column) => column,
                Err(_) => {
                    log::warn!("map_data column key '{column_key}' is not a number, cell skipped");
                    continue;
                }
            };
            if !entry.get("object").map_or(false, Value::is_string) {
                log::warn!("[{row},{column}]: entry without \"object\" attribute, not loaded");
                continue;
            }
            let item = match ref_to_item(entry) {
                Some(item) => item,
                None => continue,
            };
            if matches!(item.kind, ItemKind::Npc(_)) {
                npcs.push((Position::new(row, column), item));
            } else if !item.is_void() {
                board.place_item(item, row, column)?;
            }
        }
    }
    Ok(LoadedBoard { board, library, npcs })
}

// ── Item refs ──

fn item_to_ref(item: &BoardItem) -> Option<Value> {
    let mut entry = Map::new();
    entry.insert("object".to_string(), json!(item.class_name()));
    entry.insert("name".to_string(), json!(item.name));
    entry.insert("type".to_string(), json!(item.item_type));
    entry.insert("model".to_string(), json!(item.model));
    if let Some(pos) = item.pos {
        entry.insert("pos".to_string(), json!([pos.row, pos.column]));
    }
    if let Some(value) = item.value {
        entry.insert("value".to_string(), json!(value));
    }
    entry.insert("inventory_space".to_string(), json!(item.inventory_space));
    match &item.kind {
        ItemKind::Wall | ItemKind::Treasure | ItemKind::Door => {}
        ItemKind::GenericStructure { pickable, overlappable, restorable } => {
            entry.insert("pickable".to_string(), json!(pickable));
            entry.insert("overlappable".to_string(), json!(overlappable));
            entry.insert("restorable".to_string(), json!(restorable));
        }
        // Activation callbacks are code; they do not persist.
        ItemKind::ActionableStructure { perm, overlappable, restorable, .. } => {
            entry.insert("perm".to_string(), json!(perm.as_name()));
            entry.insert("overlappable".to_string(), json!(overlappable));
            entry.insert("restorable".to_string(), json!(restorable));
        }
        ItemKind::Npc(stats) | ItemKind::Player(stats) => {
            entry.insert("step".to_string(), json!(stats.step));
            entry.insert("hp".to_string(), json!(stats.hp));
            entry.insert("max_hp".to_string(), json!(stats.max_hp));
            entry.insert("remaining_lives".to_string(), json!(stats.remaining_lives));
            entry.insert("attack_power".to_string(), json!(stats.attack_power));
            if let Some(actuator) = stats.actuator.as_deref().and_then(actuator_to_ref) {
                entry.insert("actuator".to_string(), actuator);
            }
        }
        // Hit callbacks do not persist either.
        ItemKind::Projectile(stats) => {
            entry.insert("step".to_string(), json!(stats.step));
            entry.insert("range".to_string(), json!(stats.range));
            entry.insert("is_aoe".to_string(), json!(stats.is_aoe));
            entry.insert("aoe_radius".to_string(), json!(stats.aoe_radius));
            if let Some(actuator) = stats.actuator.as_deref().and_then(actuator_to_ref) {
                entry.insert("actuator".to_string(), actuator);
            }
        }
        ItemKind::Void
        | ItemKind::Particle(_)
        | ItemKind::Complex(_)
        | ItemKind::ComplexPart { .. } => return None,
    }
    Some(Value::Object(entry))
}

fn actuator_to_ref(actuator: &dyn Actuator) -> Option<Value> {
    let (kind, key, directions) = match actuator.spec() {
        ActuatorSpec::Random { moveset } => ("RandomActuator", "moveset", moveset),
        ActuatorSpec::Path { path } => ("PathActuator", "path", path),
        ActuatorSpec::Patrol { path } => ("PatrolActuator", "path", path),
        ActuatorSpec::Opaque => return None,
    };
    let names: Vec<&str> = directions.iter().map(|direction| direction.as_name()).collect();
    Some(json!({ "type": kind, key: names }))
}

fn ref_to_item(entry: &Value) -> Option<BoardItem> {
    let object = entry.get("object")?.as_str()?;
    let name = entry.get("name").and_then(Value::as_str).unwrap_or(object);
    let model = entry.get("model").and_then(Value::as_str).unwrap_or("?");
    let mut item = match object {
        "BoardItemVoid" => BoardItem::void(model),
        "Wall" => BoardItem::wall(name, model),
        "Treasure" => BoardItem::treasure(
            name,
            model,
            entry.get("value").and_then(Value::as_i64).unwrap_or(10),
        ),
        "Door" => BoardItem::door(name, model),
        "GenericStructure" => BoardItem::structure(
            name,
            model,
            flag(entry, "pickable"),
            flag(entry, "overlappable"),
            flag(entry, "restorable"),
        ),
        "GenericActionableStructure" => {
            let perm = entry
                .get("perm")
                .and_then(Value::as_str)
                .and_then(Permission::from_name)
                .unwrap_or(Permission::Player);
            let mut structure = BoardItem::actionable(name, model, perm);
            if let ItemKind::ActionableStructure { overlappable, restorable, .. } =
                &mut structure.kind
            {
                if let Some(value) = entry.get("overlappable").and_then(Value::as_bool) {
                    *overlappable = value;
                }
                if let Some(value) = entry.get("restorable").and_then(Value::as_bool) {
                    *restorable = value;
                }
            }
            structure
        }
        "NPC" => {
            let mut npc = BoardItem::npc(name, model);
            fill_movable_stats(&mut npc, entry);
            if let Some(actuator) = actuator_from_ref(entry.get("actuator")) {
                npc.set_actuator(actuator);
            }
            npc
        }
        "Player" => {
            let mut player = BoardItem::player(name, model);
            fill_movable_stats(&mut player, entry);
            player
        }
        "Projectile" => {
            let mut projectile = BoardItem::projectile(name, model);
            if let Some(stats) = projectile.projectile_stats_mut() {
                if let Some(value) = entry.get("step").and_then(Value::as_u64) {
                    stats.step = value as usize;
                }
                if let Some(value) = entry.get("range").and_then(Value::as_i64) {
                    stats.range = value;
                }
                if let Some(value) = entry.get("is_aoe").and_then(Value::as_bool) {
                    stats.is_aoe = value;
                }
                if let Some(value) = entry.get("aoe_radius").and_then(Value::as_u64) {
                    stats.aoe_radius = value as usize;
                }
            }
            if let Some(actuator) = actuator_from_ref(entry.get("actuator")) {
                projectile.set_actuator(actuator);
            }
            projectile
        }
        other => {
            log::warn!("unknown object class '{other}' in level file, skipped");
            return None;
        }
    };
    if let Some(value) = entry.get("value").and_then(Value::as_i64) {
        item.value = Some(value);
    }
    if let Some(space) = entry.get("inventory_space").and_then(Value::as_u64) {
        item.inventory_space = space as usize;
    }
    if let Some(tag) = entry.get("type").and_then(Value::as_str) {
        item.item_type = tag.to_string();
    }
    Some(item)
}

fn flag(entry: &Value, key: &str) -> bool {
    entry.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn fill_movable_stats(item: &mut BoardItem, entry: &Value) {
    if let Some(stats) = item.stats_mut() {
        if let Some(value) = entry.get("step").and_then(Value::as_u64) {
            stats.step = value as usize;
        }
        if let Some(value) = entry.get("hp").and_then(Value::as_i64) {
            stats.hp = value;
        }
        if let Some(value) = entry.get("max_hp").and_then(Value::as_i64) {
            stats.max_hp = value;
        }
        if let Some(value) = entry.get("remaining_lives").and_then(Value::as_u64) {
            stats.remaining_lives = value as u32;
        }
        if let Some(value) = entry.get("attack_power").and_then(Value::as_i64) {
            stats.attack_power = value;
        }
    }
}

fn actuator_from_ref(entry: Option<&Value>) -> Option<Box<dyn Actuator>> {
    let entry = entry?;
    let kind = entry.get("type")?.as_str()?;
    let directions = |key: &str| -> Vec<Direction> {
        entry
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(direction_from_value).collect())
            .unwrap_or_default()
    };
    let spec = match kind.trim_end_matches("Actuator") {
        "Random" => ActuatorSpec::Random { moveset: directions("moveset") },
        "Path" => ActuatorSpec::Path { path: directions("path") },
        "Patrol" => ActuatorSpec::Patrol { path: directions("path") },
        // Pathfinding lives outside the engine; a PathFinder ref
        // degrades to a fixed path over whatever directions it carries.
        "PathFinder" => ActuatorSpec::Path { path: directions("path") },
        other => {
            log::warn!("unknown actuator type '{other}' in level file, ignored");
            return None;
        }
    };
    spec.build()
}

/// Directions on the wire are either names or integer constants.
fn direction_from_value(value: &Value) -> Option<Direction> {
    match value {
        Value::String(name) => Direction::from_name(name),
        Value::Number(number) => number.as_i64().and_then(Direction::from_wire),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actuator::{PatrolActuator, RandomActuator};
    use crate::domain::item::MovableStats;
    use crate::sim::game::Game;
    use crate::ui::sprixel::Sprixel;

    fn populated_board() -> Board {
        let mut board = Board::new(BoardSettings {
            name: "dungeon".to_string(),
            size: (8, 6),
            ui_border_top: "=".to_string(),
            ui_border_bottom: "=".to_string(),
            ui_board_void_cell: ".".to_string(),
            player_starting_position: Position::new(1, 1),
            ..BoardSettings::default()
        })
        .unwrap();
        board.place_item(BoardItem::wall("wall", "#"), 0, 0).unwrap();
        board
            .place_item(
                BoardItem::treasure("gold", "$", 120).with_inventory_space(3),
                2,
                5,
            )
            .unwrap();
        board.place_item(BoardItem::door("door", "+"), 3, 3).unwrap();
        board
            .place_item(BoardItem::structure("bush", "*", true, false, true), 4, 4)
            .unwrap();
        board
            .place_item(BoardItem::actionable("lever", "!", Permission::AllCharacters), 5, 2)
            .unwrap();
        board
    }

    #[test]
    fn round_trip_preserves_board_and_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");

        let mut game = Game::new();
        game.add_board(1, populated_board());
        // The player must never be persisted.
        game.set_player(BoardItem::player("hero", "@")).unwrap();
        game.current_level = 1;
        game.change_level(1).unwrap();
        // An NPC with a persistable actuator.
        let mut guard = BoardItem::npc("guard", "g");
        guard.stats_mut().unwrap().hp = 42;
        guard.set_actuator(Box::new(PatrolActuator::new(vec![
            Direction::Up,
            Direction::Right,
        ])));
        game.add_npc(1, guard, Some(4), Some(1)).unwrap();

        game.save_board(1, &path).unwrap();

        let mut reloaded = Game::new();
        reloaded.load_board(&path, 7).unwrap();
        let board = reloaded.get_board(7).unwrap();

        assert_eq!(board.name, "dungeon");
        assert_eq!((board.width(), board.height()), (8, 6));
        assert_eq!(board.ui_border_top, "=");
        assert_eq!(board.ui_board_void_cell, ".");
        assert_eq!(board.player_starting_position, Position::new(1, 1));

        assert_eq!(board.item(0, 0).unwrap().name, "wall");
        let gold = board.item(2, 5).unwrap();
        assert_eq!(gold.value, Some(120));
        assert_eq!(gold.inventory_space, 3);
        assert!(board.item(3, 3).unwrap().restorable());
        let bush = board.item(4, 4).unwrap();
        assert!(bush.pickable() && !bush.overlappable() && bush.restorable());
        assert_eq!(board.item(5, 2).unwrap().perm(), Some(Permission::AllCharacters));

        // The player's cell came back as void.
        assert!(board.item(1, 1).unwrap().is_void());

        // The NPC landed on the roster with its stats and actuator.
        let npcs = reloaded.npcs(7).unwrap();
        assert_eq!(npcs.len(), 1);
        let npc = board.item_by_id(npcs[0]).unwrap();
        assert_eq!(npc.name, "guard");
        assert_eq!(npc.stats().unwrap().hp, 42);
        assert_eq!(
            npc.actuator().unwrap().spec(),
            ActuatorSpec::Patrol { path: vec![Direction::Up, Direction::Right] }
        );
    }

    #[test]
    fn library_round_trips_and_particles_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");

        let mut game = Game::new();
        let mut board = populated_board();
        // A particle on the board cannot be persisted; it is dropped.
        board.place_item(BoardItem::particle("*"), 0, 7).unwrap();
        game.add_board(0, board);
        game.object_library.push(BoardItem::treasure("ruby", "r", 500));
        game.object_library.push(BoardItem::wall("brick", "#"));
        game.save_board(0, &path).unwrap();

        let mut reloaded = Game::new();
        reloaded.load_board(&path, 0).unwrap();
        assert_eq!(reloaded.object_library.len(), 2);
        assert_eq!(reloaded.object_library[0].name, "ruby");
        assert_eq!(reloaded.object_library[0].value, Some(500));
        assert!(reloaded.get_board(0).unwrap().item(0, 7).unwrap().is_void());
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");
        std::fs::write(
            &path,
            r##"{
                "name": "partial", "size": [4, 4],
                "map_data": {
                    "0": {
                        "0": {"object": "Wall", "name": "ok", "model": "#"},
                        "1": {"name": "no class here"},
                        "2": {"object": "Dragon", "name": "unknown"}
                    },
                    "oops": {"0": {"object": "Wall"}}
                },
                "unknown_top_level_field": true
            }"##,
        )
        .unwrap();

        let loaded = load_board_file(&path).unwrap();
        assert_eq!(loaded.board.item(0, 0).unwrap().name, "ok");
        assert!(loaded.board.item(0, 1).unwrap().is_void());
        assert!(loaded.board.item(0, 2).unwrap().is_void());
    }

    #[test]
    fn wire_directions_accept_names_and_integers() {
        let entry = json!({
            "type": "Random",
            "moveset": ["UP", 13, "DLDOWN", "bogus", true]
        });
        let actuator = actuator_from_ref(Some(&entry)).unwrap();
        assert_eq!(
            actuator.spec(),
            ActuatorSpec::Random {
                moveset: vec![Direction::Up, Direction::Right, Direction::DlDown]
            }
        );
        // Long-form class names work too.
        let entry = json!({ "type": "PatrolActuator", "path": [10, 10] });
        let actuator = actuator_from_ref(Some(&entry)).unwrap();
        assert_eq!(
            actuator.spec(),
            ActuatorSpec::Patrol { path: vec![Direction::Up, Direction::Up] }
        );
        // PathFinder degrades to a fixed path.
        let entry = json!({ "type": "PathFinder", "path": ["RIGHT"] });
        let actuator = actuator_from_ref(Some(&entry)).unwrap();
        assert_eq!(actuator.spec(), ActuatorSpec::Path { path: vec![Direction::Right] });
    }

    #[test]
    fn opaque_actuators_are_not_persisted() {
        use crate::domain::actuator::{ActuatorState, ActuatorSpec};

        struct HostBrain;
        impl Actuator for HostBrain {
            fn state(&self) -> ActuatorState {
                ActuatorState::Running
            }
            fn set_state(&mut self, _state: ActuatorState) {}
            fn next_move(&mut self) -> Direction {
                Direction::NoDir
            }
        }

        let mut npc = BoardItem::npc("smart", "s");
        npc.set_actuator(Box::new(HostBrain));
        let entry = item_to_ref(&npc).unwrap();
        assert!(entry.get("actuator").is_none());

        let mut simple = BoardItem::npc("simple", "s");
        simple.set_actuator(Box::new(RandomActuator::new(vec![Direction::Left])));
        let entry = item_to_ref(&simple).unwrap();
        assert_eq!(entry["actuator"]["type"], json!("RandomActuator"));
    }

    #[test]
    fn complex_items_are_not_persisted() {
        let cells = vec![vec![Some(Sprixel::from_model("[")), Some(Sprixel::from_model("]"))]];
        let tower = BoardItem::complex("tower", cells, Some(MovableStats::default()));
        assert!(item_to_ref(&tower).is_none());
    }
}
