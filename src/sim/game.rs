/// The Game: boards by level number, the player, NPC and projectile
/// rosters, and the tick pipeline.
///
/// The host owns the loop; the engine owns the rules. A typical tick:
///
///   game.move_player(direction, 1)?;
///   game.actuate_npcs(level)?;
///   game.actuate_projectiles(level)?;
///   game.animate_items(level)?;
///   game.display_board(&mut out)?;
///
/// All four mutating calls are no-ops unless the engine state is
/// Running. Within one call, items act in roster insertion order and
/// each move sees the world produced by the moves before it.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use rand::Rng;

use serde_json::Value;

use crate::config::ConfigStore;
use crate::domain::actuator::{ActuatorState, RandomActuator};
use crate::domain::direction::{Direction, EngineState, Orientation, Position};
use crate::domain::item::{BoardItem, ItemId, ItemKind};
use crate::error::{Error, Result};
use crate::sim::board::{Board, Heading};
use crate::sim::level::{self, LoadedBoard};
use crate::ui::input::{self, Key};
use crate::ui::menu::{Menu, MenuEntry};

struct LevelData {
    board: Board,
    npcs: Vec<ItemId>,
    projectiles: Vec<ItemId>,
}

pub struct Game {
    boards: BTreeMap<usize, LevelData>,
    pub current_level: usize,
    /// The player item while it is not placed on any board; once
    /// placed, the current board's matrix owns it.
    player: Option<BoardItem>,
    player_id: Option<ItemId>,
    state: EngineState,
    /// Item templates loaded from a level's `library` section.
    pub object_library: Vec<BoardItem>,
    config: ConfigStore,
    menu: Menu,
}

impl Game {
    pub fn new() -> Self {
        Game {
            boards: BTreeMap::new(),
            current_level: 0,
            player: None,
            player_id: None,
            state: EngineState::Running,
            object_library: Vec::new(),
            config: ConfigStore::new(),
            menu: Menu::new(),
        }
    }

    // ── State machine ──

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn start(&mut self) {
        if self.state != EngineState::Stopped {
            self.state = EngineState::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.state == EngineState::Running {
            self.state = EngineState::Paused;
        }
    }

    /// Terminal: a stopped game does not come back.
    pub fn stop(&mut self) {
        self.state = EngineState::Stopped;
    }

    // ── Level composition ──

    pub fn add_board(&mut self, level: usize, board: Board) {
        self.boards.insert(level, LevelData { board, npcs: Vec::new(), projectiles: Vec::new() });
    }

    pub fn get_board(&self, level: usize) -> Result<&Board> {
        self.boards
            .get(&level)
            .map(|data| &data.board)
            .ok_or(Error::InvalidLevel(level))
    }

    pub fn get_board_mut(&mut self, level: usize) -> Result<&mut Board> {
        self.boards
            .get_mut(&level)
            .map(|data| &mut data.board)
            .ok_or(Error::InvalidLevel(level))
    }

    pub fn current_board(&self) -> Result<&Board> {
        self.get_board(self.current_level)
    }

    pub fn current_board_mut(&mut self) -> Result<&mut Board> {
        let level = self.current_level;
        self.get_board_mut(level)
    }

    /// Swap the current level: the player is lifted off its board (the
    /// cell under it repairs as usual) and dropped at the new board's
    /// starting position.
    pub fn change_level(&mut self, level: usize) -> Result<()> {
        if !self.boards.contains_key(&level) {
            return Err(Error::InvalidLevel(level));
        }
        let player_id = self.player_id.ok_or(Error::PlayerUndefined)?;
        let player = match self.player.take() {
            Some(item) => item,
            None => {
                let data = self
                    .boards
                    .get_mut(&self.current_level)
                    .ok_or(Error::InvalidLevel(self.current_level))?;
                let pos = data
                    .board
                    .position_of(player_id)
                    .ok_or(Error::PlayerUndefined)?;
                data.board.take_item(pos.row, pos.column)?
            }
        };
        self.current_level = level;
        let data = self.boards.get_mut(&level).ok_or(Error::InvalidLevel(level))?;
        let start = data.board.player_starting_position;
        data.board.place_item(player, start.row, start.column)?;
        Ok(())
    }

    // ── Player ──

    pub fn set_player(&mut self, player: BoardItem) -> Result<()> {
        if !matches!(player.kind, ItemKind::Player(_)) {
            return Err(Error::InvalidType("set_player needs a Player item".to_string()));
        }
        self.player_id = Some(player.id());
        self.player = Some(player);
        Ok(())
    }

    pub fn player_id(&self) -> Option<ItemId> {
        self.player_id
    }

    pub fn player(&self) -> Option<&BoardItem> {
        if let Some(item) = self.player.as_ref() {
            return Some(item);
        }
        let id = self.player_id?;
        self.boards.get(&self.current_level)?.board.item_by_id(id)
    }

    pub fn player_mut(&mut self) -> Option<&mut BoardItem> {
        if self.player.is_some() {
            return self.player.as_mut();
        }
        let id = self.player_id?;
        self.boards.get_mut(&self.current_level)?.board.item_by_id_mut(id)
    }

    pub fn player_position(&self) -> Option<Position> {
        let id = self.player_id?;
        self.boards.get(&self.current_level)?.board.position_of(id)
    }

    pub fn move_player(&mut self, heading: impl Into<Heading>, step: usize) -> Result<()> {
        if self.state != EngineState::Running {
            return Ok(());
        }
        let player_id = self.player_id.ok_or(Error::PlayerUndefined)?;
        let level = self.current_level;
        let data = self.boards.get_mut(&level).ok_or(Error::InvalidLevel(level))?;
        data.board.move_item(player_id, heading, step)
    }

    // ── NPC management ──

    /// Place an NPC at the given coordinates, or on a random Void cell
    /// when either coordinate is missing. NPCs without an actuator get
    /// a random four-way walk; registered NPCs are actuated in
    /// insertion order.
    pub fn add_npc(
        &mut self,
        level: usize,
        mut npc: BoardItem,
        row: Option<usize>,
        column: Option<usize>,
    ) -> Result<ItemId> {
        if !matches!(npc.kind, ItemKind::Npc(_)) {
            return Err(Error::InvalidType("add_npc needs an NPC item".to_string()));
        }
        let data = self.boards.get_mut(&level).ok_or(Error::InvalidLevel(level))?;
        let (row, column) = match (row, column) {
            (Some(row), Some(column)) => (row, column),
            _ => {
                let width = data.board.width();
                let height = data.board.height();
                let mut rng = rand::thread_rng();
                let mut found = None;
                for _ in 0..(width * height * 4).max(16) {
                    let r = row.unwrap_or_else(|| rng.gen_range(0..height));
                    let c = column.unwrap_or_else(|| rng.gen_range(0..width));
                    if data.board.item(r, c)?.is_void() {
                        found = Some((r, c));
                        break;
                    }
                }
                // Luck ran out; sweep for the first free cell instead.
                let found = found.or_else(|| {
                    (0..height)
                        .flat_map(|r| (0..width).map(move |c| (r, c)))
                        .find(|&(r, c)| data.board.item(r, c).map_or(false, |item| item.is_void()))
                });
                found.ok_or_else(|| {
                    Error::SanityCheck("board has no empty cell left for an NPC".to_string())
                })?
            }
        };
        if npc.actuator().is_none() {
            npc.set_actuator(Box::new(RandomActuator::new(vec![
                Direction::Up,
                Direction::Down,
                Direction::Left,
                Direction::Right,
            ])));
        }
        let id = data.board.place_item(npc, row, column)?;
        data.npcs.push(id);
        Ok(id)
    }

    pub fn remove_npc(&mut self, level: usize, id: ItemId) -> Result<()> {
        let data = self.boards.get_mut(&level).ok_or(Error::InvalidLevel(level))?;
        let index = data
            .npcs
            .iter()
            .position(|&npc| npc == id)
            .ok_or_else(|| Error::InvalidType(format!("NPC #{id} is not registered on level {level}")))?;
        data.npcs.remove(index);
        if let Some(pos) = data.board.position_of(id) {
            data.board.clear_cell(pos.row, pos.column)?;
        }
        Ok(())
    }

    pub fn npcs(&self, level: usize) -> Result<&[ItemId]> {
        self.boards
            .get(&level)
            .map(|data| data.npcs.as_slice())
            .ok_or(Error::InvalidLevel(level))
    }

    /// One NPC step for every roster member whose actuator is running.
    pub fn actuate_npcs(&mut self, level: usize) -> Result<()> {
        if self.state != EngineState::Running {
            return Ok(());
        }
        let data = self.boards.get_mut(&level).ok_or(Error::InvalidLevel(level))?;
        let roster = data.npcs.clone();
        for id in roster {
            let running = data
                .board
                .item_by_id(id)
                .and_then(|item| item.actuator_state())
                == Some(ActuatorState::Running);
            if !running {
                continue;
            }
            let (direction, step) = match data.board.item_by_id_mut(id) {
                Some(item) => {
                    let step = item.step();
                    match item.actuator_mut() {
                        Some(actuator) => (actuator.next_move(), step),
                        None => continue,
                    }
                }
                None => continue,
            };
            data.board.move_item(id, direction, step)?;
        }
        Ok(())
    }

    // ── Projectile management ──

    /// Register a projectile at (row, column). Off-board coordinates
    /// are silently dropped. A non-Void occupant means an immediate
    /// hit: the callback fires (blast zone for AoE, the blocker alone
    /// otherwise) and the projectile is never placed. Returns the
    /// placed projectile's id, or None when it was dropped or hit on
    /// arrival.
    pub fn add_projectile(
        &mut self,
        level: usize,
        mut projectile: BoardItem,
        row: usize,
        column: usize,
    ) -> Result<Option<ItemId>> {
        let (is_aoe, aoe_radius) = match projectile.projectile_stats() {
            Some(stats) => (stats.is_aoe, stats.aoe_radius),
            None => {
                return Err(Error::InvalidType(
                    "add_projectile needs a Projectile item".to_string(),
                ))
            }
        };
        let data = self.boards.get_mut(&level).ok_or(Error::InvalidLevel(level))?;
        if row >= data.board.height() || column >= data.board.width() {
            return Ok(None);
        }
        let target = Position::new(row, column);
        if !data.board.item(row, column)?.is_void() {
            let targets = if is_aoe {
                blast_zone(&data.board, target, aoe_radius)
            } else {
                vec![target]
            };
            if let Some(mut callback) = projectile.take_hit_callback() {
                callback(&mut data.board, &targets);
            }
            return Ok(None);
        }
        if projectile.actuator().is_none() {
            projectile.set_actuator(Box::new(RandomActuator::new(vec![Direction::Right])));
        }
        let id = data.board.place_item(projectile, row, column)?;
        data.projectiles.push(id);
        Ok(Some(id))
    }

    pub fn projectiles(&self, level: usize) -> Result<&[ItemId]> {
        self.boards
            .get(&level)
            .map(|data| data.projectiles.as_slice())
            .ok_or(Error::InvalidLevel(level))
    }

    /// Fly every registered projectile one step and resolve hits.
    ///
    /// Running + range > 0: move, burn range, and on collision (the
    /// position did not change) fire the hit: blast zone for AoE, the
    /// blocking cell for directional shots. Running + range == 0: fire
    /// the terminal hit and stop. Stopped or overspent: clear the cell
    /// and drop from the roster. The hit callback is consumed on first
    /// fire, so it runs at most once per projectile.
    pub fn actuate_projectiles(&mut self, level: usize) -> Result<()> {
        if self.state != EngineState::Running {
            return Ok(());
        }
        let data = self.boards.get_mut(&level).ok_or(Error::InvalidLevel(level))?;
        let roster = data.projectiles.clone();
        let mut spent: Vec<ItemId> = Vec::new();
        for id in roster {
            let pos = match data.board.position_of(id) {
                Some(pos) => pos,
                None => {
                    spent.push(id);
                    continue;
                }
            };
            let (actuator_state, range, step, is_aoe, aoe_radius) = match data.board.item_by_id(id)
            {
                Some(item) => match item.projectile_stats() {
                    Some(stats) => (
                        item.actuator_state().unwrap_or(ActuatorState::Running),
                        stats.range,
                        stats.step,
                        stats.is_aoe,
                        stats.aoe_radius,
                    ),
                    None => {
                        spent.push(id);
                        continue;
                    }
                },
                None => {
                    spent.push(id);
                    continue;
                }
            };
            match actuator_state {
                ActuatorState::Paused => {}
                ActuatorState::Stopped => {
                    data.board.clear_cell(pos.row, pos.column)?;
                    spent.push(id);
                }
                ActuatorState::Running if range > 0 => {
                    let direction = match data.board.item_by_id_mut(id).and_then(|item| item.actuator_mut()) {
                        Some(actuator) => actuator.next_move(),
                        None => Direction::NoDir,
                    };
                    data.board.move_item(id, direction, step)?;
                    if let Some(stats) = data.board.item_by_id_mut(id).and_then(|item| item.projectile_stats_mut()) {
                        stats.range -= step as i64;
                    }
                    if data.board.position_of(id) == Some(pos) {
                        // Something is blocking the path: a collision.
                        if is_aoe {
                            let targets = data.board.neighbors_of(pos, aoe_radius);
                            fire_hit(&mut data.board, id, &targets);
                        } else {
                            let (dr, dc) = direction.delta(step as i64);
                            if let Some(blocker) =
                                pos.offset(dr, dc, data.board.width(), data.board.height())
                            {
                                if blocker != pos {
                                    fire_hit(&mut data.board, id, &[blocker]);
                                }
                            }
                        }
                    }
                }
                ActuatorState::Running if range == 0 => {
                    if is_aoe {
                        let targets = data.board.neighbors_of(pos, aoe_radius);
                        fire_hit(&mut data.board, id, &targets);
                    } else {
                        fire_hit(&mut data.board, id, &[]);
                    }
                    // Spent: stop it so the next sweep reaps the cell.
                    if let Some(actuator) = data.board.item_by_id_mut(id).and_then(|item| item.actuator_mut()) {
                        actuator.stop();
                    }
                }
                ActuatorState::Running => {
                    // range < 0
                    data.board.clear_cell(pos.row, pos.column)?;
                    spent.push(id);
                }
            }
        }
        data.projectiles.retain(|id| !spent.contains(id));
        Ok(())
    }

    // ── Animation ──

    /// Advance one frame on every animated item of the level.
    pub fn animate_items(&mut self, level: usize) -> Result<()> {
        if self.state != EngineState::Running {
            return Ok(());
        }
        let data = self.boards.get_mut(&level).ok_or(Error::InvalidLevel(level))?;
        data.board.animate_all();
        Ok(())
    }

    // ── Queries ──

    /// Non-void cells around an item (default: the player) within a
    /// Chebyshev radius, excluding the item's own cell, in row-major
    /// order.
    pub fn neighbors(&self, radius: usize, id: Option<ItemId>) -> Result<Vec<Position>> {
        let board = self.current_board()?;
        let id = match id {
            Some(id) => id,
            None => self.player_id.ok_or(Error::PlayerUndefined)?,
        };
        let pos = board
            .position_of(id)
            .ok_or_else(|| Error::InvalidType(format!("item #{id} is not on the current board")))?;
        Ok(board.neighbors_of(pos, radius))
    }

    // ── Display ──

    pub fn display_board(&self, out: &mut impl Write) -> Result<()> {
        self.current_board()?.display(out)
    }

    pub fn display_board_around(
        &self,
        out: &mut impl Write,
        id: ItemId,
        row_radius: usize,
        column_radius: usize,
    ) -> Result<()> {
        self.current_board()?.display_around(out, id, row_radius, column_radius)
    }

    /// Blocking read of the next keystroke.
    pub fn get_key(&self) -> io::Result<Key> {
        input::read_key()
    }

    // ── Menu ──

    pub fn add_menu_entry(
        &mut self,
        category: &str,
        shortcut: Option<&str>,
        message: &str,
        data: Option<Value>,
    ) {
        self.menu.add_entry(category, shortcut, message, data);
    }

    pub fn update_menu_entry(
        &mut self,
        category: &str,
        shortcut: Option<&str>,
        message: &str,
        data: Option<Value>,
    ) {
        self.menu.update_entry(category, shortcut, message, data);
    }

    pub fn get_menu_entry(&self, category: &str, shortcut: Option<&str>) -> Option<&MenuEntry> {
        self.menu.get_entry(category, shortcut)
    }

    pub fn delete_menu_category(&mut self, category: &str) -> Result<()> {
        self.menu.delete_category(category)
    }

    pub fn display_menu(
        &self,
        out: &mut impl Write,
        category: &str,
        orientation: Orientation,
        paginate: usize,
    ) -> Result<()> {
        self.menu.display(out, category, orientation, paginate)
    }

    // ── Configuration ──

    pub fn load_config(&mut self, path: &Path, section: &str) -> Result<()> {
        self.config.load(path, section)
    }

    pub fn create_config(&mut self, section: &str) {
        self.config.create(section);
    }

    pub fn config(&self, section: &str) -> Option<&Value> {
        self.config.section(section)
    }

    pub fn config_mut(&mut self, section: &str) -> Option<&mut Value> {
        self.config.section_mut(section)
    }

    pub fn save_config(&self, section: &str, filename: Option<&Path>) -> Result<()> {
        self.config.save(section, filename)
    }

    // ── Level persistence ──

    /// Write a level's board to a JSON file. Void cells and the Player
    /// are never persisted; the object library rides along when it is
    /// not empty.
    pub fn save_board(&self, level: usize, path: &Path) -> Result<()> {
        let data = self.boards.get(&level).ok_or(Error::InvalidLevel(level))?;
        level::save_board_file(&data.board, &self.object_library, path)
    }

    /// Load a board file, associate it with the level, refill the
    /// object library, and route NPC refs through `add_npc` so they
    /// land on the roster with default actuators where needed.
    pub fn load_board(&mut self, path: &Path, level: usize) -> Result<()> {
        let LoadedBoard { board, library, npcs } = level::load_board_file(path)?;
        self.add_board(level, board);
        self.object_library = library;
        for (pos, npc) in npcs {
            self.add_npc(level, npc, Some(pos.row), Some(pos.column))?;
        }
        Ok(())
    }
}

impl Default for Game {
    fn default() -> Self {
        Game::new()
    }
}

// ── Hit resolution helpers ──

/// Every non-void cell in the Chebyshev square around a center,
/// including the center itself, in row-major order. Used for
/// on-placement AoE hits, where the blocker belongs in the list.
fn blast_zone(board: &Board, center: Position, radius: usize) -> Vec<Position> {
    let r = radius as i64;
    let mut cells = Vec::new();
    for dr in -r..=r {
        for dc in -r..=r {
            if let Some(pos) = center.offset(dr, dc, board.width(), board.height()) {
                if board.item(pos.row, pos.column).map_or(false, |item| !item.is_void()) {
                    cells.push(pos);
                }
            }
        }
    }
    cells
}

/// Fire a projectile's hit callback at most once: the callback is
/// consumed by the first call and never restored.
fn fire_hit(board: &mut Board, id: ItemId, targets: &[Position]) {
    let callback = board.item_by_id_mut(id).and_then(|item| item.take_hit_callback());
    if let Some(mut callback) = callback {
        callback(board, targets);
    }
}
