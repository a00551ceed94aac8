/// The Board: a matrix of cells holding exactly one item each, plus a
/// one-deep overlap layer.
///
/// ## Two layers, composed at mutation time
///
/// - `matrix`: the visible layer. Every in-bounds cell holds an item
///   (a Void when nothing real is there), from construction on.
/// - `overlapped`: the hidden layer. When a movable steps onto an
///   immovable that is both overlappable and restorable (a door), the
///   door is parked here and comes back the moment the cell frees up.
///
/// All mutation goes through `place_item` / `clear_cell` / `take_item`
/// / `move_item`; the movable/immovable id sets and the id→position
/// index are maintained by those four entry points only.
///
/// ## Policy, not errors
///
/// `place_item` overwrites without complaint; collision and
/// permission logic belong to `move_item`. A move that would leave the
/// board or enter a non-overlappable cell is silently refused: the
/// world simply does not change.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use crossterm::{queue, style::Print};

use crate::domain::direction::{Direction, Position};
use crate::domain::item::{BoardItem, ItemId, ItemKind};
use crate::domain::vector::Vector2D;
use crate::error::{Error, Result};
use crate::ui::screen;
use crate::ui::sprixel::Sprixel;

// ── Construction parameters ──

pub struct BoardSettings {
    pub name: String,
    /// (width, height)
    pub size: (usize, usize),
    pub ui_border_left: String,
    pub ui_border_right: String,
    pub ui_border_top: String,
    pub ui_border_bottom: String,
    pub ui_board_void_cell: String,
    pub ui_board_void_cell_sprixel: Option<Sprixel>,
    pub player_starting_position: Position,
    pub display_size_warnings: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        BoardSettings {
            name: "Board".to_string(),
            size: (10, 10),
            ui_border_left: "|".to_string(),
            ui_border_right: "|".to_string(),
            ui_border_top: "-".to_string(),
            ui_border_bottom: "-".to_string(),
            ui_board_void_cell: " ".to_string(),
            ui_board_void_cell_sprixel: None,
            player_starting_position: Position::new(0, 0),
            display_size_warnings: true,
        }
    }
}

/// Where a move wants to go: a fixed direction, or an accumulated
/// fractional vector (rounded to whole cells at resolution time).
#[derive(Clone, Copy, Debug)]
pub enum Heading {
    Dir(Direction),
    Vector(Vector2D),
}

impl From<Direction> for Heading {
    fn from(direction: Direction) -> Self {
        Heading::Dir(direction)
    }
}

impl From<Vector2D> for Heading {
    fn from(vector: Vector2D) -> Self {
        Heading::Vector(vector)
    }
}

impl Heading {
    fn delta(self, step: usize) -> (i64, i64) {
        match self {
            Heading::Dir(direction) => direction.delta(step as i64),
            // Vectors carry their own magnitude; step does not apply.
            Heading::Vector(v) => (v.row().round() as i64, v.column().round() as i64),
        }
    }
}

// ── Board ──

pub struct Board {
    pub name: String,
    size: (usize, usize),
    pub ui_border_left: String,
    pub ui_border_right: String,
    pub ui_border_top: String,
    pub ui_border_bottom: String,
    pub ui_board_void_cell: String,
    pub ui_board_void_cell_sprixel: Option<Sprixel>,
    pub player_starting_position: Position,
    matrix: Vec<Vec<BoardItem>>,
    overlapped: Vec<Vec<Option<BoardItem>>>,
    /// Complex item roots live off-matrix; their footprints are filled
    /// with part markers.
    complexes: HashMap<ItemId, BoardItem>,
    movables: HashSet<ItemId>,
    immovables: HashSet<ItemId>,
    locations: HashMap<ItemId, Position>,
}

impl Board {
    pub fn new(settings: BoardSettings) -> Result<Board> {
        Board::check_sanity(&settings)?;
        let (width, height) = settings.size;
        let mut board = Board {
            name: settings.name,
            size: settings.size,
            ui_border_left: settings.ui_border_left,
            ui_border_right: settings.ui_border_right,
            ui_border_top: settings.ui_border_top,
            ui_border_bottom: settings.ui_border_bottom,
            ui_board_void_cell: settings.ui_board_void_cell,
            ui_board_void_cell_sprixel: settings.ui_board_void_cell_sprixel,
            player_starting_position: settings.player_starting_position,
            matrix: Vec::with_capacity(height),
            overlapped: Vec::with_capacity(height),
            complexes: HashMap::new(),
            movables: HashSet::new(),
            immovables: HashSet::new(),
            locations: HashMap::new(),
        };
        for row in 0..height {
            let mut line = Vec::with_capacity(width);
            for column in 0..width {
                let mut cell = board.generate_void_cell();
                cell.pos = Some(Position::new(row, column));
                line.push(cell);
            }
            board.matrix.push(line);
            board.overlapped.push((0..width).map(|_| None).collect());
        }
        Ok(board)
    }

    fn check_sanity(settings: &BoardSettings) -> Result<()> {
        if settings.size.0 == 0 || settings.size.1 == 0 {
            return Err(Error::SanityCheck(
                "board dimensions must be at least 1x1".to_string(),
            ));
        }
        for (label, glyph) in [
            ("ui_border_left", &settings.ui_border_left),
            ("ui_border_right", &settings.ui_border_right),
            ("ui_border_top", &settings.ui_border_top),
            ("ui_border_bottom", &settings.ui_border_bottom),
            ("ui_board_void_cell", &settings.ui_board_void_cell),
        ] {
            if glyph.is_empty() {
                return Err(Error::SanityCheck(format!("{label} must not be empty")));
            }
        }
        if settings.display_size_warnings {
            if settings.size.0 > 80 {
                log::warn!(
                    "board '{}' is {} columns wide; older terminals cap at 80",
                    settings.name,
                    settings.size.0
                );
            }
            if settings.size.1 > 80 {
                log::warn!(
                    "board '{}' is {} rows tall; older terminals cap at 80",
                    settings.name,
                    settings.size.1
                );
            }
        }
        Ok(())
    }

    // ── Geometry ──

    pub fn width(&self) -> usize {
        self.size.0
    }

    pub fn height(&self) -> usize {
        self.size.1
    }

    pub fn in_bounds(&self, row: usize, column: usize) -> bool {
        row < self.height() && column < self.width()
    }

    fn out_of_bounds_error(&self, row: usize, column: usize) -> Error {
        Error::OutOfBoardBound {
            row,
            column,
            width: self.width(),
            height: self.height(),
        }
    }

    // ── Cell access ──

    pub fn item(&self, row: usize, column: usize) -> Result<&BoardItem> {
        if !self.in_bounds(row, column) {
            return Err(self.out_of_bounds_error(row, column));
        }
        Ok(&self.matrix[row][column])
    }

    pub fn item_mut(&mut self, row: usize, column: usize) -> Result<&mut BoardItem> {
        if !self.in_bounds(row, column) {
            return Err(self.out_of_bounds_error(row, column));
        }
        Ok(&mut self.matrix[row][column])
    }

    /// The parked item under (row, column), if any.
    pub fn overlapped_item(&self, row: usize, column: usize) -> Option<&BoardItem> {
        self.overlapped.get(row)?.get(column)?.as_ref()
    }

    pub fn position_of(&self, id: ItemId) -> Option<Position> {
        self.locations.get(&id).copied()
    }

    pub fn item_by_id(&self, id: ItemId) -> Option<&BoardItem> {
        if let Some(root) = self.complexes.get(&id) {
            return Some(root);
        }
        let pos = self.locations.get(&id)?;
        Some(&self.matrix[pos.row][pos.column])
    }

    pub fn item_by_id_mut(&mut self, id: ItemId) -> Option<&mut BoardItem> {
        if self.complexes.contains_key(&id) {
            return self.complexes.get_mut(&id);
        }
        let pos = *self.locations.get(&id)?;
        Some(&mut self.matrix[pos.row][pos.column])
    }

    /// A fresh Void carrying the board's void glyph (or sprixel).
    pub fn generate_void_cell(&self) -> BoardItem {
        match &self.ui_board_void_cell_sprixel {
            Some(sprixel) => BoardItem::void(&sprixel.model).with_sprixel(sprixel.clone()),
            None => BoardItem::void(&self.ui_board_void_cell),
        }
    }

    // ── Registration bookkeeping ──

    fn register_item(&mut self, id: ItemId, row: usize, column: usize, movable: bool, immovable: bool) {
        self.locations.insert(id, Position::new(row, column));
        if movable {
            self.movables.insert(id);
        } else if immovable {
            self.immovables.insert(id);
        }
    }

    fn unregister_item(&mut self, id: ItemId) {
        self.locations.remove(&id);
        self.movables.remove(&id);
        self.immovables.remove(&id);
    }

    // ── Placement ──

    /// Insert an item at (row, column), overwriting whatever is there.
    /// An immovable occupant that is both restorable and overlappable
    /// is parked in the overlap layer first and comes back when the
    /// cell frees up. Returns the item's id for later reference.
    pub fn place_item(&mut self, item: BoardItem, row: usize, column: usize) -> Result<ItemId> {
        if !self.in_bounds(row, column) {
            return Err(self.out_of_bounds_error(row, column));
        }
        if matches!(item.kind, ItemKind::Complex(_)) {
            self.place_complex(item, row, column)
        } else {
            self.place_simple(item, row, column)
        }
    }

    fn place_simple(&mut self, mut item: BoardItem, row: usize, column: usize) -> Result<ItemId> {
        let id = item.id();
        let movable = item.is_movable();
        let immovable = item.is_immovable();
        let trackable = !item.is_void() && !matches!(item.kind, ItemKind::ComplexPart { .. });

        let dest = &self.matrix[row][column];
        let park_old = !item.is_void()
            && dest.is_immovable()
            && dest.restorable()
            && dest.overlappable();
        if park_old {
            // A transparent mover adopts the background of what it
            // stands on; an unset background stays unset.
            if let (Some(sprixel), Some(under)) = (item.sprixel.as_mut(), dest.sprixel.as_ref()) {
                if sprixel.is_bg_transparent && under.bg_color.is_some() {
                    sprixel.bg_color = under.bg_color;
                }
            }
        }

        item.pos = Some(Position::new(row, column));
        let old = std::mem::replace(&mut self.matrix[row][column], item);
        if park_old {
            self.unregister_item(old.id());
            self.overlapped[row][column] = Some(old);
        } else if !old.is_void() {
            self.unregister_item(old.id());
        }
        if trackable {
            self.register_item(id, row, column, movable, immovable);
        }
        Ok(id)
    }

    fn place_complex(&mut self, mut item: BoardItem, row: usize, column: usize) -> Result<ItemId> {
        let id = item.id();
        let (width, height, movable, cells) = match item.complex_stats() {
            Some(c) => (c.size.0, c.size.1, c.stats.is_some(), c.cells.clone()),
            None => return Err(Error::InvalidType("not a complex item".to_string())),
        };
        if row + height > self.height() || column + width > self.width() {
            return Err(self.out_of_bounds_error(row + height - 1, column + width - 1));
        }
        for (orow, line) in cells.iter().enumerate() {
            for (ocol, cell) in line.iter().enumerate() {
                if let Some(sprixel) = cell {
                    let part = BoardItem::complex_part(id, sprixel.clone());
                    self.place_simple(part, row + orow, column + ocol)?;
                }
            }
        }
        item.pos = Some(Position::new(row, column));
        self.complexes.insert(id, item);
        self.register_item(id, row, column, movable, !movable);
        Ok(id)
    }

    // ── Removal ──

    /// Remove the occupant of (row, column) and repair the cell: the
    /// parked overlap item comes back if there is one, a fresh Void
    /// otherwise. The occupant is returned to the caller.
    pub fn take_item(&mut self, row: usize, column: usize) -> Result<BoardItem> {
        if !self.in_bounds(row, column) {
            return Err(self.out_of_bounds_error(row, column));
        }
        let mut replacement = match self.overlapped[row][column].take() {
            Some(parked) => parked,
            None => self.generate_void_cell(),
        };
        replacement.pos = Some(Position::new(row, column));
        let rep_id = replacement.id();
        let rep_void = replacement.is_void();
        let rep_movable = replacement.is_movable();
        let rep_immovable = replacement.is_immovable();
        let old = std::mem::replace(&mut self.matrix[row][column], replacement);
        self.unregister_item(old.id());
        if !rep_void {
            self.register_item(rep_id, row, column, rep_movable, rep_immovable);
        }
        Ok(old)
    }

    /// `take_item` for callers that only want the cell gone.
    pub fn clear_cell(&mut self, row: usize, column: usize) -> Result<()> {
        self.take_item(row, column).map(|_| ())
    }

    // ── Movement ──

    /// Move an item one resolution step: activation, pickup, overlap
    /// and blocking are all decided here. Out-of-bounds destinations
    /// and blocked cells refuse silently; a non-movable item is an
    /// error.
    pub fn move_item(&mut self, id: ItemId, heading: impl Into<Heading>, step: usize) -> Result<()> {
        let (is_complex, can_move, name) = match self.item_by_id(id) {
            Some(item) => (
                matches!(item.kind, ItemKind::Complex(_)),
                item.can_move(),
                item.name.clone(),
            ),
            None => {
                return Err(Error::NotMovable(format!("item #{id} is not on this board")));
            }
        };
        if !can_move {
            return Err(Error::NotMovable(name));
        }
        let (dr, dc) = heading.into().delta(step);
        if is_complex {
            self.move_complex(id, dr, dc)
        } else {
            self.move_simple(id, dr, dc)
        }
    }

    fn move_simple(&mut self, id: ItemId, dr: i64, dc: i64) -> Result<()> {
        let src = match self.position_of(id) {
            Some(pos) => pos,
            None => return Ok(()),
        };
        let mover_class = self.matrix[src.row][src.column].mover_class();
        let dest_pos = match src.offset(dr, dc, self.width(), self.height()) {
            Some(pos) => pos,
            None => return Ok(()),
        };
        if dest_pos == src {
            return Ok(());
        }

        // Activation first; it may mutate the board but does not by
        // itself block or allow the move.
        {
            let dest = &self.matrix[dest_pos.row][dest_pos.column];
            if dest.is_actionable() && dest.authorizes(mover_class) {
                self.run_activation(dest_pos.row, dest_pos.column);
            }
        }

        // Pickup: a non-overlappable pickable in front of a mover with
        // room in its inventory is consumed, freeing the cell.
        {
            let dest = &self.matrix[dest_pos.row][dest_pos.column];
            if !dest.overlappable() && dest.pickable() {
                let fits = self.matrix[src.row][src.column]
                    .inventory()
                    .map_or(false, |inventory| inventory.can_fit(dest));
                if fits {
                    let picked = self.take_item(dest_pos.row, dest_pos.column)?;
                    if let Some(inventory) = self.matrix[src.row][src.column].inventory_mut() {
                        // Capacity and pickability were checked above.
                        let _ = inventory.add_item(picked);
                    }
                }
            }
        }

        if !self.matrix[dest_pos.row][dest_pos.column].overlappable() {
            return Ok(()); // blocked
        }

        // Pull the mover out, repair its cell, drop it at the target.
        let filler = self.generate_void_cell();
        let mut mover = std::mem::replace(&mut self.matrix[src.row][src.column], filler);
        self.matrix[src.row][src.column].pos = Some(src);
        mover.pos = None;
        self.unregister_item(id);
        if let Some(parked) = self.overlapped[src.row][src.column].take() {
            if parked.pos != Some(dest_pos) {
                let pid = parked.id();
                let p_movable = parked.is_movable();
                let p_immovable = parked.is_immovable();
                let mut parked = parked;
                parked.pos = Some(src);
                self.matrix[src.row][src.column] = parked;
                self.register_item(pid, src.row, src.column, p_movable, p_immovable);
            } else {
                // The parked item claims the very cell we are entering;
                // leave it parked and keep the fresh Void at the source.
                self.overlapped[src.row][src.column] = Some(parked);
            }
        }
        self.place_simple(mover, dest_pos.row, dest_pos.column)?;
        Ok(())
    }

    fn move_complex(&mut self, id: ItemId, dr: i64, dc: i64) -> Result<()> {
        let root_pos = match self.position_of(id) {
            Some(pos) => pos,
            None => return Ok(()),
        };
        let (width, height, mover_class, has_inventory) = match self.complexes.get(&id) {
            Some(root) => match root.complex_stats() {
                Some(c) => (c.size.0, c.size.1, c.mover_class, root.has_inventory()),
                None => return Ok(()),
            },
            None => return Ok(()),
        };
        let new_row = root_pos.row as i64 + dr;
        let new_column = root_pos.column as i64 + dc;
        if new_row < 0
            || new_column < 0
            || new_row + height as i64 > self.height() as i64
            || new_column + width as i64 > self.width() as i64
        {
            return Ok(());
        }
        let (new_row, new_column) = (new_row as usize, new_column as usize);

        let mut can_draw = true;
        'scan: for orow in 0..height {
            for ocol in 0..width {
                let (cr, cc) = (new_row + orow, new_column + ocol);
                if self.belongs_to(cr, cc, id) {
                    continue;
                }
                {
                    let dest = &self.matrix[cr][cc];
                    if dest.is_actionable() && dest.authorizes(mover_class) {
                        self.run_activation(cr, cc);
                    }
                }
                {
                    let dest = &self.matrix[cr][cc];
                    if !dest.overlappable() && dest.pickable() && has_inventory {
                        let fits = self
                            .complexes
                            .get(&id)
                            .and_then(|root| root.inventory())
                            .map_or(false, |inventory| inventory.can_fit(dest));
                        if fits {
                            let picked = self.take_item(cr, cc)?;
                            if let Some(inventory) =
                                self.complexes.get_mut(&id).and_then(|root| root.inventory_mut())
                            {
                                let _ = inventory.add_item(picked);
                            }
                        }
                    }
                }
                if !self.matrix[cr][cc].overlappable() && !self.belongs_to(cr, cc, id) {
                    can_draw = false;
                    break 'scan;
                }
            }
        }
        if can_draw {
            let root = self.extract_complex(id)?;
            self.place_item(root, new_row, new_column)?;
        }
        Ok(())
    }

    fn belongs_to(&self, row: usize, column: usize, root_id: ItemId) -> bool {
        matches!(&self.matrix[row][column].kind, ItemKind::ComplexPart { root } if *root == root_id)
    }

    /// Lift a complex item off the board: every part cell is repaired
    /// (overlap restored or Void placed) and the root is handed back.
    fn extract_complex(&mut self, id: ItemId) -> Result<BoardItem> {
        let root_pos = self
            .position_of(id)
            .ok_or_else(|| Error::InvalidType(format!("complex item #{id} is not on this board")))?;
        let (width, height) = match self.complexes.get(&id).and_then(|root| root.complex_stats()) {
            Some(c) => c.size,
            None => return Err(Error::InvalidType(format!("item #{id} is not a complex item"))),
        };
        for orow in 0..height {
            for ocol in 0..width {
                let (cr, cc) = (root_pos.row + orow, root_pos.column + ocol);
                if self.belongs_to(cr, cc, id) {
                    let _ = self.take_item(cr, cc)?;
                }
            }
        }
        self.unregister_item(id);
        self.complexes
            .remove(&id)
            .ok_or_else(|| Error::InvalidType(format!("complex item #{id} vanished mid-move")))
    }

    // ── Activation ──

    /// Run an actionable structure's callback, if any. The callback is
    /// taken out for the duration of the call so it can freely mutate
    /// the board, then put back if the structure is still around.
    pub fn activate(&mut self, row: usize, column: usize) -> Result<()> {
        if !self.in_bounds(row, column) {
            return Err(self.out_of_bounds_error(row, column));
        }
        self.run_activation(row, column);
        Ok(())
    }

    fn run_activation(&mut self, row: usize, column: usize) {
        let (id, callback) = {
            let item = &mut self.matrix[row][column];
            let id = item.id();
            match item.take_action() {
                Some(callback) => (id, callback),
                None => return,
            }
        };
        let mut callback = callback;
        callback(&mut *self);
        if let Some(item) = self.item_by_id_mut(id) {
            item.put_action(callback);
        }
    }

    // ── Queries ──

    /// Non-void cells within the Chebyshev square of the given radius
    /// around a position, excluding the center, in row-major order.
    pub fn neighbors_of(&self, center: Position, radius: usize) -> Vec<Position> {
        let r = radius as i64;
        let mut found = Vec::new();
        for dr in -r..=r {
            for dc in -r..=r {
                if dr == 0 && dc == 0 {
                    continue;
                }
                if let Some(pos) = center.offset(dr, dc, self.width(), self.height()) {
                    if !self.matrix[pos.row][pos.column].is_void() {
                        found.push(pos);
                    }
                }
            }
        }
        found
    }

    pub fn get_movables(&self) -> Vec<&BoardItem> {
        self.collect_sorted(&self.movables)
    }

    pub fn get_immovables(&self) -> Vec<&BoardItem> {
        self.collect_sorted(&self.immovables)
    }

    /// Movables matching every `(attribute, substring)` filter.
    /// Attributes: "name", "type", "model".
    pub fn get_movables_filtered(&self, filters: &[(&str, &str)]) -> Vec<&BoardItem> {
        self.get_movables()
            .into_iter()
            .filter(|item| Board::matches_filters(item, filters))
            .collect()
    }

    pub fn get_immovables_filtered(&self, filters: &[(&str, &str)]) -> Vec<&BoardItem> {
        self.get_immovables()
            .into_iter()
            .filter(|item| Board::matches_filters(item, filters))
            .collect()
    }

    fn collect_sorted(&self, ids: &HashSet<ItemId>) -> Vec<&BoardItem> {
        let mut sorted: Vec<ItemId> = ids.iter().copied().collect();
        sorted.sort_unstable();
        sorted.into_iter().filter_map(|id| self.item_by_id(id)).collect()
    }

    fn matches_filters(item: &BoardItem, filters: &[(&str, &str)]) -> bool {
        filters.iter().all(|(attribute, needle)| match *attribute {
            "name" => item.name.contains(needle),
            "type" => item.item_type.contains(needle),
            "model" => item.model.contains(needle),
            _ => false,
        })
    }

    // ── Display ──

    /// Print the whole board, bordered, to any writer.
    pub fn display(&self, out: &mut impl Write) -> Result<()> {
        self.render_window(out, 0, self.height(), 0, self.width(), true, true, true, true)
    }

    /// Print a window of `2*row_radius x 2*column_radius` cells
    /// centered on an item, clamped to the board. Border segments
    /// appear only where the window touches the board edge. A window
    /// that covers the whole board falls back to `display`.
    pub fn display_around(
        &self,
        out: &mut impl Write,
        id: ItemId,
        row_radius: usize,
        column_radius: usize,
    ) -> Result<()> {
        let pos = self
            .position_of(id)
            .ok_or_else(|| Error::InvalidType(format!("item #{id} is not on this board")))?;
        // Complex items are centered on the middle of their footprint.
        let center = match self.item_by_id(id).and_then(|item| item.complex_stats()) {
            Some(c) => Position::new(pos.row + c.size.1 / 2, pos.column + c.size.0 / 2),
            None => pos,
        };
        if row_radius * 2 >= self.height() && column_radius * 2 >= self.width() {
            return self.display(out);
        }
        let row_start = center.row.saturating_sub(row_radius);
        let row_end = (center.row + row_radius).min(self.height());
        let column_start = center.column.saturating_sub(column_radius);
        let column_end = (center.column + column_radius).min(self.width());
        self.render_window(
            out,
            row_start,
            row_end,
            column_start,
            column_end,
            row_start == 0,
            row_end == self.height(),
            column_start == 0,
            column_end == self.width(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn render_window(
        &self,
        out: &mut impl Write,
        row_start: usize,
        row_end: usize,
        column_start: usize,
        column_end: usize,
        top: bool,
        bottom: bool,
        left: bool,
        right: bool,
    ) -> Result<()> {
        let border_len = (column_end - column_start) + left as usize + right as usize;
        if top {
            for _ in 0..border_len {
                queue!(out, Print(&self.ui_border_top))?;
            }
            queue!(out, Print("\n"))?;
        }
        for row in row_start..row_end {
            if left {
                queue!(out, Print(&self.ui_border_left))?;
            }
            for column in column_start..column_end {
                let item = &self.matrix[row][column];
                match &item.sprixel {
                    Some(sprixel) => screen::emit_sprixel(out, sprixel)?,
                    None => queue!(out, Print(&item.model))?,
                }
            }
            if right {
                queue!(out, Print(&self.ui_border_right))?;
            }
            queue!(out, Print("\n"))?;
        }
        if bottom {
            for _ in 0..border_len {
                queue!(out, Print(&self.ui_border_bottom))?;
            }
            queue!(out, Print("\n"))?;
        }
        out.flush()?;
        Ok(())
    }

    // ── Per-tick helpers ──

    /// Advance one animation frame on every animated item of the
    /// visible layer.
    pub fn animate_all(&mut self) {
        for line in self.matrix.iter_mut() {
            for item in line.iter_mut() {
                if let Some(animation) = item.animation.as_mut() {
                    let frame = animation.next_frame().clone();
                    item.model = frame.model.clone();
                    item.sprixel = Some(frame);
                }
            }
        }
    }

    // ── Test support ──

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        for row in 0..self.height() {
            for column in 0..self.width() {
                let item = &self.matrix[row][column];
                // Every cell is occupied and knows where it is.
                assert_eq!(item.pos, Some(Position::new(row, column)));
                if let Some(parked) = &self.overlapped[row][column] {
                    assert!(item.is_movable(), "overlap slot under a non-movable");
                    assert!(parked.is_immovable() && parked.restorable() && parked.overlappable());
                }
                if !item.is_void() && !matches!(item.kind, ItemKind::ComplexPart { .. }) {
                    assert_eq!(self.locations.get(&item.id()), Some(&Position::new(row, column)));
                    if item.is_movable() {
                        assert!(self.movables.contains(&item.id()));
                    } else if item.is_immovable() {
                        assert!(self.immovables.contains(&item.id()));
                    }
                }
            }
        }
        for id in &self.movables {
            let item = self.item_by_id(*id).expect("movable id without item");
            assert!(item.is_movable());
        }
        for id in &self.immovables {
            let item = self.item_by_id(*id).expect("immovable id without item");
            assert!(item.is_immovable() || item.complex_stats().is_some());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::MovableStats;

    fn board(width: usize, height: usize) -> Board {
        Board::new(BoardSettings {
            size: (width, height),
            ..BoardSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn construction_fills_every_cell_with_void() {
        let b = board(5, 4);
        for row in 0..4 {
            for column in 0..5 {
                assert!(b.item(row, column).unwrap().is_void());
            }
        }
        b.check_invariants();
    }

    #[test]
    fn sanity_check_rejects_bad_settings() {
        let err = Board::new(BoardSettings { size: (0, 10), ..BoardSettings::default() }).unwrap_err();
        assert_eq!(err.code(), "sanity_check");
        let err = Board::new(BoardSettings {
            ui_border_left: String::new(),
            ..BoardSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.code(), "sanity_check");
    }

    #[test]
    fn place_out_of_bounds_fails() {
        let mut b = board(5, 5);
        let err = b.place_item(BoardItem::wall("w", "#"), 5, 0).unwrap_err();
        assert_eq!(err.code(), "out_of_board_bound");
    }

    #[test]
    fn overlap_restore_round_trip() {
        let mut b = board(5, 5);
        b.place_item(BoardItem::door("door", "+"), 2, 2).unwrap();
        let player = b.place_item(BoardItem::player("hero", "@"), 2, 1).unwrap();

        b.move_item(player, Direction::Right, 1).unwrap();
        assert_eq!(b.item(2, 2).unwrap().name, "hero");
        assert_eq!(b.overlapped_item(2, 2).unwrap().name, "door");
        assert!(b.item(2, 1).unwrap().is_void());
        b.check_invariants();

        b.move_item(player, Direction::Right, 1).unwrap();
        assert_eq!(b.item(2, 2).unwrap().name, "door");
        assert_eq!(b.item(2, 3).unwrap().name, "hero");
        assert!(b.overlapped_item(2, 2).is_none());
        b.check_invariants();
    }

    #[test]
    fn wall_blocks_movement() {
        let mut b = board(5, 5);
        b.place_item(BoardItem::wall("wall", "#"), 0, 1).unwrap();
        let player = b.place_item(BoardItem::player("hero", "@"), 0, 0).unwrap();
        b.move_item(player, Direction::Right, 1).unwrap();
        assert_eq!(b.position_of(player), Some(Position::new(0, 0)));
        assert_eq!(b.item(0, 1).unwrap().name, "wall");
        b.check_invariants();
    }

    #[test]
    fn out_of_bounds_move_is_silent() {
        let mut b = board(5, 5);
        let player = b.place_item(BoardItem::player("hero", "@"), 0, 0).unwrap();
        b.move_item(player, Direction::Up, 1).unwrap();
        assert_eq!(b.position_of(player), Some(Position::new(0, 0)));
        b.check_invariants();
    }

    #[test]
    fn moving_a_wall_is_an_error() {
        let mut b = board(5, 5);
        let wall = b.place_item(BoardItem::wall("wall", "#"), 1, 1).unwrap();
        let err = b.move_item(wall, Direction::Down, 1).unwrap_err();
        assert_eq!(err.code(), "not_movable");
    }

    #[test]
    fn pickup_consumes_the_treasure() {
        let mut b = board(5, 5);
        b.place_item(
            BoardItem::treasure("gold", "$", 50).with_inventory_space(2),
            0,
            1,
        )
        .unwrap();
        let player = b.place_item(BoardItem::player("hero", "@"), 0, 0).unwrap();

        b.move_item(player, Direction::Right, 1).unwrap();
        assert_eq!(b.position_of(player), Some(Position::new(0, 1)));
        let hero = b.item(0, 1).unwrap();
        assert_eq!(hero.inventory().unwrap().size(), 2);
        assert_eq!(hero.inventory().unwrap().value(), 50);
        assert!(b.item(0, 0).unwrap().is_void());
        b.check_invariants();
    }

    #[test]
    fn full_inventory_makes_treasure_block() {
        let mut b = board(5, 5);
        b.place_item(
            BoardItem::treasure("idol", "$", 500).with_inventory_space(99),
            0,
            1,
        )
        .unwrap();
        let player = b.place_item(BoardItem::player("hero", "@"), 0, 0).unwrap();
        b.move_item(player, Direction::Right, 1).unwrap();
        // Too big to carry: it stays put and so does the player.
        assert_eq!(b.position_of(player), Some(Position::new(0, 0)));
        assert_eq!(b.item(0, 1).unwrap().name, "idol");
        b.check_invariants();
    }

    #[test]
    fn diagonal_moves_and_steps() {
        let mut b = board(10, 10);
        let player = b.place_item(BoardItem::player("hero", "@"), 5, 5).unwrap();
        b.move_item(player, Direction::DrDown, 2).unwrap();
        assert_eq!(b.position_of(player), Some(Position::new(7, 7)));
        b.move_item(player, Direction::DlUp, 1).unwrap();
        assert_eq!(b.position_of(player), Some(Position::new(6, 6)));
    }

    #[test]
    fn vector_headings_round_to_cells() {
        let mut b = board(10, 10);
        let player = b.place_item(BoardItem::player("hero", "@"), 5, 5).unwrap();
        // Under half a cell: rounds to no displacement.
        b.move_item(player, Vector2D::new(0.4, 0.4), 1).unwrap();
        assert_eq!(b.position_of(player), Some(Position::new(5, 5)));
        // Over half a cell: rounds to one.
        b.move_item(player, Vector2D::new(-0.6, 1.2), 1).unwrap();
        assert_eq!(b.position_of(player), Some(Position::new(4, 6)));
    }

    #[test]
    fn activation_fires_for_authorized_movers_only() {
        use crate::domain::direction::Permission;
        use std::cell::Cell;
        use std::rc::Rc;

        let mut b = board(5, 5);
        let fired = Rc::new(Cell::new(0));
        let mut lever = BoardItem::actionable("lever", "!", Permission::Player);
        let counter = Rc::clone(&fired);
        lever.set_action(Box::new(move |_board| {
            counter.set(counter.get() + 1);
        }));
        b.place_item(lever, 0, 1).unwrap();

        let npc = b.place_item(BoardItem::npc("mob", "x"), 1, 1).unwrap();
        b.move_item(npc, Direction::Up, 1).unwrap();
        assert_eq!(fired.get(), 0); // NPC not authorized

        let player = b.place_item(BoardItem::player("hero", "@"), 0, 0).unwrap();
        b.move_item(player, Direction::Right, 1).unwrap();
        assert_eq!(fired.get(), 1);
        // Actionable is overlappable: the player walked onto it.
        assert_eq!(b.position_of(player), Some(Position::new(0, 1)));
    }

    #[test]
    fn clear_cell_restores_parked_item() {
        let mut b = board(5, 5);
        b.place_item(BoardItem::door("door", "+"), 3, 3).unwrap();
        let npc = b.place_item(BoardItem::npc("mob", "x"), 3, 2).unwrap();
        b.move_item(npc, Direction::Right, 1).unwrap();
        assert_eq!(b.item(3, 3).unwrap().name, "mob");
        b.clear_cell(3, 3).unwrap();
        assert_eq!(b.item(3, 3).unwrap().name, "door");
        assert!(b.position_of(npc).is_none());
        b.check_invariants();
    }

    #[test]
    fn movable_sets_track_membership() {
        let mut b = board(5, 5);
        let wall = b.place_item(BoardItem::wall("wall", "#"), 0, 0).unwrap();
        let npc = b.place_item(BoardItem::npc("mob", "x"), 1, 1).unwrap();
        assert_eq!(b.get_movables().len(), 1);
        assert_eq!(b.get_immovables().len(), 1);
        assert_eq!(b.get_movables()[0].id(), npc);
        assert_eq!(b.get_immovables()[0].id(), wall);
        b.clear_cell(1, 1).unwrap();
        assert!(b.get_movables().is_empty());
        b.check_invariants();
    }

    #[test]
    fn filters_are_conjunctive_substrings() {
        let mut b = board(5, 5);
        b.place_item(BoardItem::npc("red guard", "x"), 0, 0).unwrap();
        b.place_item(BoardItem::npc("red scout", "s"), 1, 1).unwrap();
        b.place_item(BoardItem::npc("blue guard", "x"), 2, 2).unwrap();
        assert_eq!(b.get_movables_filtered(&[("name", "red")]).len(), 2);
        assert_eq!(b.get_movables_filtered(&[("name", "red"), ("model", "x")]).len(), 1);
        assert_eq!(b.get_movables_filtered(&[("color", "red")]).len(), 0);
    }

    #[test]
    fn neighbors_row_major_excluding_center() {
        let mut b = board(10, 10);
        b.place_item(BoardItem::wall("a", "#"), 3, 4).unwrap();
        b.place_item(BoardItem::wall("b", "#"), 4, 3).unwrap();
        b.place_item(BoardItem::wall("c", "#"), 3, 3).unwrap();
        let found = b.neighbors_of(Position::new(3, 3), 1);
        assert_eq!(found, vec![Position::new(3, 4), Position::new(4, 3)]);
    }

    #[test]
    fn display_draws_borders_and_cells() {
        let mut b = board(3, 2);
        b.place_item(BoardItem::wall("wall", "#"), 0, 1).unwrap();
        let mut out = Vec::new();
        b.display(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["-----", "| # |", "|   |", "-----"]);
    }

    #[test]
    fn display_around_clamps_and_trims_borders() {
        let mut b = board(9, 9);
        let player = b.place_item(BoardItem::player("hero", "@"), 4, 4).unwrap();
        let mut out = Vec::new();
        b.display_around(&mut out, player, 2, 2).unwrap();
        let text = String::from_utf8(out).unwrap();
        // Interior window: no border at all, 4 rows of 4 cells.
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|line| line.len() == 4));
        assert!(text.contains('@'));

        // Window pinned to the top-left corner keeps those borders.
        let mut corner = Vec::new();
        let scout = b.place_item(BoardItem::player("scout", "s"), 0, 0).unwrap();
        b.display_around(&mut corner, scout, 2, 2).unwrap();
        let text = String::from_utf8(corner).unwrap();
        assert!(text.starts_with("---"));
        assert!(text.lines().nth(1).unwrap().starts_with('|'));
    }

    #[test]
    fn complex_item_moves_atomically() {
        let cells = vec![
            vec![Some(Sprixel::from_model("[")), Some(Sprixel::from_model("]"))],
            vec![Some(Sprixel::from_model("[")), Some(Sprixel::from_model("]"))],
        ];
        let mut b = board(6, 6);
        let crate_id = b
            .place_item(
                BoardItem::complex("crate", cells, Some(MovableStats::default())),
                2,
                2,
            )
            .unwrap();
        assert_eq!(b.item(2, 2).unwrap().model, "[");
        assert_eq!(b.item(3, 3).unwrap().model, "]");

        b.move_item(crate_id, Direction::Right, 1).unwrap();
        assert_eq!(b.position_of(crate_id), Some(Position::new(2, 3)));
        assert!(b.item(2, 2).unwrap().is_void());
        assert_eq!(b.item(2, 4).unwrap().model, "]");

        // A wall in the projected footprint refuses the whole move.
        b.place_item(BoardItem::wall("wall", "#"), 3, 5).unwrap();
        b.move_item(crate_id, Direction::Right, 1).unwrap();
        assert_eq!(b.position_of(crate_id), Some(Position::new(2, 3)));

        // Off-board projection refuses too.
        b.move_item(crate_id, Direction::Up, 3).unwrap();
        assert_eq!(b.position_of(crate_id), Some(Position::new(2, 3)));
    }

    #[test]
    fn transparent_mover_adopts_background() {
        use crossterm::style::Color;

        let mut b = board(5, 5);
        let door = BoardItem::door("door", "+").with_sprixel(Sprixel::new(
            "+",
            None,
            Some(Color::Blue),
        ));
        b.place_item(door, 0, 1).unwrap();
        let ghost = BoardItem::player("ghost", "g")
            .with_sprixel(Sprixel::transparent("g", Some(Color::White)));
        let ghost = b.place_item(ghost, 0, 0).unwrap();
        b.move_item(ghost, Direction::Right, 1).unwrap();
        let standing = b.item(0, 1).unwrap();
        assert_eq!(standing.sprixel.as_ref().unwrap().bg_color, Some(Color::Blue));
    }
}
