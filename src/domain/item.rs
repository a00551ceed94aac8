/// Board items: everything that can occupy a cell.
///
/// One struct carries the common surface (name, glyph, position,
/// inventory footprint); the `ItemKind` sum type carries per-kind
/// state. Capability queries (pickable / overlappable / restorable)
/// are methods on the item so the semantics live in exactly one place.
///
/// Items are owned by the Board once placed. Everything else (the
/// Game, NPC and projectile rosters, host code) refers to them by
/// `ItemId` and resolves through the board. There are no parent
/// pointers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::actuator::{Actuator, ActuatorState};
use crate::domain::direction::{Permission, Position};
use crate::domain::inventory::Inventory;
use crate::domain::particle::ParticleStats;
use crate::sim::board::Board;
use crate::ui::sprixel::{Animation, Sprixel};

pub type ItemId = u64;

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

fn next_item_id() -> ItemId {
    NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed)
}

/// Invoked when a movable steps into an actionable structure.
pub type ActionCallback = Box<dyn FnMut(&mut Board)>;

/// Invoked when a projectile hits; receives the struck cells.
/// Fired at most once per projectile lifetime.
pub type HitCallback = Box<dyn FnMut(&mut Board, &[Position])>;

/// Actor class used by permission checks.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoverClass {
    Player,
    Npc,
    Other,
}

// ── Per-kind state ──

pub struct MovableStats {
    pub step: usize,
    pub actuator: Option<Box<dyn Actuator>>,
    pub hp: i64,
    pub max_hp: i64,
    pub remaining_lives: u32,
    pub attack_power: i64,
    pub inventory: Option<Inventory>,
}

impl Default for MovableStats {
    fn default() -> Self {
        MovableStats {
            step: 1,
            actuator: None,
            hp: 100,
            max_hp: 100,
            remaining_lives: 3,
            attack_power: 10,
            inventory: None,
        }
    }
}

pub struct ProjectileStats {
    pub step: usize,
    pub actuator: Option<Box<dyn Actuator>>,
    /// Remaining travel budget in cells. Signed: the actuation pipeline
    /// drives it below zero to mark the projectile as spent.
    pub range: i64,
    pub is_aoe: bool,
    pub aoe_radius: usize,
    pub hit_callback: Option<HitCallback>,
}

impl Default for ProjectileStats {
    fn default() -> Self {
        ProjectileStats {
            step: 1,
            actuator: None,
            range: 5,
            is_aoe: false,
            aoe_radius: 0,
            hit_callback: None,
        }
    }
}

/// A rectangular assembly occupying several cells at once. The board
/// stores the root off-matrix and fills the footprint with part
/// markers; the whole footprint moves atomically.
pub struct ComplexStats {
    /// (width, height) of the footprint.
    pub size: (usize, usize),
    /// Row-major sub-cells; None cells are holes in the footprint.
    pub cells: Vec<Vec<Option<Sprixel>>>,
    /// Present when the assembly can move.
    pub stats: Option<MovableStats>,
    /// Actor class for permission checks while moving.
    pub mover_class: MoverClass,
}

pub enum ItemKind {
    Void,
    Wall,
    Treasure,
    Door,
    GenericStructure {
        pickable: bool,
        overlappable: bool,
        restorable: bool,
    },
    ActionableStructure {
        perm: Permission,
        overlappable: bool,
        restorable: bool,
        action: Option<ActionCallback>,
    },
    Npc(MovableStats),
    Player(MovableStats),
    Projectile(ProjectileStats),
    Particle(ParticleStats),
    Complex(ComplexStats),
    /// One cell of a complex item's footprint, pointing back at the
    /// root stored by the board.
    ComplexPart { root: ItemId },
}

// ── BoardItem ──

pub struct BoardItem {
    id: ItemId,
    pub name: String,
    /// Free classification tag ("treasure", "wall", ...), used by
    /// filters and by host game logic. Not interpreted by the engine.
    pub item_type: String,
    pub model: String,
    pub sprixel: Option<Sprixel>,
    pub pos: Option<Position>,
    /// How many inventory cells this item takes when picked up.
    pub inventory_space: usize,
    pub value: Option<i64>,
    pub animation: Option<Animation>,
    pub kind: ItemKind,
}

impl BoardItem {
    fn base(name: &str, item_type: &str, model: &str, kind: ItemKind) -> Self {
        BoardItem {
            id: next_item_id(),
            name: name.to_string(),
            item_type: item_type.to_string(),
            model: model.to_string(),
            sprixel: None,
            pos: None,
            inventory_space: 1,
            value: None,
            animation: None,
            kind,
        }
    }

    // ── Constructors ──

    pub fn void(model: &str) -> Self {
        BoardItem::base("void", "void", model, ItemKind::Void)
    }

    pub fn wall(name: &str, model: &str) -> Self {
        BoardItem::base(name, "wall", model, ItemKind::Wall)
    }

    pub fn treasure(name: &str, model: &str, value: i64) -> Self {
        let mut item = BoardItem::base(name, "treasure", model, ItemKind::Treasure);
        item.value = Some(value);
        item
    }

    pub fn door(name: &str, model: &str) -> Self {
        BoardItem::base(name, "door", model, ItemKind::Door)
    }

    pub fn structure(
        name: &str,
        model: &str,
        pickable: bool,
        overlappable: bool,
        restorable: bool,
    ) -> Self {
        BoardItem::base(
            name,
            "generic_structure",
            model,
            ItemKind::GenericStructure { pickable, overlappable, restorable },
        )
    }

    pub fn actionable(name: &str, model: &str, perm: Permission) -> Self {
        BoardItem::base(
            name,
            "generic_actionable_structure",
            model,
            ItemKind::ActionableStructure {
                perm,
                overlappable: true,
                restorable: false,
                action: None,
            },
        )
    }

    pub fn npc(name: &str, model: &str) -> Self {
        BoardItem::base(name, "npc", model, ItemKind::Npc(MovableStats::default()))
    }

    pub fn player(name: &str, model: &str) -> Self {
        let mut stats = MovableStats::default();
        stats.inventory = Some(Inventory::new(10));
        BoardItem::base(name, "player", model, ItemKind::Player(stats))
    }

    pub fn projectile(name: &str, model: &str) -> Self {
        BoardItem::base(name, "projectile", model, ItemKind::Projectile(ProjectileStats::default()))
    }

    pub fn particle(model: &str) -> Self {
        BoardItem::base("particle", "base_particle", model, ItemKind::Particle(ParticleStats::default()))
    }

    pub fn complex(name: &str, cells: Vec<Vec<Option<Sprixel>>>, stats: Option<MovableStats>) -> Self {
        let height = cells.len();
        let width = cells.iter().map(|row| row.len()).max().unwrap_or(0);
        BoardItem::base(
            name,
            "complex_item",
            " ",
            ItemKind::Complex(ComplexStats {
                size: (width, height),
                cells,
                stats,
                mover_class: MoverClass::Other,
            }),
        )
    }

    pub(crate) fn complex_part(root: ItemId, sprixel: Sprixel) -> Self {
        let mut item = BoardItem::base("part", "complex_part", &sprixel.model.clone(), ItemKind::ComplexPart { root });
        item.sprixel = Some(sprixel);
        item
    }

    // ── Builder-style extras ──

    pub fn with_sprixel(mut self, sprixel: Sprixel) -> Self {
        self.model = sprixel.model.clone();
        self.sprixel = Some(sprixel);
        self
    }

    pub fn with_item_type(mut self, item_type: &str) -> Self {
        self.item_type = item_type.to_string();
        self
    }

    pub fn with_inventory_space(mut self, space: usize) -> Self {
        self.inventory_space = space;
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.animation = Some(animation);
        self
    }

    // ── Identity ──

    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Class name used by the persisted level format.
    pub fn class_name(&self) -> &'static str {
        match &self.kind {
            ItemKind::Void => "BoardItemVoid",
            ItemKind::Wall => "Wall",
            ItemKind::Treasure => "Treasure",
            ItemKind::Door => "Door",
            ItemKind::GenericStructure { .. } => "GenericStructure",
            ItemKind::ActionableStructure { .. } => "GenericActionableStructure",
            ItemKind::Npc(_) => "NPC",
            ItemKind::Player(_) => "Player",
            ItemKind::Projectile(_) => "Projectile",
            ItemKind::Particle(_) => "BaseParticle",
            ItemKind::Complex(_) => "BoardComplexItem",
            ItemKind::ComplexPart { .. } => "ComplexPart",
        }
    }

    // ── Capability queries ──

    pub fn pickable(&self) -> bool {
        match &self.kind {
            ItemKind::Treasure => true,
            ItemKind::GenericStructure { pickable, .. } => *pickable,
            _ => false,
        }
    }

    pub fn overlappable(&self) -> bool {
        match &self.kind {
            ItemKind::Void => true,
            ItemKind::Door => true,
            ItemKind::GenericStructure { overlappable, .. } => *overlappable,
            ItemKind::ActionableStructure { overlappable, .. } => *overlappable,
            ItemKind::Particle(_) => true,
            _ => false,
        }
    }

    pub fn restorable(&self) -> bool {
        match &self.kind {
            ItemKind::Door => true,
            ItemKind::GenericStructure { restorable, .. } => *restorable,
            ItemKind::ActionableStructure { restorable, .. } => *restorable,
            _ => false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, ItemKind::Void)
    }

    pub fn is_movable(&self) -> bool {
        match &self.kind {
            ItemKind::Npc(_) | ItemKind::Player(_) | ItemKind::Projectile(_) | ItemKind::Particle(_) => true,
            ItemKind::Complex(c) => c.stats.is_some(),
            _ => false,
        }
    }

    /// Immovable means "a real item that never moves": structures,
    /// walls, doors, treasures. Voids and complex-part markers are
    /// neither movable nor immovable.
    pub fn is_immovable(&self) -> bool {
        !self.is_movable()
            && !self.is_void()
            && !matches!(self.kind, ItemKind::ComplexPart { .. })
    }

    pub fn is_actionable(&self) -> bool {
        matches!(self.kind, ItemKind::ActionableStructure { .. })
    }

    pub fn can_move(&self) -> bool {
        self.is_movable()
    }

    /// Footprint in cells: 1 except for complex items.
    pub fn surface(&self) -> usize {
        match &self.kind {
            ItemKind::Complex(c) => c.size.0 * c.size.1,
            _ => 1,
        }
    }

    pub fn mover_class(&self) -> MoverClass {
        match &self.kind {
            ItemKind::Player(_) => MoverClass::Player,
            ItemKind::Npc(_) => MoverClass::Npc,
            ItemKind::Complex(c) => c.mover_class,
            _ => MoverClass::Other,
        }
    }

    /// Does this actionable structure accept activation from the given
    /// actor class? Always false on non-actionables.
    pub fn authorizes(&self, mover: MoverClass) -> bool {
        match &self.kind {
            ItemKind::ActionableStructure { perm, .. } => match perm {
                Permission::Player => mover == MoverClass::Player,
                Permission::Npc => mover == MoverClass::Npc,
                Permission::AllCharacters => {
                    matches!(mover, MoverClass::Player | MoverClass::Npc)
                }
                Permission::AllMovables => true,
            },
            _ => false,
        }
    }

    // ── Movable accessors ──

    pub fn stats(&self) -> Option<&MovableStats> {
        match &self.kind {
            ItemKind::Npc(s) | ItemKind::Player(s) => Some(s),
            ItemKind::Complex(c) => c.stats.as_ref(),
            _ => None,
        }
    }

    pub fn stats_mut(&mut self) -> Option<&mut MovableStats> {
        match &mut self.kind {
            ItemKind::Npc(s) | ItemKind::Player(s) => Some(s),
            ItemKind::Complex(c) => c.stats.as_mut(),
            _ => None,
        }
    }

    pub fn step(&self) -> usize {
        match &self.kind {
            ItemKind::Projectile(p) => p.step,
            _ => self.stats().map_or(1, |s| s.step),
        }
    }

    pub fn has_inventory(&self) -> bool {
        self.inventory().is_some()
    }

    pub fn inventory(&self) -> Option<&Inventory> {
        self.stats().and_then(|s| s.inventory.as_ref())
    }

    pub fn inventory_mut(&mut self) -> Option<&mut Inventory> {
        self.stats_mut().and_then(|s| s.inventory.as_mut())
    }

    pub fn actuator(&self) -> Option<&dyn Actuator> {
        match &self.kind {
            ItemKind::Projectile(p) => p.actuator.as_deref(),
            _ => self.stats().and_then(|s| s.actuator.as_deref()),
        }
    }

    pub fn actuator_mut(&mut self) -> Option<&mut (dyn Actuator + '_)> {
        let actuator = match &mut self.kind {
            ItemKind::Projectile(p) => p.actuator.as_mut(),
            ItemKind::Npc(s) | ItemKind::Player(s) => s.actuator.as_mut(),
            ItemKind::Complex(c) => c.stats.as_mut().and_then(|s| s.actuator.as_mut()),
            _ => None,
        };
        match actuator {
            Some(a) => Some(a.as_mut()),
            None => None,
        }
    }

    pub fn actuator_state(&self) -> Option<ActuatorState> {
        self.actuator().map(|a| a.state())
    }

    /// Attach an actuator. Returns false when the item kind cannot
    /// carry one.
    pub fn set_actuator(&mut self, actuator: Box<dyn Actuator>) -> bool {
        match &mut self.kind {
            ItemKind::Projectile(p) => {
                p.actuator = Some(actuator);
                true
            }
            ItemKind::Npc(s) | ItemKind::Player(s) => {
                s.actuator = Some(actuator);
                true
            }
            ItemKind::Complex(c) => match c.stats.as_mut() {
                Some(s) => {
                    s.actuator = Some(actuator);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    // ── Kind accessors ──

    pub fn projectile_stats(&self) -> Option<&ProjectileStats> {
        match &self.kind {
            ItemKind::Projectile(p) => Some(p),
            _ => None,
        }
    }

    pub fn projectile_stats_mut(&mut self) -> Option<&mut ProjectileStats> {
        match &mut self.kind {
            ItemKind::Projectile(p) => Some(p),
            _ => None,
        }
    }

    pub fn particle_stats(&self) -> Option<&ParticleStats> {
        match &self.kind {
            ItemKind::Particle(p) => Some(p),
            _ => None,
        }
    }

    pub fn particle_stats_mut(&mut self) -> Option<&mut ParticleStats> {
        match &mut self.kind {
            ItemKind::Particle(p) => Some(p),
            _ => None,
        }
    }

    pub fn complex_stats(&self) -> Option<&ComplexStats> {
        match &self.kind {
            ItemKind::Complex(c) => Some(c),
            _ => None,
        }
    }

    pub fn perm(&self) -> Option<Permission> {
        match &self.kind {
            ItemKind::ActionableStructure { perm, .. } => Some(*perm),
            _ => None,
        }
    }

    // ── Callbacks ──

    pub fn set_action(&mut self, callback: ActionCallback) -> bool {
        match &mut self.kind {
            ItemKind::ActionableStructure { action, .. } => {
                *action = Some(callback);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn take_action(&mut self) -> Option<ActionCallback> {
        match &mut self.kind {
            ItemKind::ActionableStructure { action, .. } => action.take(),
            _ => None,
        }
    }

    pub(crate) fn put_action(&mut self, callback: ActionCallback) {
        if let ItemKind::ActionableStructure { action, .. } = &mut self.kind {
            *action = Some(callback);
        }
    }

    pub fn set_hit_callback(&mut self, callback: HitCallback) -> bool {
        match &mut self.kind {
            ItemKind::Projectile(p) => {
                p.hit_callback = Some(callback);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn take_hit_callback(&mut self) -> Option<HitCallback> {
        match &mut self.kind {
            ItemKind::Projectile(p) => p.hit_callback.take(),
            _ => None,
        }
    }
}

impl fmt::Debug for BoardItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("class", &self.class_name())
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}
