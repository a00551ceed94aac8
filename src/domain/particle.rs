/// Particles: short-lived cosmetic movables.
///
/// A particle is always overlappable and never pickable. It carries a
/// TTL and a set of allowed directions; the host loop asks for a
/// random direction each tick, moves it through the board like any
/// other movable, and reaps it when `tick_ttl` reports expiry.

use rand::seq::SliceRandom;

use crate::domain::direction::Direction;
use crate::domain::item::BoardItem;

pub struct ParticleStats {
    pub ttl: u32,
    pub directions: Vec<Direction>,
}

impl Default for ParticleStats {
    fn default() -> Self {
        ParticleStats {
            ttl: 5,
            directions: vec![Direction::Up, Direction::DlUp, Direction::DrUp],
        }
    }
}

impl BoardItem {
    /// Uniform pick from the particle's allowed directions. `NoDir`
    /// for non-particles or an empty direction set.
    pub fn random_direction(&self) -> Direction {
        self.particle_stats()
            .and_then(|p| p.directions.choose(&mut rand::thread_rng()))
            .copied()
            .unwrap_or(Direction::NoDir)
    }

    /// Decrement the TTL by one tick. Returns true when the particle
    /// just expired (TTL reached zero). False for non-particles.
    pub fn tick_ttl(&mut self) -> bool {
        match self.particle_stats_mut() {
            Some(p) => {
                if p.ttl > 0 {
                    p.ttl -= 1;
                }
                p.ttl == 0
            }
            None => false,
        }
    }
}
