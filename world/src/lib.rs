#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative match state management for Tower Duel.
//!
//! A [`World`] bundles the entity store with the economy, wave counters and
//! tower spots of one match. Behavior systems receive it by mutable
//! reference; nothing here is global.

mod spots;
pub mod store;

pub use spots::{TowerSpot, SPOT_COUNT, SPOT_FOOTPRINT};
pub use store::{EntityStore, Removal};

use tower_duel_core::{EntityKind, Phase};

/// Gold available when a match starts.
pub const STARTING_MONEY: u32 = 250;

/// Lives available when a match starts.
pub const STARTING_LIVES: i32 = 100;

/// Economy, wave counters and lifecycle phase of a match.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchState {
    /// Gold available for building, upgrading and gifting.
    pub money: u32,
    /// Remaining lives; the match is lost at zero.
    pub lives: i32,
    /// Enemies killed so far.
    pub enemies_defeated: u32,
    /// Index of the wave in progress; `None` until the first wave begins.
    pub current_wave: Option<u32>,
    /// Quota enemies spawned for the current wave.
    pub enemies_spawned_in_wave: u32,
    /// Enemies currently on the field.
    pub enemies_alive: u32,
    /// Seconds until the next quota spawn.
    pub spawn_timer: f32,
    /// Seconds remaining in the current wave break.
    pub wave_break_timer: f32,
    /// Lifecycle phase.
    pub phase: Phase,
}

impl Default for MatchState {
    fn default() -> Self {
        Self {
            money: STARTING_MONEY,
            lives: STARTING_LIVES,
            enemies_defeated: 0,
            current_wave: None,
            enemies_spawned_in_wave: 0,
            enemies_alive: 0,
            spawn_timer: 0.0,
            wave_break_timer: 0.0,
            phase: Phase::Start,
        }
    }
}

/// Tally of enemies removed by a compaction pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Enemies removed after dying.
    pub defeated: u32,
    /// Enemies removed after reaching the end of their path.
    pub escaped: u32,
}

/// Represents the authoritative state of a single match.
#[derive(Debug)]
pub struct World {
    store: EntityStore,
    state: MatchState,
    spots: [TowerSpot; SPOT_COUNT],
    removals: Vec<Removal>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a match with starting economy and empty spots.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: EntityStore::new(),
            state: MatchState::default(),
            spots: spots::initial_spots(),
            removals: Vec::new(),
        }
    }

    /// Read-only access to the entity store.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Mutable access to the entity store.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// Read-only access to the match state.
    #[must_use]
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Mutable access to the match state.
    pub fn state_mut(&mut self) -> &mut MatchState {
        &mut self.state
    }

    /// Fixed tower spots in index order.
    #[must_use]
    pub fn spots(&self) -> &[TowerSpot; SPOT_COUNT] {
        &self.spots
    }

    /// Mutable tower spot at `index`.
    pub fn spot_mut(&mut self, index: usize) -> Option<&mut TowerSpot> {
        self.spots.get_mut(index)
    }

    /// Compacts the store and applies the economy effects of every removed
    /// enemy: defeats pay out their reward, escapes cost a life.
    pub fn remove_inactive(&mut self) -> CompactionReport {
        self.removals.clear();
        self.store.remove_inactive(&mut self.removals);

        let mut report = CompactionReport::default();
        for removal in &self.removals {
            self.state.enemies_alive = self.state.enemies_alive.saturating_sub(1);
            match *removal {
                Removal::Defeated { id, reward } => {
                    self.state.enemies_defeated = self.state.enemies_defeated.saturating_add(1);
                    self.state.money = self.state.money.saturating_add(reward);
                    report.defeated += 1;
                    tracing::debug!(enemy = id.get(), reward, "enemy defeated");
                }
                Removal::Escaped { id } => {
                    self.state.lives -= 1;
                    report.escaped += 1;
                    tracing::debug!(enemy = id.get(), lives = self.state.lives, "enemy escaped");
                }
            }
        }
        report
    }

    /// Clears every enemy and projectile and restores the starting economy.
    ///
    /// Towers and spot occupancy survive the reset.
    pub fn reset(&mut self) {
        for entity in self.store.iter_mut() {
            if !matches!(entity.kind, EntityKind::Tower(_)) {
                entity.active = false;
            }
        }
        self.removals.clear();
        self.store.remove_inactive(&mut self.removals);
        self.removals.clear();

        self.state = MatchState::default();
    }
}

/// Query functions that provide read-only access to the match.
pub mod query {
    use tower_duel_core::{Entity, EntityId, GridCell};

    use super::World;

    /// Active towers in store order.
    pub fn towers(world: &World) -> impl Iterator<Item = &Entity> {
        world
            .store
            .iter()
            .filter(|entity| entity.active && entity.as_tower().is_some())
    }

    /// Active enemies in store order, including those playing their death.
    pub fn enemies(world: &World) -> impl Iterator<Item = &Entity> {
        world
            .store
            .iter()
            .filter(|entity| entity.active && entity.as_enemy().is_some())
    }

    /// Active projectiles in store order.
    pub fn projectiles(world: &World) -> impl Iterator<Item = &Entity> {
        world
            .store
            .iter()
            .filter(|entity| entity.active && entity.as_projectile().is_some())
    }

    /// Entity with the provided identifier.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<&Entity> {
        world.store.find(id)
    }

    /// Tower whose footprint covers the cell.
    #[must_use]
    pub fn tower_at(world: &World, cell: GridCell) -> Option<&Entity> {
        towers(world).find(|entity| {
            entity.as_tower().is_some_and(|tower| {
                cell.is_within(
                    GridCell::containing(entity.position),
                    tower.width,
                    tower.height,
                )
            })
        })
    }

    /// Index of the tower spot whose footprint covers the cell.
    #[must_use]
    pub fn spot_at(world: &World, cell: GridCell) -> Option<usize> {
        world.spots.iter().position(|spot| spot.contains(cell))
    }

    /// Index of the spot a tower was built on.
    #[must_use]
    pub fn spot_of_tower(world: &World, tower: &Entity) -> Option<usize> {
        world
            .spots
            .iter()
            .position(|spot| spot.origin() == tower.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use tower_duel_core::{
        AnimState, EnemyData, EnemyKind, Entity, GridCell, PathId, TowerData, TowerLevel,
    };

    fn enemy(health: f32, reward: u32) -> Entity {
        Entity::spawn(
            Vec2::new(1.0, 2.0),
            EntityKind::Enemy(EnemyData {
                health,
                max_health: 80.0,
                speed: 1.5,
                waypoint_index: 1,
                path: PathId::Top,
                gold_reward: reward,
                kind: EnemyKind::Ground,
                anim: AnimState::Run,
                current_frame: 0,
                frame_timer: 0.0,
            }),
        )
    }

    fn tower_at(origin: Vec2) -> Entity {
        Entity::spawn(
            origin,
            EntityKind::Tower(TowerData {
                damage: 25.0,
                range: 5.0,
                fire_cooldown: 1.0,
                target: None,
                width: 4,
                height: 4,
                upgrade_cost: 200,
                level: TowerLevel::Level0,
            }),
        )
    }

    #[test]
    fn fresh_match_uses_starting_economy() {
        let world = World::new();
        assert_eq!(world.state().money, STARTING_MONEY);
        assert_eq!(world.state().lives, STARTING_LIVES);
        assert_eq!(world.state().current_wave, None);
        assert_eq!(world.state().phase, Phase::Start);
    }

    #[test]
    fn defeated_enemy_pays_reward_and_keeps_lives() {
        let mut world = World::new();
        let id = world.store_mut().add(enemy(-1.0, 25)).expect("add");
        world.state_mut().enemies_alive = 1;
        if let Some(entity) = world.store_mut().find_mut(id) {
            entity.active = false;
        }

        let report = world.remove_inactive();

        assert_eq!(report, CompactionReport { defeated: 1, escaped: 0 });
        assert_eq!(world.state().money, STARTING_MONEY + 25);
        assert_eq!(world.state().lives, STARTING_LIVES);
        assert_eq!(world.state().enemies_defeated, 1);
        assert_eq!(world.state().enemies_alive, 0);
    }

    #[test]
    fn escaped_enemy_costs_a_life_without_reward() {
        let mut world = World::new();
        let id = world.store_mut().add(enemy(40.0, 25)).expect("add");
        world.state_mut().enemies_alive = 1;
        if let Some(entity) = world.store_mut().find_mut(id) {
            entity.active = false;
        }

        let report = world.remove_inactive();

        assert_eq!(report, CompactionReport { defeated: 0, escaped: 1 });
        assert_eq!(world.state().money, STARTING_MONEY);
        assert_eq!(world.state().lives, STARTING_LIVES - 1);
        assert_eq!(world.state().enemies_defeated, 0);
    }

    #[test]
    fn reset_clears_enemies_but_keeps_towers() {
        let mut world = World::new();
        let tower = world.store_mut().add(tower_at(Vec2::new(5.0, 3.0))).expect("add");
        let _ = world.store_mut().add(enemy(80.0, 25)).expect("add");
        world.state_mut().money = 12;
        world.state_mut().lives = 3;
        world.state_mut().current_wave = Some(4);
        world.state_mut().phase = Phase::GameOver;

        world.reset();

        assert_eq!(world.store().len(), 1);
        assert!(query::entity(&world, tower).is_some());
        assert_eq!(world.state(), &MatchState::default());
    }

    #[test]
    fn tower_lookup_uses_footprint() {
        let mut world = World::new();
        let id = world.store_mut().add(tower_at(Vec2::new(15.0, 3.0))).expect("add");

        let hit = query::tower_at(&world, GridCell::new(18, 6)).map(Entity::id);
        assert_eq!(hit, Some(id));
        assert!(query::tower_at(&world, GridCell::new(19, 6)).is_none());

        let tower = query::entity(&world, id).copied().expect("tower");
        assert_eq!(query::spot_of_tower(&world, &tower), Some(2));
        assert_eq!(query::spot_at(&world, GridCell::new(16, 4)), Some(2));
        assert_eq!(query::spot_at(&world, GridCell::new(0, 0)), None);
    }
}
