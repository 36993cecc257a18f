#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tower behavior: building on spots, upgrades, target acquisition and
//! firing.
//!
//! Build and upgrade requests validate everything before touching the match,
//! so a rejected request leaves money, spots and tower stats exactly as they
//! were.

use glam::Vec2;
use tower_duel_core::{
    BuildError, Entity, EntityId, EntityKind, GridCell, StoreError, TowerData, TowerLevel,
    UpgradeError,
};
use tower_duel_system_projectile as projectile;
use tower_duel_world::{query, EntityStore, World, SPOT_FOOTPRINT};

/// Gold deducted when a tower is built.
pub const TOWER_BUILD_COST: u32 = 100;

/// Combat attributes granted by a tower level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelStats {
    /// Damage carried by each projectile.
    pub damage: f32,
    /// Targeting radius in grid units.
    pub range: f32,
    /// Seconds between shots.
    pub fire_rate: f32,
}

/// Attributes of the provided tower level.
#[must_use]
pub const fn level_stats(level: TowerLevel) -> LevelStats {
    match level {
        TowerLevel::Level0 => LevelStats {
            damage: 25.0,
            range: 5.0,
            fire_rate: 1.0,
        },
        TowerLevel::Level1 => LevelStats {
            damage: 50.0,
            range: 8.0,
            fire_rate: 0.6,
        },
    }
}

/// Gold charged to leave level zero.
pub const UPGRADE_COST: u32 = 200;

/// Creates a fresh level-zero tower anchored at `origin`.
#[must_use]
pub fn init_tower(origin: Vec2) -> Entity {
    let stats = level_stats(TowerLevel::Level0);
    Entity::spawn(
        origin,
        EntityKind::Tower(TowerData {
            damage: stats.damage,
            range: stats.range,
            fire_cooldown: stats.fire_rate,
            target: None,
            width: SPOT_FOOTPRINT,
            height: SPOT_FOOTPRINT,
            upgrade_cost: UPGRADE_COST,
            level: TowerLevel::Level0,
        }),
    )
}

/// Builds a tower on the spot, charging [`TOWER_BUILD_COST`].
pub fn try_build(world: &mut World, spot: usize) -> Result<EntityId, BuildError> {
    let origin = free_spot(world, spot)?;
    let available = world.state().money;
    if available < TOWER_BUILD_COST {
        return Err(BuildError::InsufficientFunds {
            needed: TOWER_BUILD_COST,
            available,
        });
    }

    let id = occupy(world, spot, origin)?;
    world.state_mut().money -= TOWER_BUILD_COST;
    tracing::debug!(spot, tower = id.get(), "tower built");
    Ok(id)
}

/// Builds a tower on the spot without charging for it.
///
/// Used for builds another match already paid for; only the spot is checked.
pub fn place_tower(world: &mut World, spot: usize) -> Result<EntityId, BuildError> {
    let origin = free_spot(world, spot)?;
    let id = occupy(world, spot, origin)?;
    tracing::debug!(spot, tower = id.get(), "tower placed");
    Ok(id)
}

fn free_spot(world: &World, spot: usize) -> Result<Vec2, BuildError> {
    let target = world
        .spots()
        .get(spot)
        .copied()
        .ok_or(BuildError::InvalidSpot(spot))?;
    if target.occupied {
        return Err(BuildError::Occupied);
    }
    Ok(target.origin())
}

fn occupy(world: &mut World, spot: usize, origin: Vec2) -> Result<EntityId, StoreError> {
    let id = world.store_mut().add(init_tower(origin))?;
    if let Some(spot) = world.spot_mut(spot) {
        spot.occupied = true;
    }
    Ok(id)
}

/// Places the free level-zero tower every match starts with on spot zero.
pub fn place_starter_tower(world: &mut World) -> Result<EntityId, StoreError> {
    let origin = world.spots()[0].origin();
    occupy(world, 0, origin)
}

/// A successful tower upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Upgrade {
    /// Upgraded tower.
    pub tower: EntityId,
    /// Spot the tower stands on, if it was built on one.
    pub spot: Option<usize>,
    /// Level the tower reached.
    pub level: TowerLevel,
}

/// Upgrades the tower whose footprint covers `cell`.
pub fn upgrade_at(world: &mut World, cell: GridCell) -> Result<Upgrade, UpgradeError> {
    let (tower, level) = upgradable_at(world, cell)?;
    let cost = tower.as_tower().map_or(0, |data| data.upgrade_cost);
    let available = world.state().money;
    if available < cost {
        return Err(UpgradeError::InsufficientFunds {
            needed: cost,
            available,
        });
    }

    let upgrade = raise(world, &tower, level)?;
    world.state_mut().money -= cost;
    Ok(upgrade)
}

/// Upgrades the tower standing on the spot.
pub fn upgrade_spot(world: &mut World, spot: usize) -> Result<Upgrade, UpgradeError> {
    upgrade_at(world, spot_cell(world, spot)?)
}

/// Upgrades the tower standing on the spot without charging for it.
///
/// Used for upgrades another match already paid for; only the tower and its
/// level are checked.
pub fn promote_spot(world: &mut World, spot: usize) -> Result<Upgrade, UpgradeError> {
    let (tower, level) = upgradable_at(world, spot_cell(world, spot)?)?;
    raise(world, &tower, level)
}

fn spot_cell(world: &World, spot: usize) -> Result<GridCell, UpgradeError> {
    world
        .spots()
        .get(spot)
        .map(|spot| spot.cell())
        .ok_or(UpgradeError::NotFound)
}

fn upgradable_at(world: &World, cell: GridCell) -> Result<(Entity, TowerLevel), UpgradeError> {
    let tower = query::tower_at(world, cell)
        .copied()
        .ok_or(UpgradeError::NotFound)?;
    let level = tower
        .as_tower()
        .ok_or(UpgradeError::NotFound)?
        .level
        .next()
        .ok_or(UpgradeError::MaxLevel)?;
    Ok((tower, level))
}

fn raise(world: &mut World, tower: &Entity, level: TowerLevel) -> Result<Upgrade, UpgradeError> {
    let stats = level_stats(level);
    let upgraded = world
        .store_mut()
        .find_mut(tower.id())
        .and_then(Entity::as_tower_mut)
        .ok_or(UpgradeError::NotFound)?;
    upgraded.level = level;
    upgraded.damage = stats.damage;
    upgraded.range = stats.range;
    upgraded.fire_cooldown = stats.fire_rate;

    let spot = query::spot_of_tower(world, tower);
    tracing::debug!(tower = tower.id().get(), ?spot, ?level, "tower upgraded");
    Ok(Upgrade {
        tower: tower.id(),
        spot,
        level,
    })
}

/// Result of a primary click on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A tower under the cursor was upgraded.
    Upgraded(Upgrade),
    /// The tower under the cursor could not be upgraded.
    UpgradeRejected(UpgradeError),
    /// A tower was built on the spot under the cursor.
    Built {
        /// Spot that now holds the tower.
        spot: usize,
        /// The new tower.
        tower: EntityId,
    },
    /// The spot under the cursor could not be built on.
    BuildRejected {
        /// Spot that was clicked.
        spot: usize,
        /// Why the build failed.
        error: BuildError,
    },
    /// Nothing interactive lies under the cursor.
    Ignored,
}

/// Resolves a click: upgrade the tower under the cursor, otherwise build on
/// the spot under it.
pub fn handle_click(world: &mut World, cell: GridCell) -> ClickOutcome {
    match upgrade_at(world, cell) {
        Ok(upgrade) => ClickOutcome::Upgraded(upgrade),
        Err(UpgradeError::NotFound) => match query::spot_at(world, cell) {
            Some(spot) => match try_build(world, spot) {
                Ok(tower) => ClickOutcome::Built { spot, tower },
                Err(error) => ClickOutcome::BuildRejected { spot, error },
            },
            None => ClickOutcome::Ignored,
        },
        Err(error) => ClickOutcome::UpgradeRejected(error),
    }
}

/// Advances the tower stored at `index` by `dt` seconds.
///
/// Level-zero towers are inert. Armed towers track the nearest hittable enemy
/// strictly inside their range and fire once their cooldown has elapsed.
pub fn update(store: &mut EntityStore, index: usize, dt: f32) {
    let Some(entity) = store.get(index).copied() else {
        return;
    };
    if !entity.active {
        return;
    }
    let EntityKind::Tower(mut tower) = entity.kind else {
        return;
    };
    if tower.level == TowerLevel::Level0 {
        return;
    }

    if tower.fire_cooldown > 0.0 {
        tower.fire_cooldown -= dt;
    }

    let center = tower.center(entity.position);
    let nearest = nearest_enemy(store, center, tower.range);
    tower.target = nearest.map(|enemy| enemy.id());

    if let Some(enemy) = nearest {
        if tower.fire_cooldown <= 0.0 {
            let shot = projectile::create(center, enemy.position, tower.damage, entity.id(), enemy.id());
            if let Err(error) = store.add(shot) {
                tracing::warn!(%error, tower = entity.id().get(), "projectile refused");
            }
            tower.fire_cooldown = level_stats(tower.level).fire_rate;
        }
    }

    if let Some(slot) = store.get_mut(index) {
        slot.kind = EntityKind::Tower(tower);
    }
}

fn nearest_enemy(store: &EntityStore, center: Vec2, range: f32) -> Option<Entity> {
    let mut best = None;
    let mut best_distance = range * range;
    for candidate in store.iter().filter(|entity| entity.is_targetable_enemy()) {
        let distance = candidate.position.distance_squared(center);
        if distance < best_distance {
            best_distance = distance;
            best = Some(*candidate);
        }
    }
    best
}
