#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tower Duel engine.
//!
//! This crate defines the value types that connect the authoritative match
//! state, the behavior systems, and the adapters. A match owns a store of
//! [`Entity`] values; systems read and mutate those entities through the
//! world crate and report rejected player actions with the typed errors
//! declared here. Adapters feed the simulation exclusively through
//! [`FrameInput`] snapshots.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Tower Duel.";

/// Unique identifier assigned to an entity by the store.
///
/// Identifiers are handed out monotonically and never reused within a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Whole grid cell addressed by the player's cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    column: i32,
    row: i32,
}

impl GridCell {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Cell containing the provided continuous grid position.
    #[must_use]
    pub fn containing(position: Vec2) -> Self {
        Self::new(position.x.floor() as i32, position.y.floor() as i32)
    }

    /// Reports whether the cell lies inside the rectangle anchored at `origin`.
    #[must_use]
    pub fn is_within(&self, origin: GridCell, width: u32, height: u32) -> bool {
        let dx = i64::from(self.column) - i64::from(origin.column);
        let dy = i64::from(self.row) - i64::from(origin.row);
        dx >= 0 && dy >= 0 && dx < i64::from(width) && dy < i64::from(height)
    }
}

/// Lifecycle phase of a single match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for the player to begin the first wave.
    Start,
    /// A wave is spawning or still has enemies on the field.
    Playing,
    /// Intermission between two waves.
    WaveBreak,
    /// The player ran out of lives.
    GameOver,
}

/// Upgrade tier of a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TowerLevel {
    /// Freshly built foundation that does not fire.
    Level0,
    /// Armed tower; the highest reachable level.
    Level1,
}

impl TowerLevel {
    /// Highest level a tower can reach.
    pub const MAX: Self = Self::Level1;

    /// Level reached by the next upgrade, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Level0 => Some(Self::Level1),
            Self::Level1 => None,
        }
    }

    /// Numeric tier used when the level crosses a process boundary.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Level0 => 0,
            Self::Level1 => 1,
        }
    }

    /// Resolves a numeric tier back into a level.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Level0),
            1 => Some(Self::Level1),
            _ => None,
        }
    }
}

/// Movement class of an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Slow, sturdy walker.
    Ground,
    /// Fast, fragile flyer.
    Flying,
}

/// Animation state machine driving an enemy's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimState {
    /// Moving along the path.
    Run,
    /// Flinching after taking non-lethal damage.
    Hit,
    /// Playing the death animation; removed once it completes.
    Die,
}

/// One of the two fixed enemy routes across the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathId {
    /// Upper route, always available.
    Top,
    /// Lower route, unlocked by later waves.
    Bottom,
}

impl PathId {
    /// Zero-based path index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Bottom => 1,
        }
    }
}

/// Tower-specific entity state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerData {
    /// Damage carried by each projectile.
    pub damage: f32,
    /// Targeting radius measured in grid units from the footprint centre.
    pub range: f32,
    /// Seconds remaining until the tower may fire again.
    pub fire_cooldown: f32,
    /// Enemy currently tracked by the tower.
    pub target: Option<EntityId>,
    /// Footprint width in grid cells.
    pub width: u32,
    /// Footprint height in grid cells.
    pub height: u32,
    /// Gold required for the next upgrade.
    pub upgrade_cost: u32,
    /// Current upgrade tier.
    pub level: TowerLevel,
}

impl TowerData {
    /// Midpoint of the tower footprint anchored at `origin`.
    #[must_use]
    pub fn center(&self, origin: Vec2) -> Vec2 {
        origin + Vec2::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }
}

/// Enemy-specific entity state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyData {
    /// Remaining health; non-positive values signal death.
    pub health: f32,
    /// Health at spawn time.
    pub max_health: f32,
    /// Movement speed in grid units per second.
    pub speed: f32,
    /// Index of the waypoint the enemy is walking toward.
    pub waypoint_index: usize,
    /// Route followed by the enemy.
    pub path: PathId,
    /// Gold granted when the enemy is defeated.
    pub gold_reward: u32,
    /// Movement class of the enemy.
    pub kind: EnemyKind,
    /// Current animation state.
    pub anim: AnimState,
    /// Frame index within the current animation.
    pub current_frame: u32,
    /// Time accumulated toward the next animation frame.
    pub frame_timer: f32,
}

impl EnemyData {
    /// Reports whether the enemy is playing its death animation.
    #[must_use]
    pub fn is_dying(&self) -> bool {
        self.anim == AnimState::Die
    }
}

/// Projectile-specific entity state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileData {
    /// Velocity in grid units per second.
    pub velocity: Vec2,
    /// Damage applied on impact.
    pub damage: f32,
    /// Tower that fired the projectile.
    pub owner: EntityId,
    /// Enemy the projectile is homing on.
    pub target: EntityId,
    /// Frame index within the flight animation.
    pub current_frame: u32,
    /// Time accumulated toward the next animation frame.
    pub frame_timer: f32,
}

/// Payload carried by an entity, discriminated by kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Stationary defensive structure.
    Tower(TowerData),
    /// Path-following attacker.
    Enemy(EnemyData),
    /// Homing shot fired by a tower.
    Projectile(ProjectileData),
}

/// Simulation object stored by a match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    /// Position in continuous grid coordinates.
    pub position: Vec2,
    /// Liveness flag; inactive entities are removed during compaction.
    pub active: bool,
    /// Kind-specific payload.
    pub kind: EntityKind,
}

impl Entity {
    /// Creates an active entity awaiting an identifier from the store.
    #[must_use]
    pub const fn spawn(position: Vec2, kind: EntityKind) -> Self {
        Self {
            id: EntityId::new(0),
            position,
            active: true,
            kind,
        }
    }

    /// Identifier assigned by the store; zero until the entity is stored.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The same entity carrying `id`, for stores assigning identifiers on
    /// insertion.
    #[must_use]
    pub const fn with_id(self, id: EntityId) -> Self {
        Self { id, ..self }
    }

    /// Tower payload, if the entity is a tower.
    #[must_use]
    pub fn as_tower(&self) -> Option<&TowerData> {
        match &self.kind {
            EntityKind::Tower(tower) => Some(tower),
            _ => None,
        }
    }

    /// Mutable tower payload, if the entity is a tower.
    pub fn as_tower_mut(&mut self) -> Option<&mut TowerData> {
        match &mut self.kind {
            EntityKind::Tower(tower) => Some(tower),
            _ => None,
        }
    }

    /// Enemy payload, if the entity is an enemy.
    #[must_use]
    pub fn as_enemy(&self) -> Option<&EnemyData> {
        match &self.kind {
            EntityKind::Enemy(enemy) => Some(enemy),
            _ => None,
        }
    }

    /// Mutable enemy payload, if the entity is an enemy.
    pub fn as_enemy_mut(&mut self) -> Option<&mut EnemyData> {
        match &mut self.kind {
            EntityKind::Enemy(enemy) => Some(enemy),
            _ => None,
        }
    }

    /// Projectile payload, if the entity is a projectile.
    #[must_use]
    pub fn as_projectile(&self) -> Option<&ProjectileData> {
        match &self.kind {
            EntityKind::Projectile(projectile) => Some(projectile),
            _ => None,
        }
    }

    /// Reports whether the entity is an active enemy that can still be hit.
    #[must_use]
    pub fn is_targetable_enemy(&self) -> bool {
        self.active && self.as_enemy().is_some_and(|enemy| !enemy.is_dying())
    }
}

/// Purchasable batch of enemies sent to the opponent in a duel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GiftTier {
    /// A single enemy.
    Single,
    /// A squad of five enemies.
    Squad,
    /// A horde of ten enemies.
    Horde,
}

impl GiftTier {
    /// Number of enemies delivered to the opponent.
    #[must_use]
    pub const fn count(self) -> u8 {
        match self {
            Self::Single => 1,
            Self::Squad => 5,
            Self::Horde => 10,
        }
    }

    /// Gold the sender pays for the gift.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Single => 50,
            Self::Squad => 200,
            Self::Horde => 350,
        }
    }
}

/// Snapshot of the player's input for a single frame.
///
/// Produced by the platform layer; the simulation only reads it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Seconds elapsed since the previous frame.
    pub dt: f32,
    /// Grid cell under the cursor, if the cursor is over the map.
    pub cursor: Option<GridCell>,
    /// Primary button was pressed this frame.
    pub click: bool,
    /// Confirm key (start, skip break, restart) was pressed this frame.
    pub confirm: bool,
    /// Gift purchase requested this frame.
    pub gift: Option<GiftTier>,
}

impl FrameInput {
    /// Input for a frame in which the player did nothing.
    #[must_use]
    pub fn idle(dt: f32) -> Self {
        Self {
            dt,
            ..Self::default()
        }
    }
}

/// Reasons the entity store refuses an insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum StoreError {
    /// The store already holds the maximum number of entities.
    #[error("entity store is full ({limit} entities)")]
    OutOfCapacity {
        /// Hard entity limit that was reached.
        limit: usize,
    },
}

/// Reasons a tower build request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum BuildError {
    /// The spot index does not name one of the fixed tower spots.
    #[error("tower spot {0} does not exist")]
    InvalidSpot(usize),
    /// A tower already stands on the spot.
    #[error("tower spot is already occupied")]
    Occupied,
    /// The player cannot afford the tower.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        /// Gold required.
        needed: u32,
        /// Gold available.
        available: u32,
    },
    /// The entity store refused the new tower.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reasons a tower upgrade request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum UpgradeError {
    /// No tower covers the requested location.
    #[error("no tower at the requested location")]
    NotFound,
    /// The tower is already at its highest level.
    #[error("tower is already at max level")]
    MaxLevel,
    /// The player cannot afford the upgrade.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        /// Gold required.
        needed: u32,
        /// Gold available.
        available: u32,
    },
}
