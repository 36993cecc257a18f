#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy behavior: per-kind stats, the animation lifecycle and waypoint
//! movement along the two fixed routes.

use glam::Vec2;
use tower_duel_core::{AnimState, EnemyData, EnemyKind, Entity, EntityKind, PathId};

/// Seconds each animation frame is displayed.
pub const FRAME_DURATION: f32 = 0.1;

/// Distance below which an enemy counts as standing on its waypoint.
pub const WAYPOINT_THRESHOLD: f32 = 0.01;

const TOP_PATH: [Vec2; 4] = [
    Vec2::new(0.0, 2.0),
    Vec2::new(19.0, 2.0),
    Vec2::new(19.0, 7.0),
    Vec2::new(24.0, 7.0),
];

const BOTTOM_PATH: [Vec2; 4] = [
    Vec2::new(0.0, 15.0),
    Vec2::new(19.0, 15.0),
    Vec2::new(19.0, 10.0),
    Vec2::new(24.0, 10.0),
];

/// Base attributes of an enemy kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyStats {
    /// Health at spawn.
    pub health: f32,
    /// Movement speed in grid units per second.
    pub speed: f32,
    /// Gold granted on defeat.
    pub reward: u32,
}

/// Stats for the provided enemy kind.
#[must_use]
pub const fn stats(kind: EnemyKind) -> EnemyStats {
    match kind {
        EnemyKind::Ground => EnemyStats {
            health: 80.0,
            speed: 1.5,
            reward: 25,
        },
        EnemyKind::Flying => EnemyStats {
            health: 50.0,
            speed: 3.5,
            reward: 15,
        },
    }
}

/// Number of frames in the animation for the kind and state.
#[must_use]
pub const fn frame_count(kind: EnemyKind, anim: AnimState) -> u32 {
    match (kind, anim) {
        (EnemyKind::Ground, AnimState::Run) => 8,
        (EnemyKind::Ground, AnimState::Hit) => 5,
        (EnemyKind::Ground, AnimState::Die) => 15,
        (EnemyKind::Flying, AnimState::Run) => 8,
        (EnemyKind::Flying, AnimState::Hit) => 4,
        (EnemyKind::Flying, AnimState::Die) => 17,
    }
}

/// Waypoints of the route, in walking order.
#[must_use]
pub fn waypoints(path: PathId) -> &'static [Vec2] {
    match path {
        PathId::Top => &TOP_PATH,
        PathId::Bottom => &BOTTOM_PATH,
    }
}

/// Creates an enemy standing on the first waypoint of its route.
#[must_use]
pub fn spawn(kind: EnemyKind, path: PathId) -> Entity {
    let stats = stats(kind);
    let start = waypoints(path).first().copied().unwrap_or(Vec2::ZERO);
    Entity::spawn(
        start,
        EntityKind::Enemy(EnemyData {
            health: stats.health,
            max_health: stats.health,
            speed: stats.speed,
            waypoint_index: 0,
            path,
            gold_reward: stats.reward,
            kind,
            anim: AnimState::Run,
            current_frame: 0,
            frame_timer: 0.0,
        }),
    )
}

/// Switches the enemy into its hit reaction, restarting the animation.
pub fn flinch(enemy: &mut EnemyData) {
    enemy.anim = AnimState::Hit;
    enemy.current_frame = 0;
    enemy.frame_timer = 0.0;
}

/// Advances one enemy by `dt` seconds.
///
/// Dying enemies only animate and deactivate once the death animation
/// finishes. Living enemies with no health left start dying. Everything else
/// walks toward the next waypoint and deactivates after the last one.
pub fn update(entity: &mut Entity, dt: f32) {
    if !entity.active {
        return;
    }
    let position = entity.position;
    let EntityKind::Enemy(enemy) = &mut entity.kind else {
        return;
    };

    if animate(enemy, dt) == Animation::Finished {
        entity.active = false;
        return;
    }
    if enemy.is_dying() {
        return;
    }

    if enemy.health <= 0.0 {
        enemy.anim = AnimState::Die;
        enemy.current_frame = 0;
        enemy.frame_timer = 0.0;
        return;
    }

    let Some(target) = waypoints(enemy.path).get(enemy.waypoint_index).copied() else {
        entity.active = false;
        return;
    };

    let offset = target - position;
    if offset.length() < WAYPOINT_THRESHOLD {
        entity.position = target;
        enemy.waypoint_index += 1;
        return;
    }

    entity.position = step_toward(position, target, enemy.speed * dt);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Animation {
    Playing,
    Finished,
}

fn animate(enemy: &mut EnemyData, dt: f32) -> Animation {
    enemy.frame_timer += dt;
    if enemy.frame_timer < FRAME_DURATION {
        return Animation::Playing;
    }

    enemy.frame_timer = 0.0;
    enemy.current_frame += 1;
    let frames = frame_count(enemy.kind, enemy.anim);
    if enemy.current_frame < frames {
        return Animation::Playing;
    }

    match enemy.anim {
        AnimState::Die => {
            enemy.current_frame = frames - 1;
            return Animation::Finished;
        }
        AnimState::Hit => enemy.anim = AnimState::Run,
        AnimState::Run => {}
    }
    enemy.current_frame = 0;
    Animation::Playing
}

/// Moves along the axis with the larger remaining distance, landing exactly
/// on the target coordinate instead of overshooting it.
fn step_toward(position: Vec2, target: Vec2, distance: f32) -> Vec2 {
    let offset = target - position;
    let mut next = position;
    if offset.x.abs() > offset.y.abs() {
        if offset.x.abs() <= distance {
            next.x = target.x;
        } else {
            next.x += offset.x.signum() * distance;
        }
    } else if offset.y.abs() <= distance {
        next.y = target.y;
    } else {
        next.y += offset.y.signum() * distance;
    }
    next
}
