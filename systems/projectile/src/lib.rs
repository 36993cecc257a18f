#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Homing projectiles fired by towers.

use glam::Vec2;
use tower_duel_core::{Entity, EntityId, EntityKind, ProjectileData};
use tower_duel_system_enemy as enemy;
use tower_duel_world::EntityStore;

/// Flight speed in grid units per second.
pub const PROJECTILE_SPEED: f32 = 10.0;

/// Frames in the looping flight animation.
pub const FLIGHT_FRAMES: u32 = 10;

/// Seconds each flight frame is displayed.
pub const FLIGHT_FRAME_DURATION: f32 = 0.05;

const MIN_DIRECTION_LENGTH: f32 = 0.001;
const COLLISION_DISTANCE_SQ: f32 = 1.0;
const NEARBY_HALF_EXTENT: f32 = 1.0;
const FIELD_MIN: f32 = -2.0;
const FIELD_MAX: Vec2 = Vec2::new(26.0, 20.0);

/// Creates a projectile at `start` heading toward `aim` at full speed.
#[must_use]
pub fn create(start: Vec2, aim: Vec2, damage: f32, owner: EntityId, target: EntityId) -> Entity {
    Entity::spawn(
        start,
        EntityKind::Projectile(ProjectileData {
            velocity: heading(aim - start) * PROJECTILE_SPEED,
            damage,
            owner,
            target,
            current_frame: 0,
            frame_timer: 0.0,
        }),
    )
}

fn heading(offset: Vec2) -> Vec2 {
    let length = offset.length();
    if length > MIN_DIRECTION_LENGTH {
        offset / length
    } else {
        offset
    }
}

/// Advances the projectile stored at `index` by `dt` seconds.
///
/// The projectile re-aims at its target while the target can still be hit,
/// expires when it leaves the field and damages at most one enemy: its target
/// when close enough, otherwise the first other enemy it touches.
pub fn update(store: &mut EntityStore, index: usize, dt: f32) {
    let Some(mut entity) = store.get(index).copied() else {
        return;
    };
    if !entity.active {
        return;
    }
    let EntityKind::Projectile(mut projectile) = entity.kind else {
        return;
    };

    projectile.frame_timer += dt;
    if projectile.frame_timer >= FLIGHT_FRAME_DURATION {
        projectile.frame_timer = 0.0;
        projectile.current_frame = (projectile.current_frame + 1) % FLIGHT_FRAMES;
    }

    let target_index = store
        .index_of(projectile.target)
        .filter(|&candidate| store.get(candidate).is_some_and(Entity::is_targetable_enemy));

    if let Some(target) = target_index.and_then(|candidate| store.get(candidate)) {
        let offset = target.position - entity.position;
        if offset.length() > MIN_DIRECTION_LENGTH {
            projectile.velocity = offset.normalize() * PROJECTILE_SPEED;
        }
    }

    entity.position += projectile.velocity * dt;
    entity.kind = EntityKind::Projectile(projectile);

    if out_of_field(entity.position) {
        entity.active = false;
        commit(store, index, entity);
        return;
    }

    let victim = target_index
        .filter(|&candidate| touches(store, candidate, entity.position))
        .or_else(|| nearby_enemy(store, projectile.target, entity.position));

    if let Some(victim) = victim {
        if let Some(hit) = store.get_mut(victim) {
            strike(hit, projectile.damage);
        }
        entity.active = false;
    }
    commit(store, index, entity);
}

fn commit(store: &mut EntityStore, index: usize, entity: Entity) {
    if let Some(slot) = store.get_mut(index) {
        *slot = entity;
    }
}

fn out_of_field(position: Vec2) -> bool {
    position.x < FIELD_MIN
        || position.y < FIELD_MIN
        || position.x > FIELD_MAX.x
        || position.y > FIELD_MAX.y
}

fn touches(store: &EntityStore, index: usize, position: Vec2) -> bool {
    store
        .get(index)
        .is_some_and(|enemy| enemy.position.distance_squared(position) < COLLISION_DISTANCE_SQ)
}

fn nearby_enemy(store: &EntityStore, locked: EntityId, position: Vec2) -> Option<usize> {
    store.iter().position(|candidate| {
        if candidate.id() == locked || !candidate.is_targetable_enemy() {
            return false;
        }
        let offset = candidate.position - position;
        offset.x.abs() <= NEARBY_HALF_EXTENT
            && offset.y.abs() <= NEARBY_HALF_EXTENT
            && offset.length_squared() < COLLISION_DISTANCE_SQ
    })
}

/// Applies damage, flinching the enemy if it survives.
fn strike(victim: &mut Entity, damage: f32) {
    let Some(data) = victim.as_enemy_mut() else {
        return;
    };
    data.health -= damage;
    if data.health > 0.0 {
        enemy::flinch(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_duel_core::{AnimState, EnemyKind, PathId};

    fn enemy_at(store: &mut EntityStore, position: Vec2) -> EntityId {
        let mut entity = enemy::spawn(EnemyKind::Ground, PathId::Top);
        entity.position = position;
        store.add(entity).expect("enemy")
    }

    fn health(store: &EntityStore, id: EntityId) -> f32 {
        store
            .find(id)
            .and_then(Entity::as_enemy)
            .map(|enemy| enemy.health)
            .expect("enemy")
    }

    #[test]
    fn creation_normalises_heading() {
        let projectile = create(
            Vec2::ZERO,
            Vec2::new(3.0, 4.0),
            25.0,
            EntityId::new(0),
            EntityId::new(1),
        );
        let velocity = projectile.as_projectile().map(|data| data.velocity);
        assert_eq!(velocity, Some(Vec2::new(6.0, 8.0)));
    }

    #[test]
    fn creation_on_top_of_target_keeps_zero_velocity() {
        let projectile = create(
            Vec2::ONE,
            Vec2::ONE,
            25.0,
            EntityId::new(0),
            EntityId::new(1),
        );
        assert_eq!(
            projectile.as_projectile().map(|data| data.velocity),
            Some(Vec2::ZERO)
        );
    }

    #[test]
    fn hits_locked_target_and_expires() {
        let mut store = EntityStore::new();
        let target = enemy_at(&mut store, Vec2::new(5.0, 5.0));
        let _ = store
            .add(create(
                Vec2::new(4.5, 5.0),
                Vec2::new(5.0, 5.0),
                25.0,
                EntityId::new(99),
                target,
            ))
            .expect("projectile");

        update(&mut store, 1, 0.01);

        assert_eq!(health(&store, target), 55.0);
        assert!(!store.get(1).expect("projectile").active);
        let anim = store.find(target).and_then(Entity::as_enemy).map(|e| e.anim);
        assert_eq!(anim, Some(AnimState::Hit));
    }

    #[test]
    fn lethal_hit_does_not_flinch() {
        let mut store = EntityStore::new();
        let target = enemy_at(&mut store, Vec2::new(5.0, 5.0));
        let _ = store
            .add(create(
                Vec2::new(5.0, 5.0),
                Vec2::new(5.0, 5.0),
                100.0,
                EntityId::new(99),
                target,
            ))
            .expect("projectile");

        update(&mut store, 1, 0.01);

        assert!(health(&store, target) <= 0.0);
        let anim = store.find(target).and_then(Entity::as_enemy).map(|e| e.anim);
        assert_eq!(anim, Some(AnimState::Run));
    }

    #[test]
    fn strays_into_bystander_when_target_is_gone() {
        let mut store = EntityStore::new();
        let bystander = enemy_at(&mut store, Vec2::new(3.0, 3.0));
        let _ = store
            .add(create(
                Vec2::new(2.6, 3.0),
                Vec2::new(3.0, 3.0),
                25.0,
                EntityId::new(99),
                EntityId::new(500),
            ))
            .expect("projectile");

        update(&mut store, 1, 0.01);

        assert_eq!(health(&store, bystander), 55.0);
        assert!(!store.get(1).expect("projectile").active);
    }

    #[test]
    fn leaves_field_and_expires() {
        let mut store = EntityStore::new();
        let _ = store
            .add(create(
                Vec2::new(25.9, 5.0),
                Vec2::new(40.0, 5.0),
                25.0,
                EntityId::new(99),
                EntityId::new(500),
            ))
            .expect("projectile");

        update(&mut store, 0, 0.1);

        assert!(!store.get(0).expect("projectile").active);
    }

    #[test]
    fn flight_animation_loops() {
        let mut store = EntityStore::new();
        let _ = store
            .add(create(
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                25.0,
                EntityId::new(99),
                EntityId::new(500),
            ))
            .expect("projectile");
        for _ in 0..FLIGHT_FRAMES {
            update(&mut store, 0, FLIGHT_FRAME_DURATION);
        }
        let frame = store
            .get(0)
            .and_then(Entity::as_projectile)
            .map(|data| data.current_frame);
        assert_eq!(frame, Some(0));
    }
}
