//! Growable entity storage with stable identifiers and single-pass compaction.

use tower_duel_core::{Entity, EntityId, StoreError};

/// Capacity allocated by the first growth of an empty store.
pub const BASELINE_CAPACITY: usize = 32;

/// Hard upper bound on the number of entities a single match may hold.
pub const MAX_ENTITIES: usize = 1024;

/// Outcome recorded for every enemy dropped during compaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Removal {
    /// The enemy died; its reward is credited to the player.
    Defeated {
        /// Identifier of the removed enemy.
        id: EntityId,
        /// Gold granted for the kill.
        reward: u32,
    },
    /// The enemy walked off the end of its path.
    Escaped {
        /// Identifier of the removed enemy.
        id: EntityId,
    },
}

/// Dense array of entities ordered by insertion.
///
/// Identifiers increase monotonically and compaction preserves relative
/// order, so the backing array stays sorted by identifier.
#[derive(Debug)]
pub struct EntityStore {
    entities: Vec<Entity>,
    capacity: usize,
    next_id: u32,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Creates an empty store with no reserved capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            capacity: 0,
            next_id: 0,
        }
    }

    /// Inserts the entity, assigning it the next identifier.
    pub fn add(&mut self, entity: Entity) -> Result<EntityId, StoreError> {
        if self.entities.len() >= MAX_ENTITIES {
            tracing::warn!(limit = MAX_ENTITIES, "entity store full, refusing insertion");
            return Err(StoreError::OutOfCapacity {
                limit: MAX_ENTITIES,
            });
        }

        let Some(next_id) = self.next_id.checked_add(1) else {
            tracing::warn!("entity identifiers exhausted, refusing insertion");
            return Err(StoreError::OutOfCapacity {
                limit: MAX_ENTITIES,
            });
        };
        if self.entities.len() == self.capacity {
            self.grow()?;
        }

        let id = EntityId::new(self.next_id);
        self.next_id = next_id;
        self.entities.push(entity.with_id(id));
        Ok(id)
    }

    fn grow(&mut self) -> Result<(), StoreError> {
        let doubled = if self.capacity == 0 {
            BASELINE_CAPACITY
        } else {
            self.capacity.saturating_mul(2)
        };
        let target = doubled.min(MAX_ENTITIES);
        if target <= self.capacity {
            return Err(StoreError::OutOfCapacity {
                limit: MAX_ENTITIES,
            });
        }

        self.entities
            .reserve_exact(target.saturating_sub(self.entities.len()));
        self.capacity = target;
        Ok(())
    }

    /// Drops every inactive entity in a single pass, preserving the order of
    /// survivors, and reports each removed enemy through `out`.
    pub fn remove_inactive(&mut self, out: &mut Vec<Removal>) {
        let mut write = 0;
        for read in 0..self.entities.len() {
            let entity = self.entities[read];
            if !entity.active {
                if let Some(enemy) = entity.as_enemy() {
                    if enemy.health <= 0.0 {
                        out.push(Removal::Defeated {
                            id: entity.id(),
                            reward: enemy.gold_reward,
                        });
                    } else {
                        out.push(Removal::Escaped { id: entity.id() });
                    }
                }
                continue;
            }

            if write != read {
                self.entities[write] = entity;
            }
            write += 1;
        }
        self.entities.truncate(write);

        if self.capacity > BASELINE_CAPACITY * 2 && self.entities.len() < self.capacity / 4 {
            self.capacity /= 2;
            self.entities.shrink_to(self.capacity);
        }
    }

    /// Number of stored entities, live or pending removal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Reports whether the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Logical capacity managed by the growth and shrink policy.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entity stored at the dense index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// Mutable entity stored at the dense index.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    /// Dense index of the entity with the provided identifier.
    #[must_use]
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities
            .binary_search_by_key(&id, |entity| entity.id())
            .ok()
    }

    /// Entity with the provided identifier.
    #[must_use]
    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).map(|index| &self.entities[index])
    }

    /// Mutable entity with the provided identifier.
    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.index_of(id).map(|index| &mut self.entities[index])
    }

    /// Iterates over stored entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Mutably iterates over stored entities in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }
}
