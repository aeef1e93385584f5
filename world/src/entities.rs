//! Authoritative entity storage and identifier allocation.

use std::collections::BTreeMap;

use merge_forge_core::{EntityId, EntitySnapshot, Position, Tier};

/// Entity stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Entity {
    pub(crate) id: EntityId,
    pub(crate) tier: Tier,
    pub(crate) position: Position,
    pub(crate) fresh: bool,
}

impl Entity {
    pub(crate) fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            tier: self.tier,
            position: self.position,
            fresh: self.fresh,
        }
    }
}

/// Registry that stores entities and manages identifier allocation.
///
/// The identifier counter only moves forward, even when the registry is
/// cleared or replaced, so identifiers are never handed out twice.
#[derive(Clone, Debug)]
pub(crate) struct EntityRegistry {
    entries: BTreeMap<EntityId, Entity>,
    next_entity_id: u64,
}

impl EntityRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_entity_id: 0,
        }
    }

    pub(crate) fn insert(&mut self, tier: Tier, position: Position) -> EntityId {
        let id = EntityId::new(self.next_entity_id);
        self.next_entity_id = self.next_entity_id.saturating_add(1);
        let _ = self.entries.insert(
            id,
            Entity {
                id,
                tier,
                position,
                fresh: true,
            },
        );
        id
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entries.remove(&id)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entries.values_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces the contents while keeping the identifier counter ahead of
    /// every restored identifier.
    pub(crate) fn replace(&mut self, snapshots: &[EntitySnapshot]) {
        self.entries.clear();
        for snapshot in snapshots {
            let _ = self.entries.insert(
                snapshot.id,
                Entity {
                    id: snapshot.id,
                    tier: snapshot.tier,
                    position: snapshot.position,
                    fresh: snapshot.fresh,
                },
            );
            self.next_entity_id = self
                .next_entity_id
                .max(snapshot.id.get().saturating_add(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge_forge_core::CellCoord;

    #[test]
    fn registry_starts_empty_with_zero_identifier() {
        let mut registry = EntityRegistry::new();
        assert_eq!(registry.len(), 0);
        let id = registry.insert(Tier::new(1), Position::Cell(CellCoord::new(0, 0)));
        assert_eq!(id, EntityId::new(0));
    }

    #[test]
    fn identifiers_survive_clear_and_replace() {
        let mut registry = EntityRegistry::new();
        let position = Position::Cell(CellCoord::new(0, 0));
        let first = registry.insert(Tier::new(1), position);
        registry.clear();
        let second = registry.insert(Tier::new(1), position);
        assert!(second > first);

        registry.replace(&[EntitySnapshot {
            id: EntityId::new(40),
            tier: Tier::new(2),
            position,
            fresh: false,
        }]);
        registry.replace(&[]);
        assert_eq!(registry.insert(Tier::new(1), position), EntityId::new(41));
    }
}
