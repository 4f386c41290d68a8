use crate::EcsError;
use crate::component::{Component, ComponentSlot, EntityRecord};
use meshscene_common::EntityId;
use std::collections::{BTreeMap, BTreeSet};

/// Entity registry.
///
/// Hands out entity ids and stores each entity's component record. Entities
/// created with [`create_entity`](Self::create_entity) have no record until a
/// component is first attached.
#[derive(Debug, Default)]
pub struct World {
    next_entity_id: u32,
    entities: BTreeSet<EntityId>,
    records: BTreeMap<EntityId, EntityRecord>,
}

impl World {
    /// Create an empty world whose first entity is id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty world whose first entity is `first`.
    pub fn with_first_id(first: u32) -> Self {
        Self {
            next_entity_id: first,
            ..Default::default()
        }
    }

    /// Allocate the next entity id and register it as live.
    pub fn create_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id = self
            .next_entity_id
            .checked_add(1)
            .expect("entity id space exhausted");
        self.entities.insert(id);
        tracing::debug!(entity = %id, "entity created");
        id
    }

    /// Attach `component` to `entity`, replacing any component of the same
    /// kind. Creates the entity's record if it has none yet.
    ///
    /// Ids that were never allocated still get a record, but they are not
    /// registered as live and so never show up in
    /// [`get_all_entities`](Self::get_all_entities).
    pub fn add_component(&mut self, entity: EntityId, component: impl Into<Component>) {
        let component = component.into();
        let kind = component.kind();
        if !self.entities.contains(&entity) {
            tracing::debug!(entity = %entity, ?kind, "component attached to unlisted entity");
        }
        let replaced = self.records.entry(entity).or_default().insert(component);
        if replaced.is_some() {
            tracing::debug!(entity = %entity, ?kind, "component replaced");
        }
    }

    /// Create a new entity carrying `component`.
    pub fn spawn(&mut self, component: impl Into<Component>) -> EntityId {
        let id = self.create_entity();
        self.records.entry(id).or_default().insert(component.into());
        id
    }

    /// True iff `entity` has a record and its `K` slot is populated.
    pub fn has_component<K: ComponentSlot>(&self, entity: EntityId) -> bool {
        self.records
            .get(&entity)
            .is_some_and(|record| K::slot(record).is_some())
    }

    /// Clear the `K` slot of `entity`.
    ///
    /// Returns whether the entity had a record at all, not whether the slot
    /// was occupied. Use [`has_component`](Self::has_component) first when
    /// prior occupancy matters.
    pub fn delete_component<K: ComponentSlot>(&mut self, entity: EntityId) -> bool {
        match self.records.get_mut(&entity) {
            Some(record) => {
                *K::slot_mut(record) = None;
                true
            }
            None => false,
        }
    }

    /// The component record of `entity`.
    ///
    /// Fails for entities without a record; check with
    /// [`has_component`](Self::has_component) first.
    pub fn get_component(&self, entity: EntityId) -> Result<&EntityRecord, EcsError> {
        self.records.get(&entity).ok_or(EcsError::NoRecord(entity))
    }

    /// Mutable access to the component record of `entity`.
    pub fn get_component_mut(&mut self, entity: EntityId) -> Result<&mut EntityRecord, EcsError> {
        self.records
            .get_mut(&entity)
            .ok_or(EcsError::NoRecord(entity))
    }

    /// All live entities in ascending id order, including ones without
    /// components.
    pub fn get_all_entities(&self) -> &BTreeSet<EntityId> {
        &self.entities
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}
