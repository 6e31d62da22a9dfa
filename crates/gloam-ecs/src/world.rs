//! The [`World`] owns every entity and its [`ComponentSet`].
//!
//! Entities are kept in a slot table indexed by [`EntityId::index`], plus a
//! separate insertion-ordered list that defines *registry order*, the order
//! in which systems visit entities. Removal compacts that list, so systems
//! never remove entities while iterating; they queue a despawn in a
//! [`CommandBuffer`](crate::command::CommandBuffer) instead.

use crate::component::{Component, ComponentSet};
use crate::entity::{EntityAllocator, EntityId};
use crate::template::EntityFactory;
use crate::EcsError;

#[derive(Debug)]
struct Entry {
    id: EntityId,
    /// Template the entity was created from, if any.
    template: Option<String>,
    components: ComponentSet,
}

/// Entity registry and component store.
#[derive(Debug, Default)]
pub struct World {
    allocator: EntityAllocator,
    slots: Vec<Option<Entry>>,
    order: Vec<EntityId>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity from a named template.
    ///
    /// # Errors
    ///
    /// [`EcsError::ResourceNotFound`] if the factory does not know `template`.
    pub fn create(
        &mut self,
        factory: &dyn EntityFactory,
        template: &str,
    ) -> Result<EntityId, EcsError> {
        let components = factory.create_entity(template)?;
        let id = self.insert(components, Some(template.to_owned()));
        tracing::debug!(entity = %id, template, "entity created from template");
        Ok(id)
    }

    /// Add an entity with an explicit component set.
    pub fn spawn(&mut self, components: ComponentSet) -> EntityId {
        self.insert(components, None)
    }

    fn insert(&mut self, components: ComponentSet, template: Option<String>) -> EntityId {
        let id = self.allocator.allocate();
        let idx = id.index() as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        self.slots[idx] = Some(Entry {
            id,
            template,
            components,
        });
        self.order.push(id);
        id
    }

    /// Remove an entity immediately, handing its components back.
    ///
    /// Do not call this from inside a system pass; queue a despawn command.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleEntity`] if `id` is not alive.
    pub fn despawn(&mut self, id: EntityId) -> Result<ComponentSet, EcsError> {
        if !self.allocator.deallocate(id) {
            return Err(EcsError::StaleEntity { entity: id });
        }
        let entry = self.slots[id.index() as usize]
            .take()
            .ok_or(EcsError::StaleEntity { entity: id })?;
        self.order.retain(|e| *e != id);
        tracing::trace!(entity = %id, "entity despawned");
        Ok(entry.components)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    /// Live entities in registry order.
    pub fn entities(&self) -> &[EntityId] {
        &self.order
    }

    fn entry(&self, id: EntityId) -> Option<&Entry> {
        self.slots
            .get(id.index() as usize)
            .and_then(Option::as_ref)
            .filter(|entry| entry.id == id)
    }

    fn entry_mut(&mut self, id: EntityId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .filter(|entry| entry.id == id)
    }

    /// The component of kind `C` on `id`, or `None` if either is missing.
    pub fn get<C: Component>(&self, id: EntityId) -> Option<&C> {
        self.entry(id).and_then(|entry| entry.components.get::<C>())
    }

    pub fn get_mut<C: Component>(&mut self, id: EntityId) -> Option<&mut C> {
        self.entry_mut(id)
            .and_then(|entry| entry.components.get_mut::<C>())
    }

    pub fn has<C: Component>(&self, id: EntityId) -> bool {
        self.get::<C>(id).is_some()
    }

    pub fn components(&self, id: EntityId) -> Option<&ComponentSet> {
        self.entry(id).map(|entry| &entry.components)
    }

    /// Whole component set, for systems that touch more than one kind.
    pub fn components_mut(&mut self, id: EntityId) -> Option<&mut ComponentSet> {
        self.entry_mut(id).map(|entry| &mut entry.components)
    }

    pub fn template_of(&self, id: EntityId) -> Option<&str> {
        self.entry(id).and_then(|entry| entry.template.as_deref())
    }

    /// Entities carrying a component of kind `C`, in registry order.
    pub fn with_component<C: Component>(&self) -> impl Iterator<Item = (EntityId, &C)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.get::<C>(id).map(|c| (id, c)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
