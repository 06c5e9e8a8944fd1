use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use trellis_core::{
    ensure_schema_integrity, AttributeContext, BuilderDefinition, DataManager,
    EntitiesAttributesErrors, Entity, EntityKind, ListenerId, Schema, SchemaError,
};

use crate::data::BuilderStoreData;
use crate::errors::{BuilderStoreError, Result};
use crate::events::BuilderStoreEvent;
use crate::tree;

/// Payload for [`BuilderStore::add_entity`]
#[derive(Debug, Clone, Default)]
pub struct NewEntity {
    /// Registered entity type to instantiate
    pub kind: String,
    /// Initial attribute values; keys must be declared by the type
    pub attributes: BTreeMap<String, Value>,
    /// Parent to insert under; `None` inserts into the root
    pub parent_id: Option<String>,
    /// Position within the owner's ordered list; `None` appends
    pub index: Option<usize>,
}

impl NewEntity {
    /// New payload for the given entity type with no attributes
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }
}

/// Builder Store - design-time owner of a mutable entity tree
///
/// Every mutation validates its inputs against the builder definition before
/// touching state, computes one full next-state snapshot, and commits it
/// together with the ordered event batch describing the change. Failed
/// operations leave the published state untouched.
pub struct BuilderStore {
    definition: Arc<BuilderDefinition>,
    data: DataManager<BuilderStoreData, BuilderStoreEvent>,
}

impl BuilderStore {
    /// Create a store, optionally seeded with existing data
    ///
    /// Initial data is integrity-checked and normalized; supplied error maps
    /// must reference registered entities and attributes.
    ///
    /// # Errors
    ///
    /// Returns `Integrity` if the initial schema is structurally invalid, or
    /// the relevant contract error for a malformed error map.
    pub fn new(definition: Arc<BuilderDefinition>, initial: Option<BuilderStoreData>) -> Result<Self> {
        let data = match initial {
            Some(data) => normalize_data(data, &definition)?,
            None => BuilderStoreData::default(),
        };
        Ok(Self {
            definition,
            data: DataManager::new(data),
        })
    }

    /// The definition this store was created with
    pub fn definition(&self) -> &Arc<BuilderDefinition> {
        &self.definition
    }

    /// Subscribe to state commits; the listener receives each new state with
    /// its event batch
    pub fn subscribe(
        &self,
        listener: impl Fn(&BuilderStoreData, &[BuilderStoreEvent]) + 'static,
    ) -> ListenerId {
        self.data.subscribe(listener)
    }

    /// Remove a previously registered listener
    pub fn unsubscribe(&self, id: ListenerId) {
        self.data.unsubscribe(id)
    }

    /// Snapshot of the current store data
    pub fn get_data(&self) -> BuilderStoreData {
        self.data.clone_data()
    }

    /// Snapshot of the current schema
    pub fn get_schema(&self) -> Schema {
        self.data.get().schema.clone()
    }

    /// Snapshot of one entity, if present
    pub fn get_entity(&self, entity_id: &str) -> Option<Entity> {
        self.data.get().schema.entity(entity_id).cloned()
    }

    /// Snapshot of the recorded attribute errors
    pub fn get_entities_attributes_errors(&self) -> EntitiesAttributesErrors {
        self.data.get().entities_attributes_errors.clone()
    }

    /// The recorded whole-schema error, if any
    pub fn get_schema_error(&self) -> Option<Value> {
        self.data.get().schema_error.clone()
    }

    /// Replace the entire store data
    ///
    /// The schema is defensively re-checked and the error maps re-validated,
    /// exactly as on construction.
    pub fn set_data(&self, data: BuilderStoreData) -> Result<()> {
        let next = normalize_data(data, &self.definition)?;
        self.data
            .set(next.clone(), vec![BuilderStoreEvent::DataSet { data: next }]);
        Ok(())
    }

    // ===== Tree editing =====

    /// Add a new entity, returning its generated id
    pub fn add_entity(&self, new: NewEntity) -> Result<String> {
        let kind = self.kind(&new.kind)?;
        let mut data = self.data.clone_data();

        let id = self.definition.ids().generate();
        self.definition
            .ids()
            .validate(&id)
            .map_err(|reason| BuilderStoreError::InvalidEntityId {
                entity_id: id.clone(),
                reason,
            })?;
        if data.schema.contains_entity(&id) {
            return Err(BuilderStoreError::EntityIdCollision { entity_id: id });
        }
        for attribute in new.attributes.keys() {
            if kind.attribute(attribute).is_none() {
                return Err(BuilderStoreError::UnknownEntityAttribute {
                    entity_type: new.kind.clone(),
                    attribute: attribute.clone(),
                });
            }
        }

        let mut entity = Entity::new(new.kind.clone());
        entity.attributes = new.attributes;
        entity.parent_id = new.parent_id.clone();
        if kind.allows_children() {
            entity.children = Some(Vec::new());
        }

        let owner_event = match &new.parent_id {
            Some(parent_id) => {
                let parent_kind_name = entity_ref(&data.schema, parent_id)?.kind.clone();
                self.ensure_pairing_allowed(&parent_kind_name, &new.kind)?;
                data.schema.entities.insert(id.clone(), entity.clone());
                tree::insert_into_children(&mut data.schema, parent_id, &id, new.index);
                self.entity_updated(&data.schema, parent_id)
            }
            None => {
                if kind.parent_required() {
                    return Err(BuilderStoreError::ParentRequired {
                        entity_type: new.kind.clone(),
                    });
                }
                data.schema.entities.insert(id.clone(), entity.clone());
                tree::insert_into_root(&mut data.schema, &id, new.index);
                BuilderStoreEvent::RootUpdated {
                    root: data.schema.root.clone(),
                }
            }
        };

        tracing::debug!(entity_id = %id, entity_type = %entity.kind, "added entity");
        let events = vec![
            BuilderStoreEvent::EntityAdded {
                entity_id: id.clone(),
                entity,
            },
            owner_event,
            BuilderStoreEvent::SchemaUpdated {
                schema: data.schema.clone(),
            },
        ];
        self.data.set(data, events);
        Ok(id)
    }

    /// Move an entity under a new parent, preserving order via `index`
    pub fn set_entity_parent(
        &self,
        entity_id: &str,
        parent_id: &str,
        index: Option<usize>,
    ) -> Result<()> {
        let mut data = self.data.clone_data();
        let entity = entity_ref(&data.schema, entity_id)?;
        let entity_kind_name = entity.kind.clone();
        let old_parent = entity.parent_id.clone();
        let parent_kind_name = entity_ref(&data.schema, parent_id)?.kind.clone();

        if old_parent.is_none() && data.schema.root.len() == 1 {
            return Err(BuilderStoreError::LastRootEntity {
                entity_id: entity_id.to_string(),
            });
        }
        if entity_id == parent_id || tree::is_ancestor(&data.schema, entity_id, parent_id) {
            return Err(BuilderStoreError::CycleDetected {
                entity_id: entity_id.to_string(),
            });
        }
        self.ensure_pairing_allowed(&parent_kind_name, &entity_kind_name)?;

        tree::detach(&mut data.schema, entity_id);
        tree::insert_into_children(&mut data.schema, parent_id, entity_id, index);
        if let Some(entity) = data.schema.entities.get_mut(entity_id) {
            entity.parent_id = Some(parent_id.to_string());
        }

        tracing::debug!(entity_id, parent_id, "moved entity under new parent");
        let mut events = Vec::new();
        match &old_parent {
            Some(old) if old == parent_id => {}
            Some(old) => events.push(self.entity_updated(&data.schema, old)),
            None => events.push(BuilderStoreEvent::RootUpdated {
                root: data.schema.root.clone(),
            }),
        }
        events.push(self.entity_updated(&data.schema, parent_id));
        events.push(BuilderStoreEvent::SchemaUpdated {
            schema: data.schema.clone(),
        });
        self.data.set(data, events);
        Ok(())
    }

    /// Move an entity out of its parent and into the root list
    pub fn unset_entity_parent(&self, entity_id: &str, index: Option<usize>) -> Result<()> {
        let mut data = self.data.clone_data();
        let entity = entity_ref(&data.schema, entity_id)?;
        let entity_kind_name = entity.kind.clone();
        let old_parent = entity.parent_id.clone();

        if self.kind(&entity_kind_name)?.parent_required() {
            return Err(BuilderStoreError::ParentRequired {
                entity_type: entity_kind_name,
            });
        }

        tree::detach(&mut data.schema, entity_id);
        tree::insert_into_root(&mut data.schema, entity_id, index);
        if let Some(entity) = data.schema.entities.get_mut(entity_id) {
            entity.parent_id = None;
        }

        tracing::debug!(entity_id, "moved entity into root");
        let mut events = Vec::new();
        if let Some(old) = &old_parent {
            events.push(self.entity_updated(&data.schema, old));
        }
        events.push(BuilderStoreEvent::RootUpdated {
            root: data.schema.root.clone(),
        });
        events.push(BuilderStoreEvent::SchemaUpdated {
            schema: data.schema.clone(),
        });
        self.data.set(data, events);
        Ok(())
    }

    /// Reorder an entity within its current owner without changing ownership
    pub fn set_entity_index(&self, entity_id: &str, index: usize) -> Result<()> {
        let mut data = self.data.clone_data();
        let owner = entity_ref(&data.schema, entity_id)?.parent_id.clone();

        tree::detach(&mut data.schema, entity_id);
        let owner_event = match &owner {
            Some(parent_id) => {
                tree::insert_into_children(&mut data.schema, parent_id, entity_id, Some(index));
                self.entity_updated(&data.schema, parent_id)
            }
            None => {
                tree::insert_into_root(&mut data.schema, entity_id, Some(index));
                BuilderStoreEvent::RootUpdated {
                    root: data.schema.root.clone(),
                }
            }
        };

        let events = vec![
            owner_event,
            BuilderStoreEvent::SchemaUpdated {
                schema: data.schema.clone(),
            },
        ];
        self.data.set(data, events);
        Ok(())
    }

    /// Set one attribute's value
    pub fn set_entity_attribute(
        &self,
        entity_id: &str,
        attribute: &str,
        value: Value,
    ) -> Result<()> {
        let mut data = self.data.clone_data();
        let kind_name = entity_ref(&data.schema, entity_id)?.kind.clone();
        let kind = self.kind(&kind_name)?;
        if kind.attribute(attribute).is_none() {
            return Err(BuilderStoreError::UnknownEntityAttribute {
                entity_type: kind_name,
                attribute: attribute.to_string(),
            });
        }

        if let Some(entity) = data.schema.entities.get_mut(entity_id) {
            entity
                .attributes
                .insert(attribute.to_string(), value.clone());
        }

        let events = vec![
            BuilderStoreEvent::EntityAttributeUpdated {
                entity_id: entity_id.to_string(),
                attribute: attribute.to_string(),
                value,
            },
            BuilderStoreEvent::SchemaUpdated {
                schema: data.schema.clone(),
            },
        ];
        self.data.set(data, events);
        Ok(())
    }

    /// Delete an entity and all its descendants
    ///
    /// Returns the removed ids, depth-first, the deleted entity first.
    /// Recorded attribute errors of removed entities are purged.
    pub fn delete_entity(&self, entity_id: &str) -> Result<Vec<String>> {
        let mut data = self.data.clone_data();
        let old_parent = entity_ref(&data.schema, entity_id)?.parent_id.clone();

        tree::detach(&mut data.schema, entity_id);
        let removed_ids = tree::collect_subtree(&data.schema, entity_id);
        let mut removed_entities = Vec::with_capacity(removed_ids.len());
        for id in &removed_ids {
            if let Some(entity) = data.schema.entities.remove(id) {
                removed_entities.push((id.clone(), entity));
            }
            data.entities_attributes_errors.remove(id);
        }

        tracing::debug!(entity_id, count = removed_ids.len(), "deleted entity subtree");
        let mut events: Vec<BuilderStoreEvent> = removed_entities
            .into_iter()
            .map(|(entity_id, entity)| BuilderStoreEvent::EntityDeleted { entity_id, entity })
            .collect();
        match &old_parent {
            Some(parent_id) => events.push(self.entity_updated(&data.schema, parent_id)),
            None => events.push(BuilderStoreEvent::RootUpdated {
                root: data.schema.root.clone(),
            }),
        }
        events.push(BuilderStoreEvent::SchemaUpdated {
            schema: data.schema.clone(),
        });
        self.data.set(data, events);
        Ok(removed_ids)
    }

    /// Deep-clone an entity and its descendants, returning the new top id
    ///
    /// The clone is inserted immediately after the original in its owner's
    /// order; descendants keep their relative order under fresh ids.
    pub fn clone_entity(&self, entity_id: &str) -> Result<String> {
        let mut data = self.data.clone_data();
        let source = entity_ref(&data.schema, entity_id)?;
        let owner = source.parent_id.clone();

        let original_index = match &owner {
            Some(parent_id) => entity_ref(&data.schema, parent_id)?
                .child_ids()
                .iter()
                .position(|child| child == entity_id),
            None => data.schema.root.iter().position(|root| root == entity_id),
        }
        .unwrap_or(0);

        let mut pairs = Vec::new();
        let top_id = self.clone_subtree(&mut data.schema, entity_id, owner.clone(), &mut pairs)?;

        match &owner {
            Some(parent_id) => tree::insert_into_children(
                &mut data.schema,
                parent_id,
                &top_id,
                Some(original_index + 1),
            ),
            None => tree::insert_into_root(&mut data.schema, &top_id, Some(original_index + 1)),
        }

        tracing::debug!(entity_id, clone_id = %top_id, count = pairs.len(), "cloned entity subtree");
        let mut events = Vec::with_capacity(pairs.len() + 2);
        for (position, (source_id, clone_id)) in pairs.iter().enumerate() {
            if let Some(entity) = data.schema.entity(clone_id) {
                events.push(BuilderStoreEvent::EntityCloned {
                    source_entity_id: source_id.clone(),
                    entity_id: clone_id.clone(),
                    entity: entity.clone(),
                    is_clone_origin: position == 0,
                });
            }
        }
        match &owner {
            Some(parent_id) => events.push(self.entity_updated(&data.schema, parent_id)),
            None => events.push(BuilderStoreEvent::RootUpdated {
                root: data.schema.root.clone(),
            }),
        }
        events.push(BuilderStoreEvent::SchemaUpdated {
            schema: data.schema.clone(),
        });
        self.data.set(data, events);
        Ok(top_id)
    }

    // ===== Attribute validation =====

    /// Validate one attribute, recording and emitting its (possibly cleared)
    /// error state
    pub async fn validate_entity_attribute(&self, entity_id: &str, attribute: &str) -> Result<()> {
        let snapshot = self.data.clone_data();
        let entity = entity_ref(&snapshot.schema, entity_id)?.clone();
        let kind = self.kind(&entity.kind)?;
        let attribute_def =
            kind.attribute(attribute)
                .ok_or_else(|| BuilderStoreError::UnknownEntityAttribute {
                    entity_type: entity.kind.clone(),
                    attribute: attribute.to_string(),
                })?;

        let ctx = AttributeContext {
            schema: &snapshot.schema,
            entity_id,
            entity: &entity,
        };
        let value = entity.attributes.get(attribute).cloned();
        let outcome = self
            .definition
            .run_attribute_validator(kind, attribute_def, value, &ctx)
            .await;

        self.commit_attribute_outcomes(vec![(
            entity_id.to_string(),
            attribute.to_string(),
            outcome.err(),
        )]);
        Ok(())
    }

    /// Validate every attribute of one entity
    pub async fn validate_entity_attributes(&self, entity_id: &str) -> Result<()> {
        let snapshot = self.data.clone_data();
        let entity = entity_ref(&snapshot.schema, entity_id)?.clone();
        let outcomes = self
            .validate_entity_pass(&snapshot.schema, entity_id, &entity)
            .await?;
        self.commit_attribute_outcomes(outcomes);
        Ok(())
    }

    /// Validate every attribute of every entity
    pub async fn validate_entities_attributes(&self) -> Result<()> {
        let snapshot = self.data.clone_data();
        let outcomes = self.validate_all_pass(&snapshot.schema).await?;
        self.commit_attribute_outcomes(outcomes);
        Ok(())
    }

    /// Validate the whole schema
    ///
    /// Runs the attribute pass over every entity (recording errors exactly as
    /// [`Self::validate_entities_attributes`] does). If any attribute failed,
    /// the failure map is returned and the custom validator does not run.
    /// Otherwise the definition's whole-schema validator decides the outcome,
    /// which is recorded as the store's schema error either way.
    pub async fn validate_schema(&self) -> std::result::Result<Schema, SchemaError> {
        let snapshot = self.data.clone_data();
        let outcomes = match self.validate_all_pass(&snapshot.schema).await {
            Ok(outcomes) => outcomes,
            // The snapshot is internally consistent; the pass cannot fail.
            Err(_) => Vec::new(),
        };

        let mut failures = EntitiesAttributesErrors::new();
        for (entity_id, attribute, error) in &outcomes {
            if let Some(error) = error {
                failures
                    .entry(entity_id.clone())
                    .or_default()
                    .insert(attribute.clone(), error.clone());
            }
        }
        self.commit_attribute_outcomes(outcomes);

        if !failures.is_empty() {
            return Err(SchemaError::Attributes(failures));
        }

        let hook_outcome = self
            .definition
            .schema_hook()
            .validate(snapshot.schema)
            .await;

        let mut data = self.data.clone_data();
        data.schema_error = hook_outcome.as_ref().err().cloned();
        let events = vec![BuilderStoreEvent::SchemaErrorUpdated {
            error: data.schema_error.clone(),
        }];
        self.data.set(data, events);

        hook_outcome.map_err(SchemaError::Custom)
    }

    // ===== Manual error management =====

    /// Record an attribute error supplied by the caller
    pub fn set_entity_attribute_error(
        &self,
        entity_id: &str,
        attribute: &str,
        error: Value,
    ) -> Result<()> {
        self.ensure_attribute_registered(entity_id, attribute)?;
        self.commit_attribute_outcomes(vec![(
            entity_id.to_string(),
            attribute.to_string(),
            Some(error),
        )]);
        Ok(())
    }

    /// Clear one recorded attribute error
    pub fn reset_entity_attribute_error(&self, entity_id: &str, attribute: &str) -> Result<()> {
        self.ensure_attribute_registered(entity_id, attribute)?;
        self.commit_attribute_outcomes(vec![(entity_id.to_string(), attribute.to_string(), None)]);
        Ok(())
    }

    /// Replace one entity's recorded attribute errors
    pub fn set_entity_attributes_errors(
        &self,
        entity_id: &str,
        errors: BTreeMap<String, Value>,
    ) -> Result<()> {
        entity_ref(&self.data.get().schema, entity_id)?;
        for attribute in errors.keys() {
            self.ensure_attribute_registered(entity_id, attribute)?;
        }
        let previous = self
            .data
            .get()
            .entities_attributes_errors
            .get(entity_id)
            .cloned()
            .unwrap_or_default();

        let mut outcomes = Vec::new();
        for attribute in previous.keys() {
            if !errors.contains_key(attribute) {
                outcomes.push((entity_id.to_string(), attribute.clone(), None));
            }
        }
        for (attribute, error) in errors {
            outcomes.push((entity_id.to_string(), attribute, Some(error)));
        }
        self.commit_attribute_outcomes(outcomes);
        Ok(())
    }

    /// Clear one entity's recorded attribute errors
    pub fn reset_entity_attributes_errors(&self, entity_id: &str) -> Result<()> {
        entity_ref(&self.data.get().schema, entity_id)?;
        let previous = self
            .data
            .get()
            .entities_attributes_errors
            .get(entity_id)
            .cloned()
            .unwrap_or_default();
        let outcomes = previous
            .into_keys()
            .map(|attribute| (entity_id.to_string(), attribute, None))
            .collect();
        self.commit_attribute_outcomes(outcomes);
        Ok(())
    }

    /// Replace the entire attribute error map
    pub fn set_entities_attributes_errors(&self, errors: EntitiesAttributesErrors) -> Result<()> {
        for (entity_id, attributes) in &errors {
            entity_ref(&self.data.get().schema, entity_id)?;
            for attribute in attributes.keys() {
                self.ensure_attribute_registered(entity_id, attribute)?;
            }
        }
        let previous = self.data.get().entities_attributes_errors.clone();

        let mut outcomes = Vec::new();
        for (entity_id, attributes) in &previous {
            for attribute in attributes.keys() {
                let replaced = errors
                    .get(entity_id)
                    .is_some_and(|next| next.contains_key(attribute));
                if !replaced {
                    outcomes.push((entity_id.clone(), attribute.clone(), None));
                }
            }
        }
        for (entity_id, attributes) in errors {
            for (attribute, error) in attributes {
                outcomes.push((entity_id.clone(), attribute, Some(error)));
            }
        }
        self.commit_attribute_outcomes(outcomes);
        Ok(())
    }

    /// Clear every recorded attribute error
    pub fn reset_entities_attributes_errors(&self) {
        let previous = self.data.get().entities_attributes_errors.clone();
        let mut outcomes = Vec::new();
        for (entity_id, attributes) in previous {
            for attribute in attributes.into_keys() {
                outcomes.push((entity_id.clone(), attribute, None));
            }
        }
        self.commit_attribute_outcomes(outcomes);
    }

    /// Record a whole-schema error supplied by the caller
    pub fn set_schema_error(&self, error: Value) {
        let mut data = self.data.clone_data();
        data.schema_error = Some(error.clone());
        self.data.set(
            data,
            vec![BuilderStoreEvent::SchemaErrorUpdated { error: Some(error) }],
        );
    }

    /// Clear the recorded whole-schema error
    pub fn reset_schema_error(&self) {
        let mut data = self.data.clone_data();
        data.schema_error = None;
        self.data.set(
            data,
            vec![BuilderStoreEvent::SchemaErrorUpdated { error: None }],
        );
    }

    // ===== Internals =====

    fn kind(&self, name: &str) -> Result<&EntityKind> {
        self.definition
            .kind(name)
            .ok_or_else(|| BuilderStoreError::UnknownEntityType {
                entity_type: name.to_string(),
            })
    }

    fn ensure_pairing_allowed(&self, parent_kind: &str, child_kind: &str) -> Result<()> {
        let parent = self.kind(parent_kind)?;
        let child = self.kind(child_kind)?;
        if !parent.allows_child_kind(child_kind) || !child.allows_parent_kind(parent_kind) {
            return Err(BuilderStoreError::ChildNotAllowed {
                parent_type: parent_kind.to_string(),
                child_type: child_kind.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_attribute_registered(&self, entity_id: &str, attribute: &str) -> Result<()> {
        let kind_name = entity_ref(&self.data.get().schema, entity_id)?.kind.clone();
        let kind = self.kind(&kind_name)?;
        if kind.attribute(attribute).is_none() {
            return Err(BuilderStoreError::UnknownEntityAttribute {
                entity_type: kind_name,
                attribute: attribute.to_string(),
            });
        }
        Ok(())
    }

    fn entity_updated(&self, schema: &Schema, entity_id: &str) -> BuilderStoreEvent {
        BuilderStoreEvent::EntityUpdated {
            entity_id: entity_id.to_string(),
            entity: schema.entity(entity_id).cloned().unwrap_or_else(|| {
                // The caller just touched this entity; reaching here would be
                // an internal inconsistency, not an API misuse.
                Entity::new(String::new())
            }),
        }
    }

    async fn validate_entity_pass(
        &self,
        schema: &Schema,
        entity_id: &str,
        entity: &Entity,
    ) -> Result<Vec<(String, String, Option<Value>)>> {
        let kind = self.kind(&entity.kind)?;
        let mut outcomes = Vec::with_capacity(kind.attributes().len());
        for attribute_def in kind.attributes() {
            let ctx = AttributeContext {
                schema,
                entity_id,
                entity,
            };
            let value = entity.attributes.get(attribute_def.name()).cloned();
            let outcome = self
                .definition
                .run_attribute_validator(kind, attribute_def, value, &ctx)
                .await;
            outcomes.push((
                entity_id.to_string(),
                attribute_def.name().to_string(),
                outcome.err(),
            ));
        }
        Ok(outcomes)
    }

    async fn validate_all_pass(
        &self,
        schema: &Schema,
    ) -> Result<Vec<(String, String, Option<Value>)>> {
        let mut outcomes = Vec::new();
        for (entity_id, entity) in &schema.entities {
            outcomes.extend(self.validate_entity_pass(schema, entity_id, entity).await?);
        }
        Ok(outcomes)
    }

    /// Apply attribute error outcomes to the live state in one commit
    ///
    /// Entities that disappeared between snapshot and commit are skipped.
    /// One `EntityAttributeErrorUpdated` is emitted per outcome, including
    /// cleared ones, so stale UI state always gets flushed.
    fn commit_attribute_outcomes(&self, outcomes: Vec<(String, String, Option<Value>)>) {
        if outcomes.is_empty() {
            return;
        }
        let mut data = self.data.clone_data();
        let mut events = Vec::with_capacity(outcomes.len());
        for (entity_id, attribute, error) in outcomes {
            if !data.schema.contains_entity(&entity_id) {
                continue;
            }
            match &error {
                Some(value) => {
                    data.entities_attributes_errors
                        .entry(entity_id.clone())
                        .or_default()
                        .insert(attribute.clone(), value.clone());
                }
                None => {
                    if let Some(entry) = data.entities_attributes_errors.get_mut(&entity_id) {
                        entry.remove(&attribute);
                        if entry.is_empty() {
                            data.entities_attributes_errors.remove(&entity_id);
                        }
                    }
                }
            }
            events.push(BuilderStoreEvent::EntityAttributeErrorUpdated {
                entity_id,
                attribute,
                error,
            });
        }
        self.data.set(data, events);
    }

    fn clone_subtree(
        &self,
        schema: &mut Schema,
        source_id: &str,
        new_parent: Option<String>,
        pairs: &mut Vec<(String, String)>,
    ) -> Result<String> {
        let source = entity_ref(schema, source_id)?.clone();

        let clone_id = self.definition.ids().generate();
        self.definition
            .ids()
            .validate(&clone_id)
            .map_err(|reason| BuilderStoreError::InvalidEntityId {
                entity_id: clone_id.clone(),
                reason,
            })?;
        if schema.contains_entity(&clone_id) {
            return Err(BuilderStoreError::EntityIdCollision {
                entity_id: clone_id,
            });
        }

        let mut clone = Entity::new(source.kind.clone());
        clone.attributes = source.attributes.clone();
        clone.parent_id = new_parent;
        clone.children = source.children.as_ref().map(|_| Vec::new());
        schema.entities.insert(clone_id.clone(), clone);
        pairs.push((source_id.to_string(), clone_id.clone()));

        for child_id in source.child_ids() {
            let child_clone_id =
                self.clone_subtree(schema, child_id, Some(clone_id.clone()), pairs)?;
            if let Some(children) = schema
                .entities
                .get_mut(&clone_id)
                .and_then(|entity| entity.children.as_mut())
            {
                children.push(child_clone_id);
            }
        }

        Ok(clone_id)
    }
}

fn entity_ref<'a>(schema: &'a Schema, entity_id: &str) -> Result<&'a Entity> {
    schema
        .entity(entity_id)
        .ok_or_else(|| BuilderStoreError::EntityNotFound {
            entity_id: entity_id.to_string(),
        })
}

/// Validate and normalize externally supplied store data
fn normalize_data(
    data: BuilderStoreData,
    definition: &BuilderDefinition,
) -> Result<BuilderStoreData> {
    let schema = ensure_schema_integrity(&data.schema, definition)?;

    for (entity_id, attributes) in &data.entities_attributes_errors {
        let entity = schema
            .entity(entity_id)
            .ok_or_else(|| BuilderStoreError::EntityNotFound {
                entity_id: entity_id.clone(),
            })?;
        let kind =
            definition
                .kind(&entity.kind)
                .ok_or_else(|| BuilderStoreError::UnknownEntityType {
                    entity_type: entity.kind.clone(),
                })?;
        for attribute in attributes.keys() {
            if kind.attribute(attribute).is_none() {
                return Err(BuilderStoreError::UnknownEntityAttribute {
                    entity_type: entity.kind.clone(),
                    attribute: attribute.clone(),
                });
            }
        }
    }

    Ok(BuilderStoreData {
        schema,
        entities_attributes_errors: data.entities_attributes_errors,
        schema_error: data.schema_error,
    })
}
