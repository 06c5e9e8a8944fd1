use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;

use trellis_core::{
    ensure_schema_integrity, BuilderDefinition, DataManager, EntityKind, ListenerId, Schema,
    ValueContext,
};

use crate::data::InterpreterStoreData;
use crate::errors::{InterpreterStoreError, Result};
use crate::events::InterpreterStoreEvent;
use crate::processability::compute_unprocessable;

/// Construction options for [`InterpreterStore`]
#[derive(Debug, Clone, Default)]
pub struct InterpreterStoreOptions {
    /// Previously captured values and errors to resume from
    pub initial_data: Option<InterpreterStoreData>,
    /// Suppress default-value population at construction
    pub skip_default_values: bool,
}

/// Interpreter Store - runtime values and errors for one fixed schema
///
/// The schema is re-checked defensively on construction and treated as
/// read-only configuration afterwards; only values, errors and the derived
/// processability set change. Every value mutation recomputes processability
/// before the new state is published.
pub struct InterpreterStore {
    definition: Arc<BuilderDefinition>,
    schema: Schema,
    data: DataManager<InterpreterStoreData, InterpreterStoreEvent>,
    unprocessable: RefCell<BTreeSet<String>>,
}

impl InterpreterStore {
    /// Create a store for an integrity-valid schema
    ///
    /// Values for value-carrying entities are populated from their kinds'
    /// `default_value` hooks unless `skip_default_values` is set or an
    /// initial value is already present.
    ///
    /// # Errors
    ///
    /// Returns `Integrity` if the schema fails the defensive re-check, or the
    /// relevant contract error when initial data references unknown entities
    /// or value-less kinds.
    pub fn new(
        definition: Arc<BuilderDefinition>,
        schema: Schema,
        options: InterpreterStoreOptions,
    ) -> Result<Self> {
        let schema = ensure_schema_integrity(&schema, &definition)?;

        let mut data = options.initial_data.unwrap_or_default();
        check_values_membership(&schema, &definition, &data.entities_values)?;
        check_errors_membership(&schema, &data.entities_errors)?;

        if !options.skip_default_values {
            populate_defaults(&definition, &schema, &mut data.entities_values);
        }

        let unprocessable = compute_unprocessable(&definition, &schema, &data.entities_values);
        Ok(Self {
            definition,
            schema,
            data: DataManager::new(data),
            unprocessable: RefCell::new(unprocessable),
        })
    }

    /// The fixed schema this store interprets
    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    /// The definition this store was created with
    pub fn definition(&self) -> &Arc<BuilderDefinition> {
        &self.definition
    }

    /// Subscribe to state commits
    pub fn subscribe(
        &self,
        listener: impl Fn(&InterpreterStoreData, &[InterpreterStoreEvent]) + 'static,
    ) -> ListenerId {
        self.data.subscribe(listener)
    }

    /// Remove a previously registered listener
    pub fn unsubscribe(&self, id: ListenerId) {
        self.data.unsubscribe(id)
    }

    /// Snapshot of the current store data
    pub fn get_data(&self) -> InterpreterStoreData {
        self.data.clone_data()
    }

    /// Replace the entire store data
    pub fn set_data(&self, data: InterpreterStoreData) -> Result<()> {
        check_values_membership(&self.schema, &self.definition, &data.entities_values)?;
        check_errors_membership(&self.schema, &data.entities_errors)?;

        self.recompute_unprocessable(&data.entities_values);
        self.data.set(
            data.clone(),
            vec![InterpreterStoreEvent::DataSet { data }],
        );
        Ok(())
    }

    /// Current value of one entity, if set
    pub fn get_entity_value(&self, entity_id: &str) -> Option<Value> {
        self.data.get().entities_values.get(entity_id).cloned()
    }

    /// Snapshot of all current values
    pub fn get_entities_values(&self) -> BTreeMap<String, Value> {
        self.data.get().entities_values.clone()
    }

    /// Current error of one entity, if any
    pub fn get_entity_error(&self, entity_id: &str) -> Option<Value> {
        self.data.get().entities_errors.get(entity_id).cloned()
    }

    /// Snapshot of all current errors
    pub fn get_entities_errors(&self) -> BTreeMap<String, Value> {
        self.data.get().entities_errors.clone()
    }

    /// Whether the entity currently participates in validation/collection
    pub fn is_entity_processable(&self, entity_id: &str) -> bool {
        self.schema.contains_entity(entity_id) && !self.unprocessable.borrow().contains(entity_id)
    }

    /// Snapshot of the currently unprocessable entity ids
    pub fn get_unprocessable_entities_ids(&self) -> BTreeSet<String> {
        self.unprocessable.borrow().clone()
    }

    // ===== Value mutations =====

    /// Set one entity's value
    pub fn set_entity_value(&self, entity_id: &str, value: Value) -> Result<()> {
        self.value_kind(entity_id)?;
        let mut data = self.data.clone_data();
        data.entities_values
            .insert(entity_id.to_string(), value.clone());

        tracing::debug!(entity_id, "set entity value");
        self.recompute_unprocessable(&data.entities_values);
        self.data.set(
            data,
            vec![InterpreterStoreEvent::EntityValueUpdated {
                entity_id: entity_id.to_string(),
                value: Some(value),
            }],
        );
        Ok(())
    }

    /// Restore one entity's value to its kind's default
    pub fn reset_entity_value(&self, entity_id: &str) -> Result<()> {
        let kind = self.value_kind(entity_id)?;
        let mut data = self.data.clone_data();
        let value = self.apply_default(kind, entity_id, &mut data.entities_values);

        self.recompute_unprocessable(&data.entities_values);
        self.data.set(
            data,
            vec![InterpreterStoreEvent::EntityValueUpdated {
                entity_id: entity_id.to_string(),
                value,
            }],
        );
        Ok(())
    }

    /// Remove one entity's value entirely
    pub fn clear_entity_value(&self, entity_id: &str) -> Result<()> {
        self.value_kind(entity_id)?;
        let mut data = self.data.clone_data();
        data.entities_values.remove(entity_id);

        self.recompute_unprocessable(&data.entities_values);
        self.data.set(
            data,
            vec![InterpreterStoreEvent::EntityValueUpdated {
                entity_id: entity_id.to_string(),
                value: None,
            }],
        );
        Ok(())
    }

    /// Restore every value-carrying entity's value to its default
    pub fn reset_entities_values(&self) {
        let mut data = self.data.clone_data();
        let mut events = Vec::new();
        for (entity_id, entity) in &self.schema.entities {
            let Some(kind) = self.definition.kind(&entity.kind) else {
                continue;
            };
            if !kind.value_allowed() {
                continue;
            }
            let value = self.apply_default(kind, entity_id, &mut data.entities_values);
            events.push(InterpreterStoreEvent::EntityValueUpdated {
                entity_id: entity_id.clone(),
                value,
            });
        }
        if events.is_empty() {
            return;
        }
        self.recompute_unprocessable(&data.entities_values);
        self.data.set(data, events);
    }

    /// Remove every entity's value
    pub fn clear_entities_values(&self) {
        let mut data = self.data.clone_data();
        let cleared: Vec<String> = data.entities_values.keys().cloned().collect();
        data.entities_values.clear();

        let events: Vec<InterpreterStoreEvent> = cleared
            .into_iter()
            .map(|entity_id| InterpreterStoreEvent::EntityValueUpdated {
                entity_id,
                value: None,
            })
            .collect();
        if events.is_empty() {
            return;
        }
        self.recompute_unprocessable(&data.entities_values);
        self.data.set(data, events);
    }

    // ===== Error mutations =====

    /// Record an error for one entity, captured verbatim
    pub fn set_entity_error(&self, entity_id: &str, error: Value) -> Result<()> {
        self.ensure_entity(entity_id)?;
        let mut data = self.data.clone_data();
        data.entities_errors
            .insert(entity_id.to_string(), error.clone());
        self.data.set(
            data,
            vec![InterpreterStoreEvent::EntityErrorUpdated {
                entity_id: entity_id.to_string(),
                error: Some(error),
            }],
        );
        Ok(())
    }

    /// Clear one entity's recorded error
    pub fn reset_entity_error(&self, entity_id: &str) -> Result<()> {
        self.ensure_entity(entity_id)?;
        let mut data = self.data.clone_data();
        data.entities_errors.remove(entity_id);
        self.data.set(
            data,
            vec![InterpreterStoreEvent::EntityErrorUpdated {
                entity_id: entity_id.to_string(),
                error: None,
            }],
        );
        Ok(())
    }

    /// Replace the entire error map
    pub fn set_entities_errors(&self, errors: BTreeMap<String, Value>) -> Result<()> {
        for entity_id in errors.keys() {
            self.ensure_entity(entity_id)?;
        }
        let mut data = self.data.clone_data();
        let previous = std::mem::replace(&mut data.entities_errors, errors);

        let mut events = Vec::new();
        for entity_id in previous.keys() {
            if !data.entities_errors.contains_key(entity_id) {
                events.push(InterpreterStoreEvent::EntityErrorUpdated {
                    entity_id: entity_id.clone(),
                    error: None,
                });
            }
        }
        for (entity_id, error) in &data.entities_errors {
            events.push(InterpreterStoreEvent::EntityErrorUpdated {
                entity_id: entity_id.clone(),
                error: Some(error.clone()),
            });
        }
        self.data.set(data, events);
        Ok(())
    }

    /// Clear every recorded error
    pub fn reset_entities_errors(&self) {
        let mut data = self.data.clone_data();
        let cleared: Vec<String> = data.entities_errors.keys().cloned().collect();
        data.entities_errors.clear();

        let events: Vec<InterpreterStoreEvent> = cleared
            .into_iter()
            .map(|entity_id| InterpreterStoreEvent::EntityErrorUpdated {
                entity_id,
                error: None,
            })
            .collect();
        if events.is_empty() {
            return;
        }
        self.data.set(data, events);
    }

    // ===== Validation =====

    /// Validate one entity's value
    ///
    /// Ineligible entities (value-less kind or currently unprocessable) are
    /// skipped and any stale error is cleared.
    pub async fn validate_entity(&self, entity_id: &str) -> Result<()> {
        let entity = self
            .schema
            .entity(entity_id)
            .ok_or_else(|| InterpreterStoreError::EntityNotFound {
                entity_id: entity_id.to_string(),
            })?;
        let kind = self.kind(&entity.kind)?;

        let snapshot = self.data.clone_data();
        if !self.is_eligible(kind, entity_id) {
            if snapshot.entities_errors.contains_key(entity_id) {
                self.commit_error_outcomes(vec![(entity_id.to_string(), None)]);
            }
            return Ok(());
        }

        let ctx = ValueContext {
            schema: &self.schema,
            entity_id,
            entity,
            values: &snapshot.entities_values,
        };
        let outcome = kind
            .hooks()
            .validate(snapshot.entities_values.get(entity_id).cloned(), &ctx)
            .await;

        self.commit_error_outcomes(vec![(entity_id.to_string(), outcome.err())]);
        Ok(())
    }

    /// Validate every eligible entity's value
    ///
    /// Returns the eligible entities' values on success, or the per-entity
    /// error map when any validator rejected. Ineligible entities are
    /// excluded from the result and their stale errors cleared.
    pub async fn validate_entities(
        &self,
    ) -> std::result::Result<BTreeMap<String, Value>, BTreeMap<String, Value>> {
        let snapshot = self.data.clone_data();
        let mut errors = BTreeMap::new();
        let mut outcomes = Vec::new();

        for (entity_id, entity) in &self.schema.entities {
            let Some(kind) = self.definition.kind(&entity.kind) else {
                continue;
            };
            if !self.is_eligible(kind, entity_id) {
                if snapshot.entities_errors.contains_key(entity_id) {
                    outcomes.push((entity_id.clone(), None));
                }
                continue;
            }

            let ctx = ValueContext {
                schema: &self.schema,
                entity_id,
                entity,
                values: &snapshot.entities_values,
            };
            match kind
                .hooks()
                .validate(snapshot.entities_values.get(entity_id).cloned(), &ctx)
                .await
            {
                Ok(_) => outcomes.push((entity_id.clone(), None)),
                Err(rejection) => {
                    errors.insert(entity_id.clone(), rejection.clone());
                    outcomes.push((entity_id.clone(), Some(rejection)));
                }
            }
        }

        self.commit_error_outcomes(outcomes);

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut values = BTreeMap::new();
        for (entity_id, value) in &snapshot.entities_values {
            let eligible = self
                .schema
                .entity(entity_id)
                .and_then(|entity| self.definition.kind(&entity.kind))
                .is_some_and(|kind| self.is_eligible(kind, entity_id));
            if eligible {
                values.insert(entity_id.clone(), value.clone());
            }
        }
        Ok(values)
    }

    // ===== Internals =====

    fn ensure_entity(&self, entity_id: &str) -> Result<()> {
        if !self.schema.contains_entity(entity_id) {
            return Err(InterpreterStoreError::EntityNotFound {
                entity_id: entity_id.to_string(),
            });
        }
        Ok(())
    }

    fn kind(&self, name: &str) -> Result<&EntityKind> {
        self.definition
            .kind(name)
            .ok_or_else(|| InterpreterStoreError::UnknownEntityType {
                entity_type: name.to_string(),
            })
    }

    /// Resolve an entity's kind, requiring it to be value-carrying
    fn value_kind(&self, entity_id: &str) -> Result<&EntityKind> {
        let entity = self
            .schema
            .entity(entity_id)
            .ok_or_else(|| InterpreterStoreError::EntityNotFound {
                entity_id: entity_id.to_string(),
            })?;
        let kind = self.kind(&entity.kind)?;
        if !kind.value_allowed() {
            return Err(InterpreterStoreError::ValueNotAllowed {
                entity_id: entity_id.to_string(),
                entity_type: entity.kind.clone(),
            });
        }
        Ok(kind)
    }

    fn is_eligible(&self, kind: &EntityKind, entity_id: &str) -> bool {
        kind.value_allowed() && !self.unprocessable.borrow().contains(entity_id)
    }

    /// Remove the entity's value and re-insert its kind default, if any
    fn apply_default(
        &self,
        kind: &EntityKind,
        entity_id: &str,
        values: &mut BTreeMap<String, Value>,
    ) -> Option<Value> {
        values.remove(entity_id);
        let default = match self.schema.entity(entity_id) {
            Some(entity) => {
                let ctx = ValueContext {
                    schema: &self.schema,
                    entity_id,
                    entity,
                    values,
                };
                kind.hooks().default_value(&ctx)
            }
            None => None,
        };
        if let Some(value) = &default {
            values.insert(entity_id.to_string(), value.clone());
        }
        default
    }

    fn recompute_unprocessable(&self, values: &BTreeMap<String, Value>) {
        *self.unprocessable.borrow_mut() =
            compute_unprocessable(&self.definition, &self.schema, values);
    }

    fn commit_error_outcomes(&self, outcomes: Vec<(String, Option<Value>)>) {
        if outcomes.is_empty() {
            return;
        }
        let mut data = self.data.clone_data();
        let mut events = Vec::with_capacity(outcomes.len());
        for (entity_id, error) in outcomes {
            match &error {
                Some(value) => {
                    data.entities_errors
                        .insert(entity_id.clone(), value.clone());
                }
                None => {
                    data.entities_errors.remove(&entity_id);
                }
            }
            events.push(InterpreterStoreEvent::EntityErrorUpdated { entity_id, error });
        }
        self.data.set(data, events);
    }
}

/// Initial values must reference existing, value-carrying entities
fn check_values_membership(
    schema: &Schema,
    definition: &BuilderDefinition,
    values: &BTreeMap<String, Value>,
) -> Result<()> {
    for entity_id in values.keys() {
        let entity =
            schema
                .entity(entity_id)
                .ok_or_else(|| InterpreterStoreError::EntityNotFound {
                    entity_id: entity_id.clone(),
                })?;
        let kind = definition.kind(&entity.kind).ok_or_else(|| {
            InterpreterStoreError::UnknownEntityType {
                entity_type: entity.kind.clone(),
            }
        })?;
        if !kind.value_allowed() {
            return Err(InterpreterStoreError::ValueNotAllowed {
                entity_id: entity_id.clone(),
                entity_type: entity.kind.clone(),
            });
        }
    }
    Ok(())
}

/// Initial errors must reference existing entities
fn check_errors_membership(schema: &Schema, errors: &BTreeMap<String, Value>) -> Result<()> {
    for entity_id in errors.keys() {
        if !schema.contains_entity(entity_id) {
            return Err(InterpreterStoreError::EntityNotFound {
                entity_id: entity_id.clone(),
            });
        }
    }
    Ok(())
}

/// Fill unset values from the kinds' `default_value` hooks, in schema order
fn populate_defaults(
    definition: &BuilderDefinition,
    schema: &Schema,
    values: &mut BTreeMap<String, Value>,
) {
    for (entity_id, entity) in &schema.entities {
        let Some(kind) = definition.kind(&entity.kind) else {
            continue;
        };
        if !kind.value_allowed() || values.contains_key(entity_id) {
            continue;
        }
        let default = {
            let ctx = ValueContext {
                schema,
                entity_id,
                entity,
                values,
            };
            kind.hooks().default_value(&ctx)
        };
        if let Some(value) = default {
            values.insert(entity_id.clone(), value);
        }
    }
}
