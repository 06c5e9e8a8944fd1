use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::DefinitionError;

use super::entity_kind::{AttributeDef, ChildrenRule, EntityKind, ParentsRule};
use super::extensions::{EntityExtension, NextValidate};
use super::hooks::{AttributeContext, IdentitySchemaHook, SchemaHook, ValidateResult};
use super::ids::{IdStrategy, UuidV4Ids};

/// Builder Definition - the static registry of entity kinds and structural rules
///
/// Immutable once built and safe to share across many store instances. All
/// registry lookups performed at runtime are guaranteed to be consistent:
/// construction rejects duplicate names, rules and extensions that reference
/// unregistered kinds or attributes.
pub struct BuilderDefinition {
    kinds: BTreeMap<String, EntityKind>,
    ids: Arc<dyn IdStrategy>,
    schema_hook: Arc<dyn SchemaHook>,
}

impl BuilderDefinition {
    /// Start building a definition
    pub fn builder() -> DefinitionBuilder {
        DefinitionBuilder {
            kinds: Vec::new(),
            ids: None,
            schema_hook: None,
            extensions: Vec::new(),
        }
    }

    /// Look up an entity kind by name
    pub fn kind(&self, name: &str) -> Option<&EntityKind> {
        self.kinds.get(name)
    }

    /// All registered kinds, in name order
    pub fn kinds(&self) -> impl Iterator<Item = &EntityKind> {
        self.kinds.values()
    }

    /// The definition's ID strategy
    pub fn ids(&self) -> &dyn IdStrategy {
        self.ids.as_ref()
    }

    /// The whole-schema custom validator
    pub fn schema_hook(&self) -> &dyn SchemaHook {
        self.schema_hook.as_ref()
    }

    /// Run an attribute's full validation chain (extensions, then base)
    pub async fn run_attribute_validator(
        &self,
        kind: &EntityKind,
        attribute: &AttributeDef,
        value: Option<Value>,
        ctx: &AttributeContext<'_>,
    ) -> ValidateResult {
        let chain = kind.extension_chain(attribute.name());
        let next = NextValidate::new(chain, attribute.validate.as_ref(), ctx);
        next.validate(value).await
    }
}

impl std::fmt::Debug for BuilderDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderDefinition")
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Accumulates kinds, hooks and extensions, then validates the whole registry
pub struct DefinitionBuilder {
    kinds: Vec<EntityKind>,
    ids: Option<Arc<dyn IdStrategy>>,
    schema_hook: Option<Arc<dyn SchemaHook>>,
    extensions: Vec<EntityExtension>,
}

impl DefinitionBuilder {
    /// Register an entity kind
    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Replace the default UUID v4 ID strategy
    pub fn ids(mut self, strategy: impl IdStrategy + 'static) -> Self {
        self.ids = Some(Arc::new(strategy));
        self
    }

    /// Install a whole-schema custom validator
    pub fn schema_validator(mut self, hook: impl SchemaHook + 'static) -> Self {
        self.schema_hook = Some(Arc::new(hook));
        self
    }

    /// Apply definition-level overrides to a registered kind
    pub fn extend_entity(mut self, extension: EntityExtension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Validate the registry and produce the immutable definition
    pub fn build(self) -> Result<BuilderDefinition, DefinitionError> {
        let mut kinds: BTreeMap<String, EntityKind> = BTreeMap::new();

        for kind in self.kinds {
            let mut seen_attrs = std::collections::BTreeSet::new();
            for attr in &kind.attributes {
                if !seen_attrs.insert(attr.name.clone()) {
                    return Err(DefinitionError::DuplicateAttribute {
                        kind: kind.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
            }
            for attribute in kind.attribute_extensions.keys() {
                if !seen_attrs.contains(attribute) {
                    return Err(DefinitionError::UnknownExtensionAttribute {
                        kind: kind.name.clone(),
                        attribute: attribute.clone(),
                    });
                }
            }
            if kinds.contains_key(&kind.name) {
                return Err(DefinitionError::DuplicateKind { kind: kind.name });
            }
            kinds.insert(kind.name.clone(), kind);
        }

        // Definition-level extensions layer on top of kind-level ones.
        for extension in self.extensions {
            let Some(kind) = kinds.get_mut(&extension.kind) else {
                return Err(DefinitionError::UnknownExtensionKind {
                    kind: extension.kind,
                });
            };
            for (attribute, layer) in extension.attribute_validators {
                if kind.attribute(&attribute).is_none() {
                    return Err(DefinitionError::UnknownExtensionAttribute {
                        kind: kind.name.clone(),
                        attribute,
                    });
                }
                kind.attribute_extensions
                    .entry(attribute)
                    .or_default()
                    .insert(0, layer);
            }
            if let Some(rule) = extension.children_allowed {
                kind.children_allowed = rule;
            }
            if let Some(rule) = extension.parents_allowed {
                kind.parents_allowed = rule;
            }
            if let Some(required) = extension.parent_required {
                kind.parent_required = required;
            }
        }

        // Structural rules may only name registered kinds.
        for kind in kinds.values() {
            if let ChildrenRule::Kinds(children) = &kind.children_allowed {
                for child in children {
                    if !kinds.contains_key(child) {
                        return Err(DefinitionError::UnknownChildKind {
                            kind: kind.name.clone(),
                            referenced: child.clone(),
                        });
                    }
                }
            }
            if let ParentsRule::Kinds(parents) = &kind.parents_allowed {
                for parent in parents {
                    if !kinds.contains_key(parent) {
                        return Err(DefinitionError::UnknownParentKind {
                            kind: kind.name.clone(),
                            referenced: parent.clone(),
                        });
                    }
                }
            }
        }

        Ok(BuilderDefinition {
            kinds,
            ids: self.ids.unwrap_or_else(|| Arc::new(UuidV4Ids)),
            schema_hook: self
                .schema_hook
                .unwrap_or_else(|| Arc::new(IdentitySchemaHook)),
        })
    }
}
