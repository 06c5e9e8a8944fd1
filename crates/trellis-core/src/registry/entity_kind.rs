use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::extensions::AttributeExtension;
use super::hooks::{AttributeValidator, EntityValueHooks, PassthroughValueHooks};

/// Which child kinds an entity kind accepts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChildrenRule {
    /// No children at all (the `children` field must be absent)
    #[default]
    None,
    /// Any registered kind may appear as a child
    Any,
    /// Only the named kinds may appear as children
    Kinds(BTreeSet<String>),
}

/// Which parent kinds an entity kind accepts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParentsRule {
    /// Any children-bearing kind may be the parent
    #[default]
    Any,
    /// Only the named kinds may be the parent
    Kinds(BTreeSet<String>),
}

/// A single declared attribute with its base validator
pub struct AttributeDef {
    pub(crate) name: String,
    pub(crate) validate: Arc<dyn AttributeValidator>,
}

impl AttributeDef {
    /// Create an attribute definition
    pub fn new(name: impl Into<String>, validate: impl AttributeValidator + 'static) -> Self {
        Self {
            name: name.into(),
            validate: Arc::new(validate),
        }
    }

    /// The attribute's name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Descriptor for one entity kind
///
/// Constructed with builder-style `with_*` methods and registered on a
/// [`super::BuilderDefinition`]. After construction the definition merges any
/// kind-targeted extensions into the descriptor, producing the effective
/// rules the stores consult.
pub struct EntityKind {
    pub(crate) name: String,
    pub(crate) attributes: Vec<AttributeDef>,
    pub(crate) value_allowed: bool,
    pub(crate) children_allowed: ChildrenRule,
    pub(crate) parents_allowed: ParentsRule,
    pub(crate) parent_required: bool,
    pub(crate) hooks: Arc<dyn EntityValueHooks>,
    /// Per-attribute extension chain, outermost first
    pub(crate) attribute_extensions: BTreeMap<String, Vec<Arc<dyn AttributeExtension>>>,
}

impl EntityKind {
    /// Create a kind with defaults: no attributes, no value, no children,
    /// any parent allowed, parent optional
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            value_allowed: false,
            children_allowed: ChildrenRule::None,
            parents_allowed: ParentsRule::Any,
            parent_required: false,
            hooks: Arc::new(PassthroughValueHooks),
            attribute_extensions: BTreeMap::new(),
        }
    }

    /// Declare an attribute with its base validator
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        validate: impl AttributeValidator + 'static,
    ) -> Self {
        self.attributes.push(AttributeDef::new(name, validate));
        self
    }

    /// Mark the kind as value-carrying and install its value hooks
    pub fn with_value(mut self, hooks: impl EntityValueHooks + 'static) -> Self {
        self.value_allowed = true;
        self.hooks = Arc::new(hooks);
        self
    }

    /// Set the children rule
    pub fn with_children(mut self, rule: ChildrenRule) -> Self {
        self.children_allowed = rule;
        self
    }

    /// Set the allowed-parents rule
    pub fn with_allowed_parents(mut self, rule: ParentsRule) -> Self {
        self.parents_allowed = rule;
        self
    }

    /// Require instances of this kind to always have a parent
    pub fn with_parent_required(mut self) -> Self {
        self.parent_required = true;
        self
    }

    /// Install a kind-level wrapping validator for one attribute
    pub fn with_attribute_extension(
        mut self,
        attribute: impl Into<String>,
        extension: impl AttributeExtension + 'static,
    ) -> Self {
        self.attribute_extensions
            .entry(attribute.into())
            .or_default()
            .push(Arc::new(extension));
        self
    }

    /// The kind's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared attributes, in declaration order
    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    /// Look up a declared attribute by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Whether instances collect a runtime value
    pub fn value_allowed(&self) -> bool {
        self.value_allowed
    }

    /// Whether instances must have a parent
    pub fn parent_required(&self) -> bool {
        self.parent_required
    }

    /// The kind's runtime value hooks
    pub fn hooks(&self) -> &dyn EntityValueHooks {
        self.hooks.as_ref()
    }

    /// Whether instances may carry children at all
    pub fn allows_children(&self) -> bool {
        self.children_allowed != ChildrenRule::None
    }

    /// Whether the given kind may appear among this kind's children
    pub fn allows_child_kind(&self, kind: &str) -> bool {
        match &self.children_allowed {
            ChildrenRule::None => false,
            ChildrenRule::Any => true,
            ChildrenRule::Kinds(kinds) => kinds.contains(kind),
        }
    }

    /// Whether the given kind may be this kind's parent
    pub fn allows_parent_kind(&self, kind: &str) -> bool {
        match &self.parents_allowed {
            ParentsRule::Any => true,
            ParentsRule::Kinds(kinds) => kinds.contains(kind),
        }
    }

    /// Extension chain for an attribute, outermost first
    pub(crate) fn extension_chain(&self, attribute: &str) -> &[Arc<dyn AttributeExtension>] {
        self.attribute_extensions
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl std::fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityKind")
            .field("name", &self.name)
            .field(
                "attributes",
                &self
                    .attributes
                    .iter()
                    .map(AttributeDef::name)
                    .collect::<Vec<_>>(),
            )
            .field("value_allowed", &self.value_allowed)
            .field("children_allowed", &self.children_allowed)
            .field("parents_allowed", &self.parents_allowed)
            .field("parent_required", &self.parent_required)
            .finish_non_exhaustive()
    }
}
