use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use super::entity_kind::{ChildrenRule, ParentsRule};
use super::hooks::{AttributeContext, AttributeValidator, ValidateResult};

/// A wrapping attribute validator layer
///
/// Extensions compose top-down: a definition-level extension wraps any
/// kind-level extension, which wraps the base validator. Each layer receives
/// `next`, bound to the layer beneath it, and decides whether (and with what
/// value) to invoke it.
#[async_trait]
pub trait AttributeExtension: Send + Sync {
    async fn validate(
        &self,
        value: Option<Value>,
        ctx: &AttributeContext<'_>,
        next: &NextValidate<'_>,
    ) -> ValidateResult;
}

/// Handle to the remainder of an attribute validation chain
pub struct NextValidate<'a> {
    layers: &'a [Arc<dyn AttributeExtension>],
    base: &'a dyn AttributeValidator,
    ctx: &'a AttributeContext<'a>,
}

impl<'a> NextValidate<'a> {
    pub(crate) fn new(
        layers: &'a [Arc<dyn AttributeExtension>],
        base: &'a dyn AttributeValidator,
        ctx: &'a AttributeContext<'a>,
    ) -> Self {
        Self { layers, base, ctx }
    }

    /// Run the layer beneath the current one
    pub fn validate(&self, value: Option<Value>) -> BoxFuture<'_, ValidateResult> {
        Box::pin(async move {
            match self.layers.split_first() {
                Some((layer, rest)) => {
                    let next = NextValidate::new(rest, self.base, self.ctx);
                    layer.validate(value, self.ctx, &next).await
                }
                None => self.base.validate(value, self.ctx).await,
            }
        })
    }
}

/// Adapter turning a plain function into an [`AttributeExtension`]
pub struct FnExtension<F>(pub F);

#[async_trait]
impl<F> AttributeExtension for FnExtension<F>
where
    F: for<'a, 'b> Fn(Option<Value>, &AttributeContext<'a>, &NextValidate<'b>) -> ValidateResult
        + Send
        + Sync,
{
    async fn validate(
        &self,
        value: Option<Value>,
        ctx: &AttributeContext<'_>,
        next: &NextValidate<'_>,
    ) -> ValidateResult {
        (self.0)(value, ctx, next)
    }
}

/// Definition-level overrides for one entity kind
///
/// Applied when the definition is built: attribute validators are layered on
/// top of the kind's own extensions, structural rules replace the kind's
/// declared ones.
pub struct EntityExtension {
    pub(crate) kind: String,
    pub(crate) attribute_validators: BTreeMap<String, Arc<dyn AttributeExtension>>,
    pub(crate) children_allowed: Option<ChildrenRule>,
    pub(crate) parents_allowed: Option<ParentsRule>,
    pub(crate) parent_required: Option<bool>,
}

impl EntityExtension {
    /// Target the named entity kind
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attribute_validators: BTreeMap::new(),
            children_allowed: None,
            parents_allowed: None,
            parent_required: None,
        }
    }

    /// Wrap the named attribute's validation chain
    pub fn with_attribute_validator(
        mut self,
        attribute: impl Into<String>,
        extension: impl AttributeExtension + 'static,
    ) -> Self {
        self.attribute_validators
            .insert(attribute.into(), Arc::new(extension));
        self
    }

    /// Replace the kind's children rule
    pub fn with_children_allowed(mut self, rule: ChildrenRule) -> Self {
        self.children_allowed = Some(rule);
        self
    }

    /// Replace the kind's allowed-parents rule
    pub fn with_parents_allowed(mut self, rule: ParentsRule) -> Self {
        self.parents_allowed = Some(rule);
        self
    }

    /// Replace the kind's parent-required flag
    pub fn with_parent_required(mut self, required: bool) -> Self {
        self.parent_required = Some(required);
        self
    }
}
