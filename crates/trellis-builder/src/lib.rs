//! Trellis Builder - design-time schema editing store
//!
//! The builder store owns a mutable entity tree and exposes the editing
//! operations a schema-authoring UI needs: add, move, reorder, delete and
//! clone entities, set attributes, and track validation errors. Every
//! mutation is validated against the builder definition before any state
//! changes, then committed atomically together with the ordered batch of
//! events describing the change.

pub mod data;
pub mod errors;
pub mod events;
pub mod store;

mod tree;

// Re-export commonly used types
pub use data::BuilderStoreData;
pub use errors::{BuilderStoreError, Result};
pub use events::BuilderStoreEvent;
pub use store::{BuilderStore, NewEntity};
