pub mod entity;
pub mod schema;

pub use entity::Entity;
pub use schema::Schema;
