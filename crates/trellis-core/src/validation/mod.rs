pub mod integrity;
pub mod values;

pub use integrity::{check_schema_integrity, ensure_schema_integrity, SchemaIntegrityError};
pub use values::{
    validate_checked_schema, validate_schema, validate_schema_attributes,
    EntitiesAttributesErrors, SchemaError,
};
