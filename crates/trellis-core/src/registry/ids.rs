use uuid::Uuid;

/// Entity ID generation and format validation
///
/// A definition carries exactly one strategy; every ID that enters a schema
/// (generated or supplied) must satisfy `validate`.
pub trait IdStrategy: Send + Sync {
    /// Produce a fresh entity ID
    fn generate(&self) -> String;

    /// Check an ID's format, returning the rejection reason on failure
    fn validate(&self, id: &str) -> Result<(), String>;
}

/// Default strategy: random UUID v4, accepting v4 or the nil UUID
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Ids;

impl IdStrategy for UuidV4Ids {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn validate(&self, id: &str) -> Result<(), String> {
        match Uuid::parse_str(id) {
            Ok(parsed) if parsed.is_nil() || parsed.get_version_num() == 4 => Ok(()),
            Ok(parsed) => Err(format!(
                "expected a v4 or nil UUID, got version {}",
                parsed.get_version_num()
            )),
            Err(err) => Err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_validate() {
        let ids = UuidV4Ids;
        let id = ids.generate();
        assert!(ids.validate(&id).is_ok());
    }

    #[test]
    fn test_nil_uuid_accepted() {
        let ids = UuidV4Ids;
        assert!(ids.validate("00000000-0000-0000-0000-000000000000").is_ok());
    }

    #[test]
    fn test_non_uuid_rejected() {
        let ids = UuidV4Ids;
        assert!(ids.validate("not-a-uuid").is_err());
    }

    #[test]
    fn test_wrong_version_rejected() {
        let ids = UuidV4Ids;
        // v1 layout UUID
        assert!(ids.validate("c232ab00-9414-11ec-b3c8-9f6bdeced846").is_err());
    }
}
