//! Machine identity credential record.

/// Credentials issued for non-human API access, persisted between runs.
///
/// Written wholesale on every save, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineCredentials {
    pub client_id: String,
    pub client_secret: String,
    /// Admin bootstrap token, kept only when bootstrap just ran.
    pub token: Option<String>,
}

impl MachineCredentials {
    /// A record is complete when both halves of the identity are present.
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_requires_both_fields() {
        let full = MachineCredentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
            token: None,
        };
        assert!(full.is_complete());

        let missing_secret = MachineCredentials {
            client_id: "id".into(),
            client_secret: String::new(),
            token: Some("tok".into()),
        };
        assert!(!missing_secret.is_complete());
    }
}
