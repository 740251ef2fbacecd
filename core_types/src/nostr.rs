use serde::{Deserialize, Serialize};

/// Kind-0 metadata content, reduced to the fields the zap pipeline reads.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NostrProfile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    lud06: Option<String>,
    #[serde(default)]
    lud16: Option<String>,
    #[serde(default)]
    nip05: Option<String>,
}

impl NostrProfile {
    pub fn new(
        name: Option<String>,
        display_name: Option<String>,
        lud06: Option<String>,
        lud16: Option<String>,
        nip05: Option<String>,
    ) -> Self {
        Self {
            name,
            display_name,
            lud06,
            lud16,
            nip05,
        }
    }

    pub fn name(&self) -> &Option<String> {
        &self.name
    }

    pub fn display_name(&self) -> &Option<String> {
        &self.display_name
    }

    /// Legacy bech32 lnurl field.
    pub fn lud06(&self) -> &Option<String> {
        &self.lud06
    }

    /// Lightning address (`user@domain`) field.
    pub fn lud16(&self) -> &Option<String> {
        &self.lud16
    }

    pub fn nip05(&self) -> &Option<String> {
        &self.nip05
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parses_partial_metadata() {
        let content = r#"{"name":"alice","lud16":"alice@relay.example","about":"ignored"}"#;
        let profile = serde_json::from_str::<NostrProfile>(content).unwrap();
        assert_eq!(profile.name().as_deref(), Some("alice"));
        assert_eq!(profile.lud16().as_deref(), Some("alice@relay.example"));
        assert!(profile.lud06().is_none());
    }
}
