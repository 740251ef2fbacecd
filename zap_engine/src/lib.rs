use serde::{Deserialize, Serialize};
use utils::xlogging::LoggingSettings;

pub mod invoice;
pub mod metadata;
pub mod payment;
pub mod profile;
pub mod resolver;
pub mod signer;
mod zap_engine;

pub use crate::zap_engine::{SendZap, ZapCollaborators, ZapEngine};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ZapEngineSettings {
    /// Relays used for kind-0 profile lookups.
    pub relay_urls: Vec<String>,
    /// Transport key for the relay client. Profile lookups only, never
    /// used to sign zap requests.
    pub nostr_private_key: String,
    pub profile_timeout_ms: u64,
    pub http_timeout_ms: u64,
    pub metadata_cache_ttl_secs: u64,
    pub profile_cache_ttl_secs: u64,
    pub cache_capacity: usize,
    pub logging_settings: LoggingSettings,
}

impl Default for ZapEngineSettings {
    fn default() -> Self {
        Self {
            relay_urls: Vec::new(),
            nostr_private_key: String::new(),
            profile_timeout_ms: 3000,
            http_timeout_ms: 10000,
            metadata_cache_ttl_secs: 300,
            profile_cache_ttl_secs: 300,
            cache_capacity: 128,
            logging_settings: LoggingSettings::new("zap_engine"),
        }
    }
}
