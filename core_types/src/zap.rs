use serde::{Deserialize, Serialize};

use crate::{msats_to_sats_ceil, msats_to_sats_floor};

/// Who is being zapped. At least one of the fields must yield a resolvable
/// pay endpoint; `relay_hints` are carried into the zap request so the
/// recipient's wallet can find the receipt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LightningRecipient {
    pub lightning_address: Option<String>,
    pub lnurl: Option<String>,
    pub pubkey: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub relay_hints: Vec<String>,
}

/// Canonical pay endpoint, always carrying both encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LnurlDetails {
    /// bech32 `lnurl1...` form, lowercase.
    pub lnurl_bech32: String,
    /// Plain https (or onion http) URL the metadata is fetched from.
    pub endpoint_url: String,
    /// Whatever the caller originally supplied (address, lnurl or URL).
    pub fetch_input: String,
    /// `user@domain` identifier when the input was a lightning address.
    pub identifier: Option<String>,
}

/// LNURL-pay endpoint capabilities, cached per endpoint URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LnurlPayMetadata {
    pub callback: String,
    /// Minimum sendable amount in msat.
    #[serde(default)]
    pub min_sendable: Option<u64>,
    /// Maximum sendable amount in msat.
    #[serde(default)]
    pub max_sendable: Option<u64>,
    /// Maximum comment length the endpoint accepts, in bytes.
    #[serde(default)]
    pub comment_allowed: Option<u64>,
    #[serde(default)]
    pub allows_nostr: bool,
    #[serde(default)]
    pub nostr_pubkey: Option<String>,
}

impl LnurlPayMetadata {
    /// Whole-sat bounds for display: min rounded up, max rounded down.
    pub fn sat_bounds(&self) -> Option<(u64, u64)> {
        match (self.min_sendable, self.max_sendable) {
            (Some(min), Some(max)) => Some((msats_to_sats_ceil(min), msats_to_sats_floor(max))),
            _ => None,
        }
    }

    pub fn comment_budget(&self) -> usize {
        self.comment_allowed.unwrap_or(0) as usize
    }
}

/// The content being zapped. Empty target means a profile zap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZapTarget {
    pub event_id: Option<String>,
    pub kind: Option<u64>,
    /// `d`-tag identifier for addressable kinds.
    pub identifier: Option<String>,
}

/// Snapshot of the authenticated session, as handed over by the session
/// provider collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZapSession {
    pub pubkey: String,
    /// Server-held private key for custodial (non-extension) accounts.
    pub custodial_key: Option<String>,
    pub uses_extension: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZapSendResult {
    pub invoice: String,
    pub paid: bool,
    pub payment_preimage: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZapStatus {
    Idle,
    Resolving,
    Signing,
    RequestingInvoice,
    InvoiceReady,
    Paying,
    Success,
    Error,
}

impl Default for ZapStatus {
    fn default() -> Self {
        ZapStatus::Idle
    }
}

/// Observable pipeline state: current stage plus the partial results
/// accumulated so far. Owned by one engine instance; `attempt` is the
/// staleness token bumped on every new send and on reset.
#[derive(Debug, Clone, Default)]
pub struct ZapState {
    pub status: ZapStatus,
    pub attempt: u64,
    pub lnurl_details: Option<LnurlDetails>,
    pub metadata: Option<LnurlPayMetadata>,
    pub zap_request_json: Option<String>,
    pub invoice: Option<String>,
    pub payment_preimage: Option<String>,
    pub webln_error: Option<String>,
    pub error: Option<String>,
}

impl ZapState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to `Idle` with all carried fields cleared. The token keeps
    /// growing so late results from an abandoned attempt stay stale.
    pub fn reset(&mut self) {
        let attempt = self.attempt + 1;
        *self = Self {
            attempt,
            ..Self::default()
        };
    }

    pub fn begin_attempt(&mut self) -> u64 {
        let attempt = self.attempt + 1;
        *self = Self {
            attempt,
            status: ZapStatus::Resolving,
            ..Self::default()
        };
        attempt
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.attempt == token
    }

    pub fn fail(&mut self, message: String) {
        self.status = ZapStatus::Error;
        self.error = Some(message);
    }

    /// Sat bounds of the resolved endpoint, for UI display.
    pub fn min_zap_sats(&self) -> Option<u64> {
        self.metadata.as_ref().and_then(|m| m.sat_bounds()).map(|(min, _)| min)
    }

    pub fn max_zap_sats(&self) -> Option<u64> {
        self.metadata.as_ref().and_then(|m| m.sat_bounds()).map(|(_, max)| max)
    }
}
