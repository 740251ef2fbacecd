use std::time::Duration;

use async_trait::async_trait;
use core_types::zap::LnurlPayMetadata;
use core_types::{msats_to_sats_ceil, msats_to_sats_floor};
use xerror::zap_engine::{InvoiceError, MetadataError};

use crate::invoice::LnurlInvoiceResponse;

/// LNURL HTTP boundary: the pay-endpoint metadata fetch and the invoice
/// callback. Both hit the same provider, so they share one client.
#[async_trait]
pub trait LnurlClient: Send + Sync {
    async fn fetch_pay_metadata(&self, endpoint_url: &str) -> Result<LnurlPayMetadata, MetadataError>;

    async fn request_invoice(&self, callback_url: &str) -> Result<LnurlInvoiceResponse, InvoiceError>;
}

pub struct HttpLnurlClient {
    client: reqwest::Client,
}

impl HttpLnurlClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LnurlClient for HttpLnurlClient {
    async fn fetch_pay_metadata(&self, endpoint_url: &str) -> Result<LnurlPayMetadata, MetadataError> {
        let body = self
            .client
            .get(endpoint_url)
            .send()
            .await
            .map_err(|err| MetadataError::FetchFailed(err.to_string()))?
            .text()
            .await
            .map_err(|err| MetadataError::FetchFailed(err.to_string()))?;
        serde_json::from_str::<LnurlPayMetadata>(&body).map_err(|_| MetadataError::MalformedResponse)
    }

    async fn request_invoice(&self, callback_url: &str) -> Result<LnurlInvoiceResponse, InvoiceError> {
        let body = self
            .client
            .get(callback_url)
            .send()
            .await
            .map_err(|err| InvoiceError::RequestFailed(err.to_string()))?
            .text()
            .await
            .map_err(|err| InvoiceError::RequestFailed(err.to_string()))?;
        serde_json::from_str::<LnurlInvoiceResponse>(&body).map_err(|_| InvoiceError::MalformedResponse)
    }
}

/// The endpoint must declare Nostr-zap support before any signing work.
/// Returns the endpoint's zap signing pubkey.
pub fn ensure_zappable(metadata: &LnurlPayMetadata) -> Result<&str, MetadataError> {
    match &metadata.nostr_pubkey {
        Some(pubkey) if metadata.allows_nostr && !pubkey.is_empty() => Ok(pubkey),
        _ => Err(MetadataError::ZapsUnsupported),
    }
}

/// Local amount-bound enforcement. Missing or inverted bounds are rejected
/// rather than skipped; violations name the valid range in whole sats.
pub fn check_amount_bounds(metadata: &LnurlPayMetadata, amount_msats: u64) -> Result<(), MetadataError> {
    let (min, max) = match (metadata.min_sendable, metadata.max_sendable) {
        (Some(min), Some(max)) if min > 0 && min <= max => (min, max),
        _ => return Err(MetadataError::InvalidBounds),
    };
    if amount_msats < min || amount_msats > max {
        return Err(MetadataError::AmountOutOfRange {
            min_sats: msats_to_sats_ceil(min),
            max_sats: msats_to_sats_floor(max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::sats_to_msats;

    fn metadata(min: Option<u64>, max: Option<u64>) -> LnurlPayMetadata {
        LnurlPayMetadata {
            callback: "https://relay.example/lnurlp/alice/callback".to_string(),
            min_sendable: min,
            max_sendable: max,
            comment_allowed: Some(255),
            allows_nostr: true,
            nostr_pubkey: Some("9630f464cca6a5147aa8a35f0bcdd3ce485324e732fd39e09233b1d848238f31".to_string()),
        }
    }

    #[test]
    fn test_bounds_violations_name_sat_range() {
        let metadata = metadata(Some(1000), Some(5000000));
        let err = check_amount_bounds(&metadata, sats_to_msats(0)).unwrap_err();
        assert_eq!(err.to_string(), "Amount must be between 1 and 5000 sats.");
        let err = check_amount_bounds(&metadata, sats_to_msats(5001)).unwrap_err();
        assert_eq!(err.to_string(), "Amount must be between 1 and 5000 sats.");
    }

    #[test]
    fn test_bounds_accept_edges() {
        let metadata = metadata(Some(1000), Some(5000000));
        assert!(check_amount_bounds(&metadata, 1000).is_ok());
        assert!(check_amount_bounds(&metadata, 5000000).is_ok());
    }

    #[test]
    fn test_missing_or_inverted_bounds_rejected() {
        assert_eq!(
            check_amount_bounds(&metadata(None, Some(1000)), 1000),
            Err(MetadataError::InvalidBounds)
        );
        assert_eq!(
            check_amount_bounds(&metadata(Some(2000), Some(1000)), 1500),
            Err(MetadataError::InvalidBounds)
        );
        assert_eq!(
            check_amount_bounds(&metadata(Some(0), Some(1000)), 500),
            Err(MetadataError::InvalidBounds)
        );
    }

    #[test]
    fn test_zap_support_required() {
        let mut m = metadata(Some(1000), Some(5000000));
        assert!(ensure_zappable(&m).is_ok());
        m.allows_nostr = false;
        assert_eq!(ensure_zappable(&m), Err(MetadataError::ZapsUnsupported));
        m.allows_nostr = true;
        m.nostr_pubkey = None;
        assert_eq!(ensure_zappable(&m), Err(MetadataError::ZapsUnsupported));
    }
}
