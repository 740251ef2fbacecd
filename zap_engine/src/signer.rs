use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use core_types::is_addressable_kind;
use core_types::zap::{ZapSession, ZapTarget};
use nostr_sdk::nostr::event::{EventBuilder, Kind, Tag, TagKind};
use nostr_sdk::nostr::{Event, Keys};
use nostr_sdk::prelude::FromSkStr;
use utils::text::truncate_utf8;
use xerror::zap_engine::SignError;

pub const ZAP_REQUEST_KIND: u64 = 9734;

/// Fully-populated unsigned zap request, handed to whichever signer wins
/// the capability check.
#[derive(Debug, Clone)]
pub struct ZapRequestDraft {
    pub tags: Vec<Tag>,
    pub content: String,
}

pub struct ZapRequestParams<'a> {
    pub recipient_pubkey: &'a str,
    pub target: &'a ZapTarget,
    pub amount_msats: u64,
    pub relays: &'a [String],
    pub lnurl_bech32: &'a str,
    pub comment: &'a str,
    /// Endpoint's `commentAllowed` budget in bytes.
    pub comment_budget: usize,
}

/// Builds the canonical kind-9734 draft: `p`, optional `e`/`a`, `amount`,
/// `relays` and `lnurl` tags, comment truncated on UTF-8 boundaries.
pub fn build_zap_request_draft(params: &ZapRequestParams) -> Result<ZapRequestDraft, SignError> {
    if params.recipient_pubkey.is_empty() {
        return Err(SignError::InvalidRequest(String::from("recipient pubkey is unknown")));
    }
    if params.relays.is_empty() {
        return Err(SignError::NoRelays);
    }

    let mut tags = vec![custom_tag("p", vec![params.recipient_pubkey.to_string()])];

    let addressable_kind = params.target.kind.filter(|kind| is_addressable_kind(*kind));
    match (addressable_kind, &params.target.identifier) {
        (Some(kind), Some(identifier)) => {
            tags.push(custom_tag(
                "a",
                vec![format!("{}:{}:{}", kind, params.recipient_pubkey, identifier)],
            ));
        }
        _ => {
            if let Some(event_id) = &params.target.event_id {
                tags.push(custom_tag("e", vec![event_id.clone()]));
            }
        }
    }

    tags.push(custom_tag("amount", vec![params.amount_msats.to_string()]));
    tags.push(custom_tag("relays", params.relays.to_vec()));
    tags.push(custom_tag("lnurl", vec![params.lnurl_bech32.to_string()]));

    let content = truncate_utf8(params.comment, params.comment_budget).to_string();

    Ok(ZapRequestDraft { tags, content })
}

/// Union of caller-supplied hints and the sender's connected relays,
/// de-duplicated, hint order first.
pub fn merge_relays(hints: &[String], connected: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    hints
        .iter()
        .chain(connected.iter())
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty() && seen.insert(url.clone()))
        .collect()
}

fn custom_tag(kind: &str, values: Vec<String>) -> Tag {
    Tag::Generic(TagKind::Custom(kind.to_string()), values)
}

/// Signing strategy. Picked once per attempt by [`resolve_signer`].
#[async_trait]
pub trait ZapSigner: Send + Sync {
    async fn public_key(&self) -> Result<String, SignError>;

    async fn sign(&self, draft: ZapRequestDraft) -> Result<Event, SignError>;
}

/// Browser-extension boundary (`window.nostr`-style): the extension owns
/// the key, we only see the draft going in and a signed event coming out.
#[async_trait]
pub trait SignerBridge: Send + Sync {
    async fn get_public_key(&self) -> Result<String, SignError>;

    async fn sign_event(&self, draft: ZapRequestDraft) -> Result<Event, SignError>;
}

/// Signs with a server-held key (non-extension accounts).
pub struct CustodialSigner {
    keys: Keys,
}

impl CustodialSigner {
    pub fn from_secret_hex(secret: &str) -> Result<Self, SignError> {
        let keys = Keys::from_sk_str(secret).map_err(|_| SignError::InvalidKey)?;
        Ok(Self { keys })
    }
}

#[async_trait]
impl ZapSigner for CustodialSigner {
    async fn public_key(&self) -> Result<String, SignError> {
        Ok(self.keys.public_key().to_string())
    }

    async fn sign(&self, draft: ZapRequestDraft) -> Result<Event, SignError> {
        EventBuilder::new(Kind::Custom(ZAP_REQUEST_KIND), draft.content.as_str(), &draft.tags)
            .to_event(&self.keys)
            .map_err(|err| SignError::SignerRefused(err.to_string()))
    }
}

/// Delegates to an injected extension bridge.
pub struct BridgeSigner {
    bridge: Arc<dyn SignerBridge>,
}

impl BridgeSigner {
    pub fn new(bridge: Arc<dyn SignerBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl ZapSigner for BridgeSigner {
    async fn public_key(&self) -> Result<String, SignError> {
        self.bridge.get_public_key().await
    }

    async fn sign(&self, draft: ZapRequestDraft) -> Result<Event, SignError> {
        self.bridge.sign_event(draft).await
    }
}

/// Capability check: custodial key wins for non-extension sessions, then
/// the extension bridge; neither is a terminal "connect a signer" failure.
/// A custodial key that does not belong to the session's pubkey is a
/// misconfiguration and is rejected before anything gets signed.
pub fn resolve_signer(
    session: &ZapSession,
    bridge: Option<Arc<dyn SignerBridge>>,
) -> Result<Box<dyn ZapSigner>, SignError> {
    if !session.uses_extension {
        if let Some(secret) = &session.custodial_key {
            let signer = CustodialSigner::from_secret_hex(secret)?;
            if !session.pubkey.is_empty()
                && signer.keys.public_key().to_string() != session.pubkey.to_lowercase()
            {
                return Err(SignError::PubkeyMismatch);
            }
            return Ok(Box::new(signer));
        }
    }
    match bridge {
        Some(bridge) => Ok(Box::new(BridgeSigner::new(bridge))),
        None => Err(SignError::NoSigner),
    }
}

/// Post-signing checks: the event must be signed by the resolved signer's
/// own pubkey and must still carry the draft's structure.
pub fn finalize_signed_request(event: Event, signer_pubkey: &str, amount_msats: u64) -> Result<Event, SignError> {
    if event.pubkey.to_string() != signer_pubkey.to_lowercase() {
        return Err(SignError::PubkeyMismatch);
    }
    event
        .verify()
        .map_err(|_| SignError::InvalidRequest(String::from("signature does not verify")))?;
    validate_zap_request(&event, amount_msats)?;
    Ok(event)
}

/// Structural validation of a signed zap request: right kind, exactly the
/// tags a provider will accept, amount agreement. Catches bridges that
/// mangle the draft before we spend an invoice request on it.
pub fn validate_zap_request(event: &Event, amount_msats: u64) -> Result<(), SignError> {
    if event.kind != Kind::Custom(ZAP_REQUEST_KIND) {
        return Err(SignError::InvalidRequest(String::from("wrong event kind")));
    }

    let mut pubkey_tags_count = 0;
    let mut event_tags_count = 0;
    let mut relays = Vec::new();
    let mut amount = Option::<u64>::default();
    for tag in event.tags.iter() {
        match tag {
            Tag::PubKey(_, _) => {
                pubkey_tags_count += 1;
            }
            Tag::Event(_, _, _) => {
                event_tags_count += 1;
            }
            Tag::Generic(TagKind::Custom(kind), values) => match kind.as_str() {
                "p" => {
                    pubkey_tags_count += 1;
                }
                "e" => {
                    event_tags_count += 1;
                }
                "relays" => {
                    relays = values.clone();
                }
                "amount" => {
                    amount = values.first().and_then(|value| value.parse().ok());
                }
                _ => {}
            },
            _ => {}
        }
    }

    if pubkey_tags_count != 1 {
        return Err(SignError::InvalidRequest(String::from("expected exactly one p tag")));
    }
    if event_tags_count > 1 {
        return Err(SignError::InvalidRequest(String::from("more than one e tag")));
    }
    if relays.is_empty() {
        return Err(SignError::NoRelays);
    }
    match amount {
        Some(value) if value == amount_msats => Ok(()),
        Some(_) => Err(SignError::InvalidRequest(String::from("amount tag mismatch"))),
        None => Err(SignError::InvalidRequest(String::from("missing amount tag"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::zap::ZapTarget;

    // Throwaway key, not used anywhere outside these tests.
    const TEST_SECRET: &str = "6b911fd37cdf5c81d4c0adb1ab7fa822ed253ab0ad9aa18d77257c88b29b718e";

    fn params<'a>(target: &'a ZapTarget, relays: &'a [String]) -> ZapRequestParams<'a> {
        ZapRequestParams {
            recipient_pubkey: "9630f464cca6a5147aa8a35f0bcdd3ce485324e732fd39e09233b1d848238f31",
            target,
            amount_msats: 1000000,
            relays,
            lnurl_bech32: "lnurl1dp68gurn8ghj7um9wfmxjcm99e3k7mf0v9cxj0m385ekvcenxc6r2c35xvukxefcv5mkvv34x5ekzd3ev56nyd3hxqurzepexejxxepnxscrvwfnv9nxzcn9xq6xyefhvgcxxcmyxymnserxfq5fns",
            comment: "gm ⚡",
            comment_budget: 255,
        }
    }

    fn tag_values(event_tags: &[Tag], wanted: &str) -> Option<Vec<String>> {
        event_tags.iter().find_map(|tag| match tag {
            Tag::Generic(TagKind::Custom(kind), values) if kind == wanted => Some(values.clone()),
            _ => None,
        })
    }

    #[test]
    fn test_draft_carries_p_amount_relays_lnurl() {
        let target = ZapTarget::default();
        let relays = vec!["wss://relay.example".to_string()];
        let draft = build_zap_request_draft(&params(&target, &relays)).unwrap();

        assert_eq!(
            tag_values(&draft.tags, "p").unwrap(),
            vec!["9630f464cca6a5147aa8a35f0bcdd3ce485324e732fd39e09233b1d848238f31".to_string()]
        );
        assert_eq!(tag_values(&draft.tags, "amount").unwrap(), vec!["1000000".to_string()]);
        assert_eq!(tag_values(&draft.tags, "relays").unwrap(), relays);
        assert!(tag_values(&draft.tags, "lnurl").is_some());
        assert!(tag_values(&draft.tags, "e").is_none());
        assert!(tag_values(&draft.tags, "a").is_none());
        assert_eq!(draft.content, "gm ⚡");
    }

    #[test]
    fn test_event_target_uses_e_tag() {
        let target = ZapTarget {
            event_id: Some("ab".repeat(32)),
            kind: Some(1),
            identifier: None,
        };
        let relays = vec!["wss://relay.example".to_string()];
        let draft = build_zap_request_draft(&params(&target, &relays)).unwrap();
        assert_eq!(tag_values(&draft.tags, "e").unwrap(), vec!["ab".repeat(32)]);
        assert!(tag_values(&draft.tags, "a").is_none());
    }

    #[test]
    fn test_addressable_target_uses_a_tag() {
        let target = ZapTarget {
            event_id: Some("ab".repeat(32)),
            kind: Some(30023),
            identifier: Some("intro-to-zaps".to_string()),
        };
        let relays = vec!["wss://relay.example".to_string()];
        let draft = build_zap_request_draft(&params(&target, &relays)).unwrap();
        assert_eq!(
            tag_values(&draft.tags, "a").unwrap(),
            vec![
                "30023:9630f464cca6a5147aa8a35f0bcdd3ce485324e732fd39e09233b1d848238f31:intro-to-zaps"
                    .to_string()
            ]
        );
        assert!(tag_values(&draft.tags, "e").is_none());
    }

    #[test]
    fn test_addressable_kind_without_identifier_falls_back_to_e_tag() {
        let target = ZapTarget {
            event_id: Some("cd".repeat(32)),
            kind: Some(30023),
            identifier: None,
        };
        let relays = vec!["wss://relay.example".to_string()];
        let draft = build_zap_request_draft(&params(&target, &relays)).unwrap();
        assert!(tag_values(&draft.tags, "a").is_none());
        assert_eq!(tag_values(&draft.tags, "e").unwrap(), vec!["cd".repeat(32)]);
    }

    #[test]
    fn test_comment_truncated_on_char_boundary() {
        let target = ZapTarget::default();
        let relays = vec!["wss://relay.example".to_string()];
        let mut p = params(&target, &relays);
        p.comment_budget = 4;
        let draft = build_zap_request_draft(&p).unwrap();
        assert_eq!(draft.content, "gm ");
        assert!(draft.content.len() <= 4);
    }

    #[test]
    fn test_empty_relays_rejected() {
        let target = ZapTarget::default();
        let relays: Vec<String> = Vec::new();
        assert_eq!(
            build_zap_request_draft(&params(&target, &relays)).unwrap_err(),
            SignError::NoRelays
        );
    }

    #[test]
    fn test_merge_relays_dedupes_and_keeps_hint_order() {
        let hints = vec!["wss://a.example".to_string(), "wss://b.example".to_string()];
        let connected = vec![
            "wss://b.example".to_string(),
            "wss://c.example".to_string(),
            " ".to_string(),
        ];
        assert_eq!(
            merge_relays(&hints, &connected),
            vec![
                "wss://a.example".to_string(),
                "wss://b.example".to_string(),
                "wss://c.example".to_string()
            ]
        );
    }

    #[test]
    fn test_custodial_key_must_belong_to_session_pubkey() {
        let own_pubkey = Keys::from_sk_str(TEST_SECRET).unwrap().public_key().to_string();
        let session = ZapSession {
            pubkey: own_pubkey,
            custodial_key: Some(TEST_SECRET.to_string()),
            uses_extension: false,
        };
        assert!(resolve_signer(&session, None).is_ok());

        let session = ZapSession {
            pubkey: "ab".repeat(32),
            custodial_key: Some(TEST_SECRET.to_string()),
            uses_extension: false,
        };
        assert!(matches!(resolve_signer(&session, None), Err(SignError::PubkeyMismatch)));
    }

    #[test]
    fn test_no_signer_available() {
        let session = ZapSession {
            pubkey: "9630f464cca6a5147aa8a35f0bcdd3ce485324e732fd39e09233b1d848238f31".to_string(),
            custodial_key: None,
            uses_extension: true,
        };
        assert!(matches!(resolve_signer(&session, None), Err(SignError::NoSigner)));
    }

    #[tokio::test]
    async fn test_custodial_signer_produces_verifiable_request() {
        let session = ZapSession {
            pubkey: String::new(),
            custodial_key: Some(TEST_SECRET.to_string()),
            uses_extension: false,
        };
        let signer = resolve_signer(&session, None).unwrap();
        let signer_pubkey = signer.public_key().await.unwrap();

        let target = ZapTarget::default();
        let relays = vec!["wss://relay.example".to_string()];
        let draft = build_zap_request_draft(&params(&target, &relays)).unwrap();
        let event = signer.sign(draft).await.unwrap();
        let event = finalize_signed_request(event, &signer_pubkey, 1000000).unwrap();
        assert_eq!(event.kind, Kind::Custom(ZAP_REQUEST_KIND));
        assert_eq!(event.pubkey.to_string(), signer_pubkey);
    }

    #[tokio::test]
    async fn test_finalize_rejects_foreign_pubkey() {
        let signer = CustodialSigner::from_secret_hex(TEST_SECRET).unwrap();
        let target = ZapTarget::default();
        let relays = vec!["wss://relay.example".to_string()];
        let draft = build_zap_request_draft(&params(&target, &relays)).unwrap();
        let event = signer.sign(draft).await.unwrap();
        let err = finalize_signed_request(
            event,
            "9630f464cca6a5147aa8a35f0bcdd3ce485324e732fd39e09233b1d848238f31",
            1000000,
        )
        .unwrap_err();
        assert_eq!(err, SignError::PubkeyMismatch);
    }

    #[tokio::test]
    async fn test_validate_rejects_amount_drift() {
        let signer = CustodialSigner::from_secret_hex(TEST_SECRET).unwrap();
        let target = ZapTarget::default();
        let relays = vec!["wss://relay.example".to_string()];
        let draft = build_zap_request_draft(&params(&target, &relays)).unwrap();
        let event = signer.sign(draft).await.unwrap();
        assert!(validate_zap_request(&event, 999999).is_err());
        assert!(validate_zap_request(&event, 1000000).is_ok());
    }
}
