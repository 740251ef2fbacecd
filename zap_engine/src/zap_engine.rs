use std::sync::Arc;
use std::time::Duration;

use core_types::nostr::NostrProfile;
use core_types::sats_to_msats;
use core_types::zap::{
    LightningRecipient, LnurlDetails, LnurlPayMetadata, ZapSendResult, ZapSession, ZapState, ZapStatus, ZapTarget,
};
use nostr_sdk::prelude::{FromSkStr, Keys};
use slog::Logger;
use utils::cache::TtlCache;
use utils::text::truncate_utf8;
use xerror::zap_engine::{InitError, MetadataError, PaymentError, ResolveError, SignError, ZapError};

use crate::invoice::{build_callback_url, extract_invoice, verify_invoice};
use crate::metadata::{check_amount_bounds, ensure_zappable, HttpLnurlClient, LnurlClient};
use crate::payment::{attempt_payment, WalletBridge};
use crate::profile::{NostrRelayClient, RelayClient};
use crate::resolver;
use crate::signer::{
    build_zap_request_draft, finalize_signed_request, merge_relays, resolve_signer, SignerBridge, ZapRequestParams,
};
use crate::ZapEngineSettings;

#[derive(Debug, Clone)]
pub struct SendZap {
    pub amount_sats: u64,
    pub note: String,
}

/// Injected external boundaries. Everything the engine talks to goes
/// through one of these.
pub struct ZapCollaborators {
    pub relay_client: Arc<dyn RelayClient>,
    pub lnurl_client: Arc<dyn LnurlClient>,
    pub signer_bridge: Option<Arc<dyn SignerBridge>>,
    pub wallet_bridge: Option<Arc<dyn WalletBridge>>,
}

/// One zap pipeline per recipient. Owns the observable [`ZapState`] and the
/// metadata/profile caches; concurrent sends to different recipients use
/// separate engine instances.
pub struct ZapEngine {
    recipient: LightningRecipient,
    target: ZapTarget,
    session: ZapSession,
    relay_client: Arc<dyn RelayClient>,
    lnurl_client: Arc<dyn LnurlClient>,
    signer_bridge: Option<Arc<dyn SignerBridge>>,
    wallet_bridge: Option<Arc<dyn WalletBridge>>,
    metadata_cache: TtlCache<String, LnurlPayMetadata>,
    profile_cache: TtlCache<String, Option<NostrProfile>>,
    state: ZapState,
    logger: Logger,
}

impl std::fmt::Debug for ZapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZapEngine").finish_non_exhaustive()
    }
}

impl ZapEngine {
    pub fn new(
        settings: &ZapEngineSettings,
        recipient: LightningRecipient,
        target: ZapTarget,
        session: ZapSession,
        collaborators: ZapCollaborators,
        logger: Logger,
    ) -> Self {
        Self {
            recipient,
            target,
            session,
            relay_client: collaborators.relay_client,
            lnurl_client: collaborators.lnurl_client,
            signer_bridge: collaborators.signer_bridge,
            wallet_bridge: collaborators.wallet_bridge,
            metadata_cache: TtlCache::new(
                Duration::from_secs(settings.metadata_cache_ttl_secs),
                settings.cache_capacity,
            ),
            profile_cache: TtlCache::new(
                Duration::from_secs(settings.profile_cache_ttl_secs),
                settings.cache_capacity,
            ),
            state: ZapState::new(),
            logger,
        }
    }

    /// Builds a fully wired engine from settings, for embedding in a
    /// service binary: connected relay client, timeout-configured HTTP
    /// client, and a logger built from the logging settings.
    pub async fn from_settings(
        settings: &ZapEngineSettings,
        recipient: LightningRecipient,
        target: ZapTarget,
        session: ZapSession,
        signer_bridge: Option<Arc<dyn SignerBridge>>,
        wallet_bridge: Option<Arc<dyn WalletBridge>>,
    ) -> Result<Self, InitError> {
        let logger = utils::xlogging::init_log(&settings.logging_settings);

        let transport_keys =
            Keys::from_sk_str(&settings.nostr_private_key).map_err(|_| InitError::InvalidTransportKey)?;
        let relay_client = NostrRelayClient::connect(
            transport_keys,
            settings.relay_urls.clone(),
            Duration::from_millis(settings.profile_timeout_ms),
        )
        .await
        .map_err(|err| InitError::RelayConnect(err.to_string()))?;
        let lnurl_client = HttpLnurlClient::new(Duration::from_millis(settings.http_timeout_ms))
            .map_err(|err| InitError::HttpClient(err.to_string()))?;

        Ok(Self::new(
            settings,
            recipient,
            target,
            session,
            ZapCollaborators {
                relay_client: Arc::new(relay_client),
                lnurl_client: Arc::new(lnurl_client),
                signer_bridge,
                wallet_bridge,
            },
            logger,
        ))
    }

    pub fn zap_state(&self) -> &ZapState {
        &self.state
    }

    pub fn reset_zap_state(&mut self) {
        self.state.reset();
    }

    pub fn min_zap_sats(&self) -> Option<u64> {
        self.state.min_zap_sats()
    }

    pub fn max_zap_sats(&self) -> Option<u64> {
        self.state.max_zap_sats()
    }

    /// Pre-flight metadata fetch so a UI can show zap bounds before the
    /// user commits an amount. Shares the send pipeline's cache.
    pub async fn load_pay_metadata(&mut self) -> Result<LnurlPayMetadata, ZapError> {
        let details = self.resolve_endpoint().await.map_err(ZapError::Resolve)?;
        let metadata = self
            .fetch_pay_metadata_cached(&details.endpoint_url)
            .await
            .map_err(ZapError::Metadata)?;
        self.state.lnurl_details = Some(details);
        self.state.metadata = Some(metadata.clone());
        Ok(metadata)
    }

    /// Runs the full pipeline: resolve, fetch metadata, sign, request and
    /// verify the invoice, then optionally attempt settlement. Payment
    /// failures resolve with `paid: false`; everything earlier rejects
    /// with a human-readable message.
    pub async fn send_zap(&mut self, send: SendZap) -> Result<ZapSendResult, ZapError> {
        let token = self.state.begin_attempt();
        slog::debug!(self.logger, "Sending zap of {} sats", send.amount_sats);

        let details = self.resolve_endpoint().await.map_err(ZapError::Resolve);
        let details = self.checked(token, details)?;
        self.state.lnurl_details = Some(details.clone());

        let metadata = self
            .fetch_pay_metadata_cached(&details.endpoint_url)
            .await
            .map_err(ZapError::Metadata);
        let metadata = self.checked(token, metadata)?;
        self.state.metadata = Some(metadata.clone());

        let zappable = ensure_zappable(&metadata).map(|_| ()).map_err(ZapError::Metadata);
        self.checked(token, zappable)?;

        let amount_msats = sats_to_msats(send.amount_sats);
        let bounds = check_amount_bounds(&metadata, amount_msats).map_err(ZapError::Metadata);
        self.checked(token, bounds)?;

        self.transition(token, ZapStatus::Signing)?;

        let recipient_pubkey = self
            .recipient
            .pubkey
            .clone()
            .filter(|pubkey| !pubkey.is_empty())
            .ok_or_else(|| ZapError::Sign(SignError::InvalidRequest(String::from("recipient pubkey is unknown"))));
        let recipient_pubkey = self.checked(token, recipient_pubkey)?;

        let connected_relays = self.relay_client.connected_relays().await;
        let relays = merge_relays(&self.recipient.relay_hints, &connected_relays);

        let draft = build_zap_request_draft(&ZapRequestParams {
            recipient_pubkey: &recipient_pubkey,
            target: &self.target,
            amount_msats,
            relays: &relays,
            lnurl_bech32: &details.lnurl_bech32,
            comment: &send.note,
            comment_budget: metadata.comment_budget(),
        })
        .map_err(ZapError::Sign);
        let draft = self.checked(token, draft)?;

        let signer = resolve_signer(&self.session, self.signer_bridge.clone()).map_err(ZapError::Sign);
        let signer = self.checked(token, signer)?;
        let signer_pubkey = signer.public_key().await.map_err(ZapError::Sign);
        let signer_pubkey = self.checked(token, signer_pubkey)?;
        let signed = signer.sign(draft).await.map_err(ZapError::Sign);
        let signed = self.checked(token, signed)?;
        let finalized = finalize_signed_request(signed, &signer_pubkey, amount_msats).map_err(ZapError::Sign);
        let zap_request = self.checked(token, finalized)?;

        let zap_request_json = zap_request
            .as_json()
            .map_err(|e| ZapError::Sign(SignError::InvalidRequest(e.to_string())));
        let zap_request_json = self.checked(token, zap_request_json)?;
        self.state.zap_request_json = Some(zap_request_json.clone());

        self.transition(token, ZapStatus::RequestingInvoice)?;

        let comment = truncate_utf8(&send.note, metadata.comment_budget());
        let callback_url = build_callback_url(
            &metadata.callback,
            amount_msats,
            &zap_request_json,
            &details.lnurl_bech32,
            Some(comment),
        )
        .map_err(ZapError::Invoice);
        let callback_url = self.checked(token, callback_url)?;

        let response = self
            .lnurl_client
            .request_invoice(&callback_url)
            .await
            .map_err(ZapError::Invoice);
        let response = self.checked(token, response)?;
        let invoice = extract_invoice(&response).map_err(ZapError::Invoice);
        let invoice = self.checked(token, invoice)?;

        let verified = verify_invoice(&invoice, &zap_request_json, amount_msats).map_err(ZapError::Invoice);
        let verified = self.checked(token, verified)?;
        if !verified.committed_to_request {
            slog::warn!(
                self.logger,
                "Invoice carries no description hash, skipping zap request commitment check"
            );
        }

        self.transition(token, ZapStatus::InvoiceReady)?;
        self.state.invoice = Some(invoice.clone());

        let wallet_bridge = match &self.wallet_bridge {
            Some(bridge) => bridge.clone(),
            None => {
                slog::info!(self.logger, "No wallet bridge present, handing invoice back for manual settlement");
                return Ok(ZapSendResult {
                    invoice,
                    paid: false,
                    payment_preimage: None,
                });
            }
        };

        self.transition(token, ZapStatus::Paying)?;
        match attempt_payment(wallet_bridge.as_ref(), &invoice).await {
            Ok(receipt) => {
                if self.state.is_current(token) {
                    self.state.status = ZapStatus::Success;
                    self.state.payment_preimage = receipt.preimage.clone();
                }
                Ok(ZapSendResult {
                    invoice,
                    paid: true,
                    payment_preimage: receipt.preimage,
                })
            }
            Err(err) => {
                slog::warn!(self.logger, "Wallet payment failed: {}", err);
                if self.state.is_current(token) {
                    self.state.status = ZapStatus::InvoiceReady;
                    self.state.webln_error = Some(err.to_string());
                }
                Ok(ZapSendResult {
                    invoice,
                    paid: false,
                    payment_preimage: None,
                })
            }
        }
    }

    /// Payment-stage-only retry: re-attempts settlement of the invoice
    /// already obtained, without re-resolving or re-signing anything.
    pub async fn retry_webln_payment(&mut self) -> Result<bool, ZapError> {
        if self.state.status != ZapStatus::InvoiceReady {
            return Err(ZapError::Payment(PaymentError::NothingToRetry));
        }
        let invoice = match self.state.invoice.clone() {
            Some(invoice) => invoice,
            None => return Err(ZapError::Payment(PaymentError::NothingToRetry)),
        };
        let bridge = match &self.wallet_bridge {
            Some(bridge) => bridge.clone(),
            None => return Err(ZapError::Payment(PaymentError::BridgeUnavailable)),
        };

        let token = self.state.attempt;
        self.state.status = ZapStatus::Paying;
        self.state.webln_error = None;

        match attempt_payment(bridge.as_ref(), &invoice).await {
            Ok(receipt) => {
                if self.state.is_current(token) {
                    self.state.status = ZapStatus::Success;
                    self.state.payment_preimage = receipt.preimage;
                }
                Ok(true)
            }
            Err(err) => {
                slog::warn!(self.logger, "Wallet payment retry failed: {}", err);
                if self.state.is_current(token) {
                    self.state.status = ZapStatus::InvoiceReady;
                    self.state.webln_error = Some(err.to_string());
                }
                Ok(false)
            }
        }
    }

    async fn resolve_endpoint(&mut self) -> Result<LnurlDetails, ResolveError> {
        if self.recipient.lnurl.is_some() || self.recipient.lightning_address.is_some() {
            return resolver::resolve_recipient(&self.recipient);
        }
        let pubkey = match self.recipient.pubkey.clone().filter(|pubkey| !pubkey.is_empty()) {
            Some(pubkey) => pubkey,
            None => return Err(ResolveError::NoPayableEndpoint),
        };
        match self.lookup_profile(&pubkey).await {
            Some(profile) => resolver::resolve_profile_endpoint(&profile),
            None => Err(ResolveError::NoPayableEndpoint),
        }
    }

    async fn lookup_profile(&mut self, pubkey: &str) -> Option<NostrProfile> {
        if let Some(cached) = self.profile_cache.get(&pubkey.to_string()) {
            return cached.clone();
        }
        let fetched = self.relay_client.fetch_profile(pubkey).await;
        self.profile_cache.insert(pubkey.to_string(), fetched.clone());
        fetched
    }

    async fn fetch_pay_metadata_cached(&mut self, endpoint_url: &str) -> Result<LnurlPayMetadata, MetadataError> {
        if let Some(cached) = self.metadata_cache.get(&endpoint_url.to_string()) {
            return Ok(cached.clone());
        }
        let metadata = self.lnurl_client.fetch_pay_metadata(endpoint_url).await?;
        self.metadata_cache.insert(endpoint_url.to_string(), metadata.clone());
        Ok(metadata)
    }

    /// Applies a stage result: stale tokens are dropped without touching
    /// state, failures are recorded on the state before propagating.
    fn checked<T>(&mut self, token: u64, result: Result<T, ZapError>) -> Result<T, ZapError> {
        if !self.state.is_current(token) {
            return Err(ZapError::StaleAttempt);
        }
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                self.state.fail(err.to_string());
                Err(err)
            }
        }
    }

    fn transition(&mut self, token: u64, status: ZapStatus) -> Result<(), ZapError> {
        if !self.state.is_current(token) {
            return Err(ZapError::StaleAttempt);
        }
        self.state.status = status;
        Ok(())
    }
}
