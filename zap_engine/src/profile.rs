use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use core_types::nostr::NostrProfile;
use nostr_sdk::prelude::{FromPkStr, Keys, Kind, SubscriptionFilter};
use nostr_sdk::Client;

/// Relay transport boundary. The engine only needs profile lookups and the
/// currently connected relay set (used as zap receipt hints).
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Latest kind-0 metadata for the pubkey. `None` covers both "no
    /// profile on file" and an unresponsive relay (bounded timeout).
    async fn fetch_profile(&self, pubkey: &str) -> Option<NostrProfile>;

    async fn connected_relays(&self) -> Vec<String>;
}

pub struct NostrRelayClient {
    client: Client,
    profile_timeout: Duration,
}

impl NostrRelayClient {
    pub async fn connect(
        keys: Keys,
        relay_urls: Vec<String>,
        profile_timeout: Duration,
    ) -> Result<Self, nostr_sdk::client::Error> {
        let client = Client::new(&keys);
        let relays: Vec<(String, Option<SocketAddr>)> = relay_urls.into_iter().map(|url| (url, None)).collect();
        client.add_relays(relays).await?;
        client.connect().await;
        Ok(Self {
            client,
            profile_timeout,
        })
    }
}

#[async_trait]
impl RelayClient for NostrRelayClient {
    async fn fetch_profile(&self, pubkey: &str) -> Option<NostrProfile> {
        let keys = Keys::from_pk_str(pubkey).ok()?;

        let subscription = SubscriptionFilter::new()
            .author(keys.public_key())
            .kind(Kind::Metadata)
            .limit(1);

        let events = self
            .client
            .get_events_of(vec![subscription], Some(self.profile_timeout))
            .await
            .ok()?;

        let event = events.first()?;
        serde_json::from_str::<NostrProfile>(&event.content).ok()
    }

    async fn connected_relays(&self) -> Vec<String> {
        self.client
            .relays()
            .await
            .keys()
            .map(|url| url.to_string())
            .collect()
    }
}
