use core_types::nostr::NostrProfile;
use core_types::zap::{LightningRecipient, LnurlDetails};
use utils::lnurl;
use xerror::zap_engine::ResolveError;

const LNURL_HRP: &str = "lnurl1";

/// Resolves the explicit fields of a recipient descriptor into a canonical
/// pay endpoint. Priority: `lnurl` over `lightning_address`. Profile-derived
/// fallbacks go through [`resolve_profile_endpoint`] once the orchestrator
/// has fetched the profile.
pub fn resolve_recipient(recipient: &LightningRecipient) -> Result<LnurlDetails, ResolveError> {
    if let Some(input) = &recipient.lnurl {
        return resolve_input(input);
    }
    if let Some(address) = &recipient.lightning_address {
        return resolve_address(address);
    }
    Err(ResolveError::NoPayableEndpoint)
}

/// Lightning address or legacy lnurl taken from a kind-0 profile.
pub fn resolve_profile_endpoint(profile: &NostrProfile) -> Result<LnurlDetails, ResolveError> {
    if let Some(address) = profile.lud16() {
        return resolve_address(address);
    }
    if let Some(input) = profile.lud06() {
        return resolve_input(input);
    }
    Err(ResolveError::NoPayableEndpoint)
}

/// Accepts a bech32 lnurl or a plain endpoint URL, producing both forms.
pub fn resolve_input(input: &str) -> Result<LnurlDetails, ResolveError> {
    let trimmed = input.trim();
    if trimmed.to_lowercase().starts_with(LNURL_HRP) {
        let endpoint_url = lnurl::decode(trimmed).map_err(|_| ResolveError::InvalidLnurl)?;
        check_endpoint_scheme(&endpoint_url)?;
        return Ok(LnurlDetails {
            lnurl_bech32: trimmed.to_lowercase(),
            endpoint_url,
            fetch_input: input.to_string(),
            identifier: None,
        });
    }
    if trimmed.contains("://") {
        let endpoint_url = check_endpoint_scheme(trimmed)?;
        let lnurl_bech32 = lnurl::encode(&endpoint_url).map_err(|_| ResolveError::InvalidLnurl)?;
        return Ok(LnurlDetails {
            lnurl_bech32,
            endpoint_url,
            fetch_input: input.to_string(),
            identifier: None,
        });
    }
    if trimmed.contains('@') {
        return resolve_address(trimmed);
    }
    Err(ResolveError::NoPayableEndpoint)
}

/// Maps `user@domain` onto its well-known LNURL-pay endpoint.
pub fn resolve_address(address: &str) -> Result<LnurlDetails, ResolveError> {
    let trimmed = address.trim();
    let (user, domain) = trimmed.split_once('@').ok_or(ResolveError::InvalidAddress)?;
    if user.is_empty() || domain.is_empty() || domain.contains('@') || trimmed.contains(char::is_whitespace) {
        return Err(ResolveError::InvalidAddress);
    }
    let domain = domain.to_lowercase();
    let endpoint_url = lnurl::well_known_url(user, &domain);
    check_endpoint_scheme(&endpoint_url)?;
    let lnurl_bech32 = lnurl::encode(&endpoint_url).map_err(|_| ResolveError::InvalidAddress)?;
    Ok(LnurlDetails {
        lnurl_bech32,
        endpoint_url,
        fetch_input: address.to_string(),
        identifier: Some(format!("{user}@{domain}")),
    })
}

/// Fail-closed scheme policy: https anywhere, http only for onion hosts.
/// Returns the normalized URL.
fn check_endpoint_scheme(endpoint_url: &str) -> Result<String, ResolveError> {
    let parsed = url::Url::parse(endpoint_url).map_err(|_| ResolveError::InvalidLnurl)?;
    let allowed = match parsed.scheme() {
        "https" => true,
        "http" => parsed.host_str().map(lnurl::is_onion_host).unwrap_or(false),
        _ => false,
    };
    if !allowed {
        return Err(ResolveError::DisallowedScheme);
    }
    Ok(parsed.to_string())
}
