use bech32::{self, FromBase32, ToBase32};

const PREFIX: &str = "lnurl";

/// Encodes a pay-endpoint URL into its bech32 `lnurl1...` form.
pub fn encode(endpoint_url: &str) -> Result<String, bech32::Error> {
    let validated_url = url::Url::parse(endpoint_url)
        .map_err(|_| bech32::Error::InvalidData(0))?
        .to_string();
    bech32::encode(PREFIX, validated_url.as_bytes().to_base32())
}

/// Decodes a bech32 lnurl (either case) back into the endpoint URL.
pub fn decode(encoded: &str) -> Result<String, bech32::Error> {
    let (hrp, data) = bech32::decode(encoded)?;
    if hrp.to_lowercase() != PREFIX {
        return Err(bech32::Error::MissingSeparator);
    }
    let base_32 = Vec::<u8>::from_base32(&data)?;
    let str = std::str::from_utf8(&base_32).map_err(|_| bech32::Error::InvalidData(0))?;
    let validated_url = url::Url::parse(str)
        .map_err(|_| bech32::Error::InvalidData(0))?
        .to_string();
    Ok(validated_url)
}

/// LNURL-pay well-known path for a `user@domain` lightning address.
/// Onion hosts get plain http, everything else https.
pub fn well_known_url(user: &str, domain: &str) -> String {
    let scheme = if is_onion_host(domain) { "http" } else { "https" };
    format!("{scheme}://{domain}/.well-known/lnurlp/{user}")
}

pub fn is_onion_host(host: &str) -> bool {
    let host = host.trim_end_matches('.');
    host == "onion" || host.ends_with(".onion")
}
