use lightning_invoice::{Invoice, InvoiceDescription};
use serde::Deserialize;
use xerror::zap_engine::InvoiceError;

/// Raw LNURL-pay callback response. Providers either return `pr` or an
/// explicit error status with their own reason text.
#[derive(Deserialize, Debug, Clone)]
pub struct LnurlInvoiceResponse {
    #[serde(default)]
    pub pr: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// What invoice verification established, for logging and cross-checks.
#[derive(Debug, Clone)]
pub struct VerifiedInvoice {
    pub bolt11: String,
    pub amount_msats: Option<u64>,
    /// False when the invoice carried no description hash and the check
    /// was skipped.
    pub committed_to_request: bool,
}

/// Callback URL per LNURL-pay + zaps: amount in msat, the signed request
/// JSON under `nostr`, the bech32 lnurl, and an optional comment.
pub fn build_callback_url(
    callback: &str,
    amount_msats: u64,
    zap_request_json: &str,
    lnurl_bech32: &str,
    comment: Option<&str>,
) -> Result<String, InvoiceError> {
    let mut url = url::Url::parse(callback)
        .map_err(|_| InvoiceError::RequestFailed(String::from("malformed callback URL")))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("amount", &amount_msats.to_string());
        pairs.append_pair("nostr", zap_request_json);
        pairs.append_pair("lnurl", lnurl_bech32);
        if let Some(comment) = comment.filter(|comment| !comment.is_empty()) {
            pairs.append_pair("comment", comment);
        }
    }
    Ok(url.to_string())
}

/// Surfaces an explicit provider error unmodified, otherwise the invoice.
pub fn extract_invoice(response: &LnurlInvoiceResponse) -> Result<String, InvoiceError> {
    let is_error = response
        .status
        .as_deref()
        .map(|status| status.eq_ignore_ascii_case("error"))
        .unwrap_or(false);
    if is_error {
        let reason = response
            .reason
            .clone()
            .unwrap_or_else(|| String::from("no reason given"));
        return Err(InvoiceError::Provider(reason));
    }
    response
        .pr
        .clone()
        .filter(|pr| !pr.is_empty())
        .ok_or(InvoiceError::MalformedResponse)
}

/// Cross-checks the returned BOLT11 against the signed zap request. A
/// present description hash must commit to the request's canonical JSON;
/// an embedded amount must equal the requested msat amount. Defeats
/// invoice substitution by a hostile endpoint.
pub fn verify_invoice(
    bolt11: &str,
    zap_request_json: &str,
    amount_msats: u64,
) -> Result<VerifiedInvoice, InvoiceError> {
    let decoded = bolt11.parse::<Invoice>().map_err(|_| InvoiceError::InvalidInvoice)?;

    let committed_to_request = match decoded.description() {
        InvoiceDescription::Hash(hash) => {
            if !description_hash_matches(&hash.0.to_string(), zap_request_json) {
                return Err(InvoiceError::DescriptionHashMismatch);
            }
            true
        }
        InvoiceDescription::Direct(_) => false,
    };

    let invoice_msats = decoded.amount_milli_satoshis();
    if let Some(embedded) = invoice_msats {
        if embedded != amount_msats {
            return Err(InvoiceError::AmountMismatch);
        }
    }

    Ok(VerifiedInvoice {
        bolt11: bolt11.to_string(),
        amount_msats: invoice_msats,
        committed_to_request,
    })
}

pub fn description_hash_matches(hash_hex: &str, zap_request_json: &str) -> bool {
    sha256::digest(zap_request_json) == hash_hex.to_lowercase()
}
