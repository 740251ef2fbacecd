use err_derive::Error;
use serde::Serialize;

#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error(display = "Recipient has no lightning address or lnurl to pay.")]
    NoPayableEndpoint,
    #[error(display = "Lnurl endpoint uses a disallowed scheme. Only https, or http for .onion hosts, is accepted.")]
    DisallowedScheme,
    #[error(display = "Supplied lnurl could not be decoded.")]
    InvalidLnurl,
    #[error(display = "Lightning address is malformed.")]
    InvalidAddress,
}

#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error(display = "Could not reach the pay endpoint: {}", _0)]
    FetchFailed(String),
    #[error(display = "Pay endpoint returned malformed metadata.")]
    MalformedResponse,
    #[error(display = "This recipient's wallet does not support zaps.")]
    ZapsUnsupported,
    #[error(display = "Pay endpoint declares missing or invalid sendable bounds.")]
    InvalidBounds,
    #[error(display = "Amount must be between {} and {} sats.", min_sats, max_sats)]
    AmountOutOfRange { min_sats: u64, max_sats: u64 },
}

#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error(display = "No Nostr signer available. Connect a signer extension or sign in again.")]
    NoSigner,
    #[error(display = "Signer refused to sign the zap request: {}", _0)]
    SignerRefused(String),
    #[error(display = "Configured signing key is invalid.")]
    InvalidKey,
    #[error(display = "Signer returned an event signed by an unexpected pubkey.")]
    PubkeyMismatch,
    #[error(display = "Signed zap request failed validation: {}", _0)]
    InvalidRequest(String),
    #[error(display = "No relays available to deliver the zap receipt.")]
    NoRelays,
}

#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
pub enum InvoiceError {
    #[error(display = "Invoice request failed: {}", _0)]
    RequestFailed(String),
    #[error(display = "Pay endpoint returned an error: {}", _0)]
    Provider(String),
    #[error(display = "Pay endpoint returned a malformed invoice response.")]
    MalformedResponse,
    #[error(display = "Returned invoice could not be decoded.")]
    InvalidInvoice,
    #[error(display = "Invoice description hash does not commit to the signed zap request. Refusing to pay.")]
    DescriptionHashMismatch,
    #[error(display = "Invoice amount does not match the requested amount.")]
    AmountMismatch,
}

#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error(display = "No wallet bridge is available.")]
    BridgeUnavailable,
    #[error(display = "Wallet rejected the payment: {}", _0)]
    Rejected(String),
    #[error(display = "There is no invoice to retry. Send the zap first.")]
    NothingToRetry,
}

#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error(display = "Configured transport key is invalid.")]
    InvalidTransportKey,
    #[error(display = "Could not connect to relays: {}", _0)]
    RelayConnect(String),
    #[error(display = "Could not build the HTTP client: {}", _0)]
    HttpClient(String),
}

#[derive(Debug, Error, Serialize, Clone, PartialEq, Eq)]
pub enum ZapError {
    #[error(display = "{}", _0)]
    Resolve(ResolveError),
    #[error(display = "{}", _0)]
    Metadata(MetadataError),
    #[error(display = "{}", _0)]
    Sign(SignError),
    #[error(display = "{}", _0)]
    Invoice(InvoiceError),
    #[error(display = "{}", _0)]
    Payment(PaymentError),
    #[error(display = "Zap attempt was superseded by a newer attempt.")]
    StaleAttempt,
}
