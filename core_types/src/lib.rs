pub mod nostr;
pub mod zap;

pub const MSATS_IN_SAT: u64 = 1000;

/// Nostr kinds in this range are addressable (parameterized replaceable)
/// and are referenced by `kind:pubkey:identifier` rather than event id.
pub const ADDRESSABLE_KIND_RANGE: std::ops::Range<u64> = 30000..40000;

pub fn sats_to_msats(sats: u64) -> u64 {
    sats * MSATS_IN_SAT
}

/// Smallest whole-sat amount at or above the given msat amount.
pub fn msats_to_sats_ceil(msats: u64) -> u64 {
    (msats + MSATS_IN_SAT - 1) / MSATS_IN_SAT
}

/// Largest whole-sat amount at or below the given msat amount.
pub fn msats_to_sats_floor(msats: u64) -> u64 {
    msats / MSATS_IN_SAT
}

pub fn is_addressable_kind(kind: u64) -> bool {
    ADDRESSABLE_KIND_RANGE.contains(&kind)
}
