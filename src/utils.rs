//! Shared utilities: identifier minting, timestamp minting and decimal
//! quantization.

use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of fractional digits carried by trade records and displayed
/// quantities.
pub const DISPLAY_SCALE: u32 = 8;

static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Mint a process-unique identifier with the given prefix.
///
/// Identifiers are formatted `{prefix}_{n}` where `n` is drawn from a
/// process-wide monotonic counter, so ids minted for one symbol are strictly
/// increasing in acceptance order.
///
/// # Examples
///
/// ```
/// use matchbook_rs::next_id;
///
/// let a = next_id("ord");
/// let b = next_id("tr");
/// assert!(a.starts_with("ord_"));
/// assert!(b.starts_with("tr_"));
/// ```
#[must_use]
pub fn next_id(prefix: &str) -> String {
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{n}")
}

/// Return the current UTC time as an RFC 3339 timestamp with `Z` suffix.
#[must_use]
pub fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Quantize a decimal to 8 fractional digits with half-up rounding.
///
/// The result always carries exactly 8 fractional digits in its textual
/// form (`3` becomes `3.00000000`), which keeps trade records and market
/// data frames byte-stable across save/load round trips.
#[must_use]
pub fn quantize_8(value: Decimal) -> Decimal {
    let mut quantized =
        value.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    quantized.rescale(DISPLAY_SCALE);
    quantized
}
