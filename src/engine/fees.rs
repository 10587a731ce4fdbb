//! Fee schedule for maker and taker fees

use crate::utils::quantize_8;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Basis points divisor: 1 bps = 0.01% = 1/10_000 of notional.
const BPS_DIVISOR: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Configurable fee schedule for maker and taker fees.
///
/// Fees are expressed in basis points (bps), where 1 bps = 0.01%. Negative
/// maker values represent rebates paid for providing liquidity. Fees are
/// computed on the notional (price × quantity) of each individual fill and
/// quantized to 8 decimal places at that boundary; intermediates stay exact.
///
/// # Examples
///
/// ```
/// use matchbook_rs::FeeSchedule;
/// use rust_decimal_macros::dec;
///
/// // 1 bps maker rebate, 2.5 bps taker fee
/// let schedule = FeeSchedule::new(dec!(-1.0), dec!(2.5));
/// let (maker, taker) = schedule.fees_for(dec!(10000), dec!(1));
/// assert_eq!(maker.to_string(), "-1.00000000");
/// assert_eq!(taker.to_string(), "2.50000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Maker fee in basis points (negative = rebate).
    pub maker_fee_bps: Decimal,
    /// Taker fee in basis points.
    pub taker_fee_bps: Decimal,
}

impl FeeSchedule {
    /// Create a new fee schedule.
    #[must_use = "FeeSchedule does nothing unless used"]
    pub fn new(maker_fee_bps: Decimal, taker_fee_bps: Decimal) -> Self {
        Self {
            maker_fee_bps,
            taker_fee_bps,
        }
    }

    /// Compute `(maker_fee, taker_fee)` for a single fill.
    ///
    /// The notional is multiplied by the bps rate before dividing by 10_000
    /// to preserve precision; each fee is then quantized to 8 decimal
    /// places. A negative maker fee is a rebate.
    #[must_use = "fee calculation result must be used"]
    #[inline]
    pub fn fees_for(&self, price: Decimal, quantity: Decimal) -> (Decimal, Decimal) {
        let notional = price * quantity;
        let maker_fee = quantize_8(notional * self.maker_fee_bps / BPS_DIVISOR);
        let taker_fee = quantize_8(notional * self.taker_fee_bps / BPS_DIVISOR);
        (maker_fee, taker_fee)
    }

    /// True when the maker rate is a rebate.
    #[must_use]
    #[inline]
    pub fn has_maker_rebate(&self) -> bool {
        self.maker_fee_bps < Decimal::ZERO
    }

    /// True when both rates are zero.
    #[must_use]
    #[inline]
    pub fn is_zero_fee(&self) -> bool {
        self.maker_fee_bps.is_zero() && self.taker_fee_bps.is_zero()
    }

    /// A schedule that charges nothing on either side.
    #[must_use]
    pub fn zero_fee() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }

    /// A schedule with only taker fees (common on retail venues).
    #[must_use]
    pub fn taker_only(taker_fee_bps: Decimal) -> Self {
        Self::new(Decimal::ZERO, taker_fee_bps)
    }

    /// A schedule with a maker rebate. `maker_rebate_bps` is taken as a
    /// positive magnitude and negated.
    #[must_use]
    pub fn with_maker_rebate(maker_rebate_bps: Decimal, taker_fee_bps: Decimal) -> Self {
        Self::new(-maker_rebate_bps.abs(), taker_fee_bps)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::zero_fee()
    }
}
