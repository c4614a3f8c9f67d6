//! Rate conversions and annuity math in `rust_decimal::Decimal`.
//!
//! Annual CPR/CDR figures are converted to single monthly mortality (SMM)
//! with `SMM = 1 - (1 - annual)^(1/12)`. Fractional powers are computed by
//! Newton iteration so that no value ever passes through `f64`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Money, Rate};

/// Months per year; every period in this crate is one month.
pub const MONTHS_PER_YEAR: Decimal = dec!(12);

const NEWTON_MAX_ITERATIONS: u32 = 60;
const NEWTON_TOLERANCE: Decimal = dec!(0.0000000000001);

/// Convert an annualised rate (CPR or CDR) to its single monthly mortality.
pub fn annual_to_smm(annual: Rate) -> Rate {
    if annual <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if annual >= Decimal::ONE {
        return Decimal::ONE;
    }
    Decimal::ONE - nth_root(Decimal::ONE - annual, 12)
}

/// Level instalment that amortises `balance` over `periods` months at
/// `monthly_rate`: `B * r / (1 - (1 + r)^-n)`. A zero rate degenerates to
/// level principal `B / n`; when `(1 + r)^n` exceeds `Decimal` range the
/// discount term is zero and the instalment is the interest-only `B * r`.
///
/// `None` when no instalment exists or `B * r` itself overflows.
pub fn annuity_payment(balance: Money, monthly_rate: Rate, periods: u32) -> Option<Money> {
    if periods == 0 || monthly_rate < Decimal::ZERO {
        return None;
    }
    if monthly_rate.is_zero() {
        return Some(balance / Decimal::from(periods));
    }
    let denom = Decimal::ONE - iterative_pow_recip(Decimal::ONE + monthly_rate, periods);
    if denom <= Decimal::ZERO {
        return None;
    }
    balance.checked_mul(monthly_rate)?.checked_div(denom)
}

/// base^n by repeated multiplication; `None` once the product leaves
/// `Decimal` range.
fn checked_pow(base: Decimal, n: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = result.checked_mul(base)?;
    }
    Some(result)
}

/// base^n for |base| <= 1, where the product can only shrink.
fn iterative_pow(base: Decimal, n: u32) -> Decimal {
    checked_pow(base, n).unwrap_or(Decimal::ZERO)
}

/// 1 / base^n. Zero if base^n overflows or is zero.
fn iterative_pow_recip(base: Decimal, n: u32) -> Decimal {
    match checked_pow(base, n) {
        Some(pow) if !pow.is_zero() => Decimal::ONE / pow,
        _ => Decimal::ZERO,
    }
}

/// x^(1/n) by Newton's method: g_{k+1} = g_k - (g_k^n - x) / (n * g_k^{n-1}).
///
/// Inputs are of the form `1 - rate` with `rate` in [0, 1), so the
/// iteration starts at 1 and descends monotonically.
fn nth_root(x: Decimal, n: u32) -> Decimal {
    if x == Decimal::ONE || x.is_zero() || n == 1 {
        return x;
    }
    if n == 0 {
        return Decimal::ONE;
    }

    let n_dec = Decimal::from(n);
    let mut guess = Decimal::ONE;

    for _ in 0..NEWTON_MAX_ITERATIONS {
        let g_n_minus_1 = iterative_pow(guess, n - 1);
        if g_n_minus_1.is_zero() {
            break;
        }
        let g_n = g_n_minus_1 * guess;
        let delta = (g_n - x) / (n_dec * g_n_minus_1);
        guess -= delta;

        if delta.abs() < NEWTON_TOLERANCE {
            break;
        }
    }

    guess
}
