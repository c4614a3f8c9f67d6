//! Cash flow table rows and summaries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

/// One period of a loan's (or a pool's) projected cash flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPeriod {
    pub period: u32,
    pub beg_bal: Money,
    /// Scheduled principal.
    pub principal: Money,
    #[serde(rename = "default")]
    pub defaults: Money,
    pub prepayment: Money,
    pub end_bal: Money,
    pub interest: Money,
    /// Defaulted balance recognised this period (after the recovery lag).
    pub liquidation: Money,
    pub loss: Money,
    pub recovery: Money,
    /// principal + recovery + prepayment
    pub total_princ: Money,
    /// interest + total_princ
    pub payment: Money,
}

/// Lagged loss and recovery that would be recognised after the last
/// emitted period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LaggedAmounts {
    pub liquidation: Money,
    pub loss: Money,
    pub recovery: Money,
}

/// Ordered cash flow rows, period 1 first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowTable {
    pub periods: Vec<CashFlowPeriod>,
    #[serde(default)]
    pub beyond_horizon: LaggedAmounts,
}

/// Totals and ratios over a whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSummary {
    pub num_periods: u32,
    pub total_scheduled_principal: Money,
    pub total_interest: Money,
    pub total_prepayments: Money,
    pub total_defaults: Money,
    pub total_losses: Money,
    pub total_recoveries: Money,
    pub total_principal_collected: Money,
    pub total_payments: Money,
    pub unrecognised_loss: Money,
    pub unrecognised_recovery: Money,
    /// Final ending balance over original balance.
    pub pool_factor_at_end: Rate,
    /// Recognised plus unrecognised loss over original balance.
    pub cumulative_loss_rate: Rate,
}

impl CashFlowPeriod {
    pub fn zero(period: u32) -> Self {
        CashFlowPeriod {
            period,
            beg_bal: Decimal::ZERO,
            principal: Decimal::ZERO,
            defaults: Decimal::ZERO,
            prepayment: Decimal::ZERO,
            end_bal: Decimal::ZERO,
            interest: Decimal::ZERO,
            liquidation: Decimal::ZERO,
            loss: Decimal::ZERO,
            recovery: Decimal::ZERO,
            total_princ: Decimal::ZERO,
            payment: Decimal::ZERO,
        }
    }

    /// Add every amount field of `other` into `self`. The period index is
    /// left untouched.
    pub fn accumulate(&mut self, other: &CashFlowPeriod) {
        self.beg_bal += other.beg_bal;
        self.principal += other.principal;
        self.defaults += other.defaults;
        self.prepayment += other.prepayment;
        self.end_bal += other.end_bal;
        self.interest += other.interest;
        self.liquidation += other.liquidation;
        self.loss += other.loss;
        self.recovery += other.recovery;
        self.total_princ += other.total_princ;
        self.payment += other.payment;
    }
}

impl LaggedAmounts {
    pub fn accumulate(&mut self, other: &LaggedAmounts) {
        self.liquidation += other.liquidation;
        self.loss += other.loss;
        self.recovery += other.recovery;
    }
}

impl CashFlowTable {
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Row for a 1-based period index.
    pub fn period(&self, period: u32) -> Option<&CashFlowPeriod> {
        if period == 0 {
            return None;
        }
        self.periods.get(period as usize - 1)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CashFlowPeriod> {
        self.periods.iter()
    }

    /// Ending balance after the last emitted period.
    pub fn final_balance(&self) -> Money {
        self.periods
            .last()
            .map(|p| p.end_bal)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn summary(&self, original_balance: Money) -> CashFlowSummary {
        let mut total = CashFlowPeriod::zero(0);
        for row in &self.periods {
            total.accumulate(row);
        }

        let (pool_factor_at_end, cumulative_loss_rate) = if original_balance > Decimal::ZERO {
            (
                self.final_balance() / original_balance,
                (total.loss + self.beyond_horizon.loss) / original_balance,
            )
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        CashFlowSummary {
            num_periods: self.periods.len() as u32,
            total_scheduled_principal: total.principal,
            total_interest: total.interest,
            total_prepayments: total.prepayment,
            total_defaults: total.defaults,
            total_losses: total.loss,
            total_recoveries: total.recovery,
            total_principal_collected: total.total_princ,
            total_payments: total.payment,
            unrecognised_loss: self.beyond_horizon.loss,
            unrecognised_recovery: self.beyond_horizon.recovery,
            pool_factor_at_end,
            cumulative_loss_rate,
        }
    }
}

impl<'a> IntoIterator for &'a CashFlowTable {
    type Item = &'a CashFlowPeriod;
    type IntoIter = std::slice::Iter<'a, CashFlowPeriod>;

    fn into_iter(self) -> Self::IntoIter {
        self.periods.iter()
    }
}
