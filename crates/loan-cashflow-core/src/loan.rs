//! Static loan definitions and the externally supplied amortisation vectors.

use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::LoanCashflowError;
use crate::types::{Money, Rate};
use crate::LoanCashflowResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Amortisation tag as it appears on a loan tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmortisationType {
    #[serde(rename = "fix_instalment")]
    FixInstalment,
    #[serde(rename = "vector")]
    Vector,
    #[serde(rename = "bullet")]
    Bullet,
}

/// How a loan's scheduled principal is produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Amortisation {
    /// Level instalment (annuity); principal is the instalment less interest.
    FixInstalment,
    /// Scheduled principal read from an external vector table.
    Vector { vector_id: String },
    /// Interest only, full balance repaid at maturity.
    Bullet,
}

impl Amortisation {
    pub fn kind(&self) -> AmortisationType {
        match self {
            Amortisation::FixInstalment => AmortisationType::FixInstalment,
            Amortisation::Vector { .. } => AmortisationType::Vector,
            Amortisation::Bullet => AmortisationType::Bullet,
        }
    }
}

/// One row of a loan tape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    #[serde(deserialize_with = "deserialize_loan_id")]
    pub loan_id: String,
    /// Original principal balance.
    pub orig_balance: Money,
    /// Annual coupon as a fraction (0.05 = 5%).
    pub coupon: Rate,
    /// Term in months.
    pub term: u32,
    pub amortisation_type: AmortisationType,
    /// Key into the amortisation vector table; only read for vector loans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_id: Option<String>,
}

/// Validated, immutable loan definition.
///
/// Serialises in the flat [`LoanRecord`] shape; deserialising validates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LoanRecord", into = "LoanRecord")]
pub struct Loan {
    pub loan_id: String,
    pub orig_balance: Money,
    pub coupon: Rate,
    pub term: u32,
    pub amortisation: Amortisation,
}

/// Amortisation vectors keyed by `vector_id`: per-period scheduled
/// principal amounts, period 1 first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmortisationVectors(BTreeMap<String, Vec<Money>>);

// ---------------------------------------------------------------------------
// Loan
// ---------------------------------------------------------------------------

impl Loan {
    pub fn fix_instalment(
        loan_id: impl Into<String>,
        orig_balance: Money,
        coupon: Rate,
        term: u32,
    ) -> LoanCashflowResult<Self> {
        Self::new(loan_id, orig_balance, coupon, term, Amortisation::FixInstalment)
    }

    pub fn bullet(
        loan_id: impl Into<String>,
        orig_balance: Money,
        coupon: Rate,
        term: u32,
    ) -> LoanCashflowResult<Self> {
        Self::new(loan_id, orig_balance, coupon, term, Amortisation::Bullet)
    }

    pub fn vector(
        loan_id: impl Into<String>,
        orig_balance: Money,
        coupon: Rate,
        term: u32,
        vector_id: impl Into<String>,
    ) -> LoanCashflowResult<Self> {
        Self::new(
            loan_id,
            orig_balance,
            coupon,
            term,
            Amortisation::Vector {
                vector_id: vector_id.into(),
            },
        )
    }

    pub fn new(
        loan_id: impl Into<String>,
        orig_balance: Money,
        coupon: Rate,
        term: u32,
        amortisation: Amortisation,
    ) -> LoanCashflowResult<Self> {
        let loan = Loan {
            loan_id: loan_id.into(),
            orig_balance,
            coupon,
            term,
            amortisation,
        };
        loan.validate()?;
        Ok(loan)
    }

    /// Check the static terms. Called by every constructor and again by the
    /// engine, since fields are public.
    pub fn validate(&self) -> LoanCashflowResult<()> {
        if self.orig_balance <= Decimal::ZERO {
            return Err(LoanCashflowError::invalid(
                "orig_balance",
                format!("Loan {}: original balance must be positive", self.loan_id),
            ));
        }
        if self.coupon < Decimal::ZERO {
            return Err(LoanCashflowError::invalid(
                "coupon",
                format!("Loan {}: coupon cannot be negative", self.loan_id),
            ));
        }
        if self.term == 0 {
            return Err(LoanCashflowError::invalid(
                "term",
                format!("Loan {}: term must be at least one month", self.loan_id),
            ));
        }
        if let Amortisation::Vector { vector_id } = &self.amortisation {
            if vector_id.trim().is_empty() {
                return Err(LoanCashflowError::invalid(
                    "vector_id",
                    format!("Loan {}: vector loans require a vector_id", self.loan_id),
                ));
            }
        }
        Ok(())
    }

    /// Coupon accrued per monthly period.
    pub fn monthly_rate(&self) -> Rate {
        self.coupon / crate::rates::MONTHS_PER_YEAR
    }
}

impl TryFrom<LoanRecord> for Loan {
    type Error = LoanCashflowError;

    fn try_from(record: LoanRecord) -> Result<Self, Self::Error> {
        let amortisation = match record.amortisation_type {
            AmortisationType::FixInstalment => Amortisation::FixInstalment,
            AmortisationType::Bullet => Amortisation::Bullet,
            AmortisationType::Vector => Amortisation::Vector {
                vector_id: record.vector_id.unwrap_or_default(),
            },
        };
        Loan::new(
            record.loan_id,
            record.orig_balance,
            record.coupon,
            record.term,
            amortisation,
        )
    }
}

impl From<Loan> for LoanRecord {
    fn from(loan: Loan) -> Self {
        let amortisation_type = loan.amortisation.kind();
        let vector_id = match loan.amortisation {
            Amortisation::Vector { vector_id } => Some(vector_id),
            _ => None,
        };
        LoanRecord {
            loan_id: loan.loan_id,
            orig_balance: loan.orig_balance,
            coupon: loan.coupon,
            term: loan.term,
            amortisation_type,
            vector_id,
        }
    }
}

/// Loan tapes carry numeric ids; JSON inputs may use either form.
fn deserialize_loan_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct LoanIdVisitor;

    impl<'de> Visitor<'de> for LoanIdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a loan id as a string or an integer")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(LoanIdVisitor)
}

// ---------------------------------------------------------------------------
// Amortisation vectors
// ---------------------------------------------------------------------------

impl AmortisationVectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, vector_id: impl Into<String>, principal: Vec<Money>) {
        self.0.insert(vector_id.into(), principal);
    }

    pub fn get(&self, vector_id: &str) -> Option<&[Money]> {
        self.0.get(vector_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<Money>)> for AmortisationVectors {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Money>)>>(iter: I) -> Self {
        AmortisationVectors(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
