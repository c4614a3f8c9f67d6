//! Cash flow projection for amortising loans and loan pools.
//!
//! A loan's scheduled balance profile ([`amortisation`]) feeds a monthly
//! default / prepayment / recovery waterfall ([`cashflow`]); pools are
//! summed period by period ([`portfolio`]) and reduced to a weighted
//! average life ([`wal`]). All amounts are `rust_decimal::Decimal`.

pub mod amortisation;
pub mod cashflow;
pub mod error;
pub mod loan;
pub mod portfolio;
pub mod rates;
pub mod scenario;
pub mod types;
pub mod wal;

pub use error::LoanCashflowError;
pub use loan::{Amortisation, AmortisationType, AmortisationVectors, Loan, LoanRecord};
pub use scenario::Scenario;
pub use types::*;

/// Standard result type for all loan cash flow operations
pub type LoanCashflowResult<T> = Result<T, LoanCashflowError>;
