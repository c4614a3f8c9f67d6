pub mod aggregate;
pub mod run;
pub mod sweep;

pub use aggregate::aggregate;
pub use run::{run_portfolio, LoanSummaryRow, PortfolioInput, PortfolioOutput};
pub use sweep::{sweep_scenarios, SweepInput, SweepOutput, SweepParameter, SweepPoint, SweepValues};
