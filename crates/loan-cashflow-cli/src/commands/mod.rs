pub mod loan;
pub mod portfolio;
pub mod scenario;
