use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanCashflowError {
    #[error("Invalid loan parameter: {field} — {reason}")]
    InvalidLoanParameter { field: String, reason: String },

    #[error("Missing amortisation vector '{vector_id}' for loan {loan_id}: {reason}")]
    MissingAmortizationVector {
        loan_id: String,
        vector_id: String,
        reason: String,
    },

    #[error("Degenerate schedule for loan {loan_id} at period {period}: {reason}")]
    DegenerateSchedule {
        loan_id: String,
        period: u32,
        reason: String,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LoanCashflowError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        LoanCashflowError::InvalidLoanParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LoanCashflowError {
    fn from(e: serde_json::Error) -> Self {
        LoanCashflowError::SerializationError(e.to_string())
    }
}
