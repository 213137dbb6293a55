use thiserror::Error;

use crate::types::InstallmentId;

#[derive(Error, Debug)]
pub enum ServicingError {
    #[error("installment not found: {id}")]
    InstallmentNotFound {
        id: InstallmentId,
    },

    #[error("loan not found for borrower: {phone}")]
    LoanNotFound {
        phone: String,
    },

    #[error("loan already exists for borrower: {phone}")]
    DuplicateLoan {
        phone: String,
    },

    #[error("invalid loan terms: {message}")]
    InvalidTerms {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("unsupported reporting period: {message}")]
    UnsupportedPeriod {
        message: String,
    },

    #[error("store error: {message}")]
    Store {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ServicingError>;
