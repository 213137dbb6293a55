use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a scheduled installment
pub type InstallmentId = Uuid;

/// loan lifecycle status, set externally (never derived by the reconciler)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// loan active and being serviced
    Active,
    /// servicing suspended
    Inactive,
    /// fully repaid
    Completed,
    /// written off as non-performing
    Defaulted,
}

/// payment status of a single installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    /// not yet due, or due but under the overdue threshold
    Pending,
    /// due and unpaid for the threshold number of calendar months
    Overdue,
    /// settled; terminal until a payment is reverted
    Paid,
}

impl InstallmentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, InstallmentStatus::Paid)
    }
}

/// reporting period for classification and analytics queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportingPeriod {
    /// a specific calendar month (1..=12) in the query year
    Month(u32),
    /// rolling window: due dates within the last 3 months
    LastThreeMonths,
    /// rolling window: due dates within the last 6 months
    LastSixMonths,
    /// the entire portfolio history
    AllTime,
}

impl ReportingPeriod {
    /// calendar month number for specific-month periods
    pub fn month_number(&self) -> Option<u32> {
        match self {
            ReportingPeriod::Month(m) => Some(*m),
            _ => None,
        }
    }

    /// rolling window length in months, if any
    pub fn window_months(&self) -> Option<u32> {
        match self {
            ReportingPeriod::LastThreeMonths => Some(3),
            ReportingPeriod::LastSixMonths => Some(6),
            _ => None,
        }
    }

    /// check the period is well-formed (month in 1..=12)
    pub fn validate(&self) -> crate::errors::Result<()> {
        match self {
            ReportingPeriod::Month(m) if !(1..=12).contains(m) => {
                Err(crate::errors::ServicingError::UnsupportedPeriod {
                    message: format!("calendar month out of range: {}", m),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_validation() {
        assert!(ReportingPeriod::Month(1).validate().is_ok());
        assert!(ReportingPeriod::Month(12).validate().is_ok());
        assert!(ReportingPeriod::Month(0).validate().is_err());
        assert!(ReportingPeriod::Month(13).validate().is_err());
        assert!(ReportingPeriod::AllTime.validate().is_ok());
    }

    #[test]
    fn test_period_windows() {
        assert_eq!(ReportingPeriod::Month(4).month_number(), Some(4));
        assert_eq!(ReportingPeriod::LastThreeMonths.window_months(), Some(3));
        assert_eq!(ReportingPeriod::LastSixMonths.window_months(), Some(6));
        assert_eq!(ReportingPeriod::AllTime.window_months(), None);
    }
}
