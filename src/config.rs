use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// servicing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicingConfig {
    /// calendar months (inclusive of the due month) before an unpaid
    /// installment becomes overdue
    pub overdue_after_months: u32,
    /// unpaid installments due on/before today before a borrower is waitlisted
    pub waitlist_threshold: usize,
    /// cap on the recent-payers view
    pub recent_payers_limit: usize,
    pub directions: DirectionThresholds,
}

/// cutoffs for the directional indicators on the analytics report;
/// reporting heuristics, not correctness constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionThresholds {
    /// paid share of customers counted as healthy at or above this
    pub paid_percentage: Decimal,
    /// pending share of customers counted as healthy strictly below this
    pub pending_percentage: Decimal,
    /// waitlisted share of customers counted as healthy strictly below this
    pub waitlist_percentage: Decimal,
    /// collection rate counted as healthy at or above this
    pub collection_percentage: Decimal,
}

impl Default for ServicingConfig {
    fn default() -> Self {
        Self {
            overdue_after_months: 3,
            waitlist_threshold: 3,
            recent_payers_limit: 20,
            directions: DirectionThresholds::default(),
        }
    }
}

impl Default for DirectionThresholds {
    fn default() -> Self {
        Self {
            paid_percentage: dec!(50),
            pending_percentage: dec!(50),
            waitlist_percentage: dec!(20),
            collection_percentage: dec!(80),
        }
    }
}
