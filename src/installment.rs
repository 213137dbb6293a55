use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{InstallmentId, InstallmentStatus};

/// one scheduled monthly payment obligation for a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    /// borrower phone, the foreign key back to the loan
    pub phone: String,
    /// position in the schedule, 1..=tenure; unique per loan
    pub month_number: u32,
    pub due_date: NaiveDate,
    /// frozen copy of the loan's installment amount at generation time
    pub amount_due: Money,

    pub status: InstallmentStatus,
    pub paid_date: Option<NaiveDate>,
    pub paid_amount: Money,
    /// amount still owed for this installment alone
    pub pending_amount: Money,
    /// running unpaid total as of this installment's position in the schedule
    pub cumulative_pending: Money,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installment {
    /// fresh pending installment as emitted by the schedule generator
    pub fn new(
        phone: impl Into<String>,
        month_number: u32,
        due_date: NaiveDate,
        amount_due: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone: phone.into(),
            month_number,
            due_date,
            amount_due,
            status: InstallmentStatus::Pending,
            paid_date: None,
            paid_amount: Money::ZERO,
            pending_amount: amount_due,
            cumulative_pending: Money::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// display label for the due month, e.g. "Jan 2024"
    pub fn month_label(&self) -> String {
        self.due_date.format("%b %Y").to_string()
    }

    /// unpaid and already due as of the given day
    pub fn is_due_unpaid(&self, today: NaiveDate) -> bool {
        !self.status.is_paid() && self.due_date <= today
    }
}
