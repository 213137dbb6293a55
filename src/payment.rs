use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{Result, ServicingError};
use crate::installment::Installment;
use crate::store::InstallmentStore;
use crate::types::{InstallmentId, InstallmentStatus};

/// a payment mutation against a single installment.
///
/// This is the only write path that can move an installment into Paid; any
/// other status reverts the payment details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub installment_id: InstallmentId,
    pub status: InstallmentStatus,
    /// required when status is Paid
    pub paid_date: Option<NaiveDate>,
    /// defaults to the installment's amount_due when omitted
    pub paid_amount: Option<Money>,
}

impl PaymentUpdate {
    /// mark an installment paid
    pub fn paid(installment_id: InstallmentId, paid_date: NaiveDate) -> Self {
        Self {
            installment_id,
            status: InstallmentStatus::Paid,
            paid_date: Some(paid_date),
            paid_amount: None,
        }
    }

    /// revert an installment to an unpaid status
    pub fn reverted(installment_id: InstallmentId, status: InstallmentStatus) -> Self {
        Self {
            installment_id,
            status,
            paid_date: None,
            paid_amount: None,
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.paid_amount = Some(amount);
        self
    }
}

/// apply the mutation to the stored installment and return the updated row.
///
/// The caller is expected to reconcile the borrower afterwards; this function
/// touches exactly one record.
pub fn apply_payment<S: InstallmentStore>(
    store: &S,
    update: PaymentUpdate,
    now: DateTime<Utc>,
) -> Result<Installment> {
    let mut inst = store
        .installment(update.installment_id)?
        .ok_or(ServicingError::InstallmentNotFound {
            id: update.installment_id,
        })?;

    if update.status.is_paid() {
        let paid_date = update.paid_date.ok_or_else(|| ServicingError::InvalidDate {
            message: "paid date is required when marking an installment paid".to_string(),
        })?;
        inst.paid_date = Some(paid_date);
        inst.paid_amount = update.paid_amount.unwrap_or(inst.amount_due);
        inst.pending_amount = Money::ZERO;
    } else {
        inst.paid_date = None;
        inst.paid_amount = Money::ZERO;
        inst.pending_amount = inst.amount_due;
    }

    inst.status = update.status;
    inst.updated_at = now;
    store.update_installment(inst.clone())?;

    Ok(inst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn seeded() -> (MemoryStore, Installment, DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let store = MemoryStore::new();
        let inst = Installment::new(
            "9876543210",
            1,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Money::from_major(1_000),
            now,
        );
        store.insert_installment(inst.clone()).unwrap();
        (store, inst, now)
    }

    #[test]
    fn test_unknown_installment_fails() {
        let (store, _, now) = seeded();
        let update =
            PaymentUpdate::paid(Uuid::new_v4(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        let result = apply_payment(&store, update, now);
        assert!(matches!(result, Err(ServicingError::InstallmentNotFound { .. })));
    }

    #[test]
    fn test_paid_defaults_to_amount_due() {
        let (store, inst, now) = seeded();
        let paid_on = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();

        let updated = apply_payment(&store, PaymentUpdate::paid(inst.id, paid_on), now).unwrap();

        assert_eq!(updated.status, InstallmentStatus::Paid);
        assert_eq!(updated.paid_date, Some(paid_on));
        assert_eq!(updated.paid_amount, Money::from_major(1_000));
        assert_eq!(updated.pending_amount, Money::ZERO);
    }

    #[test]
    fn test_paid_with_explicit_amount() {
        let (store, inst, now) = seeded();
        let paid_on = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();

        let updated = apply_payment(
            &store,
            PaymentUpdate::paid(inst.id, paid_on).with_amount(Money::from_major(995)),
            now,
        )
        .unwrap();

        assert_eq!(updated.paid_amount, Money::from_major(995));
        assert_eq!(updated.pending_amount, Money::ZERO);
    }

    #[test]
    fn test_paid_requires_date() {
        let (store, inst, now) = seeded();
        let update = PaymentUpdate {
            installment_id: inst.id,
            status: InstallmentStatus::Paid,
            paid_date: None,
            paid_amount: None,
        };
        let result = apply_payment(&store, update, now);
        assert!(matches!(result, Err(ServicingError::InvalidDate { .. })));
    }

    #[test]
    fn test_revert_restores_pending_amount() {
        let (store, inst, now) = seeded();
        let paid_on = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        apply_payment(&store, PaymentUpdate::paid(inst.id, paid_on), now).unwrap();

        let reverted = apply_payment(
            &store,
            PaymentUpdate::reverted(inst.id, InstallmentStatus::Pending),
            now,
        )
        .unwrap();

        assert_eq!(reverted.status, InstallmentStatus::Pending);
        assert!(reverted.paid_date.is_none());
        assert_eq!(reverted.paid_amount, Money::ZERO);
        assert_eq!(reverted.pending_amount, Money::from_major(1_000));
    }
}
