use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::config::ServicingConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::installment::Installment;
use crate::store::InstallmentStore;
use crate::types::InstallmentStatus;

/// whole calendar months between the due month and today's month, inclusive
/// of the due month; the day-of-month is ignored
pub fn months_elapsed(due_date: NaiveDate, today: NaiveDate) -> i64 {
    let years = i64::from(today.year() - due_date.year());
    let months = i64::from(today.month() as i32 - due_date.month() as i32);
    years * 12 + months + 1
}

/// the status transition rule, evaluated independently per installment.
///
/// Paid is terminal. A future installment is Pending. A due installment
/// stays Pending until it has been unpaid for `overdue_after_months`
/// consecutive calendar months (counting the due month itself), then
/// becomes Overdue. Stateless per record, so re-evaluation is idempotent.
pub fn installment_status(
    due_date: NaiveDate,
    current: InstallmentStatus,
    today: NaiveDate,
    overdue_after_months: u32,
) -> InstallmentStatus {
    if current.is_paid() {
        return InstallmentStatus::Paid;
    }

    if due_date > today {
        return InstallmentStatus::Pending;
    }

    if months_elapsed(due_date, today) >= i64::from(overdue_after_months) {
        InstallmentStatus::Overdue
    } else {
        InstallmentStatus::Pending
    }
}

/// result of a borrower reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub installments: usize,
    pub updated: usize,
    /// running unpaid total over the whole schedule after the pass
    pub total_pending: Money,
}

/// recomputes status and cumulative pending for a borrower's installments as
/// of "today"
pub struct Reconciler<'a, S: InstallmentStore> {
    store: &'a S,
    config: &'a ServicingConfig,
}

impl<'a, S: InstallmentStore> Reconciler<'a, S> {
    pub fn new(store: &'a S, config: &'a ServicingConfig) -> Self {
        Self { store, config }
    }

    /// single forward pass over the borrower's schedule ordered by
    /// month_number: re-evaluate every status and rebuild the running
    /// cumulative-pending totals, persisting each changed row before
    /// returning.
    ///
    /// The pass is a pure function of due dates, statuses and `now`, so
    /// re-running it is safe and convergent after a crash mid-pass.
    pub fn reconcile_borrower(
        &self,
        phone: &str,
        now: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<ReconcileSummary> {
        let today = now.date_naive();
        let schedule = self.store.by_phone_ordered(phone)?;

        let mut running = Money::ZERO;
        let mut updated = 0;
        let installments = schedule.len();

        for mut inst in schedule {
            if !inst.status.is_paid() {
                running += inst.pending_amount;
            }

            let new_status = installment_status(
                inst.due_date,
                inst.status,
                today,
                self.config.overdue_after_months,
            );

            // a paid installment still records the running total of the
            // unpaid ones before it
            let changed = new_status != inst.status || inst.cumulative_pending != running;
            if !changed {
                continue;
            }

            if new_status != inst.status {
                log::info!(
                    "status change for {} month {}: {:?} -> {:?}",
                    inst.phone,
                    inst.month_number,
                    inst.status,
                    new_status
                );
                events.emit(Event::InstallmentStatusChanged {
                    installment_id: inst.id,
                    phone: inst.phone.clone(),
                    month_number: inst.month_number,
                    old_status: inst.status,
                    new_status,
                    timestamp: now,
                });
            }

            inst.status = new_status;
            inst.cumulative_pending = running;
            inst.updated_at = now;
            self.store.update_installment(inst)?;
            updated += 1;
        }

        Ok(ReconcileSummary {
            installments,
            updated,
            total_pending: running,
        })
    }

    /// status-only refresh used by the portfolio sweep; cumulative pending is
    /// untouched. Returns true when the status changed.
    pub fn refresh_status(&self, inst: &mut Installment, today: NaiveDate) -> bool {
        let new_status = installment_status(
            inst.due_date,
            inst.status,
            today,
            self.config.overdue_after_months,
        );
        if new_status == inst.status {
            return false;
        }
        inst.status = new_status;
        true
    }
}
