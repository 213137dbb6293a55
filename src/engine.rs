use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::analytics::{
    Aggregator, AnalyticsReport, BorrowerReport, Classification, Classifier, DashboardStats,
};
use crate::config::ServicingConfig;
use crate::errors::{Result, ServicingError};
use crate::events::{Event, EventStore};
use crate::installment::Installment;
use crate::loan::{Loan, LoanUpdate};
use crate::payment::{apply_payment, PaymentUpdate};
use crate::reconcile::{ReconcileSummary, Reconciler};
use crate::schedule::{generate_schedule, GenerationOutcome};
use crate::store::{InstallmentStore, LoanStore};
use crate::types::{LoanStatus, ReportingPeriod};

/// result of a portfolio status sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepSummary {
    pub scanned: usize,
    pub updated: usize,
    /// borrowers skipped because an on-demand reconciliation held their lock
    pub skipped_borrowers: usize,
}

/// the servicing facade: loan registration, schedule generation, payment
/// recording, classification and analytics over a pluggable store.
///
/// Reconciliation is serialized per borrower through a lock registry;
/// different borrowers reconcile in parallel. All methods take `&self`, so
/// the engine can be shared behind an `Arc` with a background sweeper.
pub struct ServicingEngine<S: LoanStore + InstallmentStore> {
    store: S,
    config: ServicingConfig,
    events: Mutex<EventStore>,
    borrower_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: LoanStore + InstallmentStore> ServicingEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ServicingConfig::default())
    }

    pub fn with_config(store: S, config: ServicingConfig) -> Self {
        Self {
            store,
            config,
            events: Mutex::new(EventStore::new()),
            borrower_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ServicingConfig {
        &self.config
    }

    /// drain events collected since the last call
    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().unwrap().take_events()
    }

    fn emit(&self, event: Event) {
        self.events.lock().unwrap().emit(event);
    }

    fn borrower_lock(&self, phone: &str) -> Arc<Mutex<()>> {
        let mut locks = self.borrower_locks.lock().unwrap();
        locks
            .entry(phone.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// full reconciliation pass for one borrower, serialized against other
    /// passes for the same borrower
    fn reconcile_borrower(&self, phone: &str, now: DateTime<Utc>) -> Result<ReconcileSummary> {
        let lock = self.borrower_lock(phone);
        let _guard = lock.lock().unwrap();

        let mut local = EventStore::new();
        let summary =
            Reconciler::new(&self.store, &self.config).reconcile_borrower(phone, now, &mut local)?;
        self.events.lock().unwrap().extend(local.take_events());
        Ok(summary)
    }

    /// reconcile without failing the surrounding write; errors are logged and
    /// left for the next sweep to self-heal
    fn reconcile_best_effort(&self, phone: &str, now: DateTime<Utc>) {
        if let Err(err) = self.reconcile_borrower(phone, now) {
            log::error!("reconciliation failed for {}: {}", phone, err);
        }
    }

    // ---- loan lifecycle ----

    /// persist a new loan; fails on a duplicate borrower phone.
    ///
    /// Schedule generation is intentionally decoupled: run
    /// [`generate_schedule`](Self::generate_schedule) afterwards (typically on
    /// a background task). Callers must not assume installments exist as soon
    /// as registration returns.
    pub fn register_loan(&self, loan: Loan, time_provider: &SafeTimeProvider) -> Result<Loan> {
        if self.store.find_loan(&loan.phone)?.is_some() {
            return Err(ServicingError::DuplicateLoan {
                phone: loan.phone.clone(),
            });
        }

        self.store.insert_loan(loan.clone())?;
        log::info!("registered loan for {}", loan.phone);
        self.emit(Event::LoanRegistered {
            loan_id: loan.id,
            phone: loan.phone.clone(),
            principal: loan.principal,
            tenure_months: loan.tenure_months,
            timestamp: time_provider.now(),
        });
        Ok(loan)
    }

    /// materialize the borrower's schedule (idempotent per month) and run an
    /// initial reconciliation
    pub fn generate_schedule(
        &self,
        phone: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<GenerationOutcome> {
        let loan = self
            .store
            .find_loan(phone)?
            .ok_or_else(|| ServicingError::LoanNotFound {
                phone: phone.to_string(),
            })?;

        let now = time_provider.now();
        let outcome = {
            let lock = self.borrower_lock(phone);
            let _guard = lock.lock().unwrap();
            generate_schedule(&self.store, &loan, now)?
        };

        self.emit(Event::ScheduleGenerated {
            phone: phone.to_string(),
            installments_created: outcome.created,
            timestamp: now,
        });

        self.reconcile_best_effort(phone, now);
        Ok(outcome)
    }

    /// replace profile and terms; already-generated installments keep their
    /// frozen amounts
    pub fn update_loan(
        &self,
        phone: &str,
        update: LoanUpdate,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        let mut loan = self
            .store
            .find_loan(phone)?
            .ok_or_else(|| ServicingError::LoanNotFound {
                phone: phone.to_string(),
            })?;

        loan.apply_update(update, time_provider.now())?;
        self.store.update_loan(loan.clone())?;
        log::info!("updated loan terms for {}", phone);
        Ok(loan)
    }

    /// set the externally-managed lifecycle status
    pub fn update_loan_status(
        &self,
        phone: &str,
        status: LoanStatus,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        let mut loan = self
            .store
            .find_loan(phone)?
            .ok_or_else(|| ServicingError::LoanNotFound {
                phone: phone.to_string(),
            })?;

        loan.status = status;
        loan.updated_at = time_provider.now();
        self.store.update_loan(loan.clone())?;
        Ok(loan)
    }

    /// remove the loan and cascade-delete its installments
    pub fn delete_loan(&self, phone: &str, time_provider: &SafeTimeProvider) -> Result<usize> {
        if self.store.find_loan(phone)?.is_none() {
            return Err(ServicingError::LoanNotFound {
                phone: phone.to_string(),
            });
        }

        let lock = self.borrower_lock(phone);
        let _guard = lock.lock().unwrap();

        let removed = self.store.delete_by_phone(phone)?;
        self.store.delete_loan(phone)?;
        log::info!("deleted loan for {} ({} installments)", phone, removed);
        self.emit(Event::LoanDeleted {
            phone: phone.to_string(),
            installments_removed: removed,
            timestamp: time_provider.now(),
        });
        Ok(removed)
    }

    pub fn loan(&self, phone: &str) -> Result<Option<Loan>> {
        self.store.find_loan(phone)
    }

    pub fn loans(&self) -> Result<Vec<Loan>> {
        self.store.all_loans()
    }

    // ---- payments ----

    /// apply a payment mutation to one installment, then reconcile the
    /// borrower's full schedule.
    ///
    /// A reconciliation failure never fails the payment: the mutation is
    /// durable and the next sweep converges the rest.
    pub fn record_payment(
        &self,
        update: PaymentUpdate,
        time_provider: &SafeTimeProvider,
    ) -> Result<Installment> {
        let now = time_provider.now();
        let was_paid = update.status.is_paid();
        let inst = apply_payment(&self.store, update, now)?;

        if was_paid {
            self.emit(Event::PaymentRecorded {
                installment_id: inst.id,
                phone: inst.phone.clone(),
                amount: inst.paid_amount,
                paid_date: inst.paid_date.unwrap_or_else(|| now.date_naive()),
                timestamp: now,
            });
        } else {
            self.emit(Event::PaymentReverted {
                installment_id: inst.id,
                phone: inst.phone.clone(),
                restored_pending: inst.pending_amount,
                timestamp: now,
            });
        }

        self.reconcile_best_effort(&inst.phone, now);
        Ok(inst)
    }

    // ---- queries ----

    /// the borrower's full schedule with cumulative pending brought current
    /// as of "today"
    pub fn schedule_for(
        &self,
        phone: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<Installment>> {
        self.reconcile_best_effort(phone, time_provider.now());
        self.store.by_phone_ordered(phone)
    }

    pub fn classify(
        &self,
        period: ReportingPeriod,
        year: i32,
        time_provider: &SafeTimeProvider,
    ) -> Result<Classification> {
        let today = time_provider.now().date_naive();
        Classifier::new(&self.store, &self.config).classify(period, year, today)
    }

    pub fn report(
        &self,
        period: ReportingPeriod,
        year: i32,
        time_provider: &SafeTimeProvider,
    ) -> Result<AnalyticsReport> {
        let today = time_provider.now().date_naive();
        Aggregator::new(&self.store, &self.config).aggregate(period, year, today)
    }

    pub fn recent_payers(&self) -> Result<Vec<BorrowerReport>> {
        Classifier::new(&self.store, &self.config).recent_payers()
    }

    pub fn dashboard(&self, window: Option<(NaiveDate, NaiveDate)>) -> Result<DashboardStats> {
        Aggregator::new(&self.store, &self.config).dashboard(window)
    }

    // ---- recurring maintenance ----

    /// portfolio-wide status refresh over every installment not in Paid.
    ///
    /// Status only; cumulative pending is rebuilt by per-borrower passes.
    /// Borrowers being reconciled on demand are skipped rather than blocked
    /// on; the next sweep picks them up.
    pub fn sweep_overdue(&self, time_provider: &SafeTimeProvider) -> Result<SweepSummary> {
        let now = time_provider.now();
        let today = now.date_naive();

        let mut by_phone: BTreeMap<String, Vec<Installment>> = BTreeMap::new();
        for inst in self.store.not_paid()? {
            by_phone.entry(inst.phone.clone()).or_default().push(inst);
        }

        let reconciler = Reconciler::new(&self.store, &self.config);
        let mut summary = SweepSummary::default();

        for (phone, installments) in by_phone {
            let lock = self.borrower_lock(&phone);
            let _guard = match lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    summary.skipped_borrowers += 1;
                    continue;
                }
            };

            for mut inst in installments {
                summary.scanned += 1;
                let old_status = inst.status;
                if !reconciler.refresh_status(&mut inst, today) {
                    continue;
                }
                inst.updated_at = now;
                self.store.update_installment(inst.clone())?;
                summary.updated += 1;
                self.emit(Event::InstallmentStatusChanged {
                    installment_id: inst.id,
                    phone: inst.phone.clone(),
                    month_number: inst.month_number,
                    old_status,
                    new_status: inst.status,
                    timestamp: now,
                });
            }
        }

        log::info!(
            "overdue sweep: {} scanned, {} updated, {} borrowers skipped",
            summary.scanned,
            summary.updated,
            summary.skipped_borrowers
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::loan::LoanBuilder;
    use crate::store::MemoryStore;
    use crate::types::InstallmentStatus;
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;

    const PHONE: &str = "9876543210";

    fn time_at(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
        ))
    }

    fn engine() -> ServicingEngine<MemoryStore> {
        ServicingEngine::new(MemoryStore::new())
    }

    fn register_with_schedule(
        engine: &ServicingEngine<MemoryStore>,
        time: &SafeTimeProvider,
        phone: &str,
        tenure: u32,
    ) {
        let loan = LoanBuilder::new()
            .phone(phone)
            .name("Asha Rao")
            .principal(Money::from_major(i64::from(tenure) * 1_000))
            .annual_rate(Rate::ZERO)
            .tenure_months(tenure)
            .start_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .build(time)
            .unwrap();
        engine.register_loan(loan, time).unwrap();
        engine.generate_schedule(phone, time).unwrap();
    }

    #[test]
    fn test_register_generate_and_fetch_schedule() {
        let engine = engine();
        let time = time_at(2023, 12, 15);
        register_with_schedule(&engine, &time, PHONE, 3);

        let schedule = engine.schedule_for(PHONE, &time).unwrap();
        assert_eq!(schedule.len(), 3);
        let cumulative: Vec<String> = schedule
            .iter()
            .map(|i| i.cumulative_pending.to_string())
            .collect();
        assert_eq!(cumulative, vec!["1000", "2000", "3000"]);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let engine = engine();
        let time = time_at(2024, 1, 1);
        register_with_schedule(&engine, &time, PHONE, 3);

        let duplicate = LoanBuilder::new()
            .phone(PHONE)
            .name("Someone Else")
            .principal(Money::from_major(5_000))
            .tenure_months(5)
            .start_date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
            .build(&time)
            .unwrap();
        let result = engine.register_loan(duplicate, &time);
        assert!(matches!(result, Err(ServicingError::DuplicateLoan { .. })));
    }

    #[test]
    fn test_payment_reconciles_whole_borrower() {
        let engine = engine();
        let time = time_at(2024, 1, 10);
        register_with_schedule(&engine, &time, PHONE, 3);

        let first = engine.schedule_for(PHONE, &time).unwrap().remove(0);
        engine
            .record_payment(
                PaymentUpdate::paid(first.id, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()),
                &time,
            )
            .unwrap();

        let schedule = engine.store().by_phone_ordered(PHONE).unwrap();
        assert_eq!(schedule[0].status, InstallmentStatus::Paid);
        assert_eq!(schedule[0].cumulative_pending, Money::ZERO);
        assert_eq!(schedule[1].cumulative_pending, Money::from_major(1_000));
        assert_eq!(schedule[2].cumulative_pending, Money::from_major(2_000));
    }

    #[test]
    fn test_sweep_marks_overdue_and_converges() {
        let engine = engine();
        let registered_at = time_at(2024, 1, 1);
        register_with_schedule(&engine, &registered_at, PHONE, 6);

        let later = time_at(2024, 4, 5);
        let first = engine.sweep_overdue(&later).unwrap();
        assert_eq!(first.scanned, 6);
        assert_eq!(first.updated, 2); // jan and feb cross the threshold
        assert_eq!(first.skipped_borrowers, 0);

        let second = engine.sweep_overdue(&later).unwrap();
        assert_eq!(second.updated, 0);
    }

    #[test]
    fn test_sweep_skips_borrower_held_by_on_demand_pass() {
        let engine = engine();
        let time = time_at(2024, 4, 5);
        register_with_schedule(&engine, &time, PHONE, 6);

        let lock = engine.borrower_lock(PHONE);
        let _held = lock.lock().unwrap();

        let summary = engine.sweep_overdue(&time).unwrap();
        assert_eq!(summary.scanned, 0);
        assert_eq!(summary.skipped_borrowers, 1);
    }

    #[test]
    fn test_delete_loan_cascades() {
        let engine = engine();
        let time = time_at(2024, 1, 1);
        register_with_schedule(&engine, &time, PHONE, 3);

        let removed = engine.delete_loan(PHONE, &time).unwrap();
        assert_eq!(removed, 3);
        assert!(engine.loan(PHONE).unwrap().is_none());
        assert!(engine.store().by_phone_ordered(PHONE).unwrap().is_empty());

        let again = engine.delete_loan(PHONE, &time);
        assert!(matches!(again, Err(ServicingError::LoanNotFound { .. })));
    }

    #[test]
    fn test_update_loan_status() {
        let engine = engine();
        let time = time_at(2024, 1, 1);
        register_with_schedule(&engine, &time, PHONE, 3);

        let loan = engine
            .update_loan_status(PHONE, LoanStatus::Completed, &time)
            .unwrap();
        assert_eq!(loan.status, LoanStatus::Completed);
        assert_eq!(
            engine.loan(PHONE).unwrap().unwrap().status,
            LoanStatus::Completed
        );
    }

    #[test]
    fn test_events_are_collected_and_drained() {
        let engine = engine();
        let time = time_at(2024, 1, 1);
        register_with_schedule(&engine, &time, PHONE, 3);

        let events = engine.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::LoanRegistered { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::ScheduleGenerated { .. })));
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn test_invalid_period_rejected_at_boundary() {
        let engine = engine();
        let time = time_at(2024, 1, 1);
        let result = engine.report(ReportingPeriod::Month(13), 2024, &time);
        assert!(matches!(
            result,
            Err(ServicingError::UnsupportedPeriod { .. })
        ));
    }
}
