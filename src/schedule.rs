use std::collections::HashSet;

use chrono::{DateTime, Months, NaiveDate, Utc};

use crate::errors::{Result, ServicingError};
use crate::installment::Installment;
use crate::loan::Loan;
use crate::store::InstallmentStore;

/// result of a generation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub created: usize,
    pub existing: usize,
}

/// due date for a schedule position: start shifted by month_number - 1
/// calendar months, preserving day-of-month and clamping to month length
/// (Jan 31 + 1 month = Feb 28/29)
pub fn due_date_for(start_date: NaiveDate, month_number: u32) -> Result<NaiveDate> {
    start_date
        .checked_add_months(Months::new(month_number - 1))
        .ok_or_else(|| ServicingError::InvalidDate {
            message: format!("due date out of range: {} + {} months", start_date, month_number - 1),
        })
}

/// materialize the loan's schedule, one installment per month.
///
/// Idempotent per month_number: months that already exist are left untouched,
/// so re-running after a partial failure fills the gaps without duplicating.
/// Persistence is per-installment; there is no atomic rollback.
pub fn generate_schedule<S: InstallmentStore>(
    store: &S,
    loan: &Loan,
    now: DateTime<Utc>,
) -> Result<GenerationOutcome> {
    let existing: HashSet<u32> = store
        .by_phone_ordered(&loan.phone)?
        .iter()
        .map(|i| i.month_number)
        .collect();

    let mut created = 0;
    for month_number in 1..=loan.tenure_months {
        if existing.contains(&month_number) {
            continue;
        }

        let due_date = due_date_for(loan.start_date, month_number)?;
        store.insert_installment(Installment::new(
            &loan.phone,
            month_number,
            due_date,
            loan.monthly_installment,
            now,
        ))?;
        created += 1;
    }

    log::info!(
        "generated schedule for {}: {} created, {} existing",
        loan.phone,
        created,
        existing.len()
    );

    Ok(GenerationOutcome {
        created,
        existing: existing.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::loan::LoanBuilder;
    use crate::store::MemoryStore;
    use crate::types::InstallmentStatus;
    use chrono::TimeZone;
    use hourglass_rs::{SafeTimeProvider, TimeSource};

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn loan_starting(date: NaiveDate, tenure: u32) -> Loan {
        LoanBuilder::new()
            .phone("9876543210")
            .name("Asha Rao")
            .principal(Money::from_major(3_000))
            .annual_rate(Rate::ZERO)
            .tenure_months(tenure)
            .start_date(date)
            .build(&test_time())
            .unwrap()
    }

    #[test]
    fn test_generates_one_installment_per_month() {
        let store = MemoryStore::new();
        let loan = loan_starting(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 3);

        let outcome = generate_schedule(&store, &loan, test_time().now()).unwrap();
        assert_eq!(outcome.created, 3);

        let schedule = store.by_phone_ordered(&loan.phone).unwrap();
        let due_dates: Vec<NaiveDate> = schedule.iter().map(|i| i.due_date).collect();
        assert_eq!(
            due_dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ]
        );
        for inst in &schedule {
            assert_eq!(inst.status, InstallmentStatus::Pending);
            assert_eq!(inst.amount_due, Money::from_major(1_000));
            assert_eq!(inst.pending_amount, Money::from_major(1_000));
        }
    }

    #[test]
    fn test_due_dates_clamp_to_month_length() {
        let store = MemoryStore::new();
        let loan = loan_starting(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), 3);

        generate_schedule(&store, &loan, test_time().now()).unwrap();

        let schedule = store.by_phone_ordered(&loan.phone).unwrap();
        assert_eq!(schedule[0].due_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(schedule[1].due_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(schedule[2].due_date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
    }

    #[test]
    fn test_regeneration_is_idempotent() {
        let store = MemoryStore::new();
        let loan = loan_starting(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 3);

        generate_schedule(&store, &loan, test_time().now()).unwrap();
        let second = generate_schedule(&store, &loan, test_time().now()).unwrap();

        assert_eq!(second.created, 0);
        assert_eq!(second.existing, 3);
        assert_eq!(store.by_phone_ordered(&loan.phone).unwrap().len(), 3);
    }

    #[test]
    fn test_regeneration_fills_missing_months() {
        let store = MemoryStore::new();
        let loan = loan_starting(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 3);
        let now = test_time().now();

        // partial schedule: months 1 and 3 written, month 2 lost mid-loop
        for month_number in [1, 3] {
            let due = due_date_for(loan.start_date, month_number).unwrap();
            store
                .insert_installment(Installment::new(
                    &loan.phone,
                    month_number,
                    due,
                    loan.monthly_installment,
                    now,
                ))
                .unwrap();
        }

        let outcome = generate_schedule(&store, &loan, now).unwrap();
        assert_eq!(outcome.created, 1);

        let months: Vec<u32> = store
            .by_phone_ordered(&loan.phone)
            .unwrap()
            .iter()
            .map(|i| i.month_number)
            .collect();
        assert_eq!(months, vec![1, 2, 3]);
    }
}
