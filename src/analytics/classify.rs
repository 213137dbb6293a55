use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::ServicingConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::installment::Installment;
use crate::loan::Loan;
use crate::store::{InstallmentStore, LoanStore};
use crate::types::ReportingPeriod;

/// one borrower's slice of a classification: the loan record, the
/// installments in scope for the view, and the outstanding balance across the
/// entire schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowerReport {
    pub loan: Option<Loan>,
    pub installments: Vec<Installment>,
    /// sum of pending_amount over every unpaid installment, full tenure
    pub balance: Money,
}

/// per-period borrower groupings; Pending and Waitlisted are disjoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub all: Vec<BorrowerReport>,
    pub paid: Vec<BorrowerReport>,
    pub pending: Vec<BorrowerReport>,
    pub waitlisted: Vec<BorrowerReport>,
}

/// installments whose due date falls inside the reporting period.
///
/// Rolling windows anchor on today and keep everything due on or after the
/// window start, future months included.
pub fn period_installments<S: InstallmentStore>(
    store: &S,
    period: ReportingPeriod,
    year: i32,
    today: NaiveDate,
) -> Result<Vec<Installment>> {
    period.validate()?;

    match period {
        ReportingPeriod::Month(month) => store.by_due_month(month, year),
        ReportingPeriod::LastThreeMonths | ReportingPeriod::LastSixMonths => {
            let months = period.window_months().unwrap_or(0);
            let start = today
                .checked_sub_months(Months::new(months))
                .unwrap_or(today);
            store.due_on_or_after(start)
        }
        ReportingPeriod::AllTime => store.all_installments(),
    }
}

/// borrowers with at least `threshold` unpaid installments due on or before
/// today, anywhere in their schedule; a portfolio-wide property, independent
/// of any reporting period
pub fn waitlist_phones(
    all_installments: &[Installment],
    today: NaiveDate,
    threshold: usize,
) -> HashSet<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for inst in all_installments {
        if inst.is_due_unpaid(today) {
            *counts.entry(inst.phone.as_str()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .map(|(phone, _)| phone.to_string())
        .collect()
}

fn balance_for(all_installments: &[Installment], phone: &str) -> Money {
    all_installments
        .iter()
        .filter(|i| i.phone == phone && !i.status.is_paid())
        .fold(Money::ZERO, |acc, i| acc + i.pending_amount)
}

fn distinct_phones_in_order(rows: &[Installment]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut phones = Vec::new();
    for inst in rows {
        if seen.insert(inst.phone.clone()) {
            phones.push(inst.phone.clone());
        }
    }
    phones
}

fn schedule_of(all_installments: &[Installment], phone: &str) -> Vec<Installment> {
    let mut rows: Vec<Installment> = all_installments
        .iter()
        .filter(|i| i.phone == phone)
        .cloned()
        .collect();
    rows.sort_by_key(|i| i.month_number);
    rows
}

/// derives the per-period borrower groupings from current installment state
pub struct Classifier<'a, S: LoanStore + InstallmentStore> {
    store: &'a S,
    config: &'a ServicingConfig,
}

impl<'a, S: LoanStore + InstallmentStore> Classifier<'a, S> {
    pub fn new(store: &'a S, config: &'a ServicingConfig) -> Self {
        Self { store, config }
    }

    fn report_for(
        &self,
        phone: &str,
        installments: Vec<Installment>,
        all_installments: &[Installment],
    ) -> Result<BorrowerReport> {
        Ok(BorrowerReport {
            loan: self.store.find_loan(phone)?,
            installments,
            balance: balance_for(all_installments, phone),
        })
    }

    pub fn classify(
        &self,
        period: ReportingPeriod,
        year: i32,
        today: NaiveDate,
    ) -> Result<Classification> {
        let period_rows = period_installments(self.store, period, year, today)?;
        let all_rows = self.store.all_installments()?;
        let customers = distinct_phones_in_order(&period_rows);
        let waitlist = waitlist_phones(&all_rows, today, self.config.waitlist_threshold);

        let mut all = Vec::new();
        let mut paid = Vec::new();
        let mut pending = Vec::new();

        for phone in &customers {
            let in_period: Vec<Installment> = period_rows
                .iter()
                .filter(|i| &i.phone == phone)
                .cloned()
                .collect();
            all.push(self.report_for(phone, in_period.clone(), &all_rows)?);

            let paid_in_period: Vec<Installment> = in_period
                .iter()
                .filter(|i| i.status.is_paid())
                .cloned()
                .collect();
            if !paid_in_period.is_empty() {
                paid.push(self.report_for(phone, paid_in_period, &all_rows)?);
            }

            let has_due_unpaid = all_rows
                .iter()
                .any(|i| &i.phone == phone && i.is_due_unpaid(today));
            if has_due_unpaid && !waitlist.contains(phone) {
                // schedule up to and including the current month
                let up_to_now: Vec<Installment> = schedule_of(&all_rows, phone)
                    .into_iter()
                    .filter(|i| {
                        i.due_date <= today
                            || (i.due_date.year() == today.year()
                                && i.due_date.month() == today.month())
                    })
                    .collect();
                pending.push(self.report_for(phone, up_to_now, &all_rows)?);
            }
        }

        let mut waitlisted = Vec::new();
        let mut waitlist_sorted: Vec<&String> = waitlist.iter().collect();
        waitlist_sorted.sort();
        for phone in waitlist_sorted {
            let schedule = schedule_of(&all_rows, phone);
            waitlisted.push(self.report_for(phone, schedule, &all_rows)?);
        }

        Ok(Classification {
            all,
            paid,
            pending,
            waitlisted,
        })
    }

    /// bounded most-recently-paid view: the latest paid installments,
    /// deduplicated to distinct borrowers preserving first-seen order
    pub fn recent_payers(&self) -> Result<Vec<BorrowerReport>> {
        let recent = self.store.paid_by_recency(self.config.recent_payers_limit)?;
        let all_rows = self.store.all_installments()?;

        let mut reports = Vec::new();
        let mut seen = HashSet::new();
        for inst in recent {
            if !seen.insert(inst.phone.clone()) {
                continue;
            }
            let schedule = schedule_of(&all_rows, &inst.phone);
            reports.push(self.report_for(&inst.phone, schedule, &all_rows)?);
        }
        Ok(reports)
    }
}
