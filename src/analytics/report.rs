use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::analytics::classify::{period_installments, waitlist_phones};
use crate::config::ServicingConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::store::{InstallmentStore, LoanStore};
use crate::types::ReportingPeriod;

/// directional indicator on a report metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "+")]
    Improving,
    #[serde(rename = "-")]
    Worsening,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Improving => write!(f, "+"),
            Direction::Worsening => write!(f, "-"),
        }
    }
}

/// portfolio analytics for one reporting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub period: ReportingPeriod,
    pub year: i32,

    // customer counts
    pub total_customers: usize,
    pub paid_customers: usize,
    pub pending_customers: usize,
    pub waitlisted_customers: usize,

    // amounts
    pub total_collected: Money,
    pub total_expected: Money,
    /// amount_due over installments due on/before today and unpaid,
    /// restricted to the period's borrowers
    pub total_unpaid: Money,

    // percentages
    pub customer_growth_percentage: Decimal,
    pub paid_percentage: Decimal,
    pub pending_percentage: Decimal,
    pub waitlist_percentage: Decimal,
    pub collection_percentage: Decimal,

    // directional indicators
    pub customer_growth_direction: Direction,
    pub paid_direction: Direction,
    pub pending_direction: Direction,
    pub waitlist_direction: Direction,
    pub collection_direction: Direction,
}

/// portfolio-wide headline totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_borrowers: usize,
    pub total_collected: Money,
    pub total_pending: Money,
}

fn previous_month(month: u32, year: i32) -> (u32, i32) {
    if month == 1 {
        (12, year - 1)
    } else {
        (month - 1, year)
    }
}

fn share(count: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(count as u64) * dec!(100) / Decimal::from(total as u64)).round_dp(2)
}

/// folds classification state into portfolio-level reports
pub struct Aggregator<'a, S: LoanStore + InstallmentStore> {
    store: &'a S,
    config: &'a ServicingConfig,
}

impl<'a, S: LoanStore + InstallmentStore> Aggregator<'a, S> {
    pub fn new(store: &'a S, config: &'a ServicingConfig) -> Self {
        Self { store, config }
    }

    pub fn aggregate(
        &self,
        period: ReportingPeriod,
        year: i32,
        today: NaiveDate,
    ) -> Result<AnalyticsReport> {
        let period_rows = period_installments(self.store, period, year, today)?;
        let all_rows = self.store.all_installments()?;

        let customers: HashSet<&str> = period_rows.iter().map(|i| i.phone.as_str()).collect();
        let total_customers = customers.len();

        let paid_customers = customers
            .iter()
            .filter(|phone| {
                period_rows
                    .iter()
                    .any(|i| i.phone == **phone && i.status.is_paid())
            })
            .count();

        let waitlist = waitlist_phones(&all_rows, today, self.config.waitlist_threshold);
        let waitlisted_customers = customers
            .iter()
            .filter(|phone| waitlist.contains(*phone))
            .count();

        let pending_customers = customers
            .iter()
            .filter(|phone| {
                !waitlist.contains(*phone)
                    && all_rows
                        .iter()
                        .any(|i| i.phone == **phone && i.is_due_unpaid(today))
            })
            .count();

        let total_collected = period_rows
            .iter()
            .filter(|i| i.status.is_paid())
            .fold(Money::ZERO, |acc, i| acc + i.paid_amount);

        let total_expected = period_rows
            .iter()
            .fold(Money::ZERO, |acc, i| acc + i.amount_due);

        let total_unpaid = all_rows
            .iter()
            .filter(|i| i.is_due_unpaid(today) && customers.contains(i.phone.as_str()))
            .fold(Money::ZERO, |acc, i| acc + i.amount_due);

        let collection_percentage = if total_expected.is_zero() {
            Decimal::ZERO
        } else {
            (total_collected.as_decimal() * dec!(100) / total_expected.as_decimal()).round_dp(2)
        };

        // growth compares against the calendar month immediately before the
        // anchor: the report month, or today's month for rolling periods
        let (anchor_month, anchor_year) = match period.month_number() {
            Some(month) => (month, year),
            None => (today.month(), today.year()),
        };
        let (prev_month, prev_year) = previous_month(anchor_month, anchor_year);
        let prev_rows = self.store.by_due_month(prev_month, prev_year)?;
        let prev_count = prev_rows
            .iter()
            .map(|i| i.phone.as_str())
            .collect::<HashSet<&str>>()
            .len();

        let customer_growth_percentage = if prev_count == 0 {
            dec!(100)
        } else {
            ((Decimal::from(total_customers as i64) - Decimal::from(prev_count as i64))
                * dec!(100)
                / Decimal::from(prev_count as i64))
            .round_dp(2)
        };

        let paid_percentage = share(paid_customers, total_customers);
        let pending_percentage = share(pending_customers, total_customers);
        let waitlist_percentage = share(waitlisted_customers, total_customers);

        let thresholds = &self.config.directions;
        let direction = |healthy: bool| {
            if healthy {
                Direction::Improving
            } else {
                Direction::Worsening
            }
        };

        Ok(AnalyticsReport {
            period,
            year,
            total_customers,
            paid_customers,
            pending_customers,
            waitlisted_customers,
            total_collected,
            total_expected,
            total_unpaid,
            customer_growth_percentage,
            paid_percentage,
            pending_percentage,
            waitlist_percentage,
            collection_percentage,
            customer_growth_direction: direction(customer_growth_percentage >= Decimal::ZERO),
            paid_direction: direction(paid_percentage >= thresholds.paid_percentage),
            pending_direction: direction(pending_percentage < thresholds.pending_percentage),
            waitlist_direction: direction(waitlist_percentage < thresholds.waitlist_percentage),
            collection_direction: direction(
                collection_percentage >= thresholds.collection_percentage,
            ),
        })
    }

    /// headline totals, optionally restricted to a due-date window
    pub fn dashboard(
        &self,
        window: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<DashboardStats> {
        let rows = match window {
            Some((start, end)) => self.store.due_between(start, end)?,
            None => self.store.all_installments()?,
        };

        let total_borrowers = match window {
            Some(_) => rows
                .iter()
                .map(|i| i.phone.as_str())
                .collect::<HashSet<&str>>()
                .len(),
            None => self.store.all_loans()?.len(),
        };

        let total_collected = rows
            .iter()
            .filter(|i| i.status.is_paid())
            .fold(Money::ZERO, |acc, i| acc + i.paid_amount);

        let total_pending = rows
            .iter()
            .filter(|i| !i.status.is_paid())
            .fold(Money::ZERO, |acc, i| acc + i.pending_amount);

        Ok(DashboardStats {
            total_borrowers,
            total_collected,
            total_pending,
        })
    }
}
