use chrono::{DateTime, Months, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{Result, ServicingError};
use crate::types::{LoanId, LoanStatus};

/// borrower identity details carried on the loan record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerProfile {
    pub name: String,
    pub place: String,
    pub occupation: String,
    pub referred_by: Option<String>,
}

/// an installment loan; immutable after creation except the lifecycle status
/// and explicit term updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    /// borrower phone, the business key; unique across the portfolio
    pub phone: String,
    pub borrower: BorrowerProfile,

    // terms
    pub principal: Money,
    pub annual_rate: Rate,
    pub tenure_months: u32,
    pub monthly_installment: Money,
    pub total_payable: Money,

    // schedule window
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// replace profile and terms, recomputing the installment amount and
    /// total payable; already-generated installments keep their frozen amounts
    pub fn apply_update(&mut self, update: LoanUpdate, now: DateTime<Utc>) -> Result<()> {
        validate_terms(update.principal, update.tenure_months)?;

        let monthly_installment =
            calculate_emi(update.principal, update.annual_rate, update.tenure_months);

        self.borrower = update.borrower;
        self.principal = update.principal;
        self.annual_rate = update.annual_rate;
        self.tenure_months = update.tenure_months;
        self.monthly_installment = monthly_installment;
        self.total_payable = monthly_installment * Decimal::from(update.tenure_months);
        self.start_date = update.start_date;
        self.end_date = schedule_end_date(update.start_date, update.tenure_months)?;
        self.updated_at = now;

        Ok(())
    }
}

/// replacement profile and terms for an existing loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanUpdate {
    pub borrower: BorrowerProfile,
    pub principal: Money,
    pub annual_rate: Rate,
    pub tenure_months: u32,
    pub start_date: NaiveDate,
}

/// builder for new loans; computes the fixed installment and total payable
/// so the `installment * tenure == total` invariant holds by construction
#[derive(Debug, Default)]
pub struct LoanBuilder {
    phone: Option<String>,
    name: Option<String>,
    place: Option<String>,
    occupation: Option<String>,
    referred_by: Option<String>,
    principal: Option<Money>,
    annual_rate: Option<Rate>,
    tenure_months: Option<u32>,
    start_date: Option<NaiveDate>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    pub fn occupation(mut self, occupation: impl Into<String>) -> Self {
        self.occupation = Some(occupation.into());
        self
    }

    pub fn referred_by(mut self, referred_by: impl Into<String>) -> Self {
        self.referred_by = Some(referred_by.into());
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn annual_rate(mut self, rate: Rate) -> Self {
        self.annual_rate = Some(rate);
        self
    }

    pub fn tenure_months(mut self, months: u32) -> Self {
        self.tenure_months = Some(months);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn build(self, time_provider: &SafeTimeProvider) -> Result<Loan> {
        let phone = self.phone.filter(|p| !p.is_empty()).ok_or_else(|| {
            ServicingError::InvalidTerms {
                message: "borrower phone is required".to_string(),
            }
        })?;
        let name = self.name.filter(|n| !n.is_empty()).ok_or_else(|| {
            ServicingError::InvalidTerms {
                message: "borrower name is required".to_string(),
            }
        })?;
        let principal = self.principal.ok_or_else(|| ServicingError::InvalidTerms {
            message: "principal is required".to_string(),
        })?;
        let tenure_months = self.tenure_months.ok_or_else(|| ServicingError::InvalidTerms {
            message: "tenure is required".to_string(),
        })?;
        let start_date = self.start_date.ok_or_else(|| ServicingError::InvalidTerms {
            message: "start date is required".to_string(),
        })?;
        let annual_rate = self.annual_rate.unwrap_or(Rate::ZERO);

        validate_terms(principal, tenure_months)?;

        let monthly_installment = calculate_emi(principal, annual_rate, tenure_months);
        let total_payable = monthly_installment * Decimal::from(tenure_months);
        let now = time_provider.now();

        Ok(Loan {
            id: Uuid::new_v4(),
            phone,
            borrower: BorrowerProfile {
                name,
                place: self.place.unwrap_or_default(),
                occupation: self.occupation.unwrap_or_default(),
                referred_by: self.referred_by,
            },
            principal,
            annual_rate,
            tenure_months,
            monthly_installment,
            total_payable,
            start_date,
            end_date: schedule_end_date(start_date, tenure_months)?,
            status: LoanStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }
}

fn validate_terms(principal: Money, tenure_months: u32) -> Result<()> {
    if !principal.is_positive() {
        return Err(ServicingError::InvalidTerms {
            message: format!("principal must be positive: {}", principal),
        });
    }
    if tenure_months < 1 {
        return Err(ServicingError::InvalidTerms {
            message: "tenure must be at least 1 month".to_string(),
        });
    }
    Ok(())
}

/// due date of the last installment: start shifted by tenure - 1 months
pub fn schedule_end_date(start_date: NaiveDate, tenure_months: u32) -> Result<NaiveDate> {
    start_date
        .checked_add_months(Months::new(tenure_months - 1))
        .ok_or_else(|| ServicingError::InvalidDate {
            message: format!("schedule end out of range from {}", start_date),
        })
}

/// fixed monthly installment: P * r * (1 + r)^n / ((1 + r)^n - 1),
/// plain principal division when the rate is zero
pub fn calculate_emi(principal: Money, annual_rate: Rate, months: u32) -> Money {
    if months == 0 {
        return principal;
    }

    let monthly_rate = annual_rate.as_decimal() / dec!(12);

    if monthly_rate.is_zero() {
        return principal / Decimal::from(months);
    }

    let r = monthly_rate;
    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + r;
    for _ in 0..months {
        compound *= base;
    }

    let numerator = principal.as_decimal() * r * compound;
    let denominator = compound - Decimal::ONE;

    Money::from_decimal(numerator / denominator)
}
