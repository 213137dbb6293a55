/// serialization support for portfolio state
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ServicingError};
use crate::installment::Installment;
use crate::loan::Loan;
use crate::store::{InstallmentStore, LoanStore};

/// serializable view of the full portfolio: every loan and every installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub loans: Vec<Loan>,
    pub installments: Vec<Installment>,
}

impl PortfolioSnapshot {
    /// capture the current store contents
    pub fn capture<S: LoanStore + InstallmentStore>(store: &S) -> Result<Self> {
        Ok(Self {
            loans: store.all_loans()?,
            installments: store.all_installments()?,
        })
    }

    /// write everything back into a store (upserts by key)
    pub fn restore<S: LoanStore + InstallmentStore>(&self, store: &S) -> Result<()> {
        for loan in &self.loans {
            store.update_loan(loan.clone())?;
        }
        for installment in &self.installments {
            store.update_installment(installment.clone())?;
        }
        Ok(())
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ServicingError::Store {
            message: format!("snapshot encode failed: {}", e),
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ServicingError::Store {
            message: format!("snapshot decode failed: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::loan::LoanBuilder;
    use crate::schedule::generate_schedule;
    use crate::store::MemoryStore;
    use chrono::{NaiveDate, TimeZone, Utc};
    use hourglass_rs::{SafeTimeProvider, TimeSource};

    #[test]
    fn test_snapshot_restores_into_empty_store() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = MemoryStore::new();
        let loan = LoanBuilder::new()
            .phone("9876543210")
            .name("Asha Rao")
            .principal(Money::from_major(3_000))
            .annual_rate(Rate::ZERO)
            .tenure_months(3)
            .start_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .build(&time)
            .unwrap();
        store.insert_loan(loan).unwrap();
        generate_schedule(&store, &store.find_loan("9876543210").unwrap().unwrap(), time.now())
            .unwrap();

        let snapshot = PortfolioSnapshot::capture(&store).unwrap();
        let json = snapshot.to_json_pretty().unwrap();

        let restored_store = MemoryStore::new();
        PortfolioSnapshot::from_json(&json)
            .unwrap()
            .restore(&restored_store)
            .unwrap();

        assert_eq!(restored_store.all_loans().unwrap().len(), 1);
        assert_eq!(
            restored_store.by_phone_ordered("9876543210").unwrap(),
            store.by_phone_ordered("9876543210").unwrap()
        );
    }
}
