use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Datelike, NaiveDate};

use crate::errors::Result;
use crate::installment::Installment;
use crate::loan::Loan;
use crate::types::InstallmentId;

/// durable loan records keyed by borrower phone
///
/// implementations are extensions (database-backed stores live outside this
/// crate); [`MemoryStore`] is the reference implementation
pub trait LoanStore: Send + Sync {
    fn insert_loan(&self, loan: Loan) -> Result<()>;
    fn find_loan(&self, phone: &str) -> Result<Option<Loan>>;
    fn update_loan(&self, loan: Loan) -> Result<()>;
    fn all_loans(&self) -> Result<Vec<Loan>>;
    /// returns true when a record existed and was removed
    fn delete_loan(&self, phone: &str) -> Result<bool>;
}

/// durable installment records with the key/range queries the core needs
pub trait InstallmentStore: Send + Sync {
    fn insert_installment(&self, installment: Installment) -> Result<()>;
    fn installment(&self, id: InstallmentId) -> Result<Option<Installment>>;
    fn update_installment(&self, installment: Installment) -> Result<()>;

    /// a borrower's full schedule ordered by month_number ascending
    fn by_phone_ordered(&self, phone: &str) -> Result<Vec<Installment>>;
    /// every installment not in Paid, portfolio wide
    fn not_paid(&self) -> Result<Vec<Installment>>;
    /// installments whose due date falls in the given calendar month
    fn by_due_month(&self, month: u32, year: i32) -> Result<Vec<Installment>>;
    /// installments due on or after the given date
    fn due_on_or_after(&self, date: NaiveDate) -> Result<Vec<Installment>>;
    /// installments due inside the inclusive window
    fn due_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Installment>>;
    fn all_installments(&self) -> Result<Vec<Installment>>;
    /// paid installments, most recent paid_date first, capped at limit
    fn paid_by_recency(&self, limit: usize) -> Result<Vec<Installment>>;

    /// cascade removal for loan deletion; returns the number removed
    fn delete_by_phone(&self, phone: &str) -> Result<usize>;
}

/// in-memory reference store used by tests, demos and embedders without a
/// database
#[derive(Debug, Default)]
pub struct MemoryStore {
    loans: RwLock<HashMap<String, Loan>>,
    installments: RwLock<HashMap<InstallmentId, Installment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_by_schedule(mut rows: Vec<Installment>) -> Vec<Installment> {
        rows.sort_by(|a, b| {
            a.phone
                .cmp(&b.phone)
                .then(a.month_number.cmp(&b.month_number))
        });
        rows
    }
}

impl LoanStore for MemoryStore {
    fn insert_loan(&self, loan: Loan) -> Result<()> {
        self.loans.write().unwrap().insert(loan.phone.clone(), loan);
        Ok(())
    }

    fn find_loan(&self, phone: &str) -> Result<Option<Loan>> {
        Ok(self.loans.read().unwrap().get(phone).cloned())
    }

    fn update_loan(&self, loan: Loan) -> Result<()> {
        self.loans.write().unwrap().insert(loan.phone.clone(), loan);
        Ok(())
    }

    fn all_loans(&self) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self.loans.read().unwrap().values().cloned().collect();
        loans.sort_by(|a, b| a.phone.cmp(&b.phone));
        Ok(loans)
    }

    fn delete_loan(&self, phone: &str) -> Result<bool> {
        Ok(self.loans.write().unwrap().remove(phone).is_some())
    }
}

impl InstallmentStore for MemoryStore {
    fn insert_installment(&self, installment: Installment) -> Result<()> {
        self.installments
            .write()
            .unwrap()
            .insert(installment.id, installment);
        Ok(())
    }

    fn installment(&self, id: InstallmentId) -> Result<Option<Installment>> {
        Ok(self.installments.read().unwrap().get(&id).cloned())
    }

    fn update_installment(&self, installment: Installment) -> Result<()> {
        self.installments
            .write()
            .unwrap()
            .insert(installment.id, installment);
        Ok(())
    }

    fn by_phone_ordered(&self, phone: &str) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self
            .installments
            .read()
            .unwrap()
            .values()
            .filter(|i| i.phone == phone)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.month_number);
        Ok(rows)
    }

    fn not_paid(&self) -> Result<Vec<Installment>> {
        let rows = self
            .installments
            .read()
            .unwrap()
            .values()
            .filter(|i| !i.status.is_paid())
            .cloned()
            .collect();
        Ok(Self::sorted_by_schedule(rows))
    }

    fn by_due_month(&self, month: u32, year: i32) -> Result<Vec<Installment>> {
        let rows = self
            .installments
            .read()
            .unwrap()
            .values()
            .filter(|i| i.due_date.month() == month && i.due_date.year() == year)
            .cloned()
            .collect();
        Ok(Self::sorted_by_schedule(rows))
    }

    fn due_on_or_after(&self, date: NaiveDate) -> Result<Vec<Installment>> {
        let rows = self
            .installments
            .read()
            .unwrap()
            .values()
            .filter(|i| i.due_date >= date)
            .cloned()
            .collect();
        Ok(Self::sorted_by_schedule(rows))
    }

    fn due_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Installment>> {
        let rows = self
            .installments
            .read()
            .unwrap()
            .values()
            .filter(|i| i.due_date >= start && i.due_date <= end)
            .cloned()
            .collect();
        Ok(Self::sorted_by_schedule(rows))
    }

    fn all_installments(&self) -> Result<Vec<Installment>> {
        let rows = self
            .installments
            .read()
            .unwrap()
            .values()
            .cloned()
            .collect();
        Ok(Self::sorted_by_schedule(rows))
    }

    fn paid_by_recency(&self, limit: usize) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self
            .installments
            .read()
            .unwrap()
            .values()
            .filter(|i| i.status.is_paid() && i.paid_date.is_some())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.paid_date.cmp(&a.paid_date));
        rows.truncate(limit);
        Ok(rows)
    }

    fn delete_by_phone(&self, phone: &str) -> Result<usize> {
        let mut map = self.installments.write().unwrap();
        let before = map.len();
        map.retain(|_, i| i.phone != phone);
        Ok(before - map.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use chrono::{TimeZone, Utc};

    fn installment(phone: &str, month_number: u32, due: (i32, u32, u32)) -> Installment {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Installment::new(
            phone,
            month_number,
            NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap(),
            Money::from_major(1_000),
            now,
        )
    }

    #[test]
    fn test_schedule_ordering() {
        let store = MemoryStore::new();
        store.insert_installment(installment("111", 3, (2024, 3, 1))).unwrap();
        store.insert_installment(installment("111", 1, (2024, 1, 1))).unwrap();
        store.insert_installment(installment("111", 2, (2024, 2, 1))).unwrap();
        store.insert_installment(installment("222", 1, (2024, 1, 15))).unwrap();

        let rows = store.by_phone_ordered("111").unwrap();
        let months: Vec<u32> = rows.iter().map(|i| i.month_number).collect();
        assert_eq!(months, vec![1, 2, 3]);
    }

    #[test]
    fn test_due_month_query() {
        let store = MemoryStore::new();
        store.insert_installment(installment("111", 1, (2024, 1, 1))).unwrap();
        store.insert_installment(installment("111", 2, (2024, 2, 1))).unwrap();
        store.insert_installment(installment("222", 1, (2023, 2, 1))).unwrap();

        let feb_2024 = store.by_due_month(2, 2024).unwrap();
        assert_eq!(feb_2024.len(), 1);
        assert_eq!(feb_2024[0].phone, "111");
    }

    #[test]
    fn test_not_paid_excludes_paid() {
        let store = MemoryStore::new();
        let mut paid = installment("111", 1, (2024, 1, 1));
        paid.status = crate::types::InstallmentStatus::Paid;
        store.insert_installment(paid).unwrap();
        store.insert_installment(installment("111", 2, (2024, 2, 1))).unwrap();

        let unpaid = store.not_paid().unwrap();
        assert_eq!(unpaid.len(), 1);
        assert_eq!(unpaid[0].month_number, 2);
    }

    #[test]
    fn test_paid_by_recency_orders_and_caps() {
        let store = MemoryStore::new();
        for (n, day) in [(1u32, 5u32), (2, 20), (3, 12)] {
            let mut inst = installment("111", n, (2024, n, 1));
            inst.status = crate::types::InstallmentStatus::Paid;
            inst.paid_date = NaiveDate::from_ymd_opt(2024, 3, day);
            store.insert_installment(inst).unwrap();
        }

        let recent = store.paid_by_recency(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].paid_date, NaiveDate::from_ymd_opt(2024, 3, 20));
        assert_eq!(recent[1].paid_date, NaiveDate::from_ymd_opt(2024, 3, 12));
    }

    #[test]
    fn test_delete_by_phone_cascade() {
        let store = MemoryStore::new();
        store.insert_installment(installment("111", 1, (2024, 1, 1))).unwrap();
        store.insert_installment(installment("111", 2, (2024, 2, 1))).unwrap();
        store.insert_installment(installment("222", 1, (2024, 1, 1))).unwrap();

        assert_eq!(store.delete_by_phone("111").unwrap(), 2);
        assert_eq!(store.all_installments().unwrap().len(), 1);
    }
}
