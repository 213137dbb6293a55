use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{InstallmentId, InstallmentStatus, LoanId};

/// all events that can be emitted during servicing operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanRegistered {
        loan_id: LoanId,
        phone: String,
        principal: Money,
        tenure_months: u32,
        timestamp: DateTime<Utc>,
    },
    ScheduleGenerated {
        phone: String,
        installments_created: usize,
        timestamp: DateTime<Utc>,
    },
    LoanDeleted {
        phone: String,
        installments_removed: usize,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRecorded {
        installment_id: InstallmentId,
        phone: String,
        amount: Money,
        paid_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    PaymentReverted {
        installment_id: InstallmentId,
        phone: String,
        restored_pending: Money,
        timestamp: DateTime<Utc>,
    },

    // status events
    InstallmentStatusChanged {
        installment_id: InstallmentId,
        phone: String,
        month_number: u32,
        old_status: InstallmentStatus,
        new_status: InstallmentStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
