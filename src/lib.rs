pub mod analytics;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod installment;
pub mod loan;
pub mod payment;
pub mod reconcile;
pub mod schedule;
pub mod snapshot;
pub mod store;
pub mod sweeper;
pub mod types;

// re-export key types
pub use analytics::{
    Aggregator, AnalyticsReport, BorrowerReport, Classification, Classifier, DashboardStats,
    Direction,
};
pub use config::{DirectionThresholds, ServicingConfig};
pub use decimal::{Money, Rate};
pub use engine::{ServicingEngine, SweepSummary};
pub use errors::{Result, ServicingError};
pub use events::{Event, EventStore};
pub use installment::Installment;
pub use loan::{calculate_emi, BorrowerProfile, Loan, LoanBuilder, LoanUpdate};
pub use payment::PaymentUpdate;
pub use reconcile::{installment_status, ReconcileSummary, Reconciler};
pub use schedule::{generate_schedule, GenerationOutcome};
pub use snapshot::PortfolioSnapshot;
pub use store::{InstallmentStore, LoanStore, MemoryStore};
pub use sweeper::{Sweeper, DEFAULT_SWEEP_INTERVAL};
pub use types::{InstallmentId, InstallmentStatus, LoanId, LoanStatus, ReportingPeriod};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
