pub mod classify;
pub mod report;

pub use classify::{BorrowerReport, Classification, Classifier};
pub use report::{Aggregator, AnalyticsReport, DashboardStats, Direction};
