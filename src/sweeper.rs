use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hourglass_rs::{SafeTimeProvider, TimeSource};

use crate::engine::ServicingEngine;
use crate::store::{InstallmentStore, LoanStore};

/// how often the portfolio sweep runs unless configured otherwise
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// recurring background task that re-evaluates overdue statuses across the
/// whole portfolio.
///
/// Owns its thread and a shutdown hook; dropping the sweeper (or calling
/// [`stop`](Self::stop)) signals the thread and joins it. Safe to run
/// alongside on-demand reconciliation: the engine's per-borrower locks make
/// the sweep skip borrowers that are busy.
pub struct Sweeper {
    handle: Option<JoinHandle<()>>,
    shutdown: Sender<()>,
}

impl Sweeper {
    /// spawn the sweep loop against a shared engine
    pub fn start<S>(engine: Arc<ServicingEngine<S>>, interval: Duration) -> Self
    where
        S: LoanStore + InstallmentStore + 'static,
    {
        let (shutdown, signal) = mpsc::channel();

        let handle = thread::spawn(move || {
            let time = SafeTimeProvider::new(TimeSource::System);
            log::info!("overdue sweeper started, interval {:?}", interval);

            loop {
                match signal.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(err) = engine.sweep_overdue(&time) {
                            log::error!("overdue sweep failed: {}", err);
                        }
                    }
                }
            }

            log::info!("overdue sweeper stopped");
        });

        Self {
            handle: Some(handle),
            shutdown,
        }
    }

    /// signal the loop and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::loan::LoanBuilder;
    use crate::store::MemoryStore;
    use crate::types::InstallmentStatus;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_sweeper_runs_and_shuts_down() {
        let registered_at = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));

        let engine = Arc::new(ServicingEngine::new(MemoryStore::new()));
        let loan = LoanBuilder::new()
            .phone("9876543210")
            .name("Asha Rao")
            .principal(Money::from_major(3_000))
            .annual_rate(Rate::ZERO)
            .tenure_months(3)
            .start_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .build(&registered_at)
            .unwrap();
        engine.register_loan(loan, &registered_at).unwrap();
        engine.generate_schedule("9876543210", &registered_at).unwrap();

        let sweeper = Sweeper::start(Arc::clone(&engine), Duration::from_millis(20));
        thread::sleep(Duration::from_millis(300));
        sweeper.stop();

        // due dates are long past against system time, so the sweep has
        // flipped the whole schedule to overdue
        let schedule = engine.store().by_phone_ordered("9876543210").unwrap();
        assert!(schedule
            .iter()
            .all(|i| i.status == InstallmentStatus::Overdue));
    }
}
