/// time control - watch statuses reclassify as controlled time advances
use loan_servicing_rs::{
    InstallmentStore, LoanBuilder, MemoryStore, Money, Rate, SafeTimeProvider, ServicingEngine,
    TimeSource,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== time control ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let engine = ServicingEngine::new(MemoryStore::new());
    let loan = LoanBuilder::new()
        .phone("9876543210")
        .name("Asha Rao")
        .principal(Money::from_major(6_000))
        .annual_rate(Rate::ZERO)
        .tenure_months(6)
        .start_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        .build(&time)?;
    engine.register_loan(loan, &time)?;
    engine.generate_schedule("9876543210", &time)?;

    for _ in 0..4 {
        println!("today: {}", time.now().format("%Y-%m-%d"));
        let summary = engine.sweep_overdue(&time)?;
        println!(
            "  sweep: {} scanned, {} updated",
            summary.scanned, summary.updated
        );
        for inst in engine.store().by_phone_ordered("9876543210")? {
            println!("  month {:>2} -> {:?}", inst.month_number, inst.status);
        }
        println!();
        controller.advance(Duration::days(31));
    }

    println!("nothing paid for three months: the oldest installments are overdue");
    Ok(())
}
