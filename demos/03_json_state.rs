/// json state - snapshot the portfolio and restore it elsewhere
use loan_servicing_rs::{
    InstallmentStore, LoanBuilder, LoanStore, MemoryStore, Money, PortfolioSnapshot, Rate,
    SafeTimeProvider, ServicingEngine, TimeSource,
};
use chrono::{NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== json state ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let engine = ServicingEngine::new(MemoryStore::new());

    let loan = LoanBuilder::new()
        .phone("9876543210")
        .name("Asha Rao")
        .principal(Money::from_major(12_000))
        .annual_rate(Rate::from_percentage(10))
        .tenure_months(12)
        .start_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        .build(&time)?;
    engine.register_loan(loan, &time)?;
    engine.generate_schedule("9876543210", &time)?;

    let snapshot = PortfolioSnapshot::capture(engine.store())?;
    let json = snapshot.to_json_pretty()?;
    println!("snapshot is {} bytes of json", json.len());

    let restored = MemoryStore::new();
    PortfolioSnapshot::from_json(&json)?.restore(&restored)?;
    println!(
        "restored {} loans and {} installments",
        restored.all_loans()?.len(),
        restored.all_installments()?.len()
    );

    Ok(())
}
