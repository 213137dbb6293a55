/// quick start - register a loan, generate its schedule, record a payment
use loan_servicing_rs::{
    LoanBuilder, MemoryStore, Money, PaymentUpdate, Rate, SafeTimeProvider, ServicingEngine,
    TimeSource,
};
use chrono::{NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== quick start ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
    ));
    let engine = ServicingEngine::new(MemoryStore::new());

    // register a 12-month loan
    let loan = LoanBuilder::new()
        .phone("9876543210")
        .name("Asha Rao")
        .place("Chennai")
        .occupation("Teacher")
        .principal(Money::from_major(100_000))
        .annual_rate(Rate::from_percentage(12))
        .tenure_months(12)
        .start_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        .build(&time)?;

    println!("monthly installment: {}", loan.monthly_installment);
    println!("total payable:       {}", loan.total_payable);

    engine.register_loan(loan, &time)?;

    // schedule generation is decoupled from registration
    let outcome = engine.generate_schedule("9876543210", &time)?;
    println!("\ninstallments generated: {}", outcome.created);

    // pay the first installment
    let schedule = engine.schedule_for("9876543210", &time)?;
    let first = &schedule[0];
    engine.record_payment(
        PaymentUpdate::paid(first.id, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()),
        &time,
    )?;

    println!("\nschedule after payment:");
    for inst in engine.schedule_for("9876543210", &time)? {
        println!(
            "  {:>2} {} due {} status {:?} cumulative pending {}",
            inst.month_number,
            inst.month_label(),
            inst.due_date,
            inst.status,
            inst.cumulative_pending
        );
    }

    Ok(())
}
