/// analytics - classification lists and the monthly report
use loan_servicing_rs::{
    LoanBuilder, MemoryStore, Money, PaymentUpdate, Rate, ReportingPeriod, SafeTimeProvider,
    ServicingEngine, TimeSource,
};
use chrono::{NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== analytics ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 4, 5, 0, 0, 0).unwrap(),
    ));
    let engine = ServicingEngine::new(MemoryStore::new());

    // three borrowers at different stages
    for (phone, name, start) in [
        ("9876543210", "Asha Rao", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        ("9812345678", "Vikram Shetty", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        ("9898989898", "Meena Pillai", NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
    ] {
        let loan = LoanBuilder::new()
            .phone(phone)
            .name(name)
            .principal(Money::from_major(6_000))
            .annual_rate(Rate::ZERO)
            .tenure_months(6)
            .start_date(start)
            .build(&time)?;
        engine.register_loan(loan, &time)?;
        engine.generate_schedule(phone, &time)?;
    }

    // vikram keeps current; asha has not paid since january
    let vikram = engine.schedule_for("9812345678", &time)?;
    for inst in vikram.iter().take(2) {
        engine.record_payment(PaymentUpdate::paid(inst.id, inst.due_date), &time)?;
    }

    let classification = engine.classify(ReportingPeriod::Month(4), 2024, &time)?;
    println!("april classification:");
    println!("  all:        {}", classification.all.len());
    println!("  paid:       {}", classification.paid.len());
    println!("  pending:    {}", classification.pending.len());
    println!("  waitlisted: {}", classification.waitlisted.len());

    for report in &classification.waitlisted {
        if let Some(loan) = &report.loan {
            println!("  waitlisted borrower {} owes {}", loan.phone, report.balance);
        }
    }

    let report = engine.report(ReportingPeriod::Month(4), 2024, &time)?;
    println!("\napril report:");
    println!("  customers:  {}", report.total_customers);
    println!(
        "  collected:  {} of {} ({}% {})",
        report.total_collected,
        report.total_expected,
        report.collection_percentage,
        report.collection_direction
    );
    println!(
        "  waitlist:   {}% {}",
        report.waitlist_percentage, report.waitlist_direction
    );

    println!("\nrecent payers:");
    for payer in engine.recent_payers()? {
        if let Some(loan) = &payer.loan {
            println!("  {} balance {}", loan.borrower.name, payer.balance);
        }
    }

    let stats = engine.dashboard(None)?;
    println!(
        "\ndashboard: {} borrowers, {} collected, {} pending",
        stats.total_borrowers, stats.total_collected, stats.total_pending
    );

    Ok(())
}
