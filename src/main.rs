// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tredgate_loans::{
    export_csv, import_csv, open_service, Config, Decision, LoanApplication, LoanError,
    NewLoanApplication, SqliteLoanService,
};

const USAGE: &str = "Usage:
  tredgate-loans                                   interactive UI
  tredgate-loans create <name> <amount> <term_months> <interest_rate>
  tredgate-loans list
  tredgate-loans stats
  tredgate-loans approve <id>
  tredgate-loans reject <id>
  tredgate-loans auto <id>
  tredgate-loans delete <id>
  tredgate-loans import <file.csv>
  tredgate-loans export <file.csv>";

fn main() -> Result<()> {
    let config = Config::from_env()?;
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        // UI mode (default); the UI owns the terminal so no log output
        return run_ui_mode(&config);
    }

    init_logging(&config);
    let service = open_service(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;

    let result = run_command(&service, &args);

    // Validation and not-found are user errors: print the message only
    if let Some(loan_err) = result.as_ref().err().and_then(|e| e.downcast_ref::<LoanError>()) {
        if loan_err.is_recoverable() {
            eprintln!("❌ {}", loan_err);
            std::process::exit(1);
        }
    }

    result
}

fn init_logging(config: &Config) {
    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn arg<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a str> {
    match args.get(i) {
        Some(value) => Ok(value.as_str()),
        None => bail!("Missing <{}>\n\n{}", name, USAGE),
    }
}

fn run_command(service: &SqliteLoanService, args: &[String]) -> Result<()> {
    match args[0].as_str() {
        "create" => {
            let input = NewLoanApplication::new(
                arg(args, 1, "name")?,
                parse_number(arg(args, 2, "amount")?, "amount")?,
                parse_number(arg(args, 3, "term_months")?, "term_months")?,
                parse_number(arg(args, 4, "interest_rate")?, "interest_rate")?,
            );
            let loan = service.create(input)?;
            println!("✓ Created loan {}", loan.id);
            print_loan(&loan);
        }
        "list" => {
            let loans = service.get_all()?;
            if loans.is_empty() {
                println!("No loan applications yet.");
            }
            for loan in &loans {
                print_loan(loan);
            }
        }
        "stats" => {
            let summary = service.summary()?;
            println!("📊 Loan Applications");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("Total:           {}", summary.total);
            println!("Pending:         {}", summary.pending);
            println!("Approved:        {}", summary.approved);
            println!("Rejected:        {}", summary.rejected);
            println!("Total requested: {:.2}", summary.total_requested);
            println!("Total approved:  {:.2}", summary.total_approved);
        }
        "approve" => {
            let loan = service.update_status(arg(args, 1, "id")?, Decision::Approved)?;
            println!("✓ Loan {} approved", loan.id);
        }
        "reject" => {
            let loan = service.update_status(arg(args, 1, "id")?, Decision::Rejected)?;
            println!("✓ Loan {} rejected", loan.id);
        }
        "auto" => {
            let loan = service.auto_decide(arg(args, 1, "id")?)?;
            println!("✓ Loan {} auto-decided: {}", loan.id, loan.status);
        }
        "delete" => {
            let loan = service.delete(arg(args, 1, "id")?)?;
            println!("✓ Deleted loan {} ({})", loan.id, loan.applicant_name);
        }
        "import" => {
            let report = import_csv(service, Path::new(arg(args, 1, "file.csv")?))?;
            println!(
                "✓ Imported {} of {} rows",
                report.created.len(),
                report.total_rows()
            );
            for (line, reason) in &report.rejected {
                println!("  ✗ line {}: {}", line, reason);
            }
        }
        "export" => {
            let count = export_csv(service, Path::new(arg(args, 1, "file.csv")?))?;
            println!("✓ Exported {} loans", count);
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }

    Ok(())
}

fn parse_number<T>(raw: &str, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("<{}> must be a number, got '{}'", name, raw))
}

fn print_loan(loan: &LoanApplication) {
    println!(
        "{}  {:<24} {:>12.2}  {:>3} mo  {:>6.2}%  {:>10.2}/mo  {:<8}  {}",
        loan.id,
        loan.applicant_name,
        loan.amount,
        loan.term_months,
        loan.interest_rate * 100.0,
        loan.monthly_payment(),
        loan.status.as_str(),
        loan.created_at.format("%Y-%m-%d %H:%M"),
    );
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    println!("🖥️  Loading Tredgate Loans UI...\n");

    let service = open_service(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;

    let loans = service.get_all()?;
    println!("✓ Loaded {} loan applications\n", loans.len());

    let mut app = ui::App::new(service)?;
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("{}", USAGE);
    std::process::exit(1);
}
