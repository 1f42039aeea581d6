// 📥 CSV Import / Export
// Import pushes every row through LoanService::create, so stored data is
// always validated. Rows that fail validation are reported, not fatal.

use crate::error::{LoanError, ValidationError};
use crate::loan::{LoanApplication, NewLoanApplication};
use crate::service::LoanService;
use crate::storage::LoanStorage;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// IMPORT
// ============================================================================

#[derive(Debug, Default)]
pub struct ImportReport {
    pub created: Vec<LoanApplication>,
    /// (CSV line number, reason)
    pub rejected: Vec<(u64, ValidationError)>,
}

impl ImportReport {
    pub fn total_rows(&self) -> usize {
        self.created.len() + self.rejected.len()
    }
}

pub fn import_csv<S: LoanStorage>(service: &LoanService<S>, csv_path: &Path) -> Result<ImportReport> {
    let file = File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;
    import_from_reader(service, file)
}

/// Expects a header row `applicantName,amount,termMonths,interestRate`.
pub fn import_from_reader<S: LoanStorage, R: Read>(
    service: &LoanService<S>,
    reader: R,
) -> Result<ImportReport> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let mut record = csv::StringRecord::new();
    let mut report = ImportReport::default();

    while rdr.read_record(&mut record).context("Failed to read CSV row")? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let input: NewLoanApplication = record
            .deserialize(Some(&headers))
            .with_context(|| format!("Failed to deserialize loan application on line {}", line))?;

        match service.create(input) {
            Ok(record) => report.created.push(record),
            Err(LoanError::Validation(e)) => {
                warn!(line, reason = %e, "skipping invalid row");
                report.rejected.push((line, e));
            }
            Err(e) => return Err(e).context("Import aborted"),
        }
    }

    info!(
        created = report.created.len(),
        rejected = report.rejected.len(),
        "import finished"
    );
    Ok(report)
}

// ============================================================================
// EXPORT
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRow<'a> {
    id: &'a str,
    applicant_name: &'a str,
    amount: f64,
    term_months: i64,
    interest_rate: f64,
    monthly_payment: String,
    status: &'a str,
    created_at: String,
}

impl<'a> From<&'a LoanApplication> for ExportRow<'a> {
    fn from(loan: &'a LoanApplication) -> Self {
        ExportRow {
            id: &loan.id,
            applicant_name: &loan.applicant_name,
            amount: loan.amount,
            term_months: loan.term_months,
            interest_rate: loan.interest_rate,
            monthly_payment: format!("{:.2}", loan.monthly_payment()),
            status: loan.status.as_str(),
            created_at: loan
                .created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

pub fn export_csv<S: LoanStorage>(service: &LoanService<S>, csv_path: &Path) -> Result<usize> {
    let file = File::create(csv_path)
        .with_context(|| format!("Failed to create CSV file: {:?}", csv_path))?;
    export_to_writer(service, file)
}

pub fn export_to_writer<S: LoanStorage, W: Write>(service: &LoanService<S>, writer: W) -> Result<usize> {
    let loans = service.get_all()?;
    let mut wtr = csv::Writer::from_writer(writer);

    for loan in &loans {
        wtr.serialize(ExportRow::from(loan))
            .context("Failed to write loan row")?;
    }
    wtr.flush()?;

    info!(count = loans.len(), "export finished");
    Ok(loans.len())
}
