// 💵 Loan Application - The single persisted record
// Identity (id, created_at) is fixed at creation; only `status` ever changes.

use crate::error::ValidationError;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest amount the auto-decision rule approves (inclusive)
pub const AUTO_APPROVE_MAX_AMOUNT: f64 = 100_000.0;

/// Longest term the auto-decision rule approves (inclusive)
pub const AUTO_APPROVE_MAX_TERM_MONTHS: i64 = 60;

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a status update; there is no way back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for LoanStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => LoanStatus::Approved,
            Decision::Rejected => LoanStatus::Rejected,
        }
    }
}

// ============================================================================
// INPUT
// ============================================================================

/// Unvalidated input for a new loan application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoanApplication {
    pub applicant_name: String,
    pub amount: f64,
    pub term_months: i64,
    pub interest_rate: f64,
}

impl NewLoanApplication {
    pub fn new(applicant_name: &str, amount: f64, term_months: i64, interest_rate: f64) -> Self {
        NewLoanApplication {
            applicant_name: applicant_name.to_string(),
            amount,
            term_months,
            interest_rate,
        }
    }

    /// Run the four checks in order; the first failure wins.
    ///
    /// NaN and infinity fail the amount and interest rate checks; they
    /// cannot be stored as JSON numbers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.applicant_name.trim().is_empty() {
            return Err(ValidationError::new("Applicant name is required"));
        }

        if !(self.amount > 0.0 && self.amount.is_finite()) {
            return Err(ValidationError::new("Amount must be greater than 0"));
        }

        if self.term_months <= 0 {
            return Err(ValidationError::new("Term months must be greater than 0"));
        }

        if !(self.interest_rate >= 0.0 && self.interest_rate.is_finite()) {
            return Err(ValidationError::new("Interest rate cannot be negative"));
        }

        Ok(())
    }
}

// ============================================================================
// LOAN APPLICATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    /// Stable identity (UUID v4)
    pub id: String,

    pub applicant_name: String,
    pub amount: f64,
    pub term_months: i64,
    pub interest_rate: f64,
    pub status: LoanStatus,

    /// Capture time, millisecond precision
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

impl LoanApplication {
    /// Build a pending record from input that already passed `validate`
    pub(crate) fn from_input(input: NewLoanApplication) -> Self {
        LoanApplication {
            id: uuid::Uuid::new_v4().to_string(),
            applicant_name: input.applicant_name.trim().to_string(),
            amount: input.amount,
            term_months: input.term_months,
            interest_rate: input.interest_rate,
            status: LoanStatus::Pending,
            created_at: Utc::now().trunc_subsecs(3),
        }
    }

    pub fn monthly_payment(&self) -> f64 {
        monthly_payment(self)
    }
}

// ============================================================================
// RULES
// ============================================================================

/// Flat-interest monthly payment: `amount * (1 + rate) / term`.
///
/// No rounding and no guard on `term_months`; a zero term yields an
/// infinite (or NaN) result. Only call this on validated records.
pub fn monthly_payment(loan: &LoanApplication) -> f64 {
    let total = loan.amount * (1.0 + loan.interest_rate);
    total / loan.term_months as f64
}

/// Auto-decision rule: approve when both bounds hold, reject otherwise.
pub fn decide(loan: &LoanApplication) -> Decision {
    if loan.amount <= AUTO_APPROVE_MAX_AMOUNT && loan.term_months <= AUTO_APPROVE_MAX_TERM_MONTHS {
        Decision::Approved
    } else {
        Decision::Rejected
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Aggregate statistics for the summary view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoanSummary {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total_requested: f64,
    pub total_approved: f64,
}

impl LoanSummary {
    pub fn from_loans(loans: &[LoanApplication]) -> Self {
        let mut summary = LoanSummary::default();

        for loan in loans {
            summary.total += 1;
            summary.total_requested += loan.amount;

            match loan.status {
                LoanStatus::Pending => summary.pending += 1,
                LoanStatus::Approved => {
                    summary.approved += 1;
                    summary.total_approved += loan.amount;
                }
                LoanStatus::Rejected => summary.rejected += 1,
            }
        }

        summary
    }
}

/// ISO-8601 with milliseconds and `Z`, e.g. `2026-10-16T09:30:00.123Z`
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
