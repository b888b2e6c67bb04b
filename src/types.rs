use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

/// One employee row after column resolution and type normalization.
///
/// Identifiers are kept as trimmed strings regardless of how the source
/// file typed them; exclusion-set membership is always string-based.
/// A `None` departure date means "still active as of the upload".
#[derive(Debug, Clone)]
pub struct EmployeeRecord {
    pub id: String,
    pub last_name: String,
    pub first_name: String,
    pub company: String,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub division: Option<String>,
    pub department: Option<String>,
    pub job_property: Option<String>,
    pub contract: Option<String>,
    pub contract_desc: Option<String>,
    pub departure_reason: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub hire_date: Option<NaiveDate>,
    pub departure_date: Option<NaiveDate>,
    /// Monthly-equivalent nominal salary. Day-rate contracts are already
    /// annualized here; `None` means the raw cell did not parse.
    pub nominal_salary: Option<f64>,
    /// Gross annual remuneration in the company's local currency.
    pub gross_annual: Option<f64>,
    pub hire_year: Option<i32>,
    pub departure_year: Option<i32>,
}

/// The normalized employee table plus the set of canonical columns that
/// were actually resolved from the upload. Metrics that depend on a
/// resolver-derived column check membership here and fail loudly instead
/// of aggregating over a column of fabricated nulls.
#[derive(Debug, Clone)]
pub struct EmployeeTable {
    pub records: Vec<EmployeeRecord>,
    pub resolved: Vec<&'static str>,
}

impl EmployeeTable {
    pub fn require(&self, canonical: &'static str) -> Result<(), crate::error::ReportError> {
        if self.resolved.contains(&canonical) {
            Ok(())
        } else {
            Err(crate::error::ReportError::missing_column(canonical))
        }
    }

    /// Same resolved-column set over a filtered subset of the records.
    pub fn with_records(&self, records: Vec<EmployeeRecord>) -> EmployeeTable {
        EmployeeTable {
            records,
            resolved: self.resolved.clone(),
        }
    }
}

/// One training-plan row from the L&D workbook.
#[derive(Debug, Clone)]
pub struct TrainingRecord {
    pub country: String,
    pub company: String,
    pub year: String,
    pub division: String,
    pub department: String,
    pub job_property: String,
    pub gender: String,
    pub status: String,
    pub duration_hours: Option<f64>,
    pub cost: Option<f64>,
    pub trainee_id: String,
    pub completion_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TurnoverRow {
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "StartHeadcount")]
    #[tabled(rename = "StartHeadcount")]
    pub start_headcount: usize,
    #[serde(rename = "EndHeadcount")]
    #[tabled(rename = "EndHeadcount")]
    pub end_headcount: usize,
    #[serde(rename = "AvgEmployees")]
    #[tabled(rename = "AvgEmployees")]
    pub average_headcount: String,
    #[serde(rename = "Voluntary")]
    #[tabled(rename = "Voluntary")]
    pub voluntary: usize,
    #[serde(rename = "Involuntary")]
    #[tabled(rename = "Involuntary")]
    pub involuntary: usize,
    #[serde(rename = "Retirement")]
    #[tabled(rename = "Retirement")]
    pub retirement: usize,
    #[serde(rename = "VoluntaryPct")]
    #[tabled(rename = "VoluntaryPct")]
    pub voluntary_rate: String,
    #[serde(rename = "InvoluntaryPct")]
    #[tabled(rename = "InvoluntaryPct")]
    pub involuntary_rate: String,
    #[serde(rename = "RetirementPct")]
    #[tabled(rename = "RetirementPct")]
    pub retirement_rate: String,
    #[serde(rename = "TotalPct")]
    #[tabled(rename = "TotalPct")]
    pub total_rate: String,
}

/// Pay gap and remuneration ratio side by side, one row per company.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CompanyKpiRow {
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "GenderPayGapPct")]
    #[tabled(rename = "GenderPayGapPct")]
    pub pay_gap: String,
    #[serde(rename = "RemunerationRatio")]
    #[tabled(rename = "RemunerationRatio")]
    pub remuneration_ratio: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopEarnerRow {
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "EmployeeId")]
    #[tabled(rename = "EmployeeId")]
    pub id: String,
    #[serde(rename = "LastName")]
    #[tabled(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "FirstName")]
    #[tabled(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "Compensation")]
    #[tabled(rename = "Compensation")]
    pub compensation: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MedianSalaryRow {
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "MedianExclMax")]
    #[tabled(rename = "MedianExclMax")]
    pub median: String,
    #[serde(rename = "MedianExclMaxEur")]
    #[tabled(rename = "MedianExclMaxEur")]
    pub median_eur: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrainingSummaryRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "DurationHours")]
    #[tabled(rename = "DurationHours")]
    pub duration: String,
    #[serde(rename = "CostEur")]
    #[tabled(rename = "CostEur")]
    pub cost: String,
    #[serde(rename = "UniqueTrainees")]
    #[tabled(rename = "UniqueTrainees")]
    pub trainees: usize,
    #[serde(rename = "CostPerTrainee")]
    #[tabled(rename = "CostPerTrainee")]
    pub cost_per_trainee: String,
    #[serde(rename = "HoursPerTrainee")]
    #[tabled(rename = "HoursPerTrainee")]
    pub duration_per_trainee: String,
}

/// Long-format (unpivoted) headcount: one row per (group, month).
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct HeadcountLongRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Headcount")]
    #[tabled(rename = "Headcount")]
    pub headcount: u32,
}

/// Top-level figures written to `summary.json` after a report run.
/// `None` serializes as `null` so a missing metric is never mistaken
/// for a zero.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub reporting_year: i32,
    pub end_of_year_headcount: usize,
    pub gender_pay_gap_pct: Option<f64>,
    pub annual_remuneration_ratio: Option<f64>,
    pub total_turnover_pct: Option<f64>,
}
