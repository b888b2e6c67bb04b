// User-adjustable report parameters. Everything a page-level control used
// to hold lives here as plain configuration: the reporting year, the
// matrix year range, exclusion lists, exchange rates and category
// filters. Reports read these values; nothing here touches the data.
use crate::metrics::{GroupField, TrainingDim};
use crate::types::EmployeeRecord;
use chrono::{Datelike, NaiveDate};
use std::collections::{HashMap, HashSet};

/// Default conversion factors to EUR for the companies that report in a
/// local currency. User-editable; any company not listed converts at 1.0.
pub fn default_exchange_rates() -> HashMap<String, f64> {
    [
        ("ALUMIL YU INDUSTRY SA", 0.008546),
        ("ALUMIL ALBANIA Sh.P.K", 0.01023),
        ("ALUMIL ROM INDUSTRY SA", 0.2010),
        ("ALUMIL MISR FOR TRADING S.A.E.", 0.019),
        ("ALPRO VLASENICA A.D.", 0.5142),
        ("ALUMIL MIDDLE EAST JLT", 0.25),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Age bucket against a reference date. Records without a birth date get
/// `None` and never match an age-bucket filter.
pub fn age_bucket(birth: Option<NaiveDate>, reference: NaiveDate) -> Option<&'static str> {
    let birth = birth?;
    let age = reference.years_since(birth)?;
    Some(if age < 30 {
        "<30"
    } else if age <= 50 {
        "30-50"
    } else {
        ">50"
    })
}

/// Category filters: an empty list means "include all" for that
/// dimension, mirroring an unselected multiselect.
#[derive(Debug, Clone, Default)]
pub struct CategoryFilters {
    pub company: Vec<String>,
    pub city: Vec<String>,
    pub division: Vec<String>,
    pub department: Vec<String>,
    pub gender: Vec<String>,
    pub contract: Vec<String>,
    pub job_property: Vec<String>,
    pub age_bucket: Vec<String>,
    pub departure_reason: Vec<String>,
}

fn keep(selected: &[String], value: Option<&str>) -> bool {
    if selected.is_empty() {
        return true;
    }
    value.is_some_and(|v| selected.iter().any(|s| s == v))
}

impl CategoryFilters {
    pub fn is_empty(&self) -> bool {
        self.company.is_empty()
            && self.city.is_empty()
            && self.division.is_empty()
            && self.department.is_empty()
            && self.gender.is_empty()
            && self.contract.is_empty()
            && self.job_property.is_empty()
            && self.age_bucket.is_empty()
            && self.departure_reason.is_empty()
    }

    /// Apply every non-empty dimension; returns a new subset.
    pub fn apply(
        &self,
        records: &[EmployeeRecord],
        reference_date: NaiveDate,
    ) -> Vec<EmployeeRecord> {
        records
            .iter()
            .filter(|r| keep(&self.company, Some(r.company.as_str())))
            .filter(|r| keep(&self.city, r.city.as_deref()))
            .filter(|r| keep(&self.division, r.division.as_deref()))
            .filter(|r| keep(&self.department, r.department.as_deref()))
            .filter(|r| keep(&self.gender, r.gender.as_deref()))
            .filter(|r| keep(&self.contract, r.contract.as_deref()))
            .filter(|r| keep(&self.job_property, r.job_property.as_deref()))
            .filter(|r| keep(&self.age_bucket, age_bucket(r.birth_date, reference_date)))
            .filter(|r| keep(&self.departure_reason, r.departure_reason.as_deref()))
            .cloned()
            .collect()
    }
}

/// The full parameter set for a reporting session.
#[derive(Debug, Clone)]
pub struct ReportParams {
    /// Year for turnover, pay gap and remuneration metrics.
    pub year: i32,
    /// Inclusive year range for the monthly headcount matrix.
    pub range: (i32, i32),
    /// Reference date for age bucketing.
    pub reference_date: NaiveDate,
    /// Exclusion list applied to active-employee views.
    pub exclude_active: HashSet<String>,
    /// Independent exclusion list applied to departure counting.
    pub exclude_departures: HashSet<String>,
    pub exchange_rates: HashMap<String, f64>,
    pub filters: CategoryFilters,
    pub headcount_group_by: Vec<GroupField>,
    pub training_group_by: Vec<TrainingDim>,
    /// Optional "completed strictly before" cutoff for training views.
    pub training_cutoff: Option<NaiveDate>,
}

impl Default for ReportParams {
    fn default() -> Self {
        let today = chrono::Local::now().date_naive();
        let year = today.year();
        ReportParams {
            year,
            range: (year, year + 1),
            reference_date: crate::util::dec_31(year),
            exclude_active: HashSet::new(),
            exclude_departures: HashSet::new(),
            exchange_rates: default_exchange_rates(),
            filters: CategoryFilters::default(),
            headcount_group_by: vec![GroupField::Company],
            training_group_by: vec![TrainingDim::Company],
            training_cutoff: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_company_converts_at_parity() {
        let rates = default_exchange_rates();
        assert!(rates.get("NOT A COMPANY").is_none());
        assert_eq!(rates.len(), 6);
        assert_eq!(rates["ALUMIL ROM INDUSTRY SA"], 0.2010);
    }

    #[test]
    fn age_buckets_at_the_edges() {
        let reference = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let b = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
        assert_eq!(age_bucket(b(1995, 1, 1), reference), Some("<30"));
        assert_eq!(age_bucket(b(1994, 12, 31), reference), Some("30-50"));
        assert_eq!(age_bucket(b(1974, 12, 31), reference), Some("30-50"));
        assert_eq!(age_bucket(b(1974, 1, 1), reference), Some("30-50"));
        assert_eq!(age_bucket(b(1973, 12, 31), reference), Some(">50"));
        assert_eq!(age_bucket(None, reference), None);
    }

    #[test]
    fn empty_filters_keep_everything() {
        let f = CategoryFilters::default();
        assert!(f.is_empty());
        assert!(keep(&f.gender, None));
    }

    #[test]
    fn filters_match_selected_values_only() {
        let selected = vec!["Sales".to_string()];
        assert!(keep(&selected, Some("Sales")));
        assert!(!keep(&selected, Some("Production")));
        // A record with no value never matches a non-empty filter.
        assert!(!keep(&selected, None));
    }
}
