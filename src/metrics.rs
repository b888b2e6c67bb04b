// The aggregation engine: pure functions over a normalized, filtered
// table. Each function returns a new aggregate; none mutate inputs.
//
// Rates are kept at full precision here. Rounding to 2 decimals happens
// only when a row is rendered for display or export, so multi-step
// derived values never accumulate rounding error.
use crate::error::ReportError;
use crate::resolve::canon;
use crate::snapshot::{
    active_in_window, active_through_window, is_active_at_boundary, is_active_in_month,
    PeriodWindow,
};
use crate::types::{EmployeeRecord, EmployeeTable, TrainingRecord};
use crate::util::{average, dec_31, median};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const MALE_LABEL: &str = "ΑΝΔΡΑΣ";
pub const FEMALE_LABEL: &str = "ΓΥΝΑΙΚΑ";

/// The voluntary-departure rule is an exact, case-sensitive label match
/// while involuntary/retirement are case-insensitive substring matches.
/// The asymmetry is preserved from the established categorization and is
/// flagged in DESIGN.md; do not unify without a product decision.
pub const VOLUNTARY_LABEL: &str = "VOLUNTARY DEPARTURE";
pub const INVOLUNTARY_NEEDLE: &str = "involuntary";
pub const RETIREMENT_NEEDLE: &str = "retirement";

pub fn reason_is_voluntary(reason: Option<&str>) -> bool {
    reason == Some(VOLUNTARY_LABEL)
}

pub fn reason_contains(reason: Option<&str>, lowercase_needle: &str) -> bool {
    reason.is_some_and(|r| r.to_lowercase().contains(lowercase_needle))
}

fn eur_rate(rates: &HashMap<String, f64>, company: &str) -> f64 {
    // Unknown companies report in EUR already: factor 1.0.
    rates.get(company).copied().unwrap_or(1.0)
}

// ---------------------------------------------------------------------------
// Monthly headcount matrix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Company,
    Division,
    Department,
}

impl GroupField {
    pub fn label(self) -> &'static str {
        match self {
            GroupField::Company => "Company",
            GroupField::Division => "Division",
            GroupField::Department => "Department",
        }
    }

    fn value(self, r: &EmployeeRecord) -> String {
        match self {
            GroupField::Company => r.company.clone(),
            // Missing division/department group under a visible placeholder
            // instead of vanishing from the table.
            GroupField::Division => r.division.clone().unwrap_or_else(|| "Blank".to_string()),
            GroupField::Department => r.department.clone().unwrap_or_else(|| "Blank".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeadcountRow {
    pub keys: Vec<String>,
    pub counts: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct HeadcountMatrix {
    pub group_fields: Vec<GroupField>,
    /// Month labels like `2024-01`, in chronological order.
    pub months: Vec<String>,
    /// Rows sorted by group key for stable output.
    pub rows: Vec<HeadcountRow>,
}

/// One count column per month of `[start_year, end_year]`, group-summed by
/// the chosen dimensions. Grouping by division/department requires those
/// canonical columns to have been resolved.
pub fn monthly_headcount_matrix(
    table: &EmployeeTable,
    start_year: i32,
    end_year: i32,
    group_by: &[GroupField],
) -> Result<HeadcountMatrix, ReportError> {
    for f in group_by {
        match f {
            GroupField::Division => table.require(canon::DIVISION)?,
            GroupField::Department => table.require(canon::DEPARTMENT)?,
            GroupField::Company => {}
        }
    }

    let mut month_starts: Vec<NaiveDate> = Vec::new();
    for year in start_year..=end_year {
        for month in 1..=12 {
            if let Some(d) = NaiveDate::from_ymd_opt(year, month, 1) {
                month_starts.push(d);
            }
        }
    }
    let months: Vec<String> = month_starts
        .iter()
        .map(|d| d.format("%Y-%m").to_string())
        .collect();

    let mut groups: BTreeMap<Vec<String>, Vec<u32>> = BTreeMap::new();
    for r in &table.records {
        let keys: Vec<String> = group_by.iter().map(|f| f.value(r)).collect();
        let counts = groups
            .entry(keys)
            .or_insert_with(|| vec![0u32; month_starts.len()]);
        for (i, start) in month_starts.iter().enumerate() {
            if is_active_in_month(r, *start) {
                counts[i] += 1;
            }
        }
    }

    Ok(HeadcountMatrix {
        group_fields: group_by.to_vec(),
        months,
        rows: groups
            .into_iter()
            .map(|(keys, counts)| HeadcountRow { keys, counts })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Turnover
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TurnoverMetrics {
    pub company: String,
    pub start_headcount: usize,
    pub end_headcount: usize,
    pub average_headcount: f64,
    pub voluntary: usize,
    pub involuntary: usize,
    pub retirement: usize,
    pub voluntary_rate: f64,
    pub involuntary_rate: f64,
    pub retirement_rate: f64,
    pub total_rate: f64,
}

fn rate(exits: usize, average: f64) -> f64 {
    if average > 0.0 {
        exits as f64 / average * 100.0
    } else {
        0.0
    }
}

/// Turnover per company for one reporting year, plus a synthetic `TOTAL`
/// row that sums the counts and recomputes the rates from the sums (never
/// an average of per-company rates).
///
/// Start-of-period headcount is taken at Dec 31 of the previous year and
/// end-of-period at Dec 31 of the reporting year, both with the boundary
/// predicate. Exit counts are taken after dropping the departures
/// exclusion set, which is independent of the active-employee one.
pub fn turnover_by_company(
    records: &[EmployeeRecord],
    year: i32,
    exclude_departures: &HashSet<String>,
) -> Vec<TurnoverMetrics> {
    let start_boundary = dec_31(year - 1);
    let end_boundary = dec_31(year);

    let mut by_company: BTreeMap<String, Vec<&EmployeeRecord>> = BTreeMap::new();
    for r in records {
        by_company.entry(r.company.clone()).or_default().push(r);
    }

    let mut rows: Vec<TurnoverMetrics> = Vec::new();
    for (company, members) in by_company {
        let start_headcount = members
            .iter()
            .filter(|r| is_active_at_boundary(r, start_boundary))
            .count();
        let end_headcount = members
            .iter()
            .filter(|r| is_active_at_boundary(r, end_boundary))
            .count();
        let average_headcount = (start_headcount + end_headcount) as f64 / 2.0;

        let departures: Vec<&&EmployeeRecord> = members
            .iter()
            .filter(|r| !exclude_departures.contains(r.id.trim()))
            .filter(|r| r.departure_year == Some(year))
            .collect();
        let voluntary = departures
            .iter()
            .filter(|r| reason_is_voluntary(r.departure_reason.as_deref()))
            .count();
        let involuntary = departures
            .iter()
            .filter(|r| reason_contains(r.departure_reason.as_deref(), INVOLUNTARY_NEEDLE))
            .count();
        let retirement = departures
            .iter()
            .filter(|r| reason_contains(r.departure_reason.as_deref(), RETIREMENT_NEEDLE))
            .count();

        let voluntary_rate = rate(voluntary, average_headcount);
        let involuntary_rate = rate(involuntary, average_headcount);
        let retirement_rate = rate(retirement, average_headcount);
        rows.push(TurnoverMetrics {
            company,
            start_headcount,
            end_headcount,
            average_headcount,
            voluntary,
            involuntary,
            retirement,
            voluntary_rate,
            involuntary_rate,
            retirement_rate,
            total_rate: voluntary_rate + involuntary_rate + retirement_rate,
        });
    }

    let total_average: f64 = rows.iter().map(|r| r.average_headcount).sum();
    let total = TurnoverMetrics {
        company: "TOTAL".to_string(),
        start_headcount: rows.iter().map(|r| r.start_headcount).sum(),
        end_headcount: rows.iter().map(|r| r.end_headcount).sum(),
        average_headcount: total_average,
        voluntary: rows.iter().map(|r| r.voluntary).sum(),
        involuntary: rows.iter().map(|r| r.involuntary).sum(),
        retirement: rows.iter().map(|r| r.retirement).sum(),
        voluntary_rate: rate(rows.iter().map(|r| r.voluntary).sum(), total_average),
        involuntary_rate: rate(rows.iter().map(|r| r.involuntary).sum(), total_average),
        retirement_rate: rate(rows.iter().map(|r| r.retirement).sum(), total_average),
        total_rate: rate(
            rows.iter()
                .map(|r| r.voluntary + r.involuntary + r.retirement)
                .sum(),
            total_average,
        ),
    };
    rows.push(total);
    rows
}

// ---------------------------------------------------------------------------
// Gender pay gap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CompanyPayGap {
    pub company: String,
    pub gap: Option<f64>,
}

fn pay_gap_of<'a, I>(records: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a EmployeeRecord>,
{
    let mut male: Vec<f64> = Vec::new();
    let mut female: Vec<f64> = Vec::new();
    for r in records {
        // Null and non-positive salaries never enter the means.
        let Some(salary) = r.nominal_salary.filter(|s| *s > 0.0) else {
            continue;
        };
        match r.gender.as_deref() {
            Some(MALE_LABEL) => male.push(salary),
            Some(FEMALE_LABEL) => female.push(salary),
            _ => {}
        }
    }
    if male.is_empty() || female.is_empty() {
        return None;
    }
    let male_mean = average(&male);
    let female_mean = average(&female);
    Some((male_mean - female_mean) / male_mean * 100.0)
}

/// Mean-salary gender pay gap over the window-active population of the
/// year, all companies combined. `None` means one of the gender groups is
/// empty — reported as "not enough data", never as zero.
pub fn overall_gender_pay_gap(
    table: &EmployeeTable,
    year: i32,
) -> Result<Option<f64>, ReportError> {
    table.require(canon::GENDER)?;
    let active = active_in_window(&table.records, PeriodWindow::calendar_year(year));
    Ok(pay_gap_of(active.iter()))
}

pub fn gender_pay_gap_by_company(
    table: &EmployeeTable,
    year: i32,
) -> Result<Vec<CompanyPayGap>, ReportError> {
    table.require(canon::GENDER)?;
    let active = active_in_window(&table.records, PeriodWindow::calendar_year(year));
    let mut by_company: BTreeMap<String, Vec<&EmployeeRecord>> = BTreeMap::new();
    for r in &active {
        by_company.entry(r.company.clone()).or_default().push(r);
    }
    Ok(by_company
        .into_iter()
        .map(|(company, members)| CompanyPayGap {
            company,
            gap: pay_gap_of(members.into_iter()),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Annual remuneration ratio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CompanyRatio {
    pub company: String,
    pub ratio: Option<f64>,
}

/// max / median-of-the-rest over a set of converted annual remunerations.
/// Exactly one instance of the maximum is removed; `None` if fewer than 2
/// values or the remainder's median is not positive.
pub fn remuneration_ratio(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let (max_idx, max) = values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))?;
    let rest: Vec<f64> = values
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != max_idx)
        .map(|(_, v)| *v)
        .collect();
    let med = median(rest);
    if med > 0.0 {
        Some(*max / med)
    } else {
        None
    }
}

/// Population: active through the whole year (boundary-active at both
/// ends) — stricter than the pay-gap window on purpose.
pub fn overall_remuneration_ratio(
    records: &[EmployeeRecord],
    year: i32,
    rates: &HashMap<String, f64>,
) -> Option<f64> {
    let through = active_through_window(records, PeriodWindow::calendar_year(year));
    let values: Vec<f64> = through
        .iter()
        .filter_map(|r| r.gross_annual.map(|g| g * eur_rate(rates, &r.company)))
        .collect();
    remuneration_ratio(&values)
}

pub fn remuneration_ratio_by_company(
    records: &[EmployeeRecord],
    year: i32,
    rates: &HashMap<String, f64>,
) -> Vec<CompanyRatio> {
    let through = active_through_window(records, PeriodWindow::calendar_year(year));
    let mut by_company: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in &through {
        if let Some(g) = r.gross_annual {
            by_company
                .entry(r.company.clone())
                .or_default()
                .push(g * eur_rate(rates, &r.company));
        }
    }
    by_company
        .into_iter()
        .map(|(company, values)| CompanyRatio {
            ratio: remuneration_ratio(&values),
            company,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Top-decile compensation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum CompensationField {
    NominalSalary,
    GrossAnnual,
}

impl CompensationField {
    fn of(self, r: &EmployeeRecord) -> Option<f64> {
        match self {
            CompensationField::NominalSalary => r.nominal_salary,
            CompensationField::GrossAnnual => r.gross_annual,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TopEarner {
    pub company: String,
    pub id: String,
    pub last_name: String,
    pub first_name: String,
    pub amount: f64,
}

/// Per company: the top `ceil(10%)` of rows (at least 1) ranked by the
/// chosen compensation field, descending. The caller picks the population
/// (the standard report feeds in the boundary-active set for the year).
pub fn top_decile_by_company(
    records: &[EmployeeRecord],
    field: CompensationField,
) -> Vec<TopEarner> {
    let mut by_company: BTreeMap<String, Vec<&EmployeeRecord>> = BTreeMap::new();
    for r in records {
        by_company.entry(r.company.clone()).or_default().push(r);
    }

    let mut out: Vec<TopEarner> = Vec::new();
    for (company, members) in by_company {
        let take = ((members.len() as f64 * 0.1).ceil() as usize).max(1);
        let mut ranked: Vec<(&EmployeeRecord, f64)> = members
            .iter()
            .filter_map(|r| field.of(r).map(|a| (*r, a)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        for (r, amount) in ranked.into_iter().take(take) {
            out.push(TopEarner {
                company: company.clone(),
                id: r.id.clone(),
                last_name: r.last_name.clone(),
                first_name: r.first_name.clone(),
                amount,
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Median salary by company (excluding the single top earner)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MedianSalary {
    pub company: String,
    pub median: f64,
    pub median_eur: f64,
}

/// Per company over the survivors of the year (departure null or after
/// the year): drop the single highest gross-annual value, median of the
/// rest, plus the EUR conversion. Sorted descending by the EUR value.
/// Companies with fewer than 2 valid values are omitted.
pub fn median_salary_by_company(
    records: &[EmployeeRecord],
    year: i32,
    rates: &HashMap<String, f64>,
) -> Vec<MedianSalary> {
    let mut by_company: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in records {
        let survives = match r.departure_year {
            None => true,
            Some(y) => y > year,
        };
        if !survives {
            continue;
        }
        if let Some(g) = r.gross_annual {
            by_company.entry(r.company.clone()).or_default().push(g);
        }
    }

    let mut rows: Vec<MedianSalary> = by_company
        .into_iter()
        .filter(|(_, values)| values.len() >= 2)
        .map(|(company, mut values)| {
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            values.pop(); // single max out
            let med = median(values);
            let med_eur = med * eur_rate(rates, &company);
            MedianSalary {
                company,
                median: med,
                median_eur: med_eur,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.median_eur
            .partial_cmp(&a.median_eur)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

// ---------------------------------------------------------------------------
// Training aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingDim {
    Country,
    Company,
    Year,
    Division,
    Department,
    JobProperty,
    Gender,
    Status,
}

impl TrainingDim {
    pub fn label(self) -> &'static str {
        match self {
            TrainingDim::Country => "Country",
            TrainingDim::Company => "Company",
            TrainingDim::Year => "Year",
            TrainingDim::Division => "Division",
            TrainingDim::Department => "Department",
            TrainingDim::JobProperty => "Job Property",
            TrainingDim::Gender => "Gender",
            TrainingDim::Status => "Status",
        }
    }

    fn value(self, r: &TrainingRecord) -> String {
        match self {
            TrainingDim::Country => r.country.clone(),
            TrainingDim::Company => r.company.clone(),
            TrainingDim::Year => r.year.clone(),
            TrainingDim::Division => r.division.clone(),
            TrainingDim::Department => r.department.clone(),
            TrainingDim::JobProperty => r.job_property.clone(),
            TrainingDim::Gender => r.gender.clone(),
            TrainingDim::Status => r.status.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingGroup {
    pub keys: Vec<String>,
    pub duration_sum: f64,
    pub cost_sum: f64,
    pub trainees: usize,
    pub cost_per_trainee: f64,
    pub duration_per_trainee: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingTotals {
    pub duration_sum: f64,
    pub cost_sum: f64,
    pub trainees: usize,
    pub cost_per_trainee: f64,
    pub duration_per_trainee: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub dims: Vec<TrainingDim>,
    pub groups: Vec<TrainingGroup>,
    pub totals: TrainingTotals,
}

/// Group training rows by any subset of the categorical dimensions (an
/// empty subset aggregates everything into one group). Duration and cost
/// are summed with nulls skipped; trainees are counted as distinct ids.
///
/// With a cutoff, only rows whose completion date is strictly before it
/// are considered; rows without a completion date are dropped by that
/// filter.
///
/// The grand totals sum the grouped table's columns, including the
/// per-group distinct-trainee counts — a trainee appearing in two groups
/// counts in both.
pub fn training_summary(
    records: &[TrainingRecord],
    dims: &[TrainingDim],
    completed_before: Option<NaiveDate>,
) -> TrainingSummary {
    #[derive(Default)]
    struct Acc {
        duration: f64,
        cost: f64,
        trainee_ids: HashSet<String>,
    }

    let mut map: BTreeMap<Vec<String>, Acc> = BTreeMap::new();
    for r in records {
        if let Some(cutoff) = completed_before {
            match r.completion_date {
                Some(d) if d < cutoff => {}
                _ => continue,
            }
        }
        let keys: Vec<String> = dims.iter().map(|d| d.value(r)).collect();
        let acc = map.entry(keys).or_default();
        acc.duration += r.duration_hours.unwrap_or(0.0);
        acc.cost += r.cost.unwrap_or(0.0);
        acc.trainee_ids.insert(r.trainee_id.trim().to_string());
    }

    let groups: Vec<TrainingGroup> = map
        .into_iter()
        .map(|(keys, acc)| {
            let trainees = acc.trainee_ids.len();
            let per = |sum: f64| if trainees > 0 { sum / trainees as f64 } else { 0.0 };
            TrainingGroup {
                keys,
                duration_sum: acc.duration,
                cost_sum: acc.cost,
                trainees,
                cost_per_trainee: per(acc.cost),
                duration_per_trainee: per(acc.duration),
            }
        })
        .collect();

    let duration_sum: f64 = groups.iter().map(|g| g.duration_sum).sum();
    let cost_sum: f64 = groups.iter().map(|g| g.cost_sum).sum();
    let trainees: usize = groups.iter().map(|g| g.trainees).sum();
    let per = |sum: f64| if trainees > 0 { sum / trainees as f64 } else { 0.0 };
    TrainingSummary {
        dims: dims.to_vec(),
        groups,
        totals: TrainingTotals {
            duration_sum,
            cost_sum,
            trainees,
            cost_per_trainee: per(cost_sum),
            duration_per_trainee: per(duration_sum),
        },
    }
}
