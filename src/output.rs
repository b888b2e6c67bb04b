// Rendering and export. Numeric aggregates arrive at full precision and
// are formatted here, at display time only.
use crate::error::ReportError;
use crate::metrics::{
    CompanyPayGap, CompanyRatio, HeadcountMatrix, MedianSalary, TopEarner, TrainingSummary,
    TurnoverMetrics,
};
use crate::types::{
    CompanyKpiRow, EmployeeTable, HeadcountLongRow, MedianSalaryRow, TopEarnerRow,
    TrainingSummaryRow, TurnoverRow,
};
use crate::util::{format_date_dmy, format_decimal_comma, format_number};
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::builder::Builder;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), ReportError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Placeholder for a metric that could not be computed from the
/// available observations. Deliberately not "0".
const NOT_ENOUGH_DATA: &str = "n/a";

fn opt_cell(v: Option<f64>) -> String {
    v.map(|x| format_number(x, 2))
        .unwrap_or_else(|| NOT_ENOUGH_DATA.to_string())
}

pub fn render_turnover_rows(metrics: &[TurnoverMetrics]) -> Vec<TurnoverRow> {
    metrics
        .iter()
        .map(|m| TurnoverRow {
            company: m.company.clone(),
            start_headcount: m.start_headcount,
            end_headcount: m.end_headcount,
            average_headcount: format_number(m.average_headcount, 2),
            voluntary: m.voluntary,
            involuntary: m.involuntary,
            retirement: m.retirement,
            voluntary_rate: format_number(m.voluntary_rate, 2),
            involuntary_rate: format_number(m.involuntary_rate, 2),
            retirement_rate: format_number(m.retirement_rate, 2),
            total_rate: format_number(m.total_rate, 2),
        })
        .collect()
}

/// Merge the per-company pay gap and remuneration ratio into one table,
/// one row per company seen in either input.
pub fn render_company_kpis(gaps: &[CompanyPayGap], ratios: &[CompanyRatio]) -> Vec<CompanyKpiRow> {
    let mut merged: BTreeMap<String, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for g in gaps {
        merged.entry(g.company.clone()).or_default().0 = g.gap;
    }
    for r in ratios {
        merged.entry(r.company.clone()).or_default().1 = r.ratio;
    }
    merged
        .into_iter()
        .map(|(company, (gap, ratio))| CompanyKpiRow {
            company,
            pay_gap: opt_cell(gap),
            remuneration_ratio: opt_cell(ratio),
        })
        .collect()
}

pub fn render_top_earners(top: &[TopEarner]) -> Vec<TopEarnerRow> {
    top.iter()
        .map(|t| TopEarnerRow {
            company: t.company.clone(),
            id: t.id.clone(),
            last_name: t.last_name.clone(),
            first_name: t.first_name.clone(),
            compensation: format_number(t.amount, 2),
        })
        .collect()
}

pub fn render_median_salaries(rows: &[MedianSalary]) -> Vec<MedianSalaryRow> {
    rows.iter()
        .map(|m| MedianSalaryRow {
            company: m.company.clone(),
            median: format_number(m.median, 2),
            median_eur: format_number(m.median_eur, 2),
        })
        .collect()
}

pub fn render_training(summary: &TrainingSummary) -> Vec<TrainingSummaryRow> {
    summary
        .groups
        .iter()
        .map(|g| TrainingSummaryRow {
            group: if g.keys.is_empty() {
                "All".to_string()
            } else {
                g.keys.join(" / ")
            },
            duration: format_number(g.duration_sum, 2),
            cost: format_number(g.cost_sum, 2),
            trainees: g.trainees,
            cost_per_trainee: format_number(g.cost_per_trainee, 2),
            duration_per_trainee: format_number(g.duration_per_trainee, 2),
        })
        .collect()
}

/// Unpivot the headcount matrix: one row per (group, month).
pub fn matrix_long_rows(matrix: &HeadcountMatrix) -> Vec<HeadcountLongRow> {
    let mut out = Vec::new();
    for row in &matrix.rows {
        let group = if row.keys.is_empty() {
            "All".to_string()
        } else {
            row.keys.join(" / ")
        };
        for (month, count) in matrix.months.iter().zip(&row.counts) {
            out.push(HeadcountLongRow {
                group: group.clone(),
                month: month.clone(),
                headcount: *count,
            });
        }
    }
    out
}

/// Wide CSV of the matrix: one column per group field, then one per month.
pub fn export_matrix_csv(matrix: &HeadcountMatrix, path: &str) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header: Vec<String> = matrix
        .group_fields
        .iter()
        .map(|f| f.label().to_string())
        .collect();
    header.extend(matrix.months.iter().cloned());
    wtr.write_record(&header)?;
    for row in &matrix.rows {
        let mut rec = row.keys.clone();
        rec.extend(row.counts.iter().map(|c| c.to_string()));
        wtr.write_record(&rec)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn preview_matrix(matrix: &HeadcountMatrix, max_rows: usize) {
    if matrix.rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    let mut header: Vec<String> = matrix
        .group_fields
        .iter()
        .map(|f| f.label().to_string())
        .collect();
    header.extend(matrix.months.iter().cloned());
    builder.push_record(header);
    for row in matrix.rows.iter().take(max_rows) {
        let mut rec = row.keys.clone();
        rec.extend(row.counts.iter().map(|c| c.to_string()));
        builder.push_record(rec);
    }
    let table_str = builder.build().with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Export the normalized table as semicolon-delimited text with the
/// decimal comma restored and dates back in `DD/MM/YYYY`, so the file
/// round-trips into the source locale's tooling.
pub fn export_normalized(table: &EmployeeTable, path: &str) -> Result<(), ReportError> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_path(path)?;
    wtr.write_record([
        "EmployeeId",
        "LastName",
        "FirstName",
        "Company",
        "Gender",
        "City",
        "Division",
        "Department",
        "JobProperty",
        "Contract",
        "ContractDescription",
        "DepartureReason",
        "BirthDate",
        "HireDate",
        "DepartureDate",
        "NominalSalary",
        "GrossAnnual",
        "HireYear",
        "DepartureYear",
    ])?;

    let opt_str = |v: &Option<String>| v.clone().unwrap_or_default();
    let opt_date = |v: &Option<chrono::NaiveDate>| v.map(format_date_dmy).unwrap_or_default();
    let opt_num = |v: &Option<f64>| v.map(|n| format_decimal_comma(n, 2)).unwrap_or_default();
    let opt_year = |v: &Option<i32>| v.map(|y| y.to_string()).unwrap_or_default();

    for r in &table.records {
        wtr.write_record([
            r.id.clone(),
            r.last_name.clone(),
            r.first_name.clone(),
            r.company.clone(),
            opt_str(&r.gender),
            opt_str(&r.city),
            opt_str(&r.division),
            opt_str(&r.department),
            opt_str(&r.job_property),
            opt_str(&r.contract),
            opt_str(&r.contract_desc),
            opt_str(&r.departure_reason),
            opt_date(&r.birth_date),
            opt_date(&r.hire_date),
            opt_date(&r.departure_date),
            opt_num(&r.nominal_salary),
            opt_num(&r.gross_annual),
            opt_year(&r.hire_year),
            opt_year(&r.departure_year),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_metric_renders_as_notice_not_zero() {
        assert_eq!(opt_cell(None), "n/a");
        assert_eq!(opt_cell(Some(10.0)), "10.00");
    }

    #[test]
    fn kpi_merge_covers_union_of_companies() {
        let gaps = vec![CompanyPayGap {
            company: "A".to_string(),
            gap: Some(10.0),
        }];
        let ratios = vec![CompanyRatio {
            company: "B".to_string(),
            ratio: Some(2.5),
        }];
        let rows = render_company_kpis(&gaps, &ratios);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].company, "A");
        assert_eq!(rows[0].pay_gap, "10.00");
        assert_eq!(rows[0].remuneration_ratio, "n/a");
        assert_eq!(rows[1].remuneration_ratio, "2.50");
    }

    #[test]
    fn long_rows_unpivot_every_month() {
        use crate::metrics::{GroupField, HeadcountRow};
        let matrix = HeadcountMatrix {
            group_fields: vec![GroupField::Company],
            months: vec!["2024-01".to_string(), "2024-02".to_string()],
            rows: vec![HeadcountRow {
                keys: vec!["ACME".to_string()],
                counts: vec![5, 6],
            }],
        };
        let long = matrix_long_rows(&matrix);
        assert_eq!(long.len(), 2);
        assert_eq!(long[1].month, "2024-02");
        assert_eq!(long[1].headcount, 6);
    }
}
