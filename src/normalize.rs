// Type normalization: convert resolved raw columns into typed employee
// records with deterministic coercion rules.
//
// This is the only place `EmployeeRecord`s are built, which is what makes
// the day-rate annualization safe: the ×26 multiply only ever sees raw
// text cells, so it cannot be applied to an already-annualized value.
use crate::error::ReportError;
use crate::loader::LoadReport;
use crate::resolve::{canon, RawTable};
use crate::types::EmployeeRecord;
use crate::util::{parse_date_dmy, parse_decimal_comma};
use chrono::Datelike;

/// Contract descriptions whose nominal figure is a daily rate. These get
/// multiplied by 26 to a monthly-equivalent basis, exactly once per load.
pub const DAY_RATE_CONTRACTS: &[&str] = &["ΑΛΜ - ΗΜΕΡΟΜΙΣΘΙΟΙ"];

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Build typed records from a resolved raw table.
///
/// Unparsable date and number cells become `None` and are tallied in the
/// report; they never abort the load. A required literal column that is
/// missing from the file aborts with [`ReportError::MissingColumn`] —
/// fabricating a column of nulls would let downstream metrics produce
/// all-null results that look like answers.
pub fn build_records(table: &RawTable) -> Result<(Vec<EmployeeRecord>, LoadReport), ReportError> {
    let id_col = table.column(canon::EMPLOYEE_ID)?;
    let company_col = table.column(canon::COMPANY)?;
    let birth_col = table.column(canon::BIRTH_DATE)?;
    let hire_col = table.column(canon::HIRE_DATE)?;
    let departure_col = table.column(canon::DEPARTURE_DATE)?;
    let salary_col = table.column(canon::NOMINAL_SALARY)?;
    let gross_col = table.column(canon::GROSS_ANNUAL)?;
    let contract_desc_col = table.column(canon::CONTRACT_DESC)?;
    let reason_col = table.column(canon::DEPARTURE_REASON)?;

    // Name and resolver-derived columns are optional; absent means every
    // record carries `None` (or empty) for that field, and metrics that
    // require the canonical column check `EmployeeTable::resolved`.
    let last_name_col = table.find_column(canon::LAST_NAME);
    let first_name_col = table.find_column(canon::FIRST_NAME);
    let gender_col = table.find_column(canon::GENDER);
    let city_col = table.find_column(canon::CITY);
    let division_col = table.find_column(canon::DIVISION);
    let department_col = table.find_column(canon::DEPARTMENT);
    let job_property_col = table.find_column(canon::JOB_PROPERTY);
    let contract_col = table.find_column(canon::CONTRACT);

    let mut nulled_cells = 0usize;
    let mut annualized = 0usize;
    let mut records = Vec::with_capacity(table.rows.len());

    for row in 0..table.rows.len() {
        let raw = |col: usize| table.cell(row, col);
        let opt = |col: Option<usize>| col.and_then(|c| non_empty(table.cell(row, c)));

        let mut date_cell = |col: usize| {
            let s = raw(col);
            let parsed = parse_date_dmy(Some(s));
            if parsed.is_none() && !s.trim().is_empty() {
                nulled_cells += 1;
            }
            parsed
        };
        let birth_date = date_cell(birth_col);
        let hire_date = date_cell(hire_col);
        let departure_date = date_cell(departure_col);

        let mut decimal_cell = |col: usize| {
            let s = raw(col);
            let parsed = parse_decimal_comma(Some(s));
            if parsed.is_none() && !s.trim().is_empty() {
                nulled_cells += 1;
            }
            parsed
        };
        let mut nominal_salary = decimal_cell(salary_col);
        let gross_annual = decimal_cell(gross_col);

        let contract_desc = non_empty(raw(contract_desc_col));

        // Day-rate annualization, applied here and nowhere else.
        if let (Some(desc), Some(salary)) = (contract_desc.as_deref(), nominal_salary) {
            if DAY_RATE_CONTRACTS.contains(&desc) {
                nominal_salary = Some(salary * 26.0);
                annualized += 1;
            }
        }

        let name = |col: Option<usize>| {
            col.map(|c| table.cell(row, c).trim().to_string())
                .unwrap_or_default()
        };

        records.push(EmployeeRecord {
            id: raw(id_col).trim().to_string(),
            last_name: name(last_name_col),
            first_name: name(first_name_col),
            company: raw(company_col).trim().to_string(),
            gender: opt(gender_col),
            city: opt(city_col),
            division: opt(division_col),
            department: opt(department_col),
            job_property: opt(job_property_col),
            contract: opt(contract_col),
            contract_desc,
            departure_reason: non_empty(raw(reason_col)),
            birth_date,
            hire_date,
            departure_date,
            nominal_salary,
            gross_annual,
            hire_year: hire_date.map(|d| d.year()),
            departure_year: departure_date.map(|d| d.year()),
        });
    }

    let rows = records.len();
    Ok((
        records,
        LoadReport {
            rows,
            nulled_cells,
            annualized,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base_headers() -> Vec<String> {
        vec![
            canon::EMPLOYEE_ID.to_string(),
            canon::COMPANY.to_string(),
            canon::BIRTH_DATE.to_string(),
            canon::HIRE_DATE.to_string(),
            canon::DEPARTURE_DATE.to_string(),
            canon::NOMINAL_SALARY.to_string(),
            canon::GROSS_ANNUAL.to_string(),
            canon::CONTRACT_DESC.to_string(),
            canon::DEPARTURE_REASON.to_string(),
        ]
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn comma_decimal_and_dmy_dates() {
        let table = RawTable {
            headers: base_headers(),
            rows: vec![row(&[
                " 1015 ",
                "ACME",
                "01/02/1990",
                "15/06/2023",
                "",
                "1234,56",
                "20000,00",
                "FULL TIME",
                "",
            ])],
        };
        let (records, report) = build_records(&table).unwrap();
        let r = &records[0];
        assert_eq!(r.id, "1015");
        assert_eq!(r.nominal_salary, Some(1234.56));
        assert_eq!(r.hire_date, NaiveDate::from_ymd_opt(2023, 6, 15));
        assert_eq!(r.hire_year, Some(2023));
        assert_eq!(r.departure_date, None);
        assert_eq!(r.departure_year, None);
        assert_eq!(report.nulled_cells, 0);
        assert_eq!(report.annualized, 0);
    }

    #[test]
    fn day_rate_annualized_exactly_once() {
        let table = RawTable {
            headers: base_headers(),
            rows: vec![row(&[
                "1",
                "ACME",
                "",
                "01/01/2020",
                "",
                "100,0",
                "",
                "ΑΛΜ - ΗΜΕΡΟΜΙΣΘΙΟΙ",
                "",
            ])],
        };
        // One full pipeline pass: salary must be raw × 26, not × 676.
        let (records, report) = build_records(&table).unwrap();
        assert_eq!(records[0].nominal_salary, Some(2600.0));
        assert_eq!(report.annualized, 1);
    }

    #[test]
    fn unparsable_cells_become_null_and_are_counted() {
        let table = RawTable {
            headers: base_headers(),
            rows: vec![row(&[
                "2",
                "ACME",
                "bad-date",
                "01/01/2020",
                "",
                "abc",
                "",
                "FULL TIME",
                "",
            ])],
        };
        let (records, report) = build_records(&table).unwrap();
        assert_eq!(records[0].birth_date, None);
        assert_eq!(records[0].nominal_salary, None);
        assert_eq!(report.nulled_cells, 2);
    }

    #[test]
    fn missing_required_column_fails_loudly() {
        let mut headers = base_headers();
        headers.retain(|h| h != canon::NOMINAL_SALARY);
        let table = RawTable {
            headers,
            rows: vec![],
        };
        let err = build_records(&table).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { .. }));
    }

    #[test]
    fn end_to_end_sample_with_null_and_day_rate() {
        // Five rows: one unparsable salary, one day-rate of raw 100.
        let mut rows = vec![
            row(&["1", "A", "", "01/01/2020", "", "1000,0", "", "FT", ""]),
            row(&["2", "A", "", "01/01/2020", "", "xx", "", "FT", ""]),
            row(&["3", "A", "", "01/01/2020", "", "1500,0", "", "FT", ""]),
            row(&["4", "A", "", "01/01/2020", "", "2000,0", "", "FT", ""]),
        ];
        rows.push(row(&[
            "5",
            "A",
            "",
            "01/01/2020",
            "",
            "100,0",
            "",
            "ΑΛΜ - ΗΜΕΡΟΜΙΣΘΙΟΙ",
            "",
        ]));
        let table = RawTable {
            headers: base_headers(),
            rows,
        };
        let (records, report) = build_records(&table).unwrap();
        let salaries: Vec<f64> = records.iter().filter_map(|r| r.nominal_salary).collect();
        // Null excluded from the sum; day-rate row annualized to 2600.
        assert_eq!(salaries.len(), 4);
        assert_eq!(salaries.iter().sum::<f64>(), 1000.0 + 1500.0 + 2000.0 + 2600.0);
        assert_eq!(report.nulled_cells, 1);
    }
}
