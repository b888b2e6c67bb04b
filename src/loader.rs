// File ingestion. This module is the single entry point for building an
// `EmployeeTable`, which is what guarantees the day-rate annualization in
// `normalize` runs exactly once per upload: there is no other path from
// raw bytes to typed records.
use crate::error::ReportError;
use crate::normalize;
use crate::resolve::{self, canon, RawTable};
use crate::types::{EmployeeTable, TrainingRecord};
use crate::util::{parse_date_dmy, parse_decimal_comma};
use calamine::{Data, Reader, Xlsx};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub rows: usize,
    /// Non-empty cells that failed date/number parsing and became null.
    pub nulled_cells: usize,
    /// Rows whose nominal salary was annualized from a day rate.
    pub annualized: usize,
}

/// Columns the training workbook must carry. Checked up front so the
/// error can name every missing column at once.
pub const TRAINING_REQUIRED: &[&str] = &[
    "Country",
    "Company",
    "Year",
    "Division",
    "Department",
    "Job Property",
    "Status",
    "Duration in Hours",
    "Cost (€)",
    "Trainee ID",
];

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, ReportError> {
    Ok(std::fs::read(path)?)
}

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

/// Decode delimited-text bytes: the source exports are ISO-8859-7, with a
/// UTF-8 fallback when the byte stream contains codes undefined in that
/// encoding. Returns the text and the encoding name used.
pub fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    let (decoded, _, had_errors) = encoding_rs::ISO_8859_7.decode(bytes);
    if !had_errors {
        return (decoded.into_owned(), "ISO-8859-7");
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), "UTF-8"),
        Err(_) => (decoded.into_owned(), "ISO-8859-7 (lossy)"),
    }
}

/// Parse semicolon-delimited text into an untyped table. Rows with a
/// malformed shape are skipped and logged, never fatal.
pub fn parse_delimited(text: &str) -> Result<RawTable, ReportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        match result {
            Ok(rec) => rows.push(rec.iter().map(|c| c.to_string()).collect()),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!("{} malformed row(s) skipped", skipped);
    }
    Ok(RawTable { headers, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Integral floats lose the trailing `.0` so identifiers and years
        // survive the round-trip as plain digits.
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|ndt| ndt.date().format("%d/%m/%Y").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// First worksheet of an XLSX workbook as an untyped table.
pub fn parse_xlsx_table(bytes: &[u8]) -> Result<RawTable, ReportError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names.first().ok_or(ReportError::EmptyWorkbook)?;
    let range = workbook.worksheet_range(first)?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .map(|r| r.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    let rows: Vec<Vec<String>> = rows_iter
        .map(|r| r.iter().map(cell_to_string).collect())
        .collect();
    Ok(RawTable { headers, rows })
}

fn raw_employee_table(bytes: &[u8], spreadsheet: bool) -> Result<RawTable, ReportError> {
    if spreadsheet {
        parse_xlsx_table(bytes)
    } else {
        let (text, encoding) = decode_text(bytes);
        log::info!("employee file decoded as {}", encoding);
        parse_delimited(&text)
    }
}

/// Load, resolve and normalize an employee upload. With a contracts map,
/// the contract label from the contracts file wins over the one resolved
/// from the main file.
pub fn load_employees(
    bytes: &[u8],
    spreadsheet: bool,
    contracts: Option<&HashMap<String, String>>,
) -> Result<(EmployeeTable, LoadReport), ReportError> {
    let mut table = raw_employee_table(bytes, spreadsheet)?;
    let mut resolved = resolve::resolve_columns(&mut table);
    let (mut records, report) = normalize::build_records(&table)?;

    if let Some(contracts) = contracts {
        for r in &mut records {
            if let Some(label) = contracts.get(r.id.trim()) {
                r.contract = Some(label.clone());
            }
        }
        if !resolved.contains(&canon::CONTRACT) {
            resolved.push(canon::CONTRACT);
        }
    }

    log::info!(
        "{} employee row(s) loaded, {} cell(s) nulled, {} salary value(s) annualized",
        report.rows,
        report.nulled_cells,
        report.annualized
    );
    Ok((EmployeeTable { records, resolved }, report))
}

/// The contracts side-file: employee id → contract label.
pub fn load_contracts(bytes: &[u8]) -> Result<HashMap<String, String>, ReportError> {
    let (text, _) = decode_text(bytes);
    let table = parse_delimited(&text)?;
    let id_col = table.column(canon::EMPLOYEE_ID)?;
    let contract_col = table.column(canon::CONTRACT_LITERAL)?;

    let mut map = HashMap::new();
    for row in 0..table.rows.len() {
        let id = table.cell(row, id_col).trim().to_string();
        let label = table.cell(row, contract_col).trim().to_string();
        if !id.is_empty() && !label.is_empty() {
            map.insert(id, label);
        }
    }
    Ok(map)
}

/// Training uploads are spreadsheet-only. All required columns are
/// verified before any row is read.
pub fn load_training(bytes: &[u8]) -> Result<(Vec<TrainingRecord>, LoadReport), ReportError> {
    let table = parse_xlsx_table(bytes)?;

    let missing: Vec<&str> = TRAINING_REQUIRED
        .iter()
        .filter(|c| table.find_column(c).is_none())
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(ReportError::missing_column(missing.join(", ")));
    }

    let col = |name: &str| table.find_column(name);
    let country = col("Country").unwrap_or_default();
    let company = col("Company").unwrap_or_default();
    let year = col("Year").unwrap_or_default();
    let division = col("Division").unwrap_or_default();
    let department = col("Department").unwrap_or_default();
    let job_property = col("Job Property").unwrap_or_default();
    let status = col("Status").unwrap_or_default();
    let duration = col("Duration in Hours").unwrap_or_default();
    let cost = col("Cost (€)").unwrap_or_default();
    let trainee = col("Trainee ID").unwrap_or_default();
    // Optional columns; absent means empty/null per record.
    let gender = col("Gender");
    let completion = col("Completion Date");

    let mut nulled_cells = 0usize;
    let mut records = Vec::with_capacity(table.rows.len());
    for row in 0..table.rows.len() {
        let text = |c: usize| table.cell(row, c).trim().to_string();
        let mut number = |c: usize| {
            let s = table.cell(row, c);
            let parsed = parse_decimal_comma(Some(s));
            if parsed.is_none() && !s.trim().is_empty() {
                nulled_cells += 1;
            }
            parsed
        };
        let duration_hours = number(duration);
        let cost_value = number(cost);
        records.push(TrainingRecord {
            country: text(country),
            company: text(company),
            year: text(year),
            division: text(division),
            department: text(department),
            job_property: text(job_property),
            gender: gender.map(text).unwrap_or_default(),
            status: text(status),
            duration_hours,
            cost: cost_value,
            trainee_id: text(trainee),
            completion_date: completion.and_then(|c| parse_date_dmy(Some(table.cell(row, c)))),
        });
    }

    let rows = records.len();
    log::info!("{} training row(s) loaded", rows);
    Ok((
        records,
        LoadReport {
            rows,
            nulled_cells,
            annualized: 0,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_greek_single_byte_text() {
        let (encoded, _, _) = encoding_rs::ISO_8859_7.encode("ΑΝΔΡΑΣ;ΓΥΝΑΙΚΑ");
        let (text, encoding) = decode_text(&encoded);
        assert_eq!(text, "ΑΝΔΡΑΣ;ΓΥΝΑΙΚΑ");
        assert_eq!(encoding, "ISO-8859-7");
    }

    #[test]
    fn falls_back_to_utf8_on_undefined_bytes() {
        // U+0480 encodes to a UTF-8 lead byte that ISO-8859-7 leaves
        // undefined, forcing the fallback path.
        let text = "id;Ҁ";
        let (decoded, encoding) = decode_text(text.as_bytes());
        assert_eq!(decoded, text);
        assert_eq!(encoding, "UTF-8");
    }

    #[test]
    fn parses_semicolon_delimited_with_flexible_rows() {
        let table = parse_delimited("a;b;c\n1;2;3\n4;5\n").unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(1, 2), "");
    }

    fn sample_csv() -> String {
        let headers = [
            canon::EMPLOYEE_ID,
            canon::COMPANY,
            canon::BIRTH_DATE,
            canon::HIRE_DATE,
            canon::DEPARTURE_DATE,
            canon::NOMINAL_SALARY,
            canon::GROSS_ANNUAL,
            canon::CONTRACT_DESC,
            canon::DEPARTURE_REASON,
            "Col10",
        ]
        .join(";");
        format!(
            "{}\n1001;ACME;01/01/1990;15/06/2023;;1500,5;21000,0;FULL;;ΑΝΔΡΑΣ\n\
             1002;ACME;02/02/1985;01/01/2020;;1400,0;19000,0;FULL;;ΓΥΝΑΙΚΑ\n",
            headers
        )
    }

    // Test fixtures go through the wire encoding: the loader decodes
    // ISO-8859-7 first, so UTF-8 fixture bytes would arrive mangled.
    fn greek_bytes(text: &str) -> Vec<u8> {
        let (encoded, _, _) = encoding_rs::ISO_8859_7.encode(text);
        encoded.into_owned()
    }

    #[test]
    fn load_employees_resolves_and_normalizes() {
        let bytes = greek_bytes(&sample_csv());
        let (table, report) = load_employees(&bytes, false, None).unwrap();
        assert_eq!(report.rows, 2);
        assert!(table.resolved.contains(&canon::GENDER));
        assert_eq!(table.records[0].gender.as_deref(), Some("ΑΝΔΡΑΣ"));
        assert_eq!(table.records[0].nominal_salary, Some(1500.5));
    }

    #[test]
    fn contracts_merge_overrides_contract_label() {
        let bytes = greek_bytes(&sample_csv());
        let contracts: HashMap<String, String> =
            [("1001".to_string(), "ΟΡΙΣΜΕΝΟΥ ΧΡΟΝΟΥ".to_string())]
                .into_iter()
                .collect();
        let (table, _) = load_employees(&bytes, false, Some(&contracts)).unwrap();
        assert_eq!(
            table.records[0].contract.as_deref(),
            Some("ΟΡΙΣΜΕΝΟΥ ΧΡΟΝΟΥ")
        );
        assert_eq!(table.records[1].contract, None);
        assert!(table.resolved.contains(&canon::CONTRACT));
    }

    #[test]
    fn load_contracts_requires_both_columns() {
        let text = format!("{};Σύμβαση\n1001;ΑΟΡΙΣΤΟΥ ΧΡΟΝΟΥ\n", canon::EMPLOYEE_ID);
        let map = load_contracts(&greek_bytes(&text)).unwrap();
        assert_eq!(map["1001"], "ΑΟΡΙΣΤΟΥ ΧΡΟΝΟΥ");

        let bad = "foo;bar\n1;2\n";
        assert!(matches!(
            load_contracts(bad.as_bytes()),
            Err(ReportError::MissingColumn { .. })
        ));
    }
}
