// Entry point and high-level CLI flow.
//
// Each menu option is one report pass: load file, resolve and normalize
// columns, apply the session's filters, aggregate, print and export.
// Every handler catches its own errors and prints them inline, so one
// failing view never takes the session down.
mod error;
mod loader;
mod metrics;
mod normalize;
mod output;
mod params;
mod resolve;
mod session;
mod snapshot;
mod types;
mod util;

use error::ReportError;
use metrics::{CompensationField, GroupField, TrainingDim};
use once_cell::sync::Lazy;
use params::ReportParams;
use session::UploadCache;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use types::{EmployeeTable, SummaryStats, TrainingRecord};

// Simple in-memory session state so files are parsed once but reports can
// be re-run with different parameters in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        employees: None,
        training: None,
        params: ReportParams::default(),
        employee_cache: UploadCache::new(),
        training_cache: UploadCache::new(),
    })
});

struct AppState {
    employees: Option<Arc<EmployeeTable>>,
    training: Option<Arc<Vec<TrainingRecord>>>,
    params: ReportParams,
    employee_cache: UploadCache<EmployeeTable>,
    training_cache: UploadCache<Vec<TrainingRecord>>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_line(prompt: &str, default: &str) -> String {
    if default.is_empty() {
        print!("{}: ", prompt);
    } else {
        print!("{} [{}]: ", prompt, default);
    }
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Ask the user whether to go back to the report selection menu after
/// generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle employee loading: main file plus the optional contracts
/// side-file. The parsed table is memoized on the byte content of both
/// files, so re-loading unchanged files skips normalization entirely.
fn handle_load_employees() {
    let path = read_line("Employee file path", "employees.csv");
    let contracts_path = read_line("Contracts file path (Enter for none)", "");

    let main_bytes = match loader::read_bytes(Path::new(&path)) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
            return;
        }
    };

    let contracts = if contracts_path.is_empty() {
        None
    } else {
        // An unreadable contracts file halts the whole load: proceeding
        // with a partial merge would silently misreport contract types.
        let bytes = match loader::read_bytes(Path::new(&contracts_path)) {
            Ok(b) => b,
            Err(_) => {
                eprintln!("{}\n", ReportError::MissingContracts);
                return;
            }
        };
        match loader::load_contracts(&bytes) {
            Ok(map) => Some((bytes, map)),
            Err(e) => {
                eprintln!("Failed to load contracts: {}\n", e);
                return;
            }
        }
    };

    // Cache key covers both uploads.
    let mut key = main_bytes.clone();
    if let Some((bytes, _)) = &contracts {
        key.extend_from_slice(bytes);
    }

    let spreadsheet = loader::is_spreadsheet(Path::new(&path));
    let mut state = APP_STATE.lock().unwrap();
    let loaded = state.employee_cache.load(&key, || {
        let (table, report) =
            loader::load_employees(&main_bytes, spreadsheet, contracts.as_ref().map(|(_, m)| m))?;
        println!(
            "Processing dataset... ({} rows loaded, {} cells nulled, {} day-rate salaries annualized)",
            util::format_int(report.rows as i64),
            util::format_int(report.nulled_cells as i64),
            util::format_int(report.annualized as i64)
        );
        Ok(table)
    });
    match loaded {
        Ok((table, hit)) => {
            if hit {
                println!("File unchanged since last load; reusing normalized table.");
            }
            println!("");
            state.employees = Some(table);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn handle_load_training() {
    let path = read_line("Training file path", "training.xlsx");
    if !loader::is_spreadsheet(Path::new(&path)) {
        eprintln!("Training uploads must be .xlsx workbooks.\n");
        return;
    }
    let bytes = match loader::read_bytes(Path::new(&path)) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
            return;
        }
    };

    let mut state = APP_STATE.lock().unwrap();
    let loaded = state.training_cache.load(&bytes, || {
        let (records, report) = loader::load_training(&bytes)?;
        println!(
            "Processing training dataset... ({} rows loaded, {} cells nulled)",
            util::format_int(report.rows as i64),
            util::format_int(report.nulled_cells as i64)
        );
        Ok(records)
    });
    match loaded {
        Ok((records, hit)) => {
            if hit {
                println!("File unchanged since last load; reusing parsed table.");
            }
            println!("");
            state.training = Some(records);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn session_snapshot() -> Option<(Arc<EmployeeTable>, ReportParams)> {
    let snap = {
        let state = APP_STATE.lock().unwrap();
        state
            .employees
            .as_ref()
            .map(|t| (Arc::clone(t), state.params.clone()))
    };
    if snap.is_none() {
        println!("Error: No employee data loaded. Please load a file first (option 1).\n");
    }
    snap
}

/// The working population for active-employee views: the active-IDs
/// exclusion list plus the category filters. The departures exclusion
/// list is applied separately inside the turnover computation.
fn working_table(table: &EmployeeTable, params: &ReportParams) -> EmployeeTable {
    let records = snapshot::apply_exclusion(&table.records, &params.exclude_active);
    let records = params.filters.apply(&records, params.reference_date);
    if !params.filters.is_empty() {
        log::info!(
            "category filters active: {} of {} record(s) kept",
            records.len(),
            table.records.len()
        );
    }
    table.with_records(records)
}

fn comp_reports(table: &EmployeeTable, params: &ReportParams) -> Result<(), ReportError> {
    let year = params.year;
    let working = working_table(table, params);

    println!("Report 1: Turnover Metrics ({})\n", year);
    let turnover = metrics::turnover_by_company(&working.records, year, &params.exclude_departures);
    let turnover_rows = output::render_turnover_rows(&turnover);
    output::preview_table_rows(&turnover_rows, 8);
    output::write_csv("turnover_by_company.csv", &turnover_rows)?;
    println!("(Full table exported to turnover_by_company.csv)\n");

    println!("Overall KPIs ({})\n", year);
    let overall_gap = match metrics::overall_gender_pay_gap(&working, year) {
        Ok(gap) => {
            match gap {
                Some(g) => println!("Gender Pay Gap: {}%", util::format_number(g, 2)),
                None => println!(
                    "Gender Pay Gap: {}",
                    ReportError::insufficient("the gender pay gap")
                ),
            }
            gap
        }
        Err(e) => {
            eprintln!("Gender Pay Gap unavailable: {}", e);
            None
        }
    };
    let overall_ratio =
        metrics::overall_remuneration_ratio(&working.records, year, &params.exchange_rates);
    match overall_ratio {
        Some(r) => println!(
            "Annual Remuneration Ratio: {}x\n",
            util::format_number(r, 2)
        ),
        None => println!(
            "Annual Remuneration Ratio: {}\n",
            ReportError::insufficient("the annual remuneration ratio")
        ),
    }

    println!("Report 2: Gender Pay Gap & Remuneration Ratio per Company\n");
    let gaps = match metrics::gender_pay_gap_by_company(&working, year) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Per-company pay gap unavailable: {}", e);
            Vec::new()
        }
    };
    let ratios =
        metrics::remuneration_ratio_by_company(&working.records, year, &params.exchange_rates);
    let kpi_rows = output::render_company_kpis(&gaps, &ratios);
    output::preview_table_rows(&kpi_rows, 10);
    output::write_csv("company_kpis.csv", &kpi_rows)?;
    println!("(Full table exported to company_kpis.csv)\n");

    println!("Report 3: Top 10% Employees by Total Compensation ({})\n", year);
    let end_of_year = snapshot::active_at_boundary(&working.records, util::dec_31(year));
    let top = metrics::top_decile_by_company(&end_of_year, CompensationField::GrossAnnual);
    let top_rows = output::render_top_earners(&top);
    output::preview_table_rows(&top_rows, 10);
    output::write_csv("top_decile.csv", &top_rows)?;
    println!("(Full table exported to top_decile.csv)\n");

    println!("Report 4: Median Salary by Company (Excluding Max)\n");
    let medians =
        metrics::median_salary_by_company(&working.records, year, &params.exchange_rates);
    let median_rows = output::render_median_salaries(&medians);
    output::preview_table_rows(&median_rows, 10);
    output::write_csv("median_salary_by_company.csv", &median_rows)?;
    println!("(Full table exported to median_salary_by_company.csv)\n");

    let summary = SummaryStats {
        reporting_year: year,
        end_of_year_headcount: end_of_year.len(),
        gender_pay_gap_pct: overall_gap,
        annual_remuneration_ratio: overall_ratio,
        total_turnover_pct: turnover.last().map(|t| t.total_rate),
    };
    output::write_json("summary.json", &summary)?;
    println!("Summary Stats written to summary.json\n");
    Ok(())
}

fn handle_comp_reports() {
    let Some((table, params)) = session_snapshot() else {
        return;
    };
    println!("Generating reports...\n");
    if let Err(e) = comp_reports(&table, &params) {
        eprintln!("Report failed: {}\n", e);
    }
}

fn headcount_report(table: &EmployeeTable, params: &ReportParams) -> Result<(), ReportError> {
    let (start_year, end_year) = params.range;
    let working = working_table(table, params);
    let matrix = metrics::monthly_headcount_matrix(
        &working,
        start_year,
        end_year,
        &params.headcount_group_by,
    )?;

    println!(
        "Monthly Headcount ({} - {}), grouped by {}\n",
        start_year,
        end_year,
        params
            .headcount_group_by
            .iter()
            .map(|f| f.label())
            .collect::<Vec<_>>()
            .join(", ")
    );
    output::preview_matrix(&matrix, 10);

    output::export_matrix_csv(&matrix, "headcount_matrix.csv")?;
    println!("(Full matrix exported to headcount_matrix.csv)");
    let long_rows = output::matrix_long_rows(&matrix);
    output::write_csv("headcount_long.csv", &long_rows)?;
    println!("(Long format exported to headcount_long.csv)\n");
    Ok(())
}

fn handle_headcount_report() {
    let Some((table, params)) = session_snapshot() else {
        return;
    };
    if let Err(e) = headcount_report(&table, &params) {
        eprintln!("Report failed: {}\n", e);
    }
}

fn handle_training_report() {
    let (records, params) = {
        let state = APP_STATE.lock().unwrap();
        match &state.training {
            Some(t) => (Arc::clone(t), state.params.clone()),
            None => {
                println!("Error: No training data loaded. Please load a file first (option 2).\n");
                return;
            }
        }
    };

    let summary =
        metrics::training_summary(&records, &params.training_group_by, params.training_cutoff);
    let t = &summary.totals;
    println!("Training KPIs");
    println!(
        "  Total Duration (hours):      {}",
        util::format_number(t.duration_sum, 2)
    );
    println!(
        "  Total Cost (EUR):            {}",
        util::format_number(t.cost_sum, 2)
    );
    println!(
        "  Unique Trainees:             {}",
        util::format_int(t.trainees as i64)
    );
    println!(
        "  Cost per Trainee (EUR):      {}",
        util::format_number(t.cost_per_trainee, 2)
    );
    println!(
        "  Hours per Trainee:           {}\n",
        util::format_number(t.duration_per_trainee, 2)
    );

    let rows = output::render_training(&summary);
    output::preview_table_rows(&rows, 10);
    if let Err(e) = output::write_csv("training_summary.csv", &rows) {
        eprintln!("Write error: {}", e);
    } else {
        println!("(Full table exported to training_summary.csv)\n");
    }
}

fn handle_export_normalized() {
    let Some((table, _)) = session_snapshot() else {
        return;
    };
    match output::export_normalized(&table, "normalized_export.csv") {
        Ok(()) => println!("Normalized table exported to normalized_export.csv\n"),
        Err(e) => eprintln!("Write error: {}\n", e),
    }
}

fn parse_group_fields(input: &str) -> Vec<GroupField> {
    input
        .split(',')
        .filter_map(|t| match t.trim().to_lowercase().as_str() {
            "company" => Some(GroupField::Company),
            "division" => Some(GroupField::Division),
            "department" => Some(GroupField::Department),
            _ => None,
        })
        .collect()
}

fn parse_training_dims(input: &str) -> Vec<TrainingDim> {
    input
        .split(',')
        .filter_map(|t| match t.trim().to_lowercase().as_str() {
            "country" => Some(TrainingDim::Country),
            "company" => Some(TrainingDim::Company),
            "year" => Some(TrainingDim::Year),
            "division" => Some(TrainingDim::Division),
            "department" => Some(TrainingDim::Department),
            "job property" | "job_property" => Some(TrainingDim::JobProperty),
            "gender" => Some(TrainingDim::Gender),
            "status" => Some(TrainingDim::Status),
            _ => None,
        })
        .collect()
}

fn handle_parameters() {
    println!("Parameters:");
    println!("[1] Reporting year");
    println!("[2] Headcount year range");
    println!("[3] Exclude active IDs (comma-separated)");
    println!("[4] Exclude departure IDs (comma-separated)");
    println!("[5] Set an exchange rate");
    println!("[6] Headcount grouping (company, division, department)");
    println!("[7] Category filter");
    println!("[8] Training grouping / completion cutoff");
    println!("[9] Reset session (clear loaded data)\n");

    let choice = read_choice();
    let mut state = APP_STATE.lock().unwrap();
    match choice.as_str() {
        "1" => {
            let input = read_line("Reporting year", &state.params.year.to_string());
            match input.parse::<i32>() {
                Ok(y) if (1900..=2100).contains(&y) => {
                    state.params.year = y;
                    state.params.reference_date = util::dec_31(y);
                }
                _ => println!("Not a year: {}", input),
            }
        }
        "2" => {
            let start = read_line("Start year", &state.params.range.0.to_string());
            let end = read_line("End year", &state.params.range.1.to_string());
            match (start.parse::<i32>(), end.parse::<i32>()) {
                (Ok(s), Ok(e)) if s <= e && (1900..=2100).contains(&s) && (1900..=2100).contains(&e) => {
                    state.params.range = (s, e)
                }
                _ => println!("Invalid range."),
            }
        }
        "3" => {
            let input = read_line("Active IDs to exclude", "");
            state.params.exclude_active = snapshot::parse_exclusion_list(&input);
            println!("{} ID(s) excluded.", state.params.exclude_active.len());
        }
        "4" => {
            let input = read_line("Departure IDs to exclude", "");
            state.params.exclude_departures = snapshot::parse_exclusion_list(&input);
            println!("{} ID(s) excluded.", state.params.exclude_departures.len());
        }
        "5" => {
            let company = read_line("Company", "");
            let rate = read_line("Rate to EUR", "1.0");
            match rate.parse::<f64>() {
                Ok(r) if r > 0.0 => {
                    state.params.exchange_rates.insert(company, r);
                }
                _ => println!("Rate must be a positive number."),
            }
        }
        "6" => {
            let input = read_line("Group by", "company");
            let fields = parse_group_fields(&input);
            if fields.is_empty() {
                println!("Please name at least one of: company, division, department.");
            } else {
                state.params.headcount_group_by = fields;
            }
        }
        "7" => {
            let dim = read_line(
                "Dimension (company, city, division, department, gender, contract, job property, age bucket, departure reason)",
                "",
            );
            let values = read_line("Values (comma-separated, empty clears)", "");
            let list: Vec<String> = values
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
            let f = &mut state.params.filters;
            match dim.to_lowercase().as_str() {
                "company" => f.company = list,
                "city" => f.city = list,
                "division" => f.division = list,
                "department" => f.department = list,
                "gender" => f.gender = list,
                "contract" => f.contract = list,
                "job property" | "job_property" => f.job_property = list,
                "age bucket" | "age_bucket" => f.age_bucket = list,
                "departure reason" | "departure_reason" => f.departure_reason = list,
                other => println!("Unknown dimension: {}", other),
            }
        }
        "8" => {
            let input = read_line("Training group by", "company");
            let dims = parse_training_dims(&input);
            if !dims.is_empty() {
                state.params.training_group_by = dims;
            }
            let cutoff = read_line("Completed strictly before (DD/MM/YYYY, empty for none)", "");
            state.params.training_cutoff = util::parse_date_dmy(Some(&cutoff));
        }
        "9" => {
            state.employees = None;
            state.training = None;
            state.employee_cache.invalidate();
            state.training_cache.invalidate();
            println!("Session data cleared.");
        }
        _ => println!("Invalid choice.\n"),
    }
    println!("");
}

fn main() {
    env_logger::init();
    loop {
        println!("Select an option:");
        println!("[1] Load employee data");
        println!("[2] Load training data");
        println!("[3] Salary & turnover reports");
        println!("[4] Monthly headcount matrix");
        println!("[5] Training summary");
        println!("[6] Export normalized table");
        println!("[7] Adjust parameters\n");
        match read_choice().as_str() {
            "1" => handle_load_employees(),
            "2" => handle_load_training(),
            "3" => {
                println!("");
                handle_comp_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "4" => {
                println!("");
                handle_headcount_report();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "5" => {
                println!("");
                handle_training_report();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "6" => handle_export_normalized(),
            "7" => handle_parameters(),
            _ => {
                println!("Invalid choice. Please enter 1-7.\n");
            }
        }
    }
}
