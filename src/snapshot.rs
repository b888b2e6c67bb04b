// Activity predicates over employee snapshots.
//
// Two distinct tests exist and must not be conflated:
// - window: "was active at some point during a range"
//   (hire ≤ end AND departure null-or-≥ start)
// - boundary: "was active at a single point in time"
//   (hire ≤ point AND departure null-or-> point)
// A record with a departure date earlier than its hire date simply fails
// these tests; it is never an error.
//
// All functions return new vectors and leave the input untouched. No
// ordering is guaranteed; consumers that need determinism sort explicitly.
use crate::types::EmployeeRecord;
use crate::util::first_of_next_month;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn calendar_year(year: i32) -> PeriodWindow {
        PeriodWindow {
            start: crate::util::jan_1(year),
            end: crate::util::dec_31(year),
        }
    }
}

pub fn is_active_in_window(r: &EmployeeRecord, w: PeriodWindow) -> bool {
    let Some(hire) = r.hire_date else {
        return false;
    };
    hire <= w.end && r.departure_date.map_or(true, |d| d >= w.start)
}

pub fn is_active_at_boundary(r: &EmployeeRecord, point: NaiveDate) -> bool {
    let Some(hire) = r.hire_date else {
        return false;
    };
    hire <= point && r.departure_date.map_or(true, |d| d > point)
}

/// Active for the whole window: boundary-active at both ends. The annual
/// remuneration ratio uses this stricter population.
pub fn is_active_through_window(r: &EmployeeRecord, w: PeriodWindow) -> bool {
    let Some(hire) = r.hire_date else {
        return false;
    };
    hire <= w.start && r.departure_date.map_or(true, |d| d > w.end)
}

/// Active during the calendar month starting at `month_start`: hired
/// before the first of the next month and not departed before it.
pub fn is_active_in_month(r: &EmployeeRecord, month_start: NaiveDate) -> bool {
    let next = first_of_next_month(month_start);
    let Some(hire) = r.hire_date else {
        return false;
    };
    hire < next && r.departure_date.map_or(true, |d| d >= next)
}

pub fn active_in_window(records: &[EmployeeRecord], w: PeriodWindow) -> Vec<EmployeeRecord> {
    records
        .iter()
        .filter(|r| is_active_in_window(r, w))
        .cloned()
        .collect()
}

pub fn active_at_boundary(records: &[EmployeeRecord], point: NaiveDate) -> Vec<EmployeeRecord> {
    records
        .iter()
        .filter(|r| is_active_at_boundary(r, point))
        .cloned()
        .collect()
}

pub fn active_through_window(records: &[EmployeeRecord], w: PeriodWindow) -> Vec<EmployeeRecord> {
    records
        .iter()
        .filter(|r| is_active_through_window(r, w))
        .cloned()
        .collect()
}

/// Drop every record whose trimmed identifier is in the set.
pub fn apply_exclusion(
    records: &[EmployeeRecord],
    exclusions: &HashSet<String>,
) -> Vec<EmployeeRecord> {
    records
        .iter()
        .filter(|r| !exclusions.contains(r.id.trim()))
        .cloned()
        .collect()
}

/// Parse a comma-separated free-text exclusion list into a set of
/// identifier strings, whitespace-trimmed, empty tokens dropped.
pub fn parse_exclusion_list(input: &str) -> HashSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emp(id: &str, hire: Option<(i32, u32, u32)>, dep: Option<(i32, u32, u32)>) -> EmployeeRecord {
        let date = |t: (i32, u32, u32)| NaiveDate::from_ymd_opt(t.0, t.1, t.2).unwrap();
        EmployeeRecord {
            id: id.to_string(),
            last_name: String::new(),
            first_name: String::new(),
            company: "ACME".to_string(),
            gender: None,
            city: None,
            division: None,
            department: None,
            job_property: None,
            contract: None,
            contract_desc: None,
            departure_reason: None,
            birth_date: None,
            hire_date: hire.map(date),
            departure_date: dep.map(date),
            nominal_salary: None,
            gross_annual: None,
            hire_year: hire.map(|t| t.0),
            departure_year: dep.map(|t| t.0),
        }
    }

    #[test]
    fn open_ended_record_is_window_active() {
        let r = emp("1", Some((2023, 6, 1)), None);
        assert!(is_active_in_window(&r, PeriodWindow::calendar_year(2024)));
    }

    #[test]
    fn departed_mid_year_is_window_active_but_not_boundary_active() {
        let r = emp("1", Some((2023, 1, 1)), Some((2024, 3, 1)));
        let w = PeriodWindow::calendar_year(2024);
        assert!(is_active_in_window(&r, w));
        assert!(!is_active_at_boundary(&r, crate::util::dec_31(2024)));
    }

    #[test]
    fn departure_on_boundary_day_is_not_boundary_active() {
        // Boundary uses strict `>`, window uses `≥`.
        let r = emp("1", Some((2020, 1, 1)), Some((2024, 12, 31)));
        assert!(!is_active_at_boundary(&r, crate::util::dec_31(2024)));
        assert!(is_active_in_window(&r, PeriodWindow::calendar_year(2024)));
    }

    #[test]
    fn through_window_requires_presence_at_both_ends() {
        let w = PeriodWindow::calendar_year(2024);
        assert!(is_active_through_window(&emp("1", Some((2023, 12, 1)), None), w));
        // Hired mid-window.
        assert!(!is_active_through_window(
            &emp("2", Some((2024, 3, 1)), None),
            w
        ));
        // Departed on the last day.
        assert!(!is_active_through_window(
            &emp("3", Some((2020, 1, 1)), Some((2024, 12, 31))),
            w
        ));
    }

    #[test]
    fn month_predicate_edges() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        // Hired on the last day of the month counts for that month.
        assert!(is_active_in_month(&emp("1", Some((2024, 1, 31)), None), jan));
        // Hired on the first of the following month does not.
        assert!(!is_active_in_month(&emp("2", Some((2024, 2, 1)), None), jan));
        // Departed on the first of the following month still counts.
        assert!(is_active_in_month(
            &emp("3", Some((2023, 1, 1)), Some((2024, 2, 1))),
            jan
        ));
        // Departed mid-month does not.
        assert!(!is_active_in_month(
            &emp("4", Some((2023, 1, 1)), Some((2024, 1, 20))),
            jan
        ));
    }

    #[test]
    fn departure_before_hire_is_tolerated() {
        let r = emp("1", Some((2024, 6, 1)), Some((2024, 1, 1)));
        assert!(!is_active_in_window(&r, PeriodWindow::calendar_year(2024)));
        assert!(!is_active_at_boundary(&r, crate::util::dec_31(2024)));
    }

    #[test]
    fn missing_hire_date_is_never_active() {
        let r = emp("1", None, None);
        assert!(!is_active_in_window(&r, PeriodWindow::calendar_year(2024)));
    }

    #[test]
    fn subset_functions_return_new_vectors() {
        let records = vec![
            emp("1", Some((2023, 6, 1)), None),
            emp("2", Some((2025, 2, 1)), None),
            emp("3", Some((2023, 1, 1)), Some((2024, 3, 1))),
        ];
        let w = PeriodWindow::calendar_year(2024);
        let in_window = active_in_window(&records, w);
        assert_eq!(in_window.len(), 2);
        let at_end = active_at_boundary(&records, crate::util::dec_31(2024));
        assert_eq!(at_end.len(), 1);
        assert_eq!(at_end[0].id, "1");
        let through = active_through_window(&records, w);
        assert_eq!(through.len(), 1);
        // Input untouched.
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn exclusion_list_parses_and_filters_by_trimmed_string() {
        let set = parse_exclusion_list(" 1016492,  1017069 ,,1017070, ");
        assert_eq!(set.len(), 3);
        let records = vec![
            emp(" 1016492 ", Some((2020, 1, 1)), None),
            emp("9999999", Some((2020, 1, 1)), None),
        ];
        let kept = apply_exclusion(&records, &set);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id.trim(), "9999999");
    }
}
