// Column resolution: map heterogeneous, locale-specific input headers to a
// canonical schema before any typed parsing happens.
//
// The source exports do not agree on header names, but each ambiguous
// column reliably contains a known marker value somewhere in its data
// (e.g. the gender column contains `ΑΝΔΡΑΣ`). Resolution therefore scans
// cell content, not headers: for each rule, the first unclaimed column
// containing the marker as a substring of any stringified cell is renamed
// to the canonical name.
//
// Known imprecision, kept on purpose: a free-text column that happens to
// contain a marker substring wins if it is scanned first. Source data
// varies too much for stricter matching to be safe.
use crate::error::ReportError;
use std::collections::HashSet;

/// Canonical column names used internally, plus the fixed literal headers
/// that appear verbatim in the source exports.
pub mod canon {
    // Resolver-derived canonical names.
    pub const GENDER: &str = "Gender";
    pub const JOB_PROPERTY: &str = "Job Property";
    pub const CITY: &str = "City";
    pub const CONTRACT: &str = "Contract";
    pub const DIVISION: &str = "Division";
    pub const DEPARTMENT: &str = "Department";

    // Fixed literal headers.
    pub const EMPLOYEE_ID: &str = "Αριθμός μητρώου";
    pub const BIRTH_DATE: &str = "Ημ/νία γέννησης";
    pub const HIRE_DATE: &str = "Ημ/νία πρόσληψης";
    pub const DEPARTURE_DATE: &str = "Ημ/νία αποχώρησης";
    pub const NOMINAL_SALARY: &str = "Ονομαστικός μισθός";
    pub const GROSS_ANNUAL: &str = "ΜΙΚΤΕΣ ΑΠΟΔ";
    pub const COMPANY: &str = "Περιγραφή εταιρίας";
    pub const CONTRACT_DESC: &str = "Περιγραφή Σύμβασης";
    pub const DEPARTURE_REASON: &str = "Περιγραφή Αιτ. Αποχώρησης";
    pub const LAST_NAME: &str = "Επώνυμο";
    pub const FIRST_NAME: &str = "Ονομα";
    /// Header of the contract column as it appears in the contracts
    /// side-file (the main file's contract column is marker-resolved).
    pub const CONTRACT_LITERAL: &str = "Σύμβαση";
}

pub struct RenameRule {
    pub marker: &'static str,
    pub canonical: &'static str,
}

/// Ordered rule table, evaluated once per load. Order matters: earlier
/// rules claim columns first.
pub const RENAME_RULES: &[RenameRule] = &[
    RenameRule {
        marker: "ΑΝΔΡΑΣ",
        canonical: canon::GENDER,
    },
    RenameRule {
        marker: "OPERATIONAL",
        canonical: canon::JOB_PROPERTY,
    },
    RenameRule {
        marker: "ΕΥΚΑΡΠΙΑ",
        canonical: canon::CITY,
    },
    RenameRule {
        marker: "ΑΟΡΙΣΤΟΥ ΧΡΟΝΟΥ",
        canonical: canon::CONTRACT,
    },
    RenameRule {
        marker: "DIVISION",
        canonical: canon::DIVISION,
    },
    RenameRule {
        marker: "ΕΠΑΝΑΤΙΜΟΛΟΓΗΣΗ",
        canonical: canon::DEPARTMENT,
    },
];

/// An untyped table: headers plus stringified rows. Rows may be shorter
/// than the header (flexible CSV input); `cell` papers over that with an
/// empty string.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column(&self, name: &str) -> Result<usize, ReportError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReportError::missing_column(name))
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Apply the rename rules in order and return the canonical names that
/// were resolved. Each canonical name is claimed at most once, and a
/// column claimed by an earlier rule is never re-matched by a later one.
/// A rule with no match leaves the table unchanged; downstream consumers
/// that require the missing canonical column must raise
/// [`ReportError::MissingColumn`] rather than skip silently.
pub fn resolve_columns(table: &mut RawTable) -> Vec<&'static str> {
    let mut claimed_cols: HashSet<usize> = HashSet::new();
    let mut resolved: Vec<&'static str> = Vec::new();

    for rule in RENAME_RULES {
        if resolved.contains(&rule.canonical) {
            continue;
        }
        let hit = (0..table.headers.len())
            .filter(|i| !claimed_cols.contains(i))
            .find(|&i| {
                table
                    .rows
                    .iter()
                    .any(|row| row.get(i).is_some_and(|v| v.contains(rule.marker)))
            });
        if let Some(i) = hit {
            log::debug!(
                "column '{}' resolved to '{}' via marker '{}'",
                table.headers[i],
                rule.canonical,
                rule.marker
            );
            table.headers[i] = rule.canonical.to_string();
            claimed_cols.insert(i);
            resolved.push(rule.canonical);
        } else {
            log::debug!("no column matched marker '{}'", rule.marker);
        }
    }
    resolved
}
