//! Input file schemas and the header check that gates job submission.
//!
//! Each uploaded CSV plays one of two roles. A header row is accepted when
//! it contains every column of the role's schema; order and extra columns
//! do not matter.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Field delimiter used by both input files.
pub const CSV_DELIMITER: char = ';';

/// Required columns of the lending file.
pub const LENDING_COLUMNS: &[&str] = &[
    "ref_date", "INTERVAL", "50", "100", "200", "250", "500", "1000", "1500", "2000", "2500",
    "5000",
];

/// Required columns of the recovery file.
pub const RECOVERY_COLUMNS: &[&str] = &[
    "SDATE", "INTERVAL", "5", "34", "50", "61", "90", "100", "125", "173", "200", "215", "235",
    "250", "300", "435", "500", "600", "870", "1000", "1080", "1350", "1500", "1624", "1917",
    "2000", "2096", "2390", "2500", "3000", "4001", "5000",
];

/// Which of the two inputs a file is used as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Lending,
    Recovery,
}

impl FileRole {
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            FileRole::Lending => LENDING_COLUMNS,
            FileRole::Recovery => RECOVERY_COLUMNS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileRole::Lending => "lending",
            FileRole::Recovery => "recovery",
        }
    }
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lending" => Ok(FileRole::Lending),
            "recovery" => Ok(FileRole::Recovery),
            other => Err(CoreError::Validation(format!(
                "Unknown file role '{other}', expected 'lending' or 'recovery'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Header checks
// ---------------------------------------------------------------------------

/// Split a header line on the delimiter, trimming each cell.
///
/// A leading UTF-8 byte-order mark is dropped.
pub fn split_header(line: &str) -> Vec<String> {
    line.trim_start_matches('\u{feff}')
        .trim_end_matches(['\r', '\n'])
        .split(CSV_DELIMITER)
        .map(|cell| cell.trim().to_string())
        .collect()
}

/// Columns of the role's schema that the header lacks, in schema order.
pub fn missing_columns<S: AsRef<str>>(header: &[S], role: FileRole) -> Vec<&'static str> {
    role.required_columns()
        .iter()
        .copied()
        .filter(|required| !header.iter().any(|col| col.as_ref() == *required))
        .collect()
}

/// `true` when `header` contains every required column for `role`.
pub fn validate<S: AsRef<str>>(header: &[S], role: FileRole) -> bool {
    missing_columns(header, role).is_empty()
}

/// Check the first line of a CSV file's contents against the role schema.
///
/// Returns a [`CoreError::Validation`] naming the missing columns.
pub fn validate_content(content: &str, role: FileRole) -> Result<(), CoreError> {
    let first_line = content.lines().next().unwrap_or_default();
    if first_line.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "The {role} file is empty or has no header row"
        )));
    }

    let header = split_header(first_line);
    let missing = missing_columns(&header, role);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "The {role} file is missing required columns: {}",
            missing.join(", ")
        )))
    }
}

/// Byte-oriented variant of [`validate_content`] for raw uploads.
pub fn validate_bytes(bytes: &[u8], role: FileRole) -> Result<(), CoreError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        CoreError::Validation(format!("The {role} file is not valid UTF-8: {e}"))
    })?;
    validate_content(text, role)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
