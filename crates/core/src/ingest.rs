//! CSV ingestion for bulk hospital uploads.
//!
//! Turns an uploaded file into an ordered, non-empty list of
//! [`HospitalRow`]s. Every check happens here, before a batch id exists,
//! so a rejected upload leaves no state behind.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

/// Columns every upload must carry.
const REQUIRED_COLUMNS: &[&str] = &["name", "address"];

/// One hospital record as read from the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct HospitalRow {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "address must not be empty"))]
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl HospitalRow {
    pub fn new(name: impl Into<String>, address: impl Into<String>, phone: Option<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            phone,
        }
    }
}

/// Parse and validate an uploaded CSV file.
///
/// Rejects the upload when the file name lacks a `.csv` extension, the body
/// is not UTF-8, the `name`/`address` columns are missing, there are no data
/// rows, there are more than `max_rows` rows, or any row has a blank name or
/// address. Blank phone cells become `None`.
pub fn parse_hospital_csv(
    filename: &str,
    data: &[u8],
    max_rows: usize,
) -> Result<Vec<HospitalRow>, CoreError> {
    if !filename.to_ascii_lowercase().ends_with(".csv") {
        return Err(CoreError::Validation("Only CSV files are allowed".into()));
    }

    let content = std::str::from_utf8(data)
        .map_err(|_| CoreError::Validation("CSV file must be UTF-8 encoded".into()))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| CoreError::Validation(format!("CSV parse error: {e}")))?;
    let has_required = REQUIRED_COLUMNS
        .iter()
        .all(|col| headers.iter().any(|h| h == *col));
    if !has_required {
        return Err(CoreError::Validation(
            "CSV must contain name and address columns".into(),
        ));
    }

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<HospitalRow>().enumerate() {
        let line = i + 1;
        if rows.len() == max_rows {
            return Err(CoreError::Validation(format!(
                "Maximum {max_rows} hospitals allowed"
            )));
        }

        let mut row =
            record.map_err(|e| CoreError::Validation(format!("CSV parse error in row {line}: {e}")))?;

        row.phone = row.phone.filter(|p| !p.is_empty());
        row.validate()
            .map_err(|e| CoreError::Validation(format!("Row {line}: {}", describe(&e))))?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(CoreError::Validation("CSV file is empty".into()));
    }

    Ok(rows)
}

/// Flatten validator field errors into "field: message" pairs.
fn describe(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(msg) => msg.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();
    parts.sort();
    parts.join(", ")
}
