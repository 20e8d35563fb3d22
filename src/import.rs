// Roster import: spreadsheet column mapping, bulk text lines and JSON files

use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::WINDOWS_1252;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::model::Student;

// ============================================================================
// Spreadsheet Rows
// ============================================================================

/// Which columns hold the first and last name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub first_name: usize,
    pub last_name: usize,
}

/// Maps spreadsheet rows to students. Row 0 is the header and is skipped;
/// rows with an empty first or last name are dropped. Ids are `excel-<row>`.
pub fn students_from_rows(rows: &[Vec<String>], mapping: ColumnMapping) -> Vec<Student> {
    let cell = |row: &Vec<String>, index: usize| -> String {
        row.get(index).map(|s| s.trim().to_string()).unwrap_or_default()
    };

    rows.iter()
        .enumerate()
        .skip(1)
        .filter_map(|(index, row)| {
            let first = cell(row, mapping.first_name);
            let last = cell(row, mapping.last_name);
            if first.is_empty() || last.is_empty() {
                return None;
            }
            Some(Student::new(format!("excel-{}", index), first, last))
        })
        .collect()
}

/// Header cells, offered to the user when choosing the name columns.
pub fn header(rows: &[Vec<String>]) -> &[String] {
    rows.first().map(|r| r.as_slice()).unwrap_or(&[])
}

/// Reads all rows of the first sheet of a `.xlsx`, `.xls`, `.ods` or `.csv`
/// file as text.
pub fn read_spreadsheet(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>, AppError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(path),
        other => Err(AppError::ImportError(format!(
            "{}: unsupported file type '{}'",
            path.display(),
            other
        ))),
    }
}

/// First worksheet of a workbook. Empty columns left of the data are kept
/// so that column indices match the sheet.
pub fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>, AppError> {
    let import_error =
        |e: calamine::Error| AppError::ImportError(format!("{}: {}", path.display(), e));

    let mut workbook = open_workbook_auto(path).map_err(import_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            AppError::ImportError(format!("{}: workbook has no sheets", path.display()))
        })?
        .map_err(import_error)?;

    let leading = range.start().map_or(0, |(_, col)| col as usize);
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| {
            std::iter::repeat(String::new())
                .take(leading)
                .chain(row.iter().map(cell_text))
                .collect()
        })
        .collect();
    debug!(path = %path.display(), rows = rows.len(), "workbook read");
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Reads a CSV file as raw string rows. The delimiter is `;` when the first
/// line contains more semicolons than commas.
pub fn read_csv(path: &Path) -> Result<Vec<Vec<String>>, AppError> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::ImportError(format!("{}: {}", path.display(), e)))?;
    parse_csv(&decode_text(&bytes))
}

/// UTF-8 when the bytes are valid UTF-8 (a byte-order mark is dropped),
/// Windows-1252 otherwise.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
        Err(_) => {
            debug!("input is not UTF-8, decoding as windows-1252");
            WINDOWS_1252.decode_without_bom_handling(bytes).0
        }
    }
}

pub fn parse_csv(content: &str) -> Result<Vec<Vec<String>>, AppError> {
    let first_line = content.lines().next().unwrap_or_default();
    let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::ImportError(format!("Invalid CSV: {}", e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

// ============================================================================
// Bulk Text
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line: usize,
    pub content: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BulkImport {
    pub students: Vec<Student>,
    pub skipped: Vec<SkippedLine>,
}

/// Parses lines of the form `U[(first);(last);(email);(studentNumber)]`.
///
/// Bad lines are logged and skipped; the rest of the input still imports.
/// Line numbers are 1-based.
pub fn parse_bulk(text: &str) -> BulkImport {
    let mut result = BulkImport::default();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match parse_bulk_line(line) {
            Ok(parts) => {
                let [first, last, _email, number] = parts;
                let id = if number.is_empty() {
                    format!("bulk-line-{}", index + 1)
                } else {
                    format!("bulk-{}", number)
                };
                result.students.push(Student::new(id, first, last));
            }
            Err(reason) => {
                warn!(line = index + 1, %reason, "skipping bulk import line");
                result.skipped.push(SkippedLine {
                    line: index + 1,
                    content: line.to_string(),
                    reason,
                });
            }
        }
    }

    info!(
        imported = result.students.len(),
        skipped = result.skipped.len(),
        "bulk import parsed"
    );
    result
}

fn parse_bulk_line(line: &str) -> Result<[String; 4], String> {
    let body = line
        .strip_prefix("U[")
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| "expected U[...]".to_string())?;

    let parts = parenthesized_parts(body)?;
    let parts: [String; 4] = parts
        .try_into()
        .map_err(|parts: Vec<String>| format!("expected 4 fields, found {}", parts.len()))?;

    if parts[0].is_empty() || parts[1].is_empty() {
        return Err("first and last name are required".to_string());
    }
    if !is_valid_email(&parts[2]) {
        return Err(format!("invalid email '{}'", parts[2]));
    }
    Ok(parts)
}

/// Contents of the top-level `(...)` groups. Separators between groups are
/// ignored, so semicolons inside a group are kept as text.
fn parenthesized_parts(body: &str) -> Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in body.chars() {
        match c {
            '(' => {
                if depth > 0 {
                    current.push(c);
                }
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return Err("unbalanced ')'".to_string());
                }
                depth -= 1;
                if depth == 0 {
                    parts.push(current.trim().to_string());
                    current.clear();
                } else {
                    current.push(c);
                }
            }
            _ if depth > 0 => current.push(c),
            _ => {}
        }
    }

    if depth != 0 {
        return Err("unbalanced '('".to_string());
    }
    Ok(parts)
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

// ============================================================================
// JSON Roster Files
// ============================================================================

/// Roster entry from JSON file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RosterEntry {
    #[serde(rename_all = "camelCase")]
    Split {
        #[serde(default)]
        id: Option<String>,
        first_name: String,
        last_name: String,
    },
    Name {
        name: String,
    },
}

/// Loads a JSON array of `{ "firstName", "lastName", "id"? }` or
/// `{ "name" }` entries. Single names are split at the last space.
/// Ids are `json-<id>`, or `json-row-<index>` for entries without one.
pub fn load_roster_json(path: impl AsRef<Path>) -> Result<Vec<Student>, AppError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::RosterError(format!("{}: {}", path.display(), e)))?;
    parse_roster_json(&content)
}

pub fn parse_roster_json(content: &str) -> Result<Vec<Student>, AppError> {
    let entries: Vec<RosterEntry> = serde_json::from_str(content)
        .map_err(|e| AppError::RosterError(format!("Invalid JSON: {}", e)))?;

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            RosterEntry::Split {
                id,
                first_name,
                last_name,
            } => Student::new(
                match id {
                    Some(id) => format!("json-{}", id.trim()),
                    None => format!("json-row-{}", index),
                },
                first_name.trim(),
                last_name.trim(),
            ),
            RosterEntry::Name { name } => {
                let name = name.trim();
                let (first, last) = name.rsplit_once(' ').unwrap_or((name, ""));
                Student::new(format!("json-row-{}", index), first.trim(), last.trim())
            }
        })
        .collect())
}

/// Anonymous roster of `count` numbered students.
pub fn numbered_roster(count: u32) -> Vec<Student> {
    (1..=count).map(Student::numbered).collect()
}

// ============================================================================
// Combining Sources
// ============================================================================

/// Appends every incoming student whose id is not known yet. Duplicates are
/// dropped with a warning. Returns how many were dropped.
pub fn merge_students(known: &mut Vec<Student>, incoming: Vec<Student>) -> usize {
    let mut ids: HashSet<String> = known.iter().map(|s| s.id.clone()).collect();
    let mut dropped = 0;
    for student in incoming {
        if student.is_free_seat() {
            warn!("ignoring student with the reserved free-seat id");
            dropped += 1;
        } else if ids.insert(student.id.clone()) {
            known.push(student);
        } else {
            warn!(id = %student.id, name = %student.display_name(), "duplicate student id dropped");
            dropped += 1;
        }
    }
    dropped
}
