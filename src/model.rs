// Seating chart data model: students, desks and the classroom grid

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;

/// Reserved id of the "intentionally empty" seat marker.
pub const FREE_SEAT_ID: &str = "free";

/// Surplus seats above this count are worth a warning.
pub const FREE_SEAT_WARNING_THRESHOLD: usize = 5;

// ============================================================================
// Students & Desks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub is_excluded: bool,
}

impl Student {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            is_excluded: false,
        }
    }

    /// The placeholder that marks a seat as deliberately left empty.
    /// Any number of desks may hold it at the same time.
    pub fn free_seat() -> Self {
        Self::new(FREE_SEAT_ID, "frei", "")
    }

    /// Anonymous student shown by number only.
    pub fn numbered(number: u32) -> Self {
        Self::new(format!("number-{}", number), number.to_string(), "")
    }

    pub fn is_free_seat(&self) -> bool {
        self.id == FREE_SEAT_ID
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Storage row; row 0 is the row farthest from the board.
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Desk {
    pub id: String,
    pub students: Vec<Student>,
    pub is_empty: bool,
    pub position: Position,
}

impl Desk {
    fn new(row: usize, col: usize, seats: usize) -> Self {
        Self {
            id: format!("desk-{}-{}", row, col),
            students: Vec::with_capacity(seats),
            is_empty: true,
            position: Position { row, col },
        }
    }

    /// Seats taken by real students (free-seat markers excluded).
    pub fn occupied(&self) -> usize {
        self.students.iter().filter(|s| !s.is_free_seat()).count()
    }

    pub(crate) fn refresh(&mut self) {
        self.is_empty = self.students.is_empty();
    }
}

/// Builds a rows x columns matrix of empty desks indexed by storage position.
pub fn create_grid(rows: usize, columns: usize, students_per_desk: usize) -> Vec<Vec<Desk>> {
    (0..rows)
        .map(|row| {
            (0..columns)
                .map(|col| Desk::new(row, col, students_per_desk))
                .collect()
        })
        .collect()
}

/// Rows in display order: the first entry is the row closest to the board.
pub fn to_display_order(desks: &[Vec<Desk>]) -> Vec<&Vec<Desk>> {
    desks.iter().rev().collect()
}

// ============================================================================
// Display / Storage Row Mapping
// ============================================================================

/// Maps between display rows (0 = nearest the board) and storage rows
/// (0 = farthest from the board). Both directions are `rows - 1 - r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMapping {
    rows: usize,
}

impl RowMapping {
    pub fn new(rows: usize) -> Self {
        Self { rows }
    }

    pub fn to_display(&self, storage_row: usize) -> Option<usize> {
        self.flip(storage_row)
    }

    pub fn to_storage(&self, display_row: usize) -> Option<usize> {
        self.flip(display_row)
    }

    fn flip(&self, row: usize) -> Option<usize> {
        (row < self.rows).then(|| self.rows - 1 - row)
    }
}

// ============================================================================
// Classroom
// ============================================================================

/// The grid shape only changes through `resize`, so `desks` always has
/// `rows` rows of `columns` desks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: String,
    pub name: String,
    pub(crate) rows: usize,
    pub(crate) columns: usize,
    pub(crate) students_per_desk: usize,
    pub(crate) desks: Vec<Vec<Desk>>,
    /// Every known student, seated or not. The roster is derived from this.
    #[serde(default)]
    pub students: Vec<Student>,
}

impl Classroom {
    /// Shape values below 1 are raised to 1.
    pub fn new(
        name: impl Into<String>,
        rows: usize,
        columns: usize,
        students_per_desk: usize,
    ) -> Self {
        let rows = rows.max(1);
        let columns = columns.max(1);
        let students_per_desk = students_per_desk.max(1);
        Self {
            id: generate_short_id(),
            name: name.into(),
            rows,
            columns,
            students_per_desk,
            desks: create_grid(rows, columns, students_per_desk),
            students: Vec::new(),
        }
    }

    pub fn with_students(mut self, students: Vec<Student>) -> Self {
        self.students = students;
        self
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn students_per_desk(&self) -> usize {
        self.students_per_desk
    }

    /// Desks by storage position.
    pub fn desks(&self) -> &[Vec<Desk>] {
        &self.desks
    }

    pub fn mapping(&self) -> RowMapping {
        RowMapping::new(self.rows)
    }

    pub fn capacity(&self) -> usize {
        self.rows * self.columns * self.students_per_desk
    }

    /// Real students currently sitting at a desk.
    pub fn seated_count(&self) -> usize {
        self.desks.iter().flatten().map(Desk::occupied).sum()
    }

    pub fn is_seated(&self, student_id: &str) -> bool {
        self.desks
            .iter()
            .flatten()
            .any(|desk| desk.students.iter().any(|s| s.id == student_id))
    }

    /// Available students: known, not seated, not excluded.
    pub fn roster(&self) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| !s.is_excluded && !s.is_free_seat() && !self.is_seated(&s.id))
            .collect()
    }

    /// Desk at a display coordinate.
    pub fn desk(&self, display_row: usize, col: usize) -> Option<&Desk> {
        let row = self.mapping().to_storage(display_row)?;
        self.desks.get(row)?.get(col)
    }

    pub(crate) fn desk_mut(&mut self, display_row: usize, col: usize) -> Option<&mut Desk> {
        let row = self.mapping().to_storage(display_row)?;
        self.desks.get_mut(row)?.get_mut(col)
    }

    pub fn capacity_notice(&self) -> CapacityNotice {
        capacity_notice(self.capacity(), self.seated_count() + self.roster().len())
    }

    // ------------------------------------------------------------------------
    // Chart files
    // ------------------------------------------------------------------------

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::ChartFileError(format!("{}: {}", path.display(), e)))?;
        let mut classroom: Classroom = serde_json::from_str(&content)
            .map_err(|e| AppError::ChartFileError(format!("Invalid JSON: {}", e)))?;
        classroom.validate()?;
        Ok(classroom)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::ChartFileError(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Checks a loaded chart: grid shape, desk positions, seat capacity and
    /// that no real student sits in two places. Recomputes `is_empty`.
    fn validate(&mut self) -> Result<(), AppError> {
        if self.rows == 0 || self.columns == 0 || self.students_per_desk == 0 {
            return Err(AppError::ChartFileError(
                "rows, columns and seats must be at least 1".into(),
            ));
        }
        if self.desks.len() != self.rows || self.desks.iter().any(|r| r.len() != self.columns) {
            return Err(AppError::ChartFileError(format!(
                "desk grid does not match {}x{}",
                self.rows, self.columns
            )));
        }

        let mut seated_ids = HashSet::new();
        let mut seated = Vec::new();
        for (row, desks) in self.desks.iter_mut().enumerate() {
            for (col, desk) in desks.iter_mut().enumerate() {
                if desk.position != (Position { row, col }) {
                    return Err(AppError::ChartFileError(format!(
                        "{} is stored at {}/{} but claims {}/{}",
                        desk.id, row, col, desk.position.row, desk.position.col
                    )));
                }
                if desk.students.len() > self.students_per_desk {
                    return Err(AppError::ChartFileError(format!(
                        "{} holds {} students but has {} seats",
                        desk.id,
                        desk.students.len(),
                        self.students_per_desk
                    )));
                }
                for student in desk.students.iter().filter(|s| !s.is_free_seat()) {
                    if !seated_ids.insert(student.id.clone()) {
                        return Err(AppError::ChartFileError(format!(
                            "student {} is seated more than once",
                            student.id
                        )));
                    }
                    seated.push(student.clone());
                }
                desk.refresh();
            }
        }

        let before = self.students.len();
        self.students.retain(|s| !s.is_free_seat());
        if self.students.len() != before {
            warn!("dropped known students using the reserved free-seat id");
        }
        // Seated students must be known so that removing them returns them to the roster.
        for student in seated {
            if !self.students.iter().any(|s| s.id == student.id) {
                self.students.push(student);
            }
        }
        Ok(())
    }
}

/// First eight hex digits of a random uuid, upper-cased.
pub(crate) fn generate_short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id.make_ascii_uppercase();
    id
}

// ============================================================================
// Capacity Notice
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Banner describing how the roster size compares to the seat count.
/// Never blocks placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityNotice {
    Balanced,
    FreeSeats { free: usize },
    ManyFreeSeats { free: usize },
    Overbooked { unseated: usize },
}

impl CapacityNotice {
    pub fn level(&self) -> Option<NoticeLevel> {
        match self {
            CapacityNotice::Balanced => None,
            CapacityNotice::FreeSeats { .. } => Some(NoticeLevel::Info),
            CapacityNotice::ManyFreeSeats { .. } | CapacityNotice::Overbooked { .. } => {
                Some(NoticeLevel::Warning)
            }
        }
    }
}

impl fmt::Display for CapacityNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityNotice::Balanced => write!(f, "Alle Plätze sind belegt"),
            CapacityNotice::FreeSeats { free: 1 } => write!(f, "1 freier Platz"),
            CapacityNotice::FreeSeats { free } => write!(f, "{} freie Plätze", free),
            CapacityNotice::ManyFreeSeats { free } => {
                write!(f, "{} freie Plätze – Raum verkleinern?", free)
            }
            CapacityNotice::Overbooked { unseated } => {
                write!(f, "{} Schüler:innen haben keinen Platz", unseated)
            }
        }
    }
}

pub fn capacity_notice(capacity: usize, students: usize) -> CapacityNotice {
    if students > capacity {
        CapacityNotice::Overbooked { unseated: students - capacity }
    } else {
        match capacity - students {
            0 => CapacityNotice::Balanced,
            free if free > FREE_SEAT_WARNING_THRESHOLD => CapacityNotice::ManyFreeSeats { free },
            free => CapacityNotice::FreeSeats { free },
        }
    }
}
