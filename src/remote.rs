// Remote class and student lists
//
// Failures never reach the seating grid: callers get empty collections and a
// logged warning instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::model::Student;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub school_id: Option<String>,
}

/// Where class and student records come from.
pub trait RosterSource {
    fn get_classes(
        &self,
        owner_id: &str,
        school_id: Option<&str>,
    ) -> Result<Vec<ClassSummary>, AppError>;
    fn get_students(&self, class_id: &str) -> Result<Vec<Student>, AppError>;
}

pub fn fetch_classes_or_empty<S: RosterSource + ?Sized>(
    source: &S,
    owner_id: &str,
    school_id: Option<&str>,
) -> Vec<ClassSummary> {
    source.get_classes(owner_id, school_id).unwrap_or_else(|e| {
        warn!(owner_id, error = %e, "failed to load classes");
        Vec::new()
    })
}

pub fn fetch_students_or_empty<S: RosterSource + ?Sized>(
    source: &S,
    class_id: &str,
) -> Vec<Student> {
    source.get_students(class_id).unwrap_or_else(|e| {
        warn!(class_id, error = %e, "failed to load students");
        Vec::new()
    })
}

// ============================================================================
// HTTP Source
// ============================================================================

/// Student row as stored remotely; ids may be numbers or strings. Local ids
/// are `remote-<id>`.
#[derive(Debug, Deserialize)]
struct StudentRecord {
    id: serde_json::Value,
    first_name: String,
    last_name: String,
}

impl From<StudentRecord> for Student {
    fn from(record: StudentRecord) -> Self {
        Student::new(
            format!("remote-{}", value_to_id(record.id)),
            record.first_name.trim(),
            record.last_name.trim(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ClassRecord {
    id: serde_json::Value,
    name: String,
    #[serde(default)]
    school_id: Option<serde_json::Value>,
}

fn value_to_id(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// REST table endpoint: `GET {base}/classes?owner_id=eq.<id>` and
/// `GET {base}/students?class_id=eq.<id>`.
pub struct HttpRosterSource {
    base_url: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl HttpRosterSource {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            base_url,
            api_key,
            agent,
        }
    }

    fn fetch(&self, table: &str, filters: &[(&str, String)]) -> Result<String, AppError> {
        let url = format!("{}/{}", self.base_url, table);
        let mut request = self.agent.get(&url).query("select", "*");
        for (column, value) in filters {
            request = request.query(column, &format!("eq.{}", value));
        }
        if let Some(key) = &self.api_key {
            request = request
                .set("apikey", key)
                .set("Authorization", &format!("Bearer {}", key));
        }

        debug!(%url, "remote request");
        let response = request
            .call()
            .map_err(|e| AppError::RemoteError(format!("{}: {}", url, e)))?;
        response
            .into_string()
            .map_err(|e| AppError::RemoteError(format!("Failed to read response: {}", e)))
    }
}

impl RosterSource for HttpRosterSource {
    fn get_classes(
        &self,
        owner_id: &str,
        school_id: Option<&str>,
    ) -> Result<Vec<ClassSummary>, AppError> {
        let mut filters = vec![("owner_id", owner_id.to_string())];
        if let Some(school_id) = school_id {
            filters.push(("school_id", school_id.to_string()));
        }
        let body = self.fetch("classes", &filters)?;
        let records: Vec<ClassRecord> = serde_json::from_str(&body)
            .map_err(|e| AppError::RemoteError(format!("Invalid class list: {}", e)))?;
        Ok(records
            .into_iter()
            .map(|r| ClassSummary {
                id: value_to_id(r.id),
                name: r.name,
                school_id: r.school_id.map(value_to_id),
            })
            .collect())
    }

    fn get_students(&self, class_id: &str) -> Result<Vec<Student>, AppError> {
        let body = self.fetch("students", &[("class_id", class_id.to_string())])?;
        let records: Vec<StudentRecord> = serde_json::from_str(&body)
            .map_err(|e| AppError::RemoteError(format!("Invalid student list: {}", e)))?;
        Ok(records.into_iter().map(Student::from).collect())
    }
}

// ============================================================================
// Session Cache
// ============================================================================

/// Loads each class roster at most once per session. After the first
/// successful load the cached copy is returned, so a late fetch can never
/// overwrite unsaved seating edits. Failed loads are not cached.
pub struct SessionRoster<S: RosterSource> {
    source: S,
    loaded: HashMap<String, Vec<Student>>,
}

impl<S: RosterSource> SessionRoster<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            loaded: HashMap::new(),
        }
    }

    pub fn students(&mut self, class_id: &str) -> Vec<Student> {
        if let Some(students) = self.loaded.get(class_id) {
            return students.clone();
        }
        match self.source.get_students(class_id) {
            Ok(students) => {
                self.loaded.insert(class_id.to_string(), students.clone());
                students
            }
            Err(e) => {
                warn!(class_id, error = %e, "failed to load students");
                Vec::new()
            }
        }
    }

    pub fn is_loaded(&self, class_id: &str) -> bool {
        self.loaded.contains_key(class_id)
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
