use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::profile::ProfileSnapshot;

/// Employee numbers shorter than this are rejected before any store lookup.
pub const MIN_EMPLOYEE_NUMBER_LEN: usize = 5;

/// Who is using the session. `employee_number` is the store key; `name` is advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub employee_number: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, employee_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            employee_number: employee_number.into(),
        }
    }
}

/// The persisted unit, one per employee number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub employee_number: String,
    pub name: String,
    pub last_interaction: DateTime<Utc>,
    pub profile: ProfileSnapshot,
    /// Output of the latest recommendation request.
    pub recommendations: Option<String>,
}
