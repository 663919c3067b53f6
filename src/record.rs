use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Field, FieldError, ValidationError};

pub const APPLIED_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "To Apply")]
    ToApply,
    Applied,
    #[serde(rename = "Video Interview")]
    VideoInterview,
    Assessments,
    #[serde(rename = "Video + Assessments")]
    VideoAndAssessments,
    #[serde(rename = "HR Interview")]
    HrInterview,
    #[serde(rename = "Technical Interview")]
    TechnicalInterview,
    Offer,
    Rejected,
}

impl JobStatus {
    /// Pipeline order; the first entry is the status of a fresh record.
    pub const ALL: [JobStatus; 9] = [
        JobStatus::ToApply,
        JobStatus::Applied,
        JobStatus::VideoInterview,
        JobStatus::Assessments,
        JobStatus::VideoAndAssessments,
        JobStatus::HrInterview,
        JobStatus::TechnicalInterview,
        JobStatus::Offer,
        JobStatus::Rejected,
    ];

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::ToApply => "To Apply",
            JobStatus::Applied => "Applied",
            JobStatus::VideoInterview => "Video Interview",
            JobStatus::Assessments => "Assessments",
            JobStatus::VideoAndAssessments => "Video + Assessments",
            JobStatus::HrInterview => "HR Interview",
            JobStatus::TechnicalInterview => "Technical Interview",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.label() == value)
            .ok_or_else(|| format!("unknown job status: {value}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        JobId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        JobId(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        JobId(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// One tracked application as it is stored.
///
/// Every field has a serde default so blobs written by older versions (or
/// missing optional fields) still load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRecord {
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub id: JobId,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub company: String,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub position: String,
    #[serde(alias = "date", deserialize_with = "deserialize_lenient_string")]
    pub applied_date: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_due_date"
    )]
    pub due_date: Option<String>,
    #[serde(deserialize_with = "deserialize_status_or_default")]
    pub status: JobStatus,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub note: String,
}

/// Input of the add operation. Everything except company and position is
/// optional and falls back to the creation defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewJob {
    pub company: String,
    pub position: String,
    pub applied_date: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<JobStatus>,
    pub note: Option<String>,
}

impl NewJob {
    pub fn new(company: impl Into<String>, position: impl Into<String>) -> Self {
        NewJob {
            company: company.into(),
            position: position.into(),
            ..NewJob::default()
        }
    }

    pub fn applied_date(mut self, date: impl Into<String>) -> Self {
        self.applied_date = Some(date.into());
        self
    }

    pub fn due_date(mut self, date: impl Into<String>) -> Self {
        self.due_date = Some(date.into());
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Replacement values for the mutable fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobPatch {
    pub status: JobStatus,
    pub note: String,
    #[serde(deserialize_with = "deserialize_due_date")]
    pub due_date: Option<String>,
}

impl JobRecord {
    pub fn create(input: NewJob, today: NaiveDate) -> Result<JobRecord, ValidationError> {
        validate(&input)?;
        Ok(JobRecord {
            id: JobId::generate(),
            company: input.company,
            position: input.position,
            applied_date: input
                .applied_date
                .unwrap_or_else(|| today.format(APPLIED_DATE_FORMAT).to_string()),
            due_date: normalize_due_date(input.due_date),
            status: input.status.unwrap_or_default(),
            note: input.note.unwrap_or_default(),
        })
    }

    pub fn apply(&mut self, patch: JobPatch) {
        self.status = patch.status;
        self.note = patch.note;
        self.due_date = normalize_due_date(patch.due_date);
    }

    pub fn has_note(&self) -> bool {
        !self.note.trim().is_empty()
    }
}

fn validate(input: &NewJob) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    if input.company.trim().is_empty() {
        errors.push(FieldError {
            field: Field::Company,
            message: "Company name is required.".to_string(),
        });
    }
    if input.position.trim().is_empty() {
        errors.push(FieldError {
            field: Field::Position,
            message: "Position is required.".to_string(),
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}

/// A blank due date is the same as none at all.
pub fn normalize_due_date(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_due_date(value))
}

// Stored blobs are not validated per record: null becomes the default and
// numbers or booleans keep their text form.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn deserialize_lenient_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::from(scalar_text(value).unwrap_or_default()))
}

fn deserialize_lenient_due_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_due_date(scalar_text(value)))
}

/// Only a status outside the closed set fails; a null one is the default.
fn deserialize_status_or_default<'de, D>(deserializer: D) -> Result<JobStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<JobStatus>::deserialize(deserializer)?.unwrap_or_default())
}
