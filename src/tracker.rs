use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::collection::CollectionStore;
use crate::due::{classify, local_today, Urgency};
use crate::error::{Field, ValidationError};
use crate::persistence::Persistence;
use crate::projection::{project, StatusFilter};
use crate::record::{JobId, JobPatch, JobRecord, JobStatus, NewJob, APPLIED_DATE_FORMAT};
use crate::storage::KeyValueStore;

const NO_APPLICATIONS: &str = "No applications yet";
const NO_MATCHES: &str = "No results match your filters or search";

/// Draft behind the "add application" form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddForm {
    pub company: String,
    pub position: String,
    pub applied_date: String,
    pub due_date: String,
    pub status: JobStatus,
    pub note: String,
    errors: Option<ValidationError>,
}

impl AddForm {
    pub fn empty(today: NaiveDate) -> Self {
        AddForm {
            company: String::new(),
            position: String::new(),
            applied_date: today.format(APPLIED_DATE_FORMAT).to_string(),
            due_date: String::new(),
            status: JobStatus::default(),
            note: String::new(),
            errors: None,
        }
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.as_ref().and_then(|err| err.message_for(field))
    }

    pub fn has_errors(&self) -> bool {
        self.errors.is_some()
    }

    fn to_input(&self) -> NewJob {
        NewJob {
            company: self.company.clone(),
            position: self.position.clone(),
            applied_date: Some(self.applied_date.clone()),
            due_date: Some(self.due_date.clone()),
            status: Some(self.status),
            note: Some(self.note.clone()),
        }
    }
}

/// Unsaved edits of one card. Lives only while the card is in edit mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDraft {
    pub status: JobStatus,
    pub note: String,
    pub due_date: String,
}

impl CardDraft {
    fn from_record(record: &JobRecord) -> Self {
        CardDraft {
            status: record.status,
            note: record.note.clone(),
            due_date: record.due_date.clone().unwrap_or_default(),
        }
    }

    fn differs_from(&self, record: &JobRecord) -> bool {
        self.status != record.status
            || self.note != record.note
            || self.due_date.as_str() != record.due_date.as_deref().unwrap_or("")
    }

    fn into_patch(self) -> JobPatch {
        JobPatch {
            status: self.status,
            note: self.note,
            due_date: Some(self.due_date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCardView {
    pub id: JobId,
    pub position: String,
    pub company: String,
    pub status: JobStatus,
    pub applied_label: String,
    pub due_label: Option<String>,
    pub can_set_due_date: bool,
    pub urgency: Urgency,
    pub urgency_label: Option<&'static str>,
    pub has_note: bool,
    pub note_action: &'static str,
    pub editing: bool,
}

/// Session controller: owns the collection plus all view-only state
/// (filter, search, form and card drafts).
pub struct Tracker<S> {
    jobs: CollectionStore<S>,
    status_filter: StatusFilter,
    search_query: String,
    form: AddForm,
    drafts: HashMap<JobId, CardDraft>,
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn open(persistence: Persistence<S>) -> Self {
        Tracker {
            jobs: CollectionStore::open(persistence),
            status_filter: StatusFilter::All,
            search_query: String::new(),
            form: AddForm::empty(local_today()),
            drafts: HashMap::new(),
        }
    }

    pub fn jobs(&self) -> &CollectionStore<S> {
        &self.jobs
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.status_filter
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.status_filter = filter;
    }

    pub fn status_filters(&self) -> Vec<StatusFilter> {
        StatusFilter::choices()
    }

    pub fn search_query(&self) -> &str {
        self.search_query.as_str()
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn visible(&self) -> Vec<JobRecord> {
        project(self.jobs.records(), self.status_filter, self.search_query.as_str())
    }

    pub fn cards(&self) -> Vec<JobCardView> {
        self.cards_on(local_today())
    }

    /// Card views with urgency computed against `today`.
    pub fn cards_on(&self, today: NaiveDate) -> Vec<JobCardView> {
        self.visible()
            .into_iter()
            .map(|record| self.card_view(record, today))
            .collect()
    }

    pub fn empty_state(&self) -> Option<&'static str> {
        if self.jobs.is_empty() {
            Some(NO_APPLICATIONS)
        } else if self.visible().is_empty() {
            Some(NO_MATCHES)
        } else {
            None
        }
    }

    pub fn form(&self) -> &AddForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut AddForm {
        &mut self.form
    }

    /// Validates and stores the form. On success the form is reset and the
    /// new id returned; on failure the field errors stay on the form.
    pub fn submit_add_form(&mut self) -> Option<JobId> {
        match self.jobs.add(self.form.to_input()) {
            Ok(record) => {
                let id = record.id.clone();
                self.form = AddForm::empty(local_today());
                Some(id)
            }
            Err(err) => {
                debug!(%err, "add form rejected");
                self.form.errors = Some(err);
                None
            }
        }
    }

    pub fn add(&mut self, input: NewJob) -> Result<JobId, ValidationError> {
        self.jobs.add(input).map(|record| record.id.clone())
    }

    pub fn is_editing(&self, id: &JobId) -> bool {
        self.drafts.contains_key(id)
    }

    pub fn begin_edit(&mut self, id: &JobId) -> bool {
        let Some(record) = self.jobs.get(id) else {
            return false;
        };
        let draft = CardDraft::from_record(record);
        self.drafts.entry(id.clone()).or_insert(draft);
        true
    }

    pub fn edit_draft_mut(&mut self, id: &JobId) -> Option<&mut CardDraft> {
        self.drafts.get_mut(id)
    }

    /// Leaves edit mode, writing the draft only if it changed something.
    /// Returns whether the record was updated.
    pub fn save_edit(&mut self, id: &JobId) -> bool {
        let Some(draft) = self.drafts.remove(id) else {
            return false;
        };
        let changed = match self.jobs.get(id) {
            Some(record) => draft.differs_from(record),
            None => false,
        };
        if !changed {
            return false;
        }
        self.jobs.update(id, draft.into_patch())
    }

    pub fn cancel_edit(&mut self, id: &JobId) {
        self.drafts.remove(id);
    }

    pub fn update(&mut self, id: &JobId, patch: JobPatch) -> bool {
        self.jobs.update(id, patch)
    }

    /// Deletes after `confirm` agrees. Unknown ids never reach `confirm`.
    pub fn delete<F>(&mut self, id: &JobId, confirm: F) -> bool
    where
        F: FnOnce(&JobRecord) -> bool,
    {
        let Some(record) = self.jobs.get(id) else {
            return false;
        };
        if !confirm(record) {
            return false;
        }
        self.drafts.remove(id);
        self.jobs.delete(id)
    }

    fn card_view(&self, record: JobRecord, today: NaiveDate) -> JobCardView {
        let urgency = classify(record.due_date.as_deref(), today);
        let applied_label = if record.applied_date.trim().is_empty() {
            "Applied on N/A".to_string()
        } else {
            format!("Applied on {}", record.applied_date)
        };
        let has_note = record.has_note();
        JobCardView {
            editing: self.is_editing(&record.id),
            applied_label,
            due_label: record.due_date.as_ref().map(|due| format!("Due by {due}")),
            can_set_due_date: record.due_date.is_none(),
            urgency,
            urgency_label: urgency.label(),
            has_note,
            note_action: if has_note { "View notes" } else { "Add notes" },
            id: record.id,
            position: record.position,
            company: record.company,
            status: record.status,
        }
    }
}
