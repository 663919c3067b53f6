use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;

use crate::due::parse_due;
use crate::record::{JobRecord, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(JobStatus),
}

impl StatusFilter {
    pub fn matches(self, status: JobStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Only(status) => status.label(),
        }
    }

    /// `All` followed by every status in pipeline order.
    pub fn choices() -> Vec<StatusFilter> {
        std::iter::once(StatusFilter::All)
            .chain(JobStatus::ALL.into_iter().map(StatusFilter::Only))
            .collect()
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Records to display: status filter, then search, then a stable sort by due
/// date with undated (or unparseable) records last.
pub fn project(records: &[JobRecord], filter: StatusFilter, query: &str) -> Vec<JobRecord> {
    let query = query.trim().to_lowercase();
    let mut visible: Vec<JobRecord> = records
        .iter()
        .filter(|record| filter.matches(record.status))
        .filter(|record| query.is_empty() || matches_query(record, query.as_str()))
        .cloned()
        .collect();
    visible.sort_by(|a, b| compare_due(effective_due(a), effective_due(b)));
    visible
}

/// `None` stands for "no usable due date" and orders after every date.
pub fn effective_due(record: &JobRecord) -> Option<NaiveDateTime> {
    record.due_date.as_deref().and_then(parse_due)
}

fn compare_due(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn matches_query(record: &JobRecord, query: &str) -> bool {
    format!("{} {} {}", record.position, record.company, record.note)
        .to_lowercase()
        .contains(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::JobId;

    fn job(id: &str, due: Option<&str>) -> JobRecord {
        JobRecord {
            id: JobId::from(id),
            company: format!("Company {id}"),
            position: "Engineer".to_string(),
            applied_date: "2024-01-01".to_string(),
            due_date: due.map(str::to_string),
            status: JobStatus::Applied,
            note: String::new(),
        }
    }

    fn ids(records: &[JobRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn sorts_by_due_date_and_keeps_undated_in_input_order() {
        let records = vec![
            job("A", Some("2024-01-05")),
            job("B", None),
            job("C", Some("2024-01-01")),
            job("D", None),
        ];
        let visible = project(&records, StatusFilter::All, "");
        assert_eq!(ids(&visible), vec!["C", "A", "B", "D"]);
    }

    #[test]
    fn unparseable_due_dates_sort_last() {
        let records = vec![
            job("bad", Some("someday")),
            job("late", Some("2024-03-01")),
            job("none", None),
            job("early", Some("2024-02-01")),
        ];
        let visible = project(&records, StatusFilter::All, "");
        assert_eq!(ids(&visible), vec!["early", "late", "bad", "none"]);
    }

    #[test]
    fn equal_due_dates_keep_input_order() {
        let records = vec![
            job("first", Some("2024-01-05")),
            job("second", Some("2024-01-05")),
            job("third", Some("2024-01-05")),
        ];
        let visible = project(&records, StatusFilter::All, "");
        assert_eq!(ids(&visible), vec!["first", "second", "third"]);
    }

    #[test]
    fn status_filter_is_exact() {
        let mut offer = job("offer", None);
        offer.status = JobStatus::Offer;
        let records = vec![job("applied", None), offer];
        let visible = project(&records, StatusFilter::Only(JobStatus::Offer), "");
        assert_eq!(ids(&visible), vec!["offer"]);
        assert!(project(&records, StatusFilter::Only(JobStatus::Rejected), "").is_empty());
    }

    #[test]
    fn search_is_case_insensitive_over_position_company_and_note() {
        let mut engineer = job("eng", None);
        engineer.position = "Frontend Engineer".to_string();
        let mut designer = job("des", None);
        designer.position = "Designer".to_string();
        designer.note = "no overlap".to_string();
        let mut noted = job("noted", None);
        noted.position = "Analyst".to_string();
        noted.note = "Ask about ENGINEERING ladder".to_string();
        let records = vec![engineer, designer, noted];

        let visible = project(&records, StatusFilter::All, "  engineer ");
        assert_eq!(ids(&visible), vec!["eng", "noted"]);
        let visible = project(&records, StatusFilter::All, "company des");
        assert_eq!(ids(&visible), vec!["des"]);
    }

    #[test]
    fn search_and_filter_combine() {
        let mut a = job("a", None);
        a.note = "remote".to_string();
        let mut b = job("b", None);
        b.note = "remote".to_string();
        b.status = JobStatus::Rejected;
        let records = vec![a, b];
        let visible = project(&records, StatusFilter::Only(JobStatus::Rejected), "REMOTE");
        assert_eq!(ids(&visible), vec!["b"]);
    }

    #[test]
    fn projection_is_pure_and_idempotent() {
        let records = vec![job("x", None), job("y", Some("2024-01-01"))];
        let snapshot = records.clone();
        let first = project(&records, StatusFilter::All, "engineer");
        let second = project(&records, StatusFilter::All, "engineer");
        assert_eq!(first, second);
        assert_eq!(records, snapshot);
    }

    #[test]
    fn choices_start_with_all() {
        let choices = StatusFilter::choices();
        assert_eq!(choices.len(), 10);
        assert_eq!(choices[0], StatusFilter::All);
        assert_eq!(choices[1].label(), "To Apply");
        assert_eq!(choices[9].to_string(), "Rejected");
    }
}
