//! Model types for tasks, categories and tags.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum length of a task title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length of a category or tag name, in characters.
pub const MAX_NAME_LEN: usize = 50;

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());

/// Task priority levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority (default).
    #[default]
    Medium,
    /// High priority.
    High,
}

impl Priority {
    /// All priorities, lowest first.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Parse a priority from a string (`low`/`l`, `medium`/`m`, `high`/`h`).
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid priority.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> std::result::Result<Self, InvalidPriority> {
        match s.trim().to_lowercase().as_str() {
            "low" | "l" => Ok(Self::Low),
            "medium" | "m" => Ok(Self::Medium),
            "high" | "h" => Ok(Self::High),
            _ => Err(InvalidPriority(s.to_string())),
        }
    }

    /// Get the string representation of the priority.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid priority string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPriority(pub String);

impl std::fmt::Display for InvalidPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid priority: '{}' (must be one of: low, medium, high)", self.0)
    }
}

impl std::error::Error for InvalidPriority {}

impl From<InvalidPriority> for Error {
    fn from(err: InvalidPriority) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Task status.
///
/// Transitions only move forward: pending, then in progress, then completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Task has been created but not started.
    #[default]
    Pending,
    /// Task is being worked on.
    InProgress,
    /// Task is done. Terminal.
    Completed,
}

impl Status {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    /// Parse a status from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid status.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> std::result::Result<Self, InvalidStatus> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "p" => Ok(Self::Pending),
            "in_progress" | "in-progress" | "i" => Ok(Self::InProgress),
            "completed" | "c" => Ok(Self::Completed),
            _ => Err(InvalidStatus(s.to_string())),
        }
    }

    /// Get the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Whether `start` is allowed from this status.
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether `complete` is allowed from this status.
    #[must_use]
    pub const fn can_complete(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid status string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl std::fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid status: '{}' (must be one of: pending, in_progress, completed)",
            self.0
        )
    }
}

impl std::error::Error for InvalidStatus {}

impl From<InvalidStatus> for Error {
    fn from(err: InvalidStatus) -> Self {
        Self::Validation(err.to_string())
    }
}

/// A task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, assigned by the store.
    pub id: i64,
    /// Short title. Never empty.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Current lifecycle status.
    pub status: Status,
    /// Priority level.
    pub priority: Priority,
    /// Category reference, cleared when the category is deleted.
    pub category_id: Option<i64>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last modified.
    pub updated_at: DateTime<Utc>,
    /// When the task was started.
    pub started_at: Option<DateTime<Utc>>,
    /// Optional due date.
    pub due_at: Option<DateTime<Utc>>,
    /// When the task was completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Whether the task is past due at `now` and not yet completed.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != Status::Completed && self.due_at.is_some_and(|due| due < now)
    }
}

/// A category grouping tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier.
    pub id: i64,
    /// Unique name (case-sensitive).
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional display color (`#RRGGBB`).
    pub color: Option<String>,
}

/// A tag that can annotate many tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier.
    pub id: i64,
    /// Unique name (case-sensitive).
    pub name: String,
    /// Optional display color (`#RRGGBB`).
    pub color: Option<String>,
}

/// A task together with its resolved category and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    /// The task row.
    #[serde(flatten)]
    pub task: Task,
    /// The task's category, if any.
    pub category: Option<Category>,
    /// The task's tags, sorted by name.
    pub tags: Vec<Tag>,
}

impl TaskDetails {
    /// Names of the attached tags.
    #[must_use]
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

/// A category or tag with the number of tasks referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithCount<T> {
    /// The entity.
    #[serde(flatten)]
    pub item: T,
    /// Number of tasks referencing it.
    pub task_count: i64,
}

/// Validate and normalize a task title.
///
/// # Errors
///
/// Returns a validation error if the title is empty or too long.
pub fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::validation("task title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::validation(format!(
            "task title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

/// Validate and normalize a category or tag name.
///
/// # Errors
///
/// Returns a validation error if the name is empty or too long.
pub fn validate_name(entity: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(format!("{entity} name must not be empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "{entity} name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Validate a display color.
///
/// # Errors
///
/// Returns a validation error unless the color has the form `#RRGGBB`.
pub fn validate_color(color: &str) -> Result<String> {
    let color = color.trim();
    if HEX_COLOR.is_match(color) {
        Ok(color.to_string())
    } else {
        Err(Error::validation(format!("invalid color '{color}': expected a hex code like #FF5733")))
    }
}

/// Normalize an optional free-text field: blank becomes `None`, anything
/// else is kept as written.
pub(crate) fn non_blank(text: Option<&str>) -> Option<String> {
    text.filter(|s| !s.trim().is_empty()).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn sample_task() -> Task {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        Task {
            id: 1,
            title: "Write report".to_string(),
            description: None,
            status: Status::Pending,
            priority: Priority::High,
            category_id: None,
            created_at: created,
            updated_at: created,
            started_at: None,
            due_at: Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()),
            completed_at: None,
        }
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!(Priority::from_str("low").unwrap(), Priority::Low);
        assert_eq!(Priority::from_str("HIGH").unwrap(), Priority::High);
        assert_eq!(Priority::from_str("m").unwrap(), Priority::Medium);
        assert_eq!(Priority::from_str(" h ").unwrap(), Priority::High);
        assert!(Priority::from_str("urgent").is_err());
        assert!(Priority::from_str("").is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(Status::from_str("pending").unwrap(), Status::Pending);
        assert_eq!(Status::from_str("in-progress").unwrap(), Status::InProgress);
        assert_eq!(Status::from_str("IN_PROGRESS").unwrap(), Status::InProgress);
        assert_eq!(Status::from_str("c").unwrap(), Status::Completed);
        assert!(Status::from_str("done").is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(Status::Pending.can_start());
        assert!(!Status::InProgress.can_start());
        assert!(!Status::Completed.can_start());
        assert!(Status::Pending.can_complete());
        assert!(Status::InProgress.can_complete());
        assert!(!Status::Completed.can_complete());
    }

    #[test]
    fn test_invalid_status_display() {
        let err = InvalidStatus("foo".to_string());
        assert!(err.to_string().contains("foo"));
        assert!(err.to_string().contains("pending"));
    }

    #[test]
    fn test_parse_errors_become_validation() {
        let err: Error = Priority::from_str("x").unwrap_err().into();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_task_is_overdue() {
        let mut task = sample_task();
        let before = Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();
        assert!(!task.is_overdue(before));
        assert!(task.is_overdue(after));

        task.status = Status::Completed;
        assert!(!task.is_overdue(after));

        task.status = Status::Pending;
        task.due_at = None;
        assert!(!task.is_overdue(after));
    }

    #[test]
    fn test_task_serialization() {
        let task = sample_task();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["priority"], "high");
        let parsed: Task = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, task);
    }

    #[test]
    fn test_details_flatten_task_fields() {
        let details = TaskDetails {
            task: sample_task(),
            category: None,
            tags: vec![Tag { id: 2, name: "work".into(), color: None }],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["title"], "Write report");
        assert_eq!(json["tags"][0]["name"], "work");
        assert_eq!(details.tag_names(), vec!["work"]);
    }

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  Buy milk ").unwrap(), "Buy milk");
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_color() {
        assert_eq!(validate_color("#FF5733").unwrap(), "#FF5733");
        assert_eq!(validate_color("#00ff00").unwrap(), "#00ff00");
        assert!(validate_color("red").is_err());
        assert!(validate_color("#FFF").is_err());
        assert!(validate_color("FF5733").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" a ")), Some(" a ".to_string()));
        assert_eq!(non_blank(None), None);
    }

    proptest! {
        #[test]
        fn prop_priority_round_trips(p in prop::sample::select(Priority::ALL.to_vec())) {
            prop_assert_eq!(Priority::from_str(p.as_str()).unwrap(), p);
        }

        #[test]
        fn prop_status_round_trips(s in prop::sample::select(Status::ALL.to_vec())) {
            prop_assert_eq!(Status::from_str(s.as_str()).unwrap(), s);
            prop_assert_eq!(Status::from_str(&s.as_str().to_uppercase()).unwrap(), s);
        }

        #[test]
        fn prop_validated_title_is_trimmed(t in "[ ]{0,3}[a-z]{1,20}[ ]{0,3}") {
            let v = validate_title(&t).unwrap();
            prop_assert_eq!(v.as_str(), t.trim());
        }
    }
}
