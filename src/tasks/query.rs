//! Query engine: composable task criteria, ordering, pagination and statistics.
//!
//! Criteria are AND-combined; an unset criterion imposes no constraint. Most
//! criteria compile to a SQL `WHERE` clause. The keyword match runs in Rust so
//! case folding covers non-ASCII text.

use crate::error::Result;
use crate::tasks::dates::to_storage;
use crate::tasks::models::{Priority, Status, Task, TaskDetails};
use crate::tasks::store::{CategoryRef, Session, TASK_COLUMNS};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Bucket name for tasks without a category in statistics.
pub const NO_CATEGORY: &str = "[No Category]";

/// Sort key for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Creation time, oldest first.
    #[default]
    Created,
    /// Last modification time, oldest first.
    Updated,
    /// Due date, soonest first; tasks without one last.
    Due,
    /// Priority, high first.
    Priority,
    /// Title, case-insensitive.
    Title,
}

impl SortKey {
    /// Parse a sort key name.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown names.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "created" | "created_at" => Ok(Self::Created),
            "updated" | "updated_at" => Ok(Self::Updated),
            "due" | "due_at" | "due_date" => Ok(Self::Due),
            "priority" => Ok(Self::Priority),
            "title" => Ok(Self::Title),
            _ => Err(crate::error::Error::validation(format!(
                "invalid sort key '{s}' (must be one of: created, updated, due, priority, title)"
            ))),
        }
    }

    fn order_by(self, reverse: bool) -> String {
        let dir = if reverse { "DESC" } else { "ASC" };
        match self {
            Self::Created => format!("t.created_at {dir}, t.id ASC"),
            Self::Updated => format!("t.updated_at {dir}, t.id ASC"),
            Self::Due => format!("(t.due_at IS NULL) ASC, t.due_at {dir}, t.id ASC"),
            Self::Priority => format!(
                "CASE t.priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END {dir}, t.id ASC"
            ),
            Self::Title => format!("t.title COLLATE NOCASE {dir}, t.id ASC"),
        }
    }
}

/// Criteria for selecting tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Exact status.
    pub status: Option<Status>,
    /// Exact priority.
    pub priority: Option<Priority>,
    /// Category by id or name.
    pub category: Option<CategoryRef>,
    /// Only tasks without a category.
    pub no_category: bool,
    /// Tasks carrying all of these tags.
    pub tags: Vec<String>,
    /// Only tasks without tags.
    pub no_tags: bool,
    /// Case-insensitive substring of title or description.
    pub keyword: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
    /// Inclusive lower bound on `due_at`.
    pub due_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `due_at`.
    pub due_before: Option<DateTime<Utc>>,
    /// Inclusive lower bound on `completed_at`.
    pub completed_after: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `completed_at`.
    pub completed_before: Option<DateTime<Utc>>,
    /// Only tasks past due and not completed.
    pub overdue: bool,
    /// Ordering.
    pub sort: SortKey,
    /// Reverse the primary ordering. Ties still break by ascending id.
    pub reverse: bool,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Number of results to skip.
    pub offset: usize,
}

impl TaskQuery {
    /// A query matching every task.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// This query without pagination.
    #[must_use]
    pub fn unpaged(&self) -> Self {
        Self { limit: None, offset: 0, ..self.clone() }
    }

    /// Build the `WHERE` clause and its parameters.
    fn where_clause(&self, now: DateTime<Utc>) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = self.status {
            conditions.push("t.status = ?".into());
            params_vec.push(Box::new(status.as_str()));
        }

        if let Some(priority) = self.priority {
            conditions.push("t.priority = ?".into());
            params_vec.push(Box::new(priority.as_str()));
        }

        match &self.category {
            Some(CategoryRef::Id(id)) => {
                conditions.push("t.category_id = ?".into());
                params_vec.push(Box::new(*id));
            }
            Some(CategoryRef::Name(name)) => {
                conditions.push("t.category_id IN (SELECT id FROM categories WHERE name = ?)".into());
                params_vec.push(Box::new(name.trim().to_string()));
            }
            Some(CategoryRef::NameOrId(name, id)) => {
                conditions.push(
                    "t.category_id = COALESCE((SELECT id FROM categories WHERE name = ?), ?)".into(),
                );
                params_vec.push(Box::new(name.clone()));
                params_vec.push(Box::new(*id));
            }
            None => {}
        }

        if self.no_category {
            conditions.push("t.category_id IS NULL".into());
        }

        let tags: BTreeSet<&str> =
            self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
        if !tags.is_empty() {
            let placeholders = vec!["?"; tags.len()].join(", ");
            conditions.push(format!(
                "t.id IN (SELECT tt.task_id FROM task_tags tt JOIN tags g ON g.id = tt.tag_id
                          WHERE g.name IN ({placeholders})
                          GROUP BY tt.task_id HAVING COUNT(DISTINCT g.id) = ?)"
            ));
            for tag in &tags {
                params_vec.push(Box::new((*tag).to_string()));
            }
            params_vec.push(Box::new(i64::try_from(tags.len()).unwrap_or(i64::MAX)));
        }

        if self.no_tags {
            conditions.push("NOT EXISTS (SELECT 1 FROM task_tags tt WHERE tt.task_id = t.id)".into());
        }

        let ranges = [
            ("t.created_at >= ?", self.created_after),
            ("t.created_at <= ?", self.created_before),
            ("t.due_at >= ?", self.due_after),
            ("t.due_at <= ?", self.due_before),
            ("t.completed_at >= ?", self.completed_after),
            ("t.completed_at <= ?", self.completed_before),
        ];
        for (condition, bound) in ranges {
            if let Some(bound) = bound {
                conditions.push(condition.into());
                params_vec.push(Box::new(to_storage(bound)));
            }
        }

        if self.overdue {
            conditions.push(
                "t.due_at IS NOT NULL AND t.due_at < ? AND t.status != 'completed'".into(),
            );
            params_vec.push(Box::new(to_storage(now)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (where_clause, params_vec)
    }

    fn keyword_matches(&self, task: &Task) -> bool {
        let Some(keyword) = self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty())
        else {
            return true;
        };
        let needle = keyword.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

/// Run a query, returning matching tasks in order.
///
/// No matches is an empty result, not an error.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn search(session: &Session<'_>, query: &TaskQuery, now: DateTime<Utc>) -> Result<Vec<Task>> {
    let (where_clause, params_vec) = query.where_clause(now);
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks t {where_clause} ORDER BY {}",
        query.sort.order_by(query.reverse)
    );

    let params: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(AsRef::as_ref).collect();
    let mut stmt = session.conn().prepare(&sql)?;
    let rows = stmt.query_map(params.as_slice(), Session::parse_task)?;

    let mut tasks = Vec::new();
    for row in rows {
        let task = row?;
        if query.keyword_matches(&task) {
            tasks.push(task);
        }
    }

    let limit = query.limit.unwrap_or(usize::MAX);
    Ok(tasks.into_iter().skip(query.offset).take(limit).collect())
}

/// Run a query and resolve each task's category and tags.
///
/// # Errors
///
/// Returns an error on database failure.
pub fn search_details(
    session: &Session<'_>,
    query: &TaskQuery,
    now: DateTime<Utc>,
) -> Result<Vec<TaskDetails>> {
    let tasks = search(session, query, now)?;
    session.details_many(tasks)
}

/// Counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Pending tasks.
    pub pending: usize,
    /// In-progress tasks.
    pub in_progress: usize,
    /// Completed tasks.
    pub completed: usize,
}

/// Counts per priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    /// High priority.
    pub high: usize,
    /// Medium priority.
    pub medium: usize,
    /// Low priority.
    pub low: usize,
}

/// Task counts for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    /// Category name, or [`NO_CATEGORY`].
    pub name: String,
    /// All tasks in the category.
    pub total: usize,
    /// Completed tasks in the category.
    pub completed: usize,
    /// Overdue tasks in the category.
    pub overdue: usize,
}

/// Aggregate statistics over a set of tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStats {
    /// Number of tasks considered.
    pub total: usize,
    /// Counts per status.
    pub by_status: StatusCounts,
    /// Counts per priority.
    pub by_priority: PriorityCounts,
    /// Counts per category, by name, with the uncategorized bucket last.
    pub by_category: Vec<CategoryCounts>,
    /// Past due and not completed.
    pub overdue: usize,
    /// Due today (UTC) and not completed.
    pub due_today: usize,
    /// High priority and not completed.
    pub high_priority_open: usize,
    /// Completed share of all tasks, in percent.
    pub completion_rate: f64,
    /// Created in the last 7 days.
    pub created_last_7_days: usize,
    /// Completed in the last 7 days.
    pub completed_last_7_days: usize,
}

impl TaskStats {
    /// Compute statistics over already-selected tasks.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_tasks(tasks: &[TaskDetails], now: DateTime<Utc>) -> Self {
        let week_ago = now - Duration::days(7);
        let today = now.date_naive();

        let mut by_status = StatusCounts::default();
        let mut by_priority = PriorityCounts::default();
        let mut categories: std::collections::BTreeMap<String, CategoryCounts> =
            std::collections::BTreeMap::new();
        let mut uncategorized =
            CategoryCounts { name: NO_CATEGORY.to_string(), total: 0, completed: 0, overdue: 0 };
        let (mut overdue, mut due_today, mut high_open, mut created_recent, mut completed_recent) =
            (0, 0, 0, 0, 0);

        for details in tasks {
            let task = &details.task;
            let done = task.status == Status::Completed;
            let is_overdue = task.is_overdue(now);

            match task.status {
                Status::Pending => by_status.pending += 1,
                Status::InProgress => by_status.in_progress += 1,
                Status::Completed => by_status.completed += 1,
            }
            match task.priority {
                Priority::High => by_priority.high += 1,
                Priority::Medium => by_priority.medium += 1,
                Priority::Low => by_priority.low += 1,
            }

            let bucket = match &details.category {
                Some(category) => categories.entry(category.name.clone()).or_insert_with(|| {
                    CategoryCounts { name: category.name.clone(), total: 0, completed: 0, overdue: 0 }
                }),
                None => &mut uncategorized,
            };
            bucket.total += 1;
            bucket.completed += usize::from(done);
            bucket.overdue += usize::from(is_overdue);

            overdue += usize::from(is_overdue);
            if !done && task.due_at.is_some_and(|d| d.date_naive() == today) {
                due_today += 1;
            }
            if !done && task.priority == Priority::High {
                high_open += 1;
            }
            if task.created_at >= week_ago {
                created_recent += 1;
            }
            if task.completed_at.is_some_and(|c| c >= week_ago) {
                completed_recent += 1;
            }
        }

        let mut by_category: Vec<CategoryCounts> = categories.into_values().collect();
        if uncategorized.total > 0 {
            by_category.push(uncategorized);
        }

        let total = tasks.len();
        let completion_rate = if total == 0 {
            0.0
        } else {
            (by_status.completed as f64 / total as f64 * 1000.0).round() / 10.0
        };

        Self {
            total,
            by_status,
            by_priority,
            by_category,
            overdue,
            due_today,
            high_priority_open: high_open,
            completion_rate,
            created_last_7_days: created_recent,
            completed_last_7_days: completed_recent,
        }
    }
}

/// Statistics over the tasks selected by `query` (pagination ignored).
///
/// # Errors
///
/// Returns an error on database failure.
pub fn stats(session: &Session<'_>, query: &TaskQuery, now: DateTime<Utc>) -> Result<TaskStats> {
    let tasks = search_details(session, &query.unpaged(), now)?;
    Ok(TaskStats::from_tasks(&tasks, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::store::{SqliteTaskStore, TaskDraft, TaskState};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteTaskStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteTaskStore::new(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    struct Seed<'a> {
        title: &'a str,
        day: u32,
        priority: Priority,
        category: Option<&'a str>,
        tags: &'a [&'a str],
        due: Option<u32>,
        status: Status,
    }

    fn seed(title: &str, day: u32) -> Seed<'_> {
        Seed {
            title,
            day,
            priority: Priority::Medium,
            category: None,
            tags: &[],
            due: None,
            status: Status::Pending,
        }
    }

    fn insert(store: &SqliteTaskStore, s: &Seed<'_>) -> Task {
        store
            .write(|session| {
                let mut draft = TaskDraft::new(s.title, at(s.day));
                draft.priority = s.priority;
                draft.due_at = s.due.map(at);
                if let Some(name) = s.category {
                    let category = match session.find_category_by_name(name)? {
                        Some(c) => c,
                        None => session.insert_category(name, None, None)?,
                    };
                    draft.category_id = Some(category.id);
                }
                let task = session.insert_task(&draft)?;
                for name in s.tags {
                    let tag = match session.find_tag_by_name(name)? {
                        Some(t) => t,
                        None => session.insert_tag(name, None)?,
                    };
                    session.attach_tag(task.id, tag.id)?;
                }
                let task = match s.status {
                    Status::Pending => task,
                    Status::InProgress => session.set_state(
                        task.id,
                        &TaskState { status: s.status, started_at: Some(at(s.day)), completed_at: None },
                        at(s.day),
                    )?,
                    Status::Completed => session.set_state(
                        task.id,
                        &TaskState { status: s.status, started_at: None, completed_at: Some(at(s.day)) },
                        at(s.day),
                    )?,
                };
                Ok(task)
            })
            .unwrap()
    }

    fn titles(store: &SqliteTaskStore, query: &TaskQuery, now: DateTime<Utc>) -> Vec<String> {
        store
            .read(|s| search(s, query, now))
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect()
    }

    #[test]
    fn test_empty_criteria_returns_all_in_creation_order() {
        let (_dir, store) = create_test_store();
        insert(&store, &seed("B", 2));
        insert(&store, &seed("A", 1));
        insert(&store, &seed("C", 2));
        assert_eq!(titles(&store, &TaskQuery::all(), at(20)), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_empty_store_returns_empty() {
        let (_dir, store) = create_test_store();
        assert!(titles(&store, &TaskQuery::all(), at(1)).is_empty());
        let q = TaskQuery { tags: vec!["missing".into()], ..Default::default() };
        assert!(titles(&store, &q, at(1)).is_empty());
    }

    #[test]
    fn test_status_and_priority_are_and_combined() {
        let (_dir, store) = create_test_store();
        insert(&store, &Seed { priority: Priority::High, ..seed("high pending", 1) });
        insert(&store, &Seed { priority: Priority::High, status: Status::Completed, ..seed("high done", 2) });
        insert(&store, &seed("medium pending", 3));

        let q = TaskQuery { status: Some(Status::Pending), priority: Some(Priority::High), ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["high pending"]);
    }

    #[test]
    fn test_tags_use_intersection() {
        let (_dir, store) = create_test_store();
        insert(&store, &Seed { tags: &["urgent", "work"], ..seed("both", 1) });
        insert(&store, &Seed { tags: &["urgent"], ..seed("urgent only", 2) });
        insert(&store, &Seed { tags: &["work", "home"], ..seed("work only", 3) });
        insert(&store, &Seed { tags: &["home", "urgent", "work"], ..seed("all three", 4) });

        let q = TaskQuery { tags: vec!["urgent".into(), "work".into()], ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["both", "all three"]);

        // Repeating a tag does not change the result.
        let q = TaskQuery { tags: vec!["work".into(), "work".into(), "urgent".into()], ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["both", "all three"]);

        let q = TaskQuery { no_tags: true, ..Default::default() };
        assert!(titles(&store, &q, at(20)).is_empty());
    }

    #[test]
    fn test_category_by_id_or_name() {
        let (_dir, store) = create_test_store();
        let work = insert(&store, &Seed { category: Some("Work"), ..seed("report", 1) });
        insert(&store, &Seed { category: Some("Home"), ..seed("dishes", 2) });
        insert(&store, &seed("loose", 3));

        let by_name = TaskQuery { category: Some(CategoryRef::Name("Work".into())), ..Default::default() };
        assert_eq!(titles(&store, &by_name, at(20)), vec!["report"]);

        let by_id = TaskQuery { category: Some(CategoryRef::Id(work.category_id.unwrap())), ..Default::default() };
        assert_eq!(titles(&store, &by_id, at(20)), vec!["report"]);

        let missing = TaskQuery { category: Some(CategoryRef::Name("Nope".into())), ..Default::default() };
        assert!(titles(&store, &missing, at(20)).is_empty());

        let none = TaskQuery { no_category: true, ..Default::default() };
        assert_eq!(titles(&store, &none, at(20)), vec!["loose"]);
    }

    #[test]
    fn test_numeric_category_filter_prefers_name() {
        let (_dir, store) = create_test_store();
        insert(&store, &Seed { category: Some("Work"), ..seed("report", 1) });
        insert(&store, &Seed { category: Some("Home"), ..seed("dishes", 2) });
        insert(&store, &Seed { category: Some("1"), ..seed("numbered", 3) });

        let by = |input: &str| TaskQuery { category: Some(CategoryRef::parse(input)), ..Default::default() };
        assert_eq!(titles(&store, &by("1"), at(20)), vec!["numbered"]);
        assert_eq!(titles(&store, &by("2"), at(20)), vec!["dishes"]);
        assert!(titles(&store, &by("42"), at(20)).is_empty());
    }

    #[test]
    fn test_keyword_is_case_insensitive_over_title_and_description() {
        let (_dir, store) = create_test_store();
        insert(&store, &seed("Write REPORT", 1));
        let other = insert(&store, &seed("Call Ünal", 2));
        store
            .write(|s| {
                s.update_task(
                    other.id,
                    &crate::tasks::store::TaskUpdate {
                        description: Some(Some("about the report".into())),
                        ..Default::default()
                    },
                    at(2),
                )
            })
            .unwrap();
        insert(&store, &seed("Unrelated", 3));

        let q = TaskQuery { keyword: Some("report".into()), ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["Write REPORT", "Call Ünal"]);

        let q = TaskQuery { keyword: Some("ÜNAL".into()), ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["Call Ünal"]);
    }

    #[test]
    fn test_date_ranges_are_inclusive() {
        let (_dir, store) = create_test_store();
        insert(&store, &Seed { due: Some(5), ..seed("d5", 1) });
        insert(&store, &Seed { due: Some(10), ..seed("d10", 2) });
        insert(&store, &seed("no due", 3));

        let q = TaskQuery { due_after: Some(at(5)), due_before: Some(at(10)), ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["d5", "d10"]);

        let q = TaskQuery { created_after: Some(at(2)), created_before: Some(at(2)), ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["d10"]);
    }

    #[test]
    fn test_overdue_uses_clock_and_excludes_completed() {
        let (_dir, store) = create_test_store();
        insert(&store, &Seed { due: Some(5), ..seed("late", 1) });
        insert(&store, &Seed { due: Some(5), status: Status::Completed, ..seed("late but done", 1) });
        insert(&store, &Seed { due: Some(5), status: Status::InProgress, ..seed("late in progress", 2) });
        insert(&store, &Seed { due: Some(15), ..seed("future", 2) });
        insert(&store, &seed("no due", 3));

        let q = TaskQuery { overdue: true, ..Default::default() };
        assert_eq!(titles(&store, &q, at(10)), vec!["late", "late in progress"]);
        // Due exactly now is not overdue.
        assert!(titles(&store, &q, at(5)).is_empty());
    }

    #[test]
    fn test_sorting_and_reverse_keep_id_tiebreak() {
        let (_dir, store) = create_test_store();
        insert(&store, &Seed { priority: Priority::Low, due: Some(9), ..seed("b low", 1) });
        insert(&store, &Seed { priority: Priority::High, ..seed("a high", 2) });
        insert(&store, &Seed { priority: Priority::High, due: Some(3), ..seed("c high", 3) });

        let q = TaskQuery { sort: SortKey::Priority, ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["a high", "c high", "b low"]);

        let q = TaskQuery { sort: SortKey::Priority, reverse: true, ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["b low", "a high", "c high"]);

        let q = TaskQuery { sort: SortKey::Due, ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["c high", "b low", "a high"]);

        let q = TaskQuery { sort: SortKey::Title, reverse: true, ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["c high", "b low", "a high"]);
    }

    #[test]
    fn test_limit_and_offset() {
        let (_dir, store) = create_test_store();
        for day in 1..=5 {
            insert(&store, &seed(&format!("t{day}"), day));
        }
        let q = TaskQuery { limit: Some(2), offset: 1, ..Default::default() };
        assert_eq!(titles(&store, &q, at(20)), vec!["t2", "t3"]);
        let q = TaskQuery { offset: 10, ..Default::default() };
        assert!(titles(&store, &q, at(20)).is_empty());
    }

    #[test]
    fn test_sort_key_from_str() {
        assert_eq!(SortKey::from_str("due_date").unwrap(), SortKey::Due);
        assert_eq!(SortKey::from_str("Priority").unwrap(), SortKey::Priority);
        assert!(SortKey::from_str("random").is_err());
    }

    #[test]
    fn test_stats_counts() {
        let (_dir, store) = create_test_store();
        insert(&store, &Seed { category: Some("Work"), priority: Priority::High, due: Some(5), ..seed("a", 1) });
        insert(&store, &Seed { category: Some("Work"), status: Status::Completed, ..seed("b", 8) });
        insert(&store, &Seed { status: Status::InProgress, due: Some(10), ..seed("c", 9) });
        insert(&store, &seed("d", 9));

        let stats = store.read(|s| stats(s, &TaskQuery::all(), at(10))).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_status, StatusCounts { pending: 2, in_progress: 1, completed: 1 });
        assert_eq!(stats.by_priority, PriorityCounts { high: 1, medium: 3, low: 0 });
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.due_today, 1);
        assert_eq!(stats.high_priority_open, 1);
        assert!((stats.completion_rate - 25.0).abs() < f64::EPSILON);
        assert_eq!(stats.created_last_7_days, 3);
        assert_eq!(stats.completed_last_7_days, 1);

        assert_eq!(stats.by_category.len(), 2);
        assert_eq!(stats.by_category[0], CategoryCounts { name: "Work".into(), total: 2, completed: 1, overdue: 1 });
        assert_eq!(stats.by_category[1].name, NO_CATEGORY);
        assert_eq!(stats.by_category[1].total, 2);
    }

    #[test]
    fn test_stats_respect_criteria_and_ignore_paging() {
        let (_dir, store) = create_test_store();
        insert(&store, &Seed { tags: &["x"], ..seed("a", 1) });
        insert(&store, &Seed { tags: &["x"], ..seed("b", 2) });
        insert(&store, &seed("c", 3));

        let q = TaskQuery { tags: vec!["x".into()], limit: Some(1), ..Default::default() };
        let stats = store.read(|s| stats(s, &q, at(10))).unwrap();
        assert_eq!(stats.total, 2);

        let empty = TaskStats::from_tasks(&[], at(10));
        assert_eq!(empty.total, 0);
        assert!(empty.completion_rate.abs() < f64::EPSILON);
        assert!(empty.by_category.is_empty());
    }
}
