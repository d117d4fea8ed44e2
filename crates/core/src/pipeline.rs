use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::{SortKey, StatusFilter, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub query: String,
    pub status: StatusFilter,
    pub sort: SortKey,
}

impl TaskQuery {
    pub fn new(query: impl Into<String>, status: StatusFilter, sort: SortKey) -> Self {
        Self {
            query: query.into(),
            status,
            sort,
        }
    }

    /// True when search or status hides part of the list. Sorting never does.
    pub fn is_filtered(&self) -> bool {
        !self.query.trim().is_empty() || self.status != StatusFilter::All
    }
}

/// Search, then filter by status, then sort.
pub fn apply(tasks: &[Task], query: &TaskQuery) -> Vec<Task> {
    let needle = query.query.trim().to_lowercase();
    let mut visible: Vec<Task> = tasks
        .iter()
        .filter(|task| needle.is_empty() || matches_search(task, &needle))
        .filter(|task| query.status.matches(task))
        .cloned()
        .collect();
    sort_tasks(&mut visible, query.sort);
    visible
}

/// Case-insensitive substring match on title or description.
/// `needle` must already be lowercased.
pub fn matches_search(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle) || task.description.to_lowercase().contains(needle)
}

/// Stable sort; equal keys keep the order the store supplied.
pub fn sort_tasks(tasks: &mut [Task], key: SortKey) {
    match key {
        SortKey::Title => tasks.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortKey::DueDate => tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(left), Some(right)) => left.cmp(&right),
        }),
        SortKey::Priority => tasks.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank())),
        SortKey::CreatedAt => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

/// Accent- and case-insensitive first, then case-insensitive, then code points.
fn compare_titles(left: &str, right: &str) -> Ordering {
    collation_key(left)
        .cmp(&collation_key(right))
        .then_with(|| left.to_lowercase().cmp(&right.to_lowercase()))
        .then_with(|| left.cmp(right))
}

fn collation_key(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()
    }

    fn task(id: u64, title: &str) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: String::new(),
            priority: Priority::Medium,
            due_date: None,
            completed: false,
            created_at: base_time() + Duration::minutes(id as i64),
            completed_at: None,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|task| task.id).collect()
    }

    fn mixed() -> Vec<Task> {
        let mut tasks = vec![
            task(1, "Buy milk"),
            task(2, "Walk dog"),
            task(3, "file taxes"),
            task(4, "Call plumber"),
            task(5, "Plan trip"),
        ];
        tasks[0].description = "two litres".into();
        tasks[1].priority = Priority::Low;
        tasks[1].completed = true;
        tasks[1].completed_at = Some(base_time());
        tasks[2].priority = Priority::High;
        tasks[2].due_date = NaiveDate::from_ymd_opt(2024, 4, 15);
        tasks[3].due_date = NaiveDate::from_ymd_opt(2024, 4, 3);
        tasks[3].priority = Priority::High;
        tasks[4].priority = Priority::Low;
        tasks[4].completed = true;
        tasks[4].completed_at = Some(base_time());
        tasks
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let tasks = vec![task(1, "Buy milk"), task(2, "Walk dog")];
        let visible = apply(&tasks, &TaskQuery::new("MILK", StatusFilter::All, SortKey::Title));
        assert_eq!(ids(&visible), vec![1]);

        let visible = apply(&mixed(), &TaskQuery::new("litres", StatusFilter::All, SortKey::Title));
        assert_eq!(ids(&visible), vec![1]);
    }

    #[test]
    fn whitespace_query_disables_search() {
        let tasks = mixed();
        let visible = apply(&tasks, &TaskQuery::new("   ", StatusFilter::All, SortKey::CreatedAt));
        assert_eq!(visible.len(), tasks.len());
    }

    #[test]
    fn active_and_completed_partition_the_list() {
        let tasks = mixed();
        let active = apply(&tasks, &TaskQuery::new("", StatusFilter::Active, SortKey::CreatedAt));
        let completed = apply(
            &tasks,
            &TaskQuery::new("", StatusFilter::Completed, SortKey::CreatedAt),
        );

        assert!(active.iter().all(|task| !completed.iter().any(|c| c.id == task.id)));
        let mut union = ids(&active);
        union.extend(ids(&completed));
        union.sort();
        assert_eq!(union, vec![1, 2, 3, 4, 5]);
    }

    #[rstest]
    #[case(SortKey::CreatedAt, vec![5, 4, 3, 2, 1])]
    #[case(SortKey::Title, vec![1, 4, 3, 5, 2])]
    #[case(SortKey::DueDate, vec![4, 3, 1, 2, 5])]
    #[case(SortKey::Priority, vec![3, 4, 1, 2, 5])]
    fn orders_by_sort_key(#[case] sort: SortKey, #[case] expected: Vec<u64>) {
        let visible = apply(&mixed(), &TaskQuery::new("", StatusFilter::All, sort));
        assert_eq!(ids(&visible), expected);
    }

    #[rstest]
    #[case(&["zebra", "fig", "éclair", "Émile"], &["éclair", "Émile", "fig", "zebra"])]
    #[case(&["Öl", "ostrich", "Apfel", "zoo"], &["Apfel", "Öl", "ostrich", "zoo"])]
    #[case(&["résumé", "resume", "Resume"], &["Resume", "resume", "résumé"])]
    fn title_sort_folds_accents_and_case(#[case] input: &[&str], #[case] expected: &[&str]) {
        let tasks: Vec<Task> = input
            .iter()
            .enumerate()
            .map(|(index, title)| task(index as u64 + 1, title))
            .collect();

        let visible = apply(&tasks, &TaskQuery::new("", StatusFilter::All, SortKey::Title));
        let titles: Vec<&str> = visible.iter().map(|task| task.title.as_str()).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn undated_tasks_sort_last_regardless_of_input_order() {
        let mut tasks = vec![task(1, "a"), task(2, "b"), task(3, "c"), task(4, "d")];
        tasks[1].due_date = NaiveDate::from_ymd_opt(2024, 9, 1);
        tasks[3].due_date = NaiveDate::from_ymd_opt(2024, 8, 1);
        tasks.reverse();

        let visible = apply(&tasks, &TaskQuery::new("", StatusFilter::All, SortKey::DueDate));
        assert_eq!(ids(&visible), vec![4, 2, 3, 1]);
    }

    #[test]
    fn priority_ranks_never_increase() {
        let priorities = [
            Priority::Low,
            Priority::High,
            Priority::Medium,
            Priority::Low,
            Priority::High,
            Priority::Medium,
        ];
        let tasks: Vec<Task> = priorities
            .iter()
            .enumerate()
            .map(|(index, priority)| {
                let mut task = task(index as u64 + 1, "t");
                task.priority = *priority;
                task
            })
            .collect();

        let visible = apply(&tasks, &TaskQuery::new("", StatusFilter::All, SortKey::Priority));
        let ranks: Vec<u8> = visible.iter().map(|task| task.priority.rank()).collect();
        assert_eq!(ranks, vec![3, 3, 2, 2, 1, 1]);
        // ties keep input order
        assert_eq!(ids(&visible), vec![2, 5, 3, 6, 1, 4]);
    }

    #[test]
    fn title_and_created_orders_for_two_tasks() {
        let mut older = task(1, "B");
        let mut newer = task(2, "A");
        older.created_at = base_time();
        newer.created_at = base_time() + Duration::hours(1);
        let tasks = vec![older, newer];

        let by_title = apply(&tasks, &TaskQuery::new("", StatusFilter::All, SortKey::Title));
        let by_created = apply(&tasks, &TaskQuery::default());
        let titles = |list: &[Task]| list.iter().map(|t| t.title.clone()).collect::<Vec<_>>();
        assert_eq!(titles(&by_title), vec!["A", "B"]);
        assert_eq!(titles(&by_created), vec!["A", "B"]);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let tasks = mixed();
        let query = TaskQuery::new("l", StatusFilter::Active, SortKey::DueDate);
        assert_eq!(apply(&tasks, &query), apply(&tasks, &query));
    }

    #[test]
    fn filtered_flag_ignores_sort() {
        assert!(!TaskQuery::default().is_filtered());
        assert!(!TaskQuery::new(" ", StatusFilter::All, SortKey::Title).is_filtered());
        assert!(TaskQuery::new("x", StatusFilter::All, SortKey::CreatedAt).is_filtered());
        assert!(TaskQuery::new("", StatusFilter::Active, SortKey::CreatedAt).is_filtered());
    }
}
