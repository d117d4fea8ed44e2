use chrono::{DateTime, Duration, Utc};

use crate::model::{Priority, Task};

struct SampleSeed {
    title: &'static str,
    description: &'static str,
    priority: Priority,
    due_in_days: Option<i64>,
    created_days_ago: i64,
    completed: bool,
}

const SAMPLE_SEEDS: &[SampleSeed] = &[
    SampleSeed {
        title: "Review quarterly report",
        description: "Go through the numbers before the Friday sync",
        priority: Priority::High,
        due_in_days: Some(2),
        created_days_ago: 5,
        completed: false,
    },
    SampleSeed {
        title: "Buy groceries",
        description: "Milk, eggs, bread and coffee",
        priority: Priority::Medium,
        due_in_days: Some(1),
        created_days_ago: 4,
        completed: false,
    },
    SampleSeed {
        title: "Book dentist appointment",
        description: "",
        priority: Priority::Low,
        due_in_days: None,
        created_days_ago: 3,
        completed: false,
    },
    SampleSeed {
        title: "Renew gym membership",
        description: "Ask about the annual discount",
        priority: Priority::Medium,
        due_in_days: None,
        created_days_ago: 2,
        completed: true,
    },
    SampleSeed {
        title: "Plan weekend hike",
        description: "Check the weather and pick a trail",
        priority: Priority::Low,
        due_in_days: Some(6),
        created_days_ago: 1,
        completed: false,
    },
];

/// Build the sample list with ids `1..=n`, timestamps relative to `now`.
pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    SAMPLE_SEEDS
        .iter()
        .enumerate()
        .map(|(index, seed)| {
            let created_at = now - Duration::days(seed.created_days_ago);
            Task {
                id: index as u64 + 1,
                title: seed.title.to_string(),
                description: seed.description.to_string(),
                priority: seed.priority,
                due_date: seed
                    .due_in_days
                    .map(|days| (now + Duration::days(days)).date_naive()),
                completed: seed.completed,
                created_at,
                completed_at: seed.completed.then(|| created_at + Duration::hours(6)),
            }
        })
        .collect()
}
