//! Property-based tests for defensive record decoding.
//!
//! Uses proptest to verify:
//! 1. Any JSON value in any task field decodes without panicking.
//! 2. Status and priority always land in their enumerated sets, and any
//!    stored string outside those sets falls back to the default.
//! 3. `is_overdue` holds exactly when the due date has passed and the task
//!    is not completed.
//! 4. Notices and user profiles decode from arbitrary values.

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use taskhub_proto::task::fields;
use taskhub_proto::{Priority, Task, TaskId, TaskStatus, UpdateNotice, User};

// --- Strategies ---

/// Strategy for arbitrary JSON values, nested a few levels deep.
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<f64>().prop_map(Value::from),
        ".{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(".{0,8}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

const TASK_FIELDS: [&str; 10] = [
    fields::TITLE,
    fields::DESCRIPTION,
    fields::ASSIGNED_TO,
    fields::ASSIGNED_TO_NAME,
    fields::CREATED_BY,
    fields::CREATED_BY_NAME,
    fields::STATUS,
    fields::PRIORITY,
    fields::CREATED_AT,
    fields::DUE_DATE,
];

/// Strategy for task documents where each known field is absent or holds
/// an arbitrary value.
fn arb_task_document() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::vec(prop::option::of(arb_json()), TASK_FIELDS.len()).prop_map(|values| {
        TASK_FIELDS
            .iter()
            .zip(values)
            .filter_map(|(name, value)| value.map(|v| ((*name).to_string(), v)))
            .collect()
    })
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

// --- Properties ---

proptest! {
    #[test]
    fn any_task_document_decodes(doc in arb_task_document()) {
        let decoded = Task::from_document(TaskId::from("t"), &doc);
        prop_assert!(TaskStatus::ALL.contains(&decoded.value.status));
        prop_assert_eq!(decoded.value.id.as_str(), "t");
        if decoded.is_clean() {
            prop_assert_eq!(decoded.fallbacks.len(), 0);
        }
    }

    #[test]
    fn unknown_status_strings_fall_back_to_pending(raw in "[a-zA-Z]{1,12}") {
        prop_assume!(raw.parse::<TaskStatus>().is_err());
        let doc = json!({ "status": raw }).as_object().cloned().unwrap_or_default();
        let task = Task::from_document(TaskId::from("t"), &doc).into_value();
        prop_assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn unknown_priority_strings_fall_back_to_medium(raw in "[a-zA-Z]{1,12}") {
        prop_assume!(raw.parse::<Priority>().is_err());
        let doc = json!({ "priority": raw }).as_object().cloned().unwrap_or_default();
        let task = Task::from_document(TaskId::from("t"), &doc).into_value();
        prop_assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn priority_labels_ignore_case(index in 0usize..3, upper in any::<bool>()) {
        let priority = [Priority::Low, Priority::Medium, Priority::High][index];
        let raw = if upper {
            priority.as_str().to_uppercase()
        } else {
            priority.as_str().to_string()
        };
        prop_assert_eq!(Priority::from_label(&raw), Ok(priority));
    }

    #[test]
    fn stored_priority_must_match_exactly(index in 0usize..3) {
        let priority = [Priority::Low, Priority::Medium, Priority::High][index];
        let doc = json!({ "priority": priority.as_str().to_uppercase() })
            .as_object()
            .cloned()
            .unwrap_or_default();
        let task = Task::from_document(TaskId::from("t"), &doc).into_value();
        prop_assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn overdue_iff_past_due_and_open(
        due in 0u64..2_000_000,
        now in 0u64..2_000_000,
        status in arb_status(),
    ) {
        let doc = json!({ "dueDate": due, "status": status.as_str() })
            .as_object()
            .cloned()
            .unwrap_or_default();
        let task = Task::from_document(TaskId::from("t"), &doc).into_value();
        prop_assert_eq!(
            task.is_overdue(now),
            due < now && status != TaskStatus::Completed
        );
    }

    #[test]
    fn any_notice_value_decodes(value in arb_json()) {
        let notice = UpdateNotice::from_value(TaskId::from("t"), &value).into_value();
        prop_assert_eq!(notice.task_id.as_str(), "t");
        prop_assert_eq!(
            notice.actor_name_or("Someone").is_empty(),
            notice.updated_by_name.as_deref() == Some("")
        );
    }

    #[test]
    fn any_profile_value_decodes(value in arb_json()) {
        let doc = value.as_object().cloned().unwrap_or_default();
        let user = User::from_document("u", &doc).into_value();
        prop_assert_eq!(user.id.as_str(), "u");
        prop_assert!(!user.name.is_empty() || doc.get("name").is_some_and(Value::is_string));
    }
}
