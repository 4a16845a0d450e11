//! Proptest strategies for workflow inputs

use docflow_core::TaskStatus;
use proptest::prelude::*;

pub fn task_status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::Approved),
        Just(TaskStatus::Rejected),
    ]
}

/// Statuses of one round, at least one task
pub fn round_statuses_strategy() -> impl Strategy<Value = Vec<TaskStatus>> {
    prop::collection::vec(task_status_strategy(), 1..20)
}

/// Decisions only (no pending), at least one task
pub fn decided_round_strategy() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..8)
}

/// Distinct validator identifiers
pub fn validator_ids_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{3,10}", 1..10)
        .prop_map(|set| set.into_iter().collect())
}
