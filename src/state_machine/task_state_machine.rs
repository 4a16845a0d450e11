use chrono::{DateTime, Utc};

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::TaskEvent,
    states::TaskStatus,
};
use crate::models::WorkflowTask;

/// Transition table for validator tasks: `pending` is the only state that
/// accepts events, and decisions are final.
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: TaskStatus,
        event: &TaskEvent,
    ) -> StateMachineResult<TaskStatus> {
        let target = match (current_state, event) {
            (TaskStatus::Pending, TaskEvent::Approve(_)) => TaskStatus::Approved,
            (TaskStatus::Pending, TaskEvent::Reject(_)) => TaskStatus::Rejected,
            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    /// Record a validator decision on the task
    pub fn apply(
        task: &mut WorkflowTask,
        event: &TaskEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<TaskStatus> {
        let target_state = Self::determine_target_state(task.status, event)?;

        task.status = target_state;
        task.comment = event.comment().map(str::to_string);
        task.validated_at = Some(now);

        Ok(target_state)
    }
}
