//! Task Model
//!
//! Planning units produced by the task planner: a breakdown is an ordered
//! checklist of tasks with denormalized status counters.

use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Status of a single task.
///
/// Transitions are linear: pending → in_progress → {completed | blocked},
/// or back to pending when execution is inconclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

/// A single task in a breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 1-based position in the plan
    pub id: usize,
    pub description: String,
    pub status: TaskStatus,
    /// Free-form notes accumulated during execution
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
    /// Optional file hint extracted from the plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Optional line hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Task {
    pub fn new(id: usize, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: TaskStatus::Pending,
            details: String::new(),
            file_path: None,
            line: None,
        }
    }
}

/// A complete breakdown of tasks for a user prompt.
///
/// Counters are denormalized from task statuses; `update_stats` is the
/// single recompute and must be called after any status change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskBreakdown {
    pub user_prompt: String,
    pub summary: String,
    pub tasks: Vec<Task>,
    pub total_tasks: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub blocked: usize,
}

impl TaskBreakdown {
    /// Build a breakdown from tasks, computing counters.
    pub fn new(user_prompt: impl Into<String>, tasks: Vec<Task>) -> Self {
        let mut breakdown = Self {
            user_prompt: user_prompt.into(),
            total_tasks: tasks.len(),
            tasks,
            ..Default::default()
        };
        breakdown.update_stats();
        breakdown
    }

    /// Recompute all status counters from the task list.
    pub fn update_stats(&mut self) {
        self.total_tasks = self.tasks.len();
        self.completed = 0;
        self.in_progress = 0;
        self.pending = 0;
        self.blocked = 0;

        for task in &self.tasks {
            match task.status {
                TaskStatus::Completed => self.completed += 1,
                TaskStatus::InProgress => self.in_progress += 1,
                TaskStatus::Pending => self.pending += 1,
                TaskStatus::Blocked => self.blocked += 1,
            }
        }
    }

    /// Update the status of a task by id and recompute counters.
    pub fn update_task_status(&mut self, task_id: usize, status: TaskStatus) -> AppResult<()> {
        match self.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.status = status;
                self.update_stats();
                Ok(())
            }
            None => Err(AppError::not_found(format!("task with id {}", task_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_task_plan() -> TaskBreakdown {
        TaskBreakdown::new(
            "fix the bug",
            vec![
                Task::new(1, "read the failing code"),
                Task::new(2, "apply the fix"),
                Task::new(3, "run the tests"),
            ],
        )
    }

    #[test]
    fn counters_start_all_pending() {
        let plan = three_task_plan();
        assert_eq!(plan.total_tasks, 3);
        assert_eq!(plan.pending, 3);
        assert_eq!(plan.completed + plan.in_progress + plan.blocked, 0);
    }

    #[test]
    fn counters_sum_to_total_after_any_change() {
        let mut plan = three_task_plan();
        plan.update_task_status(1, TaskStatus::InProgress).unwrap();
        plan.update_task_status(1, TaskStatus::Completed).unwrap();
        plan.update_task_status(2, TaskStatus::Blocked).unwrap();

        assert_eq!(plan.completed, 1);
        assert_eq!(plan.blocked, 1);
        assert_eq!(plan.pending, 1);
        assert_eq!(
            plan.completed + plan.in_progress + plan.pending + plan.blocked,
            plan.total_tasks
        );
    }

    #[test]
    fn unknown_task_id_is_an_error() {
        let mut plan = three_task_plan();
        assert!(plan.update_task_status(99, TaskStatus::Completed).is_err());
    }
}
