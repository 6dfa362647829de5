//! Task Manager
//!
//! Parses LLM plan text into a task breakdown, renders plans as
//! human-readable checklists, and generates the planning prompt.

use regex::Regex;

use crate::models::task::{Task, TaskBreakdown, TaskStatus};
use crate::utils::error::{AppError, AppResult};

/// Handles task parsing, tracking, and formatting.
pub struct TaskManager {
    checkbox_pattern: Regex,
    numbered_pattern: Regex,
    bullet_pattern: Regex,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            checkbox_pattern: Regex::new(r"^[\s]*[☐☑✓✗\[\]x\s-]+\s*(.+)$").expect("checkbox regex"),
            numbered_pattern: Regex::new(r"^[\s]*\d+\.\s+(.+)$").expect("numbered regex"),
            bullet_pattern: Regex::new(r"^[\s]*[-*•]\s+(.+)$").expect("bullet regex"),
        }
    }

    /// Parse tasks from an LLM response.
    ///
    /// Recognized line formats:
    /// - `☐ Task description` (and other checkbox markers)
    /// - `[ ] Task description` / `[x] Task description`
    /// - `1. Task description`
    /// - `- Task description`
    ///
    /// Lines containing `☑`, `✓`, or `[x]` start as completed. Other
    /// lines are ignored; an empty result is a parse failure.
    pub fn parse_tasks_from_llm(&self, llm_response: &str) -> AppResult<TaskBreakdown> {
        let mut tasks = Vec::new();
        let mut task_id = 1;

        for line in llm_response.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let status = if line.contains('☑') || line.contains('✓') || line.contains("[x]") {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            };

            let description = self
                .checkbox_pattern
                .captures(line)
                .or_else(|| self.numbered_pattern.captures(line))
                .or_else(|| self.bullet_pattern.captures(line))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string());

            if let Some(description) = description {
                if !description.is_empty() {
                    let mut task = Task::new(task_id, description);
                    task.status = status;
                    tasks.push(task);
                    task_id += 1;
                }
            }
        }

        if tasks.is_empty() {
            return Err(AppError::parse("no tasks found in LLM response"));
        }

        Ok(TaskBreakdown::new("", tasks))
    }

    /// Build a breakdown directly from tasks.
    pub fn create_task_breakdown(&self, user_prompt: &str, tasks: Vec<Task>) -> TaskBreakdown {
        TaskBreakdown::new(user_prompt, tasks)
    }

    /// Render a plan as a checkbox list: `☑` done, `◐` in-progress,
    /// `✗` blocked, `☐` pending.
    pub fn format_as_checklist(&self, breakdown: &TaskBreakdown) -> String {
        let mut out = String::new();

        if !breakdown.summary.is_empty() {
            out.push_str(&format!("# {}\n\n", breakdown.summary));
        }

        out.push_str(&format!(
            "**Progress:** {}/{} tasks completed\n\n",
            breakdown.completed, breakdown.total_tasks
        ));

        for task in &breakdown.tasks {
            let checkbox = match task.status {
                TaskStatus::Completed => "☑",
                TaskStatus::InProgress => "◐",
                TaskStatus::Blocked => "✗",
                TaskStatus::Pending => "☐",
            };

            out.push_str(&format!("{} {}", checkbox, task.description));
            if let Some(file_path) = &task.file_path {
                out.push_str(&format!(" ({}", file_path));
                if let Some(line) = task.line {
                    out.push_str(&format!(":{}", line));
                }
                out.push(')');
            }
            out.push('\n');

            if !task.details.is_empty() {
                let details = task.details.replace('\n', "\n  ");
                out.push_str(&format!("  {}\n", details));
            }
        }

        out
    }

    /// Serialize a breakdown as pretty JSON.
    pub fn format_as_json(&self, breakdown: &TaskBreakdown) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(breakdown)?)
    }

    /// Prompt asking the LLM for an ordered checklist.
    pub fn generate_task_prompt(&self, user_prompt: &str, project_context: &str) -> String {
        format!(
            "You are a coding agent task planner. Given a user's request and project context, \
             create a detailed task breakdown.\n\n\
             USER REQUEST:\n{}\n\n\
             PROJECT CONTEXT:\n{}\n\n\
             Please create a detailed task breakdown in the following format:\n\
             ☐ Task 1 description\n\
             ☐ Task 2 description\n\
             ☐ Task 3 description\n\
             ...\n\n\
             IMPORTANT:\n\
             - Each task should be specific and actionable\n\
             - Include file paths when relevant (e.g., \"Check schemas/patient.py for field definitions\")\n\
             - Order tasks logically (investigation → implementation → testing)\n\
             - Be concise but clear\n\
             - Use checkbox format (☐) for pending tasks\n\
             - Focus on the most critical tasks first\n\n\
             Your task breakdown:",
            user_prompt, project_context
        )
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checkbox_list() {
        let response = "\
Here is the plan:

☐ Read the patient schema
☐ Fix the secondary_phone field
☑ Review existing tests
";
        let plan = TaskManager::new().parse_tasks_from_llm(response).unwrap();
        assert_eq!(plan.total_tasks, 3);
        assert_eq!(plan.tasks[0].id, 1);
        assert_eq!(plan.tasks[0].description, "Read the patient schema");
        assert_eq!(plan.tasks[0].status, TaskStatus::Pending);
        assert_eq!(plan.tasks[2].status, TaskStatus::Completed);
        assert_eq!(plan.completed, 1);
        assert_eq!(plan.pending, 2);
    }

    #[test]
    fn parses_numbered_and_bullet_lists() {
        let response = "\
1. Investigate the bug
2. Write a failing test

* Apply the fix
- Verify the output
";
        let plan = TaskManager::new().parse_tasks_from_llm(response).unwrap();
        assert_eq!(plan.total_tasks, 4);
        assert_eq!(plan.tasks[1].description, "Write a failing test");
        assert_eq!(plan.tasks[2].description, "Apply the fix");
        assert_eq!(plan.tasks[3].description, "Verify the output");
    }

    #[test]
    fn bracket_checkboxes_and_completion() {
        let response = "[ ] open task\n[x] closed task\n";
        let plan = TaskManager::new().parse_tasks_from_llm(response).unwrap();
        assert_eq!(plan.total_tasks, 2);
        assert_eq!(plan.tasks[0].status, TaskStatus::Pending);
        assert_eq!(plan.tasks[1].status, TaskStatus::Completed);
    }

    #[test]
    fn prose_lines_are_ignored() {
        let response = "\
Sure! I suggest the following steps.

☐ Only real task
Some trailing commentary.
";
        let plan = TaskManager::new().parse_tasks_from_llm(response).unwrap();
        assert_eq!(plan.total_tasks, 1);
        assert_eq!(plan.tasks[0].description, "Only real task");
    }

    #[test]
    fn empty_response_is_a_parse_failure() {
        let err = TaskManager::new()
            .parse_tasks_from_llm("I could not produce a plan.")
            .unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn checklist_rendering_shows_status_glyphs() {
        let tm = TaskManager::new();
        let mut plan = tm.create_task_breakdown(
            "demo",
            vec![
                Task::new(1, "first"),
                Task::new(2, "second"),
                Task::new(3, "third"),
            ],
        );
        plan.summary = "Demo plan".to_string();
        plan.update_task_status(1, TaskStatus::Completed).unwrap();
        plan.update_task_status(2, TaskStatus::InProgress).unwrap();
        plan.tasks[2].file_path = Some("src/app.py".to_string());
        plan.tasks[2].line = Some(42);

        let rendered = tm.format_as_checklist(&plan);
        assert!(rendered.contains("# Demo plan"));
        assert!(rendered.contains("**Progress:** 1/3 tasks completed"));
        assert!(rendered.contains("☑ first"));
        assert!(rendered.contains("◐ second"));
        assert!(rendered.contains("☐ third (src/app.py:42)"));
    }

    #[test]
    fn json_rendering_round_trips() {
        let tm = TaskManager::new();
        let plan = tm.create_task_breakdown("demo", vec![Task::new(1, "only")]);
        let json = tm.format_as_json(&plan).unwrap();
        let parsed: TaskBreakdown = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_tasks, 1);
        assert_eq!(parsed.tasks[0].description, "only");
    }

    #[test]
    fn task_prompt_embeds_request_and_context() {
        let prompt = TaskManager::new().generate_task_prompt("fix the bug", "MODULES: a.py");
        assert!(prompt.contains("fix the bug"));
        assert!(prompt.contains("MODULES: a.py"));
        assert!(prompt.contains("☐ Task 1 description"));
    }
}
