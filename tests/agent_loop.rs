//! End-to-end agent scenarios: dry-run execution, edit misses, and
//! plan bookkeeping, driven by a scripted LLM client.

use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use codescout::models::task::TaskStatus;
use codescout::services::agent::{CodingAgent, RunOptions};
use codescout::services::llm::{LlmClient, LlmResponse, Message};
use codescout::utils::error::AppResult;

/// LLM stand-in that replays canned responses in order, repeating the
/// last one when the script runs out.
#[derive(Debug)]
struct ScriptedClient {
    responses: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat(&self, _messages: &[Message]) -> AppResult<LlmResponse> {
        let mut responses = self.responses.lock().unwrap();
        let content = if responses.len() > 1 {
            responses.pop().unwrap()
        } else {
            responses.last().cloned().unwrap_or_default()
        };
        Ok(LlmResponse {
            content,
            provider: "mock".to_string(),
            model: "scripted".to_string(),
            tokens_used: 0,
            finish_reason: "stop".to_string(),
        })
    }

    fn provider(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

fn write_project(dir: &TempDir) {
    fs::write(
        dir.path().join("app.py"),
        "def greet(name):\n    \"\"\"Say hello politely.\"\"\"\n    return f\"hello {name}\"\n",
    )
    .unwrap();
}

#[tokio::test]
async fn dry_run_plan_completes_without_writing_files() {
    let dir = TempDir::new().unwrap();
    write_project(&dir);

    let client = ScriptedClient::new(&[
        "☐ create hello.txt with body 'hi'",
        r#"{"type":"create_file","path":"hello.txt","content":"hi"}"#,
        r#"{"type":"complete","summary":"created hello.txt"}"#,
    ]);
    let mut agent = CodingAgent::with_client(dir.path(), client);

    let result = agent
        .run(
            "create hello.txt with body 'hi'",
            RunOptions {
                dry_run: true,
                ..RunOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.plan.total_tasks, 1);
    assert_eq!(result.plan.tasks[0].status, TaskStatus::Completed);
    assert!(
        !dir.path().join("hello.txt").exists(),
        "dry-run must not write files"
    );

    let execution = &result.executions[0];
    assert!(execution.completed);
    assert!(!execution.failed);
    assert!(
        execution.results.iter().all(|r| r.files_changed.is_empty()),
        "dry-run must report no changed files"
    );
}

#[tokio::test]
async fn edit_miss_blocks_task_with_old_text_error() {
    let dir = TempDir::new().unwrap();
    write_project(&dir);

    let client = ScriptedClient::new(&[
        "☐ rewrite the farewell message",
        r#"{"type":"edit_file","path":"app.py","edits":[{"old_text":"goodbye forever","new_text":"bye"}]}"#,
    ]);
    let mut agent = CodingAgent::with_client(dir.path(), client);

    let result = agent
        .run("rewrite the farewell message", RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.plan.tasks[0].status, TaskStatus::Blocked);
    let execution = &result.executions[0];
    assert!(execution.failed);
    assert!(
        execution.failure_msg.contains("old_text not found"),
        "failure was: {}",
        execution.failure_msg
    );
}

#[tokio::test]
async fn real_run_applies_edits_and_records_changes() {
    let dir = TempDir::new().unwrap();
    write_project(&dir);

    let client = ScriptedClient::new(&[
        "☐ greet louder",
        r#"{"type":"edit_file","path":"app.py","edits":[{"old_text":"hello {name}","new_text":"HELLO {name}"}]}"#,
        r#"{"type":"complete","summary":"greeting is louder"}"#,
    ]);
    let mut agent = CodingAgent::with_client(dir.path(), client);

    let result = agent.run("greet louder", RunOptions::default()).await.unwrap();

    assert_eq!(result.plan.completed, 1);
    let content = fs::read_to_string(dir.path().join("app.py")).unwrap();
    assert!(content.contains("HELLO {name}"));

    let execution = &result.executions[0];
    let changed: Vec<&str> = execution
        .results
        .iter()
        .flat_map(|r| r.files_changed.iter().map(|s| s.as_str()))
        .collect();
    assert_eq!(changed, vec!["app.py"]);
}

#[tokio::test]
async fn counters_stay_consistent_across_mixed_outcomes() {
    let dir = TempDir::new().unwrap();
    write_project(&dir);

    let client = ScriptedClient::new(&[
        "☐ first step\n☐ second step\n☐ third step",
        r#"{"type":"complete","summary":"done"}"#,
        r#"{"type":"fail","reason":"blocked by missing dependency"}"#,
        r#"{"type":"complete","summary":"done"}"#,
    ]);
    let mut agent = CodingAgent::with_client(dir.path(), client);

    let result = agent.run("three steps", RunOptions::default()).await.unwrap();
    let plan = &result.plan;

    assert_eq!(plan.total_tasks, 3);
    assert_eq!(
        plan.completed + plan.in_progress + plan.pending + plan.blocked,
        plan.total_tasks
    );
    assert_eq!(plan.completed, 2);
    assert_eq!(plan.blocked, 1);
    assert!(result.executions[1].failure_msg.contains("missing dependency"));
}
