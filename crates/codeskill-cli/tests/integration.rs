#![allow(deprecated)]
use assert_cmd::Command;
use mockito::{Matcher, Mock, ServerGuard};
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn codeskill(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("codeskill").unwrap();
    cmd.current_dir(dir.path())
        .env("CODESKILL_PROJECT", dir.path())
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("CODESKILL_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

/// A command wired to a mock Anthropic endpoint.
fn codeskill_against(dir: &TempDir, server: &ServerGuard) -> Command {
    let mut cmd = codeskill(dir);
    cmd.env("ANTHROPIC_API_KEY", "sk-test")
        .env("CODESKILL_BASE_URL", server.url());
    cmd
}

fn anthropic_body(payload: &Value) -> String {
    json!({
        "id": "msg_test",
        "type": "message",
        "model": "claude-test",
        "content": [{"type": "text", "text": payload.to_string()}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 20}
    })
    .to_string()
}

/// Answers every call whose system prompt names `role`.
fn agent_mock(server: &mut ServerGuard, role: &str, payload: Value) -> Mock {
    server
        .mock("POST", "/v1/messages")
        .match_body(Matcher::Regex(format!("You are an? {role}")))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(anthropic_body(&payload))
        .create()
}

fn read_json(dir: &TempDir, path: &str) -> Value {
    let data = std::fs::read_to_string(dir.path().join(path)).unwrap();
    serde_json::from_str(&data).unwrap()
}

// ---------------------------------------------------------------------------
// help / global behavior
// ---------------------------------------------------------------------------

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    codeskill(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("enhanced-code"))
        .stdout(predicate::str::contains("resume"))
        .stdout(predicate::str::contains("refactor"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn missing_api_key_names_the_variable() {
    let dir = TempDir::new().unwrap();
    codeskill(&dir)
        .args(["design", "a todo app"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"))
        .stderr(predicate::str::contains(".env"));
}

#[test]
fn provider_override_switches_key_variable() {
    let dir = TempDir::new().unwrap();
    codeskill(&dir)
        .args(["--provider", "openai", "design", "a todo app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn refactor_requires_files() {
    let dir = TempDir::new().unwrap();
    codeskill(&dir)
        .args(["refactor", "--goal", "simplify"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_init_then_show() {
    let dir = TempDir::new().unwrap();
    codeskill(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created:"));
    assert!(dir.path().join(".codeskill/config.yaml").exists());

    codeskill(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));

    codeskill(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("llm.provider"))
        .stdout(predicate::str::contains("anthropic"))
        .stdout(predicate::str::contains("ANTHROPIC_API_KEY"));
}

#[test]
fn config_init_keeps_existing_file() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".codeskill")).unwrap();
    std::fs::write(
        dir.path().join(".codeskill/config.yaml"),
        "llm:\n  model: custom-model\n",
    )
    .unwrap();
    codeskill(&dir).args(["config", "init"]).assert().success();

    let data = std::fs::read_to_string(dir.path().join(".codeskill/config.yaml")).unwrap();
    assert!(data.contains("custom-model"));
}

#[test]
fn config_validate_clean() {
    let dir = TempDir::new().unwrap();
    codeskill(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_rejects_zero_retries() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".codeskill")).unwrap();
    std::fs::write(
        dir.path().join(".codeskill/config.yaml"),
        "workflow:\n  max_retries: 0\n",
    )
    .unwrap();
    codeskill(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stdout(predicate::str::contains("max_retries"));
}

#[test]
fn config_show_json() {
    let dir = TempDir::new().unwrap();
    let out = codeskill(&dir)
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["llm"]["provider"], "anthropic");
    assert_eq!(v["workflow"]["max_retries"], 3);
}

// ---------------------------------------------------------------------------
// design, end to end against a mock endpoint
// ---------------------------------------------------------------------------

#[test]
fn design_writes_three_documents() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let req = agent_mock(
        &mut server,
        "requirement analyst",
        json!({
            "title": "Todo API",
            "description": "Track todos",
            "type": "backend",
            "features": [{"name": "create", "description": "add a todo", "priority": "high"}]
        }),
    );
    let arch = agent_mock(
        &mut server,
        "system architect",
        json!({
            "overview": "single service",
            "tech_stack": {"backend": ["axum"], "database": ["sqlite"]},
            "data_model": [{"entity": "Todo", "fields": []}]
        }),
    );
    let api = agent_mock(
        &mut server,
        "API designer",
        json!({
            "openapi": "3.0.0",
            "paths": {"/todos": {"get": {}}}
        }),
    );

    codeskill_against(&dir, &server)
        .args(["design", "a todo api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Todo API"))
        .stdout(predicate::str::contains("1 endpoint(s)"));

    req.assert();
    arch.assert();
    api.assert();
    assert_eq!(read_json(&dir, "docs/requirement.json")["title"], "Todo API");
    assert_eq!(
        read_json(&dir, "docs/architecture.json")["tech_stack"]["backend"][0],
        "axum"
    );
    assert!(read_json(&dir, "docs/api_spec.json")["paths"]["/todos"].is_object());
}

#[test]
fn design_surfaces_malformed_response() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "model": "claude-test",
                "content": [{"type": "text", "text": "Sorry, I can't produce JSON today."}],
                "stop_reason": "end_turn"
            })
            .to_string(),
        )
        .create();

    codeskill_against(&dir, &server)
        .args(["design", "a todo api"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed response"));
    assert!(!dir.path().join("docs/requirement.json").exists());
}

// ---------------------------------------------------------------------------
// enhanced-code
// ---------------------------------------------------------------------------

#[test]
fn enhanced_code_auth_failure_writes_fix_log() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1/messages")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
        .expect(1)
        .create();

    codeskill_against(&dir, &server)
        .args(["enhanced-code", "a todo api", "--max-retries", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("requirement_analysis failed"))
        .stderr(predicate::str::contains("invalid x-api-key"));

    mock.assert();
    let log = read_json(&dir, "docs/fix_log.json");
    assert_eq!(log["fix_records"].as_array().unwrap().len(), 1);
    assert_eq!(log["fix_records"][0]["status"], "failed");
    assert_eq!(log["fix_records"][0]["error"]["error_type"], "api");
}

#[test]
fn enhanced_code_rejects_unknown_review_mode() {
    let dir = TempDir::new().unwrap();
    let server = mockito::Server::new();
    codeskill_against(&dir, &server)
        .args(["enhanced-code", "x", "--review-mode", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sometimes"));
}

#[test]
fn resume_without_checkpoint_fails() {
    let dir = TempDir::new().unwrap();
    let server = mockito::Server::new();
    codeskill_against(&dir, &server)
        .arg("resume")
        .assert()
        .failure()
        .stderr(predicate::str::contains("docs/workflow_checkpoint.json"));
}
