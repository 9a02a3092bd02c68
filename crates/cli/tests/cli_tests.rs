// End-to-end tests for the `vizdash` binary against a mocked Tableau site
// and a mocked Gemini endpoint.
// Run with: cargo test -p vizdash-cli --test cli_tests
//
// Manual smoke test (needs a real TTY):
//   vizdash dashboard
//   Verify: workbooks load, Enter drills down, a analyzes, q restores the terminal.

use std::path::Path;
use std::process::{Command, Output};

use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const API: &str = "/api/3.19";
const SITE: &str = "/api/3.19/sites/site-1";
const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
    0, 0, 0, 8, 0, 0, 0, 4,
];

/// The binary with an isolated config directory and no inherited
/// VIZDASH_* settings.
fn vizdash(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vizdash"));
    for (key, _) in std::env::vars() {
        if key.starts_with("VIZDASH_") {
            cmd.env_remove(key);
        }
    }
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_CACHE_HOME", home.join("cache"))
        .env("VIZDASH_SECRETS", home.join("no-secrets.toml"))
        .env("VIZDASH_NO_KEYCHAIN", "1");
    cmd
}

/// `vizdash` pointed at `server`, with Tableau credentials but no Gemini key.
fn site_cmd(home: &Path, server: &MockServer) -> Command {
    let mut cmd = vizdash(home);
    cmd.env("VIZDASH_TABLEAU_SERVER_URL", server.base_url())
        .env("VIZDASH_TABLEAU_SITE_ID", "sales")
        .env("VIZDASH_TABLEAU_TOKEN_NAME", "pat")
        .env("VIZDASH_TABLEAU_TOKEN_SECRET", "s3cret")
        .env("VIZDASH_TABLEAU_API_VERSION", "3.19");
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// Sales {Q1} and an empty HR workbook.
fn mock_site(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST).path(format!("{}/auth/signin", API));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "credentials": {
                "token": "tok",
                "site": { "id": "site-1", "contentUrl": "sales" },
                "user": { "id": "u-1" }
            }}));
    });
    server.mock(|when, then| {
        when.method(POST).path(format!("{}/auth/signout", API));
        then.status(204);
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/workbooks", SITE)).header("X-Tableau-Auth", "tok");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "pagination": { "pageNumber": "1", "pageSize": "100", "totalAvailable": "2" },
                "workbooks": { "workbook": [
                    { "id": "wb-sales", "name": "Sales", "project": { "name": "Finance" } },
                    { "id": "wb-hr", "name": "HR", "project": { "name": "People" } }
                ]}
            }));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/workbooks/wb-sales/views", SITE));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "views": { "view": [ { "id": "v-q1", "name": "Q1" } ] } }));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/workbooks/wb-hr/views", SITE));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "views": {} }));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/views/v-q1/image", SITE));
        then.status(200).header("content-type", "image/png").body(PNG);
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/views/v-q1/data", SITE));
        then.status(200)
            .header("content-type", "text/csv")
            .body("Region,Sales\nEast,100\nWest,250\n");
    });
}

// ---------------------------------------------------------------------------
// Commands that need no site
// ---------------------------------------------------------------------------

#[test]
fn templates_lists_all_four() {
    let home = TempDir::new().unwrap();
    let out = vizdash(home.path()).arg("templates").output().unwrap();
    assert!(out.status.success());
    let text = stdout(&out);
    for id in ["ppt", "graph", "rca", "trend"] {
        assert!(text.contains(id), "missing {} in:\n{}", id, text);
    }
}

#[test]
fn templates_json_flags_structured_prompts() {
    let home = TempDir::new().unwrap();
    let out = vizdash(home.path()).args(["templates", "--json"]).output().unwrap();
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    let structured: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .filter(|t| t["json_response"] == true)
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(structured, ["ppt", "graph"]);
}

#[test]
fn no_command_is_usage_error() {
    let home = TempDir::new().unwrap();
    let out = vizdash(home.path()).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn unknown_prompt_is_usage_error() {
    let home = TempDir::new().unwrap();
    let out = vizdash(home.path())
        .args(["analyze", "Sales", "Q1", "--prompt", "poem"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("ppt, graph, rca, trend"));
}

#[test]
fn missing_server_url_exits_10() {
    let home = TempDir::new().unwrap();
    let out = vizdash(home.path()).arg("workbooks").output().unwrap();
    assert_eq!(out.status.code(), Some(10));
    let err = stderr(&out);
    assert!(err.contains("tableau.server_url"), "{}", err);
    assert!(err.contains("hint:"), "{}", err);
}

#[test]
fn doctor_json_reports_missing_fields() {
    let home = TempDir::new().unwrap();
    let out = vizdash(home.path()).args(["doctor", "--json"]).output().unwrap();
    assert_eq!(out.status.code(), Some(10));

    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["tableau_ready"], false);
    let missing: Vec<&str> = v["missing"].as_array().unwrap().iter().filter_map(Value::as_str).collect();
    assert!(missing.contains(&"tableau.server_url"));
    assert!(missing.contains(&"tableau.token_secret"));
    assert_eq!(v["ai_key_present"], false);
    assert_eq!(v["cache_ttl_secs"], 600);
}

#[test]
fn doctor_never_prints_secrets() {
    let home = TempDir::new().unwrap();
    let out = vizdash(home.path())
        .env("VIZDASH_TABLEAU_SERVER_URL", "https://tableau.example.com")
        .env("VIZDASH_TABLEAU_TOKEN_NAME", "pat")
        .env("VIZDASH_TABLEAU_TOKEN_SECRET", "hunter2")
        .env("VIZDASH_GEMINI_KEY", "hunter3")
        .arg("doctor")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(!text.contains("hunter2"));
    assert!(!text.contains("hunter3"));
}

// ---------------------------------------------------------------------------
// Catalog and export against a mocked site
// ---------------------------------------------------------------------------

#[test]
fn workbooks_lists_site() {
    let server = MockServer::start();
    mock_site(&server);
    let home = TempDir::new().unwrap();

    let out = site_cmd(home.path(), &server).arg("workbooks").output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("Sales"));
    assert!(text.contains("Finance"));
    assert!(text.contains("HR"));
}

#[test]
fn workbooks_json_has_labels() {
    let server = MockServer::start();
    mock_site(&server);
    let home = TempDir::new().unwrap();

    let out = site_cmd(home.path(), &server).args(["workbooks", "--json"]).output().unwrap();
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    let labels: Vec<&str> = v.as_array().unwrap().iter().map(|w| w["label"].as_str().unwrap()).collect();
    assert_eq!(labels, ["Sales", "HR"]);
}

#[test]
fn views_of_empty_workbook_is_not_an_error() {
    let server = MockServer::start();
    mock_site(&server);
    let home = TempDir::new().unwrap();

    let out = site_cmd(home.path(), &server).args(["views", "HR"]).output().unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("No views found in this workbook: HR"));
}

#[test]
fn export_writes_image_and_csv() {
    let server = MockServer::start();
    mock_site(&server);
    let home = TempDir::new().unwrap();
    let image = home.path().join("q1.png");
    let csv = home.path().join("q1.csv");

    let out = site_cmd(home.path(), &server)
        .args(["export", "Sales", "Q1", "--image"])
        .arg(&image)
        .arg("--csv")
        .arg(&csv)
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));

    assert_eq!(std::fs::read(&image).unwrap(), PNG);
    assert_eq!(std::fs::read_to_string(&csv).unwrap(), "Region,Sales\nEast,100\nWest,250\n");
    let text = stdout(&out);
    assert!(text.contains("Sales / Q1"));
    assert!(text.contains("West"));
}

#[test]
fn export_unknown_view_exits_1_with_hint() {
    let server = MockServer::start();
    mock_site(&server);
    let home = TempDir::new().unwrap();

    let out = site_cmd(home.path(), &server).args(["export", "Sales", "Q9"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("No data for view 'Q9' in workbook 'Sales'"), "{}", err);
    assert!(!err.contains("error:"), "{}", err);
    assert!(err.contains("vizdash views Sales"));
}

#[test]
fn rejected_credentials_exit_20() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(format!("{}/auth/signin", API));
        then.status(401)
            .header("content-type", "application/json")
            .json_body(json!({ "error": { "code": "401001", "summary": "Signin Error", "detail": "bad token" } }));
    });
    let home = TempDir::new().unwrap();

    let out = site_cmd(home.path(), &server).arg("workbooks").output().unwrap();
    assert_eq!(out.status.code(), Some(20));
}

#[test]
fn unreachable_server_exits_21() {
    let home = TempDir::new().unwrap();
    let out = vizdash(home.path())
        .env("VIZDASH_TABLEAU_SERVER_URL", "http://127.0.0.1:9")
        .env("VIZDASH_TABLEAU_TOKEN_NAME", "pat")
        .env("VIZDASH_TABLEAU_TOKEN_SECRET", "s3cret")
        .env("VIZDASH_TABLEAU_API_VERSION", "3.19")
        .arg("workbooks")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(21));
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[test]
fn dry_run_prints_prompt_without_key() {
    let server = MockServer::start();
    mock_site(&server);
    let home = TempDir::new().unwrap();

    let out = site_cmd(home.path(), &server)
        .args(["analyze", "Sales", "Q1", "-p", "rca", "-i", "ignore returns", "--dry-run"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("Read the title first: Q1"), "{}", text);
    assert!(text.contains("ignore returns"));
    assert!(text.contains("East,100"));
}

#[test]
fn analyze_without_key_exits_11_before_network() {
    let server = MockServer::start();
    let signin = server.mock(|when, then| {
        when.method(POST).path(format!("{}/auth/signin", API));
        then.status(500);
    });
    let home = TempDir::new().unwrap();

    let out = site_cmd(home.path(), &server)
        .args(["analyze", "Sales", "Q1", "-p", "trend"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(11));
    assert!(stderr(&out).contains("VIZDASH_GEMINI_KEY"));
    signin.assert_calls(0);
}

#[test]
fn analyze_sends_view_to_gemini() {
    let site = MockServer::start();
    mock_site(&site);
    let gemini = MockServer::start();
    let generate = gemini.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-test:generateContent")
            .header("x-goog-api-key", "k-123")
            .body_includes("East,100");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "West leads with 250." }] },
                    "finishReason": "STOP"
                }]
            }));
    });
    let home = TempDir::new().unwrap();

    let out = site_cmd(home.path(), &site)
        .env("VIZDASH_GEMINI_KEY", "k-123")
        .env("VIZDASH_GEMINI_MODEL", "gemini-test")
        .env("VIZDASH_GEMINI_ENDPOINT", gemini.base_url())
        .args(["analyze", "Sales", "Q1", "--prompt", "trend"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("West leads with 250."));
    generate.assert();
}

#[test]
fn analyze_quota_error_exits_30() {
    let site = MockServer::start();
    mock_site(&site);
    let gemini = MockServer::start();
    let generate = gemini.mock(|when, then| {
        when.method(POST).path("/v1beta/models/gemini-test:generateContent");
        then.status(429)
            .header("content-type", "application/json")
            .json_body(json!({ "error": { "code": 429, "status": "RESOURCE_EXHAUSTED", "message": "quota" } }));
    });
    let home = TempDir::new().unwrap();

    let out = site_cmd(home.path(), &site)
        .env("VIZDASH_GEMINI_KEY", "k-123")
        .env("VIZDASH_GEMINI_MODEL", "gemini-test")
        .env("VIZDASH_GEMINI_ENDPOINT", gemini.base_url())
        .args(["analyze", "Sales", "Q1", "--prompt", "ppt"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(30));
    generate.assert_calls(1);
}
