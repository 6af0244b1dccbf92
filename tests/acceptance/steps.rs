use crate::ReporterWorld;
use cucumber::{given, then, when};
use failure_issue::IssueGuard;
use failure_issue::failure::panic_message;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const ISSUES_PATH: &str = "/repos/owner/repo/issues";

fn fail_with(message: &str) {
    panic!("{message}");
}

async fn fail_later(message: String) {
    tokio::task::yield_now().await;
    panic!("{message}");
}

async fn start_github(world: &mut ReporterWorld) -> &MockServer {
    let mock_server = MockServer::start().await;
    world.config.api_base_url = mock_server.uri();
    world.config.owner = "owner".to_string();
    world.config.repository = "repo".to_string();
    world.mock_server.insert(mock_server)
}

async fn received(world: &ReporterWorld) -> Vec<Request> {
    let mock_server = world
        .mock_server
        .as_ref()
        .expect("GitHub API mock should be running");
    mock_server
        .received_requests()
        .await
        .expect("Request recording should be enabled")
}

async fn issue_request(world: &ReporterWorld) -> Request {
    let issues: Vec<Request> = received(world)
        .await
        .into_iter()
        .filter(|request| request.url.path() == ISSUES_PATH)
        .collect();
    assert_eq!(issues.len(), 1, "Expected exactly one issue request");
    issues.into_iter().next().expect("Checked above")
}

#[given(expr = "a GitHub API that grants the token {string}")]
async fn github_grants_token(world: &mut ReporterWorld, token: String) {
    let mock_server = start_github(world).await;

    Mock::given(method("POST"))
        .and(path("/authorizations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 1,
            "token": token,
            "scopes": ["repo"]
        })))
        .mount(mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path(ISSUES_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"number": 1})))
        .mount(mock_server)
        .await;
}

#[given("a GitHub API that rejects the credentials")]
async fn github_rejects_credentials(world: &mut ReporterWorld) {
    let mock_server = start_github(world).await;

    Mock::given(method("POST"))
        .and(path("/authorizations"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Bad credentials"
        })))
        .mount(mock_server)
        .await;
}

#[given("a GitHub API that cannot be reached")]
async fn github_unreachable(world: &mut ReporterWorld) {
    world.config.api_base_url = "http://127.0.0.1:1".to_string();
}

#[given(expr = "the GitHub password is {string}")]
async fn github_password(world: &mut ReporterWorld, password: String) {
    world.config.password = Some(password);
}

#[given("no GitHub password is configured")]
async fn no_github_password(world: &mut ReporterWorld) {
    world.config.password = None;
}

#[when(expr = "the test {string} fails with {string}")]
async fn test_fails(world: &mut ReporterWorld, description: String, message: String) {
    let guard = IssueGuard::with_config(world.config.clone());

    let outcome =
        tokio::task::spawn_blocking(move || guard.run(&description, || fail_with(&message)))
            .await;

    world.outcome = Some(outcome.map_err(|err| panic_message(err.into_panic().as_ref())));
}

#[when(expr = "the test {string} returns the error {string}")]
async fn test_returns_error(world: &mut ReporterWorld, description: String, message: String) {
    let guard = IssueGuard::with_config(world.config.clone());

    let outcome = tokio::task::spawn_blocking(move || {
        guard.run_result(&description, || Err::<(), String>(message.clone()))
    })
    .await
    .expect("Guarded test should not panic");

    world.outcome = Some(outcome);
}

#[when(expr = "the async test {string} fails with {string}")]
async fn async_test_fails(world: &mut ReporterWorld, description: String, message: String) {
    let guard = IssueGuard::with_config(world.config.clone());

    let outcome = tokio::spawn(async move {
        guard
            .run_async(&description, fail_later(message))
            .await
    })
    .await;

    world.outcome = Some(outcome.map_err(|err| panic_message(err.into_panic().as_ref())));
}

#[when(expr = "the test {string} passes")]
async fn test_passes(world: &mut ReporterWorld, description: String) {
    let guard = IssueGuard::with_config(world.config.clone());

    let outcome =
        tokio::task::spawn_blocking(move || guard.run(&description, || assert_eq!(1 + 1, 2)))
            .await;

    world.outcome = Some(outcome.map_err(|err| panic_message(err.into_panic().as_ref())));
}

#[then(expr = "the failure {string} is raised again")]
async fn failure_raised_again(world: &mut ReporterWorld, message: String) {
    assert_eq!(world.outcome, Some(Err(message)));
}

#[then("the test passes")]
async fn test_passed(world: &mut ReporterWorld) {
    assert_eq!(world.outcome, Some(Ok(())));
}

#[then(expr = "an issue titled {string} is filed")]
async fn issue_filed(world: &mut ReporterWorld, title: String) {
    let request = issue_request(world).await;
    let body: Value = serde_json::from_slice(&request.body).expect("Issue body should be JSON");
    assert_eq!(body["title"], Value::String(title));
}

#[then(expr = "the issue body starts with {string}")]
async fn issue_body_starts_with(world: &mut ReporterWorld, prefix: String) {
    let request = issue_request(world).await;
    let body: Value = serde_json::from_slice(&request.body).expect("Issue body should be JSON");
    let text = body["body"].as_str().expect("Issue body should be a string");
    assert!(
        text.starts_with(&prefix),
        "Expected body starting with '{}', got:\n---\n{}\n---",
        prefix,
        text
    );
}

#[then(expr = "the issue is authorized with {string}")]
async fn issue_authorized_with(world: &mut ReporterWorld, authorization: String) {
    let request = issue_request(world).await;
    let header = request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok());
    assert_eq!(header, Some(authorization.as_str()));
}

#[then("no issue is filed")]
async fn no_issue_filed(world: &mut ReporterWorld) {
    let filed = received(world)
        .await
        .iter()
        .any(|request| request.url.path() == ISSUES_PATH);
    assert!(!filed, "No issue request was expected");
}

#[then("no request reaches the GitHub API")]
async fn no_request(world: &mut ReporterWorld) {
    let requests = received(world).await;
    assert!(
        requests.is_empty(),
        "Expected no requests, got {}",
        requests.len()
    );
}
