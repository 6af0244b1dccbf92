use crate::auth;
use crate::config::ReporterConfig;
use crate::failure::Failure;
use crate::github::{self, endpoints};
use crate::output;
use anyhow::Result;
use reqwest::StatusCode;
use serde::Serialize;
use std::io::Write;

pub const TITLE_PREFIX: &str = "Test Failed: ";
pub const BODY_PREFIX: &str = "Failure Cause: ";

/// Body of the create-issue request
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IssuePayload {
    pub title: String,
    pub body: String,
}

impl IssuePayload {
    pub fn new(description: &str, failure: &Failure) -> Self {
        IssuePayload {
            title: issue_title(description),
            body: issue_body(failure),
        }
    }
}

pub fn issue_title(description: &str) -> String {
    format!("{TITLE_PREFIX}{description}")
}

/// Message, then the trace on the following line.
pub fn issue_body(failure: &Failure) -> String {
    format!("{BODY_PREFIX}{} \n{}", failure.message, failure.trace)
}

/// Posts `payload` as a new issue in the configured repository.
pub async fn create_issue(
    config: &ReporterConfig,
    token: &str,
    payload: &IssuePayload,
) -> Result<StatusCode> {
    let client = github::http_client()?;

    let response = client
        .post(endpoints::issues(
            &config.api_base_url,
            &config.owner,
            &config.repository,
        ))
        .header("Authorization", format!("{} {token}", auth::TOKEN_KEY))
        .header("Accept", github::ACCEPT)
        .json(payload)
        .send()
        .await?;

    Ok(response.status())
}

/// Files an issue for a failed test. Never fails: every problem is logged.
///
/// The status line goes to stdout and, when given, to `stdout_additional`.
/// Errors go to stderr only. Without a token no issue is posted.
pub async fn report_failure(
    config: &ReporterConfig,
    description: &str,
    failure: &Failure,
    mut stdout_additional: Option<&mut (dyn Write + Send)>,
) {
    let Some(token) = auth::retrieve_token(config).await else {
        tracing::warn!("no GitHub token; not filing an issue for `{description}`");
        return;
    };

    let payload = IssuePayload::new(description, failure);
    match create_issue(config, &token, &payload).await {
        Ok(status) => {
            tracing::debug!(
                "filed issue for `{description}` in {}/{}",
                config.owner,
                config.repository
            );
            let status_line = format!("Got status code {status}");
            if let Err(e) = output::println(&status_line, &mut stdout_additional) {
                tracing::warn!("failed to write status line: {e}");
            }
        }
        Err(err) => github::log_transport_error("issue creation", &err),
    }
}
