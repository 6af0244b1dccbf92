pub mod issues;

/// GitHub API endpoints, relative to the configured API base URL
pub mod endpoints {
    pub const AUTHORIZATIONS: &str = "/authorizations";

    pub fn authorizations(api_base_url: &str) -> String {
        format!("{api_base_url}{AUTHORIZATIONS}")
    }

    pub fn issues(api_base_url: &str, owner: &str, repository: &str) -> String {
        format!("{api_base_url}/repos/{owner}/{repository}/issues")
    }
}

pub const USER_AGENT: &str = "failure-issue";
pub const ACCEPT: &str = "application/vnd.github+json";
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Builds the client used for a single GitHub call.
///
/// Deliberately sets a 30 s request timeout instead of relying on reqwest's default of none.
pub(crate) fn http_client() -> anyhow::Result<reqwest::Client> {
    anyhow::Context::context(
        reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build(),
        "Failed to create HTTP client",
    )
}

/// Stderr line for a failed GitHub call, including the whole cause chain.
pub fn transport_error_line(err: &anyhow::Error) -> String {
    format!("Fatal transport error: {err:#}")
}

/// Logs a failed GitHub call to stderr and to `tracing`.
///
/// Stderr lines never go to a stdout capture writer.
pub(crate) fn log_transport_error(operation: &str, err: &anyhow::Error) {
    let mut no_writer = None;
    let _ = crate::output::eprintln(&transport_error_line(err), &mut no_writer);
    tracing::error!("{operation} failed: {err:?}");
}
