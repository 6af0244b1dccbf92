//! Wrappers that run a test body and file an issue when it fails.
//!
//! A failure is always handed back to the caller unchanged: a panic resumes
//! with its original payload and an `Err` is returned as-is. Filing the issue
//! happens before that and cannot change the outcome.

use crate::config::ReporterConfig;
use crate::failure::{self, Failure, TraceSlot, Traced};
use crate::github::issues;
use crate::output;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

/// Runs `body`; if it panics, calls `report` and resumes the original panic.
pub fn run_guarded<T, B, R>(description: &str, body: B, report: R) -> T
where
    B: FnOnce() -> T,
    R: FnOnce(&str, &Failure),
{
    failure::install_panic_hook();
    let slot = TraceSlot::default();

    let result = {
        let _scope = slot.enter();
        panic::catch_unwind(AssertUnwindSafe(body))
    };

    match result {
        Ok(value) => value,
        Err(payload) => {
            let failure = Failure::from_panic(payload.as_ref(), slot.take());
            report(description, &failure);
            panic::resume_unwind(payload)
        }
    }
}

/// Where an [`IssueGuard`] gets its configuration when a failure is reported.
#[derive(Debug, Clone)]
enum ConfigSource {
    Environment,
    Directory {
        dir: PathBuf,
        lookup: fn(&str) -> Option<String>,
    },
    Fixed(ReporterConfig),
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Files issues for failing test bodies.
#[derive(Debug, Clone)]
pub struct IssueGuard {
    source: ConfigSource,
}

impl Default for IssueGuard {
    fn default() -> Self {
        Self::from_env()
    }
}

impl IssueGuard {
    /// Configuration is loaded from the current directory and the environment
    /// each time a failure is reported.
    pub fn from_env() -> Self {
        IssueGuard {
            source: ConfigSource::Environment,
        }
    }

    /// Like [`IssueGuard::from_env`], but reads the project file under `dir`.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::from_dir_with(dir, env_lookup)
    }

    /// Reads the project file under `dir` and variables through `lookup`.
    pub fn from_dir_with(dir: impl Into<PathBuf>, lookup: fn(&str) -> Option<String>) -> Self {
        IssueGuard {
            source: ConfigSource::Directory {
                dir: dir.into(),
                lookup,
            },
        }
    }

    pub fn with_config(config: ReporterConfig) -> Self {
        IssueGuard {
            source: ConfigSource::Fixed(config),
        }
    }

    /// Runs a test body that fails by panicking.
    pub fn run<T>(&self, description: &str, body: impl FnOnce() -> T) -> T {
        run_guarded(description, body, |description, failure| {
            self.report_blocking(description, failure)
        })
    }

    /// Runs a test body that fails by returning `Err`. The error is returned unchanged.
    pub fn run_result<T, E>(
        &self,
        description: &str,
        body: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: Display + Debug,
    {
        let result = self.run(description, body);
        if let Err(err) = &result {
            self.report_blocking(description, &Failure::from_error(err));
        }
        result
    }

    /// Runs an async test body on its own tokio task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn run_async<F>(&self, description: &str, body: F) -> F::Output
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        failure::install_panic_hook();
        let slot = TraceSlot::default();

        match tokio::spawn(Traced::new(body, slot.clone())).await {
            Ok(value) => value,
            Err(err) if err.is_panic() => {
                let payload = err.into_panic();
                let failure = Failure::from_panic(payload.as_ref(), slot.take());
                self.report(description, &failure).await;
                panic::resume_unwind(payload)
            }
            Err(err) => panic!("guarded test `{description}` was cancelled: {err}"),
        }
    }

    async fn report(&self, description: &str, failure: &Failure) {
        let config = match self.resolve_config() {
            Some(config) => config,
            None => return,
        };
        issues::report_failure(&config, description, failure, None).await;
    }

    /// Reports on a dedicated thread with its own runtime, so callers may or
    /// may not already be inside a tokio runtime.
    fn report_blocking(&self, description: &str, failure: &Failure) {
        std::thread::scope(|scope| {
            let spawned = std::thread::Builder::new()
                .name("failure-issue-reporter".to_string())
                .spawn_scoped(scope, || {
                    let runtime = match tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    {
                        Ok(runtime) => runtime,
                        Err(e) => {
                            tracing::error!("failed to start reporting runtime: {e}");
                            return;
                        }
                    };
                    runtime.block_on(self.report(description, failure));
                });

            match spawned {
                Ok(handle) => {
                    if handle.join().is_err() {
                        tracing::error!("issue reporter panicked for `{description}`");
                    }
                }
                Err(e) => tracing::error!("failed to spawn reporter thread: {e}"),
            }
        });
    }

    fn resolve_config(&self) -> Option<ReporterConfig> {
        let loaded = match &self.source {
            ConfigSource::Fixed(config) => return Some(config.clone()),
            ConfigSource::Environment => ReporterConfig::load(),
            ConfigSource::Directory { dir, lookup } => ReporterConfig::load_from(dir, *lookup),
        };

        match loaded {
            Ok(config) => Some(config),
            Err(err) => {
                let mut no_writer = None;
                let _ = output::eprintln(
                    &format!("Invalid failure-issue configuration: {err:#}"),
                    &mut no_writer,
                );
                tracing::error!("failed to load reporter configuration: {err:?}");
                None
            }
        }
    }
}

/// [`IssueGuard::run`] with configuration from the environment.
pub fn guard<T>(description: &str, body: impl FnOnce() -> T) -> T {
    IssueGuard::from_env().run(description, body)
}

/// [`IssueGuard::run_result`] with configuration from the environment.
pub fn guard_result<T, E>(description: &str, body: impl FnOnce() -> Result<T, E>) -> Result<T, E>
where
    E: Display + Debug,
{
    IssueGuard::from_env().run_result(description, body)
}

/// [`IssueGuard::run_async`] with configuration from the environment.
pub async fn guard_async<F>(description: &str, body: F) -> F::Output
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    IssueGuard::from_env().run_async(description, body).await
}
