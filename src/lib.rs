//! File a GitHub issue whenever a guarded test fails.
//!
//! ```no_run
//! #[test]
//! fn should_add() {
//!     failure_issue::guard("should add", || {
//!         assert_eq!(1 + 1, 2);
//!     });
//! }
//! ```
//!
//! Reporting is best-effort: the original failure always reaches the test
//! harness unchanged, whatever happens to the GitHub calls.

pub mod auth;
pub mod config;
pub mod failure;
pub mod github;
pub mod guard;
pub mod output;

pub use config::ReporterConfig;
pub use failure::Failure;
pub use guard::{IssueGuard, guard, guard_async, guard_result, run_guarded};
