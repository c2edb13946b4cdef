//! opgate-hosting: pull request actions for opgate
//!
//! The gate never talks to the hosting platform directly; it goes through
//! [`HostingPlatform`]. [`GhCli`] shells out to the `gh` CLI, and
//! [`fakes::RecordingHost`] records actions for tests.

pub mod error;
pub mod fakes;
pub mod gh;

use async_trait::async_trait;

pub use error::{HostingError, HostingResult};
pub use gh::GhCli;

/// Actions the gate can take on a pull request.
///
/// Every action either succeeds or returns an error; nothing is retried.
#[async_trait]
pub trait HostingPlatform: Send + Sync {
    /// Request review from the given accounts (comma-joined list) in a single call.
    async fn add_reviewers(&self, target: &str, reviewers: &str) -> HostingResult<()>;

    /// Post a comment on the pull request.
    async fn comment(&self, target: &str, body: &str) -> HostingResult<()>;

    /// Approve the pull request.
    async fn approve(&self, target: &str) -> HostingResult<()>;
}
