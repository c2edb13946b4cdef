//! Review request dispatcher.
//!
//! Turns "a human has to look at this" into pull request actions. Each
//! operation issues exactly one hosting-platform call; a failed call is
//! returned to the caller and aborts the run.

use opgate_hosting::HostingPlatform;
use tracing::info;

use crate::error::Result;

/// Sends review requests for one pull request.
pub struct ReviewDispatcher<'a> {
    host: &'a dyn HostingPlatform,
    pull_request_url: String,
}

impl<'a> ReviewDispatcher<'a> {
    pub fn new(host: &'a dyn HostingPlatform, pull_request_url: impl Into<String>) -> Self {
        Self {
            host,
            pull_request_url: pull_request_url.into(),
        }
    }

    /// Assign every identity as a reviewer in one call.
    pub async fn request_review_from_reviewers(&self, identities: &[String]) -> Result<()> {
        let reviewers = identities.join(",");
        info!("Requesting review from {}", reviewers);
        self.host
            .add_reviewers(&self.pull_request_url, &reviewers)
            .await?;
        Ok(())
    }

    /// Post one comment asking the listed owners to review and `/lgtm` the change.
    pub async fn request_review_from_owners(&self, identities: &[String]) -> Result<()> {
        info!("Asking operator owners {:?} for review", identities);
        self.host
            .comment(&self.pull_request_url, &owners_review_comment(identities))
            .await?;
        Ok(())
    }

    /// Approve the pull request.
    pub async fn approve(&self) -> Result<()> {
        info!("Approving {}", self.pull_request_url);
        self.host.approve(&self.pull_request_url).await?;
        Ok(())
    }
}

/// Body of the comment sent to operator owners.
pub fn owners_review_comment(identities: &[String]) -> String {
    let mentions = identities
        .iter()
        .map(|i| format!("@{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Author of the PR is not listed as one of the reviewers in ci.yaml.\n\
         Please review the PR and approve it with \\`/lgtm\\` comment.\n\
         {} \n\n\
         Consider adding author of the PR to the ci.yaml file if you want automated \
         approval for a followup submissions.",
        mentions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use opgate_hosting::fakes::{HostingAction, RecordingHost};

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_request_review_from_reviewers_is_one_call() {
        let host = RecordingHost::new();
        let dispatcher = ReviewDispatcher::new(&host, "pr_url");
        dispatcher
            .request_review_from_reviewers(&ids(&["maintainer1", "maintainer2"]))
            .await
            .unwrap();
        assert_eq!(
            host.actions(),
            vec![HostingAction::AddReviewers {
                target: "pr_url".to_string(),
                reviewers: "maintainer1,maintainer2".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_request_review_from_owners_comment() {
        let host = RecordingHost::new();
        let dispatcher = ReviewDispatcher::new(&host, "pr_url");
        dispatcher
            .request_review_from_owners(&ids(&["user1", "user2"]))
            .await
            .unwrap();
        assert_eq!(
            host.comments(),
            vec!["Author of the PR is not listed as one of the reviewers in ci.yaml.\n\
                  Please review the PR and approve it with \\`/lgtm\\` comment.\n\
                  @user1, @user2 \n\nConsider adding author of the PR to the ci.yaml \
                  file if you want automated approval for a followup submissions."
                .to_string()]
        );
    }

    #[tokio::test]
    async fn test_dispatch_failure_propagates() {
        let host = RecordingHost::failing();
        let dispatcher = ReviewDispatcher::new(&host, "pr_url");
        assert!(dispatcher
            .request_review_from_reviewers(&ids(&["a"]))
            .await
            .is_err());
        assert!(dispatcher.approve().await.is_err());
    }
}
