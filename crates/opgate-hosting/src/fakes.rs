//! Recording hosting platform (testing only)

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{HostingError, HostingResult};
use crate::HostingPlatform;

/// One recorded pull request action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostingAction {
    AddReviewers { target: String, reviewers: String },
    Comment { target: String, body: String },
    Approve { target: String },
}

/// Hosting platform that records actions instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingHost {
    actions: Mutex<Vec<HostingAction>>,
    fail: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose every action fails (after being recorded).
    pub fn failing() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn actions(&self) -> Vec<HostingAction> {
        self.actions.lock().unwrap().clone()
    }

    pub fn reviewer_requests(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                HostingAction::AddReviewers { reviewers, .. } => Some(reviewers),
                _ => None,
            })
            .collect()
    }

    pub fn comments(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                HostingAction::Comment { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn approvals(&self) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, HostingAction::Approve { .. }))
            .count()
    }

    fn record(&self, action: HostingAction) -> HostingResult<()> {
        let description = format!("{:?}", action);
        self.actions.lock().unwrap().push(action);
        if self.fail {
            return Err(HostingError::Rejected(description));
        }
        Ok(())
    }
}

#[async_trait]
impl HostingPlatform for RecordingHost {
    async fn add_reviewers(&self, target: &str, reviewers: &str) -> HostingResult<()> {
        self.record(HostingAction::AddReviewers {
            target: target.to_string(),
            reviewers: reviewers.to_string(),
        })
    }

    async fn comment(&self, target: &str, body: &str) -> HostingResult<()> {
        self.record(HostingAction::Comment {
            target: target.to_string(),
            body: body.to_string(),
        })
    }

    async fn approve(&self, target: &str) -> HostingResult<()> {
        self.record(HostingAction::Approve {
            target: target.to_string(),
        })
    }
}
