//! Review decision engine.
//!
//! Decides, for one operator touched by a pull request, whether the author may
//! merge it without a human, whether reviewers must be asked, or whether the
//! operator is in a state that must block the whole pull request.
//!
//! Two tracks exist. Partner operators (those with a `cert_project_id` in the
//! *base* `ci.yaml`) are gated on the certification project's list of
//! hosting-platform accounts. Community operators are gated on the
//! `reviewers` list of the *head* `ci.yaml`.

use std::fmt;

use opgate_catalog::Catalog;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dispatch::ReviewDispatcher;
use crate::error::Result;
use crate::repo::{config_list, config_str, Config, Operator, RepositorySnapshot};

/// `ci.yaml` key linking an operator to a certification project.
pub const CERT_PROJECT_ID_KEY: &str = "cert_project_id";
/// `ci.yaml` key listing the community reviewers of an operator.
pub const REVIEWERS_KEY: &str = "reviewers";

/// Authorization track of an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Track {
    Partner { cert_project_id: String },
    Community,
}

impl Track {
    /// Classify an operator from its base-snapshot config.
    pub fn from_base_config(config: &Config) -> Self {
        match config_str(config, CERT_PROJECT_ID_KEY) {
            Some(cert_project_id) => Track::Partner { cert_project_id },
            None => Track::Community,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Partner { .. } => "partner",
            Track::Community => "community",
        }
    }

    pub fn is_partner(&self) -> bool {
        matches!(self, Track::Partner { .. })
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The author may change this operator without review.
    Approved,
    /// Reviewers have been asked; the pull request is not auto-approved.
    ReviewRequested,
    /// Configuration or authorization inconsistency; the run must abort.
    Rejected(String),
}

impl Decision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }
}

/// Engine switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOptions {
    /// Ask repository maintainers to review when a community operator has no reviewers.
    /// Purely a notification; the decision is unchanged.
    pub notify_maintainers: bool,
    /// Also post the owners' comment after the reviewer request. Off by default,
    /// so a review request is exactly one outbound action.
    pub comment_on_review_request: bool,
}

/// Everything needed to decide on one operator.
pub struct ReviewContext<'a> {
    /// The operator as found in the head snapshot.
    pub operator: &'a Operator,
    /// Hosting-platform account that opened the pull request.
    pub submitter: &'a str,
    pub base: &'a RepositorySnapshot,
    pub head: &'a RepositorySnapshot,
    pub catalog: &'a dyn Catalog,
    pub dispatcher: &'a ReviewDispatcher<'a>,
    pub options: ReviewOptions,
}

/// Decision engine for a single operator.
pub struct OperatorReview<'a> {
    ctx: ReviewContext<'a>,
}

impl<'a> OperatorReview<'a> {
    pub fn new(ctx: ReviewContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn operator_name(&self) -> &str {
        self.ctx.operator.name()
    }

    /// Operator config before the change. Empty for operators added by the change.
    pub fn base_operator_config(&self) -> Config {
        self.ctx.base.operator_config(self.operator_name())
    }

    /// Operator config after the change.
    pub fn head_operator_config(&self) -> Config {
        self.ctx.head.operator_config(self.operator_name())
    }

    /// Partner or community. Read from the base snapshot only, so a pull
    /// request cannot promote itself to partner by adding `cert_project_id`.
    pub fn track(&self) -> Track {
        Track::from_base_config(&self.base_operator_config())
    }

    /// Community reviewers from the head `ci.yaml`.
    pub fn reviewers(&self) -> Vec<String> {
        config_list(&self.head_operator_config(), REVIEWERS_KEY)
    }

    /// Repository maintainers from the head `config.yaml`.
    pub fn maintainers(&self) -> Vec<String> {
        self.ctx.head.maintainers()
    }

    pub async fn decide(&self) -> Result<Decision> {
        let track = self.track();
        info!(
            "Checking permissions of {} for operator {} ({} track)",
            self.ctx.submitter,
            self.operator_name(),
            track
        );
        match track {
            Track::Partner { cert_project_id } => self.decide_partner(&cert_project_id).await,
            Track::Community => self.decide_community().await,
        }
    }

    async fn decide_partner(&self, cert_project_id: &str) -> Result<Decision> {
        let Some(ownership) = self.ctx.catalog.get_ownership(cert_project_id).await? else {
            return Ok(Decision::Rejected(format!(
                "certification project {} not found in catalog",
                cert_project_id
            )));
        };

        if !ownership.authorizes(self.ctx.submitter) {
            return Ok(Decision::Rejected(format!(
                "{} is not an authorized submitter of certification project {} (allowed: {:?})",
                self.ctx.submitter, cert_project_id, ownership.authorized_identities
            )));
        }

        info!(
            "{} is an authorized submitter of certification project {}",
            self.ctx.submitter, cert_project_id
        );
        Ok(Decision::Approved)
    }

    async fn decide_community(&self) -> Result<Decision> {
        let reviewers = self.reviewers();

        if reviewers.is_empty() {
            warn!(
                "Operator {} has no reviewers in ci.yaml",
                self.operator_name()
            );
            if self.ctx.options.notify_maintainers {
                self.notify_maintainers().await?;
            }
            return Ok(Decision::Rejected(format!(
                "community operator {} does not declare any reviewers in ci.yaml",
                self.operator_name()
            )));
        }

        if reviewers.iter().any(|r| r == self.ctx.submitter) {
            info!(
                "{} is a reviewer of operator {}",
                self.ctx.submitter,
                self.operator_name()
            );
            return Ok(Decision::Approved);
        }

        info!(
            "{} is not a reviewer of operator {}, requesting review",
            self.ctx.submitter,
            self.operator_name()
        );
        self.ctx
            .dispatcher
            .request_review_from_reviewers(&reviewers)
            .await?;
        if self.ctx.options.comment_on_review_request {
            self.ctx
                .dispatcher
                .request_review_from_owners(&reviewers)
                .await?;
        }
        Ok(Decision::ReviewRequested)
    }

    async fn notify_maintainers(&self) -> Result<()> {
        let maintainers = self.maintainers();
        if maintainers.is_empty() {
            warn!("No repository maintainers configured, nobody to notify");
            return Ok(());
        }
        self.ctx
            .dispatcher
            .request_review_from_reviewers(&maintainers)
            .await
    }
}
