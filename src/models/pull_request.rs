//! Pull request, repository and user models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GitHub user or organization reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name
    pub login: String,
}

/// Repository permissions for the authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPermissions {
    /// Administrative access
    #[serde(default)]
    pub admin: bool,
    /// Push access
    #[serde(default)]
    pub push: bool,
    /// Pull access
    #[serde(default)]
    pub pull: bool,
}

/// A repository as embedded in pull request payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Short name
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    /// Fork parent, if any
    #[serde(default)]
    pub parent: Option<Box<Repository>>,
    /// Owning user or organization
    #[serde(default)]
    pub owner: Option<User>,
    /// Whether the repository is private
    #[serde(default)]
    pub private: bool,
    /// Whether the wiki is enabled
    #[serde(default)]
    pub has_wiki: bool,
    /// Permissions of the authenticated user
    #[serde(default)]
    pub permissions: Option<RepositoryPermissions>,
    /// Web URL
    #[serde(default)]
    pub html_url: String,
    /// Default branch name
    #[serde(default)]
    pub default_branch: String,
}

/// One side (head or base) of a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestSpec {
    /// `owner:branch`
    pub label: String,
    /// Branch name
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// Commit SHA
    pub sha: String,
    /// Repository, absent when a fork was deleted
    #[serde(default)]
    pub repo: Option<Repository>,
}

/// An issue label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLabel {
    /// Label name
    pub name: String,
    /// Hex color without `#`
    #[serde(default)]
    pub color: String,
}

/// A milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Milestone number
    pub number: u64,
    /// Milestone title
    pub title: String,
}

/// A team requested for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Team name
    pub name: String,
    /// URL slug
    pub slug: String,
}

/// A pull request as returned by the REST pulls endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// Pull request number
    pub number: u64,
    /// `open` or `closed`
    pub state: String,
    /// Title
    pub title: String,
    /// Description body
    #[serde(default)]
    pub body: Option<String>,
    /// Author
    #[serde(default)]
    pub user: Option<User>,

    /// Head branch
    #[serde(default)]
    pub head: Option<PullRequestSpec>,
    /// Base branch
    #[serde(default)]
    pub base: Option<PullRequestSpec>,

    /// SHA of the merge commit
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    /// Whether maintainers may push to the head branch
    #[serde(default)]
    pub maintainer_can_modify: bool,
    /// Whether the pull request is a draft
    #[serde(default)]
    pub draft: bool,

    /// Number of comments
    #[serde(default)]
    pub comments: u64,
    /// Labels
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
    /// Assignees
    #[serde(default)]
    pub assignees: Vec<User>,
    /// Milestone
    #[serde(default)]
    pub milestone: Option<Milestone>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Merge time
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,

    /// Users requested for review
    #[serde(default)]
    pub requested_reviewers: Vec<User>,
    /// Teams requested for review
    #[serde(default)]
    pub requested_teams: Vec<Team>,

    /// API URL
    #[serde(default, rename = "url")]
    pub api_url: String,
    /// Web URL
    #[serde(default)]
    pub html_url: String,
}

impl PullRequest {
    /// Returns `true` if the pull request has been merged.
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    /// The head branch name, if known.
    pub fn head_branch(&self) -> Option<&str> {
        self.head.as_ref().map(|head| head.ref_name.as_str())
    }
}
