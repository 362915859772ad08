//! GitHub webhook handling: signature check, task id extraction and PR linking.

use std::collections::BTreeSet;

use db::{
    DbErr,
    models::{github_link::{GitHubLink, PullRequestRef}, task::Task},
    types::GitHubPrStatus,
};
use hmac::{Hmac, Mac};
use regex::{Regex, RegexBuilder};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use ts_rs::TS;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";
const HANDLED_ACTIONS: [&str; 5] = ["opened", "edited", "closed", "reopened", "synchronize"];

/// Checks an `X-Hub-Signature-256` header against the raw request body.
pub fn verify_signature(secret: &[u8], payload: &[u8], signature: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Produces the header value GitHub would send for `payload`.
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload);
    Some(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Matches `PREFIX-123` case-insensitively.
#[derive(Debug, Clone)]
pub struct TaskIdMatcher {
    pattern: Regex,
}

impl TaskIdMatcher {
    pub fn new(prefix: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&format!(r"{}-\d+", regex::escape(prefix)))
            .case_insensitive(true)
            .build()?;
        Ok(Self { pattern })
    }

    /// Upper-cased ids in order of first appearance.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str().to_uppercase())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }
}

pub fn map_pr_status(state: &str, merged: bool) -> GitHubPrStatus {
    if merged {
        GitHubPrStatus::Merged
    } else if state == "open" {
        GitHubPrStatus::Open
    } else {
        GitHubPrStatus::Closed
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestEvent {
    pub action: Option<String>,
    #[serde(default)]
    pub pull_request: PullRequestPayload,
    #[serde(default)]
    pub repository: RepositoryPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestPayload {
    pub number: Option<i64>,
    #[serde(default)]
    pub title: String,
    pub state: Option<String>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub head: HeadPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadPayload {
    #[serde(rename = "ref", default)]
    pub branch: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: OwnerPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerPayload {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct WebhookOutcome {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_tasks: Vec<String>,
}

impl WebhookOutcome {
    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            linked_tasks: Vec::new(),
        }
    }
}

/// Links the PR to every task referenced by its title or head branch.
pub async fn process_pull_request_event<C: ConnectionTrait>(
    db: &C,
    matcher: &TaskIdMatcher,
    event: &PullRequestEvent,
) -> Result<WebhookOutcome, DbErr> {
    let action = event.action.as_deref().unwrap_or_default();
    if !HANDLED_ACTIONS.contains(&action) {
        return Ok(WebhookOutcome::acknowledged(format!("Action '{action}' ignored")));
    }

    let pr = &event.pull_request;
    let mut task_ids = matcher.extract(&pr.title);
    for id in matcher.extract(&pr.head.branch) {
        if !task_ids.contains(&id) {
            task_ids.push(id);
        }
    }
    if task_ids.is_empty() {
        return Ok(WebhookOutcome::acknowledged(
            "No task IDs found in PR title or branch name",
        ));
    }

    let number = pr.number.unwrap_or_default();
    let reference = PullRequestRef {
        repository_owner: event.repository.owner.login.clone(),
        repository_name: event.repository.name.clone(),
        number,
        title: pr.title.clone(),
        status: map_pr_status(pr.state.as_deref().unwrap_or("open"), pr.merged),
        branch_name: (!pr.head.branch.is_empty()).then(|| pr.head.branch.clone()),
        url: pr.html_url.clone(),
    };

    let mut linked_tasks = Vec::new();
    for task in Task::find_many_by_display_ids(db, &task_ids).await? {
        GitHubLink::upsert_pull_request(db, task.id, &reference).await?;
        tracing::info!(
            task_id = task.id,
            display_id = %task.display_id,
            pr_number = number,
            "Linked pull request to task"
        );
        linked_tasks.push(task.display_id);
    }

    Ok(WebhookOutcome {
        message: format!("PR #{number} processed"),
        linked_tasks,
    })
}
