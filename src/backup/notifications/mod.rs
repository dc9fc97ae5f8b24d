//! Push notifications about backup and prune outcomes.
//!
//! Delivery goes to an ntfy-style topic through a [`NotificationSink`].
//! [`Notifier`] decides whether a notice is sent at all and never lets a
//! delivery problem escape: failures are logged and dropped.

use crate::backup::redacted::RedactedString;
use crate::backup::result_error::result::Result;
use crate::backup::validate::validate_server_url;
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::{Display, Formatter};
use validator::Validate;

pub mod ntfy;

/// Notification priority. Variants are declared from lowest to highest so the
/// derived ordering matches the escalation order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Never send
    #[serde(alias = "off")]
    Disabled,
    Min,
    Low,
    #[default]
    Default,
    High,
    Urgent,
    Max,
}

impl Priority {
    pub fn highest(self, other: Priority) -> Priority {
        self.max(other)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Priority::Disabled)
    }

    /// Value of the ntfy `Priority` header, `None` when disabled.
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            Priority::Disabled => None,
            Priority::Min => Some("min"),
            Priority::Low => Some("low"),
            Priority::Default => Some("default"),
            Priority::High => Some("high"),
            Priority::Urgent => Some("urgent"),
            Priority::Max => Some("max"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Never,
    /// Right after every machine's attempt
    #[serde(alias = "every vm")]
    PerMachine,
    /// Once the whole phase of a job is over
    #[serde(alias = "single job")]
    PerJob,
}

/// Whether a notice reports a success or a failure. Decides which priority and
/// e-mail forwarding address of a target apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Failure => f.write_str("failure"),
        }
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(deny_unknown_fields, default)]
pub struct NotificationTarget {
    #[builder(default)]
    pub frequency: Frequency,
    #[builder(default)]
    pub success_priority: Priority,
    #[builder(default = Priority::High)]
    pub failure_priority: Priority,
    #[builder(into)]
    pub success_email: Option<String>,
    #[builder(into)]
    pub failure_email: Option<String>,
}

impl Default for NotificationTarget {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl NotificationTarget {
    pub fn priority(&self, outcome: Outcome) -> Priority {
        match outcome {
            Outcome::Success => self.success_priority,
            Outcome::Failure => self.failure_priority,
        }
    }

    pub fn email(&self, outcome: Outcome) -> Option<&str> {
        match outcome {
            Outcome::Success => self.success_email.as_deref(),
            Outcome::Failure => self.failure_email.as_deref(),
        }
        .filter(|email| !email.is_empty())
    }

    /// Priority of a job that ended with both successes and failures.
    pub fn incomplete_priority(&self) -> Priority {
        self.success_priority.highest(self.failure_priority)
    }
}

/// Where and how a job's notifications are posted
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate, Builder)]
#[serde(deny_unknown_fields, default)]
pub struct NotificationConfig {
    /// Base URL of the server, empty disables every notification
    #[validate(custom(function = validate_server_url))]
    #[builder(default, into)]
    pub server: String,
    #[builder(default, into)]
    pub topic: String,
    #[builder(into)]
    pub auth_user: Option<String>,
    #[builder(into)]
    pub auth_password: Option<RedactedString>,
    #[builder(default)]
    pub backup: NotificationTarget,
    #[builder(default)]
    pub prune: NotificationTarget,
}

impl NotificationConfig {
    pub fn topic_url(&self) -> String {
        format!("{}/{}", self.server.trim_end_matches('/'), self.topic)
    }

    /// Basic auth when a user is set, bearer token when only a password is.
    pub fn authorization(&self) -> Option<Authorization> {
        let user = self.auth_user.as_deref().filter(|u| !u.is_empty());
        let password = self.auth_password.as_ref().filter(|p| !p.is_empty());
        match (user, password) {
            (Some(user), password) => Some(Authorization::Basic {
                user: user.to_owned(),
                password: password.cloned(),
            }),
            (None, Some(token)) => Some(Authorization::Bearer(token.clone())),
            (None, None) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authorization {
    Basic {
        user: String,
        password: Option<RedactedString>,
    },
    Bearer(RedactedString),
}

/// What a phase wants to tell, before any target configuration is applied
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub outcome: Outcome,
    pub priority: Priority,
    pub title: String,
    pub body: String,
    pub tags: Vec<&'static str>,
}

/// Fully resolved request, ready to be posted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationRequest {
    pub url: String,
    pub title: String,
    pub priority: Priority,
    pub tags: Vec<&'static str>,
    pub email: Option<String>,
    pub authorization: Option<Authorization>,
    pub body: String,
}

pub trait NotificationSink {
    fn post(&self, request: &NotificationRequest) -> Result<()>;
}

impl<N: NotificationSink + ?Sized> NotificationSink for &N {
    fn post(&self, request: &NotificationRequest) -> Result<()> {
        (**self).post(request)
    }
}

/// Sends notices of one job through a sink; never fails.
pub struct Notifier<'a, N: NotificationSink> {
    config: &'a NotificationConfig,
    sink: &'a N,
}

impl<'a, N: NotificationSink> Notifier<'a, N> {
    pub fn new(config: &'a NotificationConfig, sink: &'a N) -> Self {
        Self { config, sink }
    }

    /// Builds the request for `notice`, or `None` when nothing must be sent.
    pub fn request(&self, target: &NotificationTarget, notice: &Notice) -> Option<NotificationRequest> {
        if self.config.server.is_empty() || notice.priority.is_disabled() {
            return None;
        }
        Some(NotificationRequest {
            url: self.config.topic_url(),
            title: notice.title.clone(),
            priority: notice.priority,
            tags: notice.tags.clone(),
            email: target.email(notice.outcome).map(str::to_owned),
            authorization: self.config.authorization(),
            body: notice.body.clone(),
        })
    }

    pub fn send(&self, target: &NotificationTarget, notice: &Notice) {
        let Some(request) = self.request(target, notice) else {
            tracing::debug!("Notification {:?} suppressed", notice.title);
            return;
        };
        match self.sink.post(&request) {
            Ok(()) => tracing::info!("Sent {} notification {:?}", notice.outcome, notice.title),
            Err(e) => tracing::warn!("Failed to send notification {:?}: {e}", notice.title),
        }
    }
}
