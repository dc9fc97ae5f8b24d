use crate::backup::function_path;
use crate::backup::notifications::{Authorization, NotificationRequest, NotificationSink};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use function_name::named;
use itertools::Itertools;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts notifications to an ntfy server over HTTP
#[derive(Clone, Debug)]
pub struct NtfySink {
    agent: ureq::Agent,
}

impl Default for NtfySink {
    fn default() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build(),
        }
    }
}

impl Authorization {
    pub fn header_value(&self) -> String {
        match self {
            Authorization::Basic { user, password } => {
                let password = password.as_ref().map(|p| p.inner().as_str()).unwrap_or("");
                format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
            }
            Authorization::Bearer(token) => format!("Bearer {}", token.inner()),
        }
    }
}

impl NotificationRequest {
    /// Header name/value pairs in the order they are sent.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some(auth) = &self.authorization {
            headers.push(("Authorization", auth.header_value()));
        }
        headers.push(("Title", self.title.clone()));
        if let Some(priority) = self.priority.header_value() {
            headers.push(("Priority", priority.to_owned()));
        }
        headers.push(("Tags", self.tags.iter().join(",")));
        if let Some(email) = &self.email {
            headers.push(("Email", email.clone()));
        }
        headers
    }
}

impl NotificationSink for NtfySink {
    #[named]
    fn post(&self, request: &NotificationRequest) -> Result<()> {
        tracing::debug!("Posting notification {:?} to {}", request.title, request.url);
        let http_request = request
            .headers()
            .into_iter()
            .fold(self.agent.post(&request.url), |req, (name, value)| {
                req.set(name, &value)
            });
        http_request
            .send_string(&request.body)
            .map(|_| ())
            .map_err(Error::from)
            .add_msg(format!("Failed to post notification to {}", request.url))
            .add_fn_name(function_path!())
    }
}
