use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::flow::{Notice, Step};
use crate::message::format_message;
use crate::model::EntrySet;
use crate::retry::{retry, RetryPolicy};
use crate::session::{Session, SessionError};
use crate::webhook::{WebhookError, WebhookPayload, WebhookTransport};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("the first entry is empty")]
    MissingEntry,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("webhook url is not configured")]
    NotConfigured,

    #[error("submission failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: WebhookError,
    },
}

impl SubmissionError {
    pub fn notice(&self) -> Notice {
        match self {
            SubmissionError::MissingEntry => {
                Notice::new("Missing Entry", "Please fill in at least the first entry.")
            }
            SubmissionError::Session(err) => err.notice(),
            SubmissionError::NotConfigured => Notice::new(
                "Submission Failed",
                "The submission endpoint is not configured. Please contact support.",
            ),
            SubmissionError::Exhausted { attempts: 1, .. } => Notice::new(
                "Submission Failed",
                "Unable to submit your entries. Please check your internet connection and try again.",
            ),
            SubmissionError::Exhausted { attempts, .. } => Notice::new(
                "Submission Failed",
                format!(
                    "Submission failed after {attempts} attempts. Please try again later \
                     or contact support if the problem persists."
                ),
            ),
        }
    }

    /// Step the user should be sent back to, if leaving the entries step.
    pub fn redirect(&self) -> Option<Step> {
        match self {
            SubmissionError::Session(_) => Some(Step::ContactInfo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub id: Uuid,
    pub attempts: u32,
}

impl Submitted {
    pub fn next_step(&self) -> Step {
        Step::ThankYou
    }
}

pub struct Submitter {
    session: Session,
    transport: Arc<dyn WebhookTransport>,
    endpoint: Option<String>,
    policy: RetryPolicy,
}

impl Submitter {
    pub fn new(
        session: Session,
        transport: Arc<dyn WebhookTransport>,
        endpoint: Option<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            session,
            transport,
            endpoint,
            policy,
        }
    }

    pub async fn submit(&self, entries: &EntrySet) -> Result<Submitted, SubmissionError> {
        if !entries.has_required_entry() {
            return Err(SubmissionError::MissingEntry);
        }
        let contact = self.session.load_contact()?;
        let url = self
            .endpoint
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                tracing::error!("webhook url not configured");
                SubmissionError::NotConfigured
            })?;

        let payload = WebhookPayload {
            content: format_message(&contact, entries),
        };
        let id = Uuid::new_v4();
        let attempts = AtomicU32::new(0);
        let transport = &self.transport;
        let payload = &payload;

        let outcome = retry(self.policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { transport.post(url, payload).await }
        })
        .instrument(tracing::info_span!("submission", %id))
        .await;

        let attempts = attempts.into_inner();
        match outcome {
            Ok(()) => {
                tracing::info!(%id, attempts, "entries submitted");
                self.session.complete();
                Ok(Submitted { id, attempts })
            }
            Err(source) => {
                tracing::error!(%id, attempts, error = %source, "submission abandoned");
                Err(SubmissionError::Exhausted { attempts, source })
            }
        }
    }
}
