use std::fmt;

use strum::{AsRefStr, Display, EnumString};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Step {
    Landing,
    #[strum(serialize = "info")]
    ContactInfo,
    #[strum(serialize = "submission")]
    Entries,
    ThankYou,
}

impl Step {
    pub fn next(self) -> Option<Step> {
        match self {
            Step::Landing => Some(Step::ContactInfo),
            Step::ContactInfo => Some(Step::Entries),
            Step::Entries => Some(Step::ThankYou),
            Step::ThankYou => None,
        }
    }
}

/// User-visible message: a short title and a sentence of detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Where navigation actually landed, and anything to tell the user about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub step: Step,
    pub notice: Option<Notice>,
}

impl Arrival {
    fn at(step: Step) -> Self {
        Self { step, notice: None }
    }
}

pub struct Flow {
    session: Session,
}

impl Flow {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Opens `step`, applying the entries guard once on entry.
    pub fn enter(&self, step: Step) -> Arrival {
        match step {
            Step::Entries => match self.session.require_contact() {
                Ok(()) => Arrival::at(Step::Entries),
                Err(err) => Arrival {
                    step: Step::ContactInfo,
                    notice: Some(err.notice()),
                },
            },
            other => Arrival::at(other),
        }
    }

    /// Confirmation copy. Personalised only when a contact record happens to remain.
    pub fn thank_you_message(&self) -> String {
        match self.session.greeting_name() {
            Some(name) => format!("Thanks {name}! Your submission is being processed."),
            None => "Your submission is being processed.".to_string(),
        }
    }
}
