use std::sync::Arc;

use thiserror::Error;

use crate::flow::Notice;
use crate::model::{ContactInfo, DRAFT_ENTRIES_KEY, USER_INFO_KEY};
use crate::storage::KeyValueStore;
use crate::validation::{validate_contact, ContactError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoContactInfo,
    ContactInfoPresent,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Entries step opened without a contact record.
    #[error("contact details have not been collected")]
    Required,
    /// Contact record vanished before submission.
    #[error("contact details are no longer stored")]
    Expired,
    #[error("stored contact details are unreadable: {0}")]
    Corrupt(String),
}

impl SessionError {
    pub fn notice(&self) -> Notice {
        match self {
            SessionError::Required => Notice::new(
                "Session Required",
                "Please start from the beginning to collect your information.",
            ),
            SessionError::Expired => {
                Notice::new("Session Expired", "Please start over from the beginning.")
            }
            SessionError::Corrupt(_) => {
                Notice::new("Session Error", "Please start over from the beginning.")
            }
        }
    }
}

/// Existence of `userInfo` is the only state signal.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn state(&self) -> SessionState {
        if self.store.get(USER_INFO_KEY).is_some() {
            SessionState::ContactInfoPresent
        } else {
            SessionState::NoContactInfo
        }
    }

    /// Validates and persists the contact step. Nothing is written on failure.
    pub fn save_contact(&self, info: &ContactInfo) -> Result<(), ContactError> {
        validate_contact(info)?;
        match serde_json::to_string(info) {
            Ok(json) => {
                self.store.set(USER_INFO_KEY, &json);
                tracing::info!("contact details stored");
            }
            Err(err) => tracing::error!(?err, "serialising contact details"),
        }
        Ok(())
    }

    /// Guard run once when the entries step is entered.
    pub fn require_contact(&self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::ContactInfoPresent => Ok(()),
            SessionState::NoContactInfo => {
                tracing::warn!("entries step opened without contact details");
                Err(SessionError::Required)
            }
        }
    }

    pub fn load_contact(&self) -> Result<ContactInfo, SessionError> {
        let raw = self.store.get(USER_INFO_KEY).ok_or(SessionError::Expired)?;
        serde_json::from_str(&raw).map_err(|err| {
            tracing::error!(?err, "parsing stored contact details");
            SessionError::Corrupt(err.to_string())
        })
    }

    /// Success terminal: both persisted records are dropped together.
    pub fn complete(&self) {
        self.store.remove(USER_INFO_KEY);
        self.store.remove(DRAFT_ENTRIES_KEY);
        tracing::info!("session cleared after submission");
    }

    /// User-requested abandon of an in-progress session.
    pub fn reset(&self) {
        self.store.remove(USER_INFO_KEY);
        self.store.remove(DRAFT_ENTRIES_KEY);
        tracing::info!("session reset");
    }

    /// First name for the confirmation page, if the record is still around.
    pub fn greeting_name(&self) -> Option<String> {
        let raw = self.store.get(USER_INFO_KEY)?;
        match serde_json::from_str::<ContactInfo>(&raw) {
            Ok(info) => info.first_name().map(str::to_owned),
            Err(err) => {
                tracing::debug!(?err, "ignoring unreadable contact details on confirmation");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use assert_matches::assert_matches;

    fn session() -> (Arc<MemoryStore>, Session) {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());
        (store, session)
    }

    #[test]
    fn valid_contact_moves_to_present() {
        let (store, session) = session();
        assert_eq!(session.state(), SessionState::NoContactInfo);

        let info = ContactInfo::new("Jane Doe", "jane@x.com", "+1 555-1234");
        session.save_contact(&info).expect("valid contact");

        assert_eq!(session.state(), SessionState::ContactInfoPresent);
        assert!(session.require_contact().is_ok());
        assert_eq!(session.load_contact(), Ok(info));
        assert!(store.contains(USER_INFO_KEY));
    }

    #[test]
    fn invalid_contact_writes_nothing() {
        let (store, session) = session();
        let info = ContactInfo::new("Jane Doe", "jane@x", "+1 555-1234");
        assert_eq!(session.save_contact(&info), Err(ContactError::InvalidEmail));
        assert!(store.writes_for(USER_INFO_KEY).is_empty());
        assert_eq!(session.require_contact(), Err(SessionError::Required));
    }

    #[test]
    fn unreadable_record_still_counts_as_present_but_fails_to_load() {
        let (store, session) = session();
        store.set(USER_INFO_KEY, "{not json");
        assert_eq!(session.state(), SessionState::ContactInfoPresent);
        assert_matches!(session.load_contact(), Err(SessionError::Corrupt(_)));
        assert_eq!(session.greeting_name(), None);
    }

    #[test]
    fn complete_clears_both_keys() {
        let (store, session) = session();
        store.set(
            USER_INFO_KEY,
            r#"{"fullName":"Jane Doe","email":"j@x.io","phone":"5551234"}"#,
        );
        store.set(DRAFT_ENTRIES_KEY, "{}");
        assert_eq!(session.greeting_name().as_deref(), Some("Jane"));

        session.complete();
        assert!(!store.contains(USER_INFO_KEY));
        assert!(!store.contains(DRAFT_ENTRIES_KEY));
        assert_eq!(session.state(), SessionState::NoContactInfo);
        assert_eq!(session.load_contact(), Err(SessionError::Expired));
        assert_eq!(session.greeting_name(), None);
    }

    #[test]
    fn storage_outage_reads_as_no_session() {
        let (store, session) = session();
        session
            .save_contact(&ContactInfo::new("Jane Doe", "jane@x.com", "5551234"))
            .expect("valid contact");
        store.set_unavailable(true);
        assert_eq!(session.state(), SessionState::NoContactInfo);
        assert_eq!(session.require_contact(), Err(SessionError::Required));
    }

    #[test]
    fn notices_match_each_session_error() {
        assert_eq!(SessionError::Required.notice().title, "Session Required");
        assert_eq!(SessionError::Expired.notice().title, "Session Expired");
        assert_eq!(SessionError::Corrupt("x".into()).notice().title, "Session Error");
    }
}
