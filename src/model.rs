use serde::{Deserialize, Serialize};

/// Store key holding the JSON-encoded [`ContactInfo`].
pub const USER_INFO_KEY: &str = "userInfo";
/// Store key holding the JSON-encoded draft [`EntrySet`].
pub const DRAFT_ENTRIES_KEY: &str = "draftEntries";

pub const ENTRY_COUNT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

impl ContactInfo {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    pub fn first_name(&self) -> Option<&str> {
        self.full_name.split(' ').next().filter(|name| !name.is_empty())
    }
}

/// The five free-text entries. All fields are required when decoding a draft so
/// that a partially written record is rejected rather than merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySet {
    pub entry1: String,
    pub entry2: String,
    pub entry3: String,
    pub entry4: String,
    pub entry5: String,
}

impl EntrySet {
    /// Entries in display order; index 0 is "Entry 1".
    pub fn as_array(&self) -> [&str; ENTRY_COUNT] {
        [
            &self.entry1,
            &self.entry2,
            &self.entry3,
            &self.entry4,
            &self.entry5,
        ]
    }

    /// Mutable access by 1-based entry number.
    pub fn entry_mut(&mut self, number: usize) -> Option<&mut String> {
        match number {
            1 => Some(&mut self.entry1),
            2 => Some(&mut self.entry2),
            3 => Some(&mut self.entry3),
            4 => Some(&mut self.entry4),
            5 => Some(&mut self.entry5),
            _ => None,
        }
    }

    pub fn with_entry(mut self, number: usize, text: impl Into<String>) -> Self {
        if let Some(slot) = self.entry_mut(number) {
            *slot = text.into();
        }
        self
    }

    pub fn has_required_entry(&self) -> bool {
        !self.entry1.trim().is_empty()
    }

    /// Non-empty entries paired with their 1-based number.
    pub fn filled(&self) -> impl Iterator<Item = (usize, &str)> {
        self.as_array()
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.is_empty())
            .map(|(idx, text)| (idx + 1, text))
    }
}
