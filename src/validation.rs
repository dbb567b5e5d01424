use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::flow::Notice;
use crate::model::ContactInfo;

// Unicode `\d` and `\s` are wider than the browser form's classes. Digits are
// ASCII only; whitespace is the ECMAScript set, which adds U+FEFF and drops U+0085.
const FORM_WHITESPACE: &str =
    r"\t\n\x0B\x0C\r \x{A0}\x{1680}\x{2000}-\x{200A}\x{2028}\x{2029}\x{202F}\x{205F}\x{3000}\x{FEFF}";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let ws = FORM_WHITESPACE;
    let pattern = [r"^[^", ws, r"@]+@[^", ws, r"@]+\.[^", ws, r"@]+$"].concat();
    Regex::new(&pattern).expect("valid email regex")
});

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = [r"^\+?[0-9", FORM_WHITESPACE, r"\-()]{7,}$"].concat();
    Regex::new(&pattern).expect("valid phone regex")
});

pub fn is_valid_email(input: &str) -> bool {
    EMAIL_PATTERN.is_match(input)
}

pub fn is_valid_phone(input: &str) -> bool {
    PHONE_PATTERN.is_match(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContactError {
    #[error("full name is missing")]
    MissingName,
    #[error("email address is missing")]
    MissingEmail,
    #[error("email address is malformed")]
    InvalidEmail,
    #[error("phone number is missing")]
    MissingPhone,
    #[error("phone number is malformed")]
    InvalidPhone,
}

impl ContactError {
    pub fn notice(&self) -> Notice {
        match self {
            ContactError::MissingName => {
                Notice::new("Missing Information", "Please enter your full name.")
            }
            ContactError::MissingEmail => {
                Notice::new("Missing Information", "Please enter your email address.")
            }
            ContactError::InvalidEmail => {
                Notice::new("Invalid Email", "Please enter a valid email address.")
            }
            ContactError::MissingPhone => {
                Notice::new("Missing Information", "Please enter your phone number.")
            }
            ContactError::InvalidPhone => {
                Notice::new("Invalid Phone Number", "Please enter a valid phone number.")
            }
        }
    }
}

/// Checks name, email, then phone; the first failure wins.
pub fn validate_contact(info: &ContactInfo) -> Result<(), ContactError> {
    if info.full_name.trim().is_empty() {
        return Err(ContactError::MissingName);
    }
    if info.email.trim().is_empty() {
        return Err(ContactError::MissingEmail);
    }
    if !is_valid_email(&info.email) {
        return Err(ContactError::InvalidEmail);
    }
    if info.phone.trim().is_empty() {
        return Err(ContactError::MissingPhone);
    }
    if !is_valid_phone(&info.phone) {
        return Err(ContactError::InvalidPhone);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_accepts_simple_addresses() {
        for ok in ["jane@x.com", "a.b@c.d.e", "first+tag@mail.example.org"] {
            assert!(is_valid_email(ok), "{ok} should be valid");
        }
    }

    #[test]
    fn email_rejects_missing_at_or_dot() {
        for bad in [
            "",
            "plainaddress",
            "jane.doe.com",
            "jane@localhost",
            "jane@x.",
            "@x.com",
            "jane doe@x.com",
            "jane@@x.com",
            "jane@x .com",
        ] {
            assert!(!is_valid_email(bad), "{bad:?} should be invalid");
        }
    }

    #[test]
    fn phone_requires_seven_allowed_characters() {
        assert!(is_valid_phone("5551234"));
        assert!(is_valid_phone("+1 555-1234"));
        assert!(is_valid_phone("(555) 123 4567"));
        assert!(!is_valid_phone("555123"));
        assert!(!is_valid_phone("+555123"));
        assert!(!is_valid_phone("++5551234"));
        assert!(!is_valid_phone("555-CALL-NOW"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn phone_digits_are_ascii_only() {
        assert!(!is_valid_phone("০১৭১২৩৪৫৬৭৮"));
        assert!(!is_valid_phone("+৮৮০ ১৭১২-৩৪৫৬৭৮"));
        assert!(!is_valid_phone("٠١٢٣٤٥٦٧٨٩"));
        assert!(!is_valid_phone("５５５１２３４"));
        assert!(is_valid_phone("+880 1712-345678"));
        assert!(is_valid_phone("555\u{A0}1234"));
    }

    #[test]
    fn email_whitespace_follows_form_rules() {
        assert!(!is_valid_email("jane\u{FEFF}@x.com"));
        assert!(!is_valid_email("jane@x\u{3000}.com"));
        assert!(!is_valid_email("jane\u{A0}doe@x.com"));
        assert!(is_valid_email("jane\u{85}@x.com"));
    }

    #[test]
    fn short_inputs_never_pass_phone_check() {
        let samples = ["1", "12", "123456", "(12)34", "- - -"];
        for sample in samples {
            assert!(!is_valid_phone(sample), "{sample:?}");
            assert!(!is_valid_phone(&format!("+{sample}")), "+{sample:?}");
        }
    }

    #[test]
    fn contact_checks_run_in_fixed_order() {
        let blank_name = ContactInfo::new("  ", "not-an-email", "12");
        assert_eq!(validate_contact(&blank_name), Err(ContactError::MissingName));

        let bad_email = ContactInfo::new("Jane Doe", "not-an-email", "12");
        assert_eq!(validate_contact(&bad_email), Err(ContactError::InvalidEmail));

        let no_email = ContactInfo::new("Jane Doe", " ", "12");
        assert_eq!(validate_contact(&no_email), Err(ContactError::MissingEmail));

        let no_phone = ContactInfo::new("Jane Doe", "jane@x.com", "");
        assert_eq!(validate_contact(&no_phone), Err(ContactError::MissingPhone));

        let bad_phone = ContactInfo::new("Jane Doe", "jane@x.com", "12");
        assert_eq!(validate_contact(&bad_phone), Err(ContactError::InvalidPhone));

        let valid = ContactInfo::new("Jane Doe", "jane@x.com", "+1 555-1234");
        assert_eq!(validate_contact(&valid), Ok(()));
    }

    #[test]
    fn notices_name_the_failing_field() {
        let notice = ContactError::InvalidPhone.notice();
        assert_eq!(notice.title, "Invalid Phone Number");
        assert!(ContactError::MissingName.notice().description.contains("full name"));
    }
}
