use std::fmt::Write as _;

use crate::model::{ContactInfo, EntrySet};

const NAME_MIN_WIDTH: usize = 20;
const EMAIL_MIN_WIDTH: usize = 20;
const PHONE_MIN_WIDTH: usize = 15;
const TABLE_MIN_WIDTH: usize = 30;
const TABLE_PADDING: usize = 10;
const HEADER: &str = "User Info";
/// Width of the `| Name:  ` style label prefix, less the trailing pipe.
const LABEL_WIDTH: usize = 7;

pub fn column_width(contact: &ContactInfo) -> usize {
    let name = display_len(&contact.full_name).max(NAME_MIN_WIDTH);
    let email = display_len(&contact.email).max(EMAIL_MIN_WIDTH);
    let phone = display_len(&contact.phone).max(PHONE_MIN_WIDTH);
    name.max(email).max(phone).max(TABLE_MIN_WIDTH) + TABLE_PADDING
}

pub fn format_message(contact: &ContactInfo, entries: &EntrySet) -> String {
    let width = column_width(contact);
    let border = format!("+{}+", "-".repeat(width + 2));
    let gap = width - display_len(HEADER);
    let field_width = width - LABEL_WIDTH;

    let mut out = String::new();
    out.push_str("```\n");
    let _ = writeln!(out, "{border}");
    let _ = writeln!(
        out,
        "|{}{HEADER}{}|",
        " ".repeat(gap / 2),
        " ".repeat(gap - gap / 2)
    );
    let _ = writeln!(out, "{border}");
    let _ = writeln!(out, "| Name:  {}|", pad_end(&contact.full_name, field_width));
    let _ = writeln!(out, "| Email: {}|", pad_end(&contact.email, field_width));
    let _ = writeln!(out, "| Phone: {}|", pad_end(&contact.phone, field_width));
    let _ = writeln!(out, "{border}");
    out.push_str("```\n\n**Full Entries:**");
    for (number, text) in entries.filled() {
        let _ = write!(out, "\n**Entry {number}:** {text}");
    }
    out
}

// UTF-16 code units, the unit the chat client counts in.
fn display_len(text: &str) -> usize {
    text.encode_utf16().count()
}

fn pad_end(text: &str, width: usize) -> String {
    let len = display_len(text);
    let mut padded = String::with_capacity(text.len() + width.saturating_sub(len));
    padded.push_str(text);
    padded.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    padded
}
