use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::prompt::{prompt, read_stdin, LinePrompt};
use crate::config::AppConfig;
use crate::flow::{Flow, Step};
use crate::journaling::DraftAutosave;
use crate::model::{ContactInfo, EntrySet, ENTRY_COUNT};
use crate::session::{Session, SessionState};
use crate::storage::{KeyValueStore, StorageHandle};
use crate::submission::{SubmissionError, Submitted, Submitter};
use crate::webhook::{HttpWebhook, WebhookTransport};

#[derive(Args, Debug, Clone, Default)]
pub struct InfoArgs {
    /// Full name (prompted if omitted)
    #[arg(long)]
    pub name: Option<String>,
    /// Email address (prompted if omitted)
    #[arg(long)]
    pub email: Option<String>,
    /// Phone number (prompted if omitted)
    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EntryArgs {
    /// Entry number, 1 to 5
    #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
    pub number: u8,
    /// Entry text. If omitted, reads from stdin.
    #[arg()]
    pub text: Option<String>,
}

const PLACEHOLDERS: [&str; ENTRY_COUNT] = [
    "I have to pay rent in cash. Like... actual paper.",
    "Can't make an international payment without a passport-endorsed card",
    "No way to verify if a landlord is a scammer or just terrible.",
    "What else drives you crazy?",
    "One more thing that needs fixing...",
];

/// Shared handles for every command.
pub struct CommandContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn KeyValueStore>,
}

impl CommandContext {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { config, store }
    }

    pub fn session(&self) -> Session {
        Session::new(Arc::clone(&self.store))
    }

    pub fn flow(&self) -> Flow {
        Flow::new(self.session())
    }

    pub fn autosave(&self) -> DraftAutosave {
        DraftAutosave::new(Arc::clone(&self.store), &self.config.auto_save)
    }

    pub fn submitter_with(&self, transport: Arc<dyn WebhookTransport>) -> Submitter {
        Submitter::new(
            self.session(),
            transport,
            self.config.webhook.endpoint().map(str::to_owned),
            self.config.retry.policy(),
        )
    }

    fn submitter(&self) -> Result<Submitter> {
        let transport =
            HttpWebhook::new(self.config.webhook.timeout()).context("building webhook client")?;
        Ok(self.submitter_with(Arc::new(transport)))
    }
}

pub fn save_info(ctx: &CommandContext, args: InfoArgs) -> Result<()> {
    let full_name = match args.name {
        Some(name) => name,
        None => prompt("Full name")?,
    };
    let email = match args.email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let phone = match args.phone {
        Some(phone) => phone,
        None => prompt("Phone")?,
    };
    let info = ContactInfo {
        full_name,
        email,
        phone,
    };
    store_contact(ctx, &info)?;
    println!("Saved contact details. Next: rantbox entry 1 \"what's broken\"");
    Ok(())
}

fn store_contact(ctx: &CommandContext, info: &ContactInfo) -> Result<()> {
    if let Err(err) = ctx.session().save_contact(info) {
        bail!("{}", err.notice());
    }
    Ok(())
}

pub async fn write_entry(ctx: &CommandContext, args: EntryArgs) -> Result<()> {
    let text = match args.text {
        Some(text) => text,
        None => match read_stdin()? {
            Some(text) => text,
            None => prompt(&format!("Entry {}", args.number))?,
        },
    };
    update_draft(ctx, usize::from(args.number), &text).await?;
    println!("Saved entry {} to your draft.", args.number);
    Ok(())
}

async fn update_draft(ctx: &CommandContext, number: usize, text: &str) -> Result<()> {
    ensure_entries_step(&ctx.flow())?;
    let mut autosave = ctx.autosave();
    autosave.restore();
    if !autosave.set_entry(number, text) {
        bail!("entry number must be between 1 and {ENTRY_COUNT}");
    }
    autosave.settle().await;
    Ok(())
}

pub async fn submit(ctx: &CommandContext) -> Result<()> {
    let submitter = ctx.submitter()?;
    let message = submit_draft(ctx, &submitter).await?;
    println!("{message}");
    Ok(())
}

async fn submit_draft(ctx: &CommandContext, submitter: &Submitter) -> Result<String> {
    let flow = ctx.flow();
    ensure_entries_step(&flow)?;
    let mut autosave = ctx.autosave();
    autosave.restore();
    let entries = autosave.entries().clone();
    autosave.shutdown();

    match submitter.submit(&entries).await {
        Ok(submitted) => Ok(confirmation(&flow, &submitted)),
        Err(err) => bail!("{}", failure_text(&err)),
    }
}

pub fn status(ctx: &CommandContext, storage: &StorageHandle) -> Result<()> {
    print!("{}", render_status(ctx, storage)?);
    Ok(())
}

fn render_status(ctx: &CommandContext, storage: &StorageHandle) -> Result<String> {
    let session = ctx.session();
    let mut out = String::new();
    match session.state() {
        SessionState::ContactInfoPresent => match session.load_contact() {
            Ok(info) => {
                let _ = writeln!(out, "Contact   {} <{}> {}", info.full_name, info.email, info.phone);
            }
            Err(err) => {
                let _ = writeln!(out, "Contact   unreadable ({err})");
            }
        },
        SessionState::NoContactInfo => {
            let _ = writeln!(out, "Contact   not collected (run `rantbox info`)");
        }
    }

    let mut autosave = ctx.autosave();
    if autosave.restore() {
        let filled: Vec<_> = autosave.entries().filled().collect();
        let _ = writeln!(out, "Draft     {} of {ENTRY_COUNT} entries", filled.len());
        for (number, text) in filled {
            let _ = writeln!(out, "  {number}. {}", preview(text, 60));
        }
    } else {
        let _ = writeln!(out, "Draft     none");
    }
    autosave.shutdown();

    for entry in storage.entries().context("listing stored keys")? {
        let _ = writeln!(
            out,
            "Stored    {} (updated {})",
            entry.key,
            format_timestamp(entry.updated_at)
        );
    }

    let endpoint = if ctx.config.webhook.endpoint().is_some() {
        "configured"
    } else {
        "missing"
    };
    let _ = writeln!(out, "Webhook   {endpoint}");
    Ok(out)
}

pub fn reset(ctx: &CommandContext) -> Result<()> {
    ctx.session().reset();
    println!("Cleared saved contact details and draft entries.");
    Ok(())
}

/// Interactive walk through every step.
pub async fn start(ctx: &CommandContext) -> Result<()> {
    let flow = ctx.flow();
    let submitter = ctx.submitter()?;
    let mut input = LinePrompt::new();

    println!("RANT TO RICHES");
    println!("Speak out about what no one is saying, and win.");
    println!("Hosted by The Sierra Project\n");

    let mut step = if flow.session().state() == SessionState::ContactInfoPresent {
        println!("Picking up your saved session.\n");
        Step::Entries
    } else {
        Step::Landing
    };

    loop {
        let arrival = flow.enter(step);
        if let Some(notice) = &arrival.notice {
            println!("{notice}\n");
        }
        step = arrival.step;

        let next = match step {
            Step::Landing => {
                if !input.confirm("Get started?").await? {
                    return Ok(());
                }
                Step::ContactInfo
            }
            Step::ContactInfo => {
                if !collect_contact(&flow, &mut input).await? {
                    return Ok(());
                }
                Step::Entries
            }
            Step::Entries => match collect_entries(ctx, &flow, &submitter, &mut input).await? {
                Some(next) => next,
                None => return Ok(()),
            },
            Step::ThankYou => {
                println!("\nSubmission received! {}", flow.thank_you_message());
                println!("Close the terminal, cross your fingers, and start manifesting.");
                return Ok(());
            }
        };
        step = next;
    }
}

/// Prompts until a valid contact record is stored. `false` if stdin closed first.
async fn collect_contact(flow: &Flow, input: &mut LinePrompt) -> Result<bool> {
    println!("Let's get your info. Just the basics so we can reach you when you win.");
    loop {
        let Some(full_name) = input.ask("Full name").await? else {
            return Ok(false);
        };
        let Some(email) = input.ask("Email").await? else {
            return Ok(false);
        };
        let Some(phone) = input.ask("Phone").await? else {
            return Ok(false);
        };
        let info = ContactInfo {
            full_name,
            email,
            phone,
        };
        match flow.session().save_contact(&info) {
            Ok(()) => return Ok(true),
            Err(err) => println!("{}\n", err.notice()),
        }
    }
}

/// Returns the step to move to, or `None` if the user quit.
async fn collect_entries(
    ctx: &CommandContext,
    flow: &Flow,
    submitter: &Submitter,
    input: &mut LinePrompt,
) -> Result<Option<Step>> {
    let mut autosave = ctx.autosave();
    if autosave.restore() {
        println!("Restored your saved draft. Press Enter to keep an entry as it is.");
    }
    println!("\nTime to rant. Tell us 5 things that make you go \"why is this still a thing?\"");

    loop {
        for number in 1..=ENTRY_COUNT {
            let current = autosave.entries().as_array()[number - 1].to_string();
            let label = if current.is_empty() {
                format!("Entry {number}{} (e.g. {})", required_mark(number), PLACEHOLDERS[number - 1])
            } else {
                format!("Entry {number}{} [{}]", required_mark(number), preview(&current, 40))
            };
            let Some(line) = input.ask(&label).await? else {
                autosave.flush_now();
                return Ok(None);
            };
            if !line.trim().is_empty() {
                autosave.set_entry(number, &line);
            }
        }

        autosave.flush_now();
        let entries: EntrySet = autosave.entries().clone();
        println!("Sending your rants...");
        match submitter.submit(&entries).await {
            Ok(submitted) => {
                autosave.shutdown();
                tracing::info!(id = %submitted.id, "moving to confirmation");
                return Ok(Some(submitted.next_step()));
            }
            Err(err) => {
                println!("{}\n", err.notice());
                if let Some(redirect) = err.redirect() {
                    autosave.shutdown();
                    return Ok(Some(redirect));
                }
                if matches!(err, SubmissionError::MissingEntry) {
                    continue;
                }
                if !input.confirm("Try again?").await? {
                    autosave.shutdown();
                    return Ok(None);
                }
            }
        }
    }
}

fn ensure_entries_step(flow: &Flow) -> Result<()> {
    let arrival = flow.enter(Step::Entries);
    if let Some(notice) = arrival.notice {
        bail!("{notice} (run `rantbox info` first)");
    }
    Ok(())
}

fn confirmation(flow: &Flow, submitted: &Submitted) -> String {
    format!(
        "Submission received! {} ({} attempt{})",
        flow.thank_you_message(),
        submitted.attempts,
        if submitted.attempts == 1 { "" } else { "s" }
    )
}

fn failure_text(err: &SubmissionError) -> String {
    match err.redirect() {
        Some(Step::ContactInfo) => format!("{} (run `rantbox info` to start over)", err.notice()),
        _ => err.notice().to_string(),
    }
}

fn required_mark(number: usize) -> &'static str {
    if number == 1 {
        " *"
    } else {
        ""
    }
}

fn preview(text: &str, limit: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= limit {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

fn format_timestamp(epoch: i64) -> String {
    OffsetDateTime::from_unix_timestamp(epoch)
        .map(|dt| dt.format(&Rfc3339).unwrap_or_else(|_| epoch.to_string()))
        .unwrap_or_else(|_| epoch.to_string())
}
