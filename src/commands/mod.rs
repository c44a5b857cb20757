//! Console front end: one command per input line.

use crate::engine::{SkipReason, ToggleOutcome, VoteEngine};
use crate::error::EngineError;
use crate::models::{Poll, PollDraft};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  list                                  list polls (* marks the selected one, ✓ ones you voted on)
  show [poll]                           show results for a poll (default: selected)
  select <poll>|none                    select a poll and follow its updates
  vote <poll> <option>                  toggle your vote for an option
  create <question> | <opt1>; <opt2>[; ...] [--single]
  edit <poll> [--open|--close] [--single|--multiple]
  reset <poll>                          zero every tally on a poll
  delete <poll>                         delete a poll
  help
  quit
Polls and options may be given by id or by their 1-based position.";

const CREATE_USAGE: &str = "create <question> | <opt1>; <opt2>[; ...] [--single]";
const EDIT_USAGE: &str = "edit <poll> [--open|--close] [--single|--multiple]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Show(Option<String>),
    Select(Option<String>),
    Vote { poll: String, option: String },
    Create { question: String, options: Vec<String>, single: bool },
    /// `None` leaves the setting as it is.
    Edit { poll: String, active: Option<bool>, multiple: Option<bool> },
    Reset(String),
    Delete(String),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    match name.to_lowercase().as_str() {
        "" => Err(CommandError::Empty),
        "list" | "ls" => Ok(Command::List),
        "show" => match args.as_slice() {
            [] => Ok(Command::Show(None)),
            [poll] => Ok(Command::Show(Some(poll.to_string()))),
            _ => Err(CommandError::Usage("show [poll]")),
        },
        "select" => match args.as_slice() {
            ["none"] => Ok(Command::Select(None)),
            [poll] => Ok(Command::Select(Some(poll.to_string()))),
            _ => Err(CommandError::Usage("select <poll>|none")),
        },
        "vote" => match args.as_slice() {
            [poll, option] => Ok(Command::Vote {
                poll: poll.to_string(),
                option: option.to_string(),
            }),
            _ => Err(CommandError::Usage("vote <poll> <option>")),
        },
        "create" => parse_create(rest),
        "edit" => parse_edit(&args),
        "reset" => match args.as_slice() {
            [poll] => Ok(Command::Reset(poll.to_string())),
            _ => Err(CommandError::Usage("reset <poll>")),
        },
        "delete" | "rm" => match args.as_slice() {
            [poll] => Ok(Command::Delete(poll.to_string())),
            _ => Err(CommandError::Usage("delete <poll>")),
        },
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

// `<question> | <opt1>; <opt2> [--single]`
fn parse_create(rest: &str) -> Result<Command, CommandError> {
    let (rest, single) = match rest.strip_suffix("--single") {
        Some(rest) => (rest.trim_end(), true),
        None => (rest, false),
    };
    let (question, options) = rest.split_once('|').ok_or(CommandError::Usage(CREATE_USAGE))?;

    // Blank entries are left in; draft validation drops them
    let options = options.split(';').map(|option| option.trim().to_string()).collect();

    Ok(Command::Create {
        question: question.trim().to_string(),
        options,
        single,
    })
}

fn parse_edit(args: &[&str]) -> Result<Command, CommandError> {
    let (poll, flags) = args.split_first().ok_or(CommandError::Usage(EDIT_USAGE))?;
    if flags.is_empty() {
        return Err(CommandError::Usage(EDIT_USAGE));
    }

    let mut active = None;
    let mut multiple = None;
    for flag in flags {
        match *flag {
            "--open" => active = Some(true),
            "--close" => active = Some(false),
            "--single" => multiple = Some(false),
            "--multiple" => multiple = Some(true),
            _ => return Err(CommandError::Usage(EDIT_USAGE)),
        }
    }

    Ok(Command::Edit {
        poll: poll.to_string(),
        active,
        multiple,
    })
}

/// Run a parsed command and return the text to show. `Quit` is the caller's
/// to handle and yields an empty reply here.
pub async fn execute(engine: &VoteEngine, command: Command) -> Result<String, EngineError> {
    match command {
        Command::List => Ok(list(engine).await),
        Command::Show(reference) => {
            let poll = match reference {
                Some(reference) => resolve_poll(engine, &reference)?,
                None => match engine.selected_poll() {
                    Some(poll) => poll,
                    None => return Ok("No poll selected. Use 'select <poll>' or 'show <poll>'.".to_string()),
                },
            };
            Ok(engine.summary(&poll.id).await.unwrap_or_default())
        }
        Command::Select(None) => {
            engine.select_poll(None)?;
            Ok("Selection cleared".to_string())
        }
        Command::Select(Some(reference)) => {
            let poll = resolve_poll(engine, &reference)?;
            engine.select_poll(Some(&poll.id))?;
            Ok(engine.summary(&poll.id).await.unwrap_or_default())
        }
        Command::Vote { poll, option } => {
            let poll = resolve_poll(engine, &poll)?;
            let option_id = resolve_option(&poll, &option);
            let outcome = engine.toggle_vote(&poll.id, &option_id).await?;
            let message = describe(&outcome, &option_id);
            match outcome {
                ToggleOutcome::Skipped(_) => Ok(message),
                _ => Ok(format!("{}\n{}", message, engine.summary(&poll.id).await.unwrap_or_default())),
            }
        }
        Command::Create { question, options, single } => {
            let mut draft = PollDraft::new(question, options);
            if single {
                draft = draft.single_choice();
            }
            let poll = engine.create_poll(draft).await?;
            Ok(format!("Created poll {}\n{}", poll.id, engine.summary(&poll.id).await.unwrap_or_default()))
        }
        Command::Edit { poll, active, multiple } => {
            let poll = resolve_poll(engine, &poll)?;
            let mut draft = PollDraft::from_poll(&poll);
            if let Some(active) = active {
                draft.is_active = active;
            }
            if let Some(multiple) = multiple {
                draft.allow_multiple_votes = multiple;
            }
            let updated = engine.update_poll(&poll.id, draft).await?;
            Ok(format!("Updated poll {}\n{}", updated.id, engine.summary(&updated.id).await.unwrap_or_default()))
        }
        Command::Reset(reference) => {
            let poll = resolve_poll(engine, &reference)?;
            engine.reset_poll(&poll.id).await?;
            Ok(format!("Votes reset on poll {}", poll.id))
        }
        Command::Delete(reference) => {
            let poll = resolve_poll(engine, &reference)?;
            engine.delete_poll(&poll.id).await?;
            Ok(format!("Deleted poll {}", poll.id))
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok(String::new()),
    }
}

async fn list(engine: &VoteEngine) -> String {
    let snapshot = engine.snapshot();
    if snapshot.polls().is_empty() {
        return "No polls yet".to_string();
    }
    let selected = snapshot.selected_id();

    let mut lines = Vec::with_capacity(snapshot.polls().len());
    for (i, poll) in snapshot.polls().iter().enumerate() {
        let marker = if selected == Some(poll.id.as_str()) { "*" } else { " " };
        let voted = if engine.user_votes(&poll.id).await.is_empty() { "" } else { " ✓" };
        let status = if poll.is_active { "Active" } else { "Inactive" };
        lines.push(format!(
            "{}{}. {} [{}] ({} vote{}, {}){}",
            marker,
            i + 1,
            poll.question_text(),
            poll.id,
            poll.total_votes,
            if poll.total_votes == 1 { "" } else { "s" },
            status,
            voted
        ));
    }
    lines.join("\n")
}

// Poll by id first, then by position in the list
fn resolve_poll(engine: &VoteEngine, reference: &str) -> Result<Poll, EngineError> {
    if let Some(poll) = engine.poll(reference) {
        return Ok(poll);
    }
    reference
        .parse::<usize>()
        .ok()
        .and_then(|position| position.checked_sub(1))
        .and_then(|index| engine.polls().get(index).cloned())
        .ok_or_else(|| EngineError::PollNotFound(reference.to_string()))
}

// Unknown references are passed through; the engine skips them
fn resolve_option(poll: &Poll, reference: &str) -> String {
    if poll.option(reference).is_some() {
        return reference.to_string();
    }
    reference
        .parse::<usize>()
        .ok()
        .and_then(|position| position.checked_sub(1))
        .and_then(|index| poll.options.get(index))
        .map(|option| option.id.clone())
        .unwrap_or_else(|| reference.to_string())
}

fn describe(outcome: &ToggleOutcome, option_id: &str) -> String {
    match outcome {
        ToggleOutcome::Voted => format!("Voted for {}", option_id),
        ToggleOutcome::Unvoted => format!("Removed your vote for {}", option_id),
        ToggleOutcome::Replaced { previous } => {
            format!("Changed your vote from {} to {}", previous.join(", "), option_id)
        }
        ToggleOutcome::Skipped(SkipReason::PollNotFound) => "Poll not found".to_string(),
        ToggleOutcome::Skipped(SkipReason::OptionNotFound) => format!("No option {} on this poll", option_id),
        ToggleOutcome::Skipped(SkipReason::PollInactive) => "This poll is not accepting votes".to_string(),
        ToggleOutcome::Skipped(SkipReason::InFlight) => "Your previous vote is still being recorded".to_string(),
    }
}
