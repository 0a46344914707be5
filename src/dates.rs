//! Start-date validation.
//!
//! The validator is a two-state machine: it sits in
//! [`DateState::AwaitingInput`] until the guard in [`step`] accepts the
//! candidate (empty input or an exact `YYYY-MM-DD` date), then moves to
//! [`DateState::Accepted`]. Rejected input is corrected by re-prompting and
//! there is no attempt limit.

use crate::console::Prompter;
use crate::models::OrderBy;
use chrono::NaiveDate;
use std::io;
use tracing::debug;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateState {
    AwaitingInput(String),
    Accepted { from_date: String, order: OrderBy },
}

/// Render a date the way the search API expects it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Apply the acceptance guard to one candidate string.
///
/// Returns `Accepted` with today's date for empty input, `Accepted` with the
/// candidate unchanged when it is exactly a `YYYY-MM-DD` date, and
/// `AwaitingInput` otherwise. chrono alone also takes leading whitespace,
/// signed years and unpadded fields, so the parsed date must render back to
/// the same string.
pub fn step(candidate: String, today: NaiveDate) -> DateState {
    if candidate.is_empty() {
        return DateState::Accepted {
            from_date: format_date(today),
            order: OrderBy::Newest,
        };
    }
    match NaiveDate::parse_from_str(&candidate, DATE_FORMAT) {
        Ok(date) if format_date(date) == candidate => DateState::Accepted {
            from_date: candidate,
            order: OrderBy::Newest,
        },
        _ => DateState::AwaitingInput(candidate),
    }
}

/// Validate `date_from`, re-prompting on the console until it is accepted.
pub fn validate_date<P: Prompter>(
    date_from: String,
    today: NaiveDate,
    console: &mut P,
) -> io::Result<(String, OrderBy)> {
    let mut state = step(date_from, today);
    loop {
        match state {
            DateState::Accepted { from_date, order } => {
                debug!(%from_date, %order, "Accepted start date");
                return Ok((from_date, order));
            }
            DateState::AwaitingInput(rejected) => {
                println!(" ");
                println!("{rejected} is not a valid date");
                println!("Click Enter to search from today's date: {}", format_date(today));
                let retry = console.ask("Please enter a valid date YYYY-MM-DD: ")?;
                state = step(retry, today);
            }
        }
    }
}
