//! The interactive search-stage-publish loop.
//!
//! ```text
//! CollectInput ─► Search ─► (no results) ─► CollectInput
//!                   │
//!                   └─► stage results ─► PromptPublish ─► [Publish] ─► PromptRepeat ─► CollectInput | Terminate
//! ```
//!
//! Date validation happens inside `CollectInput`. Closing stdin at any prompt
//! ends the session normally.

use crate::config::AppConfig;
use crate::console::{Prompter, collect_input, confirm};
use crate::dates::{format_date, validate_date};
use crate::models::{ArticleRecord, SearchQuery};
use crate::publisher::publish_staged;
use crate::search::{SearchClient, handle_response};
use crate::staging::{AppendOutcome, StagingStore};
use crate::stream::EventStream;
use chrono::{Local, NaiveDate};
use serde_json::Value;
use std::io;
use tracing::{error, info, instrument, warn};

#[derive(Debug)]
enum State {
    CollectInput,
    Search(SearchQuery),
    PromptPublish,
    Publish,
    PromptRepeat,
    Terminate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct Session<'a, P, St, S> {
    config: &'a AppConfig,
    console: &'a mut P,
    search: &'a SearchClient,
    store: &'a St,
    stream: &'a S,
    clock: fn() -> NaiveDate,
}

impl<'a, P, St, S> Session<'a, P, St, S>
where
    P: Prompter,
    St: StagingStore,
    S: EventStream,
{
    pub fn new(
        config: &'a AppConfig,
        console: &'a mut P,
        search: &'a SearchClient,
        store: &'a St,
        stream: &'a S,
    ) -> Self {
        Self {
            config,
            console,
            search,
            store,
            stream,
            clock: local_today,
        }
    }

    /// Drive the loop until the user declines another search or input ends.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut state = State::CollectInput;
        loop {
            if let State::Terminate = state {
                info!("Session finished");
                return Ok(());
            }
            state = match self.step(state).await {
                Ok(next) => next,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    info!("Input closed; ending session");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
        }
    }

    async fn step(&mut self, state: State) -> io::Result<State> {
        let next = match state {
            State::CollectInput => {
                let today = (self.clock)();
                let (text, date_from) = collect_input(self.console, &format_date(today))?;
                let (from_date, order) = validate_date(date_from, today, self.console)?;
                State::Search(SearchQuery {
                    text,
                    from_date,
                    order,
                })
            }
            State::Search(query) => {
                println!(" ");
                println!(
                    "...Searching Guardian for articles on {} from {}...",
                    query.text.to_uppercase(),
                    query.from_date
                );
                println!(" ");

                let results = handle_response(self.search.search(&query).await);
                if results.is_empty() {
                    println!("No data found...");
                    println!();
                    State::CollectInput
                } else {
                    self.stage(&results).await;
                    State::PromptPublish
                }
            }
            State::PromptPublish => {
                if confirm(
                    self.console,
                    "Do you want to upload all data to the message board? (yes/no): ",
                )? {
                    State::Publish
                } else {
                    State::PromptRepeat
                }
            }
            State::Publish => {
                self.publish().await;
                State::PromptRepeat
            }
            State::PromptRepeat => {
                if confirm(self.console, "Do you want to make another search (yes/no): ")? {
                    println!();
                    State::CollectInput
                } else {
                    State::Terminate
                }
            }
            State::Terminate => State::Terminate,
        };
        Ok(next)
    }

    /// Print each result and append it to the staging store in API order.
    #[instrument(level = "info", skip_all, fields(count = results.len()))]
    async fn stage(&self, results: &[Value]) {
        let mut staged = 0usize;
        for (i, result) in results.iter().enumerate() {
            let Some(record) = ArticleRecord::from_result(result) else {
                warn!(index = i, "Search result is missing webTitle, webPublicationDate or webUrl");
                println!("Skipping a result with missing fields");
                println!(" ");
                continue;
            };
            println!("{}", record.web_title);
            println!("{}", record.web_publication_date);
            println!(" ");

            match self.store.append(&record).await {
                Ok(AppendOutcome::Stored) => staged += 1,
                Ok(AppendOutcome::Skipped) => {}
                Err(e) => {
                    error!(index = i, error = %e, "Failed to stage record");
                    println!("Could not save result locally: {e}");
                }
            }
        }
        info!(staged, "Staged search results");
    }

    async fn publish(&self) {
        println!();
        println!("uploading....");
        println!();

        match publish_staged(
            self.store,
            self.stream,
            &self.config.stream_name,
            self.config.delivery,
        )
        .await
        {
            Ok(report) if report.failed.is_empty() => println!("All Records uploaded"),
            Ok(report) => println!(
                "Uploaded {} of {} records",
                report.receipts.len(),
                report.attempted
            ),
            Err(e) => {
                error!(error = %e, "Could not publish staged records");
                println!("Could not read staged records: {e}");
            }
        }
    }
}
