use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::app::{Result, Session, WarblerError};
use crate::domain::Status;
use crate::notify::Notifier;
use crate::poller::{format_interval, parse_interval, Poller};
use crate::stream::CloseReason;

/// Prints each status as one line on stdout.
pub struct ConsoleNotifier {
    show_ids: bool,
}

impl ConsoleNotifier {
    pub fn new(show_ids: bool) -> Self {
        Self { show_ids }
    }

    pub fn render(&self, status: &Status) -> String {
        if self.show_ids {
            format!("[{}] {}", status.id, status.summary_line())
        } else {
            status.summary_line()
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn popup(&self, status: &Status, avatar: Option<&Path>) {
        println!("{}", self.render(status));
        if let Some(path) = avatar {
            tracing::trace!(avatar = %path.display(), "avatar ready");
        }
    }
}

/// A token that fires on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}

fn print_oldest_first(statuses: &[Status], notifier: &ConsoleNotifier) {
    for status in statuses.iter().rev() {
        println!("{}", notifier.render(status));
    }
}

pub async fn show_timeline(session: &mut Session, notifier: &ConsoleNotifier) -> Result<()> {
    let statuses = session.fetch_timeline().await?;
    if statuses.is_empty() {
        println!("No statuses");
        return Ok(());
    }
    print_oldest_first(&statuses, notifier);
    Ok(())
}

pub async fn watch_timeline(
    session: &mut Session,
    notifier: &ConsoleNotifier,
    interval: Option<&str>,
) -> Result<()> {
    let mut poller = Poller::new(session.config());
    if let Some(interval) = interval {
        let secs = parse_interval(interval).map_err(WarblerError::Config)?;
        poller = poller.with_fetch_interval(Duration::from_secs(secs));
        println!("Polling every {}", format_interval(secs));
    }

    let cancel = cancel_on_ctrl_c();
    poller.run(session, notifier, &cancel).await;
    Ok(())
}

pub async fn search(session: &mut Session, notifier: &ConsoleNotifier, query: &str) -> Result<()> {
    let statuses = session.search(query).await?;
    if statuses.is_empty() {
        println!("No results for {}", query);
        return Ok(());
    }
    print_oldest_first(&statuses, notifier);
    Ok(())
}

pub async fn follow_stream(session: &Session, notifier: &ConsoleNotifier) -> Result<()> {
    let cancel = cancel_on_ctrl_c();
    let outcome = session.stream(notifier, &cancel).await?;

    match outcome.reason {
        CloseReason::Cancelled => println!("Stream stopped"),
        CloseReason::ServerClosed => println!("Server closed the stream"),
        CloseReason::ServerDisconnect(Some(reason)) => println!("Disconnected: {}", reason),
        CloseReason::ServerDisconnect(None) => println!("Disconnected by server"),
    }
    println!("Received {} statuses", outcome.stats.statuses);
    Ok(())
}

pub async fn post(session: &Session, words: &[String]) -> Result<()> {
    let sent = session.update_status(&words.join(" ")).await?;
    println!("Posted: {}", sent);
    Ok(())
}

pub async fn obtain_token(session: &mut Session, username: &str, password: &str) -> Result<()> {
    let token = session.exchange_token(username, password).await?;
    println!("Add these lines to your config file:");
    println!("token_key = \"{}\"", token.key);
    println!("token_secret = \"{}\"", token.secret);
    Ok(())
}
