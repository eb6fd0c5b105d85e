//! The long-poll loop: fetch, parse, dispatch, format, post, repeat.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::channels::{ChatTransport, InboundMessage};
use crate::command::CommandParser;
use crate::reply::{deliver, format_result};
use crate::routing::Router;
use crate::sessions::SessionState;

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationOutcome {
    FetchFailed,
    Empty,
    /// Same message id as the last one handled.
    Duplicate,
    /// Not addressed to the dispatcher.
    Ignored,
    Posted,
    PostFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    pub iterations: u64,
    pub fetch_failures: u64,
    pub empty: u64,
    pub duplicates: u64,
    pub ignored: u64,
    pub posted: u64,
    pub post_failures: u64,
}

impl LoopStats {
    fn record(&mut self, outcome: IterationOutcome) {
        self.iterations += 1;
        let counter = match outcome {
            IterationOutcome::FetchFailed => &mut self.fetch_failures,
            IterationOutcome::Empty => &mut self.empty,
            IterationOutcome::Duplicate => &mut self.duplicates,
            IterationOutcome::Ignored => &mut self.ignored,
            IterationOutcome::Posted => &mut self.posted,
            IterationOutcome::PostFailed => &mut self.post_failures,
        };
        *counter += 1;
    }
}

pub struct PollLoop {
    transport: Arc<dyn ChatTransport>,
    parser: Box<dyn CommandParser>,
    router: Box<dyn Router>,
    session: Box<dyn SessionState>,
    interval: Duration,
    dedupe: bool,
    last_handled: Option<String>,
    stats: LoopStats,
}

impl PollLoop {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        parser: Box<dyn CommandParser>,
        router: Box<dyn Router>,
        session: Box<dyn SessionState>,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            parser,
            router,
            session,
            interval,
            dedupe: true,
            last_handled: None,
            stats: LoopStats::default(),
        }
    }

    /// Skip a message whose id matches the last one handled.
    #[must_use]
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn session(&self) -> &dyn SessionState {
        self.session.as_ref()
    }

    /// Run one fetch-and-handle cycle without the leading delay.
    pub async fn tick(&mut self) -> IterationOutcome {
        let outcome = self.iterate().await;
        self.stats.record(outcome);
        outcome
    }

    async fn iterate(&mut self) -> IterationOutcome {
        let message = match self.transport.fetch_latest().await {
            Ok(Some(message)) => message,
            Ok(None) => return IterationOutcome::Empty,
            Err(e) => {
                tracing::warn!(transport = self.transport.name(), error = %e, "Fetch failed");
                return IterationOutcome::FetchFailed;
            }
        };

        if self.is_duplicate(&message) {
            return IterationOutcome::Duplicate;
        }
        if message.id.is_some() {
            self.last_handled.clone_from(&message.id);
        }

        self.handle(&message).await
    }

    fn is_duplicate(&self, message: &InboundMessage) -> bool {
        self.dedupe && message.id.is_some() && message.id == self.last_handled
    }

    async fn handle(&self, message: &InboundMessage) -> IterationOutcome {
        let command = self.parser.parse(&message.text, self.session.current());
        if command.is_unaddressed() {
            return IterationOutcome::Ignored;
        }
        tracing::info!(
            message_id = message.id.as_deref().unwrap_or("-"),
            sender = message.sender.as_deref().unwrap_or("-"),
            text = %message.text,
            "Handling command"
        );

        let result = self.router.dispatch(&command, self.session.as_ref()).await;
        let Some(post) = format_result(&result) else {
            return IterationOutcome::Ignored;
        };

        match deliver(self.transport.as_ref(), &post).await {
            Ok(()) => IterationOutcome::Posted,
            Err(e) => {
                tracing::warn!(transport = self.transport.name(), error = %e, "Post failed");
                IterationOutcome::PostFailed
            }
        }
    }

    /// Poll until `shutdown` resolves. Shutdown is honored both while waiting
    /// out the interval and in the middle of an iteration.
    pub async fn run_until<F>(mut self, shutdown: F) -> LoopStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(
            transport = self.transport.name(),
            parser = self.parser.name(),
            router = self.router.name(),
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            dedupe = self.dedupe,
            "Poll loop started"
        );

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.interval) => {}
            }
            let finished = tokio::select! {
                () = &mut shutdown => true,
                _ = self.tick() => false,
            };
            if finished {
                break;
            }
        }

        tracing::info!(
            iterations = self.stats.iterations,
            posted = self.stats.posted,
            fetch_failures = self.stats.fetch_failures,
            post_failures = self.stats.post_failures,
            "Poll loop stopped"
        );
        self.stats
    }
}
