//! Debounced, race-safe driver for the catalog query.
//!
//! Edits go in over a channel and snapshots come out over a `watch`. One task owns the
//! [`QueryMachine`]; provider calls run in their own tasks and report back tagged with the
//! sequence number they were issued under.

pub mod machine;

use crate::domain::movie::{MovieQuery, MovieQueryPatch, PageResult, DEFAULT_PAGE_SIZE};
use crate::error::CoreError;
use crate::provider::MovieCatalogProvider;
pub use machine::{Acceptance, Dispatch, QueryMachine, QuerySnapshot, QueryState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub debounce: Duration,
    pub initial_query: MovieQuery,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            initial_query: MovieQuery::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("QUERY_DEBOUNCE_MS") {
            if let Ok(ms) = s.parse::<u64>() {
                out.debounce = Duration::from_millis(ms);
            }
        }

        if let Ok(s) = std::env::var("QUERY_PAGE_SIZE") {
            if let Ok(n) = s.parse::<u32>() {
                out.initial_query.page_size = n;
            }
        }

        if out.initial_query.validate().is_err() {
            tracing::warn!(
                page_size = out.initial_query.page_size,
                "QUERY_PAGE_SIZE out of range; using default"
            );
            out.initial_query.page_size = DEFAULT_PAGE_SIZE;
        }

        out
    }
}

#[derive(Debug)]
enum Command {
    Edit(MovieQueryPatch),
    Retry,
    /// Acknowledged once every earlier command has been applied.
    Flush(oneshot::Sender<()>),
}

pub struct MovieQueryCoordinator {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<QuerySnapshot>,
    task: JoinHandle<()>,
}

impl MovieQueryCoordinator {
    /// Starts the coordinator in `Idle`; nothing is fetched until the first edit.
    pub fn spawn(provider: Arc<dyn MovieCatalogProvider>, config: CoordinatorConfig) -> Self {
        let machine = QueryMachine::new(config.initial_query);
        let (snapshot_tx, snapshots) = watch::channel(machine.snapshot());
        let (commands, command_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run(machine, provider, config.debounce, command_rx, snapshot_tx));

        Self {
            commands,
            snapshots,
            task,
        }
    }

    /// Queues a partial edit. Invalid edits are rejected here and never reach the queue.
    pub fn set_query(&self, patch: MovieQueryPatch) -> Result<(), CoreError> {
        patch.validate()?;
        self.send(Command::Edit(patch))
    }

    /// Re-issues the failed query. Has no effect unless the coordinator is `Failed`.
    pub fn retry(&self) -> Result<(), CoreError> {
        self.send(Command::Retry)
    }

    fn send(&self, command: Command) -> Result<(), CoreError> {
        self.commands.send(command).map_err(|_| closed())
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn query_state(&self) -> QueryState {
        self.snapshots.borrow().state
    }

    pub fn current_page_result(&self) -> Option<Arc<PageResult>> {
        self.snapshots.borrow().result.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot> {
        self.snapshots.clone()
    }

    /// Waits until every edit sent so far has been applied and the coordinator is no longer
    /// debouncing or waiting on the provider.
    pub async fn wait_settled(&self) -> Result<QuerySnapshot, CoreError> {
        let (ack, acked) = oneshot::channel();
        self.send(Command::Flush(ack))?;
        acked.await.map_err(|_| closed())?;

        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| {
                !matches!(s.state, QueryState::PendingDebounce | QueryState::InFlight)
            })
            .await
            .map_err(|_| closed())?
            .clone();
        Ok(snapshot)
    }

    /// Stops accepting edits and waits for the driver task to exit.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "query coordinator task ended abnormally");
        }
    }
}

fn closed() -> CoreError {
    CoreError::ProviderUnavailable {
        provider: "query_coordinator",
        stage: "closed",
        detail: "coordinator task has stopped".to_string(),
    }
}

type Response = (u64, Result<PageResult, CoreError>);

async fn run(
    mut machine: QueryMachine,
    provider: Arc<dyn MovieCatalogProvider>,
    debounce: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<QuerySnapshot>,
) {
    let (response_tx, mut responses) = mpsc::unbounded_channel::<Response>();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    None => break,
                    Some(Command::Edit(patch)) => {
                        if let Err(err) = machine.edit(&patch) {
                            tracing::warn!(error = %err, "rejected query edit");
                            continue;
                        }
                        deadline = Some(Instant::now() + debounce);
                    }
                    Some(Command::Retry) => match machine.retry() {
                        Some(dispatch) => spawn_fetch(&provider, dispatch, &response_tx),
                        None => tracing::debug!(state = ?machine.state(), "retry ignored"),
                    },
                    Some(Command::Flush(ack)) => {
                        let _ = ack.send(());
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                if let Some(dispatch) = machine.debounce_elapsed() {
                    spawn_fetch(&provider, dispatch, &response_tx);
                }
            }
            Some((seq, response)) = responses.recv() => {
                machine.on_response(seq, response);
            }
        }

        let next = machine.snapshot();
        snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    tracing::debug!(issued_seq = machine.issued_seq(), "query coordinator stopped");
}

fn spawn_fetch(
    provider: &Arc<dyn MovieCatalogProvider>,
    dispatch: Dispatch,
    responses: &mpsc::UnboundedSender<Response>,
) {
    let provider = provider.clone();
    let responses = responses.clone();
    tracing::debug!(seq = dispatch.seq, query = ?dispatch.query, "dispatching catalog query");

    tokio::spawn(async move {
        let t0 = std::time::Instant::now();
        let name = provider.provider_name();
        let result = provider
            .query(&dispatch.query)
            .await
            .map_err(|e| CoreError::provider(name, "query", &e));
        tracing::debug!(
            seq = dispatch.seq,
            provider = name,
            ok = result.is_ok(),
            elapsed_ms = t0.elapsed().as_millis(),
            "catalog query finished"
        );
        // The driver may already be gone; a dropped response is simply stale.
        let _ = responses.send((dispatch.seq, result));
    });
}
