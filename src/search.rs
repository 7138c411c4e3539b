//! Debounced search with a stale-response guard.
//!
//! [`SearchMachine`] holds the state transitions and counters and has no
//! timers of its own; [`SearchCoordinator`] drives it with tokio tasks and
//! publishes every state change on a watch channel.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::RemoteFetchError;
use crate::models::Movie;
use crate::tmdb::TmdbApi;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Pending,
    InFlight,
    Settled,
}

/// What the view receives on every state change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSnapshot {
    pub results: Vec<Movie>,
    pub searching: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// Text became blank; nothing to schedule.
    Cleared,
    /// Start a debounce timer carrying this ticket.
    Debounce(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub seq: u64,
    pub query: String,
}

#[derive(Debug)]
pub struct SearchMachine {
    phase: SearchPhase,
    query: String,
    results: Vec<Movie>,
    edit_ticket: u64,
    latest_seq: u64,
}

impl Default for SearchMachine {
    fn default() -> Self {
        Self {
            phase: SearchPhase::Idle,
            query: String::new(),
            results: Vec::new(),
            edit_ticket: 0,
            latest_seq: 0,
        }
    }
}

impl SearchMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            results: self.results.clone(),
            searching: self.phase == SearchPhase::InFlight,
        }
    }

    pub fn edit(&mut self, text: &str) -> Edit {
        self.edit_ticket += 1;
        if text.trim().is_empty() {
            self.phase = SearchPhase::Idle;
            self.query.clear();
            self.results.clear();
            // Burn a sequence number so whatever is still in flight is stale.
            self.latest_seq += 1;
            return Edit::Cleared;
        }
        self.query = text.to_string();
        self.phase = SearchPhase::Pending;
        Edit::Debounce(self.edit_ticket)
    }

    /// Debounce elapsed. Only the timer of the most recent edit may issue.
    pub fn issue(&mut self, ticket: u64) -> Option<SearchRequest> {
        if ticket != self.edit_ticket || self.phase != SearchPhase::Pending {
            return None;
        }
        self.latest_seq += 1;
        self.phase = SearchPhase::InFlight;
        Some(SearchRequest {
            seq: self.latest_seq,
            query: self.query.clone(),
        })
    }

    /// Apply a response. Returns `false` when it belongs to a superseded
    /// request and was dropped.
    pub fn settle(&mut self, seq: u64, outcome: Result<Vec<Movie>, RemoteFetchError>) -> bool {
        if seq != self.latest_seq {
            debug!(
                "Discarding stale search response (seq {}, latest {})",
                seq, self.latest_seq
            );
            return false;
        }
        self.results = match outcome {
            Ok(results) => results,
            Err(e) => {
                warn!("Search failed: {}", e);
                Vec::new()
            }
        };
        if self.phase == SearchPhase::InFlight {
            self.phase = SearchPhase::Settled;
        }
        true
    }
}

struct Shared {
    api: Arc<dyn TmdbApi>,
    debounce: Duration,
    machine: Mutex<SearchMachine>,
    timer: Mutex<Option<JoinHandle<()>>>,
    tx: watch::Sender<SearchSnapshot>,
}

#[derive(Clone)]
pub struct SearchCoordinator {
    shared: Arc<Shared>,
}

impl SearchCoordinator {
    pub fn new(api: Arc<dyn TmdbApi>, debounce: Duration) -> Self {
        let (tx, _rx) = watch::channel(SearchSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                api,
                debounce,
                machine: Mutex::new(SearchMachine::new()),
                timer: Mutex::new(None),
                tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.shared.tx.subscribe()
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.shared.tx.borrow().clone()
    }

    pub fn phase(&self) -> SearchPhase {
        lock(&self.shared.machine).phase()
    }

    /// Feed the full current query text. Must be called inside a tokio runtime.
    pub fn set_query(&self, text: &str) {
        let mut timer = lock(&self.shared.timer);
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let (edit, snapshot) = {
            let mut machine = lock(&self.shared.machine);
            let edit = machine.edit(text);
            (edit, machine.snapshot())
        };
        self.shared.tx.send_replace(snapshot);

        if let Edit::Debounce(ticket) = edit {
            let shared = self.shared.clone();
            *timer = Some(tokio::spawn(async move {
                tokio::time::sleep(shared.debounce).await;
                Shared::fire(shared, ticket);
            }));
        }
    }

    pub fn clear(&self) {
        self.set_query("");
    }
}

impl Shared {
    fn fire(shared: Arc<Shared>, ticket: u64) {
        let (request, snapshot) = {
            let mut machine = lock(&shared.machine);
            let Some(request) = machine.issue(ticket) else {
                return;
            };
            (request, machine.snapshot())
        };
        shared.tx.send_replace(snapshot);
        debug!("Issuing search #{} for '{}'", request.seq, request.query);

        // Detached: a newer edit never cancels the request, the guard in
        // `settle` drops its result instead.
        tokio::spawn(async move {
            let outcome = shared.api.search_movies(&request.query).await;
            let snapshot = {
                let mut machine = lock(&shared.machine);
                if !machine.settle(request.seq, outcome) {
                    return;
                }
                machine.snapshot()
            };
            shared.tx.send_replace(snapshot);
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
