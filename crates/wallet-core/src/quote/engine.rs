use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{QuoteInput, QuoteSource, QuoteState};
use crate::types::Quote;

struct Inner {
    /// Bumped on every input change; a task may only publish while its
    /// generation is current.
    generation: u64,
    input: Option<QuoteInput>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    state: watch::Sender<QuoteState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `next` unless a newer input has superseded `generation`.
    fn advance(&self, generation: u64, next: QuoteState) -> bool {
        let inner = self.lock();
        if inner.generation != generation {
            debug!(
                stale = generation,
                current = inner.generation,
                "dropping quote update for superseded input"
            );
            return false;
        }
        self.state.send_replace(next);
        true
    }
}

/// Single-in-flight, last-input-wins quote session.
///
/// Each input change cancels the pending fetch, waits out the debounce
/// window and then asks the [`QuoteSource`]. Results computed for an input
/// that is no longer current are dropped. Must be driven from inside a
/// Tokio runtime.
pub struct QuoteEngine {
    source: Arc<dyn QuoteSource>,
    debounce: Duration,
    shared: Arc<Shared>,
}

impl QuoteEngine {
    pub fn new(source: Arc<dyn QuoteSource>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(QuoteState::Idle);
        Self {
            source,
            debounce,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    input: None,
                    task: None,
                }),
                state,
            }),
        }
    }

    pub fn state(&self) -> QuoteState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuoteState> {
        self.shared.state.subscribe()
    }

    pub fn current_input(&self) -> Option<QuoteInput> {
        self.shared.lock().input.clone()
    }

    /// Feeds a new input snapshot. Repeating the current input is a no-op;
    /// a blank amount clears the session.
    pub fn update_input(&self, input: QuoteInput) {
        if input.is_blank() {
            self.clear();
            return;
        }
        let mut inner = self.shared.lock();
        if inner.input.as_ref() == Some(&input) {
            return;
        }
        self.schedule(&mut inner, input, self.debounce);
    }

    /// Re-fetches the current input right away. Quotes never refresh on
    /// their own.
    pub fn refresh(&self) {
        let mut inner = self.shared.lock();
        if let Some(input) = inner.input.clone() {
            self.schedule(&mut inner, input, Duration::ZERO);
        }
    }

    /// Cancels any pending fetch and returns to `Idle`.
    pub fn clear(&self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        inner.input = None;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        self.shared.state.send_replace(QuoteState::Idle);
    }

    fn schedule(&self, inner: &mut Inner, input: QuoteInput, delay: Duration) {
        inner.generation += 1;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.input = Some(input.clone());
        self.shared.state.send_replace(QuoteState::Debouncing {
            input: input.clone(),
        });

        let generation = inner.generation;
        let shared = self.shared.clone();
        let source = self.source.clone();
        inner.task = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if !shared.advance(
                generation,
                QuoteState::Fetching {
                    input: input.clone(),
                },
            ) {
                return;
            }

            let next = match source.fetch_quote(&input).await {
                Ok(quote) => QuoteState::Ready { input, quote },
                Err(failure) => {
                    debug!(reason = ?failure.reason, error = %failure, "quote failed");
                    QuoteState::Failed { input, failure }
                }
            };
            shared.advance(generation, next);
        }));
    }

    /// The ready quote, if it was computed for exactly `input`.
    pub fn ready_quote_for(&self, input: &QuoteInput) -> Option<Quote> {
        match &*self.shared.state.borrow() {
            QuoteState::Ready { input: ready, quote } if ready == input => Some(quote.clone()),
            _ => None,
        }
    }

    /// Waits until the session is `Idle`, `Ready` or `Failed`.
    pub async fn wait_settled(&self) -> QuoteState {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(QuoteState::is_settled).await.map(|s| (*s).clone());
        match settled {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }
}

impl Drop for QuoteEngine {
    fn drop(&mut self) {
        if let Some(task) = self.shared.lock().task.take() {
            task.abort();
        }
    }
}
