//! Per-action request de-duplication.
//!
//! Firing an action while a previous call for the same action is still in
//! flight aborts the previous call. Only the latest one completes; the
//! superseded ones resolve to [`ClientError::Cancelled`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{AbortHandle, Abortable};

use crate::error::ClientError;

#[derive(Default)]
struct GateState {
    next_generation: u64,
    in_flight: HashMap<String, (u64, AbortHandle)>,
}

/// Keeps one abort handle per action name.
#[derive(Clone, Default)]
pub struct RequestGate {
    state: Arc<Mutex<GateState>>,
}

impl RequestGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `request` as the current call for `action`, aborting the previous one.
    ///
    /// # Errors
    ///
    /// Returns whatever `request` returns, or [`ClientError::Cancelled`] when
    /// a newer call for the same action aborted this one.
    pub async fn run<T, F>(&self, action: &str, request: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let (handle, registration) = AbortHandle::new_pair();
        let generation = {
            let mut state = self.lock();
            state.next_generation += 1;
            let generation = state.next_generation;
            if let Some((_, previous)) = state
                .in_flight
                .insert(action.to_owned(), (generation, handle))
            {
                tracing::debug!(action, "Aborting superseded request");
                previous.abort();
            }
            generation
        };

        let _release = Release {
            gate: self,
            action,
            generation,
        };

        Abortable::new(request, registration)
            .await
            .unwrap_or(Err(ClientError::Cancelled))
    }

    /// Abort the in-flight call for `action`, if any.
    pub fn cancel(&self, action: &str) {
        if let Some((_, handle)) = self.lock().in_flight.remove(action) {
            handle.abort();
        }
    }

    /// Number of actions with a call in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Drops the gate entry when its call ends, unless a newer call replaced it.
struct Release<'a> {
    gate: &'a RequestGate,
    action: &'a str,
    generation: u64,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.lock();
        if state
            .in_flight
            .get(self.action)
            .is_some_and(|(generation, _)| *generation == self.generation)
        {
            state.in_flight.remove(self.action);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_single_call_completes() {
        let gate = RequestGate::new();
        let value = gate.run("load", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_second_call_cancels_first() {
        let gate = RequestGate::new();
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();

        let slow_gate = gate.clone();
        let slow = tokio::spawn(async move {
            slow_gate
                .run("load", async move {
                    let _ = ready_tx.send(());
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("old")
                })
                .await
        });

        ready_rx.await.unwrap();
        let fresh = gate.run("load", async { Ok("new") }).await.unwrap();
        assert_eq!(fresh, "new");
        assert!(matches!(slow.await.unwrap(), Err(ClientError::Cancelled)));
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_other_actions_are_independent() {
        let gate = RequestGate::new();
        let (a, b) = tokio::join!(
            gate.run("a", async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(1)
            }),
            gate.run("b", async { Ok(2) }),
        );
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cancel() {
        let gate = RequestGate::new();
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();
        let pending_gate = gate.clone();
        let pending = tokio::spawn(async move {
            pending_gate
                .run("save", async move {
                    let _ = ready_tx.send(());
                    std::future::pending::<Result<(), ClientError>>().await
                })
                .await
        });

        ready_rx.await.unwrap();
        gate.cancel("save");
        assert!(matches!(pending.await.unwrap(), Err(ClientError::Cancelled)));
    }
}
