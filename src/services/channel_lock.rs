//! Per-channel coalescing mutual exclusion
//!
//! At most one timeline operation runs per channel. A caller asking for the
//! same kind of operation that is already in flight does not queue a second
//! run: it waits for the running one and shares its outcome. A caller asking
//! for a different kind waits for the channel to free up and then runs its own.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::errors::{AppResult, SchedulerError};

/// `None` while running, then the leader's outcome
type Completion = Option<Result<(), String>>;

/// Which timeline operation holds a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Generate,
    Maintain,
    ResolveOverlaps,
}

/// What a call to [`ChannelLockManager::run_exclusive`] actually did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome<T> {
    /// This caller ran the operation
    Ran(T),
    /// The same operation was already running; this caller waited for it
    Joined,
}

impl<T> LockOutcome<T> {
    pub fn is_joined(&self) -> bool {
        matches!(self, LockOutcome::Joined)
    }

    pub fn into_ran(self) -> Option<T> {
        match self {
            LockOutcome::Ran(value) => Some(value),
            LockOutcome::Joined => None,
        }
    }
}

#[derive(Debug)]
struct InFlight {
    kind: OperationKind,
    run_id: u64,
    completion: watch::Receiver<Completion>,
}

enum Role {
    Leader {
        run_id: u64,
        sender: watch::Sender<Completion>,
    },
    Follower(watch::Receiver<Completion>),
    Wait(watch::Receiver<Completion>),
}

/// In-process table of channels with an operation in flight
#[derive(Debug, Default)]
pub struct ChannelLockManager {
    in_flight: Mutex<HashMap<Uuid, InFlight>>,
    next_run_id: AtomicU64,
}

/// Removes the leader's entry however its future ends
struct InFlightGuard<'a> {
    manager: &'a ChannelLockManager,
    channel_id: Uuid,
    run_id: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.manager.lock_map();
        if in_flight
            .get(&self.channel_id)
            .is_some_and(|entry| entry.run_id == self.run_id)
        {
            in_flight.remove(&self.channel_id);
        }
    }
}

impl ChannelLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<Uuid, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_in_flight(&self, channel_id: Uuid) -> bool {
        self.lock_map().contains_key(&channel_id)
    }

    /// Kind of the operation currently holding `channel_id`
    pub fn in_flight_kind(&self, channel_id: Uuid) -> Option<OperationKind> {
        self.lock_map().get(&channel_id).map(|entry| entry.kind)
    }

    pub fn in_flight_channels(&self) -> Vec<Uuid> {
        self.lock_map().keys().copied().collect()
    }

    fn claim(&self, channel_id: Uuid, kind: OperationKind) -> Role {
        let mut in_flight = self.lock_map();
        match in_flight.entry(channel_id) {
            Entry::Occupied(entry) if entry.get().kind == kind => {
                Role::Follower(entry.get().completion.clone())
            }
            Entry::Occupied(entry) => Role::Wait(entry.get().completion.clone()),
            Entry::Vacant(entry) => {
                let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
                let (sender, completion) = watch::channel(None);
                entry.insert(InFlight {
                    kind,
                    run_id,
                    completion,
                });
                Role::Leader { run_id, sender }
            }
        }
    }

    /// Run `operation` on `channel_id` once nothing else holds the channel
    ///
    /// If an operation of the same `kind` is already in flight, wait for it
    /// instead: a joined caller gets `Ok(LockOutcome::Joined)` when the leader
    /// succeeded, `SchedulerError::Coalesced` carrying the leader's message
    /// when it failed and `SchedulerError::Abandoned` when the leader was
    /// dropped before finishing. An in-flight operation of another kind is
    /// waited out, whatever its result, and then `operation` runs.
    pub async fn run_exclusive<T, F, Fut>(
        &self,
        channel_id: Uuid,
        kind: OperationKind,
        operation: F,
    ) -> AppResult<LockOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        loop {
            match self.claim(channel_id, kind) {
                Role::Leader { run_id, sender } => {
                    let guard = InFlightGuard {
                        manager: self,
                        channel_id,
                        run_id,
                    };
                    trace!(channel_id = %channel_id, operation = %kind, "Acquired channel lock");

                    let result = operation().await;
                    let completion = match &result {
                        Ok(_) => Ok(()),
                        Err(e) => Err(e.to_string()),
                    };
                    // Release before announcing so late arrivals start a fresh run
                    drop(guard);
                    // No receivers left is fine
                    let _ = sender.send(Some(completion));

                    return result.map(LockOutcome::Ran);
                }
                Role::Follower(completion) => {
                    return Self::join(channel_id, kind, completion).await;
                }
                Role::Wait(mut completion) => {
                    debug!(
                        channel_id = %channel_id,
                        operation = %kind,
                        "Channel busy with another operation, waiting for it"
                    );
                    // A failed or abandoned run frees the channel just the same
                    let _ = completion.wait_for(Option::is_some).await;
                }
            }
        }
    }

    async fn join<T>(
        channel_id: Uuid,
        kind: OperationKind,
        mut completion: watch::Receiver<Completion>,
    ) -> AppResult<LockOutcome<T>> {
        debug!(
            channel_id = %channel_id,
            operation = %kind,
            "Operation already in flight, waiting for it"
        );

        let completion = completion
            .wait_for(Option::is_some)
            .await
            .map_err(|_| SchedulerError::Abandoned { channel_id })?
            .clone();

        match completion {
            Some(Ok(())) => Ok(LockOutcome::Joined),
            Some(Err(message)) => Err(SchedulerError::Coalesced {
                channel_id,
                message,
            }
            .into()),
            None => Err(SchedulerError::Abandoned { channel_id }.into()),
        }
    }
}
