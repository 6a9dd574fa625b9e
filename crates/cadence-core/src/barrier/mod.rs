// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A cyclic rendezvous barrier with rank-ordered, staggered release.
//!
//! [`DelayedBarrier`] blocks callers until `parties` of them have arrived,
//! then releases them together. Each released party is given its arrival
//! rank (0 for the first to arrive) and sleeps for
//! [`DelayPolicy::delay_for`]`(rank)` before returning, so parties resume in
//! arrival order with a spacing chosen by the policy. Once a generation is
//! released or broken the barrier immediately accepts the next one.
//!
//! Ranks are assigned in ascending arrival order by the barrier itself. A party
//! that times out withdraws its arrival, so the ranks of a released generation
//! always form a permutation of `0..parties`.
//!
//! # Interruption
//!
//! Threads cannot be interrupted from the outside in Rust, so interruption is
//! cooperative: a waiter obtains an [`InterruptHandle`] from the barrier, hands
//! clones of it to whoever may need to stop it, and waits with
//! [`DelayedBarrier::wait_interruptible`]. Interrupting a blocked waiter breaks
//! the whole generation; interrupting a waiter during its post-release delay
//! only affects that waiter.

mod error;
mod policy;

pub use self::error::BarrierError;
pub use self::policy::{DelayMode, DelayPolicy};

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::BarrierConfig;

type ReleaseAction = Box<dyn Fn(u64) + Send + Sync>;

/// One cycle of the barrier. Waiters keep a reference to the generation they
/// arrived in so they can tell a release from a break after it has been replaced.
#[derive(Debug)]
struct Generation {
    id: u64,
    /// Written under the barrier lock.
    broken: AtomicBool,
    /// Arrival tickets in rank order, set when the generation is released.
    released: OnceLock<Vec<u64>>,
}

impl Generation {
    fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            broken: AtomicBool::new(false),
            released: OnceLock::new(),
        })
    }
}

#[derive(Debug)]
struct State {
    generation: Arc<Generation>,
    /// Tickets of the parties currently waiting, in arrival order.
    arrivals: Vec<u64>,
    next_ticket: u64,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, State>,
        timeout: Duration,
    ) -> MutexGuard<'a, State> {
        self.cond
            .wait_timeout(guard, timeout)
            .unwrap_or_else(PoisonError::into_inner)
            .0
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.cond.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wakes a thread waiting in [`DelayedBarrier::wait_interruptible`].
///
/// Handles are cheap to clone and can be sent to other threads. A pending
/// interrupt is consumed when a wait surfaces it as
/// [`BarrierError::Interrupted`].
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl InterruptHandle {
    /// Requests the interruption of the waiter using this handle.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _state = self.shared.lock();
        self.shared.cond.notify_all();
    }

    /// Returns `true` if an interrupt is pending.
    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears a pending interrupt, returning whether one was set.
    pub fn clear(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

/// An N-party cyclic barrier whose parties resume in arrival order.
pub struct DelayedBarrier {
    parties: usize,
    policy: DelayPolicy,
    release_action: Option<ReleaseAction>,
    shared: Arc<Shared>,
}

impl DelayedBarrier {
    /// Creates a barrier for `parties` parties using a built-in delay policy.
    ///
    /// ## Arguments
    /// * `parties` - Number of arrivals that release a generation. Must be non-zero.
    /// * `base_delay` - The unit of delay handed to the policy.
    /// * `mode` - Which built-in policy to apply.
    pub fn new(parties: usize, base_delay: Duration, mode: DelayMode) -> Result<Self, BarrierError> {
        Self::with_policy(parties, DelayPolicy::from_mode(mode, base_delay))
    }

    /// Creates a barrier with an arbitrary delay policy.
    pub fn with_policy(parties: usize, policy: DelayPolicy) -> Result<Self, BarrierError> {
        if parties == 0 {
            return Err(BarrierError::InvalidPartyCount);
        }
        log::debug!("DelayedBarrier created for {parties} parties with policy {policy:?}.");
        Ok(Self {
            parties,
            policy,
            release_action: None,
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    generation: Generation::new(0),
                    arrivals: Vec::with_capacity(parties),
                    next_ticket: 0,
                }),
                cond: Condvar::new(),
            }),
        })
    }

    /// Creates a barrier from its configuration.
    pub fn from_config(config: &BarrierConfig) -> Result<Self, BarrierError> {
        Self::new(config.parties, config.base_delay(), config.mode)
    }

    /// Installs an action run by the last arriving party, before anyone is
    /// released. It receives the number of the generation being released.
    ///
    /// If the action panics the generation is broken instead of released.
    ///
    /// The action runs with the barrier's internal lock held, and that lock is
    /// not reentrant: calling back into this barrier from the action (for
    /// example [`generation`](Self::generation) or
    /// [`number_waiting`](Self::number_waiting)) deadlocks every party. Use the
    /// generation number passed in instead.
    pub fn with_release_action<F>(mut self, action: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.release_action = Some(Box::new(action));
        self
    }

    /// Number of parties needed to release a generation.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// The delay policy applied after release.
    pub fn policy(&self) -> &DelayPolicy {
        &self.policy
    }

    /// Number of parties currently blocked waiting for the current generation.
    pub fn number_waiting(&self) -> usize {
        self.shared.lock().arrivals.len()
    }

    /// Number of the current generation. Starts at zero and increases by one
    /// each time a generation is released or broken.
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation.id
    }

    /// Creates a handle that can interrupt a waiter of this barrier.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            flag: Arc::new(AtomicBool::new(false)),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Waits until all parties have arrived, then sleeps for this party's
    /// delay and returns its arrival rank.
    pub fn wait(&self) -> Result<usize, BarrierError> {
        self.wait_inner(None, None)
    }

    /// Like [`wait`](Self::wait), but gives up with [`BarrierError::Timeout`]
    /// if the generation is not released within `timeout`. A timed-out party
    /// withdraws; the others keep waiting.
    ///
    /// A timeout too large to be represented as a deadline waits without one.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<usize, BarrierError> {
        self.wait_inner(deadline_after(timeout), None)
    }

    /// Like [`wait`](Self::wait), but can be interrupted through `handle`,
    /// which must come from this barrier's [`interrupt_handle`](Self::interrupt_handle).
    ///
    /// Returns [`BarrierError::ForeignHandle`] without arriving if `handle`
    /// was created by another barrier.
    pub fn wait_interruptible(
        &self,
        handle: &InterruptHandle,
        timeout: Option<Duration>,
    ) -> Result<usize, BarrierError> {
        if !Arc::ptr_eq(&handle.shared, &self.shared) {
            log::warn!("Refusing to wait with an interrupt handle from another barrier.");
            return Err(BarrierError::ForeignHandle);
        }
        self.wait_inner(timeout.and_then(deadline_after), Some(handle))
    }

    /// Breaks the current generation and starts a fresh one.
    ///
    /// Every party blocked in the current generation returns
    /// [`BarrierError::Broken`].
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        log::debug!(
            "Resetting barrier generation {} with {} waiting.",
            state.generation.id,
            state.arrivals.len()
        );
        self.break_generation(&mut state);
    }

    fn wait_inner(
        &self,
        deadline: Option<Instant>,
        interrupt: Option<&InterruptHandle>,
    ) -> Result<usize, BarrierError> {
        let mut state = self.shared.lock();
        let generation = Arc::clone(&state.generation);

        if interrupt.is_some_and(InterruptHandle::clear) {
            if !state.arrivals.is_empty() {
                self.break_generation(&mut state);
            }
            return Err(BarrierError::Interrupted);
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.arrivals.push(ticket);

        if state.arrivals.len() == self.parties {
            return self.release(state, &generation, ticket, interrupt);
        }

        loop {
            state = match deadline {
                None => self.shared.wait(state),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        state
                    } else {
                        self.shared.wait_timeout(state, deadline - now)
                    }
                }
            };

            if generation.broken.load(Ordering::SeqCst) {
                return Err(BarrierError::Broken);
            }
            if let Some(order) = generation.released.get() {
                let rank = rank_of(order, ticket)?;
                drop(state);
                return self.resume(rank, interrupt);
            }
            if interrupt.is_some_and(InterruptHandle::clear) {
                log::debug!(
                    "Waiter interrupted, breaking barrier generation {}.",
                    generation.id
                );
                self.break_generation(&mut state);
                return Err(BarrierError::Interrupted);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                state.arrivals.retain(|t| *t != ticket);
                log::trace!("Waiter timed out in barrier generation {}.", generation.id);
                return Err(BarrierError::Timeout);
            }
        }
    }

    /// Called by the last arriving party with the lock held.
    fn release(
        &self,
        mut state: MutexGuard<'_, State>,
        generation: &Arc<Generation>,
        ticket: u64,
        interrupt: Option<&InterruptHandle>,
    ) -> Result<usize, BarrierError> {
        if let Some(action) = &self.release_action {
            let id = generation.id;
            if panic::catch_unwind(AssertUnwindSafe(|| action(id))).is_err() {
                log::error!("Barrier release action panicked; breaking generation {id}.");
                self.break_generation(&mut state);
                return Err(BarrierError::Broken);
            }
        }

        let order = std::mem::take(&mut state.arrivals);
        let rank = rank_of(&order, ticket)?;
        // Cannot already be set: only the tripping party releases a generation.
        let _ = generation.released.set(order);
        self.advance(&mut state);
        log::trace!("Barrier generation {} released.", generation.id);
        drop(state);

        self.resume(rank, interrupt)
    }

    /// Sleeps out the post-release delay for `rank`.
    fn resume(&self, rank: usize, interrupt: Option<&InterruptHandle>) -> Result<usize, BarrierError> {
        let delay = self.policy.delay_for(rank);
        if !delay.is_zero() {
            match interrupt {
                Some(handle) => self.sleep_interruptibly(delay, handle)?,
                None => thread::sleep(delay),
            }
        }
        Ok(rank)
    }

    fn sleep_interruptibly(&self, delay: Duration, handle: &InterruptHandle) -> Result<(), BarrierError> {
        let deadline = deadline_after(delay);
        let mut state = self.shared.lock();
        loop {
            if handle.clear() {
                return Err(BarrierError::Interrupted);
            }
            state = match deadline {
                None => self.shared.wait(state),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    self.shared.wait_timeout(state, deadline - now)
                }
            };
        }
    }

    fn break_generation(&self, state: &mut State) {
        state.generation.broken.store(true, Ordering::SeqCst);
        state.arrivals.clear();
        self.advance(state);
    }

    fn advance(&self, state: &mut State) {
        state.generation = Generation::new(state.generation.id + 1);
        self.shared.cond.notify_all();
    }
}

impl std::fmt::Debug for DelayedBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedBarrier")
            .field("parties", &self.parties)
            .field("policy", &self.policy)
            .field("has_release_action", &self.release_action.is_some())
            .finish_non_exhaustive()
    }
}

/// `None` when `duration` overflows `Instant`, which callers treat as no deadline.
fn deadline_after(duration: Duration) -> Option<Instant> {
    Instant::now().checked_add(duration)
}

fn rank_of(order: &[u64], ticket: u64) -> Result<usize, BarrierError> {
    // A released generation always contains the tickets of its waiters.
    order
        .iter()
        .position(|t| *t == ticket)
        .ok_or(BarrierError::Broken)
}
