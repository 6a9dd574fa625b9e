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

//! Listener contracts invoked on the consumer thread.

use super::outcome::{ActionOutcome, JobError, Outcome};

/// Receives the outcome of a value-producing job.
///
/// Exactly one of the two methods is called, once, on the thread that drains
/// the completion queue. An `Err` returned from either method is reported by
/// the drain and otherwise ignored.
pub trait CompletionListener<V>: Send + 'static {
    /// Called with the value returned by the work.
    fn on_completed(self, value: V) -> anyhow::Result<()>;

    /// Called with the error raised by the work.
    fn on_failed(self, error: JobError) -> anyhow::Result<()>;

    /// Dispatches an outcome to the matching callback.
    fn deliver(self, outcome: Outcome<V>) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        match outcome {
            Outcome::Completed(value) => self.on_completed(value),
            Outcome::Failed(error) => self.on_failed(error),
        }
    }
}

/// Receives the outcome of a side-effect-only job.
pub trait ActionListener: Send + 'static {
    /// Called once the action has run to completion.
    fn on_done(self) -> anyhow::Result<()>;

    /// Called with the error raised by the action.
    fn on_failed(self, error: JobError) -> anyhow::Result<()>;

    /// Dispatches an outcome to the matching callback.
    fn deliver(self, outcome: ActionOutcome) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        match outcome {
            ActionOutcome::Done => self.on_done(),
            ActionOutcome::Failed(error) => self.on_failed(error),
        }
    }
}

/// A [`CompletionListener`] assembled from two closures. See [`listener`].
pub struct FnListener<C, F> {
    on_completed: C,
    on_failed: F,
}

/// Builds a [`CompletionListener`] from a success and a failure closure.
pub fn listener<V, C, F>(on_completed: C, on_failed: F) -> FnListener<C, F>
where
    C: FnOnce(V) -> anyhow::Result<()> + Send + 'static,
    F: FnOnce(JobError) -> anyhow::Result<()> + Send + 'static,
{
    FnListener {
        on_completed,
        on_failed,
    }
}

impl<V, C, F> CompletionListener<V> for FnListener<C, F>
where
    C: FnOnce(V) -> anyhow::Result<()> + Send + 'static,
    F: FnOnce(JobError) -> anyhow::Result<()> + Send + 'static,
{
    fn on_completed(self, value: V) -> anyhow::Result<()> {
        (self.on_completed)(value)
    }

    fn on_failed(self, error: JobError) -> anyhow::Result<()> {
        (self.on_failed)(error)
    }
}

/// An [`ActionListener`] assembled from two closures. See [`action_listener`].
pub struct FnActionListener<D, F> {
    on_done: D,
    on_failed: F,
}

/// Builds an [`ActionListener`] from a completion and a failure closure.
pub fn action_listener<D, F>(on_done: D, on_failed: F) -> FnActionListener<D, F>
where
    D: FnOnce() -> anyhow::Result<()> + Send + 'static,
    F: FnOnce(JobError) -> anyhow::Result<()> + Send + 'static,
{
    FnActionListener { on_done, on_failed }
}

impl<D, F> ActionListener for FnActionListener<D, F>
where
    D: FnOnce() -> anyhow::Result<()> + Send + 'static,
    F: FnOnce(JobError) -> anyhow::Result<()> + Send + 'static,
{
    fn on_done(self) -> anyhow::Result<()> {
        (self.on_done)()
    }

    fn on_failed(self, error: JobError) -> anyhow::Result<()> {
        (self.on_failed)(error)
    }
}
