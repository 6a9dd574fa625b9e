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

//! The executor contract consumed by the completion bridge.
//!
//! An executor accepts a unit of work and runs it on a thread of its choosing.
//! No ordering is guaranteed among concurrently submitted jobs. Concrete pools
//! live in `cadence-infra`; this module only ships the two trivial executors.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// A type-erased unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// An error returned when an executor refuses a job.
///
/// A refused job is dropped by the executor without running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The executor has been shut down and no longer accepts work.
    ShutDown,
    /// The executor could not start a thread for the job.
    Spawn(String),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::ShutDown => write!(f, "Executor is shut down"),
            ExecutorError::Spawn(msg) => write!(f, "Failed to spawn executor thread: {msg}"),
        }
    }
}

impl std::error::Error for ExecutorError {}

/// Something that can run jobs, usually on another thread.
pub trait Executor: Send + Sync {
    /// Submits a job for execution.
    ///
    /// On `Err` the job has been dropped without running.
    fn execute(&self, job: Job) -> Result<(), ExecutorError>;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        (**self).execute(job)
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        (**self).execute(job)
    }
}

/// Runs every job immediately on the submitting thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        job();
        Ok(())
    }
}

/// Spawns one detached, named OS thread per job.
#[derive(Debug)]
pub struct ThreadExecutor {
    name_prefix: String,
    spawned: AtomicUsize,
}

impl ThreadExecutor {
    /// Creates an executor whose threads are named `<prefix>-<n>`.
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Returns how many threads this executor has started so far.
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("cadence-job")
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        let index = self.spawned.fetch_add(1, Ordering::Relaxed);
        thread::Builder::new()
            .name(format!("{}-{index}", self.name_prefix))
            .spawn(job)
            .map(|_| ())
            .map_err(|e| ExecutorError::Spawn(e.to_string()))
    }
}
