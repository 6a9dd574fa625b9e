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

//! Runs jobs on a tokio runtime's blocking thread pool.

use cadence_core::{Executor, ExecutorError, Job};
use tokio::runtime::Handle;

/// An [`Executor`] backed by [`Handle::spawn_blocking`].
///
/// Jobs are plain blocking closures, so they go to the runtime's blocking pool
/// rather than its async workers.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Wraps an existing runtime handle.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the calling thread is running in.
    pub fn current() -> Result<Self, ExecutorError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| ExecutorError::Spawn(e.to_string()))
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        // The join handle is not needed: outcomes travel through the completion queue.
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}
