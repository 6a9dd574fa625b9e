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

//! A fixed-size pool of named worker threads.

use cadence_core::{ConfigError, Executor, ExecutorError, Job};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use std::thread;

/// Configuration for a [`WorkerPool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Prefix for worker thread names; threads are named `<prefix>-<index>`.
    pub thread_name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            thread_name: "cadence-worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.workers == 0 {
            return Err(ConfigError::Invalid(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        Ok(config)
    }
}

/// A pool of worker threads pulling jobs from a shared channel.
///
/// Jobs are started in submission order but may finish in any order. After
/// [`shutdown`](WorkerPool::shutdown) the pool rejects new jobs, finishes the
/// ones already queued and joins its workers. Dropping the pool shuts it down.
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl WorkerPool {
    /// Starts a pool with the given configuration.
    pub fn new(config: &WorkerPoolConfig) -> Result<Self, ExecutorError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(config.workers);

        for index in 0..config.workers.max(1) {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{index}", config.thread_name))
                .spawn(move || worker_loop(receiver))
                .map_err(|e| ExecutorError::Spawn(e.to_string()))?;
            workers.push(handle);
        }

        log::info!(
            "WorkerPool started with {} '{}' worker(s).",
            workers.len(),
            config.thread_name
        );
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Starts a pool of `workers` threads with the default thread name.
    pub fn with_workers(workers: usize) -> Result<Self, ExecutorError> {
        Self::new(&WorkerPoolConfig {
            workers,
            ..Default::default()
        })
    }

    /// Number of jobs waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, Sender::len)
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Stops accepting jobs, runs the ones already queued and joins all workers.
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        // Dropping the last sender ends every worker loop once the queue is empty.
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in workers {
            let _ = handle.join();
        }
        log::info!("WorkerPool stopped.");
    }
}

impl Executor for WorkerPool {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(ExecutorError::ShutDown)?;
        sender.send(job).map_err(|_| ExecutorError::ShutDown)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(receiver: Receiver<Job>) {
    log::trace!(
        "Worker {:?} started.",
        thread::current().name().unwrap_or("<unnamed>")
    );
    for job in receiver.iter() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            log::error!("A job panicked on a pool worker; the worker keeps running.");
        }
    }
    log::trace!(
        "Worker {:?} exiting.",
        thread::current().name().unwrap_or("<unnamed>")
    );
}
