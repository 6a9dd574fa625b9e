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

//! An [`ErrorSink`] decorator that counts what passes through it.

use cadence_core::{ErrorSink, LogSink};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts reports before forwarding them to an inner sink.
///
/// The main loop can poll [`reported`](CountingSink::reported) to surface
/// listener failures that the drain swallowed.
#[derive(Debug)]
pub struct CountingSink<S = LogSink> {
    inner: S,
    reported: AtomicU64,
}

impl<S: ErrorSink> CountingSink<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reported: AtomicU64::new(0),
        }
    }

    /// Total number of reports received so far.
    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }
}

impl Default for CountingSink<LogSink> {
    fn default() -> Self {
        Self::new(LogSink::default())
    }
}

impl<S: ErrorSink> ErrorSink for CountingSink<S> {
    fn report(&self, message: &str, error: &anyhow::Error) {
        self.reported.fetch_add(1, Ordering::Relaxed);
        self.inner.report(message, error);
    }
}
