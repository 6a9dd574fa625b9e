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

//! The logging seam used by primitives that swallow errors.
//!
//! Failures that have no caller to return to (a listener failing during a
//! drain, a completion with no consumer left) are reported to an [`ErrorSink`]
//! instead of a global logger, so tests can observe them.

/// Receives non-fatal failures that a primitive contains rather than propagates.
pub trait ErrorSink: Send + Sync {
    /// Reports a contained failure along with a short description of where it happened.
    fn report(&self, message: &str, error: &anyhow::Error);
}

impl<F> ErrorSink for F
where
    F: Fn(&str, &anyhow::Error) + Send + Sync,
{
    fn report(&self, message: &str, error: &anyhow::Error) {
        self(message, error)
    }
}

/// The default sink, forwarding every report to the `log` facade at error level.
#[derive(Debug, Clone)]
pub struct LogSink {
    target: String,
}

impl LogSink {
    /// The log target used by [`LogSink::default`].
    pub const DEFAULT_TARGET: &'static str = "cadence";

    /// Creates a sink that logs under the given target.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Returns the log target this sink writes to.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TARGET)
    }
}

impl ErrorSink for LogSink {
    fn report(&self, message: &str, error: &anyhow::Error) {
        log::error!(target: self.target.as_str(), "{message}: {error:#}");
    }
}
