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

//! The result of a job, as delivered to a listener.

use std::any::Any;
use std::fmt;

/// Why a job did not complete normally.
#[derive(Debug)]
pub enum JobError {
    /// The work returned an error. The original error is kept intact.
    Error(anyhow::Error),
    /// The work panicked. Holds the rendered panic payload.
    Panicked(String),
    /// The executor dropped the job without running it.
    Abandoned,
}

impl JobError {
    /// Builds a `Panicked` error from a payload caught with `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        JobError::Panicked(panic_message(payload.as_ref()))
    }

    /// Returns a reference to the original error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        match self {
            JobError::Error(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Converts into an `anyhow::Error`, unwrapping the original when there is one.
    pub fn into_anyhow(self) -> anyhow::Error {
        match self {
            JobError::Error(err) => err,
            other => anyhow::Error::new(other),
        }
    }
}

impl From<anyhow::Error> for JobError {
    fn from(err: anyhow::Error) -> Self {
        JobError::Error(err)
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::Error(err) => write!(f, "Job failed: {err}"),
            JobError::Panicked(msg) => write!(f, "Job panicked: {msg}"),
            JobError::Abandoned => write!(f, "Job was dropped by its executor before running"),
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JobError::Error(err) => Some(&**err),
            _ => None,
        }
    }
}

/// The outcome of a value-producing job.
#[derive(Debug)]
pub enum Outcome<V> {
    /// The work returned a value.
    Completed(V),
    /// The work failed.
    Failed(JobError),
}

impl<V> Outcome<V> {
    /// Returns `true` for [`Outcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// Converts into a `Result`.
    pub fn into_result(self) -> Result<V, JobError> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Failed(err) => Err(err),
        }
    }
}

impl<V> From<anyhow::Result<V>> for Outcome<V> {
    fn from(result: anyhow::Result<V>) -> Self {
        match result {
            Ok(value) => Outcome::Completed(value),
            Err(err) => Outcome::Failed(JobError::Error(err)),
        }
    }
}

/// The outcome of a side-effect-only job.
#[derive(Debug)]
pub enum ActionOutcome {
    /// The action ran to completion.
    Done,
    /// The action failed.
    Failed(JobError),
}

impl From<Outcome<()>> for ActionOutcome {
    fn from(outcome: Outcome<()>) -> Self {
        match outcome {
            Outcome::Completed(()) => ActionOutcome::Done,
            Outcome::Failed(err) => ActionOutcome::Failed(err),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
