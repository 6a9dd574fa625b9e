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

//! Error type returned by the rendezvous barrier.

use std::fmt;

/// Why a call to the barrier did not end in a normal release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierError {
    /// A barrier was requested with zero parties.
    InvalidPartyCount,
    /// This caller's timeout elapsed before the generation was released.
    /// Other waiters are unaffected.
    Timeout,
    /// The generation was broken by `reset()`, by another party being
    /// interrupted, or by a failing release action.
    Broken,
    /// The calling thread was interrupted through its
    /// [`InterruptHandle`](super::InterruptHandle).
    Interrupted,
    /// The interrupt handle passed to `wait_interruptible` was created by a
    /// different barrier.
    ForeignHandle,
}

impl fmt::Display for BarrierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarrierError::InvalidPartyCount => {
                write!(f, "A barrier needs at least one party")
            }
            BarrierError::Timeout => write!(f, "Timed out waiting for the barrier"),
            BarrierError::Broken => write!(f, "Barrier generation was broken"),
            BarrierError::Interrupted => write!(f, "Interrupted while waiting at the barrier"),
            BarrierError::ForeignHandle => {
                write!(f, "Interrupt handle belongs to another barrier")
            }
        }
    }
}

impl std::error::Error for BarrierError {}
