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

//! # Cadence Core
//!
//! Cross-thread coordination primitives for engine loops:
//!
//! - the [`bridge`] marshals results of work executed on arbitrary executor
//!   threads back onto a single consumer thread (typically the main loop),
//! - the [`barrier`] is a cyclic N-party rendezvous whose parties resume in
//!   arrival order, staggered by a [`DelayPolicy`].
//!
//! The two primitives are independent of each other.

#![warn(missing_docs)]

pub mod barrier;
pub mod bridge;
pub mod config;
pub mod executor;
pub mod sink;

pub use barrier::{BarrierError, DelayMode, DelayPolicy, DelayedBarrier, InterruptHandle};
pub use bridge::{
    action_listener, listener, ActionListener, ActionOutcome, CompletionDrain,
    CompletionListener, CompletionQueue, CompletionSubmitter, DrainReport, JobError, Outcome,
    QueueClosed,
};
pub use config::{BarrierConfig, ConfigError};
pub use executor::{Executor, ExecutorError, InlineExecutor, Job, ThreadExecutor};
pub use sink::{ErrorSink, LogSink};
