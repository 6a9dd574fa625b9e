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

//! Completion bridge between executor threads and a single consumer thread.
//!
//! Work is submitted to any [`Executor`](crate::executor::Executor) through a
//! [`CompletionSubmitter`]. When it finishes, its [`Outcome`] is wrapped in a
//! callback and pushed onto a [`CompletionQueue`]. The consumer (for example
//! the main loop, once per frame) calls [`CompletionDrain::drain_and_run`],
//! which is where listeners actually run.
//!
//! ```rust
//! use cadence_core::{listener, CompletionQueue, InlineExecutor};
//!
//! let (submitter, mut drain) = CompletionQueue::default().split();
//! submitter.run_async(
//!     &InlineExecutor,
//!     || Ok(6 * 7),
//!     listener(
//!         |answer: u32| {
//!             assert_eq!(answer, 42);
//!             Ok(())
//!         },
//!         |err| Err(err.into_anyhow()),
//!     ),
//! );
//!
//! assert_eq!(drain.drain_and_run().executed, 1);
//! ```

mod listener;
mod outcome;
mod queue;
mod runner;

pub use self::listener::{
    action_listener, listener, ActionListener, CompletionListener, FnActionListener, FnListener,
};
pub use self::outcome::{ActionOutcome, JobError, Outcome};
pub use self::queue::{CompletionDrain, CompletionQueue, CompletionSubmitter, DrainReport, QueueClosed};
