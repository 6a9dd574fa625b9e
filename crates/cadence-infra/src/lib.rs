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

//! # Cadence Infra
//!
//! Concrete [`Executor`](cadence_core::Executor) implementations:
//! a fixed-size [`WorkerPool`] of OS threads and a [`TokioExecutor`] that
//! forwards jobs to a tokio runtime's blocking pool.

#![warn(missing_docs)]

pub mod tokio_executor;
pub mod worker_pool;

pub use tokio_executor::TokioExecutor;
pub use worker_pool::{WorkerPool, WorkerPoolConfig};
