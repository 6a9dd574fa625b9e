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

//! Post-release delay policies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Selects one of the built-in policies from a base delay.
///
/// This is the form used by configuration files and by
/// [`DelayedBarrier::new`](super::DelayedBarrier::new).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayMode {
    /// Every rank above zero waits the base delay.
    Uniform,
    /// Rank `k` waits `k` times the base delay.
    #[default]
    Linear,
}

/// Maps an arrival rank to the extra time a party sleeps after release.
///
/// Rank 0 never waits, whatever the policy says. For parties to resume in
/// rank order the mapping must be non-decreasing in rank; both built-in
/// policies are.
#[derive(Clone, Default)]
pub enum DelayPolicy {
    /// No staggering: every party resumes as soon as it is released.
    #[default]
    None,
    /// Every non-zero rank waits the same duration.
    Uniform(Duration),
    /// Rank `k` waits `k` times the duration.
    Linear(Duration),
    /// Caller-provided mapping.
    Custom(Arc<dyn Fn(usize) -> Duration + Send + Sync>),
}

impl DelayPolicy {
    /// Builds a built-in policy from a mode and base delay.
    pub fn from_mode(mode: DelayMode, base: Duration) -> Self {
        match mode {
            DelayMode::Uniform => DelayPolicy::Uniform(base),
            DelayMode::Linear => DelayPolicy::Linear(base),
        }
    }

    /// Wraps a closure as a [`DelayPolicy::Custom`].
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(usize) -> Duration + Send + Sync + 'static,
    {
        DelayPolicy::Custom(Arc::new(f))
    }

    /// The delay applied to a party released with the given rank.
    pub fn delay_for(&self, rank: usize) -> Duration {
        if rank == 0 {
            return Duration::ZERO;
        }
        match self {
            DelayPolicy::None => Duration::ZERO,
            DelayPolicy::Uniform(base) => *base,
            DelayPolicy::Linear(base) => {
                base.saturating_mul(u32::try_from(rank).unwrap_or(u32::MAX))
            }
            DelayPolicy::Custom(f) => f(rank),
        }
    }
}

impl fmt::Debug for DelayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayPolicy::None => write!(f, "None"),
            DelayPolicy::Uniform(d) => f.debug_tuple("Uniform").field(d).finish(),
            DelayPolicy::Linear(d) => f.debug_tuple("Linear").field(d).finish(),
            DelayPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
