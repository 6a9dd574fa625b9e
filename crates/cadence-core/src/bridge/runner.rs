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

//! Running work on an executor and routing its outcome back through the queue.

use super::listener::{ActionListener, CompletionListener};
use super::outcome::{ActionOutcome, JobError, Outcome};
use super::queue::CompletionSubmitter;
use crate::executor::{Executor, Job};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};

/// Carries a job's delivery callback from the executor thread to the queue.
///
/// If the job is dropped before it completes (the executor rejected it or
/// discarded it at shutdown), dropping this value still enqueues an
/// [`JobError::Abandoned`] outcome, so the listener hears back exactly once.
struct PendingCompletion<V, D>
where
    V: Send + 'static,
    D: FnOnce(Outcome<V>) -> anyhow::Result<()> + Send + 'static,
{
    deliver: Option<D>,
    submitter: CompletionSubmitter,
    _outcome: PhantomData<fn(V)>,
}

impl<V, D> PendingCompletion<V, D>
where
    V: Send + 'static,
    D: FnOnce(Outcome<V>) -> anyhow::Result<()> + Send + 'static,
{
    fn new(submitter: CompletionSubmitter, deliver: D) -> Self {
        Self {
            deliver: Some(deliver),
            submitter,
            _outcome: PhantomData,
        }
    }

    fn complete(mut self, outcome: Outcome<V>) {
        self.post(outcome);
    }

    fn post(&mut self, outcome: Outcome<V>) {
        let Some(deliver) = self.deliver.take() else {
            return;
        };
        if self
            .submitter
            .enqueue(move || deliver(outcome))
            .is_err()
        {
            log::warn!("Completion dropped: the consumer's drain handle no longer exists.");
        }
    }
}

impl<V, D> Drop for PendingCompletion<V, D>
where
    V: Send + 'static,
    D: FnOnce(Outcome<V>) -> anyhow::Result<()> + Send + 'static,
{
    fn drop(&mut self) {
        if self.deliver.is_some() {
            log::debug!("Job dropped before running; delivering an abandoned outcome.");
            self.post(Outcome::Failed(JobError::Abandoned));
        }
    }
}

fn run_on<E, V, W, D>(executor: &E, pending: PendingCompletion<V, D>, work: W)
where
    E: Executor + ?Sized,
    V: Send + 'static,
    W: FnOnce() -> anyhow::Result<V> + Send + 'static,
    D: FnOnce(Outcome<V>) -> anyhow::Result<()> + Send + 'static,
{
    let job: Job = Box::new(move || {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(result) => Outcome::from(result),
            Err(payload) => Outcome::Failed(JobError::from_panic(payload)),
        };
        pending.complete(outcome);
    });

    if let Err(err) = executor.execute(job) {
        log::warn!("Executor rejected a job: {err}");
    }
}

impl CompletionSubmitter {
    /// Runs `work` on `executor` and delivers its outcome to `listener` on the
    /// thread that drains this queue.
    ///
    /// Returns immediately. Errors and panics raised by `work` are captured on
    /// the executor thread and reach [`CompletionListener::on_failed`]; they never
    /// propagate into the executor.
    pub fn run_async<E, V, W, L>(&self, executor: &E, work: W, listener: L)
    where
        E: Executor + ?Sized,
        V: Send + 'static,
        W: FnOnce() -> anyhow::Result<V> + Send + 'static,
        L: CompletionListener<V>,
    {
        let pending = PendingCompletion::new(self.clone(), move |outcome| listener.deliver(outcome));
        run_on(executor, pending, work);
    }

    /// Side-effect-only counterpart of [`run_async`](Self::run_async).
    pub fn run_action<E, W, L>(&self, executor: &E, action: W, listener: L)
    where
        E: Executor + ?Sized,
        W: FnOnce() -> anyhow::Result<()> + Send + 'static,
        L: ActionListener,
    {
        let pending = PendingCompletion::new(self.clone(), move |outcome: Outcome<()>| {
            listener.deliver(ActionOutcome::from(outcome))
        });
        run_on(executor, pending, action);
    }
}

#[cfg(test)]
mod tests {
    use crate::bridge::{action_listener, listener, CompletionQueue};
    use crate::executor::{Executor, ExecutorError, InlineExecutor, Job, ThreadExecutor};
    use crate::JobError;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    /// Refuses everything, dropping the job.
    struct ClosedExecutor;

    impl Executor for ClosedExecutor {
        fn execute(&self, _job: Job) -> Result<(), ExecutorError> {
            Err(ExecutorError::ShutDown)
        }
    }

    #[test]
    fn listener_runs_on_the_draining_thread() {
        let (submitter, mut drain) = CompletionQueue::default().split();
        let executor = ThreadExecutor::new("worker");
        let seen = Arc::new(Mutex::new(None));

        let worker_thread = Arc::new(Mutex::new(None));
        let record_worker = worker_thread.clone();
        let record_seen = seen.clone();
        submitter.run_async(
            &executor,
            move || {
                *record_worker.lock().unwrap() = Some(thread::current().id());
                Ok(21 * 2)
            },
            listener(
                move |value: i32| {
                    *record_seen.lock().unwrap() = Some((value, thread::current().id()));
                    Ok(())
                },
                |err| anyhow::bail!("unexpected failure: {err}"),
            ),
        );

        let deadline = Instant::now() + Duration::from_secs(2);
        while seen.lock().unwrap().is_none() && Instant::now() < deadline {
            drain.drain_and_run();
            thread::sleep(Duration::from_millis(1));
        }

        let (value, listener_thread) = seen.lock().unwrap().expect("listener never fired");
        assert_eq!(value, 42);
        assert_eq!(listener_thread, thread::current().id());
        assert_ne!(worker_thread.lock().unwrap().unwrap(), listener_thread);
    }

    #[test]
    fn nothing_is_delivered_before_a_drain() {
        let (submitter, mut drain) = CompletionQueue::default().split();
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();

        submitter.run_action(
            &InlineExecutor,
            || Ok(()),
            action_listener(
                move || {
                    *flag.lock().unwrap() = true;
                    Ok(())
                },
                |_| Ok(()),
            ),
        );

        assert!(!*fired.lock().unwrap());
        assert_eq!(drain.drain_and_run().executed, 1);
        assert!(*fired.lock().unwrap());
    }

    #[test]
    fn panicking_work_is_delivered_as_panicked() {
        let (submitter, mut drain) = CompletionQueue::default().split();
        let result = Arc::new(Mutex::new(None));
        let slot = result.clone();

        submitter.run_async(
            &InlineExecutor,
            || -> anyhow::Result<u8> { panic!("decoder overflow") },
            listener(
                |_: u8| anyhow::bail!("should have failed"),
                move |err| {
                    *slot.lock().unwrap() = Some(err);
                    Ok(())
                },
            ),
        );
        drain.drain_and_run();

        match result.lock().unwrap().take() {
            Some(JobError::Panicked(msg)) => assert_eq!(msg, "decoder overflow"),
            other => panic!("unexpected outcome: {other:?}"),
        };
    }

    #[test]
    fn rejected_job_is_delivered_as_abandoned() {
        let (submitter, mut drain) = CompletionQueue::default().split();
        let result = Arc::new(Mutex::new(None));
        let slot = result.clone();

        submitter.run_action(
            &ClosedExecutor,
            || Ok(()),
            action_listener(
                || anyhow::bail!("should not run"),
                move |err| {
                    *slot.lock().unwrap() = Some(err);
                    Ok(())
                },
            ),
        );

        assert_eq!(drain.drain_and_run().executed, 1);
        assert!(matches!(
            result.lock().unwrap().take(),
            Some(JobError::Abandoned)
        ));
    }

    #[test]
    fn completion_after_consumer_is_gone_is_dropped_quietly() {
        let (submitter, drain) = CompletionQueue::default().split();
        drop(drain);
        submitter.run_async(
            &InlineExecutor,
            || Ok(1),
            listener(|_: i32| Ok(()), |_| Ok(())),
        );
        assert!(submitter.is_closed());
    }
}
