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

//! The single-consumer completion queue.

use super::outcome::panic_message;
use crate::sink::{ErrorSink, LogSink};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

type Task = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Returned by [`CompletionSubmitter::enqueue`] once the drain handle is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

impl fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Completion queue is closed: its drain handle was dropped")
    }
}

impl std::error::Error for QueueClosed {}

/// A thread-safe FIFO of completion callbacks with exactly one consumer.
///
/// The queue is an owned resource: [`split`](CompletionQueue::split) hands out
/// a cloneable [`CompletionSubmitter`] for producers and a single
/// [`CompletionDrain`] for the consuming thread.
pub struct CompletionQueue {
    sender: flume::Sender<Task>,
    receiver: flume::Receiver<Task>,
    sink: Arc<dyn ErrorSink>,
}

impl CompletionQueue {
    /// Creates an unbounded queue reporting callback failures to `sink`.
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("Completion queue initialized.");
        Self {
            sender,
            receiver,
            sink,
        }
    }

    /// Splits the queue into its producer and consumer halves.
    pub fn split(self) -> (CompletionSubmitter, CompletionDrain) {
        let submitter = CompletionSubmitter {
            sender: self.sender.clone(),
        };
        let drain = CompletionDrain {
            sender: self.sender,
            receiver: self.receiver,
            sink: self.sink,
        };
        (submitter, drain)
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new(Arc::new(LogSink::default()))
    }
}

/// The producer half of a [`CompletionQueue`]. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct CompletionSubmitter {
    sender: flume::Sender<Task>,
}

impl CompletionSubmitter {
    /// Appends a callback to the queue. Never blocks.
    pub fn enqueue<F>(&self, task: F) -> Result<(), QueueClosed>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.sender.send(Box::new(task)).map_err(|_| QueueClosed)
    }

    /// Returns `true` once the drain handle has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_disconnected()
    }
}

/// Counts of what a single [`CompletionDrain::drain_and_run`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Callbacks that were taken off the queue and run.
    pub executed: usize,
    /// Callbacks among those that returned an error or panicked.
    pub failed: usize,
}

impl DrainReport {
    /// Callbacks that ran without failing.
    pub fn succeeded(&self) -> usize {
        self.executed - self.failed
    }
}

/// The consumer half of a [`CompletionQueue`].
///
/// Not cloneable: whoever owns it is the consumer thread.
pub struct CompletionDrain {
    sender: flume::Sender<Task>,
    receiver: flume::Receiver<Task>,
    sink: Arc<dyn ErrorSink>,
}

impl CompletionDrain {
    /// Runs every callback present in the queue when the call starts.
    ///
    /// Callbacks enqueued while the drain is in progress are left for the next
    /// call. A callback that returns an error or panics is reported to the
    /// sink and the drain moves on to the next one.
    pub fn drain_and_run(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        let budget = self.receiver.len();

        for _ in 0..budget {
            let Ok(task) = self.receiver.try_recv() else {
                break;
            };
            report.executed += 1;

            let failure = match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err),
                Err(payload) => Some(anyhow::anyhow!(
                    "callback panicked: {}",
                    panic_message(payload.as_ref())
                )),
            };

            if let Some(err) = failure {
                report.failed += 1;
                self.sink.report("Completion callback failed", &err);
            }
        }

        if report.executed > 0 {
            log::trace!(
                "Drained {} completion(s), {} failed.",
                report.executed,
                report.failed
            );
        }
        report
    }

    /// Number of callbacks currently waiting in the queue.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no callback is waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Creates another producer handle for this queue.
    pub fn submitter(&self) -> CompletionSubmitter {
        CompletionSubmitter {
            sender: self.sender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    fn recording_queue() -> (CompletionSubmitter, CompletionDrain, Arc<Mutex<Vec<String>>>) {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink_reports = reports.clone();
        let sink = move |message: &str, error: &anyhow::Error| {
            sink_reports
                .lock()
                .unwrap()
                .push(format!("{message}: {error}"));
        };
        let (submitter, drain) = CompletionQueue::new(Arc::new(sink)).split();
        (submitter, drain, reports)
    }

    #[test]
    fn drain_runs_in_enqueue_order() {
        let (submitter, mut drain, _) = recording_queue();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            submitter
                .enqueue(move || {
                    order.lock().unwrap().push(i);
                    Ok(())
                })
                .unwrap();
        }

        let report = drain.drain_and_run();
        assert_eq!(report.executed, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(drain.is_empty());
    }

    #[test]
    fn failing_callbacks_do_not_stop_the_drain() {
        let (submitter, mut drain, reports) = recording_queue();
        let ran = Arc::new(Mutex::new(Vec::new()));

        for i in 0..4 {
            let ran = ran.clone();
            submitter
                .enqueue(move || {
                    ran.lock().unwrap().push(i);
                    match i {
                        1 => anyhow::bail!("listener {i} rejected the value"),
                        2 => panic!("listener {i} blew up"),
                        _ => Ok(()),
                    }
                })
                .unwrap();
        }

        let report = drain.drain_and_run();
        assert_eq!(report.executed, 4);
        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(*ran.lock().unwrap(), vec![0, 1, 2, 3]);

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].contains("listener 1 rejected the value"));
        assert!(reports[1].contains("listener 2 blew up"));
    }

    #[test]
    fn entries_added_during_a_drain_wait_for_the_next_one() {
        let (submitter, mut drain, _) = recording_queue();
        let runs = Arc::new(Mutex::new(0));

        let inner_submitter = submitter.clone();
        let inner_runs = runs.clone();
        submitter
            .enqueue(move || {
                let runs = inner_runs.clone();
                inner_submitter.enqueue(move || {
                    *runs.lock().unwrap() += 1;
                    Ok(())
                })?;
                *inner_runs.lock().unwrap() += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(drain.drain_and_run().executed, 1);
        assert_eq!(drain.pending(), 1);
        assert_eq!(drain.drain_and_run().executed, 1);
        assert_eq!(*runs.lock().unwrap(), 2);
    }

    #[test]
    fn empty_drain_is_a_no_op() {
        let (_, mut drain, _) = recording_queue();
        assert_eq!(drain.drain_and_run(), DrainReport::default());
    }

    #[test]
    fn enqueue_from_many_threads() {
        let (submitter, mut drain, _) = recording_queue();
        let count = Arc::new(Mutex::new(0usize));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let submitter = submitter.clone();
                let count = count.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let count = count.clone();
                        submitter
                            .enqueue(move || {
                                *count.lock().unwrap() += 1;
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(drain.drain_and_run().executed, 800);
        assert_eq!(*count.lock().unwrap(), 800);
    }

    #[test]
    fn enqueue_fails_after_drain_is_dropped() {
        let (submitter, drain, _) = recording_queue();
        assert!(!submitter.is_closed());
        drop(drain);
        assert!(submitter.is_closed());
        assert_eq!(submitter.enqueue(|| Ok(())), Err(QueueClosed));
    }

    #[test]
    fn drain_mints_working_submitters() {
        let (_, mut drain, _) = recording_queue();
        let extra = drain.submitter();
        extra.enqueue(|| Ok(())).unwrap();
        assert_eq!(drain.pending(), 1);
        assert_eq!(drain.drain_and_run().executed, 1);
    }
}
