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

use cadence_core::{listener, CompletionQueue, JobError, ThreadExecutor};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, PartialEq)]
struct PacketRejected(usize);

impl fmt::Display for PacketRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "packet {} rejected", self.0)
    }
}

impl std::error::Error for PacketRejected {}

#[derive(Debug, Clone, PartialEq)]
enum Delivered {
    Completed(usize),
    Failed(String),
}

#[test]
fn every_job_is_delivered_exactly_once() {
    // --- 1. ARRANGE ---
    let (submitter, mut drain) = CompletionQueue::default().split();
    let executor = ThreadExecutor::new("net-io");
    let deliveries: Arc<Mutex<HashMap<usize, Vec<Delivered>>>> = Arc::default();
    let jobs = 40;

    // --- 2. ACT ---
    for id in 0..jobs {
        let on_ok = Arc::clone(&deliveries);
        let on_err = Arc::clone(&deliveries);
        submitter.run_async(
            &executor,
            move || {
                thread::sleep(Duration::from_millis((id % 7) as u64 * 3));
                if id % 3 == 0 {
                    return Err(PacketRejected(id).into());
                }
                Ok(id * 10)
            },
            listener(
                move |value: usize| {
                    on_ok
                        .lock()
                        .unwrap()
                        .entry(value / 10)
                        .or_default()
                        .push(Delivered::Completed(value));
                    Ok(())
                },
                move |err: JobError| {
                    let original = err
                        .downcast_ref::<PacketRejected>()
                        .expect("original error must be preserved");
                    on_err
                        .lock()
                        .unwrap()
                        .entry(original.0)
                        .or_default()
                        .push(Delivered::Failed(err.to_string()));
                    Ok(())
                },
            ),
        );
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while deliveries.lock().unwrap().values().map(Vec::len).sum::<usize>() < jobs {
        assert!(Instant::now() < deadline, "deliveries timed out");
        drain.drain_and_run();
        thread::sleep(Duration::from_millis(2));
    }
    // Give any stray duplicate a chance to show up.
    thread::sleep(Duration::from_millis(50));
    drain.drain_and_run();

    // --- 3. ASSERT ---
    let deliveries = deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), jobs);
    for id in 0..jobs {
        let received = &deliveries[&id];
        assert_eq!(received.len(), 1, "job {id} delivered {received:?}");
        if id % 3 == 0 {
            assert_eq!(
                received[0],
                Delivered::Failed(format!("Job failed: packet {id} rejected"))
            );
        } else {
            assert_eq!(received[0], Delivered::Completed(id * 10));
        }
    }
}

#[test]
fn failing_listener_does_not_starve_the_rest() {
    // --- 1. ARRANGE ---
    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink_log = Arc::clone(&reported);
    let sink = move |message: &str, error: &anyhow::Error| {
        sink_log.lock().unwrap().push(format!("{message}: {error}"));
    };
    let (submitter, mut drain) = CompletionQueue::new(Arc::new(sink)).split();
    let fired = Arc::new(Mutex::new(Vec::new()));

    for k in 0..5usize {
        let fired = Arc::clone(&fired);
        submitter.run_async(
            &cadence_core::InlineExecutor,
            move || Ok(k),
            listener(
                move |k: usize| {
                    fired.lock().unwrap().push(k);
                    if k == 2 {
                        anyhow::bail!("listener {k} could not update the HUD");
                    }
                    Ok(())
                },
                |err| Err(err.into_anyhow()),
            ),
        );
    }

    // --- 2. ACT ---
    let report = drain.drain_and_run();

    // --- 3. ASSERT ---
    assert_eq!(report.executed, 5);
    assert_eq!(report.failed, 1);
    assert_eq!(*fired.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    let reported = reported.lock().unwrap();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].contains("listener 2 could not update the HUD"));
}

#[test]
fn delivery_follows_completion_order_not_submission_order() {
    // --- 1. ARRANGE ---
    let (submitter, mut drain) = CompletionQueue::default().split();
    let executor = ThreadExecutor::new("fifo");
    let order = Arc::new(Mutex::new(Vec::new()));
    let (release_slow, slow_gate) = flume::bounded::<()>(1);

    let slow_order = Arc::clone(&order);
    submitter.run_async(
        &executor,
        move || {
            slow_gate.recv()?;
            Ok("slow")
        },
        listener(
            move |name: &'static str| {
                slow_order.lock().unwrap().push(name);
                Ok(())
            },
            |err| Err(err.into_anyhow()),
        ),
    );

    let fast_order = Arc::clone(&order);
    submitter.run_async(
        &executor,
        || Ok("fast"),
        listener(
            move |name: &'static str| {
                fast_order.lock().unwrap().push(name);
                Ok(())
            },
            |err| Err(err.into_anyhow()),
        ),
    );

    // --- 2. ACT ---
    // Let the fast job land first, then unblock the slow one.
    let deadline = Instant::now() + Duration::from_secs(5);
    while drain.pending() < 1 {
        assert!(Instant::now() < deadline, "fast job never completed");
        thread::sleep(Duration::from_millis(1));
    }
    release_slow.send(()).unwrap();
    while drain.pending() < 2 {
        assert!(Instant::now() < deadline, "slow job never completed");
        thread::sleep(Duration::from_millis(1));
    }
    drain.drain_and_run();

    // --- 3. ASSERT ---
    assert_eq!(*order.lock().unwrap(), vec!["fast", "slow"]);
}
