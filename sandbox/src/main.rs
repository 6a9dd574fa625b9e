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

//! Sandbox: a main loop fed by simulated network threads, and a round of
//! turn-based players paced by a delayed barrier.
//!
//! Run with `cargo run -p sandbox [config.json]`.

use anyhow::{Context, Result};
use cadence_core::{listener, BarrierConfig, CompletionQueue, DelayedBarrier, JobError};
use cadence_infra::{WorkerPool, WorkerPoolConfig};
use cadence_telemetry::{init_logging, CountingSink, LoggingConfig};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SandboxConfig {
    logging: LoggingConfig,
    network: WorkerPoolConfig,
    turns: BarrierConfig,
    messages: usize,
    rounds: usize,
}

impl SandboxConfig {
    fn load() -> Result<Self> {
        let Some(path) = std::env::args().nth(1) else {
            return Ok(Self {
                turns: BarrierConfig {
                    parties: 4,
                    base_delay_ms: 25,
                    ..Default::default()
                },
                messages: 12,
                rounds: 3,
                ..Default::default()
            });
        };
        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        let config: Self = serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?;
        config.turns.validate()?;
        Ok(config)
    }
}

/// A message "received" by a network thread.
#[derive(Debug)]
struct Packet {
    seq: usize,
    payload: String,
}

fn receive_packet(seq: usize) -> Result<Packet> {
    thread::sleep(Duration::from_millis(5 + (seq as u64 * 7) % 30));
    if seq % 5 == 4 {
        anyhow::bail!("checksum mismatch on packet {seq}");
    }
    Ok(Packet {
        seq,
        payload: format!("state-update-{seq}"),
    })
}

fn run_network_demo(config: &SandboxConfig) -> Result<()> {
    let sink = Arc::new(CountingSink::default());
    let (submitter, mut drain) = CompletionQueue::new(sink.clone()).split();
    let pool = WorkerPool::new(&config.network)?;

    let handled = Arc::new(AtomicUsize::new(0));
    for seq in 0..config.messages {
        let on_packet = Arc::clone(&handled);
        let on_error = Arc::clone(&handled);
        submitter.run_async(
            &pool,
            move || receive_packet(seq),
            listener(
                move |packet: Packet| {
                    on_packet.fetch_add(1, Ordering::SeqCst);
                    log::info!("[main] applied #{} ({})", packet.seq, packet.payload);
                    if packet.seq == 7 {
                        // A listener failure is logged by the drain and does not stop the frame.
                        anyhow::bail!("HUD widget for #{} is gone", packet.seq);
                    }
                    Ok(())
                },
                move |err: JobError| {
                    on_error.fetch_add(1, Ordering::SeqCst);
                    log::warn!("[main] dropped packet: {err}");
                    Ok(())
                },
            ),
        );
    }

    // The "main loop": one drain per 16 ms frame until every packet is handled.
    let frame = Duration::from_millis(16);
    let mut frames = 0;
    while handled.load(Ordering::SeqCst) < config.messages {
        let started = Instant::now();
        let report = drain.drain_and_run();
        if report.executed > 0 {
            log::debug!("[main] frame {frames}: {} completion(s)", report.executed);
        }
        frames += 1;
        if let Some(rest) = frame.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }
    pool.shutdown();

    log::info!(
        "Network demo done in {frames} frames; {} listener failure(s) reported.",
        sink.reported()
    );
    Ok(())
}

fn run_turn_demo(config: &SandboxConfig) -> Result<()> {
    let barrier = Arc::new(
        DelayedBarrier::from_config(&config.turns)?.with_release_action(|generation| {
            log::info!("--- turn {generation}: all players ready ---");
        }),
    );
    let epoch = Instant::now();

    let players: Vec<_> = (0..barrier.parties())
        .map(|player| {
            let barrier = Arc::clone(&barrier);
            let rounds = config.rounds;
            thread::Builder::new()
                .name(format!("player-{player}"))
                .spawn(move || -> Result<()> {
                    for _ in 0..rounds {
                        // Think for a variable amount of time before committing the move.
                        thread::sleep(Duration::from_millis(((player * 13) % 40) as u64));
                        let rank = barrier.wait()?;
                        log::info!(
                            "player {player} acts with rank {rank} at {:?}",
                            epoch.elapsed()
                        );
                    }
                    Ok(())
                })
                .context("spawning player thread")
        })
        .collect::<Result<_>>()?;

    for player in players {
        player
            .join()
            .map_err(|_| anyhow::anyhow!("player thread panicked"))??;
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = SandboxConfig::load()?;
    init_logging(&config.logging)?;

    run_network_demo(&config)?;
    run_turn_demo(&config)?;
    Ok(())
}
