//! Throughput harness for calibration sweeps.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p dtb-emulator --release --example calibration_throughput
//! ```
//!
//! ## Metrics
//!
//! - Events synthesised per second
//! - Words synthesised per second
//! - Full-grid calibrations per second of a 16-chip module
//!
//! Every thread owns its own board, matching one host process per module.

#![allow(clippy::pedantic)]

use dtb_emulator::{Testboard, TRG_SEL_PG_DIR};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const NUM_THREADS: usize = 4;
const MODULE_CHIPS: u8 = 16;
const TRIGGERS_PER_PIXEL: u16 = 1;

#[derive(Debug, Clone, Copy)]
struct BenchmarkResult {
    name: &'static str,
    events_per_second: f64,
    words_per_second: f64,
    calibrations_per_second: f64,
}

fn module_chips() -> Vec<u8> {
    (0..MODULE_CHIPS).collect()
}

fn benchmark(name: &'static str, channels: u8, tbm: bool, duration: Duration) -> BenchmarkResult {
    let (tx, rx) = mpsc::channel();

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let tx = tx.clone();
            thread::spawn(move || {
                let mut board = Testboard::new();
                let chips = module_chips();
                for &chip in &chips {
                    board.roc_i2c_addr(chip);
                }
                if tbm {
                    board.trigger_select(TRG_SEL_PG_DIR);
                }
                for channel in 0..channels {
                    board.daq_start(channel).expect("configured channel");
                }

                let mut events = 0u64;
                let mut words = 0u64;
                let mut calibrations = 0u64;
                let start = Instant::now();

                while start.elapsed() < duration {
                    let result = board
                        .loop_multi_roc_all_pixels_calibrate(&chips, TRIGGERS_PER_PIXEL, 0)
                        .expect("channels active");
                    events += result.events;
                    words += result.words;
                    calibrations += 1;
                    for channel in 0..channels {
                        board.daq_read(channel, u32::MAX).expect("configured channel");
                    }
                }

                tx.send((events, words, calibrations)).ok();
            })
        })
        .collect();

    for h in handles {
        h.join().ok();
    }

    drop(tx);

    let mut events = 0u64;
    let mut words = 0u64;
    let mut calibrations = 0u64;
    for (e, w, c) in rx {
        events += e;
        words += w;
        calibrations += c;
    }

    let elapsed_secs = duration.as_secs_f64();
    BenchmarkResult {
        name,
        events_per_second: events as f64 / elapsed_secs,
        words_per_second: words as f64 / elapsed_secs,
        calibrations_per_second: calibrations as f64 / elapsed_secs,
    }
}

fn format_number(n: f64) -> String {
    if n >= 1_000_000.0 {
        format!("{:.2}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.2}K", n / 1_000.0)
    } else {
        format!("{:.2}", n)
    }
}

fn print_results(results: &[BenchmarkResult]) {
    println!();
    println!("threads: {NUM_THREADS}, chips: {MODULE_CHIPS}, triggers/pixel: {TRIGGERS_PER_PIXEL}");
    println!(
        "{:16} {:>12} {:>12} {:>12}",
        "benchmark", "events/s", "words/s", "calib/s"
    );
    for result in results {
        println!(
            "{:16} {:>12} {:>12} {:>12}",
            result.name,
            format_number(result.events_per_second),
            format_number(result.words_per_second),
            format_number(result.calibrations_per_second),
        );
    }
}

fn main() {
    let duration = Duration::from_secs(2);
    let results = [
        benchmark("direct_1ch", 1, false, duration),
        benchmark("direct_4ch", 4, false, duration),
        benchmark("tbm_emu_1ch", 1, true, duration),
        benchmark("tbm_emu_4ch", 4, true, duration),
    ];
    print_results(&results);
}
