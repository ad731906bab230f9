//! Deferred reclamation for track waveform data
//!
//! Track waveforms are published to the render thread through
//! `basedrop::SharedCell`. Swapping a track drops the previous
//! `Shared<T>` on whichever thread happens to release it last; with
//! basedrop that drop only enqueues the pointer, and the memory is freed
//! here on a dedicated collector thread.

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Global handle for creating Shared<T> allocations
static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Interval between collection passes
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("waveform-gc".to_string())
        .spawn(move || {
            // Collector is !Sync; it lives on this thread only
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }

            log::info!("Waveform GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn waveform GC thread");

    rx.recv().expect("Failed to receive waveform GC handle")
}

/// Handle for creating `Shared<T>` allocations reclaimed off the render thread
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
