//! Progress reporting and cooperative cancellation
//!
//! Workers report through a [`Progress`] handle that serializes delivery
//! (a mutex around the callback, or a bounded channel whose receiver is the
//! single consumer) and clamps fractions so consumers always observe a
//! monotonically non-decreasing sequence. The same handle carries the
//! cancellation flag: setting it stops new work from being dispatched while
//! in-flight tasks finish.

use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// One progress update. Fractions are in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub fraction: f64,
    pub message: String,
}

type ProgressFn = Box<dyn Fn(f64, &str) + Send>;

enum Sink {
    Silent,
    Callback(Mutex<ProgressFn>),
    Channel(Sender<ProgressEvent>),
}

struct Inner {
    sink: Sink,
    /// Bit pattern of the highest fraction reported so far. Fractions are
    /// non-negative, so the IEEE bit ordering matches numeric ordering.
    last_bits: AtomicU64,
    cancelled: AtomicBool,
}

/// Cloneable handle shared between the engine, its workers, and the caller.
#[derive(Clone)]
pub struct Progress {
    inner: Arc<Inner>,
}

impl Progress {
    fn with_sink(sink: Sink) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                last_bits: AtomicU64::new(0),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// A handle that discards all updates. Cancellation still works.
    pub fn silent() -> Self {
        Self::with_sink(Sink::Silent)
    }

    /// Deliver updates through a callback. Calls are serialized even when
    /// they originate from multiple worker threads.
    pub fn with_callback(callback: impl Fn(f64, &str) + Send + 'static) -> Self {
        Self::with_sink(Sink::Callback(Mutex::new(Box::new(callback))))
    }

    /// Deliver updates through a bounded channel. When the consumer falls
    /// behind, intermediate updates are dropped rather than blocking the
    /// workers; the final update of each phase still lands because the
    /// fraction only moves forward.
    pub fn channel(bound: usize) -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(bound);
        (Self::with_sink(Sink::Channel(tx)), rx)
    }

    /// Report progress. The fraction is clamped to `[0, 1]` and to the
    /// highest value seen so far, so consumers never observe regressions.
    pub fn report(&self, fraction: f64, message: &str) {
        let fraction = fraction.clamp(0.0, 1.0);
        let bits = fraction.to_bits();
        let prev = self.inner.last_bits.fetch_max(bits, Ordering::Relaxed);
        let fraction = fraction.max(f64::from_bits(prev));

        match &self.inner.sink {
            Sink::Silent => {}
            Sink::Callback(cb) => {
                if let Ok(cb) = cb.lock() {
                    cb(fraction, message);
                }
            }
            Sink::Channel(tx) => {
                let _ = tx.try_send(ProgressEvent {
                    fraction,
                    message: message.to_string(),
                });
            }
        }
    }

    /// Request cancellation. In-flight tasks finish; no new work starts.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Relaxed)
    }
}

/// Maps a phase-local fraction into the run-global `[base, base + span]`
/// window, mirroring how the phases are weighted against each other.
pub(crate) struct PhaseProgress<'a> {
    progress: &'a Progress,
    base: f64,
    span: f64,
}

impl<'a> PhaseProgress<'a> {
    pub(crate) fn new(progress: &'a Progress, base: f64, span: f64) -> Self {
        Self {
            progress,
            base,
            span,
        }
    }

    pub(crate) fn report(&self, local_fraction: f64, message: &str) {
        let local = local_fraction.clamp(0.0, 1.0);
        self.progress.report(self.base + local * self.span, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_fractions_never_regress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::with_callback(move |f, _| sink.lock().unwrap().push(f));

        progress.report(0.2, "a");
        progress.report(0.1, "b");
        progress.report(0.7, "c");
        progress.report(0.5, "d");

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert_eq!(*seen.last().unwrap(), 0.7);
    }

    #[test]
    fn test_channel_drops_instead_of_blocking() {
        let (progress, rx) = Progress::channel(2);
        for i in 0..10 {
            progress.report(i as f64 / 10.0, "tick");
        }
        // Bounded at 2: the rest were dropped, none of the sends blocked.
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_cancellation_is_shared_between_clones() {
        let progress = Progress::silent();
        let clone = progress.clone();
        assert!(!clone.is_cancelled());
        progress.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_phase_progress_maps_into_window() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (sink, counter) = (Arc::clone(&seen), Arc::clone(&count));
        let progress = Progress::with_callback(move |f, _| {
            counter.fetch_add(1, Ordering::Relaxed);
            sink.lock().unwrap().push(f);
        });

        let phase = PhaseProgress::new(&progress, 0.4, 0.3);
        phase.report(0.0, "start");
        phase.report(1.0, "end");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!((seen[0] - 0.4).abs() < 1e-9);
        assert!((seen[1] - 0.7).abs() < 1e-9);
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
