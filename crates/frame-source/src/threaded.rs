//! Latest-frame source backed by a dedicated capture thread.
//!
//! The capture thread owns the handle outright: it decodes outside any lock,
//! swaps the result into a single-slot mailbox, and releases the handle itself
//! once told to stop. Readers only ever touch the mailbox.

use crate::mirror::mirror_in_place;
use crate::{
    CaptureHandle, Error, Frame, FrameSource, InputSpec, Resolution, Result, ScopedCapture,
    SourceKind,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A frame together with its publication sequence number (first publish is 1).
#[derive(Clone, Debug, PartialEq)]
pub struct PublishedFrame {
    pub seq: u64,
    pub frame: Frame,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ThreadedStats {
    pub frames_published: u64,
    pub failed_reads: u64,
    pub running: bool,
}

struct Slot {
    seq: u64,
    frame: Arc<Frame>,
}

struct Shared {
    slot: Mutex<Option<Slot>>,
    published: Condvar,
    stop: AtomicBool,
    running: AtomicBool,
    frames_published: AtomicU64,
    failed_reads: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            published: Condvar::new(),
            stop: AtomicBool::new(false),
            running: AtomicBool::new(true),
            frames_published: AtomicU64::new(0),
            failed_reads: AtomicU64::new(0),
        }
    }

    // The slot only ever holds a whole `Arc<Frame>`, so a poisoned lock is still consistent.
    fn lock_slot(&self) -> MutexGuard<'_, Option<Slot>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, frame: Frame) {
        let seq = self.frames_published.fetch_add(1, Ordering::AcqRel) + 1;
        let next = Slot {
            seq,
            frame: Arc::new(frame),
        };
        let previous = self.lock_slot().replace(next);
        self.published.notify_all();
        // Free the superseded frame outside the lock.
        drop(previous);
    }

    fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

fn peek(slot: &Option<Slot>) -> Option<(u64, Arc<Frame>)> {
    slot.as_ref()
        .map(|published| (published.seq, Arc::clone(&published.frame)))
}

/// Clears `running` however the capture loop exits, including by panic.
struct RunningGuard<'a>(&'a Shared);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        // Flip under the slot lock so a waiter cannot miss the wakeup.
        let slot = self.0.lock_slot();
        self.0.running.store(false, Ordering::Release);
        drop(slot);
        self.0.published.notify_all();
    }
}

pub struct ThreadedFrameSource {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    mirror: bool,
    input: String,
}

impl ThreadedFrameSource {
    /// Open `input` with backend `C` and start the capture thread.
    pub fn open<C: CaptureHandle + 'static>(
        input: &InputSpec,
        resolution: Resolution,
        mirror: bool,
    ) -> Result<Self> {
        let capture = ScopedCapture::<C>::open(input)?;
        Self::start(capture, resolution, mirror, input.to_string())
    }

    /// Start the capture thread over a handle opened elsewhere.
    pub fn from_capture<C: CaptureHandle + 'static>(
        capture: C,
        label: &str,
        resolution: Resolution,
        mirror: bool,
    ) -> Result<Self> {
        let capture = ScopedCapture::adopt(capture, label)?;
        Self::start(capture, resolution, mirror, label.to_string())
    }

    fn start<C: CaptureHandle + 'static>(
        mut capture: ScopedCapture<C>,
        resolution: Resolution,
        mirror: bool,
        input: String,
    ) -> Result<Self> {
        capture.set_resolution(resolution);

        let shared = Arc::new(Shared::new());
        let worker = thread::Builder::new()
            .name("frame-capture".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                let input = input.clone();
                move || capture_loop(capture, &shared, &input)
            })
            .map_err(|e| Error::Io(format!("spawning capture thread: {e}")))?;

        info!(source = %input, %resolution, mirror, "threaded frame source started");
        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
            mirror,
            input,
        })
    }

    /// Copy of the most recently published frame, or `None` before the first publish.
    ///
    /// Never waits on the device: the slot lock is held only long enough to
    /// clone a reference, and the pixel copy happens after it is released.
    pub fn read_frame(&self) -> Option<Frame> {
        self.read_published().map(|published| published.frame)
    }

    /// Like [`read_frame`](Self::read_frame), with the publication sequence number.
    pub fn read_published(&self) -> Option<PublishedFrame> {
        let latest = peek(&self.shared.lock_slot());
        latest.map(|(seq, frame)| self.copy_out(seq, &frame))
    }

    /// Block until a frame has been published, up to `timeout`.
    ///
    /// Returns immediately if one already has. Returns `None` on timeout or if
    /// the source stops first.
    pub fn wait_for_frame(&self, timeout: Duration) -> Option<PublishedFrame> {
        let slot = self.shared.lock_slot();
        let (slot, _) = self
            .shared
            .published
            .wait_timeout_while(slot, timeout, |slot| {
                slot.is_none() && self.shared.running.load(Ordering::Acquire)
            })
            .unwrap_or_else(|e| e.into_inner());
        let latest = peek(&slot);
        drop(slot);
        latest.map(|(seq, frame)| self.copy_out(seq, &frame))
    }

    fn copy_out(&self, seq: u64, frame: &Frame) -> PublishedFrame {
        let mut frame = frame.clone();
        if self.mirror {
            mirror_in_place(&mut frame);
        }
        PublishedFrame { seq, frame }
    }

    pub fn stats(&self) -> ThreadedStats {
        ThreadedStats {
            frames_published: self.shared.frames_published.load(Ordering::Acquire),
            failed_reads: self.shared.failed_reads.load(Ordering::Acquire),
            running: self.shared.running.load(Ordering::Acquire),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_stopping()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Stop the capture thread, wait for it to release the handle, and drop the
    /// published frame.
    ///
    /// Safe to call from any thread while reads are in flight, and more than
    /// once. An in-flight decode is not interrupted: this returns once it does.
    pub fn close(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handle) = worker.take() else {
            return;
        };
        self.shared.stop.store(true, Ordering::Release);
        if handle.join().is_err() {
            error!(source = %self.input, "capture thread panicked; handle was released during unwind");
        }
        self.shared.lock_slot().take();
        debug!(source = %self.input, "threaded frame source closed");
    }
}

impl Drop for ThreadedFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl FrameSource for ThreadedFrameSource {
    fn read_frame(&mut self) -> Option<Frame> {
        ThreadedFrameSource::read_frame(self)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Threaded
    }

    fn input(&self) -> &str {
        &self.input
    }

    fn close(&mut self) {
        ThreadedFrameSource::close(self)
    }
}

fn capture_loop<C: CaptureHandle>(mut capture: ScopedCapture<C>, shared: &Shared, input: &str) {
    let _running = RunningGuard(shared);
    debug!(source = %input, "capture thread running");

    let mut failing = false;
    while !shared.is_stopping() {
        match capture.read() {
            Some(frame) => {
                if failing {
                    info!(source = %input, "capture recovered");
                    failing = false;
                }
                shared.publish(frame);
            }
            None => {
                shared.failed_reads.fetch_add(1, Ordering::AcqRel);
                if !failing {
                    warn!(source = %input, "capture read failed; keeping last published frame");
                    failing = true;
                }
                thread::yield_now();
            }
        }
    }

    capture.release();
    info!(
        source = %input,
        published = shared.frames_published.load(Ordering::Acquire),
        failed = shared.failed_reads.load(Ordering::Acquire),
        "capture thread stopped"
    );
}
