use crate::{CaptureHandle, Error, Frame, InputSpec, PixelFormat, Resolution, Result};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEFAULT_WIDTH: u32 = 64;
const DEFAULT_HEIGHT: u32 = 48;
/// Pacing used when a synthetic "device" is opened by index (~30 fps).
const DEVICE_FRAME_INTERVAL: Duration = Duration::from_millis(33);
const INDEX_MASK: u64 = 0x00FF_FFFF;
/// Largest frame the synthetic device agrees to produce (8K RGB is ~100 MB).
const MAX_FRAME_BYTES: usize = 8192 * 8192 * 3;

/// Counters shared between a `SyntheticCapture` and the code observing it.
#[derive(Clone, Debug, Default)]
pub struct CaptureProbe {
    inner: Arc<ProbeCounters>,
}

#[derive(Debug, Default)]
struct ProbeCounters {
    reads: AtomicU64,
    release_calls: AtomicUsize,
    reads_after_release: AtomicUsize,
    resolution: Mutex<Option<Resolution>>,
}

impl CaptureProbe {
    /// Read attempts that reached the handle while it was open.
    pub fn reads(&self) -> u64 {
        self.inner.reads.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.inner.release_calls.load(Ordering::SeqCst)
    }

    pub fn reads_after_release(&self) -> usize {
        self.inner.reads_after_release.load(Ordering::SeqCst)
    }

    /// Last resolution requested through `set_resolution`.
    pub fn requested_resolution(&self) -> Option<Resolution> {
        *self
            .inner
            .resolution
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

/// In-process capture producing RGB frames whose pixels encode the frame index.
///
/// Pixel `(x, y)` holds `(index + x) mod 2^24` as three little-endian bytes, so
/// a frame can be checked for ordering, tearing and mirroring.
pub struct SyntheticCapture {
    width: u32,
    height: u32,
    remaining: Option<u64>,
    next_index: u64,
    attempts: u64,
    latency: Duration,
    fail_every: Option<u64>,
    opened: bool,
    released: bool,
    probe: CaptureProbe,
}

impl SyntheticCapture {
    fn with_limit(remaining: Option<u64>) -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            remaining,
            next_index: 0,
            attempts: 0,
            latency: Duration::ZERO,
            fail_every: None,
            opened: true,
            released: false,
            probe: CaptureProbe::default(),
        }
    }

    /// A recording with `frames` frames, exhausted afterwards.
    pub fn finite(frames: u64) -> Self {
        Self::with_limit(Some(frames))
    }

    /// A live source that never runs out.
    pub fn continuous() -> Self {
        Self::with_limit(None)
    }

    /// A handle whose open failed.
    pub fn unopened() -> Self {
        Self {
            opened: false,
            ..Self::with_limit(Some(0))
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Block every read for `latency`, like a device waiting on its sensor.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every `n`th read attempt without consuming a frame.
    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n).filter(|n| *n > 0);
        self
    }

    pub fn with_probe(mut self, probe: CaptureProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Frame index encoded in the first pixel.
    pub fn decode_index(frame: &Frame) -> Option<u64> {
        let px = frame.data.get(0..3)?;
        Some(u64::from(px[0]) | u64::from(px[1]) << 8 | u64::from(px[2]) << 16)
    }

    /// True when every pixel agrees with the index in the first pixel,
    /// i.e. the frame was not stitched together from two different frames.
    pub fn is_intact(frame: &Frame) -> bool {
        let Some(index) = Self::decode_index(frame) else {
            return false;
        };
        if frame.pixel_format != PixelFormat::Rgb8 || !frame.is_complete() {
            return false;
        }
        let stride = frame.stride();
        frame
            .data
            .chunks_exact(stride)
            .take(frame.height as usize)
            .all(|row| {
                row.chunks_exact(3)
                    .enumerate()
                    .all(|(x, px)| px == encode(index + x as u64).as_slice())
            })
    }

    fn render(&self, index: u64) -> Option<Frame> {
        let len = frame_bytes(self.width, self.height)?;
        let mut data = Vec::with_capacity(len);
        for _y in 0..self.height {
            for x in 0..self.width {
                data.extend_from_slice(&encode(index + u64::from(x)));
            }
        }
        Some(Frame::new(self.width, self.height, PixelFormat::Rgb8, data))
    }
}

/// RGB buffer size for `width x height`, or `None` when it exceeds `MAX_FRAME_BYTES`.
fn frame_bytes(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .filter(|n| *n <= MAX_FRAME_BYTES)
}

fn encode(value: u64) -> [u8; 3] {
    let v = value & INDEX_MASK;
    [v as u8, (v >> 8) as u8, (v >> 16) as u8]
}

impl CaptureHandle for SyntheticCapture {
    /// `synthetic` opens a continuous source, `synthetic:N` a recording of N
    /// frames, and a device index a continuous source paced at ~30 fps.
    fn open(input: &InputSpec) -> Result<Self> {
        match input {
            InputSpec::Device(index) if *index >= 0 => {
                Ok(Self::continuous().with_latency(DEVICE_FRAME_INTERVAL))
            }
            InputSpec::Path(path) if path == "synthetic" => Ok(Self::continuous()),
            InputSpec::Path(path) => {
                let frames = path
                    .strip_prefix("synthetic:")
                    .and_then(|n| n.parse::<u64>().ok())
                    .ok_or_else(|| Error::SourceUnavailable(input.to_string()))?;
                Ok(Self::finite(frames))
            }
            InputSpec::Device(_) => Err(Error::SourceUnavailable(input.to_string())),
        }
    }

    fn is_opened(&self) -> bool {
        self.opened && !self.released
    }

    fn set_resolution(&mut self, resolution: Resolution) {
        *self
            .probe
            .inner
            .resolution
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(resolution);
        // Zero-sized and oversized requests are ignored, like a device refusing the mode.
        let supported = frame_bytes(resolution.width, resolution.height).is_some_and(|n| n > 0);
        if supported {
            self.width = resolution.width;
            self.height = resolution.height;
        }
    }

    fn read(&mut self) -> Option<Frame> {
        if self.released || !self.opened {
            self.probe
                .inner
                .reads_after_release
                .fetch_add(1, Ordering::SeqCst);
            return None;
        }
        self.probe.inner.reads.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        self.attempts += 1;
        if let Some(n) = self.fail_every {
            if self.attempts % n == 0 {
                return None;
            }
        }
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let frame = self.render(self.next_index)?;
        self.next_index += 1;
        Some(frame)
    }

    fn release(&mut self) {
        self.probe
            .inner
            .release_calls
            .fetch_add(1, Ordering::SeqCst);
        self.released = true;
    }
}
