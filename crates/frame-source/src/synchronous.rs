use crate::{
    CaptureHandle, Frame, FrameSource, InputSpec, Resolution, Result, ScopedCapture, SourceKind,
};
use tracing::{debug, info};

/// On-demand reader for recordings and still images: every call decodes
/// exactly one frame on the caller's thread.
pub struct SynchronousFrameSource<C: CaptureHandle> {
    capture: ScopedCapture<C>,
    input: String,
    frames_read: u64,
    ended: bool,
}

impl<C: CaptureHandle> SynchronousFrameSource<C> {
    pub fn open(input: &InputSpec, resolution: Resolution) -> Result<Self> {
        let capture = ScopedCapture::open(input)?;
        Ok(Self::start(capture, resolution, input.to_string()))
    }

    /// Wrap a handle opened elsewhere.
    pub fn from_capture(capture: C, label: &str, resolution: Resolution) -> Result<Self> {
        let capture = ScopedCapture::adopt(capture, label)?;
        Ok(Self::start(capture, resolution, label.to_string()))
    }

    fn start(mut capture: ScopedCapture<C>, resolution: Resolution, input: String) -> Self {
        capture.set_resolution(resolution);
        info!(source = %input, %resolution, "synchronous frame source opened");
        Self {
            capture,
            input,
            frames_read: 0,
            ended: false,
        }
    }

    /// Decode the next frame. `None` means the stream is over or this read
    /// failed; a backend with transient failures may yield frames again.
    pub fn read_frame(&mut self) -> Option<Frame> {
        match self.capture.read() {
            Some(frame) => {
                if self.ended {
                    self.ended = false;
                    debug!(source = %self.input, frames = self.frames_read, "reads resumed");
                }
                self.frames_read += 1;
                Some(frame)
            }
            None => {
                if !self.ended {
                    self.ended = true;
                    debug!(source = %self.input, frames = self.frames_read, "read returned no frame");
                }
                None
            }
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn is_closed(&self) -> bool {
        self.capture.is_released()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Release the handle. Later reads return `None` without touching it.
    pub fn close(&mut self) {
        if !self.capture.is_released() {
            self.capture.release();
            debug!(source = %self.input, "synchronous frame source closed");
        }
    }
}

impl<C: CaptureHandle> FrameSource for SynchronousFrameSource<C> {
    fn read_frame(&mut self) -> Option<Frame> {
        SynchronousFrameSource::read_frame(self)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Synchronous
    }

    fn input(&self) -> &str {
        &self.input
    }

    fn close(&mut self) {
        SynchronousFrameSource::close(self)
    }
}
