use crate::{Frame, InputSpec, Resolution, Result, SourceKind};

/// A device or file handle from the underlying video library.
///
/// Handles are driven from one thread at a time; `release` is never called
/// while a `read` is in flight.
pub trait CaptureHandle: Send {
    /// Open a capture by device index or path.
    fn open(input: &InputSpec) -> Result<Self>
    where
        Self: Sized;

    fn is_opened(&self) -> bool;

    /// Request a capture size. Best-effort: values the device cannot honour are ignored.
    fn set_resolution(&mut self, _resolution: Resolution) {}

    /// Decode the next frame. `None` covers end of stream and read errors alike.
    fn read(&mut self) -> Option<Frame>;

    /// Release the underlying resource.
    fn release(&mut self);
}

/// The consumer-facing "give me the current frame" interface.
pub trait FrameSource: Send {
    /// Threaded sources return the latest published frame, or `None` if nothing
    /// has been published yet. Synchronous sources decode one frame and return
    /// `None` once the stream is exhausted.
    fn read_frame(&mut self) -> Option<Frame>;

    fn kind(&self) -> SourceKind;

    /// Identifier the source was opened from, for logs.
    fn input(&self) -> &str;

    /// Stop any background work and release the capture handle. Further reads return `None`.
    fn close(&mut self);
}
