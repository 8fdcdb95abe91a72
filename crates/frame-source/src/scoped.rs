use crate::{CaptureHandle, Error, Frame, InputSpec, Resolution, Result};
use tracing::debug;

/// Owns a capture handle and releases it exactly once: on `release`, on drop,
/// or while unwinding out of a panicking read loop.
pub struct ScopedCapture<C: CaptureHandle> {
    inner: C,
    released: bool,
}

impl<C: CaptureHandle> ScopedCapture<C> {
    pub fn open(input: &InputSpec) -> Result<Self> {
        let inner = C::open(input)?;
        Self::adopt(inner, &input.to_string())
    }

    /// Take ownership of a handle that was opened elsewhere.
    ///
    /// A handle that reports itself closed is released and rejected with
    /// `SourceUnavailable`.
    pub fn adopt(inner: C, label: &str) -> Result<Self> {
        let scoped = Self {
            inner,
            released: false,
        };
        if !scoped.inner.is_opened() {
            return Err(Error::SourceUnavailable(label.to_string()));
        }
        Ok(scoped)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        if !self.released {
            self.inner.set_resolution(resolution);
        }
    }

    /// Read one frame. After release this never touches the handle.
    pub fn read(&mut self) -> Option<Frame> {
        if self.released {
            return None;
        }
        self.inner.read()
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.inner.release();
        debug!("capture handle released");
    }
}

impl<C: CaptureHandle> Drop for ScopedCapture<C> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{CaptureProbe, SyntheticCapture};

    #[test]
    fn drop_releases_once() {
        let probe = CaptureProbe::default();
        {
            let capture = SyntheticCapture::finite(2).with_probe(probe.clone());
            let _scoped = ScopedCapture::adopt(capture, "synthetic:2").unwrap();
        }
        assert_eq!(probe.release_calls(), 1);
    }

    #[test]
    fn explicit_release_then_drop_releases_once() {
        let probe = CaptureProbe::default();
        let capture = SyntheticCapture::finite(2).with_probe(probe.clone());
        let mut scoped = ScopedCapture::adopt(capture, "synthetic:2").unwrap();
        scoped.release();
        scoped.release();
        assert!(scoped.is_released());
        assert!(scoped.read().is_none());
        drop(scoped);
        assert_eq!(probe.release_calls(), 1);
        assert_eq!(probe.reads_after_release(), 0);
    }

    #[test]
    fn adopting_a_closed_handle_fails_and_still_releases() {
        let probe = CaptureProbe::default();
        let capture = SyntheticCapture::unopened().with_probe(probe.clone());
        let err = ScopedCapture::adopt(capture, "missing").err();
        assert!(matches!(err, Some(Error::SourceUnavailable(_))));
        assert_eq!(probe.release_calls(), 1);
    }
}
