use crate::{CaptureHandle, Error, Frame, InputSpec, PixelFormat, Resolution, Result};
use opencv::prelude::*;
use opencv::{core, imgproc, videoio};
use tracing::{debug, warn};

/// `cv::VideoCapture` over a camera index, video file or stream URL.
pub struct OpenCvCapture {
    cap: videoio::VideoCapture,
}

impl OpenCvCapture {
    fn decode(&mut self) -> Result<Option<Frame>> {
        let mut mat = core::Mat::default();
        let grabbed = self
            .cap
            .read(&mut mat)
            .map_err(|e| Error::Backend(e.to_string()))?;
        if !grabbed || mat.empty() {
            return Ok(None);
        }

        let width = mat.cols() as u32;
        let height = mat.rows() as u32;

        // Convert to RGB8
        let mut rgb = core::Mat::default();
        imgproc::cvt_color(&mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| Error::Backend(e.to_string()))?;

        let data = rgb
            .data_bytes()
            .map_err(|e| Error::Backend(e.to_string()))?
            .to_vec();
        Ok(Some(Frame::new(width, height, PixelFormat::Rgb8, data)))
    }
}

/// Any failure while opening means the source cannot be used.
fn unavailable(input: &InputSpec, e: &opencv::Error) -> Error {
    Error::SourceUnavailable(format!("{input}: {e}"))
}

impl CaptureHandle for OpenCvCapture {
    fn open(input: &InputSpec) -> Result<Self> {
        let cap = match input {
            InputSpec::Device(index) => videoio::VideoCapture::new(*index, videoio::CAP_ANY),
            InputSpec::Path(path) => videoio::VideoCapture::from_file(path, videoio::CAP_ANY),
        }
        .map_err(|e| unavailable(input, &e))?;
        let opened = videoio::VideoCapture::is_opened(&cap).map_err(|e| unavailable(input, &e))?;
        if !opened {
            return Err(Error::SourceUnavailable(input.to_string()));
        }
        Ok(Self { cap })
    }

    fn is_opened(&self) -> bool {
        videoio::VideoCapture::is_opened(&self.cap).unwrap_or(false)
    }

    fn set_resolution(&mut self, resolution: Resolution) {
        let props = [
            (videoio::CAP_PROP_FRAME_WIDTH, resolution.width),
            (videoio::CAP_PROP_FRAME_HEIGHT, resolution.height),
        ];
        for (prop, value) in props {
            match self.cap.set(prop, f64::from(value)) {
                Ok(true) => {}
                Ok(false) => debug!(prop, value, "capture property not accepted"),
                Err(e) => debug!(prop, value, error = %e, "setting capture property failed"),
            }
        }
    }

    fn read(&mut self) -> Option<Frame> {
        match self.decode() {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "opencv read failed");
                None
            }
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.cap.release() {
            warn!(error = %e, "opencv release failed");
        }
    }
}
