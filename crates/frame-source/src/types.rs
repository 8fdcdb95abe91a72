use core::fmt;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Bgr8,
    Rgb8,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgr8 | PixelFormat::Rgb8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// One decoded image. `Clone` is a deep copy of the pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub data: Vec<u8>,
    pub ts: Option<OffsetDateTime>,
}

impl Frame {
    /// Build a frame stamped with the current UTC time.
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixel_format,
            data,
            ts: Some(OffsetDateTime::now_utc()),
        }
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.pixel_format.bytes_per_pixel()
    }

    /// Whether the buffer holds at least `width * height` pixels.
    pub fn is_complete(&self) -> bool {
        self.stride()
            .checked_mul(self.height as usize)
            .is_some_and(|n| self.data.len() >= n)
    }
}

/// Requested capture size. Devices may round or ignore it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where frames come from: a device index or a file path / stream URL.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum InputSpec {
    Device(i32),
    Path(String),
}

impl InputSpec {
    /// Numeric identifiers are device indices, everything else is a path.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        match spec.parse::<i32>() {
            Ok(index) => InputSpec::Device(index),
            Err(_) => InputSpec::Path(spec.to_string()),
        }
    }

    pub fn is_device(&self) -> bool {
        matches!(self, InputSpec::Device(_))
    }
}

impl From<&str> for InputSpec {
    fn from(spec: &str) -> Self {
        InputSpec::parse(spec)
    }
}

impl fmt::Display for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSpec::Device(index) => write!(f, "device {index}"),
            InputSpec::Path(path) => write!(f, "{path}"),
        }
    }
}

/// Which of the two frame source variants is behind a `dyn FrameSource`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Threaded,
    Synchronous,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Threaded => write!(f, "threaded"),
            SourceKind::Synchronous => write!(f, "synchronous"),
        }
    }
}
