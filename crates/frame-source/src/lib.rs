//! frame-source: "give me the current frame" over camera and video capture handles
//!
//! Two variants sit behind the [`FrameSource`] trait. [`ThreadedFrameSource`]
//! polls a live device on its own thread and hands out the latest frame without
//! blocking. [`SynchronousFrameSource`] decodes one frame per call for
//! recordings where every frame matters. The default build enables a synthetic
//! backend so everything runs without a camera; OpenCV sits behind the `opencv`
//! feature.

mod types;
pub use types::{Frame, InputSpec, PixelFormat, Resolution, SourceKind};

mod error;
pub use error::{Error, Result};

mod traits;
pub use traits::{CaptureHandle, FrameSource};

mod scoped;
pub use scoped::ScopedCapture;

pub mod mirror;
pub use mirror::{mirror, mirror_in_place};

mod threaded;
pub use threaded::{PublishedFrame, ThreadedFrameSource, ThreadedStats};

mod synchronous;
pub use synchronous::SynchronousFrameSource;

mod config;
pub use config::{load_source_config, SourceConfig, SourceMode};

mod select;
pub use select::open_source;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{CaptureProbe, SyntheticCapture};

#[cfg(feature = "opencv")]
mod opencv_backend;
#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvCapture;
