use crate::{
    CaptureHandle, FrameSource, Result, SourceConfig, SourceKind, SynchronousFrameSource,
    ThreadedFrameSource,
};
use tracing::debug;

/// Open the source described by `config` with backend `C`.
///
/// The variant is chosen here, once; callers only see `dyn FrameSource`.
pub fn open_source<C: CaptureHandle + 'static>(
    config: &SourceConfig,
) -> Result<Box<dyn FrameSource>> {
    config.validate()?;
    let input = config.input_spec();
    let resolution = config.resolution();
    match config.kind() {
        SourceKind::Threaded => Ok(Box::new(ThreadedFrameSource::open::<C>(
            &input,
            resolution,
            config.mirror,
        )?)),
        SourceKind::Synchronous => {
            if config.mirror {
                debug!(source = %input, "mirror is not applied to synchronous sources");
            }
            Ok(Box::new(SynchronousFrameSource::<C>::open(
                &input, resolution,
            )?))
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{Error, SourceMode, SyntheticCapture};

    #[test]
    fn recording_opens_synchronously() {
        let config = SourceConfig::new("synthetic:2").with_resolution(8, 2);
        let mut source = open_source::<SyntheticCapture>(&config).unwrap();
        assert_eq!(source.kind(), SourceKind::Synchronous);
        assert_eq!(source.input(), "synthetic:2");
        assert!(source.read_frame().is_some());
        assert!(source.read_frame().is_some());
        assert!(source.read_frame().is_none());
        source.close();
    }

    #[test]
    fn device_opens_threaded() {
        let config = SourceConfig::new("0").with_resolution(8, 2);
        let mut source = open_source::<SyntheticCapture>(&config).unwrap();
        assert_eq!(source.kind(), SourceKind::Threaded);
        source.close();
        assert!(source.read_frame().is_none());
    }

    #[test]
    fn forced_mode_wins_over_input_type() {
        let config = SourceConfig::new("synthetic")
            .with_resolution(8, 2)
            .with_mode(SourceMode::Threaded);
        let source = open_source::<SyntheticCapture>(&config).unwrap();
        assert_eq!(source.kind(), SourceKind::Threaded);
    }

    #[test]
    fn synchronous_source_ignores_mirror() {
        let config = SourceConfig::new("synthetic:1")
            .with_resolution(8, 2)
            .with_mirror(true);
        let mut source = open_source::<SyntheticCapture>(&config).unwrap();
        let frame = source.read_frame().unwrap();
        assert!(SyntheticCapture::is_intact(&frame));
    }

    #[test]
    fn unavailable_and_invalid_configs_fail() {
        let missing = SourceConfig::new("nope.avi");
        assert!(matches!(
            open_source::<SyntheticCapture>(&missing).err(),
            Some(Error::SourceUnavailable(_))
        ));

        let invalid = SourceConfig::new("0").with_resolution(0, 0);
        assert!(matches!(
            open_source::<SyntheticCapture>(&invalid).err(),
            Some(Error::Config(_))
        ));
    }
}
