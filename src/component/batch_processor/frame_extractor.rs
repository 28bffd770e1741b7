use super::output_producer::{ItemOutcome, OutputProducer, SkipReason, is_too_short};
use crate::error::CoreResult;
use crate::tools::{MediaInfo, MediaToolkit, OutputKind, VideoItem};
use log::debug;
use std::path::Path;
use std::sync::Arc;

/// 擷取影片最後一幀為 JPEG
pub struct FrameExtractor {
    toolkit: Arc<dyn MediaToolkit>,
    min_duration_seconds: f64,
}

impl FrameExtractor {
    pub fn new(toolkit: Arc<dyn MediaToolkit>, min_duration_seconds: f64) -> Self {
        Self {
            toolkit,
            min_duration_seconds,
        }
    }

    pub fn extract(&self, video: &VideoItem, info: &MediaInfo, output_path: &Path) -> ItemOutcome {
        self.run(video, info, output_path)
    }
}

impl OutputProducer for FrameExtractor {
    fn kind(&self) -> OutputKind {
        OutputKind::LastFrame
    }

    /// 定位到倒數一幀：max(0, duration − 1/fps)
    fn plan(&self, info: &MediaInfo) -> Result<f64, SkipReason> {
        if is_too_short(info, self.min_duration_seconds) {
            return Err(SkipReason::TooShort);
        }
        Ok(info.duration_without_last_frame().max(0.0))
    }

    fn produce(&self, video: &VideoItem, offset_seconds: f64, output_path: &Path) -> CoreResult<()> {
        debug!(
            "擷取最後一幀 {} @ {offset_seconds:.3}s -> {}",
            video.path.display(),
            output_path.display()
        );
        self.toolkit
            .export_frame(&video.path, offset_seconds, output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::tools::DEFAULT_FRAME_RATE;

    struct NoopToolkit;

    impl MediaToolkit for NoopToolkit {
        fn check_available(&self) -> CoreResult<()> {
            Ok(())
        }
        fn probe(&self, path: &Path) -> CoreResult<MediaInfo> {
            Err(CoreError::SourceNotFound(path.to_path_buf()))
        }
        fn export_frame(&self, _input: &Path, _offset: f64, _output: &Path) -> CoreResult<()> {
            Ok(())
        }
        fn copy_trim(&self, _input: &Path, _end: f64, _output: &Path) -> CoreResult<()> {
            Ok(())
        }
    }

    fn extractor(min_duration_seconds: f64) -> FrameExtractor {
        FrameExtractor::new(Arc::new(NoopToolkit), min_duration_seconds)
    }

    #[test]
    fn test_plan_seeks_to_last_frame() {
        let info = MediaInfo {
            duration_seconds: 10.0,
            frame_rate: 25.0,
        };
        let offset = extractor(0.5).plan(&info).unwrap();
        assert!((offset - 9.96).abs() < 1e-9);
    }

    #[test]
    fn test_single_frame_is_too_short() {
        let info = MediaInfo {
            duration_seconds: 0.03,
            frame_rate: 25.0,
        };
        assert_eq!(extractor(0.0).plan(&info), Err(SkipReason::TooShort));
    }

    #[test]
    fn test_short_clip_is_skipped() {
        let info = MediaInfo {
            duration_seconds: 0.2,
            frame_rate: 24.0,
        };
        assert_eq!(extractor(0.5).plan(&info), Err(SkipReason::TooShort));
    }

    #[test]
    fn test_fallback_frame_rate_plan() {
        let info = MediaInfo {
            duration_seconds: 3.0,
            frame_rate: DEFAULT_FRAME_RATE,
        };
        let offset = extractor(0.5).plan(&info).unwrap();
        assert!((offset - (3.0 - 1.0 / 30.0)).abs() < 1e-9);
    }

    #[test]
    fn test_tool_that_writes_nothing_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let video = VideoItem::from_path(&dir.path().join("clip.mp4")).unwrap();
        let output = dir.path().join("clip_last_1.jpg");
        std::fs::write(&output, b"").unwrap();
        let info = MediaInfo {
            duration_seconds: 4.0,
            frame_rate: 30.0,
        };

        let outcome = extractor(0.5).extract(&video, &info, &output);
        assert!(matches!(outcome, ItemOutcome::Failed(CoreError::Processing { .. })));
    }
}
