use super::output_producer::{ItemOutcome, OutputProducer, SkipReason, is_too_short};
use crate::error::CoreResult;
use crate::tools::{MediaInfo, MediaToolkit, OutputKind, VideoItem};
use log::debug;
use std::path::Path;
use std::sync::Arc;

/// 以串流複製產生去掉最後一幀的新影片，原始檔案不會被修改
pub struct VideoTrimmer {
    toolkit: Arc<dyn MediaToolkit>,
    min_duration_seconds: f64,
}

impl VideoTrimmer {
    pub fn new(toolkit: Arc<dyn MediaToolkit>, min_duration_seconds: f64) -> Self {
        Self {
            toolkit,
            min_duration_seconds,
        }
    }

    pub fn trim(&self, video: &VideoItem, info: &MediaInfo, output_path: &Path) -> ItemOutcome {
        self.run(video, info, output_path)
    }
}

impl OutputProducer for VideoTrimmer {
    fn kind(&self) -> OutputKind {
        OutputKind::Trimmed
    }

    /// 目標長度 duration − 1/fps，小於等於 0 時略過
    fn plan(&self, info: &MediaInfo) -> Result<f64, SkipReason> {
        let target = info.duration_without_last_frame();
        if target <= 0.0 || is_too_short(info, self.min_duration_seconds) {
            return Err(SkipReason::TooShort);
        }
        Ok(target)
    }

    fn produce(&self, video: &VideoItem, offset_seconds: f64, output_path: &Path) -> CoreResult<()> {
        debug!(
            "剪去最後一幀 {} -> {} ({offset_seconds:.3}s)",
            video.path.display(),
            output_path.display()
        );
        self.toolkit
            .copy_trim(&video.path, offset_seconds, output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::fs;
    use std::sync::Mutex;

    /// 記錄呼叫參數並寫出假的輸出
    #[derive(Default)]
    struct RecordingToolkit {
        trims: Mutex<Vec<f64>>,
    }

    impl MediaToolkit for RecordingToolkit {
        fn check_available(&self) -> CoreResult<()> {
            Ok(())
        }
        fn probe(&self, path: &Path) -> CoreResult<MediaInfo> {
            Err(CoreError::SourceNotFound(path.to_path_buf()))
        }
        fn export_frame(&self, _input: &Path, _offset: f64, _output: &Path) -> CoreResult<()> {
            Ok(())
        }
        fn copy_trim(&self, _input: &Path, end: f64, output: &Path) -> CoreResult<()> {
            self.trims.lock().unwrap().push(end);
            fs::write(output, b"trimmed")?;
            Ok(())
        }
    }

    #[test]
    fn test_trim_targets_duration_minus_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(RecordingToolkit::default());
        let trimmer = VideoTrimmer::new(toolkit.clone(), 0.5);
        let video = VideoItem::from_path(&dir.path().join("clip.mp4")).unwrap();
        let output = dir.path().join("clip_trimmed_1.mp4");
        let info = MediaInfo {
            duration_seconds: 5.0,
            frame_rate: 30.0,
        };

        let outcome = trimmer.trim(&video, &info, &output);

        assert!(outcome.is_completed());
        let trims = toolkit.trims.lock().unwrap();
        assert_eq!(trims.len(), 1);
        assert!((trims[0] - 4.966_666_7).abs() < 1e-4);
    }

    #[test]
    fn test_short_clip_is_skipped_without_calling_tool() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = Arc::new(RecordingToolkit::default());
        let trimmer = VideoTrimmer::new(toolkit.clone(), 0.5);
        let video = VideoItem::from_path(&dir.path().join("clip.mp4")).unwrap();
        let info = MediaInfo {
            duration_seconds: 0.2,
            frame_rate: 24.0,
        };

        let outcome = trimmer.trim(&video, &info, &dir.path().join("out.mp4"));

        assert!(matches!(
            outcome,
            ItemOutcome::Skipped {
                reason: SkipReason::TooShort
            }
        ));
        assert!(toolkit.trims.lock().unwrap().is_empty());
    }

    #[test]
    fn test_non_positive_target_is_skipped() {
        let trimmer = VideoTrimmer::new(Arc::new(RecordingToolkit::default()), 0.0);
        let info = MediaInfo {
            duration_seconds: 1.0 / 30.0,
            frame_rate: 30.0,
        };
        assert_eq!(trimmer.plan(&info), Err(SkipReason::TooShort));
    }
}
