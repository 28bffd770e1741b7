use crate::error::{CoreError, CoreResult};
use crate::tools::{MediaInfo, OutputKind, VideoItem};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// 單一影片、單一輸出種類的處理結果
#[derive(Debug)]
pub enum ItemOutcome {
    Completed { output: PathBuf },
    Skipped { reason: SkipReason },
    Failed(CoreError),
}

impl ItemOutcome {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 影片不超過一幀，或短於設定的最短長度
    TooShort,
    /// 收到中斷信號，未開始處理
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "too short"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// 由一部影片產生一個輸出檔的處理器
pub trait OutputProducer: Send + Sync {
    fn kind(&self) -> OutputKind;

    /// 決定外部工具使用的時間點（秒），或回傳略過原因
    fn plan(&self, info: &MediaInfo) -> Result<f64, SkipReason>;

    /// 呼叫外部工具寫出 `output_path`
    fn produce(&self, video: &VideoItem, offset_seconds: f64, output_path: &Path) -> CoreResult<()>;

    fn run(&self, video: &VideoItem, info: &MediaInfo, output_path: &Path) -> ItemOutcome {
        let offset_seconds = match self.plan(info) {
            Ok(offset) => offset,
            Err(reason) => return ItemOutcome::Skipped { reason },
        };

        match self
            .produce(video, offset_seconds, output_path)
            .and_then(|()| verify_output(video, output_path))
        {
            Ok(()) => ItemOutcome::Completed {
                output: output_path.to_path_buf(),
            },
            Err(e) => ItemOutcome::Failed(e),
        }
    }
}

/// 工具正常結束但沒有寫出內容時視為失敗
fn verify_output(video: &VideoItem, output_path: &Path) -> CoreResult<()> {
    let written = fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);
    if written == 0 {
        return Err(CoreError::Processing {
            path: video.path.clone(),
            cause: format!("輸出檔案為空: {}", output_path.display()),
        });
    }
    Ok(())
}

/// 長度低於門檻的影片不處理
pub(crate) fn is_too_short(info: &MediaInfo, min_duration_seconds: f64) -> bool {
    info.estimated_frames() <= 1.0 || info.duration_seconds < min_duration_seconds
}
