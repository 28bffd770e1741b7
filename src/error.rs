use crate::tools::OutputKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 核心流程的錯誤分類
///
/// 單一影片的失敗會被記錄在批次結果中，不會中斷其他影片；
/// 只有工具缺失或資料夾無效這類錯誤會讓整個操作提早結束。
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("無法取得影片資訊 {}: {cause}", .path.display())]
    Probe { path: PathBuf, cause: String },

    #[error("處理失敗 {}: {cause}", .path.display())]
    Processing { path: PathBuf, cause: String },

    #[error("檔案在 {}s 內未完成寫入: {}", .timeout.as_secs(), .path.display())]
    TimedOutStabilizing { path: PathBuf, timeout: Duration },

    #[error("資料夾不存在: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("無法監看資料夾 {}: {cause}", .path.display())]
    WatcherUnavailable { path: PathBuf, cause: String },

    #[error("輸出檔案已存在，拒絕覆寫: {}", .0.display())]
    NameCollision(PathBuf),

    #[error("輸出序號已用盡 ({kind:?}): {}", .dir.display())]
    SequenceExhausted { dir: PathBuf, kind: OutputKind },

    #[error("找不到外部工具 {tool}: {cause}")]
    ToolUnavailable { tool: String, cause: String },

    #[error("來源檔案不存在: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
