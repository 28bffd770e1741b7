//! 影片最後一幀處理元件
//!
//! 流程：
//! A. 取得影片資訊（ffprobe）
//! B. 分配不重複的輸出序號
//! C. 擷取最後一幀 / 剪去最後一幀（ffmpeg）

mod batch_coordinator;
mod frame_extractor;
mod main;
mod output_producer;
mod video_trimmer;

pub use batch_coordinator::{BatchCoordinator, BatchReport, ItemReport, KindSummary};
pub use frame_extractor::FrameExtractor;
pub use main::BatchProcessor;
pub use output_producer::{ItemOutcome, OutputProducer, SkipReason};
pub use video_trimmer::VideoTrimmer;
