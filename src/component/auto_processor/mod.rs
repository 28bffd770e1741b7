//! 自動處理元件
//!
//! 監看資料夾中新增的影片，寫入完成後自動擷取最後一幀並剪去最後一幀

mod main;
mod session;
mod stability_watcher;

pub use main::{AutoProcessor, ConsoleObserver};
pub use session::AutoProcessSession;
pub use stability_watcher::{
    FileState, Stability, StabilityTracker, StabilityWatcher, WatchEvent, WatchState,
    WatcherHandle,
};
