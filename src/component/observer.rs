//! 核心流程回報給介面層的回呼
//!
//! 所有方法都有預設的空實作，介面只需要覆寫自己關心的部分。

use crate::component::auto_processor::FileState;
use crate::component::batch_processor::BatchReport;
use crate::tools::VideoItem;
use log::{info, warn};
use std::path::Path;

pub trait ProcessingObserver: Send + Sync {
    fn on_progress(&self, _current: usize, _total: usize, _item_name: &str) {}

    fn on_status(&self, _message: &str) {}

    fn on_list_refreshed(&self, _items: &[VideoItem]) {}

    fn on_watch_event(&self, _path: &Path, _state: FileState) {}

    /// 自動處理的單部影片批次結束
    fn on_batch_finished(&self, _report: &BatchReport) {}
}

/// 只寫入日誌的觀察者
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProcessingObserver for LogObserver {
    fn on_progress(&self, current: usize, total: usize, item_name: &str) {
        info!("[{current}/{total}] {item_name}");
    }

    fn on_status(&self, message: &str) {
        info!("{message}");
    }

    fn on_list_refreshed(&self, items: &[VideoItem]) {
        info!("影片清單已更新，共 {} 部", items.len());
    }

    fn on_watch_event(&self, path: &Path, state: FileState) {
        match state {
            FileState::TimedOut => warn!("{state}: {}", path.display()),
            _ => info!("{state}: {}", path.display()),
        }
    }
}
