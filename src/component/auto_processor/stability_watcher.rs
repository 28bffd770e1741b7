//! 資料夾監看與寫入完成偵測
//!
//! 以輪詢方式比對資料夾內容找出新建立的影片（不含子資料夾），
//! 再持續檢查檔案大小，連續兩次相同才視為寫入完成。
//! 已存在的檔案、修改與刪除都不會產生事件。
//!
//! 比對時同時記錄檔名與檔案識別（Unix 上為 inode），因此：
//! - 從其他位置搬入（rename）的檔案視為新建立；
//! - 兩次輪詢之間以同名檔案取代（識別改變）也視為新建立；
//! - 兩次輪詢之間刪除再建立，且系統重用了同一個 inode 時無法分辨，不會產生事件。

use crate::config::{FileTypeTable, WatchSettings};
use crate::error::{CoreError, CoreResult};
use crate::tools::validate_directory_exists;
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// 偵測到的檔案狀態：Detected → Stabilizing → Ready / TimedOut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Detected,
    Stabilizing,
    Ready,
    TimedOut,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detected => write!(f, "偵測到新檔案"),
            Self::Stabilizing => write!(f, "等待寫入完成"),
            Self::Ready => write!(f, "檔案已就緒"),
            Self::TimedOut => write!(f, "等待寫入逾時"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub state: FileState,
}

/// 監看中的資料夾狀態快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    pub directory: PathBuf,
    pub is_active: bool,
    pub pending_files: BTreeSet<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Pending,
    Ready,
    TimedOut,
}

/// 單一檔案的大小穩定判斷，不做任何 IO
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    started: Instant,
    timeout: Duration,
    last_size: Option<u64>,
}

impl StabilityTracker {
    #[must_use]
    pub const fn new(started: Instant, timeout: Duration) -> Self {
        Self {
            started,
            timeout,
            last_size: None,
        }
    }

    /// 記錄一次檔案大小；`None` 表示檔案暫時無法讀取
    pub fn observe(&mut self, size: Option<u64>, now: Instant) -> Stability {
        if let Some(size) = size
            && size > 0
            && self.last_size == Some(size)
        {
            return Stability::Ready;
        }

        if now.saturating_duration_since(self.started) >= self.timeout {
            return Stability::TimedOut;
        }

        self.last_size = size;
        Stability::Pending
    }
}

/// 監看執行緒的控制代碼，`stop` 或 drop 時會確實結束執行緒
#[derive(Debug)]
pub struct WatcherHandle {
    directory: PathBuf,
    stop_signal: Arc<AtomicBool>,
    pending: Arc<Mutex<BTreeSet<PathBuf>>>,
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.thread.is_some() && !self.stop_signal.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn state(&self) -> WatchState {
        WatchState {
            directory: self.directory.clone(),
            is_active: self.is_active(),
            pending_files: self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    /// 停止監看並等待執行緒結束，可重複呼叫
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                warn!("監看執行緒異常結束: {}", self.directory.display());
            }
            info!("已停止監看: {}", self.directory.display());
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct StabilityWatcher;

impl StabilityWatcher {
    /// 開始監看 `directory`，事件由回傳的 Receiver 取得
    pub fn start(
        directory: &Path,
        file_type_table: &FileTypeTable,
        settings: &WatchSettings,
    ) -> CoreResult<(WatcherHandle, Receiver<WatchEvent>)> {
        validate_directory_exists(directory)?;

        let known = snapshot(directory).map_err(|e| CoreError::WatcherUnavailable {
            path: directory.to_path_buf(),
            cause: e.to_string(),
        })?;

        let (sender, receiver) = mpsc::channel();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(Mutex::new(BTreeSet::new()));

        let mut poller = Poller {
            directory: directory.to_path_buf(),
            file_type_table: file_type_table.clone(),
            poll_interval: settings.poll_interval(),
            stability_timeout: settings.stability_timeout(),
            known,
            trackers: HashMap::new(),
            pending: Arc::clone(&pending),
            sender,
        };
        let thread_stop = Arc::clone(&stop_signal);

        let thread = thread::Builder::new()
            .name("stability-watcher".into())
            .spawn(move || poller.run(&thread_stop))
            .map_err(|e| CoreError::WatcherUnavailable {
                path: directory.to_path_buf(),
                cause: e.to_string(),
            })?;

        info!("開始監看資料夾: {}", directory.display());

        Ok((
            WatcherHandle {
                directory: directory.to_path_buf(),
                stop_signal,
                pending,
                thread: Some(thread),
            },
            receiver,
        ))
    }
}

/// 檔名對應檔案識別
type Snapshot = HashMap<OsString, u64>;

fn snapshot(directory: &Path) -> std::io::Result<Snapshot> {
    let mut entries = HashMap::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let identity = entry.metadata().map(|m| file_identity(&m)).unwrap_or_default();
        entries.insert(entry.file_name(), identity);
    }
    Ok(entries)
}

#[cfg(unix)]
fn file_identity(metadata: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn file_identity(_metadata: &fs::Metadata) -> u64 {
    0
}

struct Poller {
    directory: PathBuf,
    file_type_table: FileTypeTable,
    poll_interval: Duration,
    stability_timeout: Duration,
    known: Snapshot,
    trackers: HashMap<PathBuf, StabilityTracker>,
    pending: Arc<Mutex<BTreeSet<PathBuf>>>,
    sender: Sender<WatchEvent>,
}

impl Poller {
    fn run(&mut self, stop_signal: &AtomicBool) {
        while !stop_signal.load(Ordering::SeqCst) {
            thread::park_timeout(self.poll_interval);
            if stop_signal.load(Ordering::SeqCst) {
                break;
            }

            let now = Instant::now();
            let alive = self.detect_new_files(now) && self.poll_pending(now);
            if !alive {
                debug!("事件接收端已關閉，結束監看");
                break;
            }
        }
    }

    /// 比對資料夾內容，回傳 false 表示接收端已關閉
    fn detect_new_files(&mut self, now: Instant) -> bool {
        let current = match snapshot(&self.directory) {
            Ok(current) => current,
            Err(e) => {
                warn!("無法讀取監看資料夾 {}: {e}", self.directory.display());
                return true;
            }
        };

        let created: Vec<OsString> = current
            .iter()
            .filter(|(name, identity)| self.known.get(*name) != Some(*identity))
            .map(|(name, _)| name.clone())
            .collect();
        self.known = current;

        for name in created {
            let path = self.directory.join(&name);
            if !path.is_file() || !self.file_type_table.is_video_file(&path) {
                continue;
            }

            info!("偵測到新影片: {}", path.display());
            if !self.emit(&path, FileState::Detected) || !self.emit(&path, FileState::Stabilizing) {
                return false;
            }
            self.trackers
                .insert(path.clone(), StabilityTracker::new(now, self.stability_timeout));
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(path);
        }

        true
    }

    fn poll_pending(&mut self, now: Instant) -> bool {
        let mut finished = Vec::new();

        for (path, tracker) in &mut self.trackers {
            let size = fs::metadata(path).ok().map(|m| m.len());
            match tracker.observe(size, now) {
                Stability::Pending => {}
                Stability::Ready => finished.push((path.clone(), FileState::Ready)),
                Stability::TimedOut => {
                    warn!(
                        "檔案在 {}s 內未完成寫入，不自動處理: {}",
                        self.stability_timeout.as_secs(),
                        path.display()
                    );
                    finished.push((path.clone(), FileState::TimedOut));
                }
            }
        }

        for (path, state) in finished {
            self.trackers.remove(&path);
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&path);
            if !self.emit(&path, state) {
                return false;
            }
        }

        true
    }

    fn emit(&self, path: &Path, state: FileState) -> bool {
        self.sender
            .send(WatchEvent {
                path: path.to_path_buf(),
                state,
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_size_becomes_ready() {
        let start = Instant::now();
        let mut tracker = StabilityTracker::new(start, Duration::from_secs(60));
        assert_eq!(tracker.observe(Some(100), start), Stability::Pending);
        assert_eq!(
            tracker.observe(Some(100), start + Duration::from_secs(1)),
            Stability::Ready
        );
    }

    #[test]
    fn test_growing_file_times_out() {
        let start = Instant::now();
        let mut tracker = StabilityTracker::new(start, Duration::from_secs(60));

        let mut result = Stability::Pending;
        for second in 0..=65u64 {
            result = tracker.observe(Some(1000 + second * 10), start + Duration::from_secs(second));
            if result != Stability::Pending {
                assert_eq!(second, 60);
                break;
            }
        }
        assert_eq!(result, Stability::TimedOut);
    }

    #[test]
    fn test_empty_file_is_never_ready() {
        let start = Instant::now();
        let mut tracker = StabilityTracker::new(start, Duration::from_secs(3));
        assert_eq!(tracker.observe(Some(0), start), Stability::Pending);
        assert_eq!(
            tracker.observe(Some(0), start + Duration::from_secs(1)),
            Stability::Pending
        );
        assert_eq!(
            tracker.observe(Some(0), start + Duration::from_secs(3)),
            Stability::TimedOut
        );
    }

    #[test]
    fn test_unreadable_file_resets_comparison() {
        let start = Instant::now();
        let mut tracker = StabilityTracker::new(start, Duration::from_secs(60));
        assert_eq!(tracker.observe(Some(50), start), Stability::Pending);
        assert_eq!(
            tracker.observe(None, start + Duration::from_secs(1)),
            Stability::Pending
        );
        assert_eq!(
            tracker.observe(Some(50), start + Duration::from_secs(2)),
            Stability::Pending
        );
        assert_eq!(
            tracker.observe(Some(50), start + Duration::from_secs(3)),
            Stability::Ready
        );
    }
}
