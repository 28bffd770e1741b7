use super::stability_watcher::{FileState, StabilityWatcher, WatchEvent, WatchState, WatcherHandle};
use crate::component::batch_processor::BatchCoordinator;
use crate::component::observer::ProcessingObserver;
use crate::config::{FileTypeTable, WatchSettings};
use crate::error::{CoreError, CoreResult};
use crate::tools::{OutputKind, VideoItem, list_videos};
use log::{error, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// 自動處理：監看到的新影片寫入完成後，在背景執行單部影片的批次
///
/// 監看與處理分別在不同執行緒，處理時間不會拖慢監看的輪詢。
pub struct AutoProcessSession {
    watcher: WatcherHandle,
    active: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    dispatcher: Option<JoinHandle<()>>,
}

/// 分派執行緒需要的共用資源
struct Dispatcher {
    directory: PathBuf,
    kinds: BTreeSet<OutputKind>,
    file_type_table: FileTypeTable,
    stability_timeout: Duration,
    coordinator: Arc<BatchCoordinator>,
    observer: Arc<dyn ProcessingObserver>,
    pool: Arc<ThreadPool>,
    active: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
}

impl AutoProcessSession {
    pub fn start(
        directory: &Path,
        enabled_kinds: BTreeSet<OutputKind>,
        coordinator: Arc<BatchCoordinator>,
        file_type_table: &FileTypeTable,
        settings: &WatchSettings,
        observer: Arc<dyn ProcessingObserver>,
    ) -> CoreResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(settings.worker_threads.max(1))
            .thread_name(|index| format!("auto-process-{index}"))
            .build()
            .map_err(|e| CoreError::WatcherUnavailable {
                path: directory.to_path_buf(),
                cause: e.to_string(),
            })?;

        let (watcher, events) = StabilityWatcher::start(directory, file_type_table, settings)?;

        let active = Arc::new(AtomicBool::new(true));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher {
            directory: directory.to_path_buf(),
            kinds: enabled_kinds,
            file_type_table: file_type_table.clone(),
            stability_timeout: settings.stability_timeout(),
            coordinator,
            observer,
            pool: Arc::new(pool),
            active: Arc::clone(&active),
            in_flight: Arc::clone(&in_flight),
        };

        let dispatcher = thread::Builder::new()
            .name("auto-process-dispatch".into())
            .spawn(move || dispatcher.run(events))
            .map_err(|e| CoreError::WatcherUnavailable {
                path: directory.to_path_buf(),
                cause: e.to_string(),
            })?;

        info!("自動處理已啟動: {}", directory.display());

        Ok(Self {
            watcher,
            active,
            in_flight,
            dispatcher: Some(dispatcher),
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// 尚未完成的自動處理批次數
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn watch_state(&self) -> WatchState {
        self.watcher.state()
    }

    /// 停止監看並釋放監看執行緒；已開始的批次會繼續完成，之後的事件一律忽略
    pub fn stop(&mut self) {
        if !self.active.swap(false, Ordering::SeqCst) && self.dispatcher.is_none() {
            return;
        }

        self.watcher.stop();
        if let Some(dispatcher) = self.dispatcher.take()
            && dispatcher.join().is_err()
        {
            warn!("自動處理分派執行緒異常結束");
        }
        info!("自動處理已停止");
    }
}

impl Drop for AutoProcessSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Dispatcher {
    /// 監看執行緒結束（送出端關閉）時迴圈結束
    fn run(self, events: Receiver<WatchEvent>) {
        for event in events {
            if !self.active.load(Ordering::SeqCst) {
                continue;
            }

            self.observer.on_watch_event(&event.path, event.state);

            match event.state {
                FileState::Detected => self.refresh_list(),
                FileState::Stabilizing => {}
                FileState::Ready => self.dispatch(event.path),
                FileState::TimedOut => self.report_timeout(event.path),
            }
        }
    }

    /// 逾時的檔案不自動處理，只回報錯誤
    fn report_timeout(&self, path: PathBuf) {
        let error = CoreError::TimedOutStabilizing {
            path,
            timeout: self.stability_timeout,
        };
        warn!("{error}");
        self.observer.on_status(&error.to_string());
    }

    fn refresh_list(&self) {
        match list_videos(&self.directory, &self.file_type_table) {
            Ok(items) => self.observer.on_list_refreshed(&items),
            Err(e) => warn!("無法更新影片清單: {e}"),
        }
    }

    fn dispatch(&self, path: PathBuf) {
        let item = match VideoItem::from_path(&path) {
            Ok(item) => item,
            Err(e) => {
                error!("無法建立處理項目 {}: {e}", path.display());
                return;
            }
        };

        let kinds = self.kinds.clone();
        let coordinator = Arc::clone(&self.coordinator);
        let observer = Arc::clone(&self.observer);
        let in_flight = Arc::clone(&self.in_flight);

        in_flight.fetch_add(1, Ordering::SeqCst);
        self.pool.spawn(move || {
            observer.on_status(&format!("自動處理: {}", item.file_name()));
            let result = coordinator.run(std::slice::from_ref(&item), &kinds, |current, total, item| {
                observer.on_progress(current, total, &item.file_name());
            });
            match result {
                Ok(report) => observer.on_batch_finished(&report),
                Err(e) => {
                    error!("自動處理失敗 {}: {e}", item.file_name());
                    observer.on_status(&e.to_string());
                }
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }
}
