//! 批次協調
//!
//! 依輸入順序逐一處理影片：取得影片資訊、分配序號、呼叫擷取/剪輯。
//! 每部影片、每種輸出的結果獨立記錄，單一失敗不影響其他項目。

use super::frame_extractor::FrameExtractor;
use super::output_producer::{ItemOutcome, OutputProducer, SkipReason};
use super::video_trimmer::VideoTrimmer;
use crate::config::ProcessingSettings;
use crate::error::{CoreError, CoreResult};
use crate::tools::{MediaInfo, MediaToolkit, OutputKind, SequenceAllocator, VideoItem};
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 單一影片的所有輸出結果
#[derive(Debug)]
pub struct ItemReport {
    pub item: VideoItem,
    pub outcomes: BTreeMap<OutputKind, ItemOutcome>,
}

/// 各輸出種類的統計
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KindSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 一次批次執行的結果，順序與輸入相同
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn outcome(&self, path: &Path, kind: OutputKind) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|report| report.item.path == path)
            .and_then(|report| report.outcomes.get(&kind))
    }

    #[must_use]
    pub fn summary(&self, kind: OutputKind) -> KindSummary {
        self.items
            .iter()
            .filter_map(|report| report.outcomes.get(&kind))
            .fold(KindSummary::default(), |mut acc, outcome| {
                match outcome {
                    ItemOutcome::Completed { .. } => acc.completed += 1,
                    ItemOutcome::Skipped { .. } => acc.skipped += 1,
                    ItemOutcome::Failed(_) => acc.failed += 1,
                }
                acc
            })
    }

    /// 成功寫出的檔案
    #[must_use]
    pub fn outputs(&self, kind: OutputKind) -> Vec<PathBuf> {
        self.items
            .iter()
            .filter_map(|report| match report.outcomes.get(&kind) {
                Some(ItemOutcome::Completed { output }) => Some(output.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct BatchCoordinator {
    toolkit: Arc<dyn MediaToolkit>,
    allocator: Arc<SequenceAllocator>,
    extractor: FrameExtractor,
    trimmer: VideoTrimmer,
    shutdown_signal: Option<Arc<AtomicBool>>,
}

impl BatchCoordinator {
    pub fn new(
        toolkit: Arc<dyn MediaToolkit>,
        allocator: Arc<SequenceAllocator>,
        settings: &ProcessingSettings,
    ) -> Self {
        Self {
            extractor: FrameExtractor::new(Arc::clone(&toolkit), settings.min_duration_seconds),
            trimmer: VideoTrimmer::new(Arc::clone(&toolkit), settings.min_duration_seconds),
            toolkit,
            allocator,
            shutdown_signal: None,
        }
    }

    /// 收到中斷信號後不再開始新的影片，已開始的影片會處理完
    #[must_use]
    pub fn with_shutdown_signal(mut self, shutdown_signal: Arc<AtomicBool>) -> Self {
        self.shutdown_signal = Some(shutdown_signal);
        self
    }

    /// 依序處理 `items`，每處理完一部影片呼叫一次 `on_progress(current, total, item)`
    ///
    /// 外部工具無法使用時整個操作回傳錯誤；其餘失敗都記錄在結果中。
    pub fn run<F>(
        &self,
        items: &[VideoItem],
        kinds: &BTreeSet<OutputKind>,
        mut on_progress: F,
    ) -> CoreResult<BatchReport>
    where
        F: FnMut(usize, usize, &VideoItem),
    {
        if items.is_empty() || kinds.is_empty() {
            return Ok(BatchReport::default());
        }

        self.toolkit.check_available()?;

        let total = items.len();
        info!("開始批次處理，共 {total} 部影片，輸出: {kinds:?}");

        let mut report = BatchReport {
            items: Vec::with_capacity(total),
        };

        for (index, item) in items.iter().enumerate() {
            let item_report = if self.is_shutdown_requested() {
                Self::cancelled(item, kinds)
            } else {
                self.process_item(item, kinds)
            };
            report.items.push(item_report);
            on_progress(index + 1, total, item);
        }

        for kind in kinds {
            let summary = report.summary(*kind);
            info!(
                "{kind}: 成功 {}, 略過 {}, 失敗 {}",
                summary.completed, summary.skipped, summary.failed
            );
        }

        Ok(report)
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_signal
            .as_ref()
            .is_some_and(|signal| signal.load(Ordering::SeqCst))
    }

    fn cancelled(item: &VideoItem, kinds: &BTreeSet<OutputKind>) -> ItemReport {
        ItemReport {
            item: item.clone(),
            outcomes: kinds
                .iter()
                .map(|kind| {
                    (
                        *kind,
                        ItemOutcome::Skipped {
                            reason: SkipReason::Cancelled,
                        },
                    )
                })
                .collect(),
        }
    }

    fn process_item(&self, item: &VideoItem, kinds: &BTreeSet<OutputKind>) -> ItemReport {
        info!("處理中: {}", item.file_name());

        let info = if item.path.is_file() {
            self.toolkit.probe(&item.path)
        } else {
            Err(CoreError::SourceNotFound(item.path.clone()))
        };

        let outcomes = match info {
            Ok(info) => kinds
                .iter()
                .map(|kind| (*kind, self.produce(item, &info, self.producer(*kind))))
                .collect(),
            Err(e) => {
                warn!("{e}");
                kinds
                    .iter()
                    .map(|kind| (*kind, ItemOutcome::Failed(duplicate_item_error(&e, item))))
                    .collect()
            }
        };

        ItemReport {
            item: item.clone(),
            outcomes,
        }
    }

    fn producer(&self, kind: OutputKind) -> &dyn OutputProducer {
        match kind {
            OutputKind::LastFrame => &self.extractor,
            OutputKind::Trimmed => &self.trimmer,
        }
    }

    /// 先判斷是否略過，需要輸出時才保留序號，避免浪費號碼
    fn produce(&self, item: &VideoItem, info: &MediaInfo, producer: &dyn OutputProducer) -> ItemOutcome {
        if let Err(reason) = producer.plan(info) {
            info!("略過 {} ({}): {reason}", item.file_name(), producer.kind());
            return ItemOutcome::Skipped { reason };
        }

        let kind = producer.kind();
        let output_dir = kind.output_dir(item.source_dir());
        let reservation = match self
            .allocator
            .allocate(&output_dir, kind, &item.stem, &item.extension)
        {
            Ok(reservation) => reservation,
            Err(e) => {
                error!("無法分配輸出檔名 {}: {e}", item.file_name());
                return ItemOutcome::Failed(e);
            }
        };

        let outcome = producer.run(item, info, reservation.path());
        match &outcome {
            ItemOutcome::Completed { output } => {
                info!("完成 ({kind}): {}", output.display());
                let _ = reservation.commit();
            }
            ItemOutcome::Failed(e) => error!("{e}"),
            ItemOutcome::Skipped { .. } => {}
        }
        outcome
    }
}

/// 同一個探測錯誤需要記錄在每種輸出底下
fn duplicate_item_error(error: &CoreError, item: &VideoItem) -> CoreError {
    match error {
        CoreError::Probe { path, cause } => CoreError::Probe {
            path: path.clone(),
            cause: cause.clone(),
        },
        CoreError::SourceNotFound(path) => CoreError::SourceNotFound(path.clone()),
        other => CoreError::Probe {
            path: item.path.clone(),
            cause: other.to_string(),
        },
    }
}
