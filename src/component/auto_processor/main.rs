//! 自動處理主模組
//!
//! 監看資料夾，新影片寫入完成後自動處理；按 Enter 或 Ctrl-C 結束

use super::session::AutoProcessSession;
use super::stability_watcher::FileState;
use crate::component::batch_processor::{BatchCoordinator, BatchReport, ItemOutcome, KindSummary};
use crate::component::directory_prompt::{prompt_directory, remember_directory};
use crate::component::observer::ProcessingObserver;
use crate::config::Config;
use crate::error::CoreError;
use crate::signal::reset_shutdown_signal;
use crate::tools::{
    FfmpegToolkit, OutputKind, SequenceAllocator, VideoItem, list_videos, validate_directory_exists,
};
use anyhow::Result;
use console::{Term, style};
use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

const WAIT_INTERVAL: Duration = Duration::from_millis(200);

/// 將處理過程輸出到終端機，並累計各輸出的結果
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    totals: Mutex<BTreeMap<OutputKind, KindSummary>>,
}

impl ConsoleObserver {
    #[must_use]
    pub fn totals(&self) -> BTreeMap<OutputKind, KindSummary> {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProcessingObserver for ConsoleObserver {
    fn on_status(&self, message: &str) {
        println!("{}", style(message).dim());
    }

    fn on_list_refreshed(&self, items: &[VideoItem]) {
        println!(
            "{}",
            style(format!("資料夾目前共 {} 部影片", items.len())).dim()
        );
    }

    fn on_watch_event(&self, path: &Path, state: FileState) {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        match state {
            FileState::Detected => println!("{} {name}", style(state.to_string()).cyan()),
            FileState::Stabilizing => {}
            FileState::Ready => println!("{} {name}", style(state.to_string()).green()),
            FileState::TimedOut => println!("{} {name}", style(state.to_string()).yellow()),
        }
    }

    fn on_batch_finished(&self, report: &BatchReport) {
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);

        for item in &report.items {
            for (kind, outcome) in &item.outcomes {
                let summary = totals.entry(*kind).or_default();
                match outcome {
                    ItemOutcome::Completed { output } => {
                        summary.completed += 1;
                        println!("  {} [{kind}] {}", style("✓").green(), output.display());
                    }
                    ItemOutcome::Skipped { reason } => {
                        summary.skipped += 1;
                        println!(
                            "  {} [{kind}] {}: {reason}",
                            style("-").yellow(),
                            item.item.file_name()
                        );
                    }
                    ItemOutcome::Failed(e) => {
                        summary.failed += 1;
                        println!("  {} [{kind}] {e}", style("✗").red());
                    }
                }
            }
        }
    }
}

/// 資料夾自動處理器
pub struct AutoProcessor {
    shutdown_signal: Arc<AtomicBool>,
}

impl AutoProcessor {
    pub const fn new(shutdown_signal: Arc<AtomicBool>) -> Self {
        Self { shutdown_signal }
    }

    pub fn run(&self, term: &Term, config: &mut Config) -> Result<()> {
        reset_shutdown_signal(&self.shutdown_signal);
        println!("{}", style("=== 資料夾自動處理 ===").cyan().bold());

        let kinds: BTreeSet<OutputKind> =
            config.settings.watch.auto_process_kinds.iter().copied().collect();
        if kinds.is_empty() {
            println!(
                "{}",
                style("設定中未啟用任何自動輸出，請先到設定選單啟用").yellow()
            );
            return Ok(());
        }

        let Some(directory) = prompt_directory(config)? else {
            return Ok(());
        };
        validate_directory_exists(&directory)?;
        remember_directory(config, &directory);

        let existing = list_videos(&directory, &config.file_type_table)?;
        let process_existing = !existing.is_empty() && self.confirm_existing(existing.len())?;

        let processing = &config.settings.processing;
        let coordinator = Arc::new(
            BatchCoordinator::new(
                Arc::new(FfmpegToolkit::new(processing)),
                SequenceAllocator::shared(),
                processing,
            )
            .with_shutdown_signal(Arc::clone(&self.shutdown_signal)),
        );
        let observer = Arc::new(ConsoleObserver::default());

        let session = AutoProcessSession::start(
            &directory,
            kinds.clone(),
            Arc::clone(&coordinator),
            &config.file_type_table,
            &config.settings.watch,
            Arc::clone(&observer) as Arc<dyn ProcessingObserver>,
        );

        let mut session = match session {
            Ok(session) => session,
            Err(e @ CoreError::WatcherUnavailable { .. }) => {
                warn!("{e}");
                println!(
                    "{} {e}",
                    style("無法監看資料夾，改為只處理現有影片:").yellow()
                );
                if process_existing {
                    let report = coordinator.run(&existing, &kinds, |current, total, item| {
                        observer.on_progress(current, total, &item.file_name());
                    })?;
                    observer.on_batch_finished(&report);
                }
                display_totals(&observer.totals());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let backlog = if process_existing {
            let coordinator = Arc::clone(&coordinator);
            let observer = Arc::clone(&observer);
            let kinds = kinds.clone();
            Some(thread::spawn(move || {
                match coordinator.run(&existing, &kinds, |_, _, _| {}) {
                    Ok(report) => observer.on_batch_finished(&report),
                    Err(e) => observer.on_status(&e.to_string()),
                }
            }))
        } else {
            None
        };

        println!(
            "{}",
            style(format!("監看中: {}", directory.display())).green()
        );
        println!("{}", style("按 Enter 停止監看（或 Ctrl-C）").dim());

        self.wait_for_stop(term);
        session.stop();

        if session.in_flight() > 0 {
            println!("{}", style("等待進行中的處理完成...").dim());
            while session.in_flight() > 0 {
                thread::sleep(WAIT_INTERVAL);
            }
        }
        if let Some(backlog) = backlog
            && backlog.join().is_err()
        {
            warn!("現有影片處理執行緒異常結束");
        }

        display_totals(&observer.totals());
        Ok(())
    }

    fn confirm_existing(&self, count: usize) -> Result<bool> {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("資料夾中已有 {count} 部影片，是否一併處理？"))
            .default(false)
            .interact()?;
        Ok(confirmed)
    }

    /// 等待使用者按 Enter 或收到中斷信號
    fn wait_for_stop(&self, term: &Term) {
        let enter_pressed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&enter_pressed);
        let term = term.clone();
        thread::spawn(move || {
            let _ = term.read_line();
            flag.store(true, Ordering::SeqCst);
        });

        while !enter_pressed.load(Ordering::SeqCst) && !self.shutdown_signal.load(Ordering::SeqCst) {
            thread::sleep(WAIT_INTERVAL);
        }
    }
}

fn display_totals(totals: &BTreeMap<OutputKind, KindSummary>) {
    println!();
    println!("{}", style("=== 自動處理結果 ===").cyan().bold());

    if totals.is_empty() {
        println!("{}", style("沒有處理任何影片").dim());
        return;
    }

    for (kind, summary) in totals {
        println!(
            "  {kind}: 成功 {}, 跳過 {}, 失敗 {}",
            style(summary.completed).green(),
            style(summary.skipped).yellow(),
            style(summary.failed).red()
        );
    }
}
