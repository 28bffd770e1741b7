//! 手動批次處理主模組
//!
//! 選擇資料夾與影片後，依序擷取最後一幀並（或）剪去最後一幀

use super::batch_coordinator::{BatchCoordinator, BatchReport};
use super::output_producer::ItemOutcome;
use crate::component::directory_prompt::{prompt_directory, remember_directory};
use crate::config::Config;
use crate::signal::reset_shutdown_signal;
use crate::tools::{
    FfmpegToolkit, OutputKind, SequenceAllocator, VideoItem, list_videos, validate_directory_exists,
};
use anyhow::Result;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 影片最後一幀批次處理器
pub struct BatchProcessor {
    shutdown_signal: Arc<AtomicBool>,
}

impl BatchProcessor {
    pub const fn new(shutdown_signal: Arc<AtomicBool>) -> Self {
        Self { shutdown_signal }
    }

    pub fn run(&self, config: &mut Config) -> Result<()> {
        reset_shutdown_signal(&self.shutdown_signal);
        println!("{}", style("=== 影片最後一幀處理 ===").cyan().bold());

        let Some(directory) = prompt_directory(config)? else {
            return Ok(());
        };
        validate_directory_exists(&directory)?;
        remember_directory(config, &directory);

        println!("{}", style("掃描影片檔案中...").dim());
        let videos = list_videos(&directory, &config.file_type_table)?;

        if videos.is_empty() {
            println!("{}", style("找不到任何影片檔案").yellow());
            return Ok(());
        }

        println!(
            "{}",
            style(format!("找到 {} 個影片檔案", videos.len())).green()
        );

        let Some(selected) = self.select_videos(&videos)? else {
            return Ok(());
        };
        if selected.is_empty() {
            println!("{}", style("未選擇任何影片").yellow());
            return Ok(());
        }

        let kinds = self.select_kinds()?;
        if kinds.is_empty() {
            println!("{}", style("未選擇任何輸出").yellow());
            return Ok(());
        }

        if kinds.contains(&OutputKind::Trimmed) && !self.confirm_trim(selected.len())? {
            println!("{}", style("操作已取消").yellow());
            return Ok(());
        }

        let processing = &config.settings.processing;
        let coordinator = BatchCoordinator::new(
            Arc::new(FfmpegToolkit::new(processing)),
            SequenceAllocator::shared(),
            processing,
        )
        .with_shutdown_signal(Arc::clone(&self.shutdown_signal));

        let report = self.execute(&coordinator, &selected, &kinds)?;

        if self.shutdown_signal.load(Ordering::SeqCst) {
            println!("{}", style("操作已中斷，剩餘影片未處理").yellow());
        }
        display_summary(&report, &kinds, &directory);

        Ok(())
    }

    fn select_videos(&self, videos: &[VideoItem]) -> Result<Option<Vec<VideoItem>>> {
        let modes = ["處理全部影片", "選擇部分影片"];
        let mode = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("要處理哪些影片？")
            .items(&modes)
            .default(0)
            .interact_opt()?;

        match mode {
            None => Ok(None),
            Some(0) => Ok(Some(videos.to_vec())),
            Some(_) => {
                let names: Vec<String> = videos.iter().map(VideoItem::file_name).collect();
                let picked = MultiSelect::with_theme(&ColorfulTheme::default())
                    .with_prompt("以空白鍵選擇影片，Enter 確認")
                    .items(&names)
                    .interact_opt()?;
                Ok(picked.map(|indices| indices.into_iter().map(|i| videos[i].clone()).collect()))
            }
        }
    }

    fn select_kinds(&self) -> Result<BTreeSet<OutputKind>> {
        let labels: Vec<String> = OutputKind::ALL.iter().map(ToString::to_string).collect();
        let picked = MultiSelect::with_theme(&ColorfulTheme::default())
            .with_prompt("請選擇輸出")
            .items(&labels)
            .defaults(&[true, true])
            .interact_opt()?
            .unwrap_or_default();

        Ok(picked.into_iter().map(|i| OutputKind::ALL[i]).collect())
    }

    fn confirm_trim(&self, count: usize) -> Result<bool> {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "將為 {count} 部影片另存剪去最後一幀的版本（原始檔不會變更），確定嗎？"
            ))
            .default(true)
            .interact()?;
        Ok(confirmed)
    }

    fn execute(
        &self,
        coordinator: &BatchCoordinator,
        items: &[VideoItem],
        kinds: &BTreeSet<OutputKind>,
    ) -> Result<BatchReport> {
        let progress_bar = ProgressBar::new(items.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );
        progress_bar.set_message("處理中...");

        let report = coordinator.run(items, kinds, |current, _total, item| {
            progress_bar.set_position(current as u64);
            progress_bar.set_message(item.file_name());
        });

        match &report {
            Ok(_) => progress_bar.finish_with_message("完成"),
            Err(_) => progress_bar.abandon_with_message("無法開始處理"),
        }

        Ok(report?)
    }
}

fn display_summary(report: &BatchReport, kinds: &BTreeSet<OutputKind>, directory: &Path) {
    println!();
    println!("{}", style("=== 處理結果 ===").cyan().bold());

    for kind in kinds {
        let summary = report.summary(*kind);
        println!("{}", style(kind.to_string()).bold());
        println!("  成功: {} 個", style(summary.completed).green());
        if summary.skipped > 0 {
            println!("  跳過: {} 個", style(summary.skipped).yellow());
        }
        if summary.failed > 0 {
            println!("  失敗: {} 個", style(summary.failed).red());
        }
        if summary.completed > 0 {
            println!(
                "  輸出資料夾: {}",
                style(kind.output_dir(directory).display()).dim()
            );
        }
    }

    for item in &report.items {
        for (kind, outcome) in &item.outcomes {
            match outcome {
                ItemOutcome::Failed(e) => {
                    println!("  {} [{kind}] {e}", style("✗").red());
                }
                ItemOutcome::Skipped { reason } => {
                    println!(
                        "  {} [{kind}] {}: {reason}",
                        style("-").yellow(),
                        item.item.file_name()
                    );
                }
                ItemOutcome::Completed { .. } => {}
            }
        }
    }
}
