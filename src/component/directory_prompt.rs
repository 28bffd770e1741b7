//! 選擇影片資料夾：最近使用的路徑或手動輸入

use crate::config::Config;
use crate::config::save::{add_recent_path, save_settings};
use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use log::warn;
use std::path::PathBuf;

/// 回傳 `None` 表示使用者按 ESC 取消
pub fn prompt_directory(config: &Config) -> Result<Option<PathBuf>> {
    let recent = &config.settings.recent_paths;

    if !recent.is_empty() {
        let mut items: Vec<String> = recent.clone();
        items.push("輸入新路徑...".to_string());

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("請選擇影片資料夾")
            .items(&items)
            .default(0)
            .interact_opt()?;

        match selection {
            None => return Ok(None),
            Some(index) if index < recent.len() => return Ok(Some(PathBuf::from(&recent[index]))),
            Some(_) => {}
        }
    }

    let path: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("請輸入影片資料夾路徑")
        .interact_text()?;
    Ok(Some(PathBuf::from(path.trim())))
}

/// 記住使用過的資料夾，寫入失敗只記錄警告
pub fn remember_directory(config: &mut Config, directory: &std::path::Path) {
    add_recent_path(&mut config.settings, &directory.to_string_lossy());
    if let Err(e) = save_settings(&config.settings) {
        warn!("無法儲存最近使用的路徑: {e}");
    }
}
