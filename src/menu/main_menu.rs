use crate::config::save::save_settings;
use crate::config::{Config, Language};
use crate::menu::handlers::{run_auto_processor, run_batch_processor};
use crate::tools::OutputKind;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Select};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let options = vec![
        t!("main_menu.opt_batch"),
        t!("main_menu.opt_auto"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_batch_processor(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(1) => {
            run_auto_processor(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(2) => {
            show_settings_menu(term, config)?;
            Ok(true)
        }
        Some(3) => Ok(false),
        None => Ok(false), // ESC pressed - exit
        _ => unreachable!(),
    }
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_auto_kinds"),
            t!("settings.opt_stability_timeout"),
            t!("settings.opt_tool_timeout"),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_auto_kinds_menu(term, config)?,
            Some(1) => show_stability_timeout_menu(term, config)?,
            Some(2) => show_tool_timeout_menu(term, config)?,
            Some(3) => show_language_menu(term, config)?,
            Some(4) | None => break, // ESC or back
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// 自動處理輸出設定選單
fn show_auto_kinds_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.auto_kinds.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());
    println!();

    let items: Vec<String> = OutputKind::ALL.iter().map(ToString::to_string).collect();
    let current = &config.settings.watch.auto_process_kinds;
    let defaults: Vec<bool> = OutputKind::ALL
        .iter()
        .map(|kind| current.contains(kind))
        .collect();

    let selection = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.auto_kinds.prompt"))
        .items(&items)
        .defaults(&defaults)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(());
    };

    let selected: Vec<OutputKind> = selection.into_iter().map(|i| OutputKind::ALL[i]).collect();

    if selected != config.settings.watch.auto_process_kinds {
        config.settings.watch.auto_process_kinds = selected;
        save_settings(&config.settings)?;
        println!("\n{}", style(t!("settings.saved")).green());
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

/// 寫入完成等待時間設定
fn show_stability_timeout_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!(
        "{}",
        style(t!("settings.stability_timeout.title")).cyan().bold()
    );

    let seconds: u64 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.stability_timeout.prompt"))
        .default(config.settings.watch.stability_timeout_secs)
        .validate_with(|value: &u64| {
            if *value > 0 {
                Ok(())
            } else {
                Err(t!("settings.positive_required").to_string())
            }
        })
        .interact_text_on(term)?;

    if seconds != config.settings.watch.stability_timeout_secs {
        config.settings.watch.stability_timeout_secs = seconds;
        save_settings(&config.settings)?;
        println!("\n{} {seconds}s", style(t!("settings.saved")).green());
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

/// 外部工具逾時設定
fn show_tool_timeout_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.tool_timeout.title")).cyan().bold());

    let seconds: u64 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.tool_timeout.prompt"))
        .default(config.settings.processing.tool_timeout_secs)
        .validate_with(|value: &u64| {
            if *value > 0 {
                Ok(())
            } else {
                Err(t!("settings.positive_required").to_string())
            }
        })
        .interact_text_on(term)?;

    if seconds != config.settings.processing.tool_timeout_secs {
        config.settings.processing.tool_timeout_secs = seconds;
        save_settings(&config.settings)?;
        println!("\n{} {seconds}s", style(t!("settings.saved")).green());
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let items: Vec<String> = Language::ALL.iter().map(ToString::to_string).collect();

    let default_index = Language::ALL
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = Language::ALL[selection];

    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_settings(&config.settings)?;
        println!(
            "\n{} {}",
            style(t!("settings.saved")).green(),
            selected_lang
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}
