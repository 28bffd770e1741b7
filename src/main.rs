use anyhow::Result;
use console::{Term, style};
use log::{info, warn};
use video_frame_editor::config::Config;
use video_frame_editor::init;
use video_frame_editor::menu::show_main_menu;
use video_frame_editor::signal::setup_shutdown_signal;
use video_frame_editor::tools::check_tools;

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal();

    // Load config and set locale
    let mut config = Config::new()?;
    rust_i18n::set_locale(config.settings.language.as_str());

    let missing_tools = check_tools(&config.settings.processing);
    for message in &missing_tools {
        eprintln!("{} {message}", style("警告:").yellow().bold());
    }
    if !missing_tools.is_empty() {
        eprintln!(
            "{}",
            style("找不到 ffmpeg/ffprobe，處理功能將無法使用，請確認已安裝並加入 PATH").yellow()
        );
        std::thread::sleep(std::time::Duration::from_secs(2));
    }

    loop {
        match show_main_menu(&term, &shutdown_signal, &mut config) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style("Bye!").green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                eprintln!("{} {}", style("Error:").red().bold(), e);
                break;
            }
        }
    }

    Ok(())
}
