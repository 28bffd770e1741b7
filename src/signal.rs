use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 註冊 Ctrl-C 處理器，回傳共用的中斷旗標
///
/// 無法註冊時只記錄警告，旗標仍可使用但不會被設定。
#[must_use]
pub fn setup_shutdown_signal() -> Arc<AtomicBool> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    if let Err(e) = ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        eprintln!("\n收到中斷信號，正在停止監看並完成進行中的處理...");
    }) {
        warn!("無法設定 Ctrl-C 處理器: {e}");
    }

    shutdown_signal
}

/// 開始新的操作前清除上一次的中斷信號
///
/// Ctrl-C 只中斷當下的操作，回到選單後不應影響之後的批次。
pub fn reset_shutdown_signal(shutdown_signal: &AtomicBool) {
    if shutdown_signal.swap(false, Ordering::SeqCst) {
        debug!("已清除前一次操作的中斷信號");
    }
}
