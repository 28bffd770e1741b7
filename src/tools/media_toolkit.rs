use crate::config::ProcessingSettings;
use crate::error::{CoreError, CoreResult};
use crate::tools::ffprobe_info::{MediaInfo, parse_probe_output};
use crate::tools::process_runner::{ProcessError, run_with_timeout};
use log::{debug, warn};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// 檢查工具是否存在時的逾時
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// 外部媒體工具的抽象
///
/// 核心流程只透過這個 trait 呼叫 ffprobe/ffmpeg，測試時可以換成假的實作。
pub trait MediaToolkit: Send + Sync {
    /// 確認處理所需的工具可以執行
    fn check_available(&self) -> CoreResult<()>;

    /// 取得影片時長與幀率，不會修改任何檔案
    fn probe(&self, path: &Path) -> CoreResult<MediaInfo>;

    /// 在 `offset_seconds` 處輸出單張高品質靜態圖片
    fn export_frame(&self, input: &Path, offset_seconds: f64, output: &Path) -> CoreResult<()>;

    /// 以串流複製方式輸出前 `end_seconds` 秒，不重新編碼
    fn copy_trim(&self, input: &Path, end_seconds: f64, output: &Path) -> CoreResult<()>;
}

/// 使用系統上的 ffmpeg / ffprobe
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
    fallback_frame_rate: f64,
    jpeg_quality: u8,
}

impl FfmpegToolkit {
    #[must_use]
    pub fn new(settings: &ProcessingSettings) -> Self {
        Self {
            ffmpeg_path: settings.ffmpeg_path.clone(),
            ffprobe_path: settings.ffprobe_path.clone(),
            timeout: settings.tool_timeout(),
            fallback_frame_rate: settings.fallback_frame_rate,
            jpeg_quality: settings.jpeg_quality,
        }
    }

    #[must_use]
    pub fn probe_command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path);
        cmd
    }

    #[must_use]
    pub fn export_frame_command(&self, input: &Path, offset_seconds: f64, output: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"])
            .args(["-ss", &format!("{offset_seconds:.6}")])
            .arg("-i")
            .arg(input)
            .args(["-frames:v", "1", "-update", "1", "-an", "-sn", "-dn"])
            .args(["-q:v", &self.jpeg_quality.to_string()])
            .arg(output);
        cmd
    }

    #[must_use]
    pub fn copy_trim_command(&self, input: &Path, end_seconds: f64, output: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"])
            .arg("-i")
            .arg(input)
            .args(["-t", &format!("{end_seconds:.6}")])
            .args(["-c", "copy"])
            .args(["-avoid_negative_ts", "make_zero"])
            .arg(output);
        cmd
    }

    fn run_processing(&self, mut command: Command, input: &Path) -> CoreResult<()> {
        run_with_timeout(&mut command, self.timeout).map_err(|e| CoreError::Processing {
            path: input.to_path_buf(),
            cause: e.to_string(),
        })?;
        Ok(())
    }
}

impl MediaToolkit for FfmpegToolkit {
    fn check_available(&self) -> CoreResult<()> {
        check_tool(&self.ffmpeg_path)?;
        check_tool(&self.ffprobe_path)
    }

    fn probe(&self, path: &Path) -> CoreResult<MediaInfo> {
        let mut command = self.probe_command(path);
        let output = run_with_timeout(&mut command, self.timeout).map_err(|e| CoreError::Probe {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let info = parse_probe_output(path, &stdout, self.fallback_frame_rate)?;
        debug!(
            "影片資訊 {}: {:.3}s @ {:.3} fps",
            path.display(),
            info.duration_seconds,
            info.frame_rate
        );
        Ok(info)
    }

    fn export_frame(&self, input: &Path, offset_seconds: f64, output: &Path) -> CoreResult<()> {
        let command = self.export_frame_command(input, offset_seconds, output);
        self.run_processing(command, input)
    }

    fn copy_trim(&self, input: &Path, end_seconds: f64, output: &Path) -> CoreResult<()> {
        let command = self.copy_trim_command(input, end_seconds, output);
        self.run_processing(command, input)
    }
}

/// 以 `-version` 確認工具可以執行
pub fn check_tool(tool: &str) -> CoreResult<()> {
    let mut command = Command::new(tool);
    command.arg("-version");
    match run_with_timeout(&mut command, VERSION_CHECK_TIMEOUT) {
        Ok(_) => {
            debug!("找到外部工具: {tool}");
            Ok(())
        }
        Err(e) => Err(CoreError::ToolUnavailable {
            tool: tool.to_string(),
            cause: match e {
                ProcessError::Spawn(io) => io.to_string(),
                other => other.to_string(),
            },
        }),
    }
}

/// 啟動時檢查 ffmpeg/ffprobe，缺少時只回傳警告訊息
#[must_use]
pub fn check_tools(settings: &ProcessingSettings) -> Vec<String> {
    [&settings.ffmpeg_path, &settings.ffprobe_path]
        .into_iter()
        .filter_map(|tool| check_tool(tool).err())
        .map(|e| {
            warn!("{e}");
            e.to_string()
        })
        .collect()
}
