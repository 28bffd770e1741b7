use log::{debug, warn};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// 檢查子程序是否結束的間隔
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 外部程序執行結果
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("無法啟動程序: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("執行超過 {}s，已終止", .0.as_secs())]
    Timeout(Duration),

    #[error("結束代碼 {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },
}

/// 執行外部命令並等待完成，超過 `timeout` 會強制終止
///
/// stdout/stderr 由獨立執行緒讀取，避免管線緩衝區塞滿造成死結。
pub fn run_with_timeout(
    command: &mut Command,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    debug!("執行命令: {command:?}");

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout_reader = spawn_pipe_reader(child.stdout.take());
    let stderr_reader = spawn_pipe_reader(child.stderr.take());

    let status = match wait_with_deadline(&mut child, timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            warn!("命令逾時 ({}s)，終止程序 [{}]", timeout.as_secs(), child.id());
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_reader.join();
            let _ = stderr_reader.join();
            return Err(ProcessError::Timeout(timeout));
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProcessError::Spawn(e));
        }
    };

    let output = ProcessOutput {
        status,
        stdout: stdout_reader.join().unwrap_or_default(),
        stderr: stderr_reader.join().unwrap_or_default(),
    };

    if !output.status.success() {
        return Err(ProcessError::NonZeroExit {
            code: output.status.code(),
            stderr: output.stderr_text(),
        });
    }

    Ok(output)
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn spawn_pipe_reader<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_successful_command_captures_stdout() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo hello"]);
        let output = run_with_timeout(&mut command, Duration::from_secs(5)).unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn test_non_zero_exit_reports_stderr() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo broken >&2; exit 3"]);
        let err = run_with_timeout(&mut command, Duration::from_secs(5)).unwrap_err();
        match err {
            ProcessError::NonZeroExit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_timeout_kills_process() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let started = Instant::now();
        let err = run_with_timeout(&mut command, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ProcessError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let mut command = Command::new("definitely-not-a-real-binary-7f3a");
        let err = run_with_timeout(&mut command, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ProcessError::Spawn(_)));
    }
}
