use crate::error::{CoreError, CoreResult};
use serde::Deserialize;
use std::path::Path;

/// 找不到幀率時使用的保守預設值，只用來估算一幀的長度
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// 影片的時長與幀率，每次操作重新取得，不做快取
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration_seconds: f64,
    pub frame_rate: f64,
}

impl MediaInfo {
    /// 一幀的長度（秒）
    #[must_use]
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.frame_rate
    }

    /// 影片包含的幀數估計
    #[must_use]
    pub fn estimated_frames(&self) -> f64 {
        self.duration_seconds * self.frame_rate
    }

    /// 去掉最後一幀後的長度，可能小於等於 0
    #[must_use]
    pub fn duration_without_last_frame(&self) -> f64 {
        self.duration_seconds - self.frame_duration()
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// 解析 ffprobe `-print_format json -show_format -show_streams` 的輸出
pub fn parse_probe_output(path: &Path, stdout: &str, fallback_frame_rate: f64) -> CoreResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_str(stdout).map_err(|e| CoreError::Probe {
        path: path.to_path_buf(),
        cause: format!("無法解析 ffprobe 輸出: {e}"),
    })?;

    let video_stream = probe.streams.as_ref().and_then(|streams| {
        streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
    });

    // 影片長度優先從 format 取得，其次從視訊串流
    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| video_stream.and_then(|s| s.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| CoreError::Probe {
            path: path.to_path_buf(),
            cause: "無法取得影片長度".to_string(),
        })?;

    let frame_rate = video_stream
        .and_then(|s| s.r_frame_rate.as_deref())
        .and_then(parse_frame_rate)
        .unwrap_or(fallback_frame_rate);

    Ok(MediaInfo {
        duration_seconds,
        frame_rate,
    })
}

/// 解析幀率字串（例如 "30/1" 或 "30000/1001"）
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.trim().parse().ok()?;
        let den: f64 = den_str.trim().parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        rate.trim().parse().ok()?
    };

    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate_fraction() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("24/1").unwrap() - 24.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_decimal() {
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("60").unwrap() - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_invalid() {
        assert!(parse_frame_rate("invalid").is_none());
        assert!(parse_frame_rate("30/0").is_none());
        assert!(parse_frame_rate("0/0").is_none());
        assert!(parse_frame_rate("0").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio", "r_frame_rate": "0/0"},
                {"codec_type": "video", "r_frame_rate": "25/1", "duration": "9.0"}
            ],
            "format": {"duration": "10.000000"}
        }"#;
        let info = parse_probe_output(Path::new("a.mp4"), json, DEFAULT_FRAME_RATE).unwrap();
        assert!((info.duration_seconds - 10.0).abs() < 1e-9);
        assert!((info.frame_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_output_falls_back_to_default_frame_rate() {
        let json = r#"{"streams": [{"codec_type": "video"}], "format": {"duration": "4.5"}}"#;
        let info = parse_probe_output(Path::new("a.mp4"), json, DEFAULT_FRAME_RATE).unwrap();
        assert!((info.frame_rate - DEFAULT_FRAME_RATE).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_output_uses_stream_duration() {
        let json = r#"{"streams": [{"codec_type": "video", "r_frame_rate": "24/1", "duration": "3.25"}], "format": {}}"#;
        let info = parse_probe_output(Path::new("a.mp4"), json, DEFAULT_FRAME_RATE).unwrap();
        assert!((info.duration_seconds - 3.25).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_output_missing_duration() {
        let json = r#"{"streams": [], "format": {}}"#;
        let err = parse_probe_output(Path::new("a.mp4"), json, DEFAULT_FRAME_RATE).unwrap_err();
        assert!(matches!(err, CoreError::Probe { .. }));
    }

    #[test]
    fn test_parse_probe_output_garbage() {
        let err = parse_probe_output(Path::new("a.mp4"), "not json", DEFAULT_FRAME_RATE).unwrap_err();
        assert!(matches!(err, CoreError::Probe { .. }));
    }

    #[test]
    fn test_media_info_trim_target() {
        let info = MediaInfo {
            duration_seconds: 5.0,
            frame_rate: 30.0,
        };
        assert!((info.duration_without_last_frame() - 4.966_666).abs() < 1e-4);
    }
}
