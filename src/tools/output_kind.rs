use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// 靜態圖片輸出的副檔名
pub const LAST_FRAME_EXTENSION: &str = ".jpg";

static REGEX_LAST_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_last_([0-9]+)(\.[^.]*)?$").expect("Invalid regex"));

static REGEX_TRIMMED_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_trimmed_([0-9]+)(\.[^.]*)?$").expect("Invalid regex"));

/// 輸出種類，各自對應一個輸出資料夾與檔名格式 `<stem>_<suffix>_<N><ext>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputKind {
    /// 擷取最後一幀為 JPEG
    LastFrame,
    /// 去掉最後一幀的影片（串流複製）
    Trimmed,
}

impl OutputKind {
    pub const ALL: [Self; 2] = [Self::LastFrame, Self::Trimmed];

    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::LastFrame => "last_frames",
            Self::Trimmed => "trimmed_videos",
        }
    }

    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::LastFrame => "last",
            Self::Trimmed => "trimmed",
        }
    }

    #[must_use]
    pub fn output_dir(self, source_dir: &Path) -> PathBuf {
        source_dir.join(self.dir_name())
    }

    /// 輸出檔的副檔名（含前導點）；剪輯輸出沿用原始容器
    #[must_use]
    pub fn output_extension(self, source_extension: &str) -> String {
        match self {
            Self::LastFrame => LAST_FRAME_EXTENSION.to_string(),
            Self::Trimmed => source_extension.to_string(),
        }
    }

    #[must_use]
    pub fn file_name(self, stem: &str, sequence: u64, source_extension: &str) -> String {
        format!(
            "{stem}_{}_{sequence}{}",
            self.suffix(),
            self.output_extension(source_extension)
        )
    }

    /// 從輸出檔名取出序號，不符合格式時回傳 None
    ///
    /// 超出 u64 的序號視為 `u64::MAX`，不會被當成不存在。
    #[must_use]
    pub fn parse_sequence(self, file_name: &str) -> Option<u64> {
        let regex = match self {
            Self::LastFrame => &REGEX_LAST_SEQUENCE,
            Self::Trimmed => &REGEX_TRIMMED_SEQUENCE,
        };
        regex
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().parse().unwrap_or(u64::MAX))
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastFrame => write!(f, "擷取最後一幀"),
            Self::Trimmed => write!(f, "剪去最後一幀"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            OutputKind::LastFrame.file_name("clip", 3, ".mov"),
            "clip_last_3.jpg"
        );
        assert_eq!(
            OutputKind::Trimmed.file_name("clip", 12, ".mov"),
            "clip_trimmed_12.mov"
        );
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(OutputKind::LastFrame.parse_sequence("a_last_7.jpg"), Some(7));
        assert_eq!(OutputKind::LastFrame.parse_sequence("a_last_7"), Some(7));
        assert_eq!(
            OutputKind::LastFrame.parse_sequence("x_last_3_last_15.jpg"),
            Some(15)
        );
        assert_eq!(OutputKind::Trimmed.parse_sequence("b_trimmed_4.mkv"), Some(4));
    }

    #[test]
    fn test_parse_sequence_saturates_oversized_numbers() {
        assert_eq!(
            OutputKind::LastFrame.parse_sequence("a_last_18446744073709551615.jpg"),
            Some(u64::MAX)
        );
        assert_eq!(
            OutputKind::Trimmed.parse_sequence("a_trimmed_99999999999999999999999.mp4"),
            Some(u64::MAX)
        );
        assert_eq!(OutputKind::LastFrame.parse_sequence("a_last_\u{0663}.jpg"), None);
    }

    #[test]
    fn test_parse_sequence_rejects_other_patterns() {
        assert_eq!(OutputKind::LastFrame.parse_sequence("a_trimmed_7.mp4"), None);
        assert_eq!(OutputKind::LastFrame.parse_sequence("a_last_x.jpg"), None);
        assert_eq!(OutputKind::LastFrame.parse_sequence("a_last_7.tmp.jpg"), None);
        assert_eq!(OutputKind::Trimmed.parse_sequence("notes.txt"), None);
    }
}
