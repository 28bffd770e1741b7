use crate::config::FileTypeTable;
use crate::error::CoreResult;
use crate::tools::validate_directory_exists;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// 一部待處理的影片，以絕對路徑識別
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoItem {
    pub path: PathBuf,
    pub stem: String,
    /// 含前導點的原始副檔名，沒有副檔名時為空字串
    pub extension: String,
    pub discovered_at: SystemTime,
}

impl VideoItem {
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let path = std::path::absolute(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Ok(Self {
            path,
            stem,
            extension,
            discovered_at: SystemTime::now(),
        })
    }

    /// 來源資料夾，輸出資料夾建立在它底下
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.stem.clone())
    }
}

/// 列出資料夾中（不含子資料夾）支援格式的影片，依檔名排序
///
/// 每次呼叫都回傳完整的新清單，呼叫端直接取代舊清單。
pub fn list_videos(directory: &Path, file_type_table: &FileTypeTable) -> CoreResult<Vec<VideoItem>> {
    validate_directory_exists(directory)?;

    let mut paths: Vec<PathBuf> = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| file_type_table.is_video_file(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    paths
        .iter()
        .map(|path| VideoItem::from_path(path))
        .collect()
}
