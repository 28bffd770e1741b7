//! 輸出序號分配
//!
//! 序號不保存在記憶體中，每次都從輸出資料夾現有的檔名重新掃描，
//! 外部新增或刪除檔案也不會造成偏差。掃描與保留在同一把鎖內完成，
//! 並在釋放鎖之前建立空白佔位檔，下一次掃描就會看到它而跳過這個號碼。

use crate::error::{CoreError, CoreResult};
use crate::tools::OutputKind;
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

static SHARED_ALLOCATOR: LazyLock<Arc<SequenceAllocator>> =
    LazyLock::new(|| Arc::new(SequenceAllocator::new()));

type LockKey = (PathBuf, OutputKind);

/// 依 (輸出資料夾, 輸出種類) 分配不重複的序號
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl SequenceAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 行程內共用的分配器，手動批次與自動處理必須使用同一個
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_ALLOCATOR)
    }

    /// 分配下一個序號，並在最終輸出路徑建立佔位檔
    ///
    /// 呼叫端寫入真正的輸出後呼叫 [`Reservation::commit`]；
    /// 若 `Reservation` 未提交就被丟棄，佔位檔會被刪除。
    pub fn allocate(
        &self,
        output_dir: &Path,
        kind: OutputKind,
        stem: &str,
        source_extension: &str,
    ) -> CoreResult<Reservation> {
        fs::create_dir_all(output_dir)?;
        let key_dir = output_dir.canonicalize()?;

        let lock = self.lock_for(&key_dir, kind);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let sequence = scan_max_sequence(&key_dir, kind)?
            .checked_add(1)
            .ok_or_else(|| CoreError::SequenceExhausted {
                dir: output_dir.to_path_buf(),
                kind,
            })?;
        let path = output_dir.join(kind.file_name(stem, sequence, source_extension));
        create_placeholder(&path)?;

        debug!("保留序號 {sequence} ({kind:?}): {}", path.display());

        Ok(Reservation {
            path,
            sequence,
            committed: false,
        })
    }

    fn lock_for(&self, dir: &Path, kind: OutputKind) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry((dir.to_path_buf(), kind))
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// 掃描資料夾中符合輸出格式的最大序號，沒有任何符合的檔案時為 0
pub fn scan_max_sequence(dir: &Path, kind: OutputKind) -> CoreResult<u64> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let max = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|name| kind.parse_sequence(name))
        })
        .max()
        .unwrap_or(0);

    Ok(max)
}

/// 以 create_new 建立空白佔位檔，檔案已存在時視為名稱衝突
fn create_placeholder(path: &Path) -> CoreResult<()> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(CoreError::NameCollision(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// 已保留的輸出路徑
///
/// 未提交就被丟棄時會刪除佔位檔（或寫到一半的輸出），
/// 避免留下空檔案。
#[derive(Debug)]
#[must_use]
pub struct Reservation {
    path: PathBuf,
    sequence: u64,
    committed: bool,
}

impl Reservation {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// 輸出已寫入，保留檔案
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        self.path.clone()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("已移除佔位檔: {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("無法移除佔位檔 {}: {e}", self.path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_directory_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("last_frames");
        let allocator = SequenceAllocator::new();

        let reservation = allocator
            .allocate(&output_dir, OutputKind::LastFrame, "clip", ".mp4")
            .unwrap();

        assert_eq!(reservation.sequence(), 1);
        assert_eq!(reservation.path(), output_dir.join("clip_last_1.jpg"));
        assert!(reservation.path().exists());
        assert_eq!(fs::metadata(reservation.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_existing_max_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("other_last_7.jpg"), b"x").unwrap();
        fs::write(dir.path().join("other_last_2.jpg"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("video_trimmed_40.mp4"), b"x").unwrap();

        let allocator = SequenceAllocator::new();
        let reservation = allocator
            .allocate(dir.path(), OutputKind::LastFrame, "clip", ".mp4")
            .unwrap();
        assert_eq!(reservation.sequence(), 8);
    }

    #[test]
    fn test_kinds_are_counted_independently() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a_last_3.jpg"), b"x").unwrap();

        let allocator = SequenceAllocator::new();
        let trimmed = allocator
            .allocate(dir.path(), OutputKind::Trimmed, "a", ".mkv")
            .unwrap();
        assert_eq!(trimmed.sequence(), 1);
        assert_eq!(trimmed.path(), dir.path().join("a_trimmed_1.mkv"));
    }

    #[test]
    fn test_concurrent_allocations_are_unique_and_gapless() {
        let dir = tempfile::tempdir().unwrap();
        let allocator = SequenceAllocator::new();
        const REQUESTS: u64 = 32;

        let mut sequences: Vec<u64> = thread::scope(|scope| {
            let handles: Vec<_> = (0..REQUESTS)
                .map(|i| {
                    let allocator = &allocator;
                    let output_dir = dir.path();
                    scope.spawn(move || {
                        allocator
                            .allocate(output_dir, OutputKind::LastFrame, &format!("v{i}"), ".mp4")
                            .unwrap()
                            .commit();
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            fs::read_dir(dir.path())
                .unwrap()
                .filter_map(|e| e.ok())
                .filter_map(|e| {
                    OutputKind::LastFrame.parse_sequence(e.file_name().to_str().unwrap())
                })
                .collect()
        });

        sequences.sort_unstable();
        assert_eq!(sequences, (1..=REQUESTS).collect::<Vec<_>>());
    }

    #[test]
    fn test_dropped_reservation_removes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let allocator = SequenceAllocator::new();

        let reservation = allocator
            .allocate(dir.path(), OutputKind::LastFrame, "clip", ".mp4")
            .unwrap();
        let path = reservation.path().to_path_buf();
        drop(reservation);

        assert!(!path.exists());
        let next = allocator
            .allocate(dir.path(), OutputKind::LastFrame, "clip", ".mp4")
            .unwrap();
        assert_eq!(next.sequence(), 1);
    }

    #[test]
    fn test_committed_reservation_advances_next_allocation() {
        let dir = tempfile::tempdir().unwrap();
        let allocator = SequenceAllocator::new();

        let first = allocator
            .allocate(dir.path(), OutputKind::Trimmed, "clip", ".mov")
            .unwrap();
        fs::write(first.path(), b"video").unwrap();
        let kept = first.commit();
        assert!(kept.exists());

        let second = allocator
            .allocate(dir.path(), OutputKind::Trimmed, "clip", ".mov")
            .unwrap();
        assert_eq!(second.sequence(), 2);
    }

    #[test]
    fn test_existing_target_is_name_collision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip_last_1.jpg");
        fs::write(&path, b"precious").unwrap();

        let err = create_placeholder(&path).unwrap_err();
        assert!(matches!(err, CoreError::NameCollision(_)));
        assert_eq!(fs::read(&path).unwrap(), b"precious");
    }

    #[test]
    fn test_exhausted_sequence_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let taken = format!("x_last_{}.jpg", u64::MAX);
        fs::write(dir.path().join(&taken), b"x").unwrap();
        let allocator = SequenceAllocator::new();

        for stem in ["clip", "other"] {
            let err = allocator
                .allocate(dir.path(), OutputKind::LastFrame, stem, ".mp4")
                .unwrap_err();
            assert!(matches!(
                err,
                CoreError::SequenceExhausted {
                    kind: OutputKind::LastFrame,
                    ..
                }
            ));
        }
        assert_eq!(sorted_entries(dir.path()), vec![taken]);
    }

    #[test]
    fn test_oversized_sequence_blocks_allocation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x_trimmed_123456789012345678901234567890.mp4"), b"x").unwrap();

        let err = SequenceAllocator::new()
            .allocate(dir.path(), OutputKind::Trimmed, "clip", ".mp4")
            .unwrap_err();
        assert!(matches!(err, CoreError::SequenceExhausted { .. }));
    }

    fn sorted_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_scan_missing_directory_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            scan_max_sequence(&dir.path().join("nope"), OutputKind::LastFrame).unwrap(),
            0
        );
    }
}
