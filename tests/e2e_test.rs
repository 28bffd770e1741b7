//! 端對端測試 - 使用真正的 ffmpeg/ffprobe
//!
//! 系統未安裝 ffmpeg 時跳過

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use video_frame_editor::component::batch_processor::BatchCoordinator;
use video_frame_editor::config::ProcessingSettings;
use video_frame_editor::tools::{
    FfmpegToolkit, MediaToolkit, OutputKind, SequenceAllocator, VideoItem, check_tool,
};

fn ffmpeg_available() -> bool {
    check_tool("ffmpeg").is_ok() && check_tool("ffprobe").is_ok()
}

/// 以 lavfi 產生指定長度的測試影片
fn generate_video(path: &Path, seconds: f64, fps: u32) -> bool {
    Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=duration={seconds}:size=160x120:rate={fps}"))
        .args(["-c:v", "mpeg4", "-pix_fmt", "yuv420p"])
        .arg(path)
        .status()
        .is_ok_and(|status| status.success())
}

#[test]
fn test_real_ffmpeg_batch() {
    if !ffmpeg_available() {
        println!("跳過測試：找不到 ffmpeg/ffprobe");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let long_video = dir.path().join("sample.mp4");
    let short_video = dir.path().join("blink.mp4");
    assert!(generate_video(&long_video, 2.0, 25));
    assert!(generate_video(&short_video, 0.2, 24));

    let settings = ProcessingSettings::default();
    let toolkit = Arc::new(FfmpegToolkit::new(&settings));

    let info = toolkit.probe(&long_video).unwrap();
    assert!((info.duration_seconds - 2.0).abs() < 0.2);
    assert!((info.frame_rate - 25.0).abs() < 0.01);

    let coordinator = BatchCoordinator::new(toolkit.clone(), Arc::new(SequenceAllocator::new()), &settings);
    let items = vec![
        VideoItem::from_path(&long_video).unwrap(),
        VideoItem::from_path(&short_video).unwrap(),
    ];
    let kinds: BTreeSet<OutputKind> = OutputKind::ALL.into_iter().collect();

    let report = coordinator.run(&items, &kinds, |_, _, _| {}).unwrap();

    let frame = dir.path().join("last_frames").join("sample_last_1.jpg");
    let trimmed = dir.path().join("trimmed_videos").join("sample_trimmed_1.mp4");
    assert_eq!(report.outputs(OutputKind::LastFrame), vec![frame.clone()]);
    assert_eq!(report.outputs(OutputKind::Trimmed), vec![trimmed.clone()]);
    assert!(std::fs::metadata(&frame).unwrap().len() > 0);

    let trimmed_info = toolkit.probe(&trimmed).unwrap();
    assert!(trimmed_info.duration_seconds < info.duration_seconds);

    for kind in OutputKind::ALL {
        assert!(report.outcome(&items[1].path, kind).unwrap().is_skipped());
    }
}
