mod ffprobe_info;
mod media_toolkit;
mod output_kind;
mod path_validator;
mod process_runner;
mod sequence_allocator;
mod video_scanner;

pub use ffprobe_info::{DEFAULT_FRAME_RATE, MediaInfo, parse_frame_rate, parse_probe_output};
pub use media_toolkit::{FfmpegToolkit, MediaToolkit, check_tool, check_tools};
pub use output_kind::{LAST_FRAME_EXTENSION, OutputKind};
pub use path_validator::validate_directory_exists;
pub use process_runner::{ProcessError, ProcessOutput, run_with_timeout};
pub use sequence_allocator::{Reservation, SequenceAllocator, scan_max_sequence};
pub use video_scanner::{VideoItem, list_videos};
