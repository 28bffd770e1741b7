//! 功能元件模組
//!
//! 每個子模組實現一個獨立的功能，包含主要邏輯和專用工具

pub mod auto_processor;
pub mod batch_processor;
mod directory_prompt;
pub mod observer;

pub use auto_processor::{AutoProcessor, ConsoleObserver};
pub use batch_processor::BatchProcessor;
pub use observer::{LogObserver, ProcessingObserver};
