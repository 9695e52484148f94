//! VisionGrid: RTSP / 本地视频 / 摄像头 查看器
//!
//! 两个线程:
//! 1. 解码线程: FFmpeg 打开输入源 → 解码 → RGB帧 → 通道
//! 2. 主线程:   macroquad 事件循环, 每帧取出事件并渲染
pub mod config; // 查看器配置
pub mod error; // 错误分类
pub mod events; // 解码引擎事件
pub mod input; // 视频输入系统
pub mod renderer; // macroquad + egui 界面

pub use crate::config::{EngineSettings, ViewerConfig};
pub use crate::error::{MediaError, OpenFailureKind, StreamError};
pub use crate::events::{EngineEvent, StreamStatus};
pub use crate::input::{DecoderManager, FfmpegBackend};
