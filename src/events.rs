//! 解码引擎 → 界面 的事件

use crate::error::StreamError;
use image::RgbImage;
use std::fmt;

/// 连接状态, 只有最新值有意义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Connecting,
    Streaming,
    Ready,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StreamStatus::Connecting => "Connecting",
            StreamStatus::Streaming => "Streaming",
            StreamStatus::Ready => "Ready",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// 一帧 RGB24 图像, 所有权随事件转移给界面
    FrameDecoded(RgbImage),
    StatusChanged(StreamStatus),
    ErrorOccurred(StreamError),
}
