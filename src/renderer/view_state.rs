//! 界面状态 (不依赖 macroquad, 便于测试)
//!
//! 按钮文字、状态栏、错误对话框都由这里的状态决定,
//! 渲染层只负责把它画出来并执行返回的命令。

use crate::error::StreamError;
use crate::events::{EngineEvent, StreamStatus};
use crate::input::{validate, VideoDevice};

pub const START_LABEL: &str = "Start Stream";
pub const STOP_LABEL: &str = "Stop Stream";
pub const IDLE_PLACEHOLDER: &str = "No Stream Connected";
pub const FAILED_PLACEHOLDER: &str = "Connection Failed";

/// 界面发给解码器管理器的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(String),
    Stop,
}

/// 错误对话框
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDialog {
    pub message: String,
    pub detail: Option<String>,
    pub show_details: bool,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub input: String,
    status: String,
    /// 按钮处于 "Stop Stream" 状态
    active: bool,
    /// 已发出启动命令, 尚未收到 Streaming / 错误
    connecting: bool,
    has_video: bool,
    placeholder: &'static str,
    frames: u64,
    pub error: Option<ErrorDialog>,

    // 设备列表
    pub devices: Vec<VideoDevice>,
    pub devices_loaded: bool,
}

impl ViewState {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            status: "Idle".to_string(),
            active: false,
            connecting: false,
            has_video: false,
            placeholder: IDLE_PLACEHOLDER,
            frames: 0,
            error: None,
            devices: Vec::new(),
            devices_loaded: false,
        }
    }

    pub fn button_label(&self) -> &'static str {
        if self.active {
            STOP_LABEL
        } else {
            START_LABEL
        }
    }

    pub fn status_line(&self) -> String {
        format!("Status: {}", self.status)
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    pub fn has_video(&self) -> bool {
        self.has_video
    }

    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 点击 开始/停止 按钮
    ///
    /// 发出启动命令后按钮立即变为 "Stop Stream", 连接中的重复点击只会停止。
    pub fn toggle(&mut self) -> Option<Command> {
        if self.active {
            self.active = false;
            self.connecting = false;
            self.status = StreamStatus::Ready.to_string();
            return Some(Command::Stop);
        }

        let input = self.input.trim().to_string();
        if let Err(err) = validate(&input) {
            self.show_error(err.user_message(), None);
            return None;
        }

        self.connecting = true;
        self.active = true;
        self.frames = 0;
        self.placeholder = IDLE_PLACEHOLDER;
        self.status = "Connecting...".to_string();
        Some(Command::Start(input))
    }

    /// 处理解码引擎事件
    pub fn apply(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::FrameDecoded(_) => {
                self.has_video = true;
                self.frames += 1;
            }
            EngineEvent::StatusChanged(status) => {
                self.status = status.to_string();
                match status {
                    StreamStatus::Ready => {
                        self.connecting = false;
                        self.active = false;
                    }
                    StreamStatus::Streaming => self.connecting = false,
                    StreamStatus::Connecting => {}
                }
            }
            EngineEvent::ErrorOccurred(err) => self.on_error(err),
        }
    }

    fn on_error(&mut self, err: &StreamError) {
        self.connecting = false;
        self.active = false;
        self.has_video = false;
        self.placeholder = FAILED_PLACEHOLDER;
        let detail = err.detail();
        let detail = (!detail.is_empty()).then(|| detail.to_string());
        self.show_error(err.user_message(), detail);
    }

    fn show_error(&mut self, message: String, detail: Option<String>) {
        self.status = format!("Error - {}", message);
        self.error = Some(ErrorDialog {
            message,
            detail,
            show_details: false,
        });
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// 选择摄像头后填入输入框
    pub fn select_device(&mut self, device: &VideoDevice) {
        self.input = if cfg!(windows) {
            format!("video={}", device.name)
        } else {
            device.index.to_string()
        };
    }
}
