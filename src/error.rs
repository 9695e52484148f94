//! 错误分类 (Error taxonomy)
//!
//! `StreamError` 是唯一会送到界面上的错误类型,每次失败的连接尝试最多一个。
//! `MediaError` 是媒体后端返回的原始错误,由 [`classify_media_error`] 归类。

use thiserror::Error;

const NO_VIDEO_MESSAGE: &str = "No video data received from source";

/// 打开失败的细分类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailureKind {
    /// 凭据被拒绝 (401 / unauthorized)
    Authentication,
    /// 网络不可达、路径错误、格式不支持等
    Connection,
    /// 输入本身不合法 (空串、RTSP地址缺少主机名)
    InvalidUrl,
}

/// 流错误: 用户提示 + 原始技术细节
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("open failure ({kind:?}): {detail}")]
    OpenFailure {
        kind: OpenFailureKind,
        detail: String,
    },
    #[error("no video track: {detail}")]
    NoVideoTrack { detail: String },
    #[error("stream ended without producing a frame")]
    EmptyStream,
    #[error("{detail}")]
    Other { detail: String },
}

impl StreamError {
    pub fn invalid_url(detail: impl Into<String>) -> Self {
        StreamError::OpenFailure {
            kind: OpenFailureKind::InvalidUrl,
            detail: detail.into(),
        }
    }

    /// 简短的、非技术性的提示
    pub fn user_message(&self) -> String {
        match self {
            StreamError::OpenFailure { kind, .. } => match kind {
                OpenFailureKind::Authentication => "Authentication failed. Check credentials",
                OpenFailureKind::Connection => "Connection failed. Check source and network",
                OpenFailureKind::InvalidUrl => "Invalid RTSP URL format",
            }
            .to_string(),
            StreamError::NoVideoTrack { .. } | StreamError::EmptyStream => {
                NO_VIDEO_MESSAGE.to_string()
            }
            StreamError::Other { detail } => format!("Error: {}", detail),
        }
    }

    /// 原样保留的技术细节 (错误对话框 "Show Details")
    pub fn detail(&self) -> &str {
        match self {
            StreamError::OpenFailure { detail, .. }
            | StreamError::NoVideoTrack { detail }
            | StreamError::Other { detail } => detail,
            StreamError::EmptyStream => "Decode loop ended with 0 frames.",
        }
    }
}

/// 媒体后端错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// 打开输入失败 (连接/探测/构建管线)
    #[error("open: {0}")]
    Open(String),
    /// 读取或解码过程中失败
    #[error("read: {0}")]
    Read(String),
    /// 输入可以打开, 但没有可解码的视频轨道
    #[error("no video stream: {0}")]
    NoVideo(String),
    #[error("{0}")]
    Other(String),
}

/// 按错误文本归类: 含 "401"/"unauthorized" 视为认证失败,其余为连接失败
pub fn classify_failure_text(text: &str) -> OpenFailureKind {
    let lower = text.to_lowercase();
    if lower.contains("401") || lower.contains("unauthorized") {
        OpenFailureKind::Authentication
    } else {
        OpenFailureKind::Connection
    }
}

pub fn classify_media_error(err: MediaError) -> StreamError {
    match err {
        MediaError::Open(detail) | MediaError::Read(detail) => StreamError::OpenFailure {
            kind: classify_failure_text(&detail),
            detail,
        },
        MediaError::NoVideo(detail) => StreamError::NoVideoTrack { detail },
        MediaError::Other(detail) => StreamError::Other { detail },
    }
}

impl From<MediaError> for StreamError {
    fn from(err: MediaError) -> Self {
        classify_media_error(err)
    }
}
