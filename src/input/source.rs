//! 输入源识别与打开 (Source Opener)
//!
//! 一个输入框同时接受 RTSP 地址、本地摄像头和本地文件:
//! - `rtsp://...`          → RTSP 网络流 (TCP 传输 + 超时 + 接收缓冲)
//! - `0` / `video=...` / `/dev/video0` → 本地摄像头
//! - 其余                   → 本地文件路径或其他协议 URL

use super::backend::{MediaBackend, MediaSource};
use super::camera;
use crate::config::EngineSettings;
use crate::error::StreamError;
use tracing::{debug, info};
use url::Url;

pub const RTSP_SCHEME: &str = "rtsp://";
const INVALID_URL_MESSAGE: &str = "Invalid RTSP URL format";

/// 输入源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Rtsp,
    Device,
    File,
}

/// 交给媒体后端的打开请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub kind: SourceKind,
    pub locator: String,
    /// 强制输入格式 (dshow / v4l2 / avfoundation)
    pub format: Option<String>,
    pub options: Vec<(String, String)>,
}

/// 识别输入类型 (纯函数, 只看字符串本身)
pub fn classify(input: &str) -> SourceKind {
    let input = input.trim();
    if input.starts_with(RTSP_SCHEME) {
        SourceKind::Rtsp
    } else if camera::is_device_input(input) {
        SourceKind::Device
    } else {
        SourceKind::File
    }
}

/// 检查输入格式
///
/// 非 RTSP 输入一律放行, 文件是否存在由后端打开时判断。
pub fn validate(input: &str) -> Result<(), StreamError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(StreamError::invalid_url("empty input"));
    }
    if classify(input) != SourceKind::Rtsp {
        return Ok(());
    }

    let parsed = Url::parse(input)
        .map_err(|e| StreamError::invalid_url(format!("{}: {}", INVALID_URL_MESSAGE, e)))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(StreamError::invalid_url(format!(
            "{}: missing hostname in {:?}",
            INVALID_URL_MESSAGE, input
        ))),
    }
}

/// 从 RTSP 地址中提取用户名和密码, 没有则返回空串
pub fn extract_credentials(url: &str) -> (String, String) {
    match Url::parse(url.trim()) {
        Ok(parsed) if !parsed.username().is_empty() => (
            parsed.username().to_string(),
            parsed.password().unwrap_or_default().to_string(),
        ),
        _ => (String::new(), String::new()),
    }
}

/// 去掉密码, 用于日志输出
pub fn redact(input: &str) -> String {
    match Url::parse(input) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("***")).is_ok() {
                parsed.to_string()
            } else {
                input.to_string()
            }
        }
        _ => input.to_string(),
    }
}

/// 根据输入构建打开请求
pub fn build_request(input: &str, settings: &EngineSettings) -> Result<OpenRequest, StreamError> {
    validate(input)?;
    let input = input.trim();

    let request = match classify(input) {
        SourceKind::Rtsp => OpenRequest {
            kind: SourceKind::Rtsp,
            locator: input.to_string(),
            format: None,
            options: settings.rtsp.to_input_opts(),
        },
        SourceKind::Device => {
            let device = camera::device_input(input)?;
            OpenRequest {
                kind: SourceKind::Device,
                locator: device.locator,
                format: Some(device.format.to_string()),
                options: Vec::new(),
            }
        }
        SourceKind::File => OpenRequest {
            kind: SourceKind::File,
            locator: input.to_string(),
            format: None,
            options: Vec::new(),
        },
    };
    Ok(request)
}

/// 打开输入源, 并确认其中有可解码的视频轨道
///
/// 必须在解码线程内调用: 返回的句柄不能跨线程移动。
pub fn open_source(
    backend: &dyn MediaBackend,
    input: &str,
    settings: &EngineSettings,
) -> Result<Box<dyn MediaSource>, StreamError> {
    let request = build_request(input, settings)?;
    info!(
        kind = ?request.kind,
        locator = %redact(&request.locator),
        format = ?request.format,
        "打开输入源"
    );

    let source = backend.open(&request)?;
    if !source.has_video() {
        debug!("输入源没有视频轨道, 关闭");
        return Err(StreamError::NoVideoTrack {
            detail: "Container has no video stream.".to_string(),
        });
    }
    Ok(source)
}
