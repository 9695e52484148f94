//! 摄像头输入模块
//!
//! 处理本地摄像头输入,支持 DirectShow(Windows) / AVFoundation(macOS) / V4L2(Linux)

use crate::error::StreamError;
use tracing::{info, warn};

/// DirectShow 设备前缀
pub const DSHOW_PREFIX: &str = "video=";
/// V4L2 设备节点前缀
pub const V4L2_PREFIX: &str = "/dev/video";

/// 视频设备信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub name: String,
    pub index: usize,
}

/// 摄像头输入: FFmpeg 输入地址 + 输入格式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    pub locator: String,
    pub format: &'static str,
}

/// 纯数字或带已知设备前缀的输入视为摄像头
pub fn is_device_input(input: &str) -> bool {
    let input = input.trim();
    (!input.is_empty() && input.chars().all(|c| c.is_ascii_digit()))
        || input.starts_with(DSHOW_PREFIX)
        || input.starts_with(V4L2_PREFIX)
}

/// 把用户输入转换为平台相关的设备地址
pub fn device_input(input: &str) -> Result<DeviceInput, StreamError> {
    let input = input.trim();

    if input.starts_with(DSHOW_PREFIX) {
        return Ok(DeviceInput {
            locator: input.to_string(),
            format: "dshow",
        });
    }
    if input.starts_with(V4L2_PREFIX) {
        return Ok(DeviceInput {
            locator: input.to_string(),
            format: "v4l2",
        });
    }

    let index: usize = input
        .parse()
        .map_err(|e| StreamError::invalid_url(format!("camera index {:?}: {}", input, e)))?;
    Ok(DeviceInput {
        locator: format_camera_url(index),
        format: platform_format(),
    })
}

/// 格式化摄像头URL - 根据平台选择
fn format_camera_url(index: usize) -> String {
    #[cfg(target_os = "windows")]
    {
        // dshow 按名称打开设备, 找不到名称时退回到索引
        let name = list_video_devices()
            .into_iter()
            .find(|d| d.index == index)
            .map(|d| d.name)
            .unwrap_or_else(|| index.to_string());
        format!("{}{}", DSHOW_PREFIX, name)
    }
    #[cfg(target_os = "macos")]
    {
        format!("{}", index)
    }
    #[cfg(target_os = "linux")]
    {
        format!("{}{}", V4L2_PREFIX, index)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        format!("{}", index)
    }
}

fn platform_format() -> &'static str {
    #[cfg(target_os = "windows")]
    let format = "dshow"; // DirectShow

    #[cfg(target_os = "macos")]
    let format = "avfoundation"; // AVFoundation

    #[cfg(target_os = "linux")]
    let format = "v4l2"; // Video4Linux2

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    let format = "video4linux2";

    format
}

/// 获取可用的视频设备列表
pub fn list_video_devices() -> Vec<VideoDevice> {
    match ez_ffmpeg::device::get_input_video_devices() {
        Ok(devices) => {
            info!(count = devices.len(), "找到视频设备");
            devices
                .into_iter()
                .enumerate()
                .map(|(index, name)| VideoDevice { name, index })
                .collect()
        }
        Err(e) => {
            warn!(error = %e, "获取设备列表失败");
            Vec::new()
        }
    }
}
