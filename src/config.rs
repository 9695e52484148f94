//! 查看器配置 - 通过JSON文件调整参数
//!
//! 配置文件可选; 缺失时使用默认值,程序不会写入配置文件。

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// RTSP 传输参数
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtspOptions {
    pub transport: String, // 传输方式 (tcp 可靠传输)
    pub timeout_us: u64,   // 连接/读超时 (微秒)
    pub buffer_size: u64,  // 接收缓冲区 (字节)
}

impl Default for RtspOptions {
    fn default() -> Self {
        Self {
            transport: "tcp".to_string(),
            timeout_us: 5_000_000,
            buffer_size: 1_024_000,
        }
    }
}

impl RtspOptions {
    /// 转换为 FFmpeg 输入参数
    pub fn to_input_opts(&self) -> Vec<(String, String)> {
        vec![
            ("rtsp_transport".to_string(), self.transport.clone()),
            ("timeout".to_string(), self.timeout_us.to_string()),
            ("buffer_size".to_string(), self.buffer_size.to_string()),
        ]
    }
}

/// 查看器参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    // === 输入 ===
    pub default_source: String, // 输入框默认内容
    pub autostart: bool,        // 启动后立即连接

    // === 解码 ===
    pub rtsp: RtspOptions,
    pub replace_timeout_ms: u64, // 替换旧解码线程时的等待上限
    pub stop_timeout_ms: u64,    // 停止时的等待上限
    pub frame_queue: usize,      // FFmpeg → 解码线程 的帧队列长度

    // === 窗口 ===
    pub window_width: i32,
    pub window_height: i32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_source: "rtsp://wowzaec2demo.streamlock.net/vod/mp4:BigBuckBunny_115k.mov"
                .to_string(),
            autostart: false,

            rtsp: RtspOptions::default(),
            replace_timeout_ms: 500,
            stop_timeout_ms: 2000,
            frame_queue: 4,

            window_width: 1024,
            window_height: 768,
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("配置文件解析失败")
    }

    /// 从JSON文件加载配置
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::from_json(&json)
    }

    /// 加载配置, 失败时回退到默认值
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "配置文件不存在, 使用默认配置");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!(path = %path.display(), "配置已加载");
                config
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "配置无效, 使用默认值");
                Self::default()
            }
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            rtsp: self.rtsp.clone(),
            replace_timeout: Duration::from_millis(self.replace_timeout_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
            frame_queue: self.frame_queue.max(1),
        }
    }
}

/// 解码引擎运行参数
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub rtsp: RtspOptions,
    pub replace_timeout: Duration,
    pub stop_timeout: Duration,
    pub frame_queue: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        ViewerConfig::default().engine_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = ViewerConfig::default();
        assert_eq!(config.rtsp.transport, "tcp");
        assert_eq!(config.rtsp.timeout_us, 5_000_000);
        assert_eq!(config.rtsp.buffer_size, 1_024_000);

        let settings = config.engine_settings();
        assert_eq!(settings.replace_timeout, Duration::from_millis(500));
        assert_eq!(settings.stop_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ViewerConfig::from_json(r#"{ "autostart": true, "rtsp": { "timeout_us": 1000 } }"#)
                .unwrap();
        assert!(config.autostart);
        assert_eq!(config.rtsp.timeout_us, 1000);
        assert_eq!(config.rtsp.transport, "tcp");
        assert_eq!(config.stop_timeout_ms, 2000);
    }

    #[test]
    fn test_zero_queue_is_clamped() {
        let config = ViewerConfig {
            frame_queue: 0,
            ..Default::default()
        };
        assert_eq!(config.engine_settings().frame_queue, 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "default_source": "C:\\video\\test.mp4" }}"#).unwrap();

        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.default_source, "C:\\video\\test.mp4");
    }

    #[test]
    fn test_malformed_or_missing_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(ViewerConfig::load(file.path()).is_err());
        assert_eq!(ViewerConfig::load_or_default(file.path()), ViewerConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("visiongrid.json");
        assert_eq!(ViewerConfig::load_or_default(&missing), ViewerConfig::default());
        assert!(!missing.exists());
    }

    #[test]
    fn test_rtsp_input_opts() {
        let opts = RtspOptions::default().to_input_opts();
        assert!(opts.contains(&("rtsp_transport".to_string(), "tcp".to_string())));
        assert!(opts.contains(&("timeout".to_string(), "5000000".to_string())));
        assert!(opts.contains(&("buffer_size".to_string(), "1024000".to_string())));
    }
}
