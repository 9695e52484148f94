/// 视频输入系统 (Video Input System)
///
/// 独立工作线程,负责视频流打开、解码与像素格式转换
/// - Source:  输入识别 (RTSP / 摄像头 / 本地文件) 与格式校验
/// - Backend: 媒体库接口, FFmpeg 实现 (ez-ffmpeg, CPU软件解码)
/// - Decoder: 解码线程, 拉帧 → RGB → 发送给界面
/// - DecoderManager: 解码器管理器 (启动/停止/热切换)
pub mod backend;
pub mod camera;
pub mod decode_filter;
pub mod decoder;
pub mod decoder_manager;
pub mod ffmpeg;
pub mod frame;
pub mod source;

pub use backend::{MediaBackend, MediaSource};
pub use camera::{list_video_devices, VideoDevice};
pub use decode_filter::DecodeFilter;
pub use decoder::Decoder;
pub use decoder_manager::DecoderManager;
pub use ffmpeg::FfmpegBackend;
pub use frame::{FrameError, RawFrame};
pub use source::{classify, extract_credentials, validate, OpenRequest, SourceKind};
