/// 媒体后端接口
/// Media backend seam: opening a source and pulling decoded frames
use super::frame::RawFrame;
use super::source::OpenRequest;
use crate::error::MediaError;

/// 媒体库 (解封装 + 解码) 的抽象
pub trait MediaBackend: Send + Sync + 'static {
    /// 打开输入源。只应在解码线程内调用。
    fn open(&self, request: &OpenRequest) -> Result<Box<dyn MediaSource>, MediaError>;
}

/// 已打开的输入源
///
/// 故意不要求 `Send`: 句柄由打开它的解码线程独占, Drop 即关闭。
pub trait MediaSource {
    /// 是否存在可解码的视频轨道
    fn has_video(&self) -> bool;

    /// 阻塞读取下一帧; `Ok(None)` 表示输入结束
    fn next_frame(&mut self) -> Result<Option<RawFrame>, MediaError>;
}
