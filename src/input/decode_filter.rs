/// FFmpeg解码过滤器模块
/// FFmpeg decode filter: copies YUV420P frames out of the pipeline
use super::frame::{RawFrame, MAX_DIMENSION};
use crossbeam_channel::Sender;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use tracing::{debug, trace};

/// 缺少参考帧 / 无效比特流
const SEVERE_DECODE_ERRORS: i32 = 0x03;

/// FFmpeg解码过滤器: 每个视频帧 → RawFrame → 解码线程
///
/// 运行在 ez-ffmpeg 的调度线程上, 通过有界通道把帧交给解码线程。
/// 接收端被丢弃后返回错误, 让管线尽快结束。
pub struct DecodeFilter {
    frames: Option<Sender<RawFrame>>,
    pub total_frames: usize,
    pub flagged_frames: usize,
}

impl DecodeFilter {
    pub fn new(frames: Sender<RawFrame>) -> Self {
        Self {
            frames: Some(frames),
            total_frames: 0,
            flagged_frames: 0,
        }
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        debug!("解码过滤器启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        let Some(frames) = &self.frames else {
            return Err("viewer closed".to_string());
        };

        self.total_frames += 1;
        let raw = unsafe { copy_frame(&frame) };
        if raw.corrupt {
            self.flagged_frames += 1;
            trace!(frame = self.total_frames, "解码器标记为损坏帧");
        }

        // 有界通道: 解码线程处理不过来时在这里阻塞
        if frames.send(raw).is_err() {
            return Err("viewer closed".to_string());
        }
        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        // 关闭发送端, 解码线程借此得知输入结束
        self.frames = None;
        debug!(
            total = self.total_frames,
            flagged = self.flagged_frames,
            "解码过滤器退出"
        );
    }
}

/// 拷贝 YUV420P 平面
///
/// 只做最基本的指针检查; 分辨率、步长的完整校验由 `RawFrame::to_rgb` 负责,
/// 不合格的帧在解码线程中被丢弃。
unsafe fn copy_frame(frame: &Frame) -> RawFrame {
    let mut raw = RawFrame::default();

    if frame.as_ptr().is_null() || frame.is_empty() {
        raw.corrupt = true;
        return raw;
    }

    let av = &*frame.as_ptr();
    raw.corrupt = frame.is_corrupt() || av.decode_error_flags & SEVERE_DECODE_ERRORS != 0;
    if av.width <= 0 || av.height <= 0 {
        return raw;
    }
    raw.width = av.width as u32;
    raw.height = av.height as u32;
    if raw.width > MAX_DIMENSION || raw.height > MAX_DIMENSION {
        return raw;
    }

    let chroma_rows = (av.height as usize).div_ceil(2);
    let rows = [av.height as usize, chroma_rows, chroma_rows];
    for plane in 0..3 {
        let ptr = av.data[plane];
        let stride = av.linesize[plane];
        if ptr.is_null() || stride <= 0 {
            raw.corrupt = true;
            return raw;
        }
        let stride = stride as usize;
        raw.strides[plane] = stride;
        raw.planes[plane] = std::slice::from_raw_parts(ptr, stride * rows[plane]).to_vec();
    }
    raw
}
