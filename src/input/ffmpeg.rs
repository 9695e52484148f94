/// FFmpeg 媒体后端
/// FFmpeg media backend built on ez-ffmpeg, software decoding only
use super::backend::{MediaBackend, MediaSource};
use super::decode_filter::DecodeFilter;
use super::frame::RawFrame;
use super::source::{OpenRequest, SourceKind};
use crate::error::MediaError;
use crossbeam_channel::Receiver;
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::core::scheduler::ffmpeg_scheduler::Running;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, FfmpegScheduler, Input};
use tracing::{debug, info};

/// 统一输出 YUV420P, 过滤器只需处理一种像素格式
const PIXEL_FORMAT_FILTER: &str = "format=yuv420p";

/// ez-ffmpeg 后端
pub struct FfmpegBackend {
    frame_queue: usize,
}

impl FfmpegBackend {
    pub fn new(frame_queue: usize) -> Self {
        Self {
            frame_queue: frame_queue.max(1),
        }
    }

    /// 本地文件先探测视频轨道
    ///
    /// 网络流不单独探测 (探测本身没有超时, 会卡住解码线程), 没有视频时由
    /// 构建管线的错误识别; 摄像头按 dshow / v4l2 视频设备打开, 必然是视频。
    fn probe_video(request: &OpenRequest) -> Result<bool, MediaError> {
        if request.kind != SourceKind::File {
            return Ok(true);
        }
        match ez_ffmpeg::stream_info::find_video_stream_info(request.locator.as_str()) {
            Ok(info) => Ok(info.is_some()),
            Err(e) => Err(MediaError::Open(e.to_string())),
        }
    }
}

/// FFmpeg 找不到可供视频过滤器使用的输入流时的报错
const NO_VIDEO_MARKERS: [&str; 4] = [
    "matches no streams",
    "cannot find a matching stream",
    "does not contain any stream",
    "no video stream",
];

/// 构建管线失败: 输入中没有视频流归为 NoVideo, 其余视为打开失败
fn build_error(detail: String) -> MediaError {
    let lower = detail.to_lowercase();
    if NO_VIDEO_MARKERS.iter().any(|m| lower.contains(m)) {
        MediaError::NoVideo(detail)
    } else {
        MediaError::Open(detail)
    }
}

impl MediaBackend for FfmpegBackend {
    fn open(&self, request: &OpenRequest) -> Result<Box<dyn MediaSource>, MediaError> {
        if !Self::probe_video(request)? {
            return Ok(Box::new(FfmpegSource::empty()));
        }

        let (tx, rx) = crossbeam_channel::bounded(self.frame_queue);

        let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
        let pipe = pipe.filter("decode", Box::new(DecodeFilter::new(tx)));
        let out = create_null_output().add_frame_pipeline(pipe);

        let mut input = Input::new(request.locator.as_str());
        if let Some(format) = &request.format {
            input = input.set_format(format.as_str());
        }
        if !request.options.is_empty() {
            let opts: Vec<(String, String)> = request.options.iter().cloned().collect();
            input = input.set_input_opts(opts);
        }

        // 构建FFmpeg上下文 (此处真正建立连接)
        let ctx = FfmpegContext::builder()
            .input(input)
            .filter_desc(PIXEL_FORMAT_FILTER)
            .output(out)
            .build()
            .map_err(|e| build_error(format!("构建失败: {}", e)))?;

        let scheduler = ctx
            .start()
            .map_err(|e| MediaError::Other(format!("启动失败: {}", e)))?;
        info!("FFmpeg 软件解码启动成功");

        Ok(Box::new(FfmpegSource {
            frames: Some(rx),
            scheduler: Some(scheduler),
            has_video: true,
        }))
    }
}

/// 运行中的 FFmpeg 管线
///
/// Drop 时依次: 丢弃接收端 (解除过滤器阻塞) → 中止调度器 → 等待其结束。
pub struct FfmpegSource {
    frames: Option<Receiver<RawFrame>>,
    scheduler: Option<FfmpegScheduler<Running>>,
    has_video: bool,
}

impl FfmpegSource {
    fn empty() -> Self {
        Self {
            frames: None,
            scheduler: None,
            has_video: false,
        }
    }

    /// 管线已结束, 取回调度器的最终结果
    fn finish(&mut self) -> Result<(), MediaError> {
        self.frames = None;
        match self.scheduler.take() {
            Some(scheduler) => scheduler
                .wait()
                .map_err(|e| MediaError::Read(e.to_string())),
            None => Ok(()),
        }
    }
}

impl MediaSource for FfmpegSource {
    fn has_video(&self) -> bool {
        self.has_video
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, MediaError> {
        let Some(frames) = &self.frames else {
            return Ok(None);
        };
        match frames.recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(_) => {
                debug!("FFmpeg 管线结束");
                self.finish().map(|_| None)
            }
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.frames = None;
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.abort();
            if let Err(e) = scheduler.wait() {
                // 主动中止时 FFmpeg 通常会报错, 只记录
                debug!(error = %e, "FFmpeg 管线中止");
            }
        }
    }
}
