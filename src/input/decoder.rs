/// 解码线程 (Decode/Dispatch worker)
///
/// 打开输入源 → 循环拉帧 → 转 RGB → 发送给界面。
/// 输入源句柄只存在于本线程的栈上, 任何退出路径都在本线程关闭它。
use super::backend::MediaBackend;
use super::source::{open_source, redact};
use crate::config::EngineSettings;
use crate::error::StreamError;
use crate::events::{EngineEvent, StreamStatus};
use crossbeam_channel::Sender;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

/// 单次解码任务
pub struct Decoder {
    input: String,
    generation: usize,
    running: Arc<AtomicBool>,
    backend: Arc<dyn MediaBackend>,
    settings: EngineSettings,
    events: Sender<EngineEvent>,
}

/// 解码循环为何结束
enum Exit {
    /// 输入结束或收到停止请求
    Finished,
    /// 界面端已关闭接收通道
    ConsumerGone,
}

impl Decoder {
    pub fn new(
        input: String,
        generation: usize,
        running: Arc<AtomicBool>,
        backend: Arc<dyn MediaBackend>,
        settings: EngineSettings,
        events: Sender<EngineEvent>,
    ) -> Self {
        Self {
            input,
            generation,
            running,
            backend,
            settings,
            events,
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 已请求停止的解码线程不再发出任何事件
    fn emit(&self, event: EngineEvent) -> bool {
        if !self.is_running() {
            return false;
        }
        self.events.send(event).is_ok()
    }

    /// 运行解码 (阻塞当前线程直到结束)
    pub fn run(self) {
        let span = info_span!("decoder", generation = self.generation);
        let _guard = span.enter();
        info!(input = %redact(&self.input), "解码线程启动");

        let mut delivered = 0u64;
        // 媒体库内部 panic 也按一次失败上报; 句柄在栈展开时于本线程关闭
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.decode(&mut delivered)))
            .unwrap_or_else(|payload| {
                Err(StreamError::Other {
                    detail: panic_message(payload.as_ref()),
                })
            });
        match outcome {
            Ok(Exit::Finished) => info!(frames = delivered, "解码线程正常退出"),
            Ok(Exit::ConsumerGone) => warn!(frames = delivered, "界面已关闭, 解码线程退出"),
            Err(err) => {
                if self.is_running() {
                    error!(
                        message = %err.user_message(),
                        detail = %err.detail(),
                        "解码失败"
                    );
                    self.emit(EngineEvent::ErrorOccurred(err));
                } else {
                    debug!(error = %err, "已停止, 忽略错误");
                }
            }
        }
    }

    fn decode(&self, delivered: &mut u64) -> Result<Exit, StreamError> {
        let mut source = open_source(self.backend.as_ref(), &self.input, &self.settings)?;

        if !self.emit(EngineEvent::StatusChanged(StreamStatus::Streaming)) {
            return Ok(if self.is_running() {
                Exit::ConsumerGone
            } else {
                Exit::Finished
            });
        }

        let mut skipped = 0u64;
        while self.is_running() {
            let Some(raw) = source.next_frame()? else {
                break;
            };

            let image = match raw.to_rgb() {
                Ok(image) => image,
                Err(e) => {
                    skipped += 1;
                    debug!(error = %e, skipped, "跳过无法转换的帧");
                    continue;
                }
            };

            if !self.emit(EngineEvent::FrameDecoded(image)) {
                if self.is_running() {
                    return Ok(Exit::ConsumerGone);
                }
                break;
            }
            *delivered += 1;
        }

        if *delivered == 0 && self.is_running() {
            return Err(StreamError::EmptyStream);
        }
        Ok(Exit::Finished)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("decoder panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("decoder panicked: {}", message)
    } else {
        "decoder panicked".to_string()
    }
}
