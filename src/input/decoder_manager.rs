/// 解码器管理器 - 支持动态切换输入源
///
/// 运行在界面线程上, 同一时间只保留一个解码线程:
/// - `start`: 先停掉旧线程 (最多等待 `replace_timeout`), 再启动新线程
/// - `stop`:  只清除运行标志, 句柄由解码线程自己关闭 (最多等待 `stop_timeout`)
///
/// 停止是协作式的: 若解码线程卡在媒体库的阻塞读取中, 等待超时后该线程被分离,
/// 读取返回时它会自行关闭句柄并退出。超时只限制调用方的等待时间。
use super::backend::MediaBackend;
use super::decoder::Decoder;
use crate::config::EngineSettings;
use crate::error::StreamError;
use crate::events::{EngineEvent, StreamStatus};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 正在运行的解码线程
struct Worker {
    generation: usize,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    /// 解码线程退出时发送端被丢弃
    exited: Receiver<()>,
}

impl Worker {
    /// 等待线程退出, 返回是否在时限内退出
    fn join_within(self, timeout: Duration) -> bool {
        match self.exited.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) | Ok(()) => {
                if self.handle.join().is_err() {
                    error!(generation = self.generation, "解码线程 panic");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    generation = self.generation,
                    timeout_ms = timeout.as_millis() as u64,
                    "解码线程未在时限内退出, 分离该线程"
                );
                false
            }
        }
    }
}

/// 解码器管理器
pub struct DecoderManager {
    backend: Arc<dyn MediaBackend>,
    settings: EngineSettings,
    events: Sender<EngineEvent>,
    worker: Option<Worker>,
    generation: usize,
}

impl DecoderManager {
    /// 创建管理器, 返回界面端的事件接收器
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        settings: EngineSettings,
    ) -> (Self, Receiver<EngineEvent>) {
        let (events, rx) = crossbeam_channel::unbounded();
        let manager = Self {
            backend,
            settings,
            events,
            worker: None,
            generation: 0,
        };
        (manager, rx)
    }

    /// 当前解码线程代数
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// 是否有尚未结束的解码线程
    pub fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// 启动 (或替换) 解码线程
    pub fn start(&mut self, input: &str) {
        if let Some(worker) = self.worker.take() {
            info!(generation = worker.generation, "替换正在运行的解码线程");
            worker.running.store(false, Ordering::Release);
            worker.join_within(self.settings.replace_timeout);
        }

        self.generation += 1;
        let generation = self.generation;
        let running = Arc::new(AtomicBool::new(true));
        let (exit_guard, exited) = crossbeam_channel::bounded::<()>(0);

        let _ = self
            .events
            .send(EngineEvent::StatusChanged(StreamStatus::Connecting));

        let decoder = Decoder::new(
            input.trim().to_string(),
            generation,
            Arc::clone(&running),
            Arc::clone(&self.backend),
            self.settings.clone(),
            self.events.clone(),
        );

        let spawned = std::thread::Builder::new()
            .name(format!("decoder-{}", generation))
            .spawn(move || {
                let _exit_guard = exit_guard;
                decoder.run();
            });

        match spawned {
            Ok(handle) => {
                debug!(generation, "解码线程已启动");
                self.worker = Some(Worker {
                    generation,
                    running,
                    handle,
                    exited,
                });
            }
            Err(e) => {
                error!(error = %e, "无法创建解码线程");
                let _ = self.events.send(EngineEvent::ErrorOccurred(StreamError::Other {
                    detail: format!("failed to spawn decoder thread: {}", e),
                }));
            }
        }
    }

    /// 停止解码线程; 重复调用无副作用
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let was_running = worker.running.swap(false, Ordering::AcqRel);
        let generation = worker.generation;
        if worker.join_within(self.settings.stop_timeout) {
            debug!(generation, "解码线程已退出");
        }

        if was_running {
            info!(generation, "解码已停止");
            let _ = self.events.send(EngineEvent::StatusChanged(StreamStatus::Ready));
        }
    }
}

impl Drop for DecoderManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpenFailureKind;
    use crate::input::backend::testing::{ScriptedBackend, Step};
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    fn manager(backend: ScriptedBackend) -> (DecoderManager, Receiver<EngineEvent>) {
        DecoderManager::new(Arc::new(backend), EngineSettings::default())
    }

    /// 收集事件直到满足条件
    fn wait_for(
        rx: &Receiver<EngineEvent>,
        seen: &mut Vec<EngineEvent>,
        done: impl Fn(&[EngineEvent]) -> bool,
    ) {
        let deadline = Instant::now() + WAIT;
        while !done(seen) {
            let left = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(left) {
                Ok(event) => seen.push(event),
                Err(_) => panic!("timed out waiting for events, got {:?}", summary(seen)),
            }
        }
    }

    fn wait_until(cond: impl Fn() -> bool) {
        let deadline = Instant::now() + WAIT;
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn summary(events: &[EngineEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| match e {
                EngineEvent::FrameDecoded(_) => "Frame".to_string(),
                EngineEvent::StatusChanged(s) => s.to_string(),
                EngineEvent::ErrorOccurred(err) => format!("Error({})", err.user_message()),
            })
            .collect()
    }

    fn has_frame(events: &[EngineEvent]) -> bool {
        events
            .iter()
            .any(|e| matches!(e, EngineEvent::FrameDecoded(_)))
    }

    fn slow_frames() -> Vec<Step> {
        vec![Step::Frame, Step::Sleep(Duration::from_millis(5))]
    }

    #[test]
    fn test_local_file_event_order() {
        let (mut manager, rx) = manager(ScriptedBackend::endless(slow_frames()));
        manager.start("C:\\video\\test.mp4");

        let mut seen = Vec::new();
        wait_for(&rx, &mut seen, has_frame);
        manager.stop();
        seen.extend(rx.try_iter());

        let names = summary(&seen);
        assert_eq!(names[0], "Connecting");
        assert_eq!(names[1], "Streaming");
        assert_eq!(names[2], "Frame");
        assert_eq!(names.last().map(String::as_str), Some("Ready"));
        assert!(!names.iter().any(|n| n.starts_with("Error")));
        // Ready 之后没有帧
        let ready_pos = names.iter().position(|n| n == "Ready").unwrap();
        assert_eq!(ready_pos, names.len() - 1);
    }

    #[test]
    fn test_start_then_stop_leaves_ready() {
        let backend = ScriptedBackend::endless(slow_frames());
        let stats = backend.stats();
        let (mut manager, rx) = manager(backend);

        manager.start("clip.mp4");
        manager.stop();
        assert!(!manager.is_active());
        assert_eq!(stats.live(), 0);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events.last(),
            Some(&EngineEvent::StatusChanged(StreamStatus::Ready))
        );
        assert!(!events
            .iter()
            .any(|e| matches!(e, EngineEvent::ErrorOccurred(_))));

        // 第二次 stop 不产生任何事件
        manager.stop();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let (mut manager, rx) = manager(ScriptedBackend::new(vec![Step::Frame]));
        manager.stop();
        manager.stop();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_restart_keeps_single_worker() {
        let backend = ScriptedBackend::endless(slow_frames());
        let stats = backend.stats();
        let (mut manager, rx) = manager(backend);

        manager.start("first.mp4");
        let mut seen = Vec::new();
        wait_for(&rx, &mut seen, has_frame);

        manager.start("second.mp4");
        assert_eq!(manager.generation(), 2);
        wait_until(|| stats.opened() == 2);
        assert_eq!(stats.live(), 1);
        assert!(manager.is_active());

        // 第二个 Connecting 之前旧线程已退出, 之后的帧只可能来自新线程
        wait_for(&rx, &mut seen, |events| {
            let names = summary(events);
            let restart = names.iter().rposition(|n| n == "Connecting");
            restart.is_some_and(|i| i > 0 && names[i..].iter().any(|n| n == "Frame"))
        });
        let names = summary(&seen);
        let restart = names.iter().rposition(|n| n == "Connecting").unwrap();
        assert_eq!(names.iter().filter(|n| *n == "Connecting").count(), 2);
        assert_eq!(names[restart + 1], "Streaming");
        assert!(names[restart + 2..].iter().all(|n| n == "Frame"));
        assert!(!names.iter().any(|n| n == "Ready" || n.starts_with("Error")));

        manager.stop();
        assert_eq!(stats.live(), 0);
        let requests = stats.requests();
        assert_eq!(requests[1].locator, "second.mp4");
        assert_eq!(
            rx.try_iter().last(),
            Some(EngineEvent::StatusChanged(StreamStatus::Ready))
        );
    }

    #[test]
    fn test_worker_panic_reports_one_error() {
        let backend = ScriptedBackend::new(vec![Step::Frame, Step::Panic("demuxer crashed".into())]);
        let stats = backend.stats();
        let (mut manager, rx) = manager(backend);

        manager.start("clip.mp4");
        let mut seen = Vec::new();
        wait_for(&rx, &mut seen, |events| {
            events
                .iter()
                .any(|e| matches!(e, EngineEvent::ErrorOccurred(_)))
        });
        wait_until(|| !manager.is_active());
        seen.extend(rx.try_iter());

        let names = summary(&seen);
        assert_eq!(names[..3], ["Connecting", "Streaming", "Frame"]);
        let errors: Vec<_> = names.iter().filter(|n| n.starts_with("Error")).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("demuxer crashed"));
        assert_eq!(stats.live(), 0);
    }

    #[test]
    fn test_sources_close_on_decoder_threads() {
        let backend = ScriptedBackend::endless(slow_frames());
        let stats = backend.stats();
        let (mut manager, rx) = manager(backend);

        manager.start("a.mp4");
        let mut seen = Vec::new();
        wait_for(&rx, &mut seen, has_frame);
        manager.start("b.mp4");
        wait_until(|| stats.opened() == 2);
        manager.stop();

        let threads = stats.close_threads();
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].as_deref(), Some("decoder-1"));
        assert_eq!(threads[1].as_deref(), Some("decoder-2"));
    }

    #[test]
    fn test_missing_host_fails_with_open_failure() {
        let backend = ScriptedBackend::new(vec![Step::Frame]);
        let stats = backend.stats();
        let (mut manager, rx) = manager(backend);

        manager.start("rtsp://");
        let mut seen = Vec::new();
        wait_for(&rx, &mut seen, |events| {
            events
                .iter()
                .any(|e| matches!(e, EngineEvent::ErrorOccurred(_)))
        });

        let err = seen
            .iter()
            .find_map(|e| match e {
                EngineEvent::ErrorOccurred(err) => Some(err.clone()),
                _ => None,
            })
            .unwrap();
        assert!(matches!(
            err,
            StreamError::OpenFailure {
                kind: OpenFailureKind::InvalidUrl,
                ..
            }
        ));
        assert_eq!(stats.opened(), 0);
    }

    #[test]
    fn test_empty_stream_single_error() {
        let (mut manager, rx) = manager(ScriptedBackend::new(Vec::new()));
        manager.start("empty.mp4");

        let mut seen = Vec::new();
        wait_for(&rx, &mut seen, |events| {
            events
                .iter()
                .any(|e| matches!(e, EngineEvent::ErrorOccurred(_)))
        });
        wait_until(|| !manager.is_active());
        seen.extend(rx.try_iter());

        assert_eq!(summary(&seen), vec![
            "Connecting".to_string(),
            "Streaming".to_string(),
            "Error(No video data received from source)".to_string(),
        ]);
    }

    #[test]
    fn test_stop_during_slow_open_suppresses_error() {
        let backend = ScriptedBackend::failing_open("Connection refused")
            .with_open_delay(Duration::from_millis(50));
        let (mut manager, rx) = manager(backend);

        manager.start("rtsp://10.0.0.1/live");
        manager.stop();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(summary(&events), vec![
            "Connecting".to_string(),
            "Ready".to_string(),
        ]);
    }
}
