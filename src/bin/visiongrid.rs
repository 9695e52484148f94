/// VisionGrid 查看器入口
///
/// 直接运行: cargo run --bin visiongrid --release -- -i rtsp://host/stream
use clap::Parser;
use macroquad::prelude::*;
use mimalloc::MiMalloc;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::info;
use tracing_subscriber::EnvFilter;
use visiongrid::renderer::Viewer;
use visiongrid::{DecoderManager, FfmpegBackend, ViewerConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// RTSP / 本地视频 / 摄像头 查看器
#[derive(Parser, Debug)]
#[command(author, version, about = "RTSP / 本地视频 / 摄像头 查看器", long_about = None)]
struct Args {
    /// 输入源 (rtsp://..., 视频文件路径, 摄像头编号或 video=设备名)
    #[arg(short, long)]
    input: Option<String>,

    /// 配置文件 (JSON, 不存在时使用默认值)
    #[arg(short, long, default_value = "visiongrid.json")]
    config: PathBuf,

    /// 启动后立即连接
    #[arg(long)]
    autostart: bool,

    /// 日志过滤 (RUST_LOG 优先)
    #[arg(long, default_value = "info")]
    log: String,
}

struct Startup {
    args: Args,
    config: ViewerConfig,
}

/// 解析命令行、初始化日志并加载配置 (只执行一次)
fn startup() -> &'static Startup {
    static STARTUP: OnceLock<Startup> = OnceLock::new();
    STARTUP.get_or_init(|| {
        let args = Args::parse();

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .init();

        let config = ViewerConfig::load_or_default(&args.config);
        Startup { args, config }
    })
}

fn window_conf() -> Conf {
    let config = &startup().config;
    Conf {
        window_title: "VisionGrid | RTSP Viewer".to_owned(),
        window_width: config.window_width,
        window_height: config.window_height,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let Startup { args, config } = startup();

    let backend = Arc::new(FfmpegBackend::new(config.frame_queue));
    let (manager, events) = DecoderManager::new(backend, config.engine_settings());

    let source = args
        .input
        .clone()
        .unwrap_or_else(|| config.default_source.clone());
    let mut viewer = Viewer::new(manager, events, source);

    if args.autostart || config.autostart {
        viewer.start();
    }

    info!("🎨 查看器启动");
    prevent_quit();

    loop {
        viewer.update();
        viewer.draw();
        viewer.draw_egui();

        if is_quit_requested() {
            break;
        }
        next_frame().await;
    }

    viewer.shutdown();
    info!("查看器退出");
}
