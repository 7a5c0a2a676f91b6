/// RTSP 播放器 - GStreamer appsink
///
/// playbin 负责拉流解码, appsink 每个样本写入槽位,
/// 窗口拉伸绘制并在左上角叠加文字
use anyhow::Context;
use clap::Parser;
use log::info;
use rtsp_viewer::cli::{init_logger, WindowArgs};
use rtsp_viewer::decode::gst::GstPlayer;
use rtsp_viewer::decode::{event_channel, Backend};
use rtsp_viewer::render::window_conf;
use rtsp_viewer::{FitMode, FrameSlot, Overlay, Viewer, ViewerOptions};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "RTSP播放器 (GStreamer appsink + 叠加文字)", long_about = None)]
struct Args {
    /// RTSP流地址
    #[arg(short, long, default_value = "rtsp://127.0.0.1:8554/test")]
    url: String,

    /// 叠加文字 (覆盖配置文件)
    #[arg(long)]
    overlay: Option<String>,

    #[command(flatten)]
    window: WindowArgs,
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let args = Args::parse();
    let config = args.window.resolve();
    config.log_summary();

    let slot = FrameSlot::new();
    let (tx, rx) = event_channel();
    let player = GstPlayer::with_sink(&args.url, slot.clone(), tx).context("创建播放器失败")?;
    player.play().context("开始播放失败")?;

    let text = args
        .overlay
        .or(config.overlay_text.clone())
        .unwrap_or_else(|| String::from("Overlay Text"));
    let options = ViewerOptions {
        url: args.url.clone(),
        backend: Backend::Sink,
        fit: FitMode::Stretch,
        overlay: Some(Overlay::new(text)),
        show_status: config.show_status,
        snapshot_dir: config.snapshot_dir.clone(),
    };
    let conf = window_conf(
        &args.window.title_or("RTSP Stream Viewer (appsink)"),
        config.window_width,
        config.window_height,
    );

    macroquad::Window::from_config(conf, async move {
        Viewer::new(options, slot, Box::new(player), rx).run().await;
    });

    info!("👋 退出");
    Ok(())
}
