/// RTSP 播放器 - ez-ffmpeg 逐帧回调
///
/// 库内部完成拉流/解码/缩放, 每帧在回调里写入槽位,
/// 窗口按原尺寸画在左上角
use anyhow::Context;
use clap::Parser;
use log::info;
use rtsp_viewer::cli::{init_logger, WindowArgs};
use rtsp_viewer::decode::{event_channel, Backend, CallbackDecoder};
use rtsp_viewer::render::window_conf;
use rtsp_viewer::{FitMode, FrameSlot, Viewer, ViewerOptions};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "RTSP播放器 (逐帧回调)", long_about = None)]
struct Args {
    /// RTSP流地址
    #[arg(short, long, default_value = "rtsp://localhost:8554/mystream")]
    url: String,

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
    let decoder = CallbackDecoder::new(&args.url, &config);
    info!("🔧 过滤图: {}", decoder.filter_desc());
    let worker = decoder
        .spawn(slot.clone(), tx)
        .context("启动解码线程失败")?;

    let options = ViewerOptions {
        url: args.url.clone(),
        backend: Backend::Callback,
        fit: FitMode::Native,
        overlay: None,
        show_status: config.show_status,
        snapshot_dir: config.snapshot_dir.clone(),
    };
    let conf = window_conf(
        &args.window.title_or("RTSP Stream Viewer (callback)"),
        config.window_width,
        config.window_height,
    );

    macroquad::Window::from_config(conf, async move {
        Viewer::new(options, slot, Box::new(worker), rx).run().await;
    });

    info!("👋 退出");
    Ok(())
}
