/// RTSP 播放器 - FFmpeg 手写解码循环
///
/// 解码线程: 打开输入 → 最佳视频流 → 解码 → RGBA → 最新帧槽位
/// 渲染线程: macroquad 每帧取最新一帧拉伸铺满窗口
///
/// 运行: cargo run --bin rtsp-ffmpeg --release -- --url rtsp://localhost:8554/mystream
use anyhow::Context;
use clap::Parser;
use log::info;
use rtsp_viewer::cli::{init_logger, WindowArgs};
use rtsp_viewer::decode::{event_channel, Backend, FfmpegDecoder};
use rtsp_viewer::render::window_conf;
use rtsp_viewer::{FitMode, FrameSlot, Viewer, ViewerOptions};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "RTSP播放器 (FFmpeg解码循环)", long_about = None)]
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
    let worker = FfmpegDecoder::new(&args.url, &config)
        .spawn(slot.clone(), tx)
        .context("启动解码线程失败")?;

    let options = ViewerOptions {
        url: args.url.clone(),
        backend: Backend::Ffmpeg,
        fit: FitMode::Stretch,
        overlay: None,
        show_status: config.show_status,
        snapshot_dir: config.snapshot_dir.clone(),
    };
    let conf = window_conf(
        &args.window.title_or("RTSP Stream Viewer (FFmpeg)"),
        config.window_width,
        config.window_height,
    );

    macroquad::Window::from_config(conf, async move {
        Viewer::new(options, slot, Box::new(worker), rx).run().await;
    });

    info!("👋 退出");
    Ok(())
}
