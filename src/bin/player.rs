/// RTSP 播放器 - GStreamer playbin 自带窗口
///
/// 只监听总线: 媒体状态 / 播放位置 / 元数据 / 错误
use anyhow::Context;
use clap::Parser;
use log::info;
use rtsp_viewer::cli::init_logger;
use rtsp_viewer::decode::gst::{log_event, GstPlayer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "RTSP播放器 (GStreamer playbin)", long_about = None)]
struct Args {
    /// RTSP流地址
    #[arg(short, long, default_value = "rtsp://127.0.0.1:8554/test")]
    url: String,
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let args = Args::parse();

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("设置 Ctrl+C 处理失败")?;

    let mut player = GstPlayer::new(&args.url).context("创建播放器失败")?;
    player.play().context("开始播放失败")?;

    while running.load(Ordering::SeqCst) {
        if let Some(event) = player.next_event(Duration::from_millis(200)) {
            log_event(&event);
            if event.is_terminal() {
                break;
            }
        }
    }

    player.stop();
    info!("👋 退出");
    Ok(())
}
