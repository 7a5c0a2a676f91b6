/// 解码系统 (Decode System)
///
/// 独立工作线程,负责RTSP拉流解码,把最新帧写入 FrameSlot
/// - ffmpeg:   手写解码循环 (打开输入 → 最佳视频流 → 解码器 → RGBA转换)
/// - callback: ez-ffmpeg 帧管线, 每帧回调写入槽位
/// - gst:      GStreamer playbin (自带窗口播放 / appsink 回调)
pub mod callback;
pub mod ffmpeg;
#[cfg(feature = "gst")]
pub mod gst;

pub use callback::CallbackDecoder;
pub use ffmpeg::FfmpegDecoder;

use crate::error::Result;
use crate::frame::VideoFrame;
use crate::slot::FrameSlot;
use crate::stats::FpsCounter;
use crossbeam_channel::{Receiver, Sender};
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// 解码后端
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Ffmpeg,
    Callback,
    Sink,
    Player,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Ffmpeg => "FFmpeg 手写解码循环",
            Backend::Callback => "ez-ffmpeg 逐帧回调",
            Backend::Sink => "GStreamer appsink",
            Backend::Player => "GStreamer playbin",
        }
    }
}

/// 解码线程 → 渲染线程 的状态消息
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeEvent {
    Opened { codec: String, width: u32, height: u32 },
    Failed(String),
    Finished,
}

/// 状态消息通道 (容量小, 满了直接丢弃)
pub fn event_channel() -> (Sender<DecodeEvent>, Receiver<DecodeEvent>) {
    crossbeam_channel::bounded(16)
}

/// 解码输出: 写槽位 + 解码帧率统计 + 状态消息
pub struct FrameOutput {
    slot: FrameSlot,
    events: Sender<DecodeEvent>,
    fps: FpsCounter,
    frames: u64,
}

impl FrameOutput {
    pub fn new(slot: FrameSlot, events: Sender<DecodeEvent>) -> Self {
        Self {
            slot,
            events,
            fps: FpsCounter::new(),
            frames: 0,
        }
    }

    pub fn push(&mut self, frame: VideoFrame) {
        if self.frames == 0 {
            info!("🖼️ 首帧: {}x{}", frame.width, frame.height);
        }
        self.frames += 1;
        self.slot.publish(frame);

        // 每秒打印一次解码统计
        if let Some(fps) = self.fps.tick() {
            let stats = self.slot.stats();
            info!(
                "📺 解码统计: 实际{:.1}fps | 总帧{} | 渲染前被覆盖{}",
                fps, stats.published, stats.dropped
            );
        }
    }

    /// 使用try_send避免阻塞解码线程
    pub fn notify(&self, event: DecodeEvent) {
        let _ = self.events.try_send(event);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn decode_fps(&self) -> f64 {
        self.fps.fps()
    }
}

/// 正在运行的视频源 (解码线程或播放器)
pub trait StreamSource {
    /// 渲染线程每帧调用一次, 处理源的消息
    fn poll(&mut self) {}
    fn stop(&mut self);
    fn is_finished(&self) -> bool;
}

/// 后台解码线程句柄
///
/// `stop()` 或 drop 时清除运行标志并等待线程退出。
pub struct DecodeWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    name: String,
}

impl DecodeWorker {
    pub fn spawn<F>(name: &str, body: F) -> Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(flag))?;
        info!("🎬 {} 线程启动", name);

        Ok(Self {
            running,
            handle: Some(handle),
            name: name.to_string(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// 线程是否已经退出 (例如打开流失败)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("❌ {} 线程panic", self.name);
            } else {
                info!("✅ {} 线程退出", self.name);
            }
        }
    }
}

impl StreamSource for DecodeWorker {
    fn stop(&mut self) {
        DecodeWorker::stop(self);
    }

    fn is_finished(&self) -> bool {
        DecodeWorker::is_finished(self)
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
