//! GStreamer 播放器
//!
//! 两种用法:
//! - 播放器模式: playbin 使用自己的视频输出窗口, 程序只监听总线消息
//!   (媒体状态/播放位置/元数据) 并打印
//! - 接收器模式: playbin 的 video-sink 换成 appsink, 每个样本回调里
//!   转换成 RGBA 帧写入 FrameSlot, 由我们的窗口绘制

use super::{DecodeEvent, FrameOutput, StreamSource};
use crate::error::{Result, ViewerError};
use crate::frame::VideoFrame;
use crate::slot::FrameSlot;
use crossbeam_channel::Sender;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use std::sync::Mutex;
use std::time::{Duration, Instant};

static GST_INIT: Lazy<std::result::Result<(), String>> =
    Lazy::new(|| gst::init().map_err(|e| e.to_string()));

pub fn ensure_initialized() -> Result<()> {
    match &*GST_INIT {
        Ok(()) => Ok(()),
        Err(e) => Err(ViewerError::Pipeline(format!("GStreamer 初始化失败: {}", e))),
    }
}

/// 播放位置查询间隔
pub const POSITION_INTERVAL: Duration = Duration::from_secs(1);

/// 媒体状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaStatus {
    Loading,
    Loaded,
    Buffering(i32),
    Buffered,
    Playing,
    EndOfMedia,
}

/// 播放器事件
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    StatusChanged(MediaStatus),
    PositionChanged(u64), // 毫秒
    MetadataChanged(Vec<(String, String)>),
    Error {
        source: String,
        message: String,
        debug: Option<String>,
    },
}

impl PlayerEvent {
    /// 播放结束 (流结束或出错)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlayerEvent::StatusChanged(MediaStatus::EndOfMedia) | PlayerEvent::Error { .. }
        )
    }
}

/// 管线状态切换 → 媒体状态
pub fn status_for_transition(old: gst::State, new: gst::State) -> Option<MediaStatus> {
    match (old, new) {
        (gst::State::Null, gst::State::Ready) => Some(MediaStatus::Loading),
        (gst::State::Ready, gst::State::Paused) => Some(MediaStatus::Loaded),
        (_, gst::State::Playing) => Some(MediaStatus::Playing),
        _ => None,
    }
}

pub fn status_for_buffering(percent: i32) -> MediaStatus {
    if percent < 100 {
        MediaStatus::Buffering(percent)
    } else {
        MediaStatus::Buffered
    }
}

/// 只在位置变化时上报
#[derive(Debug, Default)]
pub struct PositionTracker {
    last: Option<u64>,
}

impl PositionTracker {
    pub fn update(&mut self, position_ms: u64) -> Option<u64> {
        if self.last == Some(position_ms) {
            return None;
        }
        self.last = Some(position_ms);
        Some(position_ms)
    }
}

fn tag_pairs(tags: &gst::TagListRef) -> Vec<(String, String)> {
    tags.iter()
        .map(|(name, value)| {
            let text = value
                .serialize()
                .map(|s| s.to_string())
                .unwrap_or_else(|_| format!("{:?}", value));
            (name.to_string(), text)
        })
        .collect()
}

/// 总线消息 → 播放器事件
fn translate(msg: &gst::Message, pipeline: &gst::Element) -> Option<PlayerEvent> {
    use gst::MessageView;

    match msg.view() {
        MessageView::StateChanged(change) => {
            // 只关心整条管线的状态
            if msg.src() != Some(pipeline.upcast_ref::<gst::Object>()) {
                return None;
            }
            status_for_transition(change.old(), change.current()).map(PlayerEvent::StatusChanged)
        }
        MessageView::Buffering(buffering) => Some(PlayerEvent::StatusChanged(
            status_for_buffering(buffering.percent()),
        )),
        MessageView::Eos(_) => Some(PlayerEvent::StatusChanged(MediaStatus::EndOfMedia)),
        MessageView::Tag(tag) => Some(PlayerEvent::MetadataChanged(tag_pairs(&tag.tags()))),
        MessageView::Error(err) => Some(PlayerEvent::Error {
            source: msg
                .src()
                .map(|s| s.path_string().to_string())
                .unwrap_or_else(|| String::from("unknown")),
            message: err.error().to_string(),
            debug: err.debug().map(|d| d.to_string()),
        }),
        _ => None,
    }
}

/// 跳过不关心的消息, 直到有一条能转换成事件或总线为空
fn next_translated<M, E>(
    mut pop: impl FnMut() -> Option<M>,
    mut translate: impl FnMut(&M) -> Option<E>,
) -> Option<E> {
    while let Some(msg) = pop() {
        if let Some(event) = translate(&msg) {
            return Some(event);
        }
    }
    None
}

/// 打印播放器事件
pub fn log_event(event: &PlayerEvent) {
    match event {
        PlayerEvent::StatusChanged(status) => info!("📡 媒体状态变化: {:?}", status),
        PlayerEvent::PositionChanged(ms) => info!("⏱️ 播放位置: {}ms", ms),
        PlayerEvent::MetadataChanged(pairs) => {
            info!("🏷️ 元数据变化:");
            for (key, value) in pairs {
                info!("   {} : {}", key, value);
            }
        }
        PlayerEvent::Error {
            source,
            message,
            debug,
        } => {
            error!("❌ {} 出错: {}", source, message);
            if let Some(debug) = debug {
                debug!("   {}", debug);
            }
        }
    }
}

/// appsink 样本 → RGBA帧; 无效样本返回 None
fn sample_to_frame(sample: &gst::Sample) -> Option<VideoFrame> {
    let caps = sample.caps()?;
    let info = gst_video::VideoInfo::from_caps(caps).ok()?;
    let buffer = sample.buffer()?;
    let frame = gst_video::VideoFrameRef::from_buffer_ref_readable(buffer, &info).ok()?;
    let stride = *frame.plane_stride().first()?;
    let data = frame.plane_data(0).ok()?;
    plane_to_frame(info.width(), info.height(), stride, data)
}

/// RGBA平面 → 紧凑帧; 负步长 (倒置图像) 和尺寸不符的平面丢弃
fn plane_to_frame(width: u32, height: u32, stride: i32, data: &[u8]) -> Option<VideoFrame> {
    let stride = usize::try_from(stride).ok().filter(|s| *s > 0)?;
    VideoFrame::from_rgba_strided(width, height, stride, data).ok()
}

/// 只接收RGBA, 队列长度1且丢弃旧样本
fn build_appsink(slot: FrameSlot, events: Sender<DecodeEvent>) -> gst_app::AppSink {
    let caps = gst_video::VideoCapsBuilder::new()
        .format(gst_video::VideoFormat::Rgba)
        .build();
    let appsink = gst_app::AppSink::builder()
        .caps(&caps)
        .max_buffers(1)
        .drop(true)
        .build();

    let output = Mutex::new(FrameOutput::new(slot, events));
    appsink.set_callbacks(
        gst_app::AppSinkCallbacks::builder()
            .new_sample(move |sink| {
                let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                let Some(frame) = sample_to_frame(&sample) else {
                    debug!("⚠️ 跳过无效样本");
                    return Ok(gst::FlowSuccess::Ok);
                };

                let mut output = output.lock().unwrap_or_else(|p| p.into_inner());
                if output.frames() == 0 {
                    output.notify(DecodeEvent::Opened {
                        codec: String::from("appsink"),
                        width: frame.width,
                        height: frame.height,
                    });
                }
                output.push(frame);
                Ok(gst::FlowSuccess::Ok)
            })
            .build(),
    );
    appsink
}

/// playbin 封装
pub struct GstPlayer {
    playbin: gst::Element,
    bus: gst::Bus,
    url: String,
    events: Option<Sender<DecodeEvent>>,
    position: PositionTracker,
    last_position_query: Option<Instant>,
    finished: bool,
}

impl GstPlayer {
    /// 播放器模式: 使用playbin自带的视频输出
    pub fn new(url: &str) -> Result<Self> {
        ensure_initialized()?;
        let playbin = gst::ElementFactory::make("playbin")
            .name("player")
            .property("uri", url)
            .build()?;
        Self::from_playbin(playbin, url, None)
    }

    /// 接收器模式: 帧写入 FrameSlot
    pub fn with_sink(url: &str, slot: FrameSlot, events: Sender<DecodeEvent>) -> Result<Self> {
        ensure_initialized()?;
        let appsink = build_appsink(slot, events.clone());
        let playbin = gst::ElementFactory::make("playbin")
            .name("player")
            .property("uri", url)
            .property("video-sink", appsink)
            .build()?;
        Self::from_playbin(playbin, url, Some(events))
    }

    fn from_playbin(
        playbin: gst::Element,
        url: &str,
        events: Option<Sender<DecodeEvent>>,
    ) -> Result<Self> {
        let bus = playbin
            .bus()
            .ok_or_else(|| ViewerError::Pipeline(String::from("playbin 没有总线")))?;
        Ok(Self {
            playbin,
            bus,
            url: url.to_string(),
            events,
            position: PositionTracker::default(),
            last_position_query: None,
            finished: false,
        })
    }

    pub fn play(&self) -> Result<()> {
        info!("▶️ 开始播放: {}", self.url);
        self.playbin.set_state(gst::State::Playing)?;
        Ok(())
    }

    pub fn position_ms(&self) -> Option<u64> {
        self.playbin
            .query_position::<gst::ClockTime>()
            .map(|t| t.mseconds())
    }

    /// 取下一个事件, 最多等待 `timeout`
    pub fn next_event(&mut self, timeout: Duration) -> Option<PlayerEvent> {
        let due = self
            .last_position_query
            .map_or(true, |t| t.elapsed() >= POSITION_INTERVAL);
        if due && !self.finished {
            self.last_position_query = Some(Instant::now());
            if let Some(ms) = self.position_ms().and_then(|ms| self.position.update(ms)) {
                return Some(PlayerEvent::PositionChanged(ms));
            }
        }

        let wait = gst::ClockTime::from_mseconds(timeout.as_millis() as u64);
        let (bus, playbin) = (&self.bus, &self.playbin);
        let event = next_translated(|| bus.timed_pop(wait), |msg| translate(msg, playbin))?;
        if event.is_terminal() {
            // 流结束或出错后停止播放
            self.forward_terminal(&event);
            self.stop();
        }
        Some(event)
    }

    fn forward_terminal(&self, event: &PlayerEvent) {
        let Some(events) = &self.events else {
            return;
        };
        let decode_event = match event {
            PlayerEvent::Error { message, .. } => DecodeEvent::Failed(message.clone()),
            _ => DecodeEvent::Finished,
        };
        let _ = events.try_send(decode_event);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn stop(&mut self) {
        if let Err(e) = self.playbin.set_state(gst::State::Null) {
            warn!("⚠️ 停止播放失败: {}", e);
        }
        self.finished = true;
    }
}

impl StreamSource for GstPlayer {
    fn poll(&mut self) {
        while let Some(event) = self.next_event(Duration::ZERO) {
            log_event(&event);
        }
    }

    fn stop(&mut self) {
        GstPlayer::stop(self);
    }

    fn is_finished(&self) -> bool {
        GstPlayer::is_finished(self)
    }
}

impl Drop for GstPlayer {
    fn drop(&mut self) {
        let _ = self.playbin.set_state(gst::State::Null);
    }
}
