// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod cli; // 命令行参数
pub mod config; // 配置文件 (JSON)
pub mod decode; // 解码后端 (FFmpeg / ez-ffmpeg / GStreamer)
pub mod error;
pub mod frame; // RGBA帧
pub mod render; // macroquad 窗口
#[cfg(feature = "gst")]
pub mod server; // 测试用 RTSP 服务器
pub mod slot; // 最新帧槽位
pub mod snapshot;
pub mod stats;

pub use crate::config::{RtspTransport, ViewerConfig};
pub use crate::decode::{Backend, DecodeEvent, DecodeWorker, StreamSource};
pub use crate::error::{Result, ViewerError};
pub use crate::frame::VideoFrame;
pub use crate::render::{FitMode, Overlay, Viewer, ViewerOptions};
pub use crate::slot::{FrameSlot, SlotStats};
pub use crate::stats::FpsCounter;
