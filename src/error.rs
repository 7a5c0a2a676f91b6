//! 错误类型
//! Error types shared by every backend

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("无法打开输入流 {url}: {source}")]
    OpenInput {
        url: String,
        #[source]
        source: ffmpeg_next::Error,
    },

    #[error("{url} 中没有视频流")]
    NoVideoStream { url: String },

    #[error("找不到解码器 ({codec}): {source}")]
    NoDecoder {
        codec: String,
        #[source]
        source: ffmpeg_next::Error,
    },

    #[error("读包失败: {0}")]
    ReadPacket(#[source] ffmpeg_next::Error),

    #[error("创建像素格式转换器失败: {0}")]
    Scaler(#[source] ffmpeg_next::Error),

    #[error("FFmpeg 初始化失败: {0}")]
    FfmpegInit(String),

    #[error("管线错误: {0}")]
    Pipeline(String),

    #[error("非法帧尺寸 {width}x{height} (stride {stride}, {len} 字节)")]
    InvalidFrame {
        width: u32,
        height: u32,
        stride: usize,
        len: usize,
    },

    #[cfg(feature = "gst")]
    #[error("GStreamer 错误: {0}")]
    Gst(#[from] gstreamer::glib::Error),

    #[cfg(feature = "gst")]
    #[error("GStreamer 调用失败: {0}")]
    GstBool(#[from] gstreamer::glib::BoolError),

    #[cfg(feature = "gst")]
    #[error("GStreamer 状态切换失败: {0}")]
    GstState(#[from] gstreamer::StateChangeError),

    #[cfg(feature = "gst")]
    #[error("RTSP 服务器错误: {0}")]
    Server(String),

    #[error("未知的测试图案: {0}")]
    UnknownPattern(String),

    #[error("配置文件 {path} 读写失败: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件 {path} 格式错误: {source}")]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("保存截图失败: {0}")]
    Snapshot(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
