/// FFmpeg手写解码循环
/// Hand-rolled demux/decode/convert loop on top of ffmpeg-next
///
/// 打开输入 → 最佳视频流 → 打开解码器 → 转换为RGBA → 写入槽位
use super::{DecodeEvent, DecodeWorker, FrameOutput};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::frame::VideoFrame;
use crate::slot::FrameSlot;
use crossbeam_channel::Sender;
use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{context::Context as ScalerContext, flag::Flags as ScalerFlags};
use ffmpeg::util::frame::video::Video as FfmpegFrame;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};

/// 全局只初始化一次 (含网络模块)
static FFMPEG_INIT: Lazy<std::result::Result<(), String>> = Lazy::new(|| {
    ffmpeg::init().map_err(|e| e.to_string())?;
    ffmpeg::format::network::init();
    Ok(())
});

pub fn ensure_initialized() -> Result<()> {
    match &*FFMPEG_INIT {
        Ok(()) => Ok(()),
        Err(e) => Err(ViewerError::FfmpegInit(e.clone())),
    }
}

/// 源帧的像素格式和尺寸
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameFormat {
    pub format: Pixel,
    pub width: u32,
    pub height: u32,
}

impl FrameFormat {
    fn of(frame: &FfmpegFrame) -> Self {
        Self {
            format: frame.format(),
            width: frame.width(),
            height: frame.height(),
        }
    }
}

/// 转换器是否需要按新格式重建
pub fn needs_rebuild(current: &FrameFormat, next: &FrameFormat) -> bool {
    current != next
}

/// 解码输出的像素格式转换器, 源尺寸/格式变化时重建
struct Converter {
    scaler: ScalerContext,
    source: FrameFormat,
}

impl Converter {
    fn new(source: FrameFormat) -> Result<Self> {
        let scaler = ScalerContext::get(
            source.format,
            source.width,
            source.height,
            Pixel::RGBA,
            source.width,
            source.height,
            ScalerFlags::BICUBIC,
        )
        .map_err(ViewerError::Scaler)?;
        Ok(Self { scaler, source })
    }

    fn convert(&mut self, decoded: &FfmpegFrame) -> Result<VideoFrame> {
        let mut rgba = FfmpegFrame::empty();
        self.scaler.run(decoded, &mut rgba).map_err(ViewerError::Scaler)?;
        VideoFrame::from_rgba_strided(rgba.width(), rgba.height(), rgba.stride(0), rgba.data(0))
    }
}

/// 读包循环的结束方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopEnd {
    Stopped,
    EndOfStream,
}

/// 读包循环: 每读一个包前检查停止标志
///
/// `Eof` 正常结束, 其他读错误 (超时/断线) 直接返回错误, 不重试。
pub fn pump_packets<P, R, H>(running: &AtomicBool, mut read: R, mut handle: H) -> Result<LoopEnd>
where
    R: FnMut() -> std::result::Result<P, ffmpeg::Error>,
    H: FnMut(P) -> Result<()>,
{
    loop {
        if !running.load(Ordering::Relaxed) {
            return Ok(LoopEnd::Stopped);
        }
        match read() {
            Ok(packet) => handle(packet)?,
            Err(ffmpeg::Error::Eof) => return Ok(LoopEnd::EndOfStream),
            Err(e) => return Err(ViewerError::ReadPacket(e)),
        }
    }
}

/// RTSP解码器
pub struct FfmpegDecoder {
    url: String,
    input_options: Vec<(&'static str, String)>,
}

impl FfmpegDecoder {
    pub fn new(url: impl Into<String>, config: &ViewerConfig) -> Self {
        Self {
            url: url.into(),
            input_options: config.input_options(),
        }
    }

    /// 启动后台解码线程
    pub fn spawn(self, slot: FrameSlot, events: Sender<DecodeEvent>) -> Result<DecodeWorker> {
        ensure_initialized()?;
        DecodeWorker::spawn("ffmpeg-decode", move |running| {
            let mut output = FrameOutput::new(slot, events);
            match self.run(&running, &mut output) {
                Ok(()) => {
                    info!("✅ 解码线程正常退出 (共{}帧)", output.frames());
                    output.notify(DecodeEvent::Finished);
                }
                Err(e) => {
                    // 打开失败或读包失败只记录日志, 线程直接返回
                    warn!("⚠️  {}", e);
                    output.notify(DecodeEvent::Failed(e.to_string()));
                }
            }
        })
    }

    fn run(&self, running: &AtomicBool, output: &mut FrameOutput) -> Result<()> {
        info!("📹 流地址: {}", self.url);

        let mut options = ffmpeg::Dictionary::new();
        for (key, value) in &self.input_options {
            options.set(key, value);
        }

        // input_with_dictionary 内部已读取流信息
        let mut ictx = ffmpeg::format::input_with_dictionary(&self.url, options).map_err(
            |source| ViewerError::OpenInput {
                url: self.url.clone(),
                source,
            },
        )?;

        let stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| ViewerError::NoVideoStream {
                url: self.url.clone(),
            })?;
        let stream_index = stream.index();
        let parameters = stream.parameters();
        let codec = format!("{:?}", parameters.id());

        let context = ffmpeg::codec::context::Context::from_parameters(parameters).map_err(
            |source| ViewerError::NoDecoder {
                codec: codec.clone(),
                source,
            },
        )?;
        let mut decoder = context
            .decoder()
            .video()
            .map_err(|source| ViewerError::NoDecoder {
                codec: codec.clone(),
                source,
            })?;

        info!(
            "✅ 解码器已打开: {} {}x{} ({:?})",
            codec,
            decoder.width(),
            decoder.height(),
            decoder.format()
        );
        output.notify(DecodeEvent::Opened {
            codec,
            width: decoder.width(),
            height: decoder.height(),
        });

        let mut converter = Converter::new(FrameFormat {
            format: decoder.format(),
            width: decoder.width(),
            height: decoder.height(),
        })?;
        let mut decoded = FfmpegFrame::empty();

        // 不用 packets(): 它在读错误时会一直重试, 停止标志永远检查不到
        let read = || {
            let mut packet = ffmpeg::Packet::empty();
            packet.read(&mut ictx).map(|()| packet)
        };
        let handle = |packet: ffmpeg::Packet| -> Result<()> {
            if packet.stream() != stream_index {
                return Ok(());
            }
            // 被拒绝的包直接跳过
            if let Err(e) = decoder.send_packet(&packet) {
                debug!("送包失败: {}", e);
                return Ok(());
            }
            while decoder.receive_frame(&mut decoded).is_ok() {
                let source = FrameFormat::of(&decoded);
                if needs_rebuild(&converter.source, &source) {
                    info!(
                        "🔄 帧格式变化: {:?} {}x{}",
                        source.format, source.width, source.height
                    );
                    converter = Converter::new(source)?;
                }
                match converter.convert(&decoded) {
                    Ok(frame) => output.push(frame),
                    Err(e) => error!("❌ 转换失败: {}", e),
                }
            }
            Ok(())
        };

        match pump_packets(running, read, handle)? {
            LoopEnd::Stopped => info!("🛑 收到停止信号"),
            LoopEnd::EndOfStream => info!("📹 流已结束"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::VecDeque;

    fn reader(
        results: Vec<std::result::Result<u32, ffmpeg::Error>>,
    ) -> impl FnMut() -> std::result::Result<u32, ffmpeg::Error> {
        let mut queue: VecDeque<_> = results.into();
        move || queue.pop_front().unwrap_or(Err(ffmpeg::Error::Eof))
    }

    #[test]
    fn read_error_ends_loop_with_error() {
        let running = AtomicBool::new(true);
        let mut handled = Vec::new();
        let result = pump_packets(
            &running,
            reader(vec![Ok(1), Ok(2), Err(ffmpeg::Error::Other { errno: 110 }), Ok(3)]),
            |p| {
                handled.push(p);
                Ok(())
            },
        );

        assert!(matches!(result, Err(ViewerError::ReadPacket(_))));
        assert_eq!(handled, vec![1, 2]);
    }

    #[test]
    fn eof_ends_loop_normally() {
        let running = AtomicBool::new(true);
        let count = Cell::new(0);
        let result = pump_packets(&running, reader(vec![Ok(1), Ok(2)]), |_| {
            count.set(count.get() + 1);
            Ok(())
        });

        assert_eq!(result.unwrap(), LoopEnd::EndOfStream);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn stop_flag_checked_before_every_read() {
        let running = AtomicBool::new(true);
        let reads = Cell::new(0);
        let result = pump_packets(
            &running,
            || {
                reads.set(reads.get() + 1);
                Ok(reads.get())
            },
            |p| {
                if p == 3 {
                    running.store(false, Ordering::Relaxed);
                }
                Ok(())
            },
        );

        assert_eq!(result.unwrap(), LoopEnd::Stopped);
        assert_eq!(reads.get(), 3);
    }

    #[test]
    fn handler_error_aborts_loop() {
        let running = AtomicBool::new(true);
        let result = pump_packets(&running, reader(vec![Ok(1), Ok(2)]), |_| {
            Err(ViewerError::Pipeline(String::from("scaler")))
        });
        assert!(matches!(result, Err(ViewerError::Pipeline(_))));
    }

    #[test]
    fn converter_rebuilt_on_size_or_format_change() {
        let current = FrameFormat {
            format: Pixel::YUV420P,
            width: 640,
            height: 480,
        };
        assert!(!needs_rebuild(&current, &current));
        assert!(needs_rebuild(
            &current,
            &FrameFormat {
                width: 1280,
                height: 720,
                ..current
            }
        ));
        assert!(needs_rebuild(
            &current,
            &FrameFormat {
                format: Pixel::NV12,
                ..current
            }
        ));
    }
}
