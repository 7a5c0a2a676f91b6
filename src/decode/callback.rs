/// ez-ffmpeg 逐帧回调解码
/// Frame-callback decoding: the library drives demux/decode/scale and hands
/// every RGBA frame to our `FrameFilter`
use super::{DecodeEvent, DecodeWorker, FrameOutput};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::frame::VideoFrame;
use crate::slot::FrameSlot;
use crossbeam_channel::Sender;
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Frame, Input};
use ffmpeg_next::ffi::AVPixelFormat;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 帧过滤器: 过滤图输出的RGBA帧 → FrameSlot
pub struct SlotFilter {
    output: FrameOutput,
    running: Arc<AtomicBool>,
    total_frames: usize,
    dropped_frames: usize,
}

impl SlotFilter {
    pub fn new(output: FrameOutput, running: Arc<AtomicBool>) -> Self {
        Self {
            output,
            running,
            total_frames: 0,
            dropped_frames: 0,
        }
    }

    fn drop_frame(&mut self, reason: &str) {
        self.dropped_frames += 1;
        if self.total_frames <= 10 {
            debug!("⚠️ 丢弃帧 #{}: {}", self.total_frames, reason);
        }
    }
}

impl FrameFilter for SlotFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> std::result::Result<(), String> {
        info!("✅ 帧回调已挂接");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> std::result::Result<Option<Frame>, String> {
        // 停止信号: 返回错误让调度器退出
        if !self.running.load(Ordering::Relaxed) {
            return Err("decoder stopped".to_string());
        }

        self.total_frames += 1;

        if frame.as_ptr().is_null() || frame.is_empty() {
            self.drop_frame("空帧");
            return Ok(None);
        }

        // SAFETY: 指针非空, 过滤器回调期间帧数据有效
        let converted = unsafe {
            let raw = &*frame.as_ptr();
            if raw.format != AVPixelFormat::AV_PIX_FMT_RGBA as i32 {
                self.drop_frame("非RGBA帧");
                return Ok(None);
            }
            if raw.width <= 0 || raw.height <= 0 || raw.linesize[0] <= 0 || raw.data[0].is_null() {
                self.drop_frame("非法尺寸");
                return Ok(None);
            }

            let width = raw.width as u32;
            let height = raw.height as u32;
            let stride = raw.linesize[0] as usize;
            let row = width as usize * crate::frame::BYTES_PER_PIXEL;
            if stride < row {
                self.drop_frame("步长异常");
                return Ok(None);
            }
            let len = stride * (height as usize - 1) + row;
            let data = std::slice::from_raw_parts(raw.data[0], len);
            VideoFrame::from_rgba_strided(width, height, stride, data)
        };

        match converted {
            Ok(video) => {
                if self.output.frames() == 0 {
                    self.output.notify(DecodeEvent::Opened {
                        codec: String::from("ez-ffmpeg"),
                        width: video.width,
                        height: video.height,
                    });
                }
                self.output.push(video)
            }
            Err(e) => self.drop_frame(&e.to_string()),
        }

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        info!(
            "✅ 帧回调退出: 总帧{} | 丢弃{}",
            self.total_frames, self.dropped_frames
        );
    }
}

/// 回调解码器
pub struct CallbackDecoder {
    url: String,
    input_options: Vec<(&'static str, String)>,
    width: u32,
    height: u32,
}

impl CallbackDecoder {
    /// 帧会被库缩放到窗口大小, 渲染时按原尺寸画在左上角
    pub fn new(url: impl Into<String>, config: &ViewerConfig) -> Self {
        Self {
            url: url.into(),
            input_options: config.input_options(),
            width: config.window_width,
            height: config.window_height,
        }
    }

    /// 过滤图: 缩放到目标尺寸并转换为RGBA
    pub fn filter_desc(&self) -> String {
        format!("scale={}:{},format=rgba", self.width, self.height)
    }

    pub fn spawn(self, slot: FrameSlot, events: Sender<DecodeEvent>) -> Result<DecodeWorker> {
        DecodeWorker::spawn("callback-decode", move |running| {
            // 过滤器被库接管, 结束通知走单独的发送端
            let done = events.clone();
            let output = FrameOutput::new(slot, events);
            let event = match self.run(output, running) {
                Ok(()) => {
                    info!("✅ 解码线程正常退出");
                    DecodeEvent::Finished
                }
                Err(e) => {
                    warn!("⚠️  {}", e);
                    DecodeEvent::Failed(e.to_string())
                }
            };
            let _ = done.try_send(event);
        })
    }

    fn run(&self, output: FrameOutput, running: Arc<AtomicBool>) -> Result<()> {
        info!("📹 流地址: {}", self.url);

        let filter = SlotFilter::new(output, running.clone());
        let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
        let pipe = pipe.filter("slot", Box::new(filter));
        let out = create_null_output().add_frame_pipeline(pipe);

        let opts: HashMap<String, String> = self
            .input_options
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let input = Input::new(self.url.as_str()).set_input_opts(opts);

        // 构建FFmpeg上下文
        let ctx = FfmpegContext::builder()
            .input(input)
            .filter_desc(self.filter_desc())
            .output(out)
            .build()
            .map_err(|e| ViewerError::Pipeline(format!("构建失败: {}", e)))?;

        let sch = ctx
            .start()
            .map_err(|e| ViewerError::Pipeline(format!("启动失败: {}", e)))?;
        info!("✅ 连接成功,开始解码!");

        // 流卡住时过滤器收不到帧, 由这里中止调度器
        while !sch.is_ended() {
            if !running.load(Ordering::Relaxed) {
                info!("🛑 收到停止信号, 中止调度器");
                sch.abort();
                break;
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }

        let result = sch.wait().map_err(|e| e.to_string());
        finish(!running.load(Ordering::Relaxed), result)
    }
}

/// 调度器的结束结果: 主动停止时的错误忽略, 其余按失败上报
fn finish(stopped: bool, result: std::result::Result<(), String>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if stopped => {
            debug!("调度器结束: {}", e);
            Ok(())
        }
        Err(e) => Err(ViewerError::Pipeline(format!("调度器异常结束: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_targets_window_size() {
        let config = ViewerConfig {
            window_width: 800,
            window_height: 600,
            ..Default::default()
        };
        let decoder = CallbackDecoder::new("rtsp://localhost:8554/mystream", &config);
        assert_eq!(decoder.filter_desc(), "scale=800:600,format=rgba");
    }

    #[test]
    fn scheduler_error_reported_unless_stopped() {
        assert!(finish(false, Ok(())).is_ok());
        assert!(finish(true, Err(String::from("decoder stopped"))).is_ok());
        assert!(matches!(
            finish(false, Err(String::from("Connection reset by peer"))),
            Err(ViewerError::Pipeline(_))
        ));
    }
}
