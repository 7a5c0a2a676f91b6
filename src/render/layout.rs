/// 绘制布局与解码状态 (与macroquad无关的部分)
use crate::decode::DecodeEvent;

/// 画面适配方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitMode {
    /// 拉伸铺满整个窗口
    Stretch,
    /// 原尺寸画在左上角
    Native,
}

/// 目标矩形 (x, y, w, h)
pub fn dest_rect(
    fit: FitMode,
    frame_w: f32,
    frame_h: f32,
    screen_w: f32,
    screen_h: f32,
) -> (f32, f32, f32, f32) {
    match fit {
        FitMode::Stretch => (0.0, 0.0, screen_w, screen_h),
        FitMode::Native => (0.0, 0.0, frame_w, frame_h),
    }
}

/// 叠加文字 (半透明黑底白字)
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: u16,
    pub padding: f32,
}

impl Overlay {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            x: 20.0,
            y: 20.0,
            font_size: 40,
            padding: 4.0,
        }
    }

    /// 背景框, 由文字尺寸加内边距得到
    pub fn background(&self, text_w: f32, text_h: f32) -> (f32, f32, f32, f32) {
        (
            self.x,
            self.y,
            text_w + self.padding * 2.0,
            text_h + self.padding * 2.0,
        )
    }
}

/// 面板里显示的解码状态
#[derive(Clone, Debug, PartialEq)]
pub enum DecoderState {
    Connecting,
    Playing { codec: String, width: u32, height: u32 },
    Failed(String),
    Finished,
}

impl DecoderState {
    pub fn apply(&mut self, event: DecodeEvent) {
        *self = match event {
            DecodeEvent::Opened {
                codec,
                width,
                height,
            } => DecoderState::Playing {
                codec,
                width,
                height,
            },
            DecodeEvent::Failed(reason) => DecoderState::Failed(reason),
            DecodeEvent::Finished => DecoderState::Finished,
        };
    }

    pub fn describe(&self) -> String {
        match self {
            DecoderState::Connecting => String::from("connecting"),
            DecoderState::Playing {
                codec,
                width,
                height,
            } => format!("playing {} {}x{}", codec, width, height),
            DecoderState::Failed(reason) => format!("failed: {}", reason),
            DecoderState::Finished => String::from("stream ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretch_fills_window_native_keeps_size() {
        assert_eq!(
            dest_rect(FitMode::Stretch, 320.0, 240.0, 640.0, 480.0),
            (0.0, 0.0, 640.0, 480.0)
        );
        assert_eq!(
            dest_rect(FitMode::Native, 320.0, 240.0, 640.0, 480.0),
            (0.0, 0.0, 320.0, 240.0)
        );
    }

    #[test]
    fn overlay_background_includes_padding() {
        let overlay = Overlay::new("Overlay Text");
        assert_eq!(overlay.background(100.0, 30.0), (20.0, 20.0, 108.0, 38.0));
    }

    #[test]
    fn decoder_state_follows_events() {
        let mut state = DecoderState::Connecting;
        state.apply(DecodeEvent::Opened {
            codec: "H264".into(),
            width: 640,
            height: 480,
        });
        assert_eq!(state.describe(), "playing H264 640x480");

        state.apply(DecodeEvent::Failed("timeout".into()));
        assert_eq!(state, DecoderState::Failed("timeout".into()));

        state.apply(DecodeEvent::Finished);
        assert_eq!(state.describe(), "stream ended");
    }
}
