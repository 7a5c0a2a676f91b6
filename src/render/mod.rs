/// 渲染模块 (macroquad 主线程)
/// Renderer: pulls the newest frame from the slot each tick and paints it
pub mod layout;

pub use layout::{dest_rect, DecoderState, FitMode, Overlay};

use crate::decode::{Backend, DecodeEvent, StreamSource};
use crate::slot::FrameSlot;
use crate::snapshot::save_snapshot;
use crate::stats::FpsCounter;
use crossbeam_channel::Receiver;
use egui_macroquad::egui;
use log::{error, info, warn};
use macroquad::prelude::*;

/// 窗口参数
#[derive(Clone, Debug)]
pub struct ViewerOptions {
    pub url: String,
    pub backend: Backend,
    pub fit: FitMode,
    pub overlay: Option<Overlay>,
    pub show_status: bool,
    pub snapshot_dir: String,
}

pub struct Viewer {
    options: ViewerOptions,
    slot: FrameSlot,
    source: Box<dyn StreamSource>,
    events: Receiver<DecodeEvent>,
    texture: Option<Texture2D>,
    seen: u64,
    decoder_state: DecoderState,
    render_fps: FpsCounter,
}

impl Viewer {
    pub fn new(
        options: ViewerOptions,
        slot: FrameSlot,
        source: Box<dyn StreamSource>,
        events: Receiver<DecodeEvent>,
    ) -> Self {
        info!("🎨 渲染器启动 ({})", options.backend.name());
        Self {
            options,
            slot,
            source,
            events,
            texture: None,
            seen: 0,
            decoder_state: DecoderState::Connecting,
            render_fps: FpsCounter::new(),
        }
    }

    /// 主循环, 窗口关闭时先停止解码再退出
    pub async fn run(mut self) {
        prevent_quit();
        loop {
            if is_quit_requested() || is_key_pressed(KeyCode::Escape) {
                info!("🛑 窗口关闭, 停止解码...");
                self.source.stop();
                break;
            }
            self.handle_input();
            self.update();
            self.draw();
            self.draw_panel();
            next_frame().await;
        }
    }

    fn handle_input(&mut self) {
        if is_key_pressed(KeyCode::F1) {
            self.options.show_status = !self.options.show_status;
        }
        if is_key_pressed(KeyCode::S) {
            self.snapshot();
        }
    }

    fn snapshot(&self) {
        let Some(frame) = self.slot.snapshot() else {
            warn!("⚠️ 还没有画面, 无法截图");
            return;
        };
        match save_snapshot(&frame, &self.options.snapshot_dir) {
            Ok(path) => info!("📸 截图已保存: {}", path.display()),
            Err(e) => error!("❌ {}", e),
        }
    }

    pub fn update(&mut self) {
        self.source.poll();

        for event in self.events.try_iter() {
            match &event {
                DecodeEvent::Failed(reason) => warn!("⚠️ 解码失败: {}", reason),
                DecodeEvent::Finished => info!("📹 流已结束"),
                DecodeEvent::Opened { .. } => {}
            }
            self.decoder_state.apply(event);
        }

        // 只取最新一帧, 中间的帧已经在槽位里被覆盖
        let Some(frame) = self.slot.latest_since(self.seen) else {
            return;
        };
        self.seen = frame.sequence;

        let (Ok(width), Ok(height)) = (u16::try_from(frame.width), u16::try_from(frame.height))
        else {
            warn!("⚠️ 帧尺寸超出纹理上限: {}x{}", frame.width, frame.height);
            return;
        };

        // 只在分辨率变化时重建纹理，否则更新像素数据
        match &self.texture {
            Some(tex) if tex.width() == width as f32 && tex.height() == height as f32 => {
                tex.update_from_bytes(frame.width, frame.height, frame.as_bytes());
            }
            _ => {
                let texture = Texture2D::from_rgba8(width, height, frame.as_bytes());
                texture.set_filter(FilterMode::Linear);
                self.texture = Some(texture);
            }
        }
    }

    pub fn draw(&mut self) {
        clear_background(BLACK);

        if let Some(texture) = &self.texture {
            let (x, y, w, h) = dest_rect(
                self.options.fit,
                texture.width(),
                texture.height(),
                screen_width(),
                screen_height(),
            );
            draw_texture_ex(
                texture,
                x,
                y,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(w, h)),
                    ..Default::default()
                },
            );
        }

        if let Some(overlay) = &self.options.overlay {
            let dims = measure_text(&overlay.text, None, overlay.font_size, 1.0);
            let (bx, by, bw, bh) = overlay.background(dims.width, dims.height);
            draw_rectangle(bx, by, bw, bh, Color::new(0.0, 0.0, 0.0, 0.5));
            draw_text(
                &overlay.text,
                overlay.x + overlay.padding,
                overlay.y + overlay.padding + dims.offset_y,
                overlay.font_size as f32,
                WHITE,
            );
        }

        self.render_fps.tick();
    }

    pub fn draw_panel(&mut self) {
        if !self.options.show_status {
            return;
        }
        let stats = self.slot.stats();
        let render_fps = self.render_fps.fps();
        let options = &self.options;
        let state = self.decoder_state.describe();
        let finished = self.source.is_finished();

        egui_macroquad::ui(|egui_ctx| {
            egui::Window::new("Stream")
                .default_pos(egui::pos2(10.0, 10.0))
                .resizable(false)
                .show(egui_ctx, |ui| {
                    ui.label(format!("URL: {}", options.url));
                    ui.label(format!("Backend: {}", backend_label(options.backend)));
                    ui.horizontal(|ui| {
                        ui.label("Render FPS:");
                        ui.colored_label(egui::Color32::GREEN, format!("{:.1}", render_fps));
                    });
                    match stats.frame_size {
                        Some((w, h)) => ui.label(format!("Frame: {}x{}", w, h)),
                        None => ui.label("Frame: -"),
                    };
                    ui.label(format!(
                        "Published: {} | Overwritten: {}",
                        stats.published, stats.dropped
                    ));
                    let color = if finished {
                        egui::Color32::YELLOW
                    } else {
                        egui::Color32::LIGHT_BLUE
                    };
                    ui.colored_label(color, format!("Decoder: {}", state));
                    ui.small("F1: toggle panel | S: snapshot");
                });
        });
        egui_macroquad::draw();
    }
}

fn backend_label(backend: Backend) -> &'static str {
    match backend {
        Backend::Ffmpeg => "ffmpeg decode loop",
        Backend::Callback => "ez-ffmpeg frame callback",
        Backend::Sink => "gstreamer appsink",
        Backend::Player => "gstreamer playbin",
    }
}

/// 窗口配置
pub fn window_conf(title: &str, width: u32, height: u32) -> Conf {
    Conf {
        window_title: title.to_string(),
        window_width: width as i32,
        window_height: height as i32,
        window_resizable: true,
        ..Default::default()
    }
}
