//! 渲染器 (macroquad + egui)
//!
//! 每个 macroquad 帧: 取出所有解码事件 → 更新界面状态 → 上传最新一帧纹理 → 绘制
pub mod control_panel;
pub mod view_state;

use crate::events::EngineEvent;
use crate::input::DecoderManager;
use arboard::Clipboard;
use control_panel::{CONTROL_BAR_HEIGHT, STATUS_BAR_HEIGHT};
use crossbeam_channel::Receiver;
use egui_macroquad::egui;
use image::{DynamicImage, RgbImage};
use macroquad::prelude::*;
use std::time::Instant;
use tracing::{debug, warn};
use view_state::{Command, ViewState};

const PLACEHOLDER_FONT_SIZE: u16 = 32;

pub struct Viewer {
    manager: DecoderManager,
    events: Receiver<EngineEvent>,
    state: ViewState,
    last_frame: Option<Texture2D>,
    clipboard: Option<Clipboard>,

    // 渲染FPS
    render_count: u64,
    render_last: Instant,
    render_fps: f64,
}

impl Viewer {
    pub fn new(
        manager: DecoderManager,
        events: Receiver<EngineEvent>,
        default_source: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            events,
            state: ViewState::new(default_source),
            last_frame: None,
            clipboard: Clipboard::new().ok(),
            render_count: 0,
            render_last: Instant::now(),
            render_fps: 0.0,
        }
    }

    /// 以输入框当前内容启动 (等同点击按钮)
    pub fn start(&mut self) {
        if let Some(command) = self.state.toggle() {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Start(input) => self.manager.start(&input),
            Command::Stop => self.manager.stop(),
        }
    }

    pub fn update(&mut self) {
        // 按顺序处理全部事件, 只上传最新一帧
        let mut latest = None;
        for event in self.events.try_iter() {
            self.state.apply(&event);
            if let EngineEvent::FrameDecoded(frame) = event {
                latest = Some(frame);
            }
        }

        if let Some(frame) = latest {
            self.upload(frame);
        }
        if !self.state.has_video() {
            self.last_frame = None;
        }
    }

    fn upload(&mut self, frame: RgbImage) {
        let (Ok(width), Ok(height)) = (u16::try_from(frame.width()), u16::try_from(frame.height()))
        else {
            warn!(
                width = frame.width(),
                height = frame.height(),
                "帧尺寸超出纹理范围, 跳过"
            );
            return;
        };
        let rgba = DynamicImage::ImageRgb8(frame).into_rgba8().into_raw();

        // 只在分辨率变化时重建纹理
        match &self.last_frame {
            Some(tex) if tex.width() == width as f32 && tex.height() == height as f32 => {
                tex.update(&Image {
                    bytes: rgba,
                    width,
                    height,
                });
            }
            _ => {
                debug!(width, height, "创建视频纹理");
                let texture = Texture2D::from_rgba8(width, height, &rgba);
                texture.set_filter(FilterMode::Linear);
                self.last_frame = Some(texture);
            }
        }
    }

    pub fn draw(&mut self) {
        clear_background(BLACK);

        let area_y = CONTROL_BAR_HEIGHT;
        let area_h = (screen_height() - CONTROL_BAR_HEIGHT - STATUS_BAR_HEIGHT).max(0.0);

        if let Some(texture) = &self.last_frame {
            let (x, y, w, h) = fit_rect(
                texture.width(),
                texture.height(),
                0.0,
                area_y,
                screen_width(),
                area_h,
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
        } else {
            let text = self.state.placeholder();
            let size = measure_text(text, None, PLACEHOLDER_FONT_SIZE, 1.0);
            draw_text(
                text,
                (screen_width() - size.width) / 2.0,
                area_y + (area_h + size.height) / 2.0,
                PLACEHOLDER_FONT_SIZE as f32,
                GRAY,
            );
        }

        // FPS统计
        self.render_count += 1;
        let now = Instant::now();
        if now.duration_since(self.render_last).as_secs() >= 1 {
            self.render_fps =
                self.render_count as f64 / now.duration_since(self.render_last).as_secs_f64();
            self.render_count = 0;
            self.render_last = now;
        }
        if self.last_frame.is_some() {
            draw_text(
                &format!("{:.0} fps", self.render_fps),
                8.0,
                area_y + 20.0,
                18.0,
                GREEN,
            );
        }
    }

    pub fn draw_egui(&mut self) {
        let mut action = control_panel::PanelAction::default();

        egui_macroquad::ui(|egui_ctx| {
            // 粘贴 (Ctrl+V)
            if let Some(clipboard) = &mut self.clipboard {
                let ctrl = is_key_down(KeyCode::LeftControl) || is_key_down(KeyCode::RightControl);
                if ctrl && is_key_pressed(KeyCode::V) {
                    if let Ok(text) = clipboard.get_text() {
                        egui_ctx.input_mut(|i| i.events.push(egui::Event::Paste(text)));
                    }
                }
            }

            action = control_panel::show(egui_ctx, &mut self.state);
        });

        if let Some(text) = action.copy_text {
            match &mut self.clipboard {
                Some(clipboard) => {
                    if let Err(e) = clipboard.set_text(text) {
                        warn!(error = %e, "复制到剪贴板失败");
                    }
                }
                None => warn!("剪贴板不可用"),
            }
        }
        if let Some(command) = action.command {
            self.execute(command);
        }

        egui_macroquad::draw();
    }

    /// 退出前停止解码线程
    pub fn shutdown(&mut self) {
        self.manager.stop();
    }
}

/// 保持宽高比, 把 frame 居中放进指定区域, 返回 (x, y, w, h)
pub fn fit_rect(
    frame_w: f32,
    frame_h: f32,
    area_x: f32,
    area_y: f32,
    area_w: f32,
    area_h: f32,
) -> (f32, f32, f32, f32) {
    if frame_w <= 0.0 || frame_h <= 0.0 || area_w <= 0.0 || area_h <= 0.0 {
        return (area_x, area_y, 0.0, 0.0);
    }
    let scale = (area_w / frame_w).min(area_h / frame_h);
    let w = frame_w * scale;
    let h = frame_h * scale;
    (area_x + (area_w - w) / 2.0, area_y + (area_h - h) / 2.0, w, h)
}
