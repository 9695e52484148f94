use super::view_state::{Command, ViewState};
use crate::input::list_video_devices;
use egui_macroquad::egui;

/// 顶部控制栏高度 (像素)
pub const CONTROL_BAR_HEIGHT: f32 = 40.0;
/// 底部状态栏高度 (像素)
pub const STATUS_BAR_HEIGHT: f32 = 28.0;

const BUTTON_WIDTH: f32 = 120.0;

/// 本帧界面操作的结果
#[derive(Debug, Default)]
pub struct PanelAction {
    pub command: Option<Command>,
    /// 需要复制到剪贴板的技术细节
    pub copy_text: Option<String>,
}

/// 绘制控制栏、状态栏和错误对话框
pub fn show(ctx: &egui::Context, state: &mut ViewState) -> PanelAction {
    let mut action = PanelAction::default();

    // --- 控制栏 ---
    egui::TopBottomPanel::top("controls")
        .exact_height(CONTROL_BAR_HEIGHT)
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                let field_width =
                    (ui.available_width() - BUTTON_WIDTH - 48.0).max(BUTTON_WIDTH);
                let response = ui.add(
                    egui::TextEdit::singleline(&mut state.input)
                        .hint_text("Enter RTSP URL...")
                        .desired_width(field_width),
                );
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                device_menu(ui, state);

                let clicked = ui
                    .add_sized(
                        [BUTTON_WIDTH, 24.0],
                        egui::Button::new(state.button_label()),
                    )
                    .clicked();
                if clicked || submitted {
                    action.command = state.toggle();
                }
            });
        });

    // --- 状态栏 ---
    egui::TopBottomPanel::bottom("status")
        .exact_height(STATUS_BAR_HEIGHT)
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                ui.label(state.status_line());
                if state.has_video() {
                    ui.separator();
                    ui.colored_label(
                        egui::Color32::GRAY,
                        format!("{} frames", state.frames()),
                    );
                }
            });
        });

    // --- 错误对话框 ---
    let mut dismiss = false;
    if let Some(dialog) = &mut state.error {
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.colored_label(egui::Color32::YELLOW, "⚠");
                ui.label(dialog.message.as_str());

                if let Some(detail) = &dialog.detail {
                    ui.separator();
                    ui.checkbox(&mut dialog.show_details, "Show Details");
                    if dialog.show_details {
                        ui.label(egui::RichText::new(detail).monospace());
                        if ui.button("Copy Details").clicked() {
                            action.copy_text = Some(detail.clone());
                        }
                    }
                }

                ui.separator();
                if ui.button("OK").clicked() {
                    dismiss = true;
                }
            });
    }
    if dismiss {
        state.dismiss_error();
    }

    action
}

/// 摄像头下拉菜单 (首次展开时扫描设备)
fn device_menu(ui: &mut egui::Ui, state: &mut ViewState) {
    ui.menu_button("📷", |ui| {
        if !state.devices_loaded || ui.button("🔄 刷新设备列表").clicked() {
            state.devices = list_video_devices();
            state.devices_loaded = true;
        }

        if state.devices.is_empty() {
            ui.label("未找到设备");
            return;
        }

        let mut chosen = None;
        for device in &state.devices {
            if ui.button(device.name.as_str()).clicked() {
                chosen = Some(device.clone());
            }
        }
        if let Some(device) = chosen {
            state.select_device(&device);
            ui.close_menu();
        }
    });
}
