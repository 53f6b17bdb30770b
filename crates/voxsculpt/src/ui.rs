use crate::{input::ToolState, renderer::scene::VoxelStyle};

/// Things the panel asks the app to do this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiAction {
    Export,
    Reset,
}

pub struct HudStats {
    pub voxels: u32,
    pub distance: f32,
    pub fps: f32,
    pub sim_format: wgpu::TextureFormat,
}

/// Top-left read-out.
pub fn draw_hud(ctx: &egui::Context, stats: &HudStats) {
    egui::Area::new(egui::Id::new("hud"))
        .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!(
                    "{} voxels ({:?})\ndistance {:.0}\n{:.0} fps",
                    stats.voxels, stats.sim_format, stats.distance, stats.fps
                ))
                .monospace()
                .color(egui::Color32::from_gray(230)),
            );
        });
}

/// Brush and display controls.
pub fn draw_tool_panel(
    ctx: &egui::Context,
    tool: &mut ToolState,
    style: &mut VoxelStyle,
    vignette: &mut f32,
) -> Option<UiAction> {
    let mut action = None;

    egui::Window::new("Tools")
        .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            ui.checkbox(&mut tool.sculpt_mode, "Sculpt (S)");
            ui.add(egui::Slider::new(&mut tool.radius, 0.01..=0.5).text("Brush radius"));

            ui.separator();
            ui.horizontal(|ui| {
                for option in VoxelStyle::ALL {
                    ui.selectable_value(style, option, option.label());
                }
            });
            ui.add(egui::Slider::new(vignette, 0.0..=1.5).text("Vignette"));

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Export (E)").clicked() {
                    action = Some(UiAction::Export);
                }
                if ui.button("Reset (R)").clicked() {
                    action = Some(UiAction::Reset);
                }
            });
        });

    action
}
