//! egui HUD overlay: current mesh name, cluster position, key bindings.

use crate::browser::SelectionInfo;

pub fn draw_hud(ctx: &egui::Context, selection: Option<&(String, SelectionInfo)>) {
    egui::Area::new(egui::Id::new("hud"))
        .anchor(egui::Align2::LEFT_TOP, [12.0, 12.0])
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(egui::Color32::from_black_alpha(160))
                .rounding(4.0)
                .inner_margin(8.0)
                .show(ui, |ui| {
                    match selection {
                        Some((name, info)) => {
                            ui.strong(name);
                            ui.label(format!(
                                "cluster {} ({}/{})  ·  mesh {}/{}",
                                info.cluster_key,
                                info.cluster_index,
                                info.cluster_count,
                                info.member_index,
                                info.member_count,
                            ));
                        }
                        None => {
                            ui.label("No meshes loaded");
                        }
                    }
                    ui.small("←/→ mesh · ↑/↓ cluster · drag rotate · right-drag zoom · R reset · F5 rescan");
                });
        });
}
