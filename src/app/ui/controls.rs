use eframe::egui::{self, Align, Color32, Key, Layout, Response, Sense, Stroke, Ui, vec2};

use crate::risk::EdgePattern;
use crate::util::{format_percent, short_id};

use super::super::encoding::{RiskTier, edge_style};
use super::super::graph::interaction::{MAX_ZOOM, MIN_ZOOM, Viewport};
use super::super::physics::SimulationParams;
use super::super::ViewModel;

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

fn default_slider_key_step(min: f32, max: f32) -> f32 {
    ((max - min) / 200.0).max(0.0005)
}

/// Arrow keys held on a focused slider move it with increasing speed.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    min: f32,
    max: f32,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        return false;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    let delta = direction as f32 * default_slider_key_step(min, max) * speed * delta_time;

    let old_value = *value;
    *value = (*value + delta).clamp(min, max);
    ui.ctx().request_repaint();
    (*value - old_value).abs() > f32::EPSILON
}

fn tuning_slider(
    ui: &mut Ui,
    value: &mut f32,
    min: f32,
    max: f32,
    text: &str,
    hover: &str,
) -> bool {
    let response = ui
        .add(
            egui::Slider::new(&mut *value, min..=max)
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if response.hovered() {
        response.request_focus();
    }
    let mut changed = response.changed();
    changed |= apply_slider_arrow_acceleration(ui, &response, value, min, max);
    changed
}

fn swatch_circle(ui: &mut Ui, color: Color32, glow: bool) {
    let (rect, _) = ui.allocate_exact_size(vec2(18.0, 18.0), Sense::hover());
    let painter = ui.painter();
    if glow {
        painter.circle_filled(rect.center(), 8.5, color.gamma_multiply(0.35));
    }
    painter.circle_filled(rect.center(), 6.0, color);
}

fn swatch_edge(ui: &mut Ui, pattern: EdgePattern) {
    let style = edge_style(pattern);
    let (rect, _) = ui.allocate_exact_size(vec2(36.0, 18.0), Sense::hover());
    let start = rect.left_center() + vec2(2.0, 0.0);
    let end = rect.right_center() - vec2(if style.marker { 8.0 } else { 2.0 }, 0.0);
    ui.painter().extend(egui::Shape::dashed_line(
        &[start, end],
        Stroke::new(style.width.min(3.0), style.color),
        style.dash.dash,
        style.dash.gap,
    ));
    if style.marker {
        let tip = rect.right_center() - vec2(1.0, 0.0);
        ui.painter().add(egui::Shape::convex_polygon(
            vec![tip, tip + vec2(-7.0, -4.0), tip + vec2(-7.0, 4.0)],
            style.color,
            Stroke::NONE,
        ));
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search wallet id")
            .on_hover_text("Fuzzy-highlight matching wallets without changing the layout.");
        let search_response = ui
            .text_edit_singleline(&mut self.search)
            .on_hover_text("Matching wallets get a blue outline. Enter on a full id focuses it.");
        if search_response.lost_focus()
            && ui.input(|input| input.key_pressed(Key::Enter))
            && let Some(index) = self.graph.index_of(self.search.trim())
        {
            self.focus_node(index);
        }
        if let Some(matches) = self.cached_search_matches() {
            ui.small(format!("{} matching wallets", matches.len()));
        }

        ui.separator();

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Advance the force layout every frame.");
        ui.checkbox(&mut self.show_labels, "Labels when zoomed in")
            .on_hover_text("Show wallet ids for every node above 135% zoom.");
        ui.checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay")
            .on_hover_text("Draw the Barnes-Hut partitions over the graph canvas.");

        let mut zoom = self.viewport.zoom;
        let zoom_response = ui
            .add(
                egui::Slider::new(&mut zoom, MIN_ZOOM..=MAX_ZOOM)
                    .logarithmic(true)
                    .text("Zoom"),
            )
            .on_hover_text("Scroll over the canvas to zoom around the pointer.");
        if zoom_response.changed() {
            self.viewport.set_zoom(zoom);
        }

        ui.horizontal(|ui| {
            if ui
                .button("Restart layout")
                .on_hover_text("Reset layout energy so the graph settles again.")
                .clicked()
            {
                self.simulation.restart();
            }
            if ui.button("Reset view").clicked() {
                self.viewport = Viewport::default();
            }
        });

        self.draw_physics_tuning(ui);

        ui.separator();
        self.draw_legend(ui);

        ui.separator();
        egui::CollapsingHeader::new("Highest risk wallets")
            .default_open(true)
            .show(ui, |ui| self.draw_risk_ranking(ui));
    }

    fn draw_physics_tuning(&mut self, ui: &mut Ui) {
        ui.collapsing("Physics tuning", |ui| {
            let mut params = self.simulation.params();
            let mut changed = false;

            changed |= tuning_slider(
                ui,
                &mut params.link_distance,
                40.0,
                320.0,
                "Link distance",
                "Rest length of every transaction edge.",
            );
            let mut repulsion = -params.charge_strength;
            if tuning_slider(
                ui,
                &mut repulsion,
                50.0,
                1200.0,
                "Repulsion",
                "How strongly wallets push away from each other.",
            ) {
                params.charge_strength = -repulsion;
                changed = true;
            }
            changed |= tuning_slider(
                ui,
                &mut params.collision_strength,
                0.0,
                1.0,
                "Collision",
                "How firmly overlapping wallets are separated.",
            );
            changed |= tuning_slider(
                ui,
                &mut params.velocity_decay,
                0.05,
                0.9,
                "Velocity decay",
                "Fraction of velocity lost every tick.",
            );

            ui.horizontal(|ui| {
                if ui.button("Defaults").clicked() {
                    params = SimulationParams {
                        seed: params.seed,
                        ..SimulationParams::default()
                    };
                    changed = true;
                }
                ui.small(format!("seed {:#x}", params.seed));
            });

            if changed {
                self.simulation.set_params(params);
                self.simulation.restart();
            }
        });
    }

    fn draw_legend(&self, ui: &mut Ui) {
        egui::CollapsingHeader::new("Legend")
            .default_open(true)
            .show(ui, |ui| {
                ui.label("Node fill: final risk");
                for tier in RiskTier::ALL {
                    ui.horizontal(|ui| {
                        swatch_circle(ui, tier.color(), tier.has_glow());
                        ui.label(format!("{} ({})", tier.label(), tier.range_label()));
                    });
                }
                ui.small("Node size: transaction count");

                ui.add_space(6.0);
                ui.label("Edge pattern");
                for pattern in EdgePattern::ALL {
                    ui.horizontal(|ui| {
                        swatch_edge(ui, pattern);
                        ui.label(pattern.label());
                    });
                }
            });
    }

    fn draw_risk_ranking(&mut self, ui: &mut Ui) {
        let ids_len = self.top_risk.len();
        let row_count = ids_len.min(self.ranking_rows_visible);
        let mut should_load_more = false;
        let mut clicked = None;

        egui::ScrollArea::vertical()
            .id_salt("risk_ranking_scroll")
            .max_height(220.0)
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, row_count, |ui, row_range| {
                if row_range.end + Self::RANKING_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for row in row_range {
                    let Some(&index) = self.top_risk.get(row) else {
                        continue;
                    };
                    let Some(node) = self.graph.nodes.get(index) else {
                        continue;
                    };

                    let is_selected = self.selected == Some(index);
                    let tier = RiskTier::from_risk(node.final_risk);
                    let value_label = format_percent(node.final_risk);

                    let row_clicked = ui
                        .horizontal(|ui| {
                            swatch_circle(ui, tier.color(), false);
                            let clicked = ui
                                .selectable_label(is_selected, short_id(&node.id))
                                .on_hover_text(node.id.as_str())
                                .clicked();
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                ui.label(value_label);
                            });
                            clicked
                        })
                        .inner;

                    if row_clicked {
                        clicked = Some(index);
                    }
                }
            });

        if let Some(index) = clicked {
            self.focus_node(index);
        }

        if should_load_more && row_count < ids_len {
            self.ranking_rows_visible = (row_count + Self::RANKING_PAGE_ROWS).min(ids_len);
        }
    }
}
