use eframe::egui::{self, RichText, Ui};

use crate::util::{MISSING_VALUE, format_amount, format_percent, short_id};

use super::super::encoding::RiskTier;
use super::super::ViewModel;

fn format_delta(delta: Option<f64>) -> String {
    match delta {
        Some(value) if value.is_finite() => format!("{:+.1} pts", value * 100.0),
        _ => MISSING_VALUE.to_owned(),
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Wallet Details");
        ui.add_space(6.0);

        let Some(index) = self.selected else {
            ui.label("Select a wallet from the graph or the risk ranking.");
            return;
        };

        let Some(node) = self.graph.nodes.get(index) else {
            ui.label("Selected wallet is no longer part of the graph.");
            return;
        };

        let tier = RiskTier::from_risk(node.final_risk);
        let final_entry = self.graph.risk.final_risk(&node.id);
        let base_entry = self.graph.risk.base_risk(&node.id);

        ui.label(RichText::new(short_id(&node.id)).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.label(RichText::new(format!("{} risk", tier.label())).color(tier.color()));
        ui.label(format!("Type: {}", node.entity_type.label()));
        ui.label(format!("Transactions: {}", node.degree));
        if self.simulation.is_pinned(index) {
            ui.label("Pinned while dragged");
        }

        ui.separator();
        egui::Grid::new("risk_scores_grid")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                ui.label("Final risk");
                ui.label(format_percent(node.final_risk));
                ui.end_row();

                ui.label("Base risk");
                ui.label(format_percent(node.base_risk));
                ui.end_row();

                ui.label("GNN risk");
                ui.label(format_percent(final_entry.and_then(|entry| entry.gnn_risk)));
                ui.end_row();

                ui.label("Propagation delta");
                ui.label(format_delta(final_entry.and_then(|entry| entry.delta)));
                ui.end_row();
            });

        if let Some(entry) = base_entry {
            ui.add_space(6.0);
            ui.label(RichText::new("Base risk factors").strong());
            for (name, value) in entry.factors.entries() {
                ui.horizontal(|ui| {
                    ui.label(name);
                    let fraction = value.unwrap_or(0.0) as f32;
                    ui.add(
                        egui::ProgressBar::new(fraction)
                            .desired_width(140.0)
                            .text(format_percent(value)),
                    );
                });
            }
        }

        ui.separator();
        ui.label(RichText::new("Why flagged").strong());
        if node.reasons.is_empty() {
            ui.label("No reasons reported.");
        } else {
            for reason in &node.reasons {
                ui.label(format!("• {reason}"));
            }
        }

        ui.separator();
        ui.label(RichText::new("Transactions").strong());
        let mut focus = None;
        egui::ScrollArea::vertical()
            .id_salt("wallet_edges_scroll")
            .max_height(260.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                let mut any = false;
                for edge in self.graph.edges_touching(index) {
                    any = true;
                    let (arrow, other) = if edge.source == index {
                        ("→", edge.target)
                    } else {
                        ("←", edge.source)
                    };
                    let Some(counterpart) = self.graph.nodes.get(other) else {
                        continue;
                    };

                    ui.horizontal(|ui| {
                        ui.label(arrow);
                        if ui
                            .link(short_id(&counterpart.id))
                            .on_hover_text(counterpart.id.as_str())
                            .clicked()
                        {
                            focus = Some(other);
                        }
                        let pattern = edge.pattern;
                        let text = RichText::new(pattern.label());
                        ui.label(if pattern.is_suspicious() {
                            text.color(egui::Color32::from_rgb(0xef, 0x44, 0x44))
                        } else {
                            text
                        });
                        ui.label(format_amount(edge.amount));
                    });
                }
                if !any {
                    ui.label("No transactions.");
                }
            });

        if let Some(other) = focus {
            self.focus_node(other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_signed_points() {
        assert_eq!(format_delta(Some(0.125)), "+12.5 pts");
        assert_eq!(format_delta(Some(-0.05)), "-5.0 pts");
        assert_eq!(format_delta(None), MISSING_VALUE);
        assert_eq!(format_delta(Some(f64::INFINITY)), MISSING_VALUE);
    }
}
