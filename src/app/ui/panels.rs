use eframe::egui::{self, Align, Context, Layout};
use tracing::debug;

use crate::risk::RiskGraph;

use super::super::animation::AnimationClock;
use super::super::graph::build::Scene;
use super::super::graph::interaction::{DragController, HoverTracker, Viewport};
use super::super::physics::SimulationParams;
use super::super::{ViewModel, ViewScratch};

impl ViewModel {
    pub(in crate::app) const INITIAL_RANKING_ROWS: usize = 20;
    pub(in crate::app) const RANKING_PAGE_ROWS: usize = 20;
    pub(in crate::app) const RANKING_PREFETCH_MARGIN: usize = 4;

    pub(in crate::app) fn new(graph: RiskGraph, params: SimulationParams) -> Self {
        let scene = Scene::from_graph(&graph);
        let simulation = scene.simulation(&graph, params);
        let top_risk = graph.top_by_final_risk(graph.node_count());
        debug!(
            nodes = simulation.node_count(),
            edges = scene.edges.len(),
            seed = params.seed,
            "scene built"
        );

        Self {
            graph,
            scene,
            simulation,
            clock: AnimationClock::new(),
            viewport: Viewport::default(),
            drag: DragController::default(),
            hover: HoverTracker::default(),
            panning: false,
            pending_intents: Vec::new(),
            selected: None,
            search: String::new(),
            search_match_cache: None,
            live_physics: true,
            show_quadtree_overlay: false,
            show_labels: true,
            top_risk,
            ranking_rows_visible: Self::INITIAL_RANKING_ROWS,
            view_scratch: ViewScratch::default(),
            visible_node_count: 0,
            visible_edge_count: 0,
        }
    }

    /// Cancels both animation schedules and halts the layout. Called before
    /// the view is replaced by a reload or an error.
    pub(in crate::app) fn teardown(&mut self) {
        self.clock.cancel();
        self.simulation.stop();
        self.drag.clear();
        self.pending_intents.clear();
        self.hover.clear();
        debug!("graph view torn down");
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        base_url: &str,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("risk-graph");
                    ui.separator();
                    ui.label(format!("feeds: {base_url}"));
                    ui.label(format!("wallets: {}", self.graph.node_count()));
                    ui.label(format!("transactions: {}", self.graph.edge_count()));
                    ui.label(format!("suspicious: {}", self.graph.suspicious_edge_count()));

                    let report = self.graph.report;
                    if report.dropped_total() > 0 {
                        ui.label(format!("dropped: {}", report.dropped_total()))
                            .on_hover_text(format!(
                                "malformed nodes {}, malformed edges {}, malformed risk records {}, \
                                 duplicate nodes {}, edges to unknown wallets {}",
                                report.malformed_nodes,
                                report.malformed_edges,
                                report.malformed_risk_records,
                                report.duplicate_nodes,
                                report.dangling_edges,
                            ));
                    }

                    let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if is_loading {
                        ui.spinner();
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_graph_text());
                        ui.label(format!(
                            "layout: {}  α {:.3}",
                            self.simulation.phase().label(),
                            self.simulation.alpha()
                        ));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("controls_scroll")
                    .show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if self.graph.node_count() == 0 {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.label("The feeds returned no wallets.");
                    });
                }
                self.draw_graph(ui);
            });
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<usize>) {
        if self.selected == selected {
            return;
        }

        self.selected = selected.filter(|&index| index < self.graph.node_count());
    }

    pub(in crate::app) fn focus_node(&mut self, index: usize) {
        if let Some(position) = self.simulation.position(index) {
            self.viewport.pan = -position * self.viewport.zoom;
        }
        self.set_selected(Some(index));
    }

    fn visible_graph_text(&self) -> String {
        format!(
            "visible {}/{} wallets, {}/{} edges",
            self.visible_node_count,
            self.graph.node_count(),
            self.visible_edge_count,
            self.graph.edge_count()
        )
    }
}
