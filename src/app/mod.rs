use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Vec2};
use tracing::{info, warn};

use crate::feed::{FeedConfig, LoadError, fetch_feeds, parse_feeds};
use crate::risk::{RiskGraph, fuse};

mod animation;
mod encoding;
mod graph;
mod physics;
mod render_utils;
mod surface;
mod ui;

use animation::AnimationClock;
use graph::build::Scene;
use graph::interaction::{DragController, HoverTracker, Viewport};
use graph::view::Projection;
use physics::{QuadtreeCell, Simulation, SimulationIntent, SimulationParams};

type LoadResult = Result<RiskGraph, LoadError>;

pub struct RiskGraphApp {
    feed_config: FeedConfig,
    params: SimulationParams,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(LoadError),
}

struct ViewModel {
    graph: RiskGraph,
    scene: Scene,
    simulation: Simulation,
    clock: AnimationClock,
    viewport: Viewport,
    drag: DragController,
    hover: HoverTracker,
    panning: bool,
    pending_intents: Vec<SimulationIntent>,
    selected: Option<usize>,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    live_physics: bool,
    show_quadtree_overlay: bool,
    show_labels: bool,
    top_risk: Vec<usize>,
    ranking_rows_visible: usize,
    view_scratch: ViewScratch,
    visible_node_count: usize,
    visible_edge_count: usize,
}

struct SearchMatchCache {
    query: String,
    matches: Arc<HashSet<usize>>,
}

#[derive(Default)]
struct ViewScratch {
    world_positions: Vec<Vec2>,
    projection: Projection,
    quadtree_cells: Vec<QuadtreeCell>,
}

impl RiskGraphApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        feed_config: FeedConfig,
        seed: u64,
    ) -> Self {
        let params = SimulationParams::with_seed(seed);
        let state = Self::start_load(&feed_config);
        Self {
            feed_config,
            params,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(config: &FeedConfig) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();
        let config = config.clone();

        thread::spawn(move || {
            let result = fetch_feeds(&config).and_then(|raw| {
                let parsed = parse_feeds(&raw)?;
                Ok(fuse(parsed))
            });
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(config: &FeedConfig) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(config),
        }
    }

}

/// State that follows a finished load. A failure never keeps a graph.
fn next_state(params: SimulationParams, result: LoadResult) -> AppState {
    match result {
        Ok(graph) => AppState::Ready(Box::new(ViewModel::new(graph, params))),
        Err(error) => {
            warn!(%error, feed = ?error.feed(), "risk feed load failed");
            AppState::Error(error)
        }
    }
}

/// Tears down the current view, if any, and moves to `next`.
fn replace_state(state: &mut AppState, next: AppState) {
    if let AppState::Ready(model) = state {
        model.teardown();
    }
    *state = next;
}

impl eframe::App for RiskGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => transition = Some(result),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err(LoadError::WorkerDisconnected));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading wallet risk graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load wallet risk graph");
                    ui.add_space(6.0);
                    ui.label(error.to_string());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.feed_config.base_url, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    info!("reloading risk feeds");
                    self.reload_rx = Some(Self::spawn_load(&self.feed_config));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => transition = Some(result),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(Err(LoadError::WorkerDisconnected));
                        }
                    }
                }
            }
        }

        if retry {
            info!("retrying risk feed load");
            self.state = Self::start_load(&self.feed_config);
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            replace_state(&mut self.state, next_state(self.params, result));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedKind;
    use crate::app::graph::build::tests::scenario_graph;

    fn ready_state() -> AppState {
        next_state(SimulationParams::default(), Ok(scenario_graph()))
    }

    #[test]
    fn successful_load_builds_the_view() {
        let AppState::Ready(model) = ready_state() else {
            panic!("expected a ready view");
        };
        assert_eq!(model.graph.node_count(), 3);
        assert_eq!(model.simulation.node_count(), 3);
    }

    #[test]
    fn failed_reload_replaces_the_view_with_the_error() {
        let mut state = ready_state();
        let failure = Err(LoadError::Status {
            feed: FeedKind::RiskScores,
            status: 503,
        });

        replace_state(&mut state, next_state(SimulationParams::default(), failure));
        let AppState::Error(error) = &state else {
            panic!("expected the error state");
        };
        assert_eq!(error.feed(), Some(FeedKind::RiskScores));
        assert!(matches!(error, LoadError::Status { status: 503, .. }));
    }
}
