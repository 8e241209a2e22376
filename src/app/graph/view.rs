use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Ui, Vec2, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use tracing::trace;

use super::super::animation::FrameTicks;
use super::super::encoding::{DashPattern, MARKER_COLOR, TooltipContent, tooltip_content};
use super::super::render_utils::{blend_color, circle_visible, edge_visible, with_alpha};
use super::super::surface::{PainterSurface, SceneSurface};
use super::super::{SearchMatchCache, ViewModel};
use super::build::Scene;
use super::interaction::{HoverEvent, Viewport, hit_test};

const SELECTED_OUTLINE: Color32 = Color32::from_rgb(245, 206, 93);
const MATCH_OUTLINE: Color32 = Color32::from_rgb(103, 196, 255);
const NODE_OUTLINE: Color32 = Color32::from_rgba_premultiplied(14, 21, 39, 230);
const LABEL_COLOR: Color32 = Color32::from_gray(226);
const LABEL_ZOOM: f32 = 1.35;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Screen-space node positions and radii for the current viewport.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct Projection {
    pub(in crate::app) positions: Vec<Pos2>,
    pub(in crate::app) radii: Vec<f32>,
}

impl Projection {
    pub(in crate::app) fn update(
        &mut self,
        scene: &Scene,
        world_positions: &[Vec2],
        viewport: Viewport,
        rect: Rect,
    ) {
        self.positions.clear();
        self.radii.clear();
        for (node, &world) in scene.nodes.iter().zip(world_positions) {
            self.positions.push(viewport.to_screen(rect, world));
            self.radii.push((node.style.radius * viewport.zoom).max(1.0));
        }
    }

    pub(in crate::app) fn hit_test(&self, pointer: Pos2) -> Option<usize> {
        hit_test(&self.positions, &self.radii, pointer)
    }
}

/// Everything one frame of the scene depends on.
pub(in crate::app) struct SceneFrame<'a> {
    pub(in crate::app) scene: &'a Scene,
    pub(in crate::app) projection: &'a Projection,
    pub(in crate::app) viewport: Viewport,
    pub(in crate::app) rect: Rect,
    pub(in crate::app) flow_offset: f32,
    pub(in crate::app) hovered: Option<usize>,
    pub(in crate::app) selected: Option<usize>,
    pub(in crate::app) matches: Option<&'a HashSet<usize>>,
    pub(in crate::app) show_labels: bool,
    pub(in crate::app) tooltip: Option<(Pos2, TooltipContent)>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct RenderStats {
    pub(in crate::app) visible_nodes: usize,
    pub(in crate::app) visible_edges: usize,
}

/// Draws edges under nodes under the tooltip. Without a surface nothing is
/// drawn and the stats stay empty.
pub(in crate::app) fn render_scene(
    surface: Option<&mut dyn SceneSurface>,
    frame: &SceneFrame<'_>,
) -> RenderStats {
    let Some(surface) = surface else {
        return RenderStats::default();
    };

    let mut stats = RenderStats::default();
    let zoom = frame.viewport.zoom;
    let positions = &frame.projection.positions;
    let radii = &frame.projection.radii;

    surface.background(frame.viewport.pan, zoom);

    for edge in &frame.scene.edges {
        let (Some(&start), Some(&end)) = (positions.get(edge.source), positions.get(edge.target))
        else {
            continue;
        };

        let style = edge.style;
        let width = style.width * zoom;
        if !edge_visible(frame.rect, start, end, width + 2.0) {
            continue;
        }

        let touches_selection = frame
            .selected
            .is_some_and(|selected| selected == edge.source || selected == edge.target);
        let stroke = if touches_selection {
            Stroke::new(width * 1.6, style.color)
        } else if frame.selected.is_some() {
            Stroke::new(width, with_alpha(style.color, 110))
        } else {
            Stroke::new(width, style.color)
        };

        let dash = DashPattern {
            dash: style.dash.dash * zoom,
            gap: style.dash.gap * zoom,
        };
        surface.dashed_line(start, end, stroke, dash, frame.flow_offset * zoom);

        let direction = end - start;
        if style.marker && direction.length_sq() > 1e-6 {
            let target_radius = radii.get(edge.target).copied().unwrap_or(0.0);
            let tip = end - direction.normalized() * (target_radius + 2.0 * zoom);
            surface.arrow(tip, direction, (6.0 + style.width) * zoom, MARKER_COLOR);
        }

        stats.visible_edges += 1;
    }

    let searching = frame.matches.is_some_and(|matches| !matches.is_empty());
    for (index, node) in frame.scene.nodes.iter().enumerate() {
        let (Some(&position), Some(&radius)) = (positions.get(index), radii.get(index)) else {
            continue;
        };
        if !circle_visible(frame.rect, position, radius * 2.2) {
            continue;
        }

        let is_hovered = frame.hovered == Some(index);
        let is_selected = frame.selected == Some(index);
        let is_match = frame.matches.is_some_and(|matches| matches.contains(&index));

        if node.style.glow {
            surface.glow(position, radius, node.style.fill);
        }

        let fill = if is_hovered {
            blend_color(node.style.fill, Color32::WHITE, 0.25)
        } else if searching && !is_match && !is_selected {
            with_alpha(node.style.fill, 90)
        } else {
            node.style.fill
        };
        let outline = if is_selected {
            Stroke::new(2.5, SELECTED_OUTLINE)
        } else if is_match {
            Stroke::new(2.0, MATCH_OUTLINE)
        } else {
            Stroke::new(1.5, NODE_OUTLINE)
        };
        surface.circle(position, radius, fill, outline);

        if is_selected || is_hovered || is_match || (frame.show_labels && zoom > LABEL_ZOOM) {
            surface.label(position + vec2(radius + 5.0, 0.0), &node.label, LABEL_COLOR);
        }

        stats.visible_nodes += 1;
    }

    if let Some((anchor, content)) = &frame.tooltip {
        surface.tooltip(*anchor, &content.title, content.tier, &content.lines());
    }

    stats
}

impl ViewModel {
    pub(in crate::app) fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let search_query = self.search.trim();
        if search_query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.query == search_query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                fuzzy_match_score(&matcher, &node.id, search_query).map(|_| index)
            })
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: search_query.to_owned(),
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    fn refresh_projection(&mut self, rect: Rect) {
        let scratch = &mut self.view_scratch;
        self.simulation.positions_into(&mut scratch.world_positions);
        scratch
            .projection
            .update(&self.scene, &scratch.world_positions, self.viewport, rect);
    }

    fn draw_quadtree_overlay(&mut self, painter: &egui::Painter, rect: Rect) {
        self.simulation
            .quadtree_cells(&mut self.view_scratch.quadtree_cells);

        for cell in &self.view_scratch.quadtree_cells {
            let extent = vec2(cell.half_extent, cell.half_extent);
            let min = self.viewport.to_screen(rect, cell.center - extent);
            let max = self.viewport.to_screen(rect, cell.center + extent);

            let alpha = if cell.is_leaf { 110 } else { 55 };
            let line_width = (1.4_f32 - (cell.depth as f32 * 0.09)).clamp(0.45, 1.4);
            let stroke = Stroke::new(
                line_width,
                Color32::from_rgba_unmultiplied(106, 198, 255, alpha),
            );
            painter.rect_stroke(
                Rect::from_min_max(min, max),
                0.0,
                stroke,
                egui::StrokeKind::Middle,
            );
        }
    }

    /// Applies queued interaction intents, then runs this frame's physics
    /// ticks. A pin set by a drag is in place before the next tick.
    pub(in crate::app) fn step_layout(&mut self, delta_seconds: f32) -> FrameTicks {
        for intent in self.pending_intents.drain(..) {
            self.simulation.apply(intent);
        }

        let ticks = self.clock.advance(delta_seconds);
        if self.live_physics {
            for _ in 0..ticks.physics {
                if !self.simulation.tick() {
                    break;
                }
            }
        }
        ticks
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_graph_zoom(ui, rect, &response);
        self.refresh_projection(rect);
        let clicked = self.handle_graph_pointer(ui, rect, &response);

        let frame_delta_seconds = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        let ticks = self.step_layout(frame_delta_seconds);
        trace!(physics = ticks.physics, flow = ticks.flow, "frame ticks");
        self.refresh_projection(rect);

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pointer| rect.contains(*pointer));
        let hit = if self.panning {
            None
        } else {
            pointer.and_then(|pointer| self.view_scratch.projection.hit_test(pointer))
        };
        if let HoverEvent::Enter(index) = self.hover.update(hit, pointer) {
            trace!(index, "hover enter");
        }
        if hit.is_some() || self.drag.is_dragging() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let tooltip = self.hover.state().and_then(|state| {
            self.graph
                .nodes
                .get(state.node)
                .map(|node| (state.pointer, tooltip_content(node)))
        });
        let matches = self.cached_search_matches();

        let frame = SceneFrame {
            scene: &self.scene,
            projection: &self.view_scratch.projection,
            viewport: self.viewport,
            rect,
            flow_offset: self.clock.flow_offset(),
            hovered: self.hover.state().map(|state| state.node),
            selected: self.selected,
            matches: matches.as_deref(),
            show_labels: self.show_labels,
            tooltip,
        };
        let mut surface = PainterSurface::new(&painter, rect);
        let stats = render_scene(Some(&mut surface), &frame);
        self.visible_node_count = stats.visible_nodes;
        self.visible_edge_count = stats.visible_edges;

        if self.show_quadtree_overlay {
            self.draw_quadtree_overlay(&painter, rect);
        }

        if let Some(selected) = clicked {
            self.set_selected(selected);
        }

        if self.clock.is_running() {
            ui.ctx().request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;
    use crate::app::encoding::RiskTier;
    use crate::app::graph::build::tests::scenario_graph;
    use crate::app::physics::{SimulationParams, SimulationPhase};
    use crate::app::surface::recording::{DrawOp, RecordingSurface};
    use crate::risk::RiskGraph;
    use crate::util::MISSING_VALUE;

    fn rect() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0))
    }

    fn project(scene: &Scene, world: &[Vec2], viewport: Viewport) -> Projection {
        let mut projection = Projection::default();
        projection.update(scene, world, viewport, rect());
        projection
    }

    fn frame<'a>(scene: &'a Scene, projection: &'a Projection) -> SceneFrame<'a> {
        SceneFrame {
            scene,
            projection,
            viewport: Viewport::default(),
            rect: rect(),
            flow_offset: 0.0,
            hovered: None,
            selected: None,
            matches: None,
            show_labels: true,
            tooltip: None,
        }
    }

    #[test]
    fn renders_tiers_glow_and_suspicious_markers() {
        let graph = scenario_graph();
        let scene = Scene::from_graph(&graph);
        let a = graph.index_by_id["a"];
        let b = graph.index_by_id["b"];
        let c = graph.index_by_id["c"];

        let mut world = vec![Vec2::ZERO; 3];
        world[a] = vec2(-150.0, 0.0);
        world[b] = vec2(0.0, 0.0);
        world[c] = vec2(150.0, 0.0);
        let projection = project(&scene, &world, Viewport::default());

        let mut surface = RecordingSurface::default();
        let stats = render_scene(Some(&mut surface), &frame(&scene, &projection));
        assert_eq!(
            stats,
            RenderStats {
                visible_nodes: 3,
                visible_edges: 2
            }
        );

        assert_eq!(surface.ops.first(), Some(&DrawOp::Background));
        assert!(surface.ops.contains(&DrawOp::Glow {
            center: pos2(250.0, 300.0)
        }));
        let glows = surface
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Glow { .. }))
            .count();
        assert_eq!(glows, 1);

        let arrows = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Arrow { tip, color } => Some((*tip, *color)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(arrows.len(), 1);
        assert_eq!(arrows[0].1, MARKER_COLOR);
        // stops short of b's rim
        assert!(arrows[0].0.x < 400.0 - scene.nodes[b].style.radius);

        let critical_fill = surface.ops.iter().any(|op| {
            matches!(op, DrawOp::Circle { center, fill, .. }
                if *center == pos2(250.0, 300.0) && *fill == RiskTier::Critical.color())
        });
        assert!(critical_fill);
        let unscored_fill = surface.ops.iter().any(|op| {
            matches!(op, DrawOp::Circle { center, fill, .. }
                if *center == pos2(400.0, 300.0) && *fill == RiskTier::Low.color())
        });
        assert!(unscored_fill);

        let widths = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::DashedLine { stroke, .. } => Some(stroke.width),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(widths, [4.0, 1.2]);
    }

    #[test]
    fn dashes_and_widths_follow_zoom_and_flow() {
        let graph = scenario_graph();
        let scene = Scene::from_graph(&graph);
        let world = vec![vec2(-40.0, 0.0), vec2(0.0, 0.0), vec2(40.0, 0.0)];
        let viewport = Viewport {
            pan: Vec2::ZERO,
            zoom: 2.0,
        };
        let projection = project(&scene, &world, viewport);

        let mut view = frame(&scene, &projection);
        view.viewport = viewport;
        view.flow_offset = -12.0;

        let mut surface = RecordingSurface::default();
        render_scene(Some(&mut surface), &view);

        let first_dash = surface.ops.iter().find_map(|op| match op {
            DrawOp::DashedLine { stroke, dash, offset } => Some((*stroke, *dash, *offset)),
            _ => None,
        });
        let (stroke, dash, offset) = first_dash.expect("an edge is drawn");
        assert_eq!(stroke.width, 8.0);
        assert_eq!(dash.period(), scene.edges[0].style.dash.period() * 2.0);
        assert_eq!(offset, -24.0);
    }

    #[test]
    fn tooltip_shows_reasons_or_placeholders() {
        let graph = scenario_graph();
        let scene = Scene::from_graph(&graph);
        let projection = project(&scene, &[Vec2::ZERO; 3], Viewport::default());

        for (id, expected_final, expected_reason) in [
            ("a", "92.0%", Some("• Fan-out to 14 fresh wallets")),
            ("b", MISSING_VALUE, None),
        ] {
            let index = graph.index_by_id[id];
            let mut view = frame(&scene, &projection);
            view.hovered = Some(index);
            view.tooltip = Some((pos2(10.0, 10.0), tooltip_content(&graph.nodes[index])));

            let mut surface = RecordingSurface::default();
            render_scene(Some(&mut surface), &view);

            let Some(DrawOp::Tooltip { title, lines, .. }) = surface.ops.last() else {
                panic!("tooltip is drawn last");
            };
            assert_eq!(title, id);
            assert_eq!(lines[0], format!("Final Risk: {expected_final}"));
            assert_eq!(lines.get(2).map(String::as_str), expected_reason);
        }
    }

    #[test]
    fn search_matches_get_labels_without_zoom() {
        let graph = scenario_graph();
        let scene = Scene::from_graph(&graph);
        let world = vec![vec2(-150.0, 0.0), vec2(0.0, 0.0), vec2(150.0, 0.0)];
        let projection = project(&scene, &world, Viewport::default());
        let matches = HashSet::from([graph.index_by_id["c"]]);

        let mut view = frame(&scene, &projection);
        view.matches = Some(&matches);
        let mut surface = RecordingSurface::default();
        render_scene(Some(&mut surface), &view);

        let labels = surface
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Label(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(labels, ["c"]);
    }

    #[test]
    fn offscreen_nodes_are_culled() {
        let graph = scenario_graph();
        let scene = Scene::from_graph(&graph);
        let world = vec![vec2(5_000.0, 0.0), vec2(5_100.0, 0.0), vec2(0.0, 0.0)];
        let projection = project(&scene, &world, Viewport::default());

        let mut surface = RecordingSurface::default();
        let stats = render_scene(Some(&mut surface), &frame(&scene, &projection));
        assert_eq!(stats.visible_nodes, 1);
    }

    #[test]
    fn empty_graph_draws_only_background() {
        let graph = RiskGraph::default();
        let scene = Scene::from_graph(&graph);
        let projection = project(&scene, &[], Viewport::default());

        let mut surface = RecordingSurface::default();
        let stats = render_scene(Some(&mut surface), &frame(&scene, &projection));
        assert_eq!(stats, RenderStats::default());
        assert_eq!(surface.ops, [DrawOp::Background]);
    }

    #[test]
    fn missing_surface_is_a_no_op() {
        let graph = scenario_graph();
        let scene = Scene::from_graph(&graph);
        let projection = project(&scene, &[Vec2::ZERO; 3], Viewport::default());

        assert_eq!(render_scene(None, &frame(&scene, &projection)), RenderStats::default());
    }

    #[test]
    fn projection_scales_radii_and_hit_tests() {
        let graph = scenario_graph();
        let scene = Scene::from_graph(&graph);
        let a = graph.index_by_id["a"];
        let mut world = vec![vec2(300.0, 300.0); 3];
        world[a] = Vec2::ZERO;
        let viewport = Viewport {
            pan: vec2(10.0, 0.0),
            zoom: 2.0,
        };
        let projection = project(&scene, &world, viewport);

        assert_eq!(projection.positions[a], pos2(410.0, 300.0));
        assert_eq!(projection.radii[a], scene.nodes[a].style.radius * 2.0);
        assert_eq!(projection.hit_test(pos2(420.0, 305.0)), Some(a));
        assert_eq!(projection.hit_test(pos2(10.0, 10.0)), None);
    }

    fn scenario_model() -> ViewModel {
        ViewModel::new(scenario_graph(), SimulationParams::default())
    }

    #[test]
    fn drag_pin_is_applied_before_the_frame_ticks() {
        let mut model = scenario_model();
        let b = model.graph.index_by_id["b"];
        let frame_dt = 1.0 / 60.0;
        for _ in 0..5 {
            model.step_layout(frame_dt);
        }

        let grab = vec2(120.0, -40.0);
        let intents = model.drag.begin(b, grab);
        model.pending_intents.extend(intents);
        let ticks = model.step_layout(frame_dt);
        assert_eq!(ticks.physics, 1);
        assert_eq!(model.simulation.phase(), SimulationPhase::Perturbed);
        assert_eq!(model.simulation.position(b), Some(grab));

        let target = vec2(-75.5, 210.0);
        model.pending_intents.extend(model.drag.update(b, target));
        for _ in 0..10 {
            model.step_layout(frame_dt);
            assert_eq!(model.simulation.position(b), Some(target));
        }
        assert!(model.pending_intents.is_empty());

        let released = model.drag.end_all();
        model.pending_intents.extend(released);
        model.step_layout(frame_dt);
        model.step_layout(frame_dt);
        assert_eq!(model.simulation.phase(), SimulationPhase::Running);
        assert!(!model.simulation.is_pinned(b));
        assert_ne!(model.simulation.position(b), Some(target));
    }

    #[test]
    fn paused_physics_still_applies_pins() {
        let mut model = scenario_model();
        model.live_physics = false;
        let a = model.graph.index_by_id["a"];
        let target = vec2(33.0, 44.0);
        let intents = model.drag.begin(a, target);
        model.pending_intents.extend(intents);

        let ticks = model.step_layout(1.0 / 30.0);
        assert_eq!(ticks.physics, 2);
        assert_eq!(model.simulation.position(a), Some(target));
    }

    #[test]
    fn teardown_stops_layout_and_clears_drags() {
        let mut model = scenario_model();
        let a = model.graph.index_by_id["a"];
        let intents = model.drag.begin(a, Vec2::ZERO);
        model.pending_intents.extend(intents);

        model.teardown();
        assert!(!model.clock.is_running());
        assert!(!model.drag.is_dragging());
        assert!(model.pending_intents.is_empty());
        assert_eq!(model.simulation.phase(), SimulationPhase::Stopped);
        assert_eq!(model.step_layout(1.0 / 60.0).physics, 0);
    }
}
