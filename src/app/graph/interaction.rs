use eframe::egui::{self, Pos2, Rect, Ui, Vec2};

use super::super::ViewModel;
use super::super::physics::SimulationIntent;
use super::super::render_utils::{screen_to_world, world_to_screen};

pub(in crate::app) const MIN_ZOOM: f32 = 0.3;
pub(in crate::app) const MAX_ZOOM: f32 = 4.0;

/// Pan/zoom transform applied to the whole scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Viewport {
    pub(in crate::app) pan: Vec2,
    pub(in crate::app) zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub(in crate::app) fn to_screen(&self, rect: Rect, world: Vec2) -> Pos2 {
        world_to_screen(rect, self.pan, self.zoom, world)
    }

    pub(in crate::app) fn to_world(&self, rect: Rect, screen: Pos2) -> Vec2 {
        screen_to_world(rect, self.pan, self.zoom, screen)
    }

    /// Out-of-range values clamp instead of being rejected.
    pub(in crate::app) fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Zooms by `factor` keeping the world point under `anchor` fixed.
    pub(in crate::app) fn zoom_about(&mut self, rect: Rect, anchor: Pos2, factor: f32) {
        let world_before = self.to_world(rect, anchor);
        self.set_zoom(self.zoom * factor);
        self.pan = anchor - rect.center() - (world_before * self.zoom);
    }

    pub(in crate::app) fn pan_by(&mut self, delta: Vec2) {
        if delta.is_finite() {
            self.pan += delta;
        }
    }
}

/// Tracks active node drags and turns them into simulation intents.
/// Energy is raised on the first drag and released after the last.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct DragController {
    active: Vec<usize>,
}

impl DragController {
    pub(in crate::app) fn begin(&mut self, index: usize, world: Vec2) -> Vec<SimulationIntent> {
        let mut intents = Vec::with_capacity(2);
        if !self.active.contains(&index) {
            if self.active.is_empty() {
                intents.push(SimulationIntent::Reheat);
            }
            self.active.push(index);
        }
        intents.push(SimulationIntent::Pin {
            index,
            position: world,
        });
        intents
    }

    pub(in crate::app) fn update(&self, index: usize, world: Vec2) -> Option<SimulationIntent> {
        self.active.contains(&index).then_some(SimulationIntent::Pin {
            index,
            position: world,
        })
    }

    pub(in crate::app) fn end(&mut self, index: usize) -> Vec<SimulationIntent> {
        let Some(slot) = self.active.iter().position(|&active| active == index) else {
            return Vec::new();
        };

        self.active.remove(slot);
        let mut intents = vec![SimulationIntent::Unpin { index }];
        if self.active.is_empty() {
            intents.push(SimulationIntent::Cool);
        }
        intents
    }

    pub(in crate::app) fn end_all(&mut self) -> Vec<SimulationIntent> {
        let mut intents = Vec::new();
        while let Some(&index) = self.active.first() {
            intents.extend(self.end(index));
        }
        intents
    }

    /// Forgets every drag without emitting intents, for a view being torn down.
    pub(in crate::app) fn clear(&mut self) {
        self.active.clear();
    }

    pub(in crate::app) fn primary(&self) -> Option<usize> {
        self.active.first().copied()
    }

    pub(in crate::app) fn is_dragging(&self) -> bool {
        !self.active.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct TooltipState {
    pub(in crate::app) node: usize,
    pub(in crate::app) pointer: Pos2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum HoverEvent {
    Enter(usize),
    Move,
    Leave,
    Idle,
}

#[derive(Clone, Debug, Default)]
pub(in crate::app) struct HoverTracker {
    state: Option<TooltipState>,
}

impl HoverTracker {
    pub(in crate::app) fn update(&mut self, hit: Option<usize>, pointer: Option<Pos2>) -> HoverEvent {
        match (hit, pointer) {
            (Some(node), Some(pointer)) => match &mut self.state {
                Some(state) if state.node == node => {
                    state.pointer = pointer;
                    HoverEvent::Move
                }
                _ => {
                    self.state = Some(TooltipState { node, pointer });
                    HoverEvent::Enter(node)
                }
            },
            _ => {
                if self.state.take().is_some() {
                    HoverEvent::Leave
                } else {
                    HoverEvent::Idle
                }
            }
        }
    }

    pub(in crate::app) fn state(&self) -> Option<TooltipState> {
        self.state
    }

    pub(in crate::app) fn clear(&mut self) {
        self.state = None;
    }
}

/// Closest node whose disc contains `pointer`.
pub(in crate::app) fn hit_test(positions: &[Pos2], radii: &[f32], pointer: Pos2) -> Option<usize> {
    positions
        .iter()
        .zip(radii)
        .enumerate()
        .filter_map(|(index, (position, radius))| {
            let distance = position.distance(pointer);
            (distance <= *radius).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.viewport.zoom_about(rect, pointer, factor);
    }

    /// Routes primary drags to node pins or canvas panning and returns the
    /// click target, `Some(None)` for a click on empty canvas.
    pub(in crate::app) fn handle_graph_pointer(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) -> Option<Option<usize>> {
        let pointer = response
            .interact_pointer_pos()
            .or_else(|| ui.input(|input| input.pointer.hover_pos()));
        let projection = &self.view_scratch.projection;

        if response.drag_started_by(egui::PointerButton::Primary) {
            let origin = ui.input(|input| input.pointer.press_origin()).or(pointer);
            match (origin.and_then(|origin| projection.hit_test(origin)), pointer) {
                (Some(index), Some(pointer)) => {
                    let world = self.viewport.to_world(rect, pointer);
                    self.pending_intents.extend(self.drag.begin(index, world));
                }
                _ => self.panning = true,
            }
        }

        if response.dragged_by(egui::PointerButton::Primary) {
            if let (Some(index), Some(pointer)) = (self.drag.primary(), pointer) {
                let world = self.viewport.to_world(rect, pointer);
                self.pending_intents.extend(self.drag.update(index, world));
            } else if self.panning {
                self.viewport.pan_by(response.drag_delta());
            }
        }

        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.viewport.pan_by(response.drag_delta());
        }

        if response.drag_stopped() {
            self.pending_intents.extend(self.drag.end_all());
            self.panning = false;
        }

        if response.clicked_by(egui::PointerButton::Primary) {
            let projection = &self.view_scratch.projection;
            return Some(pointer.and_then(|pointer| projection.hit_test(pointer)));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    fn rect() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0))
    }

    #[test]
    fn zoom_is_clamped() {
        let mut viewport = Viewport::default();
        viewport.set_zoom(10.0);
        assert_eq!(viewport.zoom, MAX_ZOOM);
        viewport.set_zoom(0.01);
        assert_eq!(viewport.zoom, MIN_ZOOM);
        viewport.set_zoom(f32::NAN);
        assert_eq!(viewport.zoom, MIN_ZOOM);
        viewport.set_zoom(2.5);
        assert_eq!(viewport.zoom, 2.5);
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut viewport = Viewport {
            pan: vec2(20.0, -10.0),
            zoom: 1.0,
        };
        let anchor = pos2(600.0, 200.0);
        let world = viewport.to_world(rect(), anchor);

        viewport.zoom_about(rect(), anchor, 1.15);
        let after = viewport.to_screen(rect(), world);
        assert!((after - anchor).length() < 1e-3);

        for _ in 0..100 {
            viewport.zoom_about(rect(), anchor, 1.15);
        }
        assert_eq!(viewport.zoom, MAX_ZOOM);
        assert!((viewport.to_screen(rect(), world) - anchor).length() < 1e-2);
    }

    #[test]
    fn drag_raises_energy_only_for_first_and_releases_after_last() {
        let mut drag = DragController::default();
        let at = vec2(1.0, 2.0);

        assert_eq!(
            drag.begin(3, at),
            [
                SimulationIntent::Reheat,
                SimulationIntent::Pin {
                    index: 3,
                    position: at
                }
            ]
        );
        assert_eq!(
            drag.begin(5, at),
            [SimulationIntent::Pin {
                index: 5,
                position: at
            }]
        );
        assert_eq!(drag.end(3), [SimulationIntent::Unpin { index: 3 }]);
        assert!(drag.is_dragging());
        assert_eq!(
            drag.end(5),
            [SimulationIntent::Unpin { index: 5 }, SimulationIntent::Cool]
        );
        assert!(!drag.is_dragging());
        assert!(drag.end(5).is_empty());
    }

    #[test]
    fn drag_updates_only_for_active_nodes() {
        let mut drag = DragController::default();
        drag.begin(1, Vec2::ZERO);
        let target = vec2(40.0, -3.0);

        assert_eq!(
            drag.update(1, target),
            Some(SimulationIntent::Pin {
                index: 1,
                position: target
            })
        );
        assert_eq!(drag.update(2, target), None);
        assert_eq!(
            drag.end_all(),
            [SimulationIntent::Unpin { index: 1 }, SimulationIntent::Cool]
        );
    }

    #[test]
    fn clear_forgets_drags_silently() {
        let mut drag = DragController::default();
        drag.begin(3, Vec2::ZERO);
        drag.begin(4, Vec2::ZERO);

        drag.clear();
        assert!(!drag.is_dragging());
        assert!(drag.end_all().is_empty());
        assert_eq!(drag.update(3, Vec2::ZERO), None);
        // a fresh drag after clearing reheats again
        assert_eq!(drag.begin(4, Vec2::ZERO)[0], SimulationIntent::Reheat);
    }

    #[test]
    fn hover_enter_move_leave() {
        let mut hover = HoverTracker::default();
        assert_eq!(hover.update(None, Some(pos2(1.0, 1.0))), HoverEvent::Idle);
        assert_eq!(hover.update(Some(2), Some(pos2(5.0, 5.0))), HoverEvent::Enter(2));
        assert_eq!(hover.update(Some(2), Some(pos2(7.0, 6.0))), HoverEvent::Move);
        assert_eq!(
            hover.state(),
            Some(TooltipState {
                node: 2,
                pointer: pos2(7.0, 6.0)
            })
        );
        assert_eq!(hover.update(Some(4), Some(pos2(9.0, 9.0))), HoverEvent::Enter(4));
        assert_eq!(hover.update(None, None), HoverEvent::Leave);
        assert_eq!(hover.state(), None);
    }

    #[test]
    fn hit_test_picks_nearest_containing_disc() {
        let positions = [pos2(0.0, 0.0), pos2(10.0, 0.0), pos2(100.0, 100.0)];
        let radii = [8.0, 8.0, 8.0];
        assert_eq!(hit_test(&positions, &radii, pos2(7.0, 0.0)), Some(1));
        assert_eq!(hit_test(&positions, &radii, pos2(2.0, 1.0)), Some(0));
        assert_eq!(hit_test(&positions, &radii, pos2(50.0, 50.0)), None);
        assert_eq!(hit_test(&[], &[], pos2(0.0, 0.0)), None);
    }
}
