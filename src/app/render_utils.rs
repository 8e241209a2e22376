use eframe::egui::{Color32, Pos2, Rect, Vec2};

pub(in crate::app) const BACKGROUND: Color32 = Color32::from_rgb(0x0f, 0x17, 0x2a);
pub(in crate::app) const GRID_LINE: Color32 = Color32::from_rgba_premultiplied(12, 26, 49, 52);

pub(in crate::app) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(in crate::app) fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

/// Grid line offsets along one axis for a grid anchored at `origin`.
pub(in crate::app) fn grid_lines(origin: f32, start: f32, end: f32, step: f32) -> Vec<f32> {
    if step <= 0.0 || !step.is_finite() || end < start {
        return Vec::new();
    }

    let mut lines = Vec::new();
    let mut value = start + (origin - start).rem_euclid(step);
    while value < end {
        lines.push(value);
        value += step;
    }
    lines
}

pub(in crate::app) fn grid_step(zoom: f32) -> f32 {
    (40.0 * zoom.clamp(0.6, 1.8)).max(20.0)
}

pub(in crate::app) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius.max(0.0)).contains(position)
}

/// Clips the segment against `rect` grown by `padding` (Liang-Barsky).
pub(in crate::app) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let bounds = rect.expand(padding.max(0.0));
    let delta = end - start;
    let mut enter = 0.0_f32;
    let mut exit = 1.0_f32;

    let planes = [
        (-delta.x, start.x - bounds.left()),
        (delta.x, bounds.right() - start.x),
        (-delta.y, start.y - bounds.top()),
        (delta.y, bounds.bottom() - start.y),
    ];
    for (direction, distance) in planes {
        if direction == 0.0 {
            if distance < 0.0 {
                return false;
            }
            continue;
        }
        let t = distance / direction;
        if direction < 0.0 {
            enter = enter.max(t);
        } else {
            exit = exit.min(t);
        }
        if enter > exit {
            return false;
        }
    }
    true
}

pub(in crate::app) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(in crate::app) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}
