use eframe::egui::{
    Align2, Color32, CornerRadius, FontId, Painter, Pos2, Rect, Shape, Stroke, StrokeKind, Vec2,
    vec2,
};

use super::encoding::{DashPattern, RiskTier};
use super::render_utils::{BACKGROUND, GRID_LINE, grid_lines, grid_step, with_alpha};

/// Drawing target for the scene renderer.
pub(in crate::app) trait SceneSurface {
    fn background(&mut self, pan: Vec2, zoom: f32);
    fn dashed_line(&mut self, from: Pos2, to: Pos2, stroke: Stroke, dash: DashPattern, offset: f32);
    fn glow(&mut self, center: Pos2, radius: f32, color: Color32);
    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, outline: Stroke);
    fn arrow(&mut self, tip: Pos2, direction: Vec2, size: f32, color: Color32);
    fn label(&mut self, anchor: Pos2, text: &str, color: Color32);
    fn tooltip(&mut self, anchor: Pos2, title: &str, tier: RiskTier, lines: &[String]);
}

pub(in crate::app) struct PainterSurface<'a> {
    painter: &'a Painter,
    rect: Rect,
}

impl<'a> PainterSurface<'a> {
    pub(in crate::app) fn new(painter: &'a Painter, rect: Rect) -> Self {
        Self { painter, rect }
    }
}

impl SceneSurface for PainterSurface<'_> {
    fn background(&mut self, pan: Vec2, zoom: f32) {
        let rect = self.rect;
        self.painter.rect_filled(rect, 0.0, BACKGROUND);

        let step = grid_step(zoom);
        let origin = rect.center() + pan;
        let stroke = Stroke::new(1.0, GRID_LINE);
        for x in grid_lines(origin.x, rect.left(), rect.right(), step) {
            self.painter
                .line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        }
        for y in grid_lines(origin.y, rect.top(), rect.bottom(), step) {
            self.painter
                .line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        }
    }

    fn dashed_line(&mut self, from: Pos2, to: Pos2, stroke: Stroke, dash: DashPattern, offset: f32) {
        self.painter
            .extend(flowing_dashes(from, to, stroke, dash, offset));
    }

    fn glow(&mut self, center: Pos2, radius: f32, color: Color32) {
        for (spread, alpha) in [(2.2_f32, 22_u8), (1.6, 44), (1.25, 70)] {
            self.painter
                .circle_filled(center, radius * spread, with_alpha(color, alpha));
        }
    }

    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, outline: Stroke) {
        self.painter.circle(center, radius, fill, outline);
    }

    fn arrow(&mut self, tip: Pos2, direction: Vec2, size: f32, color: Color32) {
        let direction = direction.normalized();
        let normal = direction.rot90();
        let base = tip - direction * size;
        self.painter.add(Shape::convex_polygon(
            vec![
                tip,
                base + normal * (size * 0.5),
                base - normal * (size * 0.5),
            ],
            color,
            Stroke::NONE,
        ));
    }

    fn label(&mut self, anchor: Pos2, text: &str, color: Color32) {
        self.painter.text(
            anchor,
            Align2::LEFT_CENTER,
            text,
            FontId::proportional(12.0),
            color,
        );
    }

    fn tooltip(&mut self, anchor: Pos2, title: &str, tier: RiskTier, lines: &[String]) {
        let padding = vec2(12.0, 10.0);
        let line_height = 17.0;
        let title_galley =
            self.painter
                .layout_no_wrap(title.to_owned(), FontId::proportional(14.0), Color32::from_rgb(0x60, 0xa5, 0xfa));
        let line_galleys = lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let color = if index == 0 {
                    tier.color()
                } else {
                    Color32::from_rgb(0xcb, 0xd5, 0xe1)
                };
                self.painter
                    .layout_no_wrap(line.clone(), FontId::proportional(13.0), color)
            })
            .collect::<Vec<_>>();

        let width = line_galleys
            .iter()
            .map(|galley| galley.size().x)
            .fold(title_galley.size().x, f32::max);
        let height = title_galley.size().y + 6.0 + line_height * line_galleys.len() as f32;
        let size = vec2(width, height) + padding * 2.0;

        // Keep the box on screen, flipping to the left/top of the pointer near edges.
        let mut min = anchor + vec2(12.0, 12.0);
        if min.x + size.x > self.rect.right() {
            min.x = anchor.x - 12.0 - size.x;
        }
        if min.y + size.y > self.rect.bottom() {
            min.y = anchor.y - 12.0 - size.y;
        }
        let frame = Rect::from_min_size(min, size);

        self.painter.rect(
            frame,
            CornerRadius::same(12),
            Color32::from_rgba_unmultiplied(30, 58, 138, 242),
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(59, 130, 246, 80)),
            StrokeKind::Outside,
        );

        let mut cursor = frame.min + padding;
        let title_height = title_galley.size().y;
        self.painter.galley(cursor, title_galley, Color32::WHITE);
        cursor.y += title_height + 6.0;
        for galley in line_galleys {
            self.painter.galley(cursor, galley, Color32::WHITE);
            cursor.y += line_height;
        }
    }
}

/// Length of the dash that wraps around to the start of the line when the
/// pattern is shifted by `offset`.
fn lead_in_length(dash: DashPattern, offset: f32) -> f32 {
    (offset - dash.gap).clamp(0.0, dash.dash)
}

/// Dashes along `from -> to` with the pattern shifted by `offset`. egui leaves
/// `[0, offset)` blank, so the wrapped part of the previous dash is added as
/// its own segment.
fn flowing_dashes(from: Pos2, to: Pos2, stroke: Stroke, dash: DashPattern, offset: f32) -> Vec<Shape> {
    let period = dash.period();
    if period <= f32::EPSILON || !offset.is_finite() {
        return vec![Shape::line_segment([from, to], stroke)];
    }

    let offset = offset.rem_euclid(period);
    let length = from.distance(to);
    let mut shapes = Vec::new();
    let lead_in = lead_in_length(dash, offset).min(length);
    if lead_in > 0.0 {
        let direction = (to - from) / length;
        shapes.push(Shape::line_segment([from, from + direction * lead_in], stroke));
    }
    if offset < length {
        shapes.extend(Shape::dashed_line_with_offset(
            &[from, to],
            stroke,
            &[dash.dash],
            &[dash.gap],
            offset,
        ));
    }
    shapes
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    const DASH: DashPattern = DashPattern { dash: 4.0, gap: 6.0 };

    fn first_segment(shapes: &[Shape]) -> Option<[Pos2; 2]> {
        shapes.iter().find_map(|shape| match shape {
            Shape::LineSegment { points, .. } => Some(*points),
            _ => None,
        })
    }

    #[test]
    fn lead_in_covers_wrapped_part_of_the_dash() {
        assert_eq!(lead_in_length(DASH, 0.0), 0.0);
        assert_eq!(lead_in_length(DASH, 5.0), 0.0);
        assert_eq!(lead_in_length(DASH, 9.0), 3.0);
    }

    #[test]
    fn shifted_dashes_start_at_the_source_when_wrapped() {
        let from = pos2(0.0, 0.0);
        let to = pos2(100.0, 0.0);
        let stroke = Stroke::new(1.0, Color32::WHITE);

        let at_rest = flowing_dashes(from, to, stroke, DASH, 0.0);
        assert_eq!(first_segment(&at_rest).map(|points| points[0]), Some(from));

        let wrapped = flowing_dashes(from, to, stroke, DASH, 9.0);
        assert_eq!(first_segment(&wrapped), Some([from, pos2(3.0, 0.0)]));

        // a full period behind is the same phase as no offset
        let full_turn = flowing_dashes(from, to, stroke, DASH, -10.0);
        assert_eq!(first_segment(&full_turn).map(|points| points[0]), Some(from));
    }

    #[test]
    fn short_edges_clip_the_lead_in() {
        let from = pos2(0.0, 0.0);
        let to = pos2(2.0, 0.0);
        let stroke = Stroke::new(1.0, Color32::WHITE);

        let shapes = flowing_dashes(from, to, stroke, DASH, 9.0);
        assert_eq!(shapes.len(), 1);
        assert_eq!(first_segment(&shapes), Some([from, to]));
    }
}

#[cfg(test)]
pub(in crate::app) mod recording {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    pub(in crate::app) enum DrawOp {
        Background,
        DashedLine {
            stroke: Stroke,
            dash: DashPattern,
            offset: f32,
        },
        Glow {
            center: Pos2,
        },
        Circle {
            center: Pos2,
            radius: f32,
            fill: Color32,
        },
        Arrow {
            tip: Pos2,
            color: Color32,
        },
        Label(String),
        Tooltip {
            title: String,
            tier: RiskTier,
            lines: Vec<String>,
        },
    }

    #[derive(Default)]
    pub(in crate::app) struct RecordingSurface {
        pub(in crate::app) ops: Vec<DrawOp>,
    }

    impl SceneSurface for RecordingSurface {
        fn background(&mut self, _pan: Vec2, _zoom: f32) {
            self.ops.push(DrawOp::Background);
        }

        fn dashed_line(&mut self, _from: Pos2, _to: Pos2, stroke: Stroke, dash: DashPattern, offset: f32) {
            self.ops.push(DrawOp::DashedLine {
                stroke,
                dash,
                offset,
            });
        }

        fn glow(&mut self, center: Pos2, _radius: f32, _color: Color32) {
            self.ops.push(DrawOp::Glow { center });
        }

        fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, _outline: Stroke) {
            self.ops.push(DrawOp::Circle {
                center,
                radius,
                fill,
            });
        }

        fn arrow(&mut self, tip: Pos2, _direction: Vec2, _size: f32, color: Color32) {
            self.ops.push(DrawOp::Arrow { tip, color });
        }

        fn label(&mut self, _anchor: Pos2, text: &str, _color: Color32) {
            self.ops.push(DrawOp::Label(text.to_owned()));
        }

        fn tooltip(&mut self, _anchor: Pos2, title: &str, tier: RiskTier, lines: &[String]) {
            self.ops.push(DrawOp::Tooltip {
                title: title.to_owned(),
                tier,
                lines: lines.to_vec(),
            });
        }
    }
}
