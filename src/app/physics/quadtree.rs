use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    fn from_points(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = match quadrant {
            0 => vec2(-quarter, -quarter),
            1 => vec2(quarter, -quarter),
            2 => vec2(-quarter, quarter),
            _ => vec2(quarter, quarter),
        };

        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) + 2 * usize::from(point.y >= self.center.y)
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Gap between two boxes, zero when they overlap.
    pub(super) fn gap_to(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let dx = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        vec2(dx, dy).length()
    }
}

/// Barnes-Hut cell. Leaves keep their node indices, inner cells only their
/// aggregate mass and the largest radius beneath them.
pub(super) struct QuadNode {
    pub(super) bounds: QuadBounds,
    pub(super) center_of_mass: Vec2,
    pub(super) mass: f32,
    pub(super) max_radius: f32,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct QuadtreeCell {
    pub(in crate::app) center: Vec2,
    pub(in crate::app) half_extent: f32,
    pub(in crate::app) depth: usize,
    pub(in crate::app) is_leaf: bool,
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2], radii: &[f32]) -> Option<Self> {
        let bounds = QuadBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, radii, 0))
    }

    fn build_node(
        bounds: QuadBounds,
        indices: Vec<usize>,
        positions: &[Vec2],
        radii: &[f32],
        depth: usize,
    ) -> Self {
        let mut center_of_mass = Vec2::ZERO;
        let mut max_radius = 0.0_f32;
        for &index in &indices {
            center_of_mass += positions[index];
            max_radius = max_radius.max(radii.get(index).copied().unwrap_or(0.0));
        }

        let mass = indices.len() as f32;
        if mass > 0.0 {
            center_of_mass /= mass;
        }

        let mut node = Self {
            bounds,
            center_of_mass,
            mass,
            max_radius,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || node.indices.len() <= LEAF_CAPACITY {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &node.indices {
            buckets[bounds.quadrant_for(positions[index])].push(index);
        }

        // Coincident points would split forever; keep them in one leaf.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }

            node.children[quadrant] = Some(Box::new(Self::build_node(
                bounds.child(quadrant),
                bucket,
                positions,
                radii,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &QuadNode> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}

pub(super) fn collect_cells(node: &QuadNode, depth: usize, cells: &mut Vec<QuadtreeCell>) {
    cells.push(QuadtreeCell {
        center: node.bounds.center,
        half_extent: node.bounds.half_extent,
        depth,
        is_leaf: node.is_leaf(),
    });

    for child in node.children() {
        collect_cells(child, depth + 1, cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_aggregates_mass_and_radius() {
        let positions = (0..40)
            .map(|index| vec2((index % 8) as f32 * 30.0, (index / 8) as f32 * 30.0))
            .collect::<Vec<_>>();
        let radii = (0..40).map(|index| 8.0 + index as f32 * 0.25).collect::<Vec<_>>();
        let tree = QuadNode::build(&positions, &radii).expect("finite points");

        assert_eq!(tree.mass, 40.0);
        assert!(!tree.is_leaf());
        assert_eq!(tree.max_radius, radii[39]);
        let child_mass = tree.children().map(|child| child.mass).sum::<f32>();
        assert_eq!(child_mass, 40.0);
        for &point in &positions {
            assert!(tree.bounds.contains(point));
        }
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![vec2(5.0, 5.0); 20];
        let radii = vec![8.0; 20];
        let tree = QuadNode::build(&positions, &radii).expect("finite points");
        assert!(tree.is_leaf());
        assert_eq!(tree.indices.len(), 20);
    }

    #[test]
    fn empty_or_non_finite_input_builds_nothing() {
        assert!(QuadNode::build(&[], &[]).is_none());
        assert!(QuadNode::build(&[vec2(f32::NAN, 0.0)], &[8.0]).is_none());
    }
}
