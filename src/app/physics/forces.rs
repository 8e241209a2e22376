use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

/// Deterministic LCG used to break exact overlaps.
#[derive(Clone, Debug)]
pub(super) struct Jiggle {
    state: u32,
}

impl Jiggle {
    pub(super) fn new(seed: u64) -> Self {
        Self {
            state: (seed ^ (seed >> 32)) as u32,
        }
    }

    fn next_unit(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.state as f32 / 4_294_967_296.0
    }

    pub(super) fn offset(&mut self) -> f32 {
        (self.next_unit() - 0.5) * 1.0e-6
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct SimLink {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) strength: f32,
    pub(super) bias: f32,
}

/// Builds links with per-link strength `1 / min(count)` and a bias that moves
/// the less connected endpoint further, skipping self-loops and bad indices.
pub(super) fn build_links(node_count: usize, edges: &[(usize, usize)]) -> Vec<SimLink> {
    let valid = |&&(source, target): &&(usize, usize)| {
        source != target && source < node_count && target < node_count
    };

    let mut counts = vec![0u32; node_count];
    for &(source, target) in edges.iter().filter(valid) {
        counts[source] += 1;
        counts[target] += 1;
    }

    edges
        .iter()
        .filter(valid)
        .map(|&(source, target)| {
            let source_count = counts[source] as f32;
            let target_count = counts[target] as f32;
            SimLink {
                source,
                target,
                strength: 1.0 / source_count.min(target_count),
                bias: source_count / (source_count + target_count),
            }
        })
        .collect()
}

pub(super) fn apply_links(
    links: &[SimLink],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    distance: f32,
    alpha: f32,
    jiggle: &mut Jiggle,
) {
    for link in links {
        let mut delta = (positions[link.target] + velocities[link.target])
            - (positions[link.source] + velocities[link.source]);
        if delta.x == 0.0 {
            delta.x = jiggle.offset();
        }
        if delta.y == 0.0 {
            delta.y = jiggle.offset();
        }

        let length = delta.length();
        let pull = delta * ((length - distance) / length * alpha * link.strength);
        velocities[link.target] -= pull * link.bias;
        velocities[link.source] += pull * (1.0 - link.bias);
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct ChargeParams {
    /// Strength times alpha; negative repels.
    pub(super) weight: f32,
    pub(super) theta: f32,
    pub(super) distance_min_sq: f32,
}

fn charge_between(point: Vec2, other: Vec2, weight: f32, distance_min_sq: f32) -> Vec2 {
    let delta = other - point;
    let distance_sq = delta.length_sq().max(distance_min_sq);
    delta * (weight / distance_sq)
}

pub(super) fn accumulate_charge(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index != index {
                *velocity += charge_between(
                    point,
                    positions[other_index],
                    params.weight,
                    params.distance_min_sq,
                );
            }
        }
        return;
    }

    let distance = (node.center_of_mass - point).length().max(0.0001);
    let far_enough = !node.bounds.contains(point) && node.bounds.side_length() / distance < params.theta;
    if far_enough {
        *velocity += charge_between(
            point,
            node.center_of_mass,
            params.weight * node.mass,
            params.distance_min_sq,
        );
        return;
    }

    for child in node.children() {
        accumulate_charge(child, index, positions, params, velocity);
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) padding: f32,
}

fn separation_direction(from: usize, to: usize, delta: Vec2, distance: f32) -> Vec2 {
    if distance > 0.0001 {
        delta / distance
    } else {
        let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
        vec2(angle.cos(), angle.sin())
    }
}

fn collide_pair(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    let delta = positions[from] - positions[to];
    let distance = delta.length();
    let min_distance = radii[from] + radii[to] + params.padding;
    if distance >= min_distance {
        return;
    }

    let direction = separation_direction(from, to, delta, distance);
    let push = direction * ((min_distance - distance) * params.strength * 0.5);
    velocities[from] += push;
    velocities[to] -= push;
}

/// Dual-tree walk over leaf pairs whose boxes are within collision reach.
pub(super) fn accumulate_collisions(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    let reach = node_a.max_radius + node_b.max_radius + params.padding;
    if node_a.bounds.gap_to(node_b.bounds) > reach {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    collide_pair(from, to, positions, radii, params, velocities);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    collide_pair(from, to, positions, radii, params, velocities);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (offset, child_a) in children.iter().enumerate() {
            accumulate_collisions(child_a, child_a, true, positions, radii, params, velocities);
            for child_b in &children[offset + 1..] {
                accumulate_collisions(child_a, child_b, false, positions, radii, params, velocities);
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children() {
            accumulate_collisions(child, node_b, false, positions, radii, params, velocities);
        }
    } else {
        for child in node_b.children() {
            accumulate_collisions(node_a, child, false, positions, radii, params, velocities);
        }
    }
}

/// Translation that moves the mean position toward `center`.
pub(super) fn center_shift(positions: &[Vec2], center: Vec2, strength: f32) -> Vec2 {
    if positions.is_empty() {
        return Vec2::ZERO;
    }

    let mean = positions.iter().fold(Vec2::ZERO, |sum, &point| sum + point) / positions.len() as f32;
    (center - mean) * strength
}
