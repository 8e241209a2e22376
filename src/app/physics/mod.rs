//! Force-directed layout as an explicit state machine.
//!
//! `Initializing -> Running <-> Perturbed -> Stopped`. Each tick cools
//! `alpha` toward `alpha_target`, applies link, charge, collision and
//! centering forces, then integrates with velocity decay. Pinned nodes are
//! written to their pin target on every tick. The tick contains no
//! unseeded randomness: the same graph, seed and parameters replay the same
//! positions.

mod forces;
mod quadtree;

use eframe::egui::{Vec2, vec2};

use crate::util::stable_pair;
use forces::{
    ChargeParams, CollisionParams, Jiggle, SimLink, accumulate_charge, accumulate_collisions,
    apply_links, build_links, center_shift,
};
pub(in crate::app) use quadtree::QuadtreeCell;
use quadtree::{QuadNode, collect_cells};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SimulationParams {
    pub(in crate::app) link_distance: f32,
    pub(in crate::app) charge_strength: f32,
    pub(in crate::app) theta: f32,
    pub(in crate::app) distance_min: f32,
    pub(in crate::app) collision_strength: f32,
    pub(in crate::app) collision_padding: f32,
    pub(in crate::app) center_strength: f32,
    pub(in crate::app) velocity_decay: f32,
    pub(in crate::app) alpha_min: f32,
    pub(in crate::app) alpha_decay: f32,
    pub(in crate::app) drag_alpha_target: f32,
    pub(in crate::app) initial_radius: f32,
    pub(in crate::app) seed: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            link_distance: 140.0,
            charge_strength: -420.0,
            theta: 0.9,
            distance_min: 1.0,
            collision_strength: 0.7,
            collision_padding: 2.0,
            center_strength: 1.0,
            velocity_decay: 0.4,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            drag_alpha_target: 0.3,
            initial_radius: 10.0,
            seed: 0x5eed,
        }
    }
}

impl SimulationParams {
    pub(in crate::app) fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum SimulationPhase {
    Initializing,
    Running,
    Perturbed,
    Stopped,
}

impl SimulationPhase {
    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Perturbed => "perturbed",
            Self::Stopped => "stopped",
        }
    }
}

/// Requests from the interaction layer, applied before the next tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum SimulationIntent {
    Reheat,
    Cool,
    Pin { index: usize, position: Vec2 },
    Unpin { index: usize },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct NodeSeed<'a> {
    pub(in crate::app) id: &'a str,
    pub(in crate::app) radius: f32,
}

#[derive(Clone, Debug)]
struct SimNode {
    position: Vec2,
    velocity: Vec2,
    radius: f32,
    pin: Option<Vec2>,
}

#[derive(Clone, Debug, Default)]
struct Scratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    radii: Vec<f32>,
}

#[derive(Clone, Debug)]
pub(in crate::app) struct Simulation {
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    params: SimulationParams,
    phase: SimulationPhase,
    alpha: f32,
    alpha_target: f32,
    jiggle: Jiggle,
    scratch: Scratch,
}

impl Simulation {
    pub(in crate::app) fn new(
        seeds: &[NodeSeed<'_>],
        edges: &[(usize, usize)],
        params: SimulationParams,
    ) -> Self {
        let nodes = seeds
            .iter()
            .enumerate()
            .map(|(index, seed)| SimNode {
                position: initial_position(index, seed.id, &params),
                velocity: Vec2::ZERO,
                radius: seed.radius,
                pin: None,
            })
            .collect::<Vec<_>>();

        Self {
            links: build_links(nodes.len(), edges),
            nodes,
            params,
            phase: SimulationPhase::Initializing,
            alpha: 1.0,
            alpha_target: 0.0,
            jiggle: Jiggle::new(params.seed),
            scratch: Scratch::default(),
        }
    }

    pub(in crate::app) fn phase(&self) -> SimulationPhase {
        self.phase
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn params(&self) -> SimulationParams {
        self.params
    }

    pub(in crate::app) fn set_params(&mut self, params: SimulationParams) {
        self.params = params;
    }

    pub(in crate::app) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(in crate::app) fn position(&self, index: usize) -> Option<Vec2> {
        self.nodes.get(index).map(|node| node.position)
    }

    pub(in crate::app) fn positions_into(&self, out: &mut Vec<Vec2>) {
        out.clear();
        out.extend(self.nodes.iter().map(|node| node.position));
    }

    pub(in crate::app) fn is_pinned(&self, index: usize) -> bool {
        self.nodes.get(index).is_some_and(|node| node.pin.is_some())
    }

    /// Settled once alpha has cooled below `alpha_min` with nothing
    /// holding it up.
    pub(in crate::app) fn is_settled(&self) -> bool {
        self.alpha < self.params.alpha_min && self.alpha_target < self.params.alpha_min
    }

    pub(in crate::app) fn apply(&mut self, intent: SimulationIntent) {
        if self.phase == SimulationPhase::Stopped {
            return;
        }

        match intent {
            SimulationIntent::Reheat => {
                self.alpha_target = self.params.drag_alpha_target;
                self.phase = SimulationPhase::Perturbed;
            }
            SimulationIntent::Cool => {
                self.alpha_target = 0.0;
                if self.phase == SimulationPhase::Perturbed {
                    self.phase = SimulationPhase::Running;
                }
            }
            SimulationIntent::Pin { index, position } => {
                if let Some(node) = self.nodes.get_mut(index)
                    && position.is_finite()
                {
                    node.pin = Some(position);
                    node.position = position;
                    node.velocity = Vec2::ZERO;
                }
            }
            SimulationIntent::Unpin { index } => {
                if let Some(node) = self.nodes.get_mut(index) {
                    node.pin = None;
                }
            }
        }
    }

    /// Resets alpha to full energy without touching the drag target.
    pub(in crate::app) fn restart(&mut self) {
        if self.phase != SimulationPhase::Stopped {
            self.alpha = 1.0;
        }
    }

    pub(in crate::app) fn stop(&mut self) {
        self.phase = SimulationPhase::Stopped;
    }

    /// Advances one step. Returns `false` when nothing moved because the
    /// simulation is stopped or settled.
    pub(in crate::app) fn tick(&mut self) -> bool {
        match self.phase {
            SimulationPhase::Stopped => return false,
            SimulationPhase::Initializing => self.phase = SimulationPhase::Running,
            SimulationPhase::Running | SimulationPhase::Perturbed => {}
        }

        if self.is_settled() || self.nodes.is_empty() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
        let params = self.params;
        let alpha = self.alpha;

        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        scratch.radii.clear();
        for node in &self.nodes {
            scratch.positions.push(node.position);
            scratch.velocities.push(node.velocity);
            scratch.radii.push(node.radius);
        }

        apply_links(
            &self.links,
            &scratch.positions,
            &mut scratch.velocities,
            params.link_distance,
            alpha,
            &mut self.jiggle,
        );

        if let Some(tree) = QuadNode::build(&scratch.positions, &scratch.radii) {
            let charge = ChargeParams {
                weight: params.charge_strength * alpha,
                theta: params.theta,
                distance_min_sq: params.distance_min * params.distance_min,
            };
            for (index, velocity) in scratch.velocities.iter_mut().enumerate() {
                accumulate_charge(&tree, index, &scratch.positions, charge, velocity);
            }

            if params.collision_strength > 0.0 {
                accumulate_collisions(
                    &tree,
                    &tree,
                    true,
                    &scratch.positions,
                    &scratch.radii,
                    CollisionParams {
                        strength: params.collision_strength,
                        padding: params.collision_padding,
                    },
                    &mut scratch.velocities,
                );
            }
        }

        let shift = center_shift(&scratch.positions, Vec2::ZERO, params.center_strength);
        let retain = 1.0 - params.velocity_decay.clamp(0.0, 1.0);
        for (node, &velocity) in self.nodes.iter_mut().zip(&scratch.velocities) {
            if let Some(pin) = node.pin {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }

            node.velocity = velocity * retain;
            node.position += shift + node.velocity;
        }

        true
    }

    pub(in crate::app) fn quadtree_cells(&mut self, cells: &mut Vec<QuadtreeCell>) {
        cells.clear();
        self.scratch.positions.clear();
        self.scratch.radii.clear();
        for node in &self.nodes {
            self.scratch.positions.push(node.position);
            self.scratch.radii.push(node.radius);
        }

        if let Some(tree) = QuadNode::build(&self.scratch.positions, &self.scratch.radii) {
            collect_cells(&tree, 0, cells);
        }
    }
}

/// Phyllotaxis spiral with a small seeded offset per id.
fn initial_position(index: usize, id: &str, params: &SimulationParams) -> Vec2 {
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    let radius = params.initial_radius * (0.5 + index as f32).sqrt();
    let angle = index as f32 * golden_angle;
    let (jx, jy) = stable_pair(id, params.seed);
    vec2(angle.cos(), angle.sin()) * radius + vec2(jx, jy) * (params.initial_radius * 0.5)
}
