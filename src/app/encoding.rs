//! Pure mappings from the fused model to visual attributes.

use eframe::egui::Color32;

use crate::risk::{EdgePattern, WalletNode};
use crate::util::{format_percent, short_id};

pub(in crate::app) const MIN_NODE_RADIUS: f32 = 8.0;
pub(in crate::app) const MAX_NODE_RADIUS: f32 = 26.0;
pub(in crate::app) const MARKER_COLOR: Color32 = Color32::from_rgb(0xef, 0x44, 0x44);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) enum RiskTier {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub(in crate::app) const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// A missing score counts as zero.
    pub(in crate::app) fn from_risk(risk: Option<f64>) -> Self {
        let risk = risk.filter(|value| value.is_finite()).unwrap_or(0.0);
        if risk >= 0.85 {
            Self::Critical
        } else if risk >= 0.60 {
            Self::High
        } else if risk >= 0.30 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub(in crate::app) fn color(self) -> Color32 {
        match self {
            Self::Critical => Color32::from_rgb(0xdc, 0x26, 0x26),
            Self::High => Color32::from_rgb(0xf9, 0x73, 0x16),
            Self::Medium => Color32::from_rgb(0x22, 0xc5, 0x5e),
            Self::Low => Color32::from_rgb(0x25, 0x63, 0xeb),
        }
    }

    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub(in crate::app) fn range_label(self) -> &'static str {
        match self {
            Self::Critical => "≥85%",
            Self::High => "60-84%",
            Self::Medium => "30-59%",
            Self::Low => "<30%",
        }
    }

    pub(in crate::app) fn has_glow(self) -> bool {
        matches!(self, Self::Critical)
    }
}

/// Linear map from the loaded graph's degree extent onto node radii.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct RadiusScale {
    min_degree: f32,
    max_degree: f32,
}

impl RadiusScale {
    pub(in crate::app) fn from_range(range: Option<(usize, usize)>) -> Self {
        let (min, max) = range.unwrap_or((0, 0));
        Self {
            min_degree: min as f32,
            max_degree: max.max(min) as f32,
        }
    }

    pub(in crate::app) fn radius(&self, degree: usize) -> f32 {
        let span = self.max_degree - self.min_degree;
        if span <= f32::EPSILON {
            return (MIN_NODE_RADIUS + MAX_NODE_RADIUS) * 0.5;
        }

        let t = ((degree as f32 - self.min_degree) / span).clamp(0.0, 1.0);
        MIN_NODE_RADIUS + t * (MAX_NODE_RADIUS - MIN_NODE_RADIUS)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct DashPattern {
    pub(in crate::app) dash: f32,
    pub(in crate::app) gap: f32,
}

impl DashPattern {
    pub(in crate::app) fn period(self) -> f32 {
        self.dash + self.gap
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct EdgeStyle {
    pub(in crate::app) width: f32,
    pub(in crate::app) color: Color32,
    pub(in crate::app) dash: DashPattern,
    pub(in crate::app) marker: bool,
}

pub(in crate::app) fn edge_style(pattern: EdgePattern) -> EdgeStyle {
    match pattern {
        EdgePattern::Smurfing => EdgeStyle {
            width: 4.0,
            color: Color32::from_rgb(0xef, 0x44, 0x44),
            dash: DashPattern { dash: 4.0, gap: 6.0 },
            marker: true,
        },
        EdgePattern::Peeling => EdgeStyle {
            width: 3.0,
            color: Color32::from_rgb(0xa8, 0x55, 0xf7),
            dash: DashPattern { dash: 6.0, gap: 6.0 },
            marker: true,
        },
        EdgePattern::Normal => EdgeStyle {
            width: 1.2,
            color: Color32::from_rgb(0x64, 0x74, 0x8b),
            dash: DashPattern { dash: 4.0, gap: 6.0 },
            marker: false,
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct NodeStyle {
    pub(in crate::app) radius: f32,
    pub(in crate::app) tier: RiskTier,
    pub(in crate::app) fill: Color32,
    pub(in crate::app) glow: bool,
}

pub(in crate::app) fn node_style(node: &WalletNode, scale: &RadiusScale) -> NodeStyle {
    let tier = RiskTier::from_risk(node.final_risk);
    NodeStyle {
        radius: scale.radius(node.degree),
        tier,
        fill: tier.color(),
        glow: tier.has_glow(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct TooltipContent {
    pub(in crate::app) title: String,
    pub(in crate::app) final_risk: String,
    pub(in crate::app) base_risk: String,
    pub(in crate::app) tier: RiskTier,
    pub(in crate::app) reasons: Vec<String>,
}

impl TooltipContent {
    pub(in crate::app) fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Final Risk: {}", self.final_risk),
            format!("Base Risk: {}", self.base_risk),
        ];
        lines.extend(self.reasons.iter().map(|reason| format!("• {reason}")));
        lines
    }
}

pub(in crate::app) fn tooltip_content(node: &WalletNode) -> TooltipContent {
    TooltipContent {
        title: short_id(&node.id),
        final_risk: format_percent(node.final_risk),
        base_risk: format_percent(node.base_risk),
        tier: RiskTier::from_risk(node.final_risk),
        reasons: node.reasons.clone(),
    }
}
