use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Shown wherever a risk value is absent from its feed.
pub const MISSING_VALUE: &str = "n/a";

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{:.1}%", value * 100.0),
        _ => MISSING_VALUE.to_owned(),
    }
}

pub fn format_amount(amount: f64) -> String {
    if amount.fract().abs() < f64::EPSILON {
        format!("{amount:.0}")
    } else {
        format!("{amount:.4}")
    }
}

/// Abbreviates long addresses as `0x1234…cdef`.
pub fn short_id(id: &str) -> String {
    const HEAD: usize = 6;
    const TAIL: usize = 4;

    let count = id.chars().count();
    if count <= HEAD + TAIL + 4 {
        return id.to_owned();
    }

    let head = id.chars().take(HEAD).collect::<String>();
    let tail = id.chars().skip(count - TAIL).collect::<String>();
    format!("{head}…{tail}")
}

pub fn stable_pair(id: &str, seed: u64) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}
