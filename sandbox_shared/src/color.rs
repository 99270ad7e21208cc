//! Player colors.
//!
//! New players get one entry of a fixed palette, picked uniformly at random.
//! Browser clients build their materials straight from these channel values.

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

/// RGB color with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

/// Red, green, blue, yellow, magenta, cyan, orange.
pub const PALETTE: [Color; 7] = [
    Color::new(1.0, 0.0, 0.0),
    Color::new(0.0, 1.0, 0.0),
    Color::new(0.0, 0.0, 1.0),
    Color::new(1.0, 1.0, 0.0),
    Color::new(1.0, 0.0, 1.0),
    Color::new(0.0, 1.0, 1.0),
    Color::new(1.0, 0.5, 0.0),
];

/// Picks a palette color from the given random source.
pub fn next_color_with<R: Rng + ?Sized>(rng: &mut R) -> Color {
    // PALETTE is non-empty, so `choose` always yields.
    PALETTE.choose(rng).copied().unwrap_or(PALETTE[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn colors_always_come_from_palette() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let c = next_color_with(&mut rng);
            assert!(PALETTE.contains(&c), "{c:?} not in palette");
        }
    }

    #[test]
    fn every_palette_entry_is_reachable() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; PALETTE.len()];
        for _ in 0..1000 {
            let c = next_color_with(&mut rng);
            if let Some(i) = PALETTE.iter().position(|p| *p == c) {
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn palette_channels_are_half_steps() {
        for c in PALETTE {
            for ch in [c.r, c.g, c.b] {
                assert!(ch == 0.0 || ch == 0.5 || ch == 1.0);
            }
        }
    }
}
