use std::fmt;

use rand::Rng;

/// Curated print-friendly colour triples.
pub const PALETTE: [[&str; 3]; 8] = [
    ["#E57373", "#F06292", "#BA68C8"],
    ["#7986CB", "#64B5F6", "#4FC3F7"],
    ["#81C784", "#AED581", "#DCE775"],
    ["#FFB74D", "#FF8A65", "#F06292"],
    ["#90A4AE", "#B0BEC5", "#CFD8DC"],
    ["#C5CAE9", "#7986CB", "#5C6BC0"],
    ["#FFCC80", "#FFAB91", "#FF8A65"],
    ["#4DB6AC", "#4DD0E1", "#81D4FA"],
];

/// A three-stop linear gradient for a card face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gradient {
    pub direction: u16,
    pub colors: [&'static str; 3],
    /// Stop offsets in percent. The ranges are disjoint so the stops never cross.
    pub stops: [i8; 3],
}

impl Gradient {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let colors = PALETTE[rng.random_range(0..PALETTE.len())];
        Self {
            direction: rng.random_range(0..360),
            colors,
            stops: [
                rng.random_range(-20..=20),
                rng.random_range(40..=60),
                rng.random_range(80..=100),
            ],
        }
    }

    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [c1, c2, c3] = self.colors;
        let [s1, s2, s3] = self.stops;
        write!(
            f,
            "linear-gradient({}deg, {c1} {s1}%, {c2} {s2}%, {c3} {s3}%)",
            self.direction
        )
    }
}
