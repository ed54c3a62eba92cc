use serde::{Deserialize, Serialize};

/// Point on the integer lattice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i64,
    /// Vertical coordinate.
    pub y: i64,
    #[serde(skip)]
    pub scratch: i64,
    pub label: Label,
}

/// Display label attached to a point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
}
