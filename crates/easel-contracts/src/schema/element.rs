use serde::{Deserialize, Serialize};

/// Fixed canvas the renderers draw on. Inferred dimensions are scaled to it.
pub const CANVAS_WIDTH: i64 = 800;
pub const CANVAS_HEIGHT: i64 = 520;

/// Where an element lands when it arrives without usable coordinates.
pub const ORIGIN_X: i64 = 100;
pub const ORIGIN_Y: i64 = 100;

pub const DEFAULT_COLOR: &str = "#1e90ff";

pub const DEFAULT_CIRCLE_RADIUS: i64 = 60;
pub const DEFAULT_SHAPE_WIDTH: i64 = 180;
pub const DEFAULT_SHAPE_HEIGHT: i64 = 120;
pub const DEFAULT_EDGE_LENGTH: i64 = 220;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: i64,
    pub y: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(rename = "from_point", skip_serializing_if = "Option::is_none")]
    pub from_point: Option<Point>,
    #[serde(rename = "to_point", skip_serializing_if = "Option::is_none")]
    pub to_point: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(rename = "celebrity_name", skip_serializing_if = "Option::is_none")]
    pub celebrity_name: Option<String>,
    #[serde(rename = "anatomy_term", skip_serializing_if = "Option::is_none")]
    pub anatomy_term: Option<String>,
    #[serde(rename = "geography_term", skip_serializing_if = "Option::is_none")]
    pub geography_term: Option<String>,
    pub color: String,
}

impl Element {
    pub fn new(kind: &str, x: i64, y: i64) -> Self {
        Self {
            kind: kind.to_string(),
            x,
            y,
            color: DEFAULT_COLOR.to_string(),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    pub fn with_radius(mut self, radius: i64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_size(mut self, width: i64, height: i64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = Some(points);
        self
    }

    /// Connectors and vector-form lines/arrows are edges between positions,
    /// not shapes, and downstream renderers treat them differently.
    pub fn is_edge(&self) -> bool {
        matches!(self.kind.as_str(), "connector" | "line" | "arrow")
    }
}

/// Default size for a shape that arrived without one, so nothing renders
/// invisible or zero-sized.
pub fn default_dimensions(kind: &str) -> Option<(i64, i64)> {
    match kind {
        "rect" | "triangle" | "ellipse" | "textbox" | "image" => {
            Some((DEFAULT_SHAPE_WIDTH, DEFAULT_SHAPE_HEIGHT))
        }
        "line" | "arrow" => Some((DEFAULT_EDGE_LENGTH, 0)),
        _ => None,
    }
}
