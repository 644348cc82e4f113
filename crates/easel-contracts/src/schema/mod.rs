mod element;
mod normalize;
mod spec;

pub use element::{
    default_dimensions, Element, Point, CANVAS_HEIGHT, CANVAS_WIDTH, DEFAULT_CIRCLE_RADIUS,
    DEFAULT_COLOR, DEFAULT_EDGE_LENGTH, DEFAULT_SHAPE_HEIGHT, DEFAULT_SHAPE_WIDTH, ORIGIN_X,
    ORIGIN_Y,
};
pub use normalize::normalize;
pub use spec::{GraphLink, GraphNode, VisualSpec};
