use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::schema::{Element, GraphLink, GraphNode, VisualSpec};

/// The independent rendering subsystems a description can be dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderFamily {
    ChartLibrary,
    DiagramDescription,
    InteractiveMath,
    StaticMath,
    ForceLayoutGraph,
    ShapeRendering,
    FlowDiagram,
}

impl RenderFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderFamily::ChartLibrary => "chart-library",
            RenderFamily::DiagramDescription => "diagram-description",
            RenderFamily::InteractiveMath => "interactive-math",
            RenderFamily::StaticMath => "static-math",
            RenderFamily::ForceLayoutGraph => "force-layout-graph",
            RenderFamily::ShapeRendering => "shape-rendering",
            RenderFamily::FlowDiagram => "flow-diagram",
        }
    }
}

/// The minimal payload each family needs; nothing more crosses the boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderPayload {
    Chart {
        #[serde(rename = "plotlySpec")]
        plotly_spec: Value,
    },
    Diagram {
        #[serde(rename = "mermaidCode")]
        mermaid_code: String,
    },
    Expressions { expressions: Vec<String> },
    Elements { elements: Vec<Element> },
    Graph {
        nodes: Vec<GraphNode>,
        links: Vec<GraphLink>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RenderAssignment {
    Engine {
        family: RenderFamily,
        payload: RenderPayload,
    },
    /// A recognized visualization type with no concrete renderer yet. The
    /// caller renders a named placeholder instead of failing the request.
    Placeholder {
        #[serde(rename = "visualType")]
        visual_type: String,
    },
}

impl RenderAssignment {
    fn engine(family: RenderFamily, payload: RenderPayload) -> Self {
        Self::Engine { family, payload }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("plotly description has no renderable payload: data and layout.annotations are both empty")]
    UnusablePlotlySpec,
}

type RouteRule = fn(&VisualSpec) -> Option<Result<RenderAssignment, DispatchError>>;

/// Ordered dispatch table, first match wins. Precedence lives here and
/// nowhere else, so it can be audited and tested in isolation.
const RULE_TABLE: &[(&str, RouteRule)] = &[
    ("plotly", rule_plotly),
    ("mermaid", rule_mermaid),
    ("interactive-math", rule_interactive_math),
    ("static-math", rule_static_math),
    ("conceptual", rule_conceptual),
    ("placeholder", rule_placeholder),
];

/// Select the rendering engine family for a canonical description.
/// Stateless and idempotent; safe to call repeatedly on the same input.
pub fn route(description: &VisualSpec) -> Result<RenderAssignment, DispatchError> {
    for (name, rule) in RULE_TABLE {
        if let Some(assignment) = rule(description) {
            log::debug!("dispatch rule '{name}' matched");
            return assignment;
        }
    }
    // Anything unrecognized still renders, just without structure-aware layout.
    log::warn!(
        "unrecognized visualType '{}'; dispatching to flow-diagram",
        description.visual_type
    );
    Ok(RenderAssignment::engine(
        RenderFamily::FlowDiagram,
        RenderPayload::Elements {
            elements: description.elements.clone(),
        },
    ))
}

fn rule_plotly(description: &VisualSpec) -> Option<Result<RenderAssignment, DispatchError>> {
    if description.visual_type != "plotly" {
        return None;
    }
    let usable = description.plotly_spec.as_ref().filter(|spec| {
        let has_data = spec
            .get("data")
            .and_then(Value::as_array)
            .is_some_and(|data| !data.is_empty());
        let has_annotations = spec
            .get("layout")
            .and_then(|layout| layout.get("annotations"))
            .and_then(Value::as_array)
            .is_some_and(|annotations| !annotations.is_empty());
        has_data || has_annotations
    });
    Some(match usable {
        Some(spec) => Ok(RenderAssignment::engine(
            RenderFamily::ChartLibrary,
            RenderPayload::Chart {
                plotly_spec: spec.clone(),
            },
        )),
        None => Err(DispatchError::UnusablePlotlySpec),
    })
}

fn rule_mermaid(description: &VisualSpec) -> Option<Result<RenderAssignment, DispatchError>> {
    if description.visual_type != "mermaid" {
        return None;
    }
    Some(Ok(RenderAssignment::engine(
        RenderFamily::DiagramDescription,
        RenderPayload::Diagram {
            mermaid_code: description.mermaid_code.clone().unwrap_or_default(),
        },
    )))
}

fn rule_interactive_math(
    description: &VisualSpec,
) -> Option<Result<RenderAssignment, DispatchError>> {
    let symbolic = description.visual_type == "mathematical_interactive"
        || (description.visual_type == "mathematical"
            && (description.expression.is_some() || description.expressions.is_some()));
    if !symbolic {
        return None;
    }
    let expressions = match &description.expressions {
        Some(list) => list.clone(),
        None => description.expression.iter().cloned().collect(),
    };
    Some(Ok(RenderAssignment::engine(
        RenderFamily::InteractiveMath,
        RenderPayload::Expressions { expressions },
    )))
}

fn rule_static_math(description: &VisualSpec) -> Option<Result<RenderAssignment, DispatchError>> {
    if description.visual_type != "mathematical" {
        return None;
    }
    Some(Ok(RenderAssignment::engine(
        RenderFamily::StaticMath,
        RenderPayload::Elements {
            elements: description.elements.clone(),
        },
    )))
}

/// Shape kinds that want geometry-first rendering instead of the
/// box-and-connector flow renderer.
const GEOMETRY_KINDS: &[&str] = &["circle", "triangle", "ellipse", "polygon", "path"];

fn rule_conceptual(description: &VisualSpec) -> Option<Result<RenderAssignment, DispatchError>> {
    if description.visual_type != "conceptual" {
        return None;
    }
    // Graph-shaped data always wins over element-shaped data: node/link
    // structure cannot be meaningfully rendered as flat shapes.
    if description.has_graph_data() {
        return Some(Ok(RenderAssignment::engine(
            RenderFamily::ForceLayoutGraph,
            RenderPayload::Graph {
                nodes: description.nodes.clone().unwrap_or_default(),
                links: description.links.clone().unwrap_or_default(),
            },
        )));
    }
    let geometry_dominant = description
        .elements
        .iter()
        .any(|element| GEOMETRY_KINDS.contains(&element.kind.as_str()));
    let family = if geometry_dominant {
        RenderFamily::ShapeRendering
    } else {
        RenderFamily::FlowDiagram
    };
    Some(Ok(RenderAssignment::engine(
        family,
        RenderPayload::Elements {
            elements: description.elements.clone(),
        },
    )))
}

/// Recognized types with no concrete renderer yet.
const PLACEHOLDER_TYPES: &[&str] = &["timeline", "statistical", "network", "spatial"];

fn rule_placeholder(description: &VisualSpec) -> Option<Result<RenderAssignment, DispatchError>> {
    if !PLACEHOLDER_TYPES.contains(&description.visual_type.as_str()) {
        return None;
    }
    Some(Ok(RenderAssignment::Placeholder {
        visual_type: description.visual_type.clone(),
    }))
}
