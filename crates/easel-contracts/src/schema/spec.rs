use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::element::Element;

/// Graph vertex for force-layout rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

/// Graph edge between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The canonical visualization description: tagged by `visualType`, with
/// exactly one payload shape populated.
///
/// The tag stays a plain string so descriptions carrying a type this build
/// does not know about still round-trip and can be routed to the default
/// family instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VisualSpec {
    pub visual_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Element>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expressions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mermaid_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<GraphNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<GraphLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plotly_spec: Option<Value>,
}

impl Default for VisualSpec {
    fn default() -> Self {
        Self {
            visual_type: "conceptual".to_string(),
            elements: Vec::new(),
            expression: None,
            expressions: None,
            mermaid_code: None,
            nodes: None,
            links: None,
            plotly_spec: None,
        }
    }
}

impl VisualSpec {
    pub fn conceptual(elements: Vec<Element>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    pub fn mermaid(code: &str) -> Self {
        Self {
            visual_type: "mermaid".to_string(),
            mermaid_code: Some(code.to_string()),
            ..Self::default()
        }
    }

    pub fn plotly(spec: Value) -> Self {
        Self {
            visual_type: "plotly".to_string(),
            plotly_spec: Some(spec),
            ..Self::default()
        }
    }

    pub fn has_graph_data(&self) -> bool {
        self.nodes.as_ref().is_some_and(|nodes| !nodes.is_empty())
    }
}
