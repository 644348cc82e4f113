/// Coarse intent classification used to steer the language-model tier
/// toward the right visualization family. Purely keyword-driven so it costs
/// nothing and never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingHint {
    Comparison,
    Workflow,
    Hierarchy,
    Timeseries,
    Network,
}

impl RoutingHint {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingHint::Comparison => "comparison",
            RoutingHint::Workflow => "workflow",
            RoutingHint::Hierarchy => "hierarchy",
            RoutingHint::Timeseries => "timeseries",
            RoutingHint::Network => "network",
        }
    }
}

const MATH_KEYWORDS: &[&str] = &[
    "plot", "graph", "parabola", "function", "equation", "y=", "x=", "tangent", "derivative",
    "sin", "cos", "tan", "integral",
];
const COMPARISON_KEYWORDS: &[&str] = &[
    "compare",
    "vs",
    "versus",
    "which is better",
    "difference between",
    "comparison",
];
const WORKFLOW_KEYWORDS: &[&str] = &[
    "workflow",
    "pipeline",
    "process",
    "lifecycle",
    "how does",
    "how do",
    "steps",
    "stages",
    "procedure",
    "sequence",
];
const HIERARCHY_KEYWORDS: &[&str] = &[
    "hierarchy",
    "organization",
    "org chart",
    "structure",
    "tree",
    "taxonomy",
];
const NETWORK_KEYWORDS: &[&str] = &[
    "network",
    "connection",
    "relationship",
    "relate",
    "between",
    "connect",
];
const TIMESERIES_KEYWORDS: &[&str] = &[
    "over time",
    "growth",
    "trend",
    "forecast",
    "historical",
    "change over",
];
const SEQUENTIAL_KEYWORDS: &[&str] = &[
    "authentication",
    "oauth",
    "login",
    "api request",
    "http",
    "sequence",
];
const GENERATED_IMAGE_KEYWORDS: &[&str] = &[
    "illustration",
    "drawing",
    "realistic",
    "diagram",
    "scene",
    "picture",
];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

/// Pick the strongest hint for a command; comparison beats network because
/// "compare A vs B" mentions relationships without being one.
pub fn classify(command: &str) -> Option<RoutingHint> {
    let text = command.to_ascii_lowercase();
    if contains_any(&text, COMPARISON_KEYWORDS) {
        Some(RoutingHint::Comparison)
    } else if contains_any(&text, WORKFLOW_KEYWORDS) {
        Some(RoutingHint::Workflow)
    } else if contains_any(&text, HIERARCHY_KEYWORDS) {
        Some(RoutingHint::Hierarchy)
    } else if contains_any(&text, TIMESERIES_KEYWORDS) {
        Some(RoutingHint::Timeseries)
    } else if contains_any(&text, NETWORK_KEYWORDS) {
        Some(RoutingHint::Network)
    } else {
        None
    }
}

pub fn is_math_command(command: &str) -> bool {
    contains_any(&command.to_ascii_lowercase(), MATH_KEYWORDS)
}

/// Sequential processes (auth flows, API exchanges) read better as Mermaid
/// sequence diagrams than as Sankey charts.
pub fn wants_sequential_diagram(command: &str) -> bool {
    let text = command.to_ascii_lowercase();
    contains_any(&text, WORKFLOW_KEYWORDS) && contains_any(&text, SEQUENTIAL_KEYWORDS)
}

pub fn wants_generated_image(command: &str) -> bool {
    contains_any(&command.to_ascii_lowercase(), GENERATED_IMAGE_KEYWORDS)
}

/// Logos are served from well-known URL schemes by the language-model tier,
/// not generated.
pub fn is_logo_request(command: &str) -> bool {
    let text = command.to_ascii_lowercase();
    text.contains("logo") || text.contains("brand")
}
