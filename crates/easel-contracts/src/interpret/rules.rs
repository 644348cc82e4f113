use crate::schema::{Element, Point, VisualSpec, ORIGIN_X, ORIGIN_Y};

use super::expr::FunctionExpr;

const AXIS_COLOR: &str = "#9ca3af";
const CURVE_COLOR: &str = "#10b981";
const PARABOLA_COLOR: &str = "#2563eb";
const TANGENT_COLOR: &str = "#ef4444";

type RuleMatcher = fn(&str) -> Option<VisualSpec>;

/// Deterministic recognizers tried in a fixed priority order; the first one
/// that claims the command wins.
const MATCHERS: &[(&str, RuleMatcher)] = &[
    ("parabola-tangent", try_parabola_tangent),
    ("plot-function", try_plot_function),
    ("flowchart", try_flowchart),
    ("icon-person", try_icon_person),
    ("icon-temple", try_icon_temple),
];

pub fn interpret_by_rules(command: &str) -> Option<VisualSpec> {
    for (name, matcher) in MATCHERS {
        if let Some(spec) = matcher(command) {
            log::debug!("rule matcher '{name}' claimed the command");
            return Some(spec);
        }
    }
    None
}

/// Sample a function over [x0, x1] into canvas coordinates (x right, y down).
fn poly_points(
    function: impl Fn(f64) -> f64,
    x0: f64,
    x1: f64,
    n: usize,
    scale: f64,
    cx: i64,
    cy: i64,
) -> Vec<Point> {
    let step = (x1 - x0) / (n.max(2) - 1) as f64;
    (0..n)
        .map(|i| {
            let x = x0 + i as f64 * step;
            let mut y = function(x);
            if !y.is_finite() {
                y = 0.0;
            }
            Point {
                x: cx + (x * scale).round() as i64,
                y: cy - (y * scale).round() as i64,
            }
        })
        .collect()
}

fn axes() -> Vec<Element> {
    vec![
        Element::new("line", 100, 260)
            .with_size(600, 0)
            .with_color(AXIS_COLOR),
        Element::new("line", 400, 460)
            .with_size(0, -360)
            .with_color(AXIS_COLOR),
    ]
}

fn polyline(points: Vec<Point>, color: &str) -> Element {
    Element::new("polyline", ORIGIN_X, ORIGIN_Y)
        .with_points(points)
        .with_color(color)
}

fn try_parabola_tangent(command: &str) -> Option<VisualSpec> {
    let text = command.to_ascii_lowercase();
    if !text.contains("parabola") {
        return None;
    }

    let mut elements = axes();
    elements.push(polyline(
        poly_points(|x| x * x, -6.0, 6.0, 120, 40.0, 400, 260),
        PARABOLA_COLOR,
    ));

    if let Some(a) = parse_tangent_abscissa(&text) {
        // tangent to y = x^2 at x = a has slope 2a
        let slope = 2.0 * a;
        elements.push(polyline(
            poly_points(
                move |x| slope * (x - a) + a * a,
                a - 3.0,
                a + 3.0,
                10,
                40.0,
                400,
                260,
            ),
            TANGENT_COLOR,
        ));
    }
    Some(VisualSpec::conceptual(elements))
}

/// Pull the `a` out of "tangent at x = a" phrasing, if present.
fn parse_tangent_abscissa(text: &str) -> Option<f64> {
    let after_tangent = &text[text.find("tangent")? + "tangent".len()..];
    let after_equals = &after_tangent[after_tangent.find('=')? + 1..];
    let trimmed = after_equals.trim_start();
    let end = trimmed
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '-' || ch == '.'))
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<f64>().ok()
}

fn try_plot_function(command: &str) -> Option<VisualSpec> {
    let lower = command.to_ascii_lowercase();
    // Chart-type requests belong to the language-model tier and its chart
    // library, not the static function plotter.
    const CHART_TYPE_KEYWORDS: &[&str] = &[
        "scatter",
        "bar chart",
        "histogram",
        "pie chart",
        "line chart",
        "box plot",
        "heatmap",
        "sankey",
    ];
    if CHART_TYPE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        return None;
    }

    let expr_text = extract_equation(&lower)?;
    let function = FunctionExpr::parse(&expr_text).ok()?;

    let mut elements = axes();
    elements.push(polyline(
        poly_points(|x| function.eval(x), -6.0, 6.0, 120, 40.0, 400, 260),
        CURVE_COLOR,
    ));
    Some(VisualSpec::conceptual(elements))
}

/// Capture the right-hand side of an explicit "y = ..." equation, up to the
/// next clause separator.
fn extract_equation(lower: &str) -> Option<String> {
    let bytes = lower.as_bytes();
    for (idx, _) in lower.match_indices('y') {
        let mut rest = idx + 1;
        while rest < bytes.len() && bytes[rest].is_ascii_whitespace() {
            rest += 1;
        }
        if rest < bytes.len() && bytes[rest] == b'=' {
            let tail = &lower[rest + 1..];
            let end = tail.find([',', ';']).unwrap_or(tail.len());
            let expr = tail[..end].trim();
            if !expr.is_empty() {
                return Some(expr.to_string());
            }
        }
    }
    None
}

fn try_flowchart(command: &str) -> Option<VisualSpec> {
    let text = command.to_ascii_lowercase();
    if !text.contains("flowchart") && !text.contains("funnel") {
        return None;
    }
    let steps: &[&str] = if text.contains("funnel") {
        &["Awareness", "Consideration", "Signup", "Activation"]
    } else {
        &["Start", "Process", "End"]
    };

    let (x, y, gap) = (120, 100, 90);
    let mut elements = Vec::new();
    for (i, step) in steps.iter().enumerate() {
        let yy = y + i as i64 * gap;
        elements.push(
            Element::new("rect", x, yy)
                .with_size(220, 60)
                .with_color("#e5e7eb"),
        );
        elements.push(
            Element::new("text", x + 16, yy + 18)
                .with_label(step)
                .with_color("#111827"),
        );
        if i + 1 < steps.len() {
            elements.push(
                Element::new("arrow", x + 110, yy + 60)
                    .with_size(0, 30)
                    .with_color("#6b7280"),
            );
        }
    }
    Some(VisualSpec::conceptual(elements))
}

fn try_icon_person(command: &str) -> Option<VisualSpec> {
    let text = command.to_ascii_lowercase();
    const PERSON_KEYWORDS: &[&str] = &["person", "human", "man", "woman", "stick figure", "messi"];
    if !PERSON_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return None;
    }

    let (x, y) = (380, 140);
    let limb = "#111827";
    let mut elements = vec![
        // head
        Element::new("circle", x, y).with_radius(24).with_color("#fde68a"),
        // body
        Element::new("line", x, y + 24).with_size(0, 80).with_color(limb),
        // arms
        Element::new("line", x, y + 54).with_size(-40, 20).with_color(limb),
        Element::new("line", x, y + 54).with_size(40, 20).with_color(limb),
        // legs
        Element::new("line", x, y + 104).with_size(-30, 50).with_color(limb),
        Element::new("line", x, y + 104).with_size(30, 50).with_color(limb),
    ];
    if ["soccer", "football", "messi"].iter().any(|kw| text.contains(kw)) {
        elements.push(
            Element::new("circle", x + 60, y + 140)
                .with_radius(12)
                .with_color("#16a34a"),
        );
    }
    Some(VisualSpec::conceptual(elements))
}

fn try_icon_temple(command: &str) -> Option<VisualSpec> {
    let text = command.to_ascii_lowercase();
    const TEMPLE_KEYWORDS: &[&str] = &["petra", "temple", "treasury", "facade"];
    if !TEMPLE_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return None;
    }

    let (x, y) = (120i64, 120i64);
    let (w, h) = (520i64, 240i64);
    let mut elements = vec![
        Element::new("rect", x, y + h - 20)
            .with_size(w, 20)
            .with_color("#d1d5db"),
        Element::new("triangle", x + w / 2 - 120, y - 20)
            .with_size(240, 120)
            .with_color("#fca5a5"),
    ];
    let col_w = 24i64;
    let gap = (w - 6 * col_w) as f64 / 7.0;
    let start = x as f64 + gap;
    for i in 0..6 {
        elements.push(
            Element::new("rect", (start + i as f64 * (col_w as f64 + gap)) as i64, y + 40)
                .with_size(col_w, h - 60)
                .with_color("#fecaca"),
        );
    }
    elements.push(
        Element::new("rect", x, y + 20)
            .with_size(w, 20)
            .with_color("#fca5a5"),
    );
    Some(VisualSpec::conceptual(elements))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parabola_without_tangent_has_axes_and_curve() {
        let spec = interpret_by_rules("draw a parabola").unwrap();
        assert_eq!(spec.elements.len(), 3);
        assert_eq!(spec.elements[2].kind, "polyline");
        assert_eq!(spec.elements[2].points.as_ref().unwrap().len(), 120);
    }

    #[test]
    fn parabola_with_tangent_adds_the_tangent_line() {
        let spec = interpret_by_rules("parabola with tangent at x = 2").unwrap();
        assert_eq!(spec.elements.len(), 4);
        let tangent = &spec.elements[3];
        assert_eq!(tangent.color, TANGENT_COLOR);
        assert_eq!(tangent.points.as_ref().unwrap().len(), 10);
    }

    #[test]
    fn tangent_abscissa_parses_negative_and_decimal_values() {
        assert_eq!(parse_tangent_abscissa("tangent at x = -2"), Some(-2.0));
        assert_eq!(parse_tangent_abscissa("tangent at x=1.5"), Some(1.5));
        assert_eq!(parse_tangent_abscissa("tangent somewhere"), None);
    }

    #[test]
    fn explicit_equation_is_plotted() {
        let spec = interpret_by_rules("plot y = x^2 - 1").unwrap();
        let curve = &spec.elements[2];
        assert_eq!(curve.kind, "polyline");
        assert_eq!(curve.color, CURVE_COLOR);
        let points = curve.points.as_ref().unwrap();
        assert_eq!(points.len(), 120);
        // leftmost sample: x = -6, y = 35, mapped to canvas coordinates
        assert_eq!(points[0], Point { x: 160, y: -1140 });
    }

    #[test]
    fn chart_type_requests_are_left_to_other_tiers() {
        assert!(try_plot_function("scatter plot of y = x").is_none());
        assert!(try_plot_function("histogram of ages").is_none());
    }

    #[test]
    fn malformed_equation_is_not_claimed() {
        assert!(try_plot_function("plot y = spooky(x)").is_none());
        assert!(try_plot_function("the year y is 2024").is_none());
    }

    #[test]
    fn funnel_uses_funnel_stages() {
        let spec = interpret_by_rules("show a signup funnel").unwrap();
        let labels: Vec<&str> = spec
            .elements
            .iter()
            .filter_map(|e| e.label.as_deref())
            .collect();
        assert_eq!(labels, vec!["Awareness", "Consideration", "Signup", "Activation"]);
        // four boxes, four labels, three arrows
        assert_eq!(spec.elements.len(), 11);
    }

    #[test]
    fn flowchart_uses_generic_steps() {
        let spec = interpret_by_rules("make a flowchart").unwrap();
        let labels: Vec<&str> = spec
            .elements
            .iter()
            .filter_map(|e| e.label.as_deref())
            .collect();
        assert_eq!(labels, vec!["Start", "Process", "End"]);
    }

    #[test]
    fn stick_figure_gets_a_ball_in_soccer_context() {
        let plain = interpret_by_rules("draw a person").unwrap();
        let soccer = interpret_by_rules("draw messi").unwrap();
        assert_eq!(plain.elements.len(), 6);
        assert_eq!(soccer.elements.len(), 7);
        assert_eq!(soccer.elements[6].kind, "circle");
    }

    #[test]
    fn temple_has_six_columns() {
        let spec = interpret_by_rules("draw the treasury at petra").unwrap();
        let columns = spec
            .elements
            .iter()
            .filter(|e| e.kind == "rect" && e.height == Some(180))
            .count();
        assert_eq!(columns, 6);
    }

    #[test]
    fn unrelated_commands_are_not_claimed() {
        assert!(interpret_by_rules("explain photosynthesis").is_none());
    }
}
