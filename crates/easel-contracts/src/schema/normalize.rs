use serde_json::{Map, Value};

use super::element::{
    default_dimensions, Element, Point, DEFAULT_CIRCLE_RADIUS, DEFAULT_COLOR, ORIGIN_X, ORIGIN_Y,
};
use super::spec::{GraphLink, GraphNode, VisualSpec};

/// Coerce an arbitrary candidate description into the canonical schema.
///
/// Total by design: renderers are intolerant of missing required fields, so
/// malformed input degrades to defaults instead of erroring. Already-canonical
/// input passes through unchanged, which makes the function idempotent.
pub fn normalize(candidate: &Value) -> VisualSpec {
    let Some(body) = candidate.as_object() else {
        log::warn!("candidate description is not an object; degrading to empty conceptual");
        return VisualSpec::default();
    };

    let visual_type = body
        .get("visualType")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("conceptual")
        .to_string();

    match visual_type.as_str() {
        "plotly" => match body.get("plotlySpec") {
            Some(spec) if !spec.is_null() => VisualSpec::plotly(spec.clone()),
            _ => {
                log::warn!("plotly visualType without plotlySpec; degrading to empty conceptual");
                VisualSpec::default()
            }
        },
        "mermaid" => match body.get("mermaidCode").and_then(Value::as_str) {
            Some(code) => VisualSpec::mermaid(code),
            None => {
                log::warn!("mermaid visualType without mermaidCode; degrading to empty conceptual");
                VisualSpec::default()
            }
        },
        "mathematical_interactive" => {
            let expressions = string_list(body.get("expressions"));
            let expression = if expressions.is_some() {
                None
            } else {
                Some(
                    body.get("expression")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                )
            };
            VisualSpec {
                visual_type,
                expression,
                expressions,
                ..VisualSpec::default()
            }
        }
        "mathematical" => {
            let expressions = string_list(body.get("expressions"));
            let expression = body
                .get("expression")
                .and_then(Value::as_str)
                .map(str::to_string);
            if expressions.is_some() || expression.is_some() {
                VisualSpec {
                    visual_type,
                    expression: if expressions.is_some() { None } else { expression },
                    expressions,
                    ..VisualSpec::default()
                }
            } else {
                log::warn!("mathematical visualType without expression; treating as conceptual");
                normalize_elements_body("conceptual".to_string(), body)
            }
        }
        _ => normalize_elements_body(visual_type, body),
    }
}

fn normalize_elements_body(visual_type: String, body: &Map<String, Value>) -> VisualSpec {
    let raw_elements = body
        .get("elements")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    log::debug!(
        "normalizing {} elements for {} visualization",
        raw_elements.len(),
        visual_type
    );

    let elements = raw_elements
        .iter()
        .filter_map(Value::as_object)
        .map(normalize_element)
        .collect();

    VisualSpec {
        visual_type,
        elements,
        nodes: graph_entries::<GraphNode>(body.get("nodes")),
        links: graph_entries::<GraphLink>(body.get("links")),
        ..VisualSpec::default()
    }
}

fn normalize_element(raw: &Map<String, Value>) -> Element {
    let mut kind = raw
        .get("type")
        .and_then(Value::as_str)
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let mut square_size = None;
    match kind.as_str() {
        "rectangle" | "box" => kind = "rect".to_string(),
        "square" => {
            kind = "rect".to_string();
            square_size = Some(
                coerce_int(first_of(raw, &["size", "width", "height"])).unwrap_or(100),
            );
        }
        "pyramid" => kind = "triangle".to_string(),
        "oval" => kind = "ellipse".to_string(),
        "" => kind = "text".to_string(),
        _ => {}
    }

    let x = coerce_int(raw.get("x")).unwrap_or(ORIGIN_X);
    let y = coerce_int(raw.get("y")).unwrap_or(ORIGIN_Y);

    let color = first_string(raw, &["color", "fill", "backgroundColor"])
        .unwrap_or_else(|| DEFAULT_COLOR.to_string());

    let mut radius = coerce_int(first_of(raw, &["radius", "r", "size"]));
    let mut width = coerce_int(first_of(raw, &["width", "w"]));
    let mut height = coerce_int(first_of(raw, &["height", "h"]));

    if let Some(size) = square_size {
        width = Some(size);
        height = Some(size);
    }
    if kind == "circle" {
        radius = radius.or(Some(DEFAULT_CIRCLE_RADIUS));
    } else if let Some((default_width, default_height)) = default_dimensions(&kind) {
        width = width.or(Some(default_width));
        height = height.or(Some(default_height));
    }

    let points = raw.get("points").and_then(Value::as_array).map(|entries| {
        entries
            .iter()
            .filter_map(Value::as_object)
            .filter_map(coerce_point)
            .collect::<Vec<Point>>()
    });

    let (from_point, to_point) = if kind == "connector" {
        (
            raw.get("from_point")
                .and_then(Value::as_object)
                .map(|map| coerce_point_or_origin(map, 0, 0)),
            raw.get("to_point")
                .and_then(Value::as_object)
                .map(|map| coerce_point_or_origin(map, 0, 0)),
        )
    } else {
        (None, None)
    };

    let is_image = kind == "image";

    Element {
        kind,
        x,
        y,
        radius,
        width,
        height,
        label: first_string(raw, &["label", "text"]),
        points: points.filter(|list| !list.is_empty()),
        from_point,
        to_point,
        src: if is_image {
            raw.get("src").and_then(Value::as_str).map(str::to_string)
        } else {
            None
        },
        font_size: coerce_int(raw.get("fontSize")),
        font_weight: string_field(raw, "fontWeight"),
        text_align: string_field(raw, "textAlign"),
        background_color: string_field(raw, "backgroundColor"),
        border_color: string_field(raw, "borderColor"),
        border_width: coerce_int(raw.get("borderWidth")),
        opacity: raw.get("opacity").and_then(Value::as_f64),
        celebrity_name: if is_image {
            string_field(raw, "celebrity_name")
        } else {
            None
        },
        anatomy_term: if is_image {
            string_field(raw, "anatomy_term")
        } else {
            None
        },
        geography_term: if is_image {
            string_field(raw, "geography_term")
        } else {
            None
        },
        color,
    }
}

fn coerce_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number.as_f64().map(|float| float.round() as i64),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .map(|float| float.round() as i64),
        _ => None,
    }
}

fn coerce_point(map: &Map<String, Value>) -> Option<Point> {
    Some(Point {
        x: coerce_int(map.get("x"))?,
        y: coerce_int(map.get("y"))?,
    })
}

fn coerce_point_or_origin(map: &Map<String, Value>, default_x: i64, default_y: i64) -> Point {
    Point {
        x: coerce_int(map.get("x")).unwrap_or(default_x),
        y: coerce_int(map.get("y")).unwrap_or(default_y),
    }
}

fn first_of<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|value| !value.is_null()))
}

fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string_field(map, key))
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let entries = value?.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

fn graph_entries<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Option<Vec<T>> {
    let entries = value?.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn synonyms_resolve_to_canonical_types() {
        let spec = normalize(&json!({"elements": [
            {"type": "rectangle", "x": 1, "y": 2},
            {"type": "box", "x": 1, "y": 2},
            {"type": "pyramid", "x": 1, "y": 2},
            {"type": "oval", "x": 1, "y": 2},
        ]}));
        let kinds: Vec<&str> = spec.elements.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["rect", "rect", "triangle", "ellipse"]);
    }

    #[test]
    fn square_becomes_rect_with_equal_sides() {
        let spec = normalize(&json!({"elements": [{"type": "square", "x": 0, "y": 0, "size": 90}]}));
        assert_eq!(spec.elements[0].kind, "rect");
        assert_eq!(spec.elements[0].width, Some(90));
        assert_eq!(spec.elements[0].height, Some(90));

        let spec = normalize(&json!({"elements": [{"type": "square", "x": 0, "y": 0}]}));
        assert_eq!(spec.elements[0].width, Some(100));
        assert_eq!(spec.elements[0].height, Some(100));
    }

    #[test]
    fn arrow_stays_distinct_from_line() {
        let spec = normalize(&json!({"elements": [
            {"type": "arrow", "x": 180, "y": 330},
            {"type": "line", "x": 100, "y": 100},
        ]}));
        assert_eq!(spec.elements[0].kind, "arrow");
        assert_eq!(spec.elements[1].kind, "line");
        // both take the vector form with default length
        assert_eq!(spec.elements[0].width, Some(220));
        assert_eq!(spec.elements[0].height, Some(0));
        assert_eq!(spec.elements[1].width, Some(220));
    }

    #[test]
    fn numeric_fields_coerce_to_integers() {
        let spec = normalize(&json!({"elements": [
            {"type": "circle", "x": "12.7", "y": 12.7, "r": "59.5"},
        ]}));
        assert_eq!(spec.elements[0].x, 13);
        assert_eq!(spec.elements[0].y, 13);
        assert_eq!(spec.elements[0].radius, Some(60));
    }

    #[test]
    fn missing_coordinates_default_to_origin_offset() {
        let spec = normalize(&json!({"elements": [{"type": "rect"}]}));
        assert_eq!(spec.elements[0].x, 100);
        assert_eq!(spec.elements[0].y, 100);
        assert_eq!(spec.elements[0].width, Some(180));
        assert_eq!(spec.elements[0].height, Some(120));
    }

    #[test]
    fn circle_gets_default_radius() {
        let spec = normalize(&json!({"elements": [{"type": "circle", "x": 1, "y": 1}]}));
        assert_eq!(spec.elements[0].radius, Some(60));
    }

    #[test]
    fn color_falls_back_through_fill_and_background() {
        let spec = normalize(&json!({"elements": [
            {"type": "rect", "fill": "#111111"},
            {"type": "rect", "backgroundColor": "#222222"},
            {"type": "rect"},
        ]}));
        assert_eq!(spec.elements[0].color, "#111111");
        assert_eq!(spec.elements[1].color, "#222222");
        assert_eq!(spec.elements[2].color, "#1e90ff");
    }

    #[test]
    fn short_spellings_collapse_to_long_form() {
        let spec = normalize(&json!({"elements": [
            {"type": "ellipse", "x": 1, "y": 1, "w": 40, "h": 30},
        ]}));
        assert_eq!(spec.elements[0].width, Some(40));
        assert_eq!(spec.elements[0].height, Some(30));
    }

    #[test]
    fn missing_element_type_defaults_to_text() {
        let spec = normalize(&json!({"elements": [{"x": 10, "y": 10, "label": "hi"}]}));
        assert_eq!(spec.elements[0].kind, "text");
        assert_eq!(spec.elements[0].label.as_deref(), Some("hi"));
    }

    #[test]
    fn connector_points_are_coerced() {
        let spec = normalize(&json!({"elements": [
            {"type": "connector", "x": 0, "y": 0,
             "from_point": {"x": "10.2", "y": 4}, "to_point": {"y": 9}},
        ]}));
        let element = &spec.elements[0];
        assert_eq!(element.from_point, Some(Point { x: 10, y: 4 }));
        assert_eq!(element.to_point, Some(Point { x: 0, y: 9 }));
    }

    #[test]
    fn plotly_payload_passes_through_verbatim() {
        let plotly = json!({"data": [{"type": "bar", "x": [1], "y": [2]}], "layout": {"title": "t"}});
        let spec = normalize(&json!({"visualType": "plotly", "plotlySpec": plotly}));
        assert_eq!(spec.visual_type, "plotly");
        assert_eq!(
            spec.plotly_spec,
            Some(json!({"data": [{"type": "bar", "x": [1], "y": [2]}], "layout": {"title": "t"}}))
        );
    }

    #[test]
    fn tagged_type_without_payload_degrades_to_empty_conceptual() {
        let spec = normalize(&json!({"visualType": "plotly"}));
        assert_eq!(spec.visual_type, "conceptual");
        assert!(spec.elements.is_empty());

        let spec = normalize(&json!({"visualType": "mermaid"}));
        assert_eq!(spec.visual_type, "conceptual");
    }

    #[test]
    fn mathematical_keeps_expression() {
        let spec = normalize(&json!({"visualType": "mathematical", "expression": "sin(x)"}));
        assert_eq!(spec.visual_type, "mathematical");
        assert_eq!(spec.expression.as_deref(), Some("sin(x)"));
    }

    #[test]
    fn mathematical_without_expression_degrades_to_conceptual() {
        let spec = normalize(&json!({
            "visualType": "mathematical",
            "elements": [{"type": "rect", "x": 1, "y": 1}],
        }));
        assert_eq!(spec.visual_type, "conceptual");
        assert_eq!(spec.elements.len(), 1);
    }

    #[test]
    fn interactive_expressions_list_wins_over_single() {
        let spec = normalize(&json!({
            "visualType": "mathematical_interactive",
            "expressions": ["sin(x)", "cos(x)"],
            "expression": "tan(x)",
        }));
        assert_eq!(
            spec.expressions,
            Some(vec!["sin(x)".to_string(), "cos(x)".to_string()])
        );
        assert_eq!(spec.expression, None);
    }

    #[test]
    fn graph_data_survives_normalization() {
        let spec = normalize(&json!({
            "visualType": "conceptual",
            "nodes": [{"id": "ai", "label": "AI", "color": "#3b82f6"}],
            "links": [{"source": "ai", "target": "ml", "label": "includes"}],
            "elements": [{"type": "node"}],
        }));
        assert!(spec.has_graph_data());
        assert_eq!(spec.links.as_ref().unwrap()[0].target, "ml");
    }

    #[test]
    fn unknown_visual_type_is_preserved() {
        let spec = normalize(&json!({"visualType": "foobar", "elements": []}));
        assert_eq!(spec.visual_type, "foobar");
    }

    #[test]
    fn non_object_candidate_degrades_to_empty_conceptual() {
        assert_eq!(normalize(&json!("just text")), VisualSpec::default());
        assert_eq!(normalize(&json!(null)), VisualSpec::default());
    }

    #[test]
    fn normalize_is_idempotent() {
        let candidates = [
            json!({"elements": [
                {"type": "square", "x": "10.4", "size": 80, "fill": "#333"},
                {"type": "circle"},
                {"type": "arrow", "x": 1, "y": 2},
                {"type": "polyline", "points": [{"x": 1.2, "y": 3.9}, {"x": "bad"}]},
                {"type": "connector", "from_point": {"x": 1, "y": 2}, "to_point": {"x": 3, "y": 4}},
            ]}),
            json!({"visualType": "plotly", "plotlySpec": {"data": [{"type": "pie"}]}}),
            json!({"visualType": "mermaid", "mermaidCode": "graph TD\n  A --> B"}),
            json!({"visualType": "mathematical_interactive", "expression": "x**2"}),
            json!({"visualType": "conceptual",
                   "nodes": [{"id": "a"}], "links": [{"source": "a", "target": "b"}]}),
        ];
        for candidate in candidates {
            let once = normalize(&candidate);
            let twice = normalize(&serde_json::to_value(&once).unwrap());
            assert_eq!(once, twice);
        }
    }
}
