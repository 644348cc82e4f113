use crate::schema::{Element, VisualSpec};

const COLOR_NAMES: &[&str] = &[
    "red", "blue", "green", "yellow", "purple", "orange", "black", "white",
];

/// Keyword-only recognizer for a small closed set of primitive shapes and
/// colors. Always produces some description; the last tier in the chain.
pub fn fallback_naive(command: &str) -> VisualSpec {
    let text = command.to_ascii_lowercase();
    let color = COLOR_NAMES
        .iter()
        .find(|name| text.contains(*name))
        .copied()
        .unwrap_or("#1e90ff");

    let elements = if text.contains("circle") {
        vec![Element::new("circle", 200, 200)
            .with_radius(60)
            .with_color(color)]
    } else if ["rectangle", "rect", "box", "square"]
        .iter()
        .any(|kw| text.contains(kw))
    {
        let height = if text.contains("square") { 160 } else { 100 };
        vec![Element::new("rect", 150, 150)
            .with_size(160, height)
            .with_color(color)]
    } else if text.contains("triangle") || text.contains("pyramid") {
        vec![Element::new("triangle", 180, 160)
            .with_size(140, 120)
            .with_color(color)]
    } else if text.contains("ellipse") || text.contains("oval") {
        vec![Element::new("ellipse", 180, 160)
            .with_size(180, 120)
            .with_color(color)]
    } else if text.contains("line") {
        vec![Element::new("line", 100, 100)
            .with_size(220, 0)
            .with_color(color)]
    } else {
        let subject = extract_subject(command).unwrap_or_else(|| "Item".to_string());
        label_card(&subject)
    };
    VisualSpec::conceptual(elements)
}

/// Labeled card shown when nothing better can be drawn: a background rect
/// with the extracted subject on top.
pub fn label_card(subject: &str) -> Vec<Element> {
    let (x, y) = (140, 120);
    vec![
        Element::new("rect", x, y)
            .with_size(280, 140)
            .with_color("#e0e7ff"),
        Element::new("text", x + 16, y + 16)
            .with_label(subject)
            .with_color("#111827"),
    ]
}

/// Pull a short display subject out of the command by trimming the leading
/// request verb and articles.
pub fn extract_subject(command: &str) -> Option<String> {
    let mut subject = command.trim();
    let lower = subject.to_ascii_lowercase();
    const PREFIXES: &[&str] = &[
        "show me ",
        "show ",
        "draw ",
        "visualize ",
        "render ",
        "make ",
        "create ",
    ];
    for prefix in PREFIXES {
        if lower.starts_with(prefix) {
            subject = &subject[prefix.len()..];
            break;
        }
    }
    subject = subject.trim();
    for article in ["a ", "an ", "the "] {
        let matches_article = subject
            .get(..article.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(article));
        if matches_article && subject.len() > article.len() {
            subject = subject[article.len()..].trim_start();
            break;
        }
    }
    let subject = subject.trim_matches(['.', '?', '!', ' ']);
    if subject.is_empty() {
        return None;
    }
    let truncated: String = subject.chars().take(64).collect();
    Some(title_case(&truncated))
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
