use std::env;
use std::io::Cursor;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use easel_contracts::events::{EventPayload, EventWriter};
use easel_contracts::interpret::hints::{self, RoutingHint};
use easel_contracts::interpret::{
    extract_subject, fallback_naive, interpret_by_rules, label_card, InterpretationResult,
    Provenance,
};
use easel_contracts::schema::{normalize, Element, VisualSpec};
use easel_contracts::tiers::{DeploymentFlags, TierContext, TierRegistry};
use image::{ImageFormat, Rgb, RgbImage};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use uuid::Uuid;

const SPEC_PROMPT_TEMPLATE: &str = include_str!("../resources/spec_prompt.txt");
const MERMAID_PROMPT_TEMPLATE: &str = include_str!("../resources/mermaid_prompt.txt");

/// Commands longer than this are rejected before any tier runs.
pub const MAX_COMMAND_CHARS: usize = 2000;

/// Bound on every external call. A timeout is tier failure, not a retry.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// External natural-language interpretation collaborator.
pub trait SpecModelClient: Send + Sync {
    fn name(&self) -> &str;
    fn interpret_command(
        &self,
        command: &str,
        user_context: Option<&str>,
        model: &str,
        hint: Option<RoutingHint>,
    ) -> Result<Value>;
    fn generate_mermaid(&self, command: &str) -> Result<String>;
}

/// External image-generation collaborator. Produces a single-image
/// description for visually rich requests.
pub trait ImageComposer: Send + Sync {
    fn name(&self) -> &str;
    fn compose(&self, command: &str) -> Result<VisualSpec>;
}

/// Reference-image lookup for elements that name a subject instead of
/// carrying a URL.
pub trait ImageLookup: Send + Sync {
    fn page_image(&self, term: &str) -> Result<Option<String>>;
}

pub fn llm_ready() -> bool {
    non_empty_env("OPENAI_API_KEY").is_some()
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn error_chain_text(err: &anyhow::Error) -> String {
    format!("{err:#}")
}

fn parse_dims(size: &str) -> (u32, u32) {
    let mut parts = size.split(['x', 'X']);
    let width = parts
        .next()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(512);
    let height = parts
        .next()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(width);
    (width.max(1), height.max(1))
}

fn hint_guidance(hint: RoutingHint) -> &'static str {
    match hint {
        RoutingHint::Comparison => {
            "ROUTING HINT: This is a COMPARISON query. Use a Plotly bar or pie chart with actual data."
        }
        RoutingHint::Workflow => {
            "ROUTING HINT: This is a WORKFLOW/PROCESS query. Use a Sankey diagram with flowing connections."
        }
        RoutingHint::Hierarchy => {
            "ROUTING HINT: This is a HIERARCHY query. Use a sunburst or treemap visualization."
        }
        RoutingHint::Timeseries => {
            "ROUTING HINT: This is a TIME SERIES query. Use a line or area chart showing change over time."
        }
        RoutingHint::Network => {
            "ROUTING HINT: This is a NETWORK/RELATIONSHIP query. Use nodes and links for a force-directed graph."
        }
    }
}

fn build_spec_prompt(command: &str, user_context: Option<&str>, hint: Option<RoutingHint>) -> String {
    let mut prompt = SPEC_PROMPT_TEMPLATE.replace("{prompt}", command);
    if let Some(hint) = hint {
        prompt = format!("{}\n\n{}", hint_guidance(hint), prompt);
    }
    if let Some(context) = user_context.map(str::trim).filter(|value| !value.is_empty()) {
        // Context adjusts complexity and terminology, never the subject.
        prompt = format!(
            "BACKGROUND CONTEXT: the user is working on: {context}.\n\
             Use this only to adjust complexity, terminology, or style. \
             Visualize what was actually requested, never the context topic.\n\n{prompt}"
        );
    }
    prompt
}

/// Strip markdown fences and quote parenthesised node labels, the two ways
/// language models most often break Mermaid syntax.
fn scrub_mermaid(source: &str) -> String {
    let mut code = source.trim().to_string();
    if code.starts_with("```") {
        let lines: Vec<&str> = code.lines().collect();
        if lines.len() > 2 {
            code = lines[1..lines.len() - 1].join("\n");
        }
    }
    code = code.replace("```mermaid", "").replace("```", "");
    fix_parenthesised_labels(code.trim())
}

fn fix_parenthesised_labels(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch == '('
            && i > 0
            && (chars[i - 1].is_ascii_alphanumeric() || chars[i - 1] == '_')
        {
            if let Some(offset) = chars[i + 1..].iter().position(|c| *c == ')') {
                let inner: String = chars[i + 1..i + 1 + offset].iter().collect();
                if !inner.is_empty() && !inner.contains('(') {
                    out.push_str("[\"");
                    out.push_str(&inner);
                    out.push_str("\"]");
                    i += offset + 2;
                    continue;
                }
            }
        }
        out.push(ch);
        i += 1;
    }
    out
}

/// OpenAI-compatible chat client. `OPENAI_API_BASE` points it at any
/// compatible local server without code changes.
pub struct OpenAiSpecClient {
    api_base: String,
    http: HttpClient,
    model_override: Option<String>,
}

impl OpenAiSpecClient {
    pub fn new() -> Self {
        Self {
            api_base: non_empty_env("OPENAI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            http: HttpClient::new(),
            model_override: non_empty_env("OPENAI_MODEL"),
        }
    }

    fn api_key() -> Result<String> {
        non_empty_env("OPENAI_API_KEY").context("Missing OPENAI_API_KEY")
    }

    fn chat_completion(&self, payload: &Value) -> Result<String> {
        let api_key = Self::api_key()?;
        let endpoint = format!("{}/chat/completions", self.api_base);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(payload)
            .send()
            .with_context(|| format!("chat request failed ({endpoint})"))?;
        let status = response.status();
        let body: Value = response
            .json()
            .context("chat response was not valid JSON")?;
        if !status.is_success() {
            bail!("chat request failed with status {status}: {body}");
        }
        body.get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("chat response had no message content")
    }
}

impl Default for OpenAiSpecClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Reasoning-model families reject temperature/response_format parameters.
fn supports_structured_output(model: &str) -> bool {
    !(model.starts_with("o1") || model.starts_with("o3") || model.starts_with("gpt-5"))
}

impl SpecModelClient for OpenAiSpecClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn interpret_command(
        &self,
        command: &str,
        user_context: Option<&str>,
        model: &str,
        hint: Option<RoutingHint>,
    ) -> Result<Value> {
        // OPENAI_MODEL pins one model regardless of what the tier asks for,
        // mainly for local OpenAI-compatible servers.
        let model = self.model_override.as_deref().unwrap_or(model);
        let prompt = build_spec_prompt(command, user_context, hint);
        let mut payload = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
        });
        if supports_structured_output(model) {
            payload["temperature"] = json!(0);
            payload["response_format"] = json!({"type": "json_object"});
        }
        let content = self.chat_completion(&payload)?;
        serde_json::from_str(&content).context("language model returned unparseable JSON")
    }

    fn generate_mermaid(&self, command: &str) -> Result<String> {
        let payload = json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "You are a Mermaid.js diagram expert. Generate clean, minimal, elegant diagrams."},
                {"role": "user", "content": MERMAID_PROMPT_TEMPLATE.replace("{prompt}", command)},
            ],
            "max_tokens": 2000,
            "temperature": 0.7,
        });
        let content = self.chat_completion(&payload)?;
        Ok(scrub_mermaid(&content))
    }
}

/// Offline stand-in for the language-model collaborator: deterministic,
/// hint-aware output with the same wire shapes as the real service.
pub struct DryrunSpecClient;

impl SpecModelClient for DryrunSpecClient {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn interpret_command(
        &self,
        command: &str,
        _user_context: Option<&str>,
        _model: &str,
        hint: Option<RoutingHint>,
    ) -> Result<Value> {
        let spec = match hint {
            Some(RoutingHint::Comparison) => json!({
                "visualType": "plotly",
                "plotlySpec": {
                    "data": [
                        {"type": "bar", "x": ["A", "B"], "y": [40, 60], "name": "First"},
                        {"type": "bar", "x": ["A", "B"], "y": [55, 45], "name": "Second"},
                    ],
                    "layout": {"title": command, "barmode": "group"},
                },
            }),
            Some(RoutingHint::Network) => json!({
                "visualType": "conceptual",
                "nodes": [
                    {"id": "a", "label": "A", "color": "#3b82f6"},
                    {"id": "b", "label": "B", "color": "#10b981"},
                ],
                "links": [{"source": "a", "target": "b", "label": "relates to"}],
                "elements": [{"type": "node"}],
            }),
            Some(RoutingHint::Timeseries) => json!({
                "visualType": "plotly",
                "plotlySpec": {
                    "data": [{"type": "scatter", "mode": "lines+markers",
                              "x": [1, 2, 3, 4], "y": [1, 2, 4, 8]}],
                    "layout": {"title": command},
                },
            }),
            _ => json!({
                "visualType": "conceptual",
                "elements": [{"type": "text", "x": 250, "y": 200, "label": command}],
            }),
        };
        Ok(spec)
    }

    fn generate_mermaid(&self, _command: &str) -> Result<String> {
        Ok("flowchart TD\n    A[Start] --> B[Finish]".to_string())
    }
}

/// OpenAI image generation wrapped as a single-element description.
pub struct OpenAiImageComposer {
    api_base: String,
    http: HttpClient,
    model: String,
    size: String,
}

impl OpenAiImageComposer {
    pub fn new() -> Self {
        Self {
            api_base: non_empty_env("OPENAI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            http: HttpClient::new(),
            model: non_empty_env("OPENAI_IMAGE_MODEL").unwrap_or_else(|| "gpt-image-1".to_string()),
            size: non_empty_env("OPENAI_IMAGE_SIZE").unwrap_or_else(|| "512x512".to_string()),
        }
    }

    fn generate_b64(&self, model: &str, prompt: &str, api_key: &str) -> Result<String> {
        let endpoint = format!("{}/images/generations", self.api_base);
        let payload = json!({
            "model": model,
            "prompt": prompt,
            "size": self.size,
            "response_format": "b64_json",
        });
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&payload)
            .send()
            .with_context(|| format!("image request failed ({endpoint})"))?;
        let status = response.status();
        let body: Value = response
            .json()
            .context("image response was not valid JSON")?;
        if !status.is_success() {
            bail!("image request failed with status {status}: {body}");
        }
        body.get("data")
            .and_then(Value::as_array)
            .and_then(|data| data.first())
            .and_then(|entry| entry.get("b64_json"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("image response carried no b64_json payload")
    }
}

impl Default for OpenAiImageComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageComposer for OpenAiImageComposer {
    fn name(&self) -> &str {
        "openai"
    }

    fn compose(&self, command: &str) -> Result<VisualSpec> {
        let api_key = non_empty_env("OPENAI_API_KEY").context("Missing OPENAI_API_KEY")?;
        let prompt = format!(
            "Create a clear, professional educational diagram to {command}. \
             Include labels, arrows, and visual elements. Style: clean infographic \
             with good contrast and readability. Educational and informative."
        );

        let mut models = vec![self.model.clone()];
        if self.model != "dall-e-3" {
            models.push("dall-e-3".to_string());
        }
        let mut last_error = None;
        for model in &models {
            match self.generate_b64(model, &prompt, &api_key) {
                Ok(b64) => {
                    let (width, height) = parse_dims(&self.size);
                    return Ok(image_description(
                        &format!("data:image/png;base64,{b64}"),
                        width,
                        height,
                    ));
                }
                Err(err) => {
                    log::warn!("image generation failed with {model}: {err:#}");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no image model configured")))
    }
}

fn image_description(src: &str, width: u32, height: u32) -> VisualSpec {
    let mut element = Element::new("image", 100, 60).with_size(width as i64, height as i64);
    element.src = Some(src.to_string());
    VisualSpec::conceptual(vec![element])
}

/// Offline image collaborator: renders a small deterministic PNG so the
/// wire shape (a data URL image element) matches the real service.
pub struct DryrunImageComposer;

impl ImageComposer for DryrunImageComposer {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn compose(&self, command: &str) -> Result<VisualSpec> {
        let seed: u32 = command.bytes().map(u32::from).sum();
        let (width, height) = (64u32, 64u32);
        let mut canvas = RgbImage::new(width, height);
        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            *pixel = Rgb([
                ((seed + x * 3) % 256) as u8,
                ((seed / 3 + y * 5) % 256) as u8,
                ((seed / 7 + x + y) % 256) as u8,
            ]);
        }
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("failed to encode dryrun image")?;
        Ok(image_description(
            &format!("data:image/png;base64,{}", BASE64.encode(&bytes)),
            512,
            512,
        ))
    }
}

/// Wikipedia page-image lookup: search for the best page, then ask for its
/// lead image.
pub struct WikipediaImageLookup {
    api_base: String,
    http: HttpClient,
}

impl WikipediaImageLookup {
    pub fn new() -> Self {
        Self {
            api_base: non_empty_env("WIKIPEDIA_API_BASE")
                .unwrap_or_else(|| "https://en.wikipedia.org/w/api.php".to_string()),
            http: HttpClient::new(),
        }
    }

    fn get_json(&self, params: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http
            .get(&self.api_base)
            .query(params)
            .timeout(Duration::from_secs(10))
            .send()
            .context("Wikipedia request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("Wikipedia request failed with status {status}");
        }
        response
            .json()
            .context("Wikipedia response was not valid JSON")
    }
}

impl Default for WikipediaImageLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLookup for WikipediaImageLookup {
    fn page_image(&self, term: &str) -> Result<Option<String>> {
        let search = self.get_json(&[
            ("action", "query"),
            ("format", "json"),
            ("list", "search"),
            ("srsearch", term),
            ("srlimit", "1"),
        ])?;
        let Some(title) = search
            .pointer("/query/search/0/title")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            return Ok(None);
        };

        let pages = self.get_json(&[
            ("action", "query"),
            ("format", "json"),
            ("titles", &title),
            ("prop", "pageimages"),
            ("piprop", "original"),
            ("pilicense", "any"),
        ])?;
        let url = pages
            .pointer("/query/pages")
            .and_then(Value::as_object)
            .and_then(|entries| entries.values().next())
            .and_then(|page| page.pointer("/original/source"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(url)
    }
}

/// Lookup that finds nothing; used offline and in tests.
pub struct NoopImageLookup;

impl ImageLookup for NoopImageLookup {
    fn page_image(&self, _term: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// The Interpretation Orchestrator: runs the tier chain over its external
/// collaborators and tags the winning description with its provenance.
pub struct Interpreter {
    spec_client: Box<dyn SpecModelClient>,
    image_composer: Box<dyn ImageComposer>,
    image_lookup: Box<dyn ImageLookup>,
    tiers: TierRegistry,
    flags: DeploymentFlags,
    events: Option<EventWriter>,
}

impl Interpreter {
    pub fn new(
        spec_client: Box<dyn SpecModelClient>,
        image_composer: Box<dyn ImageComposer>,
        image_lookup: Box<dyn ImageLookup>,
        tiers: TierRegistry,
        flags: DeploymentFlags,
        events: Option<EventWriter>,
    ) -> Self {
        Self {
            spec_client,
            image_composer,
            image_lookup,
            tiers,
            flags,
            events,
        }
    }

    /// Fully offline interpreter; every collaborator is a dry-run stand-in.
    pub fn dryrun(flags: DeploymentFlags, events: Option<EventWriter>) -> Self {
        Self::new(
            Box::new(DryrunSpecClient),
            Box::new(DryrunImageComposer),
            Box::new(NoopImageLookup),
            TierRegistry::default(),
            flags,
            events,
        )
    }

    pub fn openai(flags: DeploymentFlags, events: Option<EventWriter>) -> Self {
        Self::new(
            Box::new(OpenAiSpecClient::new()),
            Box::new(OpenAiImageComposer::new()),
            Box::new(WikipediaImageLookup::new()),
            TierRegistry::default(),
            flags,
            events,
        )
    }

    /// Run the tier chain for one command. Tiers execute strictly in
    /// sequence, cheapest first, and the first success short-circuits.
    pub fn interpret(
        &self,
        command: &str,
        user_context: Option<&str>,
        context: &TierContext,
    ) -> InterpretationResult {
        let request_id = Uuid::new_v4();

        if command.chars().count() > MAX_COMMAND_CHARS {
            let detail = format!("command too long (max {MAX_COMMAND_CHARS} characters)");
            self.emit(request_id, "command_rejected", &[("reason", &detail)]);
            return InterpretationResult::error(request_id, detail);
        }

        let model = self.tiers.config(context.subscription_tier).llm_model.clone();
        let is_math = hints::is_math_command(command);
        let mut last_error: Option<String> = None;

        // Fast pre-pass: math-shaped commands skip the billable tiers when a
        // deterministic matcher can already claim them.
        if is_math && !context.rules_disabled {
            self.emit(request_id, "tier_attempted", &[("tier", "rules"), ("phase", "math-pre-pass")]);
            if let Some(spec) = interpret_by_rules(command) {
                return self.resolved(request_id, Provenance::Rules, spec);
            }
        }

        let hint = hints::classify(command);

        // Sequential processes read best as Mermaid sequence diagrams; ask
        // for one before the general language-model tier.
        if !is_math && hints::wants_sequential_diagram(command) {
            self.emit(request_id, "tier_attempted", &[("tier", "llm"), ("phase", "mermaid")]);
            match self.spec_client.generate_mermaid(command) {
                Ok(code) if !code.trim().is_empty() => {
                    return self.resolved(request_id, Provenance::Llm, VisualSpec::mermaid(code.trim()));
                }
                Ok(_) => {
                    log::warn!("mermaid generation returned empty source; falling through");
                }
                Err(err) => {
                    let detail = error_chain_text(&err);
                    self.emit(request_id, "tier_failed", &[("tier", "llm"), ("phase", "mermaid"), ("error", &detail)]);
                    last_error = Some(detail);
                }
            }
        }

        // Image tier.
        let image_worthy =
            (hints::wants_generated_image(command) || self.flags.image_first)
                && !hints::is_logo_request(command);
        if image_worthy && context.image_generation_allowed {
            self.emit(
                request_id,
                "tier_attempted",
                &[("tier", "image"), ("provider", self.image_composer.name())],
            );
            match self.image_composer.compose(command) {
                Ok(spec) => return self.resolved(request_id, Provenance::Image, spec),
                Err(err) => {
                    let detail = error_chain_text(&err);
                    self.emit(request_id, "tier_failed", &[("tier", "image"), ("error", &detail)]);
                    last_error = Some(detail);
                }
            }
        } else if image_worthy {
            log::info!(
                "image generation not allowed for {} tier",
                context.subscription_tier.as_str()
            );
        }

        // Language-model tier.
        self.emit(
            request_id,
            "tier_attempted",
            &[
                ("tier", "llm"),
                ("model", &model),
                ("provider", self.spec_client.name()),
            ],
        );
        match self
            .spec_client
            .interpret_command(command, user_context, &model, hint)
        {
            Ok(raw) => match self.accept_llm_candidate(command, &raw) {
                Ok(spec) => return self.resolved(request_id, Provenance::Llm, spec),
                Err(detail) => {
                    self.emit(request_id, "tier_failed", &[("tier", "llm"), ("error", &detail)]);
                    last_error = Some(detail);
                }
            },
            Err(err) => {
                let detail = error_chain_text(&err);
                self.emit(request_id, "tier_failed", &[("tier", "llm"), ("error", &detail)]);
                last_error = Some(detail);
            }
        }

        // Requiring AI means deterministic fallbacks are disallowed by
        // policy: stop here with the upstream failure.
        if context.ai_required {
            let detail = last_error.unwrap_or_else(|| "AI unavailable".to_string());
            self.emit(request_id, "interpretation_failed", &[("reason", &detail)]);
            return InterpretationResult::error(request_id, detail);
        }

        // Rule-based tier.
        if !context.rules_disabled {
            self.emit(request_id, "tier_attempted", &[("tier", "rules")]);
            if let Some(spec) = interpret_by_rules(command) {
                return self.resolved(request_id, Provenance::Rules, spec);
            }
        }

        // Naive fallback tier always produces some description.
        self.emit(request_id, "tier_attempted", &[("tier", "fallback")]);
        let mut result =
            self.resolved(request_id, Provenance::Fallback, fallback_naive(command));
        result.error_detail = last_error;
        result
    }

    /// Validate a language-model candidate: normalize it, then check the
    /// tagged payload actually arrived.
    fn accept_llm_candidate(&self, command: &str, raw: &Value) -> std::result::Result<VisualSpec, String> {
        let mut spec = normalize(raw);
        if spec.has_graph_data() {
            return Ok(spec);
        }
        match spec.visual_type.as_str() {
            "plotly" | "mermaid" => Ok(spec),
            "mathematical" | "mathematical_interactive" => {
                let has_expression = spec
                    .expressions
                    .as_ref()
                    .is_some_and(|list| list.iter().any(|expr| !expr.trim().is_empty()))
                    || spec
                        .expression
                        .as_ref()
                        .is_some_and(|expr| !expr.trim().is_empty());
                if has_expression {
                    Ok(spec)
                } else {
                    Err(format!(
                        "language model returned {} without an expression",
                        spec.visual_type
                    ))
                }
            }
            _ => {
                if spec.elements.is_empty() {
                    return Err(describe_rejection(raw));
                }
                replace_trivial_text(command, &mut spec);
                Ok(spec)
            }
        }
    }

    fn resolved(
        &self,
        request_id: Uuid,
        source: Provenance,
        mut spec: VisualSpec,
    ) -> InterpretationResult {
        self.resolve_image_terms(&mut spec);
        self.emit(
            request_id,
            "interpretation_resolved",
            &[("source", source.as_str()), ("visual_type", &spec.visual_type)],
        );
        InterpretationResult::resolved(request_id, source, spec)
    }

    /// Fill in `src` for image elements that name a subject instead of
    /// carrying a URL. Lookup failure is a soft signal, never an error.
    fn resolve_image_terms(&self, spec: &mut VisualSpec) {
        for element in &mut spec.elements {
            if element.kind != "image" || element.src.is_some() {
                continue;
            }
            let Some(term) = element
                .celebrity_name
                .clone()
                .or_else(|| element.anatomy_term.clone())
                .or_else(|| element.geography_term.clone())
            else {
                continue;
            };
            match self.image_lookup.page_image(&term) {
                Ok(Some(url)) => {
                    log::info!("resolved reference image for '{term}'");
                    element.src = Some(url);
                }
                Ok(None) => log::warn!("no reference image found for '{term}'"),
                Err(err) => log::warn!("reference image lookup failed for '{term}': {err:#}"),
            }
        }
    }

    fn emit(&self, request_id: Uuid, event_type: &str, fields: &[(&str, &str)]) {
        let Some(events) = &self.events else {
            return;
        };
        let mut payload = EventPayload::new();
        for (key, value) in fields {
            payload.insert((*key).to_string(), Value::String((*value).to_string()));
        }
        if let Err(err) = events.emit(request_id, event_type, payload) {
            log::warn!("failed to record {event_type} event: {err:#}");
        }
    }
}

fn describe_rejection(raw: &Value) -> String {
    let declared = raw
        .get("visualType")
        .and_then(Value::as_str)
        .unwrap_or("conceptual");
    match declared {
        "plotly" => "language model returned plotly without a plotlySpec".to_string(),
        "mermaid" => "language model returned mermaid without mermaidCode".to_string(),
        _ => "language model returned no renderable visualization data".to_string(),
    }
}

/// A single long text element is an intentional message and survives; a
/// description that is nothing but short text becomes a labeled card.
fn replace_trivial_text(command: &str, spec: &mut VisualSpec) {
    if spec.elements.is_empty() || !spec.elements.iter().all(|element| element.kind == "text") {
        return;
    }
    let first_label = spec.elements[0].label.clone().unwrap_or_default();
    if first_label.chars().count() > 50 {
        return;
    }
    let subject = extract_subject(command).unwrap_or(if first_label.is_empty() {
        "Item".to_string()
    } else {
        first_label
    });
    spec.elements = label_card(&subject);
}
