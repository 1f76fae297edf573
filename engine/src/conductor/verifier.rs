//! Conductor Verifier
//!
//! Scores an execution trace and renders it for humans. Everything here is a
//! pure function of the trace: no I/O, no clock, no randomness, so verifying
//! the same trace twice yields identical reports.

use crate::conductor::types::{ExecutionTrace, StepResult, StepStatus, VerificationReport};
use crate::tools::{github, weather};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub const NO_STEPS_ISSUE: &str = "No actionable steps were planned";

const RULE: &str = "==================================================";
const SUBRULE: &str = "------------------------------";
const MAX_RENDERED_REPOS: usize = 5;
const MAX_DESCRIPTION_CHARS: usize = 80;

/// Stateless trace verifier
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier;

impl Verifier {
    pub fn new() -> Self {
        Self
    }

    pub fn verify(&self, trace: &ExecutionTrace) -> VerificationReport {
        let issues = collect_issues(trace);

        VerificationReport {
            completeness_score: completeness_score(trace),
            formatted_response: render_response(trace, &issues),
            summary: headline(trace),
            structured_summary: structured_summary(trace),
            issues,
        }
    }
}

/// Fraction of steps that succeeded; 1.0 for an empty trace
pub fn completeness_score(trace: &ExecutionTrace) -> f64 {
    if trace.is_empty() {
        return 1.0;
    }
    trace.succeeded_count() as f64 / trace.len() as f64
}

fn step_label(result: &StepResult) -> String {
    format!("Step {} ({})", result.step.index + 1, result.step.tool_name)
}

/// Field a tool's output must carry to count as complete
fn expected_field(tool_name: &str) -> Option<&'static str> {
    match tool_name {
        github::TOOL_NAME => Some("repositories"),
        weather::TOOL_NAME => Some("temperature"),
        _ => None,
    }
}

fn collect_issues(trace: &ExecutionTrace) -> Vec<String> {
    if trace.is_empty() {
        return vec![NO_STEPS_ISSUE.to_string()];
    }

    let mut issues = Vec::new();

    for result in &trace.results {
        match result.status {
            StepStatus::Failed => {
                let detail = result
                    .error
                    .as_ref()
                    .map(|e| format!("{}: {}", e.reason, e.message))
                    .unwrap_or_else(|| "unknown".to_string());
                issues.push(format!(
                    "{} failed after {} attempt(s): {}",
                    step_label(result),
                    result.attempts,
                    detail
                ));
            }
            StepStatus::Skipped => {
                let detail = result
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                issues.push(format!("{} skipped: {}", step_label(result), detail));
            }
            StepStatus::Succeeded => {
                if let Some(field) = expected_field(&result.step.tool_name) {
                    let present = result
                        .output
                        .as_ref()
                        .and_then(|o| o.get(field))
                        .is_some_and(|v| !v.is_null());
                    if !present {
                        issues.push(format!(
                            "{} returned partial data: missing '{}'",
                            step_label(result),
                            field
                        ));
                    }
                }
            }
        }
    }

    issues
}

/// Plain text for a JSON scalar, "N/A" when absent
fn celsius(output: &Value) -> String {
    match output.get("temperature").filter(|v| !v.is_null()) {
        Some(value) => format!("{}°C", display_value(Some(value))),
        None => "temperature unavailable".to_string(),
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// City from the tool output, else from the step arguments
fn weather_city(result: &StepResult) -> String {
    result
        .output
        .as_ref()
        .and_then(|o| o.get("city"))
        .and_then(Value::as_str)
        .or_else(|| result.step.arguments.param_str_opt("city"))
        .unwrap_or("Unknown")
        .to_string()
}

fn repositories(output: &Value) -> &[Value] {
    output
        .get("repositories")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn render_github(output: &Value, lines: &mut Vec<String>) {
    lines.push("GITHUB REPOSITORIES:".to_string());
    lines.push(SUBRULE.to_string());

    let repos = repositories(output);
    if repos.is_empty() {
        lines.push("  No repositories matched the search".to_string());
        lines.push(String::new());
    }

    for (rank, repo) in repos.iter().take(MAX_RENDERED_REPOS).enumerate() {
        let stars = repo.get("stars").and_then(Value::as_u64).unwrap_or(0);
        let language = repo
            .get("language")
            .and_then(Value::as_str)
            .map(|l| format!(" [{}]", l))
            .unwrap_or_default();
        lines.push(format!(
            "  {}. {}{}",
            rank + 1,
            display_value(repo.get("full_name")),
            language
        ));
        lines.push(format!("     Stars: {}", group_thousands(stars)));
        let description = repo
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("No description");
        lines.push(format!(
            "     {}",
            truncate(description, MAX_DESCRIPTION_CHARS)
        ));
        if let Some(url) = repo.get("url").and_then(Value::as_str) {
            lines.push(format!("     {}", url));
        }
        lines.push(String::new());
    }
}

fn render_weather(result: &StepResult, output: &Value, lines: &mut Vec<String>) {
    let city = weather_city(result);
    let location = match output.get("country").and_then(Value::as_str) {
        Some(country) if !country.is_empty() => format!("{}, {}", city, country),
        _ => city,
    };

    lines.push("WEATHER:".to_string());
    lines.push(SUBRULE.to_string());
    lines.push(format!(
        "  {}: {}, {}",
        location,
        celsius(output),
        display_value(output.get("condition"))
    ));

    let details = [
        ("Feels Like", "feels_like", "°C"),
        ("Temperature (F)", "temperature_fahrenheit", "°F"),
        ("Humidity", "humidity", "%"),
        ("Wind Speed", "wind_speed_mps", " m/s"),
        ("Visibility", "visibility_km", " km"),
    ];
    for (label, key, unit) in details {
        if let Some(value) = output.get(key).filter(|v| !v.is_null()) {
            lines.push(format!("  {}: {}{}", label, display_value(Some(value)), unit));
        }
    }
    lines.push(String::new());
}

fn render_response(trace: &ExecutionTrace, issues: &[String]) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "RESULTS".to_string(),
        RULE.to_string(),
        String::new(),
    ];

    for result in trace.results.iter().filter(|r| r.succeeded()) {
        let Some(output) = result.output.as_ref() else {
            continue;
        };
        match result.step.tool_name.as_str() {
            github::TOOL_NAME => render_github(output, &mut lines),
            weather::TOOL_NAME => render_weather(result, output, &mut lines),
            other => {
                lines.push(format!("{}:", other.to_uppercase()));
                lines.push(SUBRULE.to_string());
                lines.push(format!("  {}", output));
                lines.push(String::new());
            }
        }
    }

    if !issues.is_empty() {
        lines.push("ISSUES:".to_string());
        lines.push(SUBRULE.to_string());
        for issue in issues {
            lines.push(format!("  - {}", issue));
        }
        lines.push(String::new());
    }

    lines.push(RULE.to_string());
    lines.join("\n")
}

/// One-line summary, e.g. "Found 5 GitHub repositories. Weather in Tokyo: 18.5°C"
pub fn headline(trace: &ExecutionTrace) -> String {
    if trace.is_empty() {
        return NO_STEPS_ISSUE.to_string();
    }

    let mut parts = Vec::new();
    for result in trace.results.iter().filter(|r| r.succeeded()) {
        let Some(output) = result.output.as_ref() else {
            continue;
        };
        match result.step.tool_name.as_str() {
            github::TOOL_NAME => parts.push(format!(
                "Found {} GitHub repositories",
                repositories(output).len()
            )),
            weather::TOOL_NAME => parts.push(format!(
                "Weather in {}: {}",
                weather_city(result),
                celsius(output)
            )),
            _ => {}
        }
    }

    if !parts.is_empty() {
        parts.join(". ")
    } else if trace.succeeded_count() == 0 {
        "No steps succeeded".to_string()
    } else {
        "Task completed".to_string()
    }
}

fn category(tool_name: &str) -> &str {
    match tool_name {
        github::TOOL_NAME => "github",
        other => other,
    }
}

/// Key facts per tool category; one entry per succeeded step
pub fn structured_summary(trace: &ExecutionTrace) -> BTreeMap<String, Value> {
    let mut summary: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for result in trace.results.iter().filter(|r| r.succeeded()) {
        let Some(output) = result.output.as_ref() else {
            continue;
        };

        let facts = match result.step.tool_name.as_str() {
            github::TOOL_NAME => {
                let repos = repositories(output);
                json!({
                    "total_count": output.get("total_count").cloned().unwrap_or(Value::Null),
                    "returned": repos.len(),
                    "top": repos.iter().filter_map(|r| r.get("full_name").cloned()).collect::<Vec<_>>(),
                })
            }
            weather::TOOL_NAME => {
                let mut facts = Map::new();
                facts.insert("city".to_string(), Value::String(weather_city(result)));
                for key in ["temperature", "condition", "humidity"] {
                    if let Some(value) = output.get(key) {
                        facts.insert(key.to_string(), value.clone());
                    }
                }
                Value::Object(facts)
            }
            _ => output.clone(),
        };

        summary
            .entry(category(&result.step.tool_name).to_string())
            .or_default()
            .push(facts);
    }

    summary
        .into_iter()
        .map(|(k, v)| (k, Value::Array(v)))
        .collect()
}
