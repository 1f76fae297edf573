//! Conductor Planner
//!
//! Turns a task description into a [`Plan`]. The LLM is asked for a JSON
//! object naming registered tools only; its reply is validated against the
//! registry's schemas before anything trusts it. Validation failures count
//! as malformed replies. When every LLM attempt fails the planner falls back
//! to [`fallback_plan`], a pure keyword matcher that never fails.

use crate::conductor::types::{Plan, PlanSource, PlanStep};
use crate::llm::{self, LLMError, LLMProvider, Message};
use crate::tools::{github, weather, ToolRegistry};
use regex::Regex;
use sdk::{SchemaViolation, ToolArgs};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

const FALLBACK_REASONING: &str = "Fallback plan generated from keyword extraction";
const FALLBACK_SEARCH_LIMIT: i64 = 5;
const MAX_QUERY_WORDS: usize = 5;

/// Why an LLM reply could not be turned into a plan
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanParseError {
    #[error("plan does not match the expected shape: {0}")]
    Shape(String),

    #[error("plan has no steps")]
    EmptySteps,

    #[error("step {index}: unknown tool '{tool}'")]
    UnknownTool { index: usize, tool: String },

    #[error("step {index}: {violation}")]
    InvalidArguments {
        index: usize,
        violation: SchemaViolation,
    },

    #[error("step {index}: depends_on {dependency} does not refer to an earlier step")]
    BadDependency { index: usize, dependency: usize },
}

impl From<PlanParseError> for LLMError {
    fn from(err: PlanParseError) -> Self {
        LLMError::Malformed(err.to_string())
    }
}

/// Intermediate deserialization type for LLM JSON output
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    reasoning: String,
    steps: Vec<RawPlanStep>,
}

#[derive(Debug, Deserialize)]
struct RawPlanStep {
    tool: String,
    #[serde(default)]
    arguments: BTreeMap<String, Value>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    depends_on: Vec<usize>,
}

pub struct Planner {
    llm: Arc<dyn LLMProvider>,
    registry: Arc<ToolRegistry>,
    attempts: u32,
}

impl Planner {
    /// `attempts` is the number of LLM calls made before falling back (minimum 1).
    pub fn new(llm: Arc<dyn LLMProvider>, registry: Arc<ToolRegistry>, attempts: u32) -> Self {
        Self {
            llm,
            registry,
            attempts: attempts.max(1),
        }
    }

    /// Produce a plan for `task`. Never fails; the worst case is an empty
    /// fallback plan.
    pub async fn plan(&self, task: &str) -> Plan {
        for attempt in 1..=self.attempts {
            match self.llm_plan(task).await {
                Ok(plan) => {
                    info!(
                        "LLM plan ready: {} step(s) {:?}",
                        plan.len(),
                        plan.tool_names()
                    );
                    return plan;
                }
                Err(e) => {
                    warn!(
                        "LLM planning attempt {}/{} failed ({:?}): {}",
                        attempt,
                        self.attempts,
                        e.kind(),
                        e
                    );
                }
            }
        }

        let plan = fallback_plan(task);
        warn!(
            "Using fallback plan with {} step(s) {:?}",
            plan.len(),
            plan.tool_names()
        );
        plan
    }

    async fn llm_plan(&self, task: &str) -> llm::Result<Plan> {
        let messages = [
            Message::system(self.system_prompt()),
            Message::user(format!("Task: {}", task)),
        ];

        let content = self.llm.generate(&messages).await?;
        debug!("Planner LLM reply: {} chars", content.len());

        let value = llm::extract_json_object(&content)?;
        Ok(self.parse_plan(task, &value)?)
    }

    /// Validate an LLM JSON reply against the registry and build a plan.
    pub fn parse_plan(&self, task: &str, value: &Value) -> Result<Plan, PlanParseError> {
        if !value.is_object() {
            return Err(PlanParseError::Shape("expected a JSON object".to_string()));
        }

        let raw: RawPlan = serde_json::from_value(value.clone())
            .map_err(|e| PlanParseError::Shape(e.to_string()))?;

        if raw.steps.is_empty() {
            return Err(PlanParseError::EmptySteps);
        }

        let mut steps = Vec::with_capacity(raw.steps.len());

        for (index, raw_step) in raw.steps.into_iter().enumerate() {
            let tool = self.registry.resolve(&raw_step.tool).map_err(|_| {
                PlanParseError::UnknownTool {
                    index,
                    tool: raw_step.tool.clone(),
                }
            })?;

            let arguments = ToolArgs::from(raw_step.arguments);
            tool.parameters()
                .validate(&arguments)
                .map_err(|violation| PlanParseError::InvalidArguments { index, violation })?;

            if let Some(&dependency) = raw_step.depends_on.iter().find(|&&d| d >= index) {
                return Err(PlanParseError::BadDependency { index, dependency });
            }

            let description = if raw_step.description.trim().is_empty() {
                format!("Call {}", raw_step.tool)
            } else {
                raw_step.description
            };

            steps.push(
                PlanStep::new(index, raw_step.tool, arguments, description)
                    .with_depends_on(raw_step.depends_on),
            );
        }

        Ok(Plan {
            task: task.to_string(),
            steps,
            source: PlanSource::Llm,
            reasoning: raw.reasoning,
        })
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are the planning component of an operations assistant. Break the user's task \
            into an ordered list of tool calls using ONLY the tools listed below.\n\n\
            Available tools:\n\n{}\n\
            Respond with ONLY a JSON object of this exact shape, no markdown, no explanation:\n\
            {{\"reasoning\": \"short explanation\", \"steps\": [\
            {{\"tool\": \"tool_name\", \"arguments\": {{\"param\": \"value\"}}, \
            \"description\": \"what this step does\", \"depends_on\": []}}]}}\n\n\
            Rules:\n\
            1. \"tool\" must be one of the tool names above.\n\
            2. \"arguments\" may only contain that tool's parameters, with the listed types. \
            Include every required parameter.\n\
            3. \"depends_on\" lists zero-based indices of EARLIER steps whose success this step needs. \
            Leave it empty for independent steps.\n\
            4. Use as few steps as possible.",
            self.registry.describe_for_prompt()
        )
    }
}

/// Cities recognised without any surrounding cue
const KNOWN_CITIES: &[&str] = &[
    "new york",
    "london",
    "tokyo",
    "paris",
    "berlin",
    "sydney",
    "mumbai",
    "singapore",
    "dubai",
    "san francisco",
    "los angeles",
    "chicago",
    "seattle",
    "boston",
    "toronto",
    "vancouver",
];

const WEATHER_KEYWORDS: &[&str] = &[
    "weather",
    "temperature",
    "forecast",
    "climate",
    "rain",
    "sunny",
];

const LOCATION_PREPOSITIONS: &[&str] = &["in", "for", "at"];

/// Words never used as GitHub search terms
const QUERY_STOP_WORDS: &[&str] = &[
    "find", "search", "get", "show", "list", "the", "a", "an", "for", "in", "on", "at", "of",
    "and", "with", "top", "best", "me", "some", "check", "tell", "what", "what's", "whats", "is",
    "are", "also", "please", "about", "github", "repo", "repos", "repository", "repositories",
    "weather", "temperature", "forecast", "climate", "rain", "sunny", "popular", "trending",
];

static GITHUB_CUE: OnceLock<Regex> = OnceLock::new();

fn github_cue() -> &'static Regex {
    GITHUB_CUE.get_or_init(|| {
        Regex::new(r"(?i)\b(github|repos?|repositor(?:y|ies))\b")
            .expect("Invalid GitHub cue pattern")
    })
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '+' && c != '#')
        .to_lowercase()
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A known city mentioned as whole words, or a capitalised word following a
/// location preposition when the task talks about weather.
fn extract_city(task: &str) -> Option<String> {
    let words: Vec<&str> = task.split_whitespace().collect();
    let normalized: Vec<String> = words.iter().map(|w| normalize_word(w)).collect();

    for city in KNOWN_CITIES {
        let parts: Vec<&str> = city.split(' ').collect();
        if normalized
            .windows(parts.len())
            .any(|window| window.iter().zip(&parts).all(|(w, p)| w == p))
        {
            return Some(title_case(city));
        }
    }

    if !normalized
        .iter()
        .any(|w| WEATHER_KEYWORDS.contains(&w.as_str()))
    {
        return None;
    }

    for (i, word) in normalized.iter().enumerate() {
        if !LOCATION_PREPOSITIONS.contains(&word.as_str()) {
            continue;
        }
        let city: Vec<&str> = words[i + 1..]
            .iter()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .take_while(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
            .collect();
        if !city.is_empty() {
            return Some(city.join(" "));
        }
    }

    None
}

/// Content words of the task, minus stop words and the detected city
fn extract_search_query(task: &str, city: Option<&str>) -> String {
    let city_words: Vec<String> = city
        .map(|c| c.split_whitespace().map(normalize_word).collect())
        .unwrap_or_default();

    let query: Vec<&str> = task
        .split_whitespace()
        .filter(|w| {
            let norm = normalize_word(w);
            !norm.is_empty()
                && !QUERY_STOP_WORDS.contains(&norm.as_str())
                && !city_words.contains(&norm)
        })
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#'))
        .take(MAX_QUERY_WORDS)
        .collect();

    if query.is_empty() {
        "stars:>1000".to_string()
    } else {
        query.join(" ")
    }
}

/// Deterministic keyword planner used when the LLM path fails.
///
/// A GitHub cue yields a `github_search` step, a recognisable city yields a
/// `weather` step, GitHub first. Same input, same plan; no cue, empty plan.
pub fn fallback_plan(task: &str) -> Plan {
    let mut steps = Vec::new();
    let city = extract_city(task);

    if github_cue().is_match(task) {
        let query = extract_search_query(task, city.as_deref());
        let arguments = ToolArgs::new()
            .with_param("query", Value::String(query.clone()))
            .with_param("limit", Value::from(FALLBACK_SEARCH_LIMIT));
        steps.push(PlanStep::new(
            steps.len(),
            github::TOOL_NAME,
            arguments,
            format!("Search GitHub repositories for '{}'", query),
        ));
    }

    if let Some(city) = city {
        let arguments = ToolArgs::new().with_param("city", Value::String(city.clone()));
        steps.push(PlanStep::new(
            steps.len(),
            weather::TOOL_NAME,
            arguments,
            format!("Get current weather for {}", city),
        ));
    }

    Plan {
        task: task.to_string(),
        steps,
        source: PlanSource::Fallback,
        reasoning: FALLBACK_REASONING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct SchemaTool {
        name: &'static str,
        schema: ParameterSchema,
    }

    #[async_trait]
    impl Tool for SchemaTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test"
        }

        fn parameters(&self) -> ParameterSchema {
            self.schema.clone()
        }

        async fn invoke(&self, _args: &ToolArgs) -> Result<Value, ToolError> {
            Ok(Value::Null)
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(SchemaTool {
                name: "weather",
                schema: ParameterSchema::new(vec![
                    ParameterSpec::required("city", ParamType::String, "City"),
                    ParameterSpec::optional("country_code", ParamType::String, "Country"),
                ]),
            }))
            .unwrap();
        registry
            .register(Arc::new(SchemaTool {
                name: "github_search",
                schema: ParameterSchema::new(vec![
                    ParameterSpec::required("query", ParamType::String, "Query"),
                    ParameterSpec::optional("limit", ParamType::Integer, "Limit"),
                ]),
            }))
            .unwrap();
        Arc::new(registry)
    }

    /// Replays scripted replies and records how often it was called
    struct ScriptedLLM {
        replies: Mutex<Vec<Result<String, LLMError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedLLM {
        fn new(replies: Vec<Result<String, LLMError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedLLM {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _messages: &[Message]) -> llm::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Err(LLMError::ProviderUnavailable("script exhausted".into()))
            } else {
                replies.remove(0)
            }
        }
    }

    fn planner_with(replies: Vec<Result<String, LLMError>>) -> (Planner, Arc<ScriptedLLM>) {
        let llm = Arc::new(ScriptedLLM::new(replies));
        (Planner::new(llm.clone(), registry(), 2), llm)
    }

    #[test]
    fn test_parse_valid_plan() {
        let (planner, _) = planner_with(vec![]);
        let value = json!({
            "reasoning": "two lookups",
            "steps": [
                {"tool": "github_search", "arguments": {"query": "rust", "limit": 3}, "description": "Search"},
                {"tool": "weather", "arguments": {"city": "Tokyo"}, "depends_on": [0]}
            ]
        });

        let plan = planner.parse_plan("task", &value).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.source, PlanSource::Llm);
        assert_eq!(plan.steps[1].index, 1);
        assert_eq!(plan.steps[1].depends_on, vec![0]);
        assert_eq!(plan.steps[1].description, "Call weather");
    }

    #[test]
    fn test_parse_rejects_unknown_tool() {
        let (planner, _) = planner_with(vec![]);
        let value = json!({"steps": [{"tool": "translate", "arguments": {}}]});
        assert!(matches!(
            planner.parse_plan("t", &value),
            Err(PlanParseError::UnknownTool { index: 0, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_schema_violations() {
        let (planner, _) = planner_with(vec![]);

        let missing = json!({"steps": [{"tool": "weather", "arguments": {}}]});
        assert!(matches!(
            planner.parse_plan("t", &missing),
            Err(PlanParseError::InvalidArguments {
                violation: SchemaViolation::MissingParameter(_),
                ..
            })
        ));

        let wrong_type = json!({"steps": [{"tool": "github_search", "arguments": {"query": "x", "limit": "3"}}]});
        assert!(matches!(
            planner.parse_plan("t", &wrong_type),
            Err(PlanParseError::InvalidArguments {
                violation: SchemaViolation::WrongType { .. },
                ..
            })
        ));

        let extra = json!({"steps": [{"tool": "weather", "arguments": {"city": "Oslo", "units": "metric"}}]});
        assert!(matches!(
            planner.parse_plan("t", &extra),
            Err(PlanParseError::InvalidArguments {
                violation: SchemaViolation::UnknownParameter(_),
                ..
            })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        let (planner, _) = planner_with(vec![]);
        assert!(matches!(
            planner.parse_plan("t", &json!([1, 2])),
            Err(PlanParseError::Shape(_))
        ));
        assert!(matches!(
            planner.parse_plan("t", &json!({"reasoning": "no steps"})),
            Err(PlanParseError::Shape(_))
        ));
        assert_eq!(
            planner.parse_plan("t", &json!({"steps": []})),
            Err(PlanParseError::EmptySteps)
        );
        assert!(matches!(
            planner.parse_plan(
                "t",
                &json!({"steps": [{"tool": "weather", "arguments": {"city": "Oslo"}, "depends_on": [0]}]})
            ),
            Err(PlanParseError::BadDependency { index: 0, dependency: 0 })
        ));
    }

    #[tokio::test]
    async fn test_llm_plan_used_when_valid() {
        let reply = r#"```json
{"reasoning": "weather only", "steps": [{"tool": "weather", "arguments": {"city": "Paris"}, "description": "Weather"}]}
```"#;
        let (planner, llm) = planner_with(vec![Ok(reply.to_string())]);

        let plan = planner.plan("Weather in Paris?").await;
        assert_eq!(plan.source, PlanSource::Llm);
        assert_eq!(plan.tool_names(), vec!["weather"]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_retried_once() {
        let good = r#"{"steps": [{"tool": "weather", "arguments": {"city": "Paris"}}]}"#;
        let (planner, llm) = planner_with(vec![
            Ok(r#"{"steps": [{"tool": "teleport", "arguments": {}}]}"#.to_string()),
            Ok(good.to_string()),
        ]);

        let plan = planner.plan("Weather in Paris?").await;
        assert_eq!(plan.source, PlanSource::Llm);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_falls_back_after_two_failures() {
        let (planner, llm) = planner_with(vec![
            Err(LLMError::Timeout),
            Ok("not json at all".to_string()),
            Ok(r#"{"steps": [{"tool": "weather", "arguments": {"city": "Paris"}}]}"#.to_string()),
        ]);

        let plan = planner.plan("What's the weather in Tokyo?").await;
        assert_eq!(plan.source, PlanSource::Fallback);
        assert_eq!(plan.tool_names(), vec!["weather"]);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fallback_weather_known_city() {
        let plan = fallback_plan("What's the weather in Tokyo?");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].tool_name, "weather");
        assert_eq!(plan.steps[0].arguments.param_str("city").unwrap(), "Tokyo");
    }

    #[test]
    fn test_fallback_weather_multi_word_city() {
        let plan = fallback_plan("how hot is it in new york today");
        assert_eq!(plan.steps[0].arguments.param_str("city").unwrap(), "New York");
    }

    #[test]
    fn test_fallback_weather_after_preposition() {
        let plan = fallback_plan("Give me the forecast for Reykjavik, please");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].arguments.param_str("city").unwrap(), "Reykjavik");
    }

    #[test]
    fn test_fallback_preposition_needs_weather_keyword() {
        let plan = fallback_plan("Tell me a story set in Narnia");
        assert!(plan.is_empty());
    }

    #[test]
    fn test_fallback_github_and_weather_ordering() {
        let plan = fallback_plan("Find top Python AI repositories and check the weather in New York");
        assert_eq!(plan.tool_names(), vec!["github_search", "weather"]);
        assert_eq!(plan.steps[0].index, 0);
        assert_eq!(plan.steps[1].index, 1);
        assert_eq!(
            plan.steps[0].arguments.param_str("query").unwrap(),
            "Python AI"
        );
        assert_eq!(plan.steps[0].arguments.param_i64_opt("limit"), Some(5));
        assert_eq!(plan.steps[1].arguments.param_str("city").unwrap(), "New York");
    }

    #[test]
    fn test_fallback_repo_word_boundaries() {
        assert!(fallback_plan("show me rust repos").tool_names() == vec!["github_search"]);
        assert!(fallback_plan("please report the status").is_empty());
    }

    #[test]
    fn test_fallback_no_keywords_is_empty() {
        let plan = fallback_plan("Compose a haiku about autumn");
        assert!(plan.is_empty());
        assert_eq!(plan.source, PlanSource::Fallback);
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let task = "github machine learning repos and weather for Berlin";
        assert_eq!(fallback_plan(task), fallback_plan(task));
    }
}
