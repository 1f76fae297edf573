//! Integration tests for the built-in tools
//!
//! Each tool talks to a wiremock server standing in for the real API.

use opsagent_engine::conductor::{
    Executor, Plan, PlanSource, PlanStep, RetryPolicy, StepStatus, Verifier,
};
use opsagent_engine::config::{GithubConfig, WeatherConfig};
use opsagent_engine::secrets::SecretString;
use opsagent_engine::tools::github::GithubTool;
use opsagent_engine::tools::weather::WeatherTool;
use opsagent_engine::tools::ToolRegistry;
use sdk::{Tool, ToolArgs, ToolErrorReason};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn github_tool(server: &MockServer, token: Option<&str>) -> GithubTool {
    let config = GithubConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    };
    GithubTool::new(&config, token.map(SecretString::new)).unwrap()
}

fn weather_tool(server: &MockServer) -> WeatherTool {
    let config = WeatherConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    };
    WeatherTool::new(&config, Some(SecretString::new("0123456789abcdef0123456789abcdef"))).unwrap()
}

fn search(query: &str) -> ToolArgs {
    ToolArgs::new().with_param("query", json!(query))
}

fn city(name: &str) -> ToolArgs {
    ToolArgs::new().with_param("city", json!(name))
}

#[tokio::test]
async fn test_github_search_parses_repositories() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("q", "async runtime"))
        .and(query_param("sort", "stars"))
        .and(query_param("per_page", "2"))
        .and(header("authorization", "Bearer ghp_testtoken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1234,
            "items": [
                {"name": "tokio", "full_name": "tokio-rs/tokio", "description": "A runtime",
                 "stargazers_count": 25000, "forks_count": 2300, "language": "Rust",
                 "html_url": "https://github.com/tokio-rs/tokio"},
                {"name": "async-std", "full_name": "async-rs/async-std", "description": null,
                 "stargazers_count": 3900, "forks_count": 340, "language": "Rust",
                 "html_url": "https://github.com/async-rs/async-std"},
                {"name": "smol", "full_name": "smol-rs/smol", "description": "Small runtime",
                 "stargazers_count": 3500, "forks_count": 150, "language": "Rust",
                 "html_url": "https://github.com/smol-rs/smol"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = github_tool(&server, Some("ghp_testtoken"));
    let output = tool
        .invoke(&search("async runtime").with_param("limit", json!(2)))
        .await
        .unwrap();

    assert_eq!(output["total_count"], 1234);
    let repos = output["repositories"].as_array().unwrap();
    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0]["full_name"], "tokio-rs/tokio");
    assert_eq!(repos[0]["stars"], 25000);
    assert_eq!(repos[0]["url"], "https://github.com/tokio-rs/tokio");
    assert!(repos[1]["description"].is_null());
}

#[tokio::test]
async fn test_github_limit_is_clamped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("per_page", "10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"total_count": 0, "items": []})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let output = github_tool(&server, None)
        .invoke(&search("anything").with_param("limit", json!(500)))
        .await
        .unwrap();
    assert_eq!(output["repositories"], json!([]));
}

#[tokio::test]
async fn test_github_status_mapping() {
    let cases = [
        (422, ToolErrorReason::InvalidInput),
        (403, ToolErrorReason::RateLimited),
        (429, ToolErrorReason::RateLimited),
        (502, ToolErrorReason::UpstreamUnavailable),
        (503, ToolErrorReason::UpstreamUnavailable),
        (401, ToolErrorReason::Unknown),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream says no"))
            .mount(&server)
            .await;

        let err = github_tool(&server, None)
            .invoke(&search("rust"))
            .await
            .unwrap_err();
        assert_eq!(err.reason, expected, "status {}", status);
    }
}

#[tokio::test]
async fn test_github_rejects_bad_sort_without_calling_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = github_tool(&server, None)
        .invoke(&search("rust").with_param("sort", json!("popularity")))
        .await
        .unwrap_err();
    assert_eq!(err.reason, ToolErrorReason::InvalidInput);
}

#[tokio::test]
async fn test_weather_parses_report() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Tokyo,JP"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "0123456789abcdef0123456789abcdef"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Tokyo",
            "main": {"temp": 18.5, "feels_like": 17.8, "humidity": 55},
            "weather": [{"description": "few clouds"}],
            "wind": {"speed": 4.1},
            "sys": {"country": "JP"},
            "visibility": 9000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = weather_tool(&server)
        .invoke(&city("Tokyo").with_param("country_code", json!("JP")))
        .await
        .unwrap();

    assert_eq!(output["city"], "Tokyo");
    assert_eq!(output["country"], "JP");
    assert_eq!(output["temperature"], 18.5);
    assert_eq!(output["humidity"], 55);
    assert_eq!(output["condition"], "Few clouds");
    assert_eq!(output["visibility_km"], 9.0);
}

#[tokio::test]
async fn test_weather_without_temperature_is_partial_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Tokyo",
            "weather": [{"description": "clear sky"}]
        })))
        .mount(&server)
        .await;

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(weather_tool(&server))).unwrap();
    let executor = Executor::new(
        Arc::new(registry),
        RetryPolicy::default(),
        Duration::from_secs(5),
    );

    let plan = Plan {
        task: "What's the weather in Tokyo?".to_string(),
        steps: vec![PlanStep::new(0, "weather", city("Tokyo"), "Current weather")],
        source: PlanSource::Fallback,
        reasoning: String::new(),
    };
    let trace = executor.execute(&plan).await;

    assert_eq!(trace.results[0].status, StepStatus::Succeeded);
    let output = trace.results[0].output.as_ref().unwrap();
    assert!(output.get("temperature").is_none());
    assert_eq!(output["condition"], "Clear sky");

    let report = Verifier::new().verify(&trace);
    assert_eq!(report.completeness_score, 1.0);
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.contains("partial data: missing 'temperature'")));
    assert!(!report.formatted_response.contains("0.0°C"));
    assert!(report.formatted_response.contains("Tokyo: temperature unavailable, Clear sky"));

    let summary = opsagent_engine::conductor::verifier::headline(&trace);
    assert_eq!(summary, "Weather in Tokyo: temperature unavailable");
}

#[tokio::test]
async fn test_weather_unknown_city_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&server)
        .await;

    let err = weather_tool(&server).invoke(&city("Atlantis")).await.unwrap_err();
    assert_eq!(err.reason, ToolErrorReason::NotFound);
    assert!(err.message.contains("Atlantis"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_weather_server_error_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = weather_tool(&server).invoke(&city("Paris")).await.unwrap_err();
    assert_eq!(err.reason, ToolErrorReason::UpstreamUnavailable);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_error_messages_do_not_leak_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string("bad request for appid=0123456789abcdef0123456789abcdef"),
        )
        .mount(&server)
        .await;

    let err = weather_tool(&server).invoke(&city("Paris")).await.unwrap_err();
    assert_eq!(err.reason, ToolErrorReason::InvalidInput);
    assert!(!err.message.contains("0123456789abcdef0123456789abcdef"));
}

#[tokio::test]
async fn test_unreachable_api_is_upstream_unavailable() {
    let config = GithubConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
    };
    let tool = GithubTool::new(&config, None).unwrap();

    let err = tool.invoke(&search("rust")).await.unwrap_err();
    assert!(matches!(
        err.reason,
        ToolErrorReason::UpstreamUnavailable | ToolErrorReason::Timeout
    ));
}
