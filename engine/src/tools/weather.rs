//! Current weather via OpenWeatherMap
//!
//! Calls `GET /weather` in metric units and flattens the response into a
//! single object keyed by what the verifier renders.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::{ParamType, ParameterSchema, ParameterSpec, Tool, ToolArgs, ToolError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{request_error, status_error};
use crate::config::WeatherConfig;
use crate::secrets::SecretString;

pub const TOOL_NAME: &str = "weather";

pub struct WeatherTool {
    base_url: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

/// Tool output
///
/// Measurements the upstream reply leaves out stay absent rather than being
/// reported as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_fahrenheit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<u64>,
    pub condition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed_mps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    name: Option<String>,
    #[serde(default)]
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    #[serde(default)]
    wind: WindBlock,
    #[serde(default)]
    sys: SysBlock,
    visibility: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct MainBlock {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionBlock {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SysBlock {
    #[serde(default)]
    country: String,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl WeatherReport {
    fn from_response(data: CurrentWeather, requested_city: &str) -> Self {
        let celsius = data.main.temp;
        Self {
            city: data.name.unwrap_or_else(|| requested_city.to_string()),
            country: data.sys.country,
            temperature: celsius.map(round1),
            temperature_fahrenheit: celsius.map(|c| round1(c * 9.0 / 5.0 + 32.0)),
            feels_like: data.main.feels_like.map(round1),
            humidity: data.main.humidity,
            condition: data
                .weather
                .first()
                .map(|w| capitalize(&w.description))
                .unwrap_or_default(),
            wind_speed_mps: data.wind.speed,
            visibility_km: data.visibility.map(|m| round1(m / 1000.0)),
        }
    }
}

impl WeatherTool {
    pub fn new(config: &WeatherConfig, api_key: Option<SecretString>) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Get the current weather (temperature in Celsius, conditions, humidity, wind) for a city"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::required("city", ParamType::String, "City name, e.g. Tokyo"),
            ParameterSpec::optional(
                "country_code",
                ParamType::String,
                "ISO 3166 country code, e.g. JP",
            ),
        ])
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<Value, ToolError> {
        let city = args.param_str("city")?.trim();
        if city.is_empty() {
            return Err(ToolError::invalid_input("City must not be empty"));
        }

        // Missing configuration will not fix itself on retry
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ToolError::unknown("OPENWEATHERMAP_API_KEY is not configured"))?;

        let location = match args.param_str_opt("country_code").map(str::trim) {
            Some(cc) if !cc.is_empty() => format!("{},{}", city, cc),
            _ => city.to_string(),
        };

        tracing::info!("Fetching weather for: {}", location);

        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("q", location.as_str()),
                ("units", "metric"),
                ("appid", api_key.expose()),
            ])
            .send()
            .await
            .map_err(|e| request_error(e, "Weather"))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ToolError::not_found(format!("City not found: {}", city)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, "Weather"));
        }

        let data: CurrentWeather = response
            .json()
            .await
            .map_err(|e| request_error(e, "Weather"))?;

        let report = WeatherReport::from_response(data, city);
        serde_json::to_value(report).map_err(|e| ToolError::unknown(e.to_string()))
    }
}
