//! Current-weather fact backed by OpenWeatherMap.
//!
//! The call is bounded at 3 seconds; any failure, non-success status, or
//! missing coordinates yields the fixed placeholder instead of an error.

use async_trait::async_trait;
use chatrelay_core::facts::{FactContext, FactProvider};
use serde::Deserialize;
use tracing::debug;

const PLACEHOLDER: &str = "Current weather: unavailable";

pub struct WeatherFact {
    api_key: String,
    client: reqwest::Client,
}

impl WeatherFact {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(3))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: api_key.into(),
            client,
        }
    }

    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<String, reqwest::Error> {
        let response = self
            .client
            .get("https://api.openweathermap.org/data/2.5/weather")
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: ApiWeather = response.json().await?;
        Ok(render(&body))
    }
}

fn render(body: &ApiWeather) -> String {
    let description = body
        .weather
        .first()
        .map(|w| w.description.as_str())
        .unwrap_or("unknown");
    match body.main.temp {
        Some(temp) => format!("Current weather: {description}, {temp:.1}C"),
        None => format!("Current weather: {description}"),
    }
}

#[async_trait]
impl FactProvider for WeatherFact {
    fn name(&self) -> &str {
        "weather"
    }

    async fn fact(&self, context: &FactContext) -> String {
        let (Some(latitude), Some(longitude)) = (context.latitude, context.longitude) else {
            return PLACEHOLDER.into();
        };

        match self.fetch(latitude, longitude).await {
            Ok(fact) => fact,
            Err(e) => {
                debug!(error = %e, "Weather lookup failed");
                PLACEHOLDER.into()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiWeather {
    #[serde(default)]
    weather: Vec<ApiCondition>,
    #[serde(default)]
    main: ApiMain,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiMain {
    #[serde(default)]
    temp: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_description_and_temperature() {
        let body: ApiWeather = serde_json::from_str(
            r#"{"weather":[{"id":800,"main":"Clear","description":"clear sky"}],
                "main":{"temp":27.34,"humidity":40}}"#,
        )
        .unwrap();
        assert_eq!(render(&body), "Current weather: clear sky, 27.3C");
    }

    #[test]
    fn tolerates_missing_fields() {
        let body: ApiWeather = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(render(&body), "Current weather: unknown");
    }

    #[tokio::test]
    async fn missing_coordinates_yield_the_placeholder() {
        let weather = WeatherFact::new("test-key");
        let fact = weather.fact(&FactContext::default()).await;
        assert_eq!(fact, PLACEHOLDER);
    }
}
