use anyhow::{anyhow, Context, Result};
use log::error;
use serde::Serialize;

use crate::correlation::{classify, Quality};

use super::types::{ErrorBody, PredictionRequest, PredictionResponse};

/// Calls an external `/predict` endpoint. One request per call; no retries.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    url: String,
}

impl PredictionClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build prediction http client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn predict(&self, request: PredictionRequest) -> Result<f64> {
        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("prediction request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(anyhow!("predictor answered {status}: {detail}"));
        }

        let body: PredictionResponse = response
            .json()
            .await
            .context("prediction response was not {\"prediction\": number}")?;
        Ok(body.prediction)
    }
}

/// What the prediction form shows.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum PredictionView {
    Idle,
    Loading,
    Ready { prediction: f64, quality: Quality },
    Failed { message: String },
}

#[derive(Debug)]
pub struct PredictionForm {
    client: PredictionClient,
    view: PredictionView,
}

impl PredictionForm {
    pub fn new(client: PredictionClient) -> Self {
        Self {
            client,
            view: PredictionView::Idle,
        }
    }

    pub fn view(&self) -> &PredictionView {
        &self.view
    }

    /// Submits once. A failure lands in `PredictionView::Failed` and is logged;
    /// nothing is retried.
    pub async fn submit(&mut self, elapsed_time: f64, velocity: f64) -> &PredictionView {
        self.view = PredictionView::Loading;

        let request = PredictionRequest {
            elapsedtime: elapsed_time,
            velocity,
        };
        self.view = match self.client.predict(request).await {
            Ok(prediction) => PredictionView::Ready {
                prediction,
                quality: classify(prediction),
            },
            Err(err) => {
                error!("Error making prediction: {err:#}");
                PredictionView::Failed {
                    message: format!("{err:#}"),
                }
            }
        };
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_predictor_surfaces_a_failure() {
        // Port 9 (discard) on loopback is closed on any sane test host.
        let client = PredictionClient::new("http://127.0.0.1:9/predict").unwrap();
        let mut form = PredictionForm::new(client);
        assert_eq!(form.view(), &PredictionView::Idle);

        let view = form.submit(10.0, 5.0).await.clone();
        match view {
            PredictionView::Failed { message } => assert!(message.contains("127.0.0.1:9")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
