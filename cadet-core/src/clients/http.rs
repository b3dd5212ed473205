//! HTTP clients for the fetch service and the broker
//!
//! Both speak JSON over plain HTTP. The fetch service answers
//! `POST /fetch` and the broker accepts `POST /sessions/{id}/sort`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::traits::{ResultSink, SinkFactory, SourceFetcher};
use crate::error::ClientError;
use crate::types::{AnnotationUnitIdentifier, Communication, ContactInfo, SessionId};

#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    communication_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct FetchResult {
    #[serde(default)]
    communications: Vec<Communication>,
}

#[derive(Debug, Serialize)]
struct SortRequest<'a> {
    units: &'a [AnnotationUnitIdentifier],
}

/// Client for the communication fetch service
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: reqwest::Client,
    base_url: String,
}

impl FetchClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SourceFetcher for FetchClient {
    async fn fetch(&self, communication_ids: &[String]) -> Result<Vec<Communication>, ClientError> {
        let url = format!("{}/fetch", self.base_url);
        debug!(url = %url, count = communication_ids.len(), "Fetching communications");

        let response = self
            .client
            .post(&url)
            .json(&FetchRequest { communication_ids })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let result: FetchResult = response.json().await?;
        Ok(result.communications)
    }
}

/// Client that returns ranked units to the broker
#[derive(Debug, Clone)]
pub struct BrokerClient {
    client: reqwest::Client,
    base_url: String,
}

impl BrokerClient {
    pub fn new(contact: &ContactInfo) -> Self {
        Self::with_client(reqwest::Client::new(), contact.base_url())
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ResultSink for BrokerClient {
    async fn deliver(
        &self,
        session_id: &SessionId,
        ranking: &[AnnotationUnitIdentifier],
    ) -> Result<(), ClientError> {
        if ranking.is_empty() {
            error!(session_id = %session_id, "Ranking cannot be empty");
            return Err(ClientError::InvalidRanking(
                "refusing to send an empty ranking".to_string(),
            ));
        }

        let url = format!(
            "{}/sessions/{}/sort",
            self.base_url,
            urlencoding::encode(session_id.as_str())
        );
        debug!(session_id = %session_id, url = %url, units = ranking.len(), "Submitting sort");

        let response = self
            .client
            .post(&url)
            .json(&SortRequest { units: ranking })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Builds one [`BrokerClient`] per session, sharing a connection pool
#[derive(Debug, Clone, Default)]
pub struct BrokerClientFactory {
    client: reqwest::Client,
}

impl BrokerClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SinkFactory for BrokerClientFactory {
    fn create(&self, contact: &ContactInfo) -> Arc<dyn ResultSink> {
        Arc::new(BrokerClient::with_client(
            self.client.clone(),
            contact.base_url(),
        ))
    }
}
