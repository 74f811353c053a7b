use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{DnsProvider, DnsRecord, RecordRequest, Zone};
use crate::config::CloudflareConfig;
use crate::error::{Error, Result};

pub struct CloudflareClient {
    client: Client,
    api_base: String,
    api_token: String,
}

impl CloudflareClient {
    pub fn new(config: &CloudflareConfig, api_token: String) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Cloudflare responded with HTTP {}", status);

        let envelope: CloudflareResponse<T> = serde_json::from_str(&body).map_err(|e| {
            Error::Parse(format!("invalid Cloudflare response (HTTP {}): {}", status, e))
        })?;

        if !envelope.success {
            let message = envelope
                .errors
                .into_iter()
                .next()
                .map(|e| {
                    debug!("Cloudflare error code {}", e.code);
                    e.message
                })
                .unwrap_or_else(|| format!("request failed with HTTP {}", status));
            return Err(Error::Provider(message));
        }

        envelope
            .result
            .ok_or_else(|| Error::Parse("no result in Cloudflare response".to_string()))
    }
}

#[async_trait]
impl DnsProvider for CloudflareClient {
    async fn find_zone(&self, domain: &str) -> Result<Option<Zone>> {
        let request = self
            .client
            .get(self.url("/zones"))
            .query(&[("name", domain)]);
        let zones: Vec<Zone> = self.send(request).await?;

        Ok(zones.into_iter().next())
    }

    async fn find_record(&self, zone_id: &str, name: &str) -> Result<Option<DnsRecord>> {
        let request = self
            .client
            .get(self.url(&format!("/zones/{}/dns_records", zone_id)))
            .query(&[("name", name)]);
        let records: Vec<DnsRecord> = self.send(request).await?;

        Ok(records.into_iter().next())
    }

    async fn create_record(&self, zone_id: &str, record: &RecordRequest) -> Result<DnsRecord> {
        let request = self
            .client
            .post(self.url(&format!("/zones/{}/dns_records", zone_id)))
            .json(record);

        self.send(request).await
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordRequest,
    ) -> Result<DnsRecord> {
        let request = self
            .client
            .put(self.url(&format!("/zones/{}/dns_records/{}", zone_id, record_id)))
            .json(record);

        self.send(request).await
    }
}

// Cloudflare API types

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    code: i64,
    message: String,
}
