pub mod cloudflare;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Cloudflare's "automatic" TTL.
pub const TTL_AUTO: u32 = 1;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[allow(dead_code)]
    #[serde(rename = "type")]
    pub record_type: String,
    #[allow(dead_code)]
    pub name: String,
    pub content: String,
    #[allow(dead_code)]
    #[serde(default)]
    pub ttl: u32,
    #[allow(dead_code)]
    #[serde(default)]
    pub proxied: bool,
}

/// Body of a record create or update request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordRequest {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

impl RecordRequest {
    pub fn cname(name: &str, target: &str, proxied: bool) -> Self {
        Self {
            record_type: "CNAME".to_string(),
            name: name.to_string(),
            content: target.to_string(),
            ttl: TTL_AUTO,
            proxied,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Looks up the zone whose name is exactly `domain`.
    async fn find_zone(&self, domain: &str) -> Result<Option<Zone>>;

    /// Looks up the first record in the zone whose fully-qualified name is `name`.
    async fn find_record(&self, zone_id: &str, name: &str) -> Result<Option<DnsRecord>>;

    async fn create_record(&self, zone_id: &str, record: &RecordRequest) -> Result<DnsRecord>;

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordRequest,
    ) -> Result<DnsRecord>;
}
