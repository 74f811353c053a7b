//! Idempotent CNAME upsert: resolve the zone, check for an existing record,
//! then create it, update it (only when forced), or leave it alone.

use log::{info, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::provider::{DnsProvider, RecordRequest};

/// A validated upsert request.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertRequest {
    pub subdomain: String,
    pub domain: String,
    pub target: String,
    pub proxied: bool,
    pub force: bool,
}

impl UpsertRequest {
    pub fn new(subdomain: &str, domain: &str, target: &str) -> Result<Self> {
        Ok(Self {
            subdomain: required("subdomain", subdomain)?,
            domain: required("domain", domain)?,
            target: required("target", target)?,
            proxied: false,
            force: false,
        })
    }

    pub fn proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.subdomain, self.domain)
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Usage(format!("missing required argument: {field}")));
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    Created {
        record_id: String,
    },
    Updated {
        record_id: String,
        previous_content: String,
    },
    /// A record already existed and `force` was not set; nothing was changed.
    Skipped {
        existing_content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertReport {
    pub name: String,
    pub target: String,
    pub proxied: bool,
    #[serde(flatten)]
    pub outcome: Outcome,
}

pub struct Upserter<P> {
    provider: P,
}

impl<P: DnsProvider> Upserter<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn upsert(&self, req: &UpsertRequest) -> Result<UpsertReport> {
        let fqdn = req.fqdn();

        info!("Resolving zone for {}", req.domain);
        let zone = self
            .provider
            .find_zone(&req.domain)
            .await?
            .ok_or_else(|| Error::NotFound(format!("domain not found: {}", req.domain)))?;
        info!("Zone {} has id {}", zone.name, zone.id);

        info!("Checking for an existing record {}", fqdn);
        let existing = match self.provider.find_record(&zone.id, &fqdn).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Could not check for an existing record {}, assuming none: {}", fqdn, e);
                None
            }
        };

        let body = RecordRequest::cname(&req.subdomain, &req.target, req.proxied);
        let outcome = match existing {
            None => {
                info!("Creating CNAME {} -> {}", fqdn, req.target);
                let record = self.provider.create_record(&zone.id, &body).await?;
                Outcome::Created {
                    record_id: record.id,
                }
            }
            Some(existing) if req.force => {
                info!(
                    "Updating CNAME {} from {} to {}",
                    fqdn, existing.content, req.target
                );
                let record = self
                    .provider
                    .update_record(&zone.id, &existing.id, &body)
                    .await?;
                Outcome::Updated {
                    record_id: record.id,
                    previous_content: existing.content,
                }
            }
            Some(existing) => {
                if existing.content == req.target {
                    info!("Record {} already points to {}", fqdn, existing.content);
                } else {
                    info!(
                        "Record {} already exists and points to {}, use --force to update it",
                        fqdn, existing.content
                    );
                }
                Outcome::Skipped {
                    existing_content: existing.content,
                }
            }
        };

        Ok(UpsertReport {
            name: fqdn,
            target: req.target.clone(),
            proxied: req.proxied,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DnsRecord, MockDnsProvider, Zone};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn zone() -> Zone {
        Zone {
            id: "zone-1".to_string(),
            name: "example.com".to_string(),
        }
    }

    fn record(id: &str, content: &str) -> DnsRecord {
        DnsRecord {
            id: id.to_string(),
            record_type: "CNAME".to_string(),
            name: "app.example.com".to_string(),
            content: content.to_string(),
            ttl: 1,
            proxied: false,
        }
    }

    fn request() -> UpsertRequest {
        UpsertRequest::new("app", "example.com", "host.example-cdn.com").unwrap()
    }

    #[test]
    fn test_request_requires_all_fields() {
        assert_matches!(UpsertRequest::new("", "example.com", "t.com"), Err(Error::Usage(m)) if m.contains("subdomain"));
        assert_matches!(UpsertRequest::new("app", "  ", "t.com"), Err(Error::Usage(m)) if m.contains("domain"));
        assert_matches!(UpsertRequest::new("app", "example.com", ""), Err(Error::Usage(m)) if m.contains("target"));
    }

    #[test]
    fn test_request_defaults_and_fqdn() {
        let req = request();
        assert!(!req.proxied);
        assert!(!req.force);
        assert_eq!(req.fqdn(), "app.example.com");
        assert!(req.proxied(true).force(true).force);
    }

    #[tokio::test]
    async fn test_creates_when_absent() {
        let mut provider = MockDnsProvider::new();
        provider
            .expect_find_zone()
            .withf(|domain| domain == "example.com")
            .times(1)
            .returning(|_| Ok(Some(zone())));
        provider
            .expect_find_record()
            .withf(|zone_id, name| zone_id == "zone-1" && name == "app.example.com")
            .times(1)
            .returning(|_, _| Ok(None));
        provider
            .expect_create_record()
            .withf(|_, body| {
                body.record_type == "CNAME"
                    && body.name == "app"
                    && body.content == "host.example-cdn.com"
                    && body.ttl == 1
                    && !body.proxied
            })
            .times(1)
            .returning(|_, _| Ok(record("rec-new", "host.example-cdn.com")));
        provider.expect_update_record().never();

        let report = Upserter::new(provider).upsert(&request()).await.unwrap();
        assert_eq!(report.name, "app.example.com");
        assert_eq!(report.target, "host.example-cdn.com");
        assert_eq!(
            report.outcome,
            Outcome::Created {
                record_id: "rec-new".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_skips_existing_without_force() {
        for existing_content in ["other.example-cdn.com", "host.example-cdn.com"] {
            let mut provider = MockDnsProvider::new();
            provider
                .expect_find_zone()
                .returning(|_| Ok(Some(zone())));
            let content = existing_content.to_string();
            provider
                .expect_find_record()
                .returning(move |_, _| Ok(Some(record("rec-1", &content))));
            provider.expect_create_record().never();
            provider.expect_update_record().never();

            let report = Upserter::new(provider).upsert(&request()).await.unwrap();
            assert_eq!(
                report.outcome,
                Outcome::Skipped {
                    existing_content: existing_content.to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn test_updates_existing_with_force() {
        let mut provider = MockDnsProvider::new();
        provider
            .expect_find_zone()
            .returning(|_| Ok(Some(zone())));
        provider
            .expect_find_record()
            .returning(|_, _| Ok(Some(record("rec-1", "old.example-cdn.com"))));
        provider.expect_create_record().never();
        provider
            .expect_update_record()
            .withf(|zone_id, record_id, body| {
                zone_id == "zone-1" && record_id == "rec-1" && body.proxied
            })
            .times(1)
            .returning(|_, _, _| Ok(record("rec-1", "host.example-cdn.com")));

        let req = request().proxied(true).force(true);
        let report = Upserter::new(provider).upsert(&req).await.unwrap();
        assert!(report.proxied);
        assert_eq!(
            report.outcome,
            Outcome::Updated {
                record_id: "rec-1".to_string(),
                previous_content: "old.example-cdn.com".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_domain_stops_after_zone_lookup() {
        let mut provider = MockDnsProvider::new();
        provider.expect_find_zone().times(1).returning(|_| Ok(None));
        provider.expect_find_record().never();
        provider.expect_create_record().never();
        provider.expect_update_record().never();

        let err = Upserter::new(provider).upsert(&request()).await.unwrap_err();
        assert_matches!(err, Error::NotFound(m) if m.contains("example.com"));
    }

    #[tokio::test]
    async fn test_failed_lookup_is_treated_as_absent() {
        let mut provider = MockDnsProvider::new();
        provider
            .expect_find_zone()
            .returning(|_| Ok(Some(zone())));
        provider
            .expect_find_record()
            .returning(|_, _| Err(Error::Parse("unexpected EOF".to_string())));
        provider
            .expect_create_record()
            .times(1)
            .returning(|_, _| Ok(record("rec-new", "host.example-cdn.com")));

        let report = Upserter::new(provider).upsert(&request()).await.unwrap();
        assert_matches!(report.outcome, Outcome::Created { .. });
    }

    #[tokio::test]
    async fn test_create_failure_is_propagated() {
        let mut provider = MockDnsProvider::new();
        provider
            .expect_find_zone()
            .returning(|_| Ok(Some(zone())));
        provider.expect_find_record().returning(|_, _| Ok(None));
        provider.expect_create_record().returning(|_, _| {
            Err(Error::Provider(
                "An A, AAAA, or CNAME record with that host already exists.".to_string(),
            ))
        });

        let err = Upserter::new(provider).upsert(&request()).await.unwrap_err();
        assert_matches!(err, Error::Provider(m) if m.contains("already exists"));
    }

    /// Keeps records in memory so repeated upserts observe earlier writes.
    #[derive(Default)]
    struct InMemoryProvider {
        records: Mutex<Vec<DnsRecord>>,
        creates: Mutex<usize>,
    }

    #[async_trait]
    impl DnsProvider for InMemoryProvider {
        async fn find_zone(&self, domain: &str) -> Result<Option<Zone>> {
            Ok((domain == "example.com").then(zone))
        }

        async fn find_record(&self, _zone_id: &str, name: &str) -> Result<Option<DnsRecord>> {
            let records = self.records.lock().unwrap();
            Ok(records.iter().find(|r| r.name == name).cloned())
        }

        async fn create_record(&self, _zone_id: &str, body: &RecordRequest) -> Result<DnsRecord> {
            *self.creates.lock().unwrap() += 1;
            let mut records = self.records.lock().unwrap();
            let created = DnsRecord {
                id: format!("rec-{}", records.len() + 1),
                record_type: body.record_type.clone(),
                name: format!("{}.example.com", body.name),
                content: body.content.clone(),
                ttl: body.ttl,
                proxied: body.proxied,
            };
            records.push(created.clone());
            Ok(created)
        }

        async fn update_record(
            &self,
            _zone_id: &str,
            record_id: &str,
            body: &RecordRequest,
        ) -> Result<DnsRecord> {
            let mut records = self.records.lock().unwrap();
            let existing = records
                .iter_mut()
                .find(|r| r.id == record_id)
                .ok_or_else(|| Error::Provider("Record does not exist.".to_string()))?;
            existing.content = body.content.clone();
            existing.proxied = body.proxied;
            Ok(existing.clone())
        }
    }

    #[tokio::test]
    async fn test_second_run_skips() {
        let upserter = Upserter::new(InMemoryProvider::default());

        let first = upserter.upsert(&request()).await.unwrap();
        let second = upserter.upsert(&request()).await.unwrap();

        assert_matches!(first.outcome, Outcome::Created { .. });
        assert_matches!(second.outcome, Outcome::Skipped { ref existing_content } if existing_content == "host.example-cdn.com");
        assert_eq!(*upserter.provider.creates.lock().unwrap(), 1);

        let stored = upserter
            .provider
            .find_record("zone-1", "app.example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.content, "host.example-cdn.com");
    }

    #[tokio::test]
    async fn test_forced_run_rewrites_content() {
        let upserter = Upserter::new(InMemoryProvider::default());
        upserter.upsert(&request()).await.unwrap();

        let req = UpsertRequest::new("app", "example.com", "new.example-cdn.com")
            .unwrap()
            .force(true);
        let report = upserter.upsert(&req).await.unwrap();
        assert_matches!(report.outcome, Outcome::Updated { ref previous_content, .. } if previous_content == "host.example-cdn.com");

        let stored = upserter
            .provider
            .find_record("zone-1", "app.example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.content, "new.example-cdn.com");
    }
}
