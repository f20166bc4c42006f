//! Geolocation resolver: best-effort country/city lookup by IP.
//!
//! Resolution is infallible from the caller's point of view: any provider
//! failure, timeout or unusable answer degrades to `Location::unknown()`.
//! Lookups run off the coordinator lock; the result is attached afterwards
//! if the peer is still connected.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use tandem_core::config::GeolocationConfig;
use tandem_core::Location;

use crate::clock::Clock;

#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self, ip: IpAddr) -> Location;
}

/// Addresses no public provider can place.
pub fn is_unroutable(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_unroutable(IpAddr::V4(v4)),
            None => {
                v6.is_loopback()
                    || v6.is_unspecified()
                    // fc00::/7 unique local, fe80::/10 link local
                    || (v6.segments()[0] & 0xfe00) == 0xfc00
                    || (v6.segments()[0] & 0xffc0) == 0xfe80
            }
        },
    }
}

// ── Providers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    IpApi,
    IpApiCo,
    FreeIpApi,
}

impl Provider {
    const ORDER: [Provider; 3] = [Self::IpApi, Self::IpApiCo, Self::FreeIpApi];

    fn name(self) -> &'static str {
        match self {
            Self::IpApi => "ip-api.com",
            Self::IpApiCo => "ipapi.co",
            Self::FreeIpApi => "freeipapi.com",
        }
    }

    fn url(self, ip: IpAddr) -> String {
        match self {
            Self::IpApi => {
                format!("http://ip-api.com/json/{ip}?fields=status,country,countryCode,region,city")
            }
            Self::IpApiCo => format!("https://ipapi.co/{ip}/json/"),
            Self::FreeIpApi => format!("https://free.freeipapi.com/api/json/{ip}"),
        }
    }

    /// Map a provider body to a location. `None` unless both country and
    /// country code are present.
    fn parse(self, body: &str) -> Option<Location> {
        let (country, code, city, region) = match self {
            Self::IpApi => {
                let r: IpApiResponse = serde_json::from_str(body).ok()?;
                if r.status.as_deref() == Some("fail") {
                    return None;
                }
                (r.country, r.country_code, r.city, r.region)
            }
            Self::IpApiCo => {
                let r: IpApiCoResponse = serde_json::from_str(body).ok()?;
                if r.error {
                    return None;
                }
                (r.country_name, r.country_code, r.city, r.region)
            }
            Self::FreeIpApi => {
                let r: FreeIpApiResponse = serde_json::from_str(body).ok()?;
                (r.country_name, r.country_code, r.city_name, r.region_name)
            }
        };
        let country = country.filter(|c| !c.trim().is_empty())?;
        let code = code.filter(|c| !c.trim().is_empty())?;
        Some(Location::new(country, code, city, region))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    region: Option<String>,
    city: Option<String>,
}

#[derive(Deserialize)]
struct IpApiCoResponse {
    #[serde(default)]
    error: bool,
    country_name: Option<String>,
    country_code: Option<String>,
    region: Option<String>,
    city: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FreeIpApiResponse {
    country_name: Option<String>,
    country_code: Option<String>,
    region_name: Option<String>,
    city_name: Option<String>,
}

/// Tries each public provider in turn.
pub struct HttpGeoResolver {
    client: reqwest::Client,
}

impl HttpGeoResolver {
    pub fn new(config: &GeolocationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    async fn query(&self, provider: Provider, ip: IpAddr) -> anyhow::Result<Option<Location>> {
        let body = self
            .client
            .get(provider.url(ip))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(provider.parse(&body))
    }
}

#[async_trait]
impl GeoResolver for HttpGeoResolver {
    async fn resolve(&self, ip: IpAddr) -> Location {
        if is_unroutable(ip) {
            return Location::unknown();
        }
        for provider in Provider::ORDER {
            match self.query(provider, ip).await {
                Ok(Some(location)) => {
                    tracing::debug!(%ip, provider = provider.name(), country = %location.country_code, "location resolved");
                    return location;
                }
                Ok(None) => {
                    tracing::debug!(%ip, provider = provider.name(), "provider returned no usable location");
                }
                Err(e) => {
                    tracing::debug!(%ip, provider = provider.name(), "lookup failed: {e}");
                }
            }
        }
        tracing::warn!(%ip, "all geolocation providers failed, using unknown");
        Location::unknown()
    }
}

/// Per-address TTL cache in front of another resolver.
pub struct CachedResolver {
    inner: Arc<dyn GeoResolver>,
    entries: DashMap<IpAddr, (Location, Instant)>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CachedResolver {
    pub fn new(inner: Arc<dyn GeoResolver>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    fn fresh(&self, ip: &IpAddr) -> Option<Location> {
        let entry = self.entries.get(ip)?;
        let (location, stored) = entry.value();
        if self.clock.now().saturating_duration_since(*stored) >= self.ttl {
            return None;
        }
        Some(location.clone())
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, stored)| now.saturating_duration_since(*stored) < self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl GeoResolver for CachedResolver {
    async fn resolve(&self, ip: IpAddr) -> Location {
        if let Some(hit) = self.fresh(&ip) {
            return hit;
        }
        let location = self.inner.resolve(ip).await;
        self.entries.insert(ip, (location.clone(), self.clock.now()));
        location
    }
}

/// Always answers with the same location.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    location: Location,
}

impl StaticResolver {
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

#[async_trait]
impl GeoResolver for StaticResolver {
    async fn resolve(&self, _ip: IpAddr) -> Location {
        self.location.clone()
    }
}
