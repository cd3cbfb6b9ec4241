//! Device-IP resolution: a step order that prefers a syntactically valid
//! address over substring extraction over DNS, tried first against
//! `device_ip` and then against `device_name`.

use std::net::Ipv4Addr;
use std::num::NonZeroUsize;
use std::sync::OnceLock;

use lru::LruCache;
use regex::Regex;
use tokio::sync::Mutex;

/// Bounded cache of hostname → resolved IPv4 string, shared across every
/// connector/normalizer call for the process lifetime. DNS results are
/// cached for as long as the process runs.
pub struct IpResolver {
    dns_cache: Mutex<LruCache<String, String>>,
}

impl IpResolver {
    pub fn new(cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            dns_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Resolution order: valid IPv4 → substring extraction → DNS, tried
    /// against `device_ip` then `device_name`. Returns `None`
    /// (never an error) when nothing resolves; the caller drops the payload
    /// with a warning rather than propagating a failure.
    pub async fn resolve(&self, device_ip: Option<&str>, device_name: Option<&str>) -> Option<String> {
        for candidate in [device_ip, device_name].into_iter().flatten() {
            if let Some(ip) = self.resolve_one(candidate).await {
                return Some(ip);
            }
        }
        None
    }

    async fn resolve_one(&self, field: &str) -> Option<String> {
        if is_valid_ipv4(field) {
            return Some(field.to_string());
        }
        if let Some(ip) = extract_ipv4_substring(field) {
            return Some(ip);
        }
        self.resolve_via_dns(field).await
    }

    async fn resolve_via_dns(&self, host: &str) -> Option<String> {
        if host.trim().is_empty() {
            return None;
        }
        {
            let mut cache = self.dns_cache.lock().await;
            if let Some(cached) = cache.get(host) {
                return Some(cached.clone());
            }
        }

        let lookup_target = format!("{host}:0");
        let resolved = tokio::net::lookup_host(&lookup_target)
            .await
            .ok()?
            .find_map(|addr| match addr.ip() {
                std::net::IpAddr::V4(v4) => Some(v4.to_string()),
                std::net::IpAddr::V6(_) => None,
            })?;

        let mut cache = self.dns_cache.lock().await;
        cache.put(host.to_string(), resolved.clone());
        Some(resolved)
    }
}

fn is_valid_ipv4(s: &str) -> bool {
    s.trim().parse::<Ipv4Addr>().is_ok()
}

fn ipv4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})").unwrap())
}

/// First IPv4-shaped substring in `s` that also parses as a valid address,
/// e.g. `"10.1.2.3 (host)"` or `"http://10.1.2.3:8080/"` → `"10.1.2.3"`.
fn extract_ipv4_substring(s: &str) -> Option<String> {
    ipv4_pattern()
        .find_iter(s)
        .map(|m| m.as_str())
        .find(|candidate| is_valid_ipv4(candidate))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ip_from_url() {
        assert_eq!(
            extract_ipv4_substring("http://10.1.2.3:8080/status"),
            Some("10.1.2.3".to_string())
        );
    }

    #[test]
    fn extracts_ip_with_trailing_hostname() {
        assert_eq!(
            extract_ipv4_substring("10.1.2.3 (switch-a)"),
            Some("10.1.2.3".to_string())
        );
    }

    #[test]
    fn rejects_octet_out_of_range() {
        assert_eq!(extract_ipv4_substring("999.1.2.3"), None);
    }

    #[test]
    fn no_ip_present_yields_none() {
        assert_eq!(extract_ipv4_substring("switch-a"), None);
    }

    #[tokio::test]
    async fn resolves_valid_ip_without_touching_dns() {
        let resolver = IpResolver::new(10);
        let resolved = resolver.resolve(Some("10.1.1.1"), None).await;
        assert_eq!(resolved, Some("10.1.1.1".to_string()));
    }

    #[tokio::test]
    async fn extracts_from_device_ip_before_falling_back_to_device_name() {
        let resolver = IpResolver::new(10);
        let resolved = resolver
            .resolve(Some("10.1.1.1 (sw1)"), Some("unrelated-host"))
            .await;
        assert_eq!(resolved, Some("10.1.1.1".to_string()));
    }

    #[tokio::test]
    async fn falls_back_to_device_name_when_device_ip_has_no_ip() {
        let resolver = IpResolver::new(10);
        let resolved = resolver
            .resolve(Some("no-ip-here"), Some("10.5.5.5"))
            .await;
        assert_eq!(resolved, Some("10.5.5.5".to_string()));
    }

    #[tokio::test]
    async fn neither_field_resolvable_yields_none() {
        let resolver = IpResolver::new(10);
        let resolved = resolver
            .resolve(Some("not-a-host.invalid"), Some("also-not-a-host.invalid"))
            .await;
        assert_eq!(resolved, None);
    }
}
