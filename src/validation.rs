use async_trait::async_trait;
use regex::Regex;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_PROTOCOL: &str = "https://";

// TLD is alphabetic or punycode. No userinfo.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<PROTOCOL>https?://)?(?P<URL>(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+(?:[a-z]{2,63}|xn--[a-z0-9-]{1,59})(?::\d{1,5})?(?:[/?#]\S*)?)$",
    )
    .expect("URL pattern is a valid regex")
});

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] io::Error),
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("no addresses returned")]
    NoAddresses,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("'{0}' is not a well-formed url")]
    InvalidFormat(String),
    #[error("host '{hostname}' does not resolve: {source}")]
    UnresolvableHost {
        hostname: String,
        #[source]
        source: ResolveError,
    },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, hostname: &str) -> Result<(), ResolveError>;
}

pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, hostname: &str) -> Result<(), ResolveError> {
        resolve_within(self.timeout, tokio::net::lookup_host((hostname, 0))).await
    }
}

async fn resolve_within<F, I>(limit: Duration, lookup: F) -> Result<(), ResolveError>
where
    F: Future<Output = io::Result<I>>,
    I: Iterator<Item = SocketAddr>,
{
    let mut addresses = tokio::time::timeout(limit, lookup)
        .await
        .map_err(|_| ResolveError::Timeout(limit))??;
    addresses.next().map(|_| ()).ok_or(ResolveError::NoAddresses)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    pub url: Url,
    pub hostname: String,
}

/// Matches `text` and rebuilds it with a protocol so the hostname can be extracted.
pub fn parse_url(text: &str) -> Result<ValidatedUrl, ValidationError> {
    let invalid = || ValidationError::InvalidFormat(text.to_string());
    let captures = URL_PATTERN.captures(text).ok_or_else(invalid)?;
    let protocol = captures
        .name("PROTOCOL")
        .map_or(DEFAULT_PROTOCOL, |protocol| protocol.as_str());
    let rest = captures.name("URL").ok_or_else(invalid)?.as_str();

    let url = Url::parse(&format!("{protocol}{rest}")).map_err(|_| invalid())?;
    let hostname = url.host_str().ok_or_else(invalid)?.to_string();
    Ok(ValidatedUrl { url, hostname })
}

pub struct UrlValidator {
    resolver: Arc<dyn HostResolver>,
}

impl UrlValidator {
    pub fn new(resolver: Arc<dyn HostResolver>) -> Self {
        Self { resolver }
    }

    pub async fn validate(&self, text: &str) -> Result<ValidatedUrl, ValidationError> {
        let validated = parse_url(text)?;
        self.resolver
            .resolve(&validated.hostname)
            .await
            .map_err(|source| ValidationError::UnresolvableHost {
                hostname: validated.hostname.clone(),
                source,
            })?;
        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_explicit_protocol() {
        let parsed = parse_url("https://www.freecodecamp.org").unwrap();
        assert_eq!(parsed.hostname, "www.freecodecamp.org");
        assert_eq!(parsed.url.scheme(), "https");

        let parsed = parse_url("http://example.com/a/b?c=d#e").unwrap();
        assert_eq!(parsed.url.scheme(), "http");
        assert_eq!(parsed.url.path(), "/a/b");
    }

    #[test]
    fn defaults_to_https() {
        let parsed = parse_url("www.example.com/path?q=1").unwrap();
        assert_eq!(parsed.url.as_str(), "https://www.example.com/path?q=1");
        assert_eq!(parsed.hostname, "www.example.com");
    }

    #[test]
    fn lowercases_hostname() {
        let parsed = parse_url("HTTP://Example.COM").unwrap();
        assert_eq!(parsed.hostname, "example.com");
    }

    #[test]
    fn rejects_malformed_input() {
        for input in [
            "ftp:/bad url",
            "",
            "localhost",
            "http://",
            "not a url",
            "ftp://example.com",
            "https://exa mple.com",
            "https://example.com/with space",
        ] {
            assert!(
                matches!(parse_url(input), Err(ValidationError::InvalidFormat(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn accepts_punycode_tld() {
        let parsed = parse_url("https://xn--e1afmkfd.xn--p1ai").unwrap();
        assert_eq!(parsed.hostname, "xn--e1afmkfd.xn--p1ai");
    }

    #[test]
    fn rejects_userinfo() {
        assert!(matches!(
            parse_url("https://user:pw@example.com"),
            Err(ValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn rejects_unparseable_reconstruction() {
        assert!(matches!(
            parse_url("example.com:99999"),
            Err(ValidationError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn resolves_extracted_hostname() {
        let mut resolver = MockHostResolver::new();
        resolver
            .expect_resolve()
            .withf(|hostname: &str| hostname == "www.freecodecamp.org")
            .times(1)
            .returning(|_| Ok(()));

        let validator = UrlValidator::new(Arc::new(resolver));
        let validated = validator.validate("https://www.freecodecamp.org").await.unwrap();
        assert_eq!(validated.hostname, "www.freecodecamp.org");
    }

    #[tokio::test]
    async fn skips_resolution_for_malformed_input() {
        let mut resolver = MockHostResolver::new();
        resolver.expect_resolve().times(0);

        let validator = UrlValidator::new(Arc::new(resolver));
        let result = validator.validate("ftp:/bad url").await;
        assert!(matches!(result, Err(ValidationError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn reports_unresolvable_host() {
        let mut resolver = MockHostResolver::new();
        resolver
            .expect_resolve()
            .times(1)
            .returning(|_| Err(ResolveError::NoAddresses));

        let validator = UrlValidator::new(Arc::new(resolver));
        let result = validator.validate("https://does-not-exist.example").await;
        assert!(matches!(
            result,
            Err(ValidationError::UnresolvableHost { hostname, .. }) if hostname == "does-not-exist.example"
        ));
    }

    #[tokio::test]
    async fn timeout_counts_as_unresolvable_host() {
        let mut resolver = MockHostResolver::new();
        resolver
            .expect_resolve()
            .times(1)
            .returning(|_| Err(ResolveError::Timeout(Duration::from_secs(3))));

        let validator = UrlValidator::new(Arc::new(resolver));
        let result = validator.validate("https://slow.example.com").await;
        assert!(matches!(
            result,
            Err(ValidationError::UnresolvableHost {
                source: ResolveError::Timeout(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn stalled_lookup_times_out() {
        let stalled = std::future::pending::<io::Result<std::vec::IntoIter<SocketAddr>>>();
        let result = resolve_within(Duration::from_millis(20), stalled).await;
        assert!(matches!(result, Err(ResolveError::Timeout(limit)) if limit == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn empty_lookup_has_no_addresses() {
        let empty = async { Ok(Vec::<SocketAddr>::new().into_iter()) };
        let result = resolve_within(Duration::from_secs(1), empty).await;
        assert!(matches!(result, Err(ResolveError::NoAddresses)));
    }

    #[tokio::test]
    async fn system_resolver_resolves_localhost() {
        let resolver = SystemResolver::new(Duration::from_secs(3));
        assert!(resolver.resolve("localhost").await.is_ok());
    }
}
