//! Host domain checks for V2 entry points.

use thiserror::Error;
use url::{Host, ParseError, Url};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostDomainError {
    #[error("not an absolute URL")]
    Malformed,

    #[error("scheme must be https, found {0}")]
    NotHttps(String),

    #[error("credentials are not allowed in a host domain")]
    Credentials,

    #[error("invalid port")]
    InvalidPort,

    #[error("host is empty")]
    EmptyHost,

    #[error("localhost is not allowed")]
    Localhost,

    #[error("IP addresses are not allowed")]
    IpAddress,

    #[error("host must have at least two non-empty labels")]
    InvalidLabels,
}

/// Accepts an absolute https URL whose host is a public-looking domain:
/// two or more non-empty dot-separated labels, not localhost, not an IP.
/// Ports, paths and query strings after the host are allowed.
///
/// The host is checked in its parsed form, so IPv4 shorthands such as
/// `0x7f.1` count as IP addresses and internationalized names are checked
/// as punycode.
pub fn check_host_domain(value: &str) -> Result<(), HostDomainError> {
    let url = Url::parse(value).map_err(|e| match e {
        ParseError::EmptyHost => HostDomainError::EmptyHost,
        ParseError::InvalidPort => HostDomainError::InvalidPort,
        _ => HostDomainError::Malformed,
    })?;

    if url.scheme() != "https" {
        return Err(HostDomainError::NotHttps(url.scheme().to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(HostDomainError::Credentials);
    }
    if url.port() == Some(0) {
        return Err(HostDomainError::InvalidPort);
    }

    match url.host() {
        Some(Host::Domain(domain)) => check_domain(domain),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => Err(HostDomainError::IpAddress),
        None => Err(HostDomainError::EmptyHost),
    }
}

fn check_domain(domain: &str) -> Result<(), HostDomainError> {
    if domain.is_empty() {
        return Err(HostDomainError::EmptyHost);
    }
    if domain == "localhost" || domain.ends_with(".localhost") {
        return Err(HostDomainError::Localhost);
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || !labels.iter().all(|label| is_dns_label(label)) {
        return Err(HostDomainError::InvalidLabels);
    }

    Ok(())
}

// Lowercase ASCII after url's IDNA mapping; hyphens only inside a label.
fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_domains_with_port_path_and_query() {
        for ok in [
            "https://example.com",
            "https://example.com/",
            "https://example.com:8080/path/to/resource",
            "https://sub.example.co.uk?x=1",
            "HTTPS://Example.COM#frag",
            "https://my-site.example.com",
        ] {
            assert_eq!(check_host_domain(ok), Ok(()), "{}", ok);
        }
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(check_host_domain(""), Err(HostDomainError::Malformed));
        assert_eq!(check_host_domain("*"), Err(HostDomainError::Malformed));
        assert_eq!(check_host_domain("example.com"), Err(HostDomainError::Malformed));
    }

    #[test]
    fn test_rejects_bad_labels() {
        for bad in ["https://a", "https://adobe.", "https://adobe..", "https://.com"] {
            assert_eq!(check_host_domain(bad), Err(HostDomainError::InvalidLabels), "{}", bad);
        }
        assert!(check_host_domain("https://-a.com").is_err());
    }

    #[test]
    fn test_rejects_non_https_and_local_hosts() {
        assert_eq!(
            check_host_domain("http://localhost.adobe.com"),
            Err(HostDomainError::NotHttps("http".to_string()))
        );
        assert_eq!(check_host_domain("https://localhost"), Err(HostDomainError::Localhost));
        assert_eq!(check_host_domain("https://app.localhost:3000"), Err(HostDomainError::Localhost));
        assert_eq!(check_host_domain("https://127.0.0.1"), Err(HostDomainError::IpAddress));
        assert_eq!(check_host_domain("https://[::1]"), Err(HostDomainError::IpAddress));
        assert_eq!(check_host_domain("https://"), Err(HostDomainError::EmptyHost));
        assert_eq!(check_host_domain("https://user@example.com"), Err(HostDomainError::Credentials));
        assert_eq!(check_host_domain("https://example.com:99999"), Err(HostDomainError::InvalidPort));
        assert_eq!(check_host_domain("https://example.com:0"), Err(HostDomainError::InvalidPort));
    }

    #[test]
    fn test_ipv4_shorthand_is_an_ip_address() {
        // 0x7f.1 parses to 127.0.0.1
        assert_eq!(check_host_domain("https://0x7f.1"), Err(HostDomainError::IpAddress));
        assert_eq!(check_host_domain("https://2130706433"), Err(HostDomainError::IpAddress));
    }

    #[test]
    fn test_accepts_internationalized_domain() {
        assert_eq!(check_host_domain("https://bücher.de"), Ok(()));
        assert_eq!(check_host_domain("https://xn--bcher-kva.de/shop"), Ok(()));
    }
}
