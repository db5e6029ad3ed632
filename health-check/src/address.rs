//! Turning a device address into a health endpoint URL.
//!
//! Addresses are entered by hand: a bare IPv4 address, a hostname such as
//! `raspberrypi.local`, an IPv6 literal, or any of these with an explicit
//! port. The configured probe port applies only when none is given.

use url::Url;

use crate::config::HealthCheckConfig;
use crate::error::HealthError;

/// Characters that would move the health port or path out of the authority
const FORBIDDEN: &[char] = &['/', '\\', '?', '#', '@'];

/// Build `http://<host>:<port><path>` for a device address.
pub fn health_url(address: &str, config: &HealthCheckConfig) -> Result<Url, HealthError> {
    let address = address.trim();
    if address.is_empty() || address.contains(FORBIDDEN) || address.contains(char::is_whitespace) {
        return Err(HealthError::InvalidAddress(address.to_string()));
    }

    let authority = if has_explicit_port(address) {
        address.to_string()
    } else if address.contains(':') && !address.starts_with('[') {
        // Bare IPv6 literal
        format!("[{}]:{}", address, config.port)
    } else {
        format!("{}:{}", address, config.port)
    };

    let path = if config.path.starts_with('/') {
        config.path.clone()
    } else {
        format!("/{}", config.path)
    };

    let url = Url::parse(&format!("http://{authority}{path}"))
        .map_err(|_| HealthError::InvalidAddress(address.to_string()))?;

    // The address must only ever fill in host and port
    if url.path() != path || url.query().is_some() || url.fragment().is_some() || !url.username().is_empty() {
        return Err(HealthError::InvalidAddress(address.to_string()));
    }
    Ok(url)
}

/// `host:port` or `[v6]:port` with a numeric port
fn has_explicit_port(address: &str) -> bool {
    if address.starts_with('[') {
        return address
            .rsplit_once("]:")
            .map(|(_, port)| port.parse::<u16>().is_ok())
            .unwrap_or(false);
    }

    match address.rsplit_once(':') {
        Some((host, port)) => !host.contains(':') && port.parse::<u16>().is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("192.168.1.100", "http://192.168.1.100:5000/health")]
    #[case("raspberrypi.local", "http://raspberrypi.local:5000/health")]
    #[case("127.0.0.1:8080", "http://127.0.0.1:8080/health")]
    #[case(" 10.0.0.4 ", "http://10.0.0.4:5000/health")]
    #[case("fe80::1", "http://[fe80::1]:5000/health")]
    #[case("[fe80::1]:9000", "http://[fe80::1]:9000/health")]
    fn test_health_url(#[case] address: &str, #[case] expected: &str) {
        let url = health_url(address, &HealthCheckConfig::default()).unwrap();
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("http://10.0.0.1")]
    #[case("two words")]
    #[case("10.0.0.1?")]
    #[case("10.0.0.1#x")]
    #[case("user@10.0.0.1")]
    #[case("10.0.0.1?:5000")]
    #[case("evil.example\\10.0.0.1")]
    fn test_health_url_rejects(#[case] address: &str) {
        assert!(matches!(
            health_url(address, &HealthCheckConfig::default()),
            Err(HealthError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_health_url_custom_path() {
        let config = HealthCheckConfig {
            path: "status".to_string(),
            ..Default::default()
        };
        let url = health_url("10.0.0.1", &config).unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.1:5000/status");
    }
}
