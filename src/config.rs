//! Face construction/configuration surface (§4.9, ADDED ambient stack,
//! §2.1): the constructor surface the specification's `host`/`port`/
//! `verify_enabled` fields imply but does not fully enumerate.

#[derive(Debug, Clone)]
pub struct FaceConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub candidate_hosts: Vec<String>,
    pub verify_enabled: bool,
    pub default_interest_lifetime_ms: u32,
    pub probe_timeout_ms: u64,
    pub key_cache_capacity: usize,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: Some(6363),
            candidate_hosts: Vec::new(),
            verify_enabled: true,
            default_interest_lifetime_ms: 4000,
            probe_timeout_ms: 3000,
            key_cache_capacity: 64,
        }
    }
}

impl FaceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_candidate_hosts(mut self, hosts: impl IntoIterator<Item = String>) -> Self {
        self.candidate_hosts = hosts.into_iter().collect();
        self
    }

    pub fn with_verify_enabled(mut self, enabled: bool) -> Self {
        self.verify_enabled = enabled;
        self
    }

    pub fn with_default_interest_lifetime_ms(mut self, ms: u32) -> Self {
        self.default_interest_lifetime_ms = ms;
        self
    }

    pub fn with_probe_timeout_ms(mut self, ms: u64) -> Self {
        self.probe_timeout_ms = ms;
        self
    }

    pub fn with_key_cache_capacity(mut self, capacity: usize) -> Self {
        self.key_cache_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_spec() {
        let config = FaceConfig::default();
        assert_eq!(config.port, Some(6363));
        assert_eq!(config.default_interest_lifetime_ms, 4000);
        assert_eq!(config.probe_timeout_ms, 3000);
        assert_eq!(config.key_cache_capacity, 64);
        assert!(config.verify_enabled);
    }

    #[test]
    fn test_builder_overrides() {
        let config = FaceConfig::new().with_host("forwarder.local").with_port(9696).with_verify_enabled(false);
        assert_eq!(config.host.as_deref(), Some("forwarder.local"));
        assert_eq!(config.port, Some(9696));
        assert!(!config.verify_enabled);
    }
}
