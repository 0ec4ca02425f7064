//! Lifecycle manager configuration.

use std::path::PathBuf;

use wabridge_session::CacheConfig;

/// Settings for [`spawn_lifecycle`](crate::spawn_lifecycle).
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Directory holding the pairing credentials. Wiped on logout.
    pub auth_dir: PathBuf,

    /// Limits for the group metadata cache. Each session gets a fresh
    /// cache with these limits.
    pub group_cache: CacheConfig,

    /// Capacity of the command channel. Callers wait when it is full.
    pub command_channel_size: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            auth_dir: PathBuf::from("auth_info"),
            group_cache: CacheConfig::default(),
            command_channel_size: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_lifecycle_config_default() {
        let config = LifecycleConfig::default();
        assert_eq!(config.auth_dir, PathBuf::from("auth_info"));
        assert_eq!(config.group_cache.ttl, Duration::from_secs(300));
        assert_eq!(config.group_cache.max_entries, 1024);
        assert_eq!(config.command_channel_size, 64);
    }
}
