//! Bridge settings and their command-line form.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use wabridge_lifecycle::LifecycleConfig;

/// Address observers connect to.
pub const ENV_BIND: &str = "WABRIDGE_BIND";
/// Credential directory.
pub const ENV_AUTH_DIR: &str = "WABRIDGE_AUTH_DIR";
/// Group metadata cache TTL in seconds.
pub const ENV_GROUP_CACHE_TTL_SECS: &str = "WABRIDGE_GROUP_CACHE_TTL_SECS";

/// Settings a deployment usually changes.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind: String,
    pub lifecycle: LifecycleConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3001".to_string(),
            lifecycle: LifecycleConfig::default(),
        }
    }
}

/// Flags for a bridge binary. Each can also come from its `WABRIDGE_*`
/// variable; anything left unset keeps the [`BridgeConfig`] default.
///
/// Flatten into the binary's own parser:
///
/// ```rust
/// use clap::Parser;
/// use wabridge::{BridgeArgs, BridgeConfig};
///
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     bridge: BridgeArgs,
/// }
///
/// let cli = Cli::parse_from(["bridge", "--bind", "0.0.0.0:9000"]);
/// let config = BridgeConfig::from(cli.bridge);
/// assert_eq!(config.bind, "0.0.0.0:9000");
/// ```
#[derive(Debug, Clone, Default, Args)]
pub struct BridgeArgs {
    /// Address observers connect to [default: 127.0.0.1:3001]
    #[arg(long, env = ENV_BIND)]
    pub bind: Option<String>,

    /// Credential directory, wiped when the phone logs this device out
    /// [default: auth_info]
    #[arg(long, env = ENV_AUTH_DIR)]
    pub auth_dir: Option<PathBuf>,

    /// Seconds a group's metadata stays cached [default: 300]
    #[arg(long, env = ENV_GROUP_CACHE_TTL_SECS)]
    pub group_cache_ttl_secs: Option<u64>,
}

impl From<BridgeArgs> for BridgeConfig {
    fn from(args: BridgeArgs) -> Self {
        let mut config = Self::default();
        if let Some(bind) = args.bind {
            config.bind = bind;
        }
        if let Some(dir) = args.auth_dir {
            config.lifecycle.auth_dir = dir;
        }
        if let Some(secs) = args.group_cache_ttl_secs {
            config.lifecycle.group_cache.ttl = Duration::from_secs(secs);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        bridge: BridgeArgs,
    }

    #[test]
    fn test_from_default_args_uses_defaults() {
        let config = BridgeConfig::from(BridgeArgs::default());

        assert_eq!(config.bind, "127.0.0.1:3001");
        assert_eq!(config.lifecycle.auth_dir, PathBuf::from("auth_info"));
        assert_eq!(config.lifecycle.group_cache.ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_parse_flags_override_each_field() {
        let cli = TestCli::try_parse_from([
            "bridge",
            "--bind",
            "0.0.0.0:9000",
            "--auth-dir",
            "/var/lib/wabridge",
            "--group-cache-ttl-secs",
            "60",
        ])
        .unwrap();

        let config = BridgeConfig::from(cli.bridge);

        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.lifecycle.auth_dir, PathBuf::from("/var/lib/wabridge"));
        assert_eq!(config.lifecycle.group_cache.ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_malformed_ttl_is_error() {
        let result = TestCli::try_parse_from(["bridge", "--group-cache-ttl-secs", "five"]);

        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_args_definition_is_consistent() {
        use clap::CommandFactory;
        TestCli::command().debug_assert();
    }
}
