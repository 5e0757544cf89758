//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "distbuild.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "distbuild.yaml";

pub const DEFAULT_BUILD_ATTEMPTS: usize = 1;
pub const DEFAULT_CHECK_ATTEMPTS: usize = 1;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Get list of config file names to search for, in priority order
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".distbuild.toml",
        ".distbuild.yaml",
    ]
}

/// One worker per available CPU
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
