use homedir::my_home;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Browser-like agent; some origins answer 403 to unidentified clients.
const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Outbound HTTP policy and timeouts, shared by the page fetcher, the
/// favicon locator and the downloader.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Timeout for fetching the page itself
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Timeout for HEAD probes (icon existence and content-type checks)
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Timeout for downloading the icon body
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,

    #[serde(default)]
    pub blocked_hosts: Vec<String>,

    /// Refuse hosts that resolve to loopback/private ranges. Off by
    /// default; enrichment targets are arbitrary user-supplied origins.
    #[serde(default)]
    pub block_private_ips: bool,

    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: DEFAULT_PAGE_TIMEOUT_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            user_agent: USER_AGENT_DEFAULT.to_string(),
            allowed_schemes: default_allowed_schemes(),
            blocked_hosts: Vec::new(),
            block_private_ips: false,
            accept_invalid_certs: false,
        }
    }
}

impl FetchConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn default_page_timeout_secs() -> u64 {
    DEFAULT_PAGE_TIMEOUT_SECS
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    USER_AGENT_DEFAULT.to_string()
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for stored icons; files land at
    /// `{favicons_dir}/{user_id}/{link_id}.{ext}`
    #[serde(default)]
    pub favicons_dir: String,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

/// Resolve the base data directory: `LINKSTASH_BASE_PATH` when set,
/// `~/.local/share/linkstash` otherwise.
pub fn base_path() -> String {
    std::env::var("LINKSTASH_BASE_PATH").unwrap_or(format!(
        "{}/.local/share/linkstash",
        my_home()
            .expect("couldnt find home dir")
            .expect("couldnt find home dir")
            .to_string_lossy()
    ))
}

impl Config {
    fn validate(&self) {
        if self.fetch.page_timeout_secs == 0 {
            panic!("fetch.page_timeout_secs must be greater than 0");
        }
        if self.fetch.probe_timeout_secs == 0 {
            panic!("fetch.probe_timeout_secs must be greater than 0");
        }
        if self.fetch.download_timeout_secs == 0 {
            panic!("fetch.download_timeout_secs must be greater than 0");
        }
        if self.fetch.allowed_schemes.is_empty() {
            panic!("fetch.allowed_schemes must not be empty");
        }
    }

    pub fn load_with(base_path: &str) -> Self {
        let config_path = Path::new(base_path).join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            std::fs::create_dir_all(base_path).expect("couldnt create base dir");
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap().as_bytes(),
            )
            .expect("couldnt write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not valid utf8");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        if config.favicons_dir.is_empty() {
            config.favicons_dir = format!("{base_path}/favicons");
        }

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = Path::new(&self.base_path).join("config.yaml");
        let config_str = serde_yml::to_string(&self).unwrap();

        if let Err(err) = std::fs::write(&config_path, config_str.as_bytes()) {
            log::error!("couldnt save config: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.page_timeout(), Duration::from_secs(10));
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.download_timeout(), Duration::from_secs(30));
        assert!(!config.block_private_ips);
    }

    #[test]
    fn test_load_creates_default_config() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().to_str().unwrap();

        let config = Config::load_with(base);

        assert!(Path::new(base).join("config.yaml").exists());
        assert_eq!(config.favicons_dir, format!("{base}/favicons"));
        assert_eq!(config.fetch.page_timeout_secs, 10);
    }

    #[test]
    fn test_load_keeps_explicit_favicons_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().to_str().unwrap();

        std::fs::write(
            Path::new(base).join("config.yaml"),
            "favicons_dir: /srv/icons\n",
        )
        .unwrap();

        let config = Config::load_with(base);
        assert_eq!(config.favicons_dir, "/srv/icons");
    }

    #[test]
    #[should_panic]
    fn test_zero_timeout_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().to_str().unwrap();

        std::fs::write(
            Path::new(base).join("config.yaml"),
            "fetch:\n  page_timeout_secs: 0\n",
        )
        .unwrap();

        Config::load_with(base);
    }
}
