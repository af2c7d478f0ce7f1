use anyhow::{Context, Result};
use std::{fs, path::Path, time::Duration};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/tubegate-env";
pub const DEFAULT_TUBEGATE_PORT: u16 = 5000;
pub const DEFAULT_TUBEGATE_HOST: &str = "0.0.0.0";
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
pub const DEFAULT_METADATA_API_BASE: &str = "https://yt.lemnoslife.com/noKey";
pub const DEFAULT_TRANSCRIPT_API_URL: &str = "https://api.kome.ai/api/tools/youtube-transcripts";

/// Raw values found in the config file; everything optional so a partial
/// file still works.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub tubegate_port: Option<u16>,
    pub tubegate_host: Option<String>,
    pub cache_ttl_seconds: Option<u64>,
    pub metadata_api_base: Option<String>,
    pub transcript_api_url: Option<String>,
}

/// Fully resolved gateway settings after defaults are applied.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub host: String,
    pub cache_ttl: Duration,
    pub metadata_api_base: String,
    pub transcript_api_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_TUBEGATE_PORT,
            host: DEFAULT_TUBEGATE_HOST.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            metadata_api_base: DEFAULT_METADATA_API_BASE.to_string(),
            transcript_api_url: DEFAULT_TRANSCRIPT_API_URL.to_string(),
        }
    }
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            match key {
                "TUBEGATE_PORT" => {
                    let port: u16 = value.parse().with_context(|| {
                        format!("Parsing TUBEGATE_PORT from {}", path.display())
                    })?;
                    cfg.tubegate_port = Some(port);
                }
                "TUBEGATE_HOST" => {
                    if !value.is_empty() {
                        cfg.tubegate_host = Some(value.to_string());
                    }
                }
                "CACHE_TTL_SECONDS" => {
                    let ttl: u64 = value.parse().with_context(|| {
                        format!("Parsing CACHE_TTL_SECONDS from {}", path.display())
                    })?;
                    cfg.cache_ttl_seconds = Some(ttl);
                }
                "METADATA_API_BASE" => {
                    if !value.is_empty() {
                        cfg.metadata_api_base = Some(value.to_string());
                    }
                }
                "TRANSCRIPT_API_URL" => {
                    if !value.is_empty() {
                        cfg.transcript_api_url = Some(value.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

pub fn load_gateway_config() -> Result<GatewayConfig> {
    load_gateway_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

/// Reads the config file if present and fills every gap with the defaults.
/// A missing file is not an error; the gateway runs fine on defaults alone.
pub fn load_gateway_config_from(path: impl AsRef<Path>) -> Result<GatewayConfig> {
    let cfg = read_env_config(path.as_ref())?.unwrap_or_default();
    let defaults = GatewayConfig::default();
    Ok(GatewayConfig {
        port: cfg.tubegate_port.unwrap_or(defaults.port),
        host: cfg.tubegate_host.unwrap_or(defaults.host),
        cache_ttl: cfg
            .cache_ttl_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl),
        metadata_api_base: cfg.metadata_api_base.unwrap_or(defaults.metadata_api_base),
        transcript_api_url: cfg
            .transcript_api_url
            .unwrap_or(defaults.transcript_api_url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn read_env_config_extracts_port_and_ttl() {
        let cfg = make_config("TUBEGATE_PORT=\"4242\"\nCACHE_TTL_SECONDS=60\n");
        let parsed = read_env_config(cfg.path()).unwrap().unwrap();
        assert_eq!(parsed.tubegate_port, Some(4242));
        assert_eq!(parsed.cache_ttl_seconds, Some(60));
    }

    #[test]
    fn read_env_config_skips_comments_and_unknown_keys() {
        let cfg = make_config("# comment\nSOMETHING_ELSE=1\nTUBEGATE_HOST=\"127.0.0.1\"\n");
        let parsed = read_env_config(cfg.path()).unwrap().unwrap();
        assert_eq!(parsed.tubegate_host.as_deref(), Some("127.0.0.1"));
        assert_eq!(parsed.tubegate_port, None);
    }

    #[test]
    fn read_env_config_rejects_bad_port() {
        let cfg = make_config("TUBEGATE_PORT=\"not-a-port\"\n");
        assert!(read_env_config(cfg.path()).is_err());
    }

    #[test]
    fn load_gateway_config_defaults_missing_values() {
        let cfg = make_config("TUBEGATE_HOST=\"127.0.0.1\"\n");
        let resolved = load_gateway_config_from(cfg.path()).unwrap();
        assert_eq!(resolved.host, "127.0.0.1");
        assert_eq!(resolved.port, DEFAULT_TUBEGATE_PORT);
        assert_eq!(
            resolved.cache_ttl,
            Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS)
        );
        assert_eq!(resolved.metadata_api_base, DEFAULT_METADATA_API_BASE);
        assert_eq!(resolved.transcript_api_url, DEFAULT_TRANSCRIPT_API_URL);
    }

    #[test]
    fn load_gateway_config_tolerates_missing_file() {
        let resolved = load_gateway_config_from("/definitely/not/here").unwrap();
        assert_eq!(resolved.port, DEFAULT_TUBEGATE_PORT);
    }

    #[test]
    fn load_gateway_config_reads_upstream_urls() {
        let cfg = make_config(
            "METADATA_API_BASE=\"http://127.0.0.1:9000/noKey\"\nTRANSCRIPT_API_URL=\"http://127.0.0.1:9001/transcripts\"\n",
        );
        let resolved = load_gateway_config_from(cfg.path()).unwrap();
        assert_eq!(resolved.metadata_api_base, "http://127.0.0.1:9000/noKey");
        assert_eq!(
            resolved.transcript_api_url,
            "http://127.0.0.1:9001/transcripts"
        );
    }
}
