use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/vidcache/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VidCacheConfig {
    /// Cache root override. Defaults to the XDG cache dir when unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Upper bound on total cache size in kilobytes, forwarded to the proxy
    /// collaborator's eviction policy. None = collaborator default.
    #[serde(default)]
    pub max_cache_size_kb: Option<u64>,
    /// Upper bound on the cache file count, forwarded to the proxy
    /// collaborator. None = collaborator default.
    #[serde(default)]
    pub max_cache_files: Option<u32>,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vidcache")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VidCacheConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VidCacheConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: VidCacheConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Cache root: the configured override or the XDG cache home, created if
/// absent.
pub fn cache_root(cfg: &VidCacheConfig) -> Result<PathBuf> {
    let root = match &cfg.cache_dir {
        Some(dir) => dir.clone(),
        None => xdg::BaseDirectories::with_prefix("vidcache")?.get_cache_home(),
    };
    fs::create_dir_all(&root)
        .with_context(|| format!("create cache dir {}", root.display()))?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_limits() {
        let cfg = VidCacheConfig::default();
        assert!(cfg.cache_dir.is_none());
        assert!(cfg.max_cache_size_kb.is_none());
        assert!(cfg.max_cache_files.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = VidCacheConfig {
            cache_dir: Some(PathBuf::from("/var/cache/vidcache")),
            max_cache_size_kb: Some(512 * 1024),
            max_cache_files: Some(200),
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: VidCacheConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.cache_dir, cfg.cache_dir);
        assert_eq!(parsed.max_cache_size_kb, cfg.max_cache_size_kb);
        assert_eq!(parsed.max_cache_files, cfg.max_cache_files);
    }

    #[test]
    fn config_toml_partial_values() {
        let toml = r#"
            max_cache_size_kb = 1048576
        "#;
        let cfg: VidCacheConfig = toml::from_str(toml).unwrap();
        assert!(cfg.cache_dir.is_none());
        assert_eq!(cfg.max_cache_size_kb, Some(1_048_576));
        assert!(cfg.max_cache_files.is_none());
    }

    #[test]
    fn cache_root_uses_override_and_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = VidCacheConfig {
            cache_dir: Some(dir.path().join("store")),
            ..Default::default()
        };
        let root = cache_root(&cfg).unwrap();
        assert_eq!(root, dir.path().join("store"));
        assert!(root.is_dir());
    }
}
