use std::path::{Path, PathBuf};

use reaper_connect::CredentialSource;
use reaper_core::regions;
use reaper_engine::ExecutorConfig;
use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

const FILE_NAME: &str = "reaper.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    pub region: String,
    #[serde(default)]
    pub credentials: CredentialSource,
    /// Directory holding one `run-<id>.jsonl` ledger file per run. Added
    /// in v1.
    pub ledger_dir: PathBuf,
    #[serde(default)]
    pub executor: ExecutorConfig,
    pub created_at: jiff::Timestamp,
}

impl ReaperConfig {
    /// Fresh config for `region` with default credentials and limits.
    pub fn new(region: impl Into<String>) -> eyre::Result<Self> {
        Ok(Self {
            config_version: CURRENT_VERSION,
            region: region.into(),
            credentials: CredentialSource::DefaultChain,
            ledger_dir: default_ledger_dir()?,
            executor: ExecutorConfig::default(),
            created_at: jiff::Timestamp::now(),
        })
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if !regions::is_supported_region(&self.region) {
            return Err(eyre::eyre!(
                "region {} does not offer Amazon Connect (supported: {})",
                self.region,
                regions::CONNECT_REGIONS
                    .iter()
                    .map(|(code, _)| *code)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        Ok(())
    }
}

fn config_dir() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("reaper"))
}

pub fn default_config_path() -> eyre::Result<PathBuf> {
    Ok(config_dir()?.join(FILE_NAME))
}

pub fn default_ledger_dir() -> eyre::Result<PathBuf> {
    let base = dirs::data_dir().ok_or_else(|| eyre::eyre!("no data directory found"))?;
    Ok(base.join("reaper").join("runs"))
}

/// Load the config at `path`. A missing file yields `None`.
pub fn load_config(path: &Path) -> eyre::Result<Option<ReaperConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: ReaperConfig = serde_json::from_value(migrated)?;
    Ok(Some(config))
}

/// Run sequential migrations from `from_version` up to the current version.
///
/// Each migration is a pure transform on the raw JSON value.
pub fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update reaper."
        ));
    }

    // v0 → v1: ledger_dir becomes explicit
    if from_version < 1 {
        let ledger_dir = default_ledger_dir()?;
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        obj.entry("ledger_dir")
            .or_insert(serde_json::Value::String(ledger_dir.display().to_string()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (added ledger_dir)");
    }

    Ok(json)
}

pub fn save_config(path: &Path, config: &ReaperConfig) -> eyre::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre::eyre!("config path {} has no parent", path.display()))?;
    std::fs::create_dir_all(dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;
    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);
    std::fs::write(&tmp_path, json.as_bytes())?;

    // Set restrictive permissions on Unix before renaming
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
