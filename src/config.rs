use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::gateways::GatewayCatalog;
use crate::injector::DEFAULT_INJECTOR;
use crate::logging::{log_info, log_warning};
use crate::options::StartOptions;
use crate::registry::{read_registry_value, wine_path_to_linux, INSTALL_PATH_VALUE, WARCRAFT_KEY};

// ============================================================================
// Launcher Config
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Warcraft III directory, read from the Wine registry when unset
    pub install_path: Option<PathBuf>,
    /// Wine prefix holding user.reg
    pub wine_prefix: Option<PathBuf>,
    /// Injection helper, `<working dir>/w3l.exe` when unset
    pub injector_path: Option<PathBuf>,
    pub start_options: StartOptions,
    pub prefer_proxy: bool,
    pub gateways: GatewayCatalog,
}

impl LauncherConfig {
    fn get_path() -> PathBuf {
        crate::w3lf_path!("config.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::get_path())
    }

    /// Read `path`, falling back to defaults when it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => log_warning(&format!(
                        "Ignoring invalid config {}: {}",
                        path.display(),
                        e
                    )),
                },
                Err(e) => log_warning(&format!("Cannot read config {}: {}", path.display(), e)),
            }
        }
        Self::default()
    }

    pub fn save(&self) -> io::Result<()> {
        self.save_to(&Self::get_path())
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }

    /// Configured prefix, else `$WINEPREFIX`, else `~/.wine`
    pub fn wine_prefix(&self) -> PathBuf {
        if let Some(prefix) = &self.wine_prefix {
            return prefix.clone();
        }
        if let Some(prefix) = std::env::var_os("WINEPREFIX").filter(|p| !p.is_empty()) {
            return PathBuf::from(prefix);
        }
        dirs::home_dir().unwrap_or_default().join(".wine")
    }

    /// Game directory: the configured one, or the installer's `InstallPath`
    pub fn resolve_install_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.install_path {
            return Some(path.clone());
        }

        let prefix = self.wine_prefix();
        let value = read_registry_value(&prefix, WARCRAFT_KEY, INSTALL_PATH_VALUE)?;
        let path = wine_path_to_linux(&prefix, &value)?;
        log_info(&format!("Using install path from Wine registry: {}", path.display()));
        Some(path)
    }

    pub fn injector_path(&self, working_dir: &Path) -> PathBuf {
        self.injector_path
            .clone()
            .unwrap_or_else(|| working_dir.join(DEFAULT_INJECTOR))
    }
}
