use crate::domain::placement::PlacementRules;
use crate::utils::error::{GeoOwlError, Result};
use crate::utils::validation::{
    validate_env_var_name, validate_non_empty_string, validate_path, validate_positive_number,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_CONFIG_FILE: &str = "geo-owl.toml";
pub const DEFAULT_ENV_DIR: &str = "venv";
pub const DEFAULT_MANIFEST: &str = "requirements.txt";
pub const DEFAULT_INSTALL_FLAG: &str = "INSTALL_DEPS";
pub const DEFAULT_SERVER: &str = "streamlit";
pub const DEFAULT_ENTRY: &str = "geo_placer_web.py";

#[cfg(windows)]
pub const DEFAULT_PYTHON: &str = "python";
#[cfg(not(windows))]
pub const DEFAULT_PYTHON: &str = "python3";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub environment: Option<EnvironmentConfig>,
    pub dependencies: Option<DependenciesConfig>,
    pub server: Option<ServerConfig>,
    pub placement: Option<PlacementRules>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub directory: Option<String>,
    pub python: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependenciesConfig {
    pub manifest: Option<String>,
    pub install_flag: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub command: Option<String>,
    pub subcommand: Option<Vec<String>>,
    pub entry: Option<String>,
    pub args: Option<Vec<String>>,
}

fn env_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GeoOwlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| GeoOwlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 明確指定的檔案必須存在；否則嘗試專案目錄下的 geo-owl.toml，沒有就用預設值
    pub fn discover(project_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        let candidate = project_dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!("Loading configuration from {}", candidate.display());
            Self::from_file(candidate)
        } else {
            tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }

    /// 替換環境變數 (例如 ${STREAMLIT_PORT})，找不到的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_placeholder()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn env_dir(&self) -> PathBuf {
        PathBuf::from(
            self.environment
                .as_ref()
                .and_then(|e| e.directory.as_deref())
                .unwrap_or(DEFAULT_ENV_DIR),
        )
    }

    pub fn python(&self) -> &str {
        self.environment
            .as_ref()
            .and_then(|e| e.python.as_deref())
            .unwrap_or(DEFAULT_PYTHON)
    }

    pub fn manifest(&self) -> PathBuf {
        PathBuf::from(
            self.dependencies
                .as_ref()
                .and_then(|d| d.manifest.as_deref())
                .unwrap_or(DEFAULT_MANIFEST),
        )
    }

    pub fn install_flag(&self) -> &str {
        self.dependencies
            .as_ref()
            .and_then(|d| d.install_flag.as_deref())
            .unwrap_or(DEFAULT_INSTALL_FLAG)
    }

    pub fn server_command(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.command.as_deref())
            .unwrap_or(DEFAULT_SERVER)
    }

    pub fn server_subcommand(&self) -> Vec<String> {
        self.server
            .as_ref()
            .and_then(|s| s.subcommand.clone())
            .unwrap_or_else(|| vec!["run".to_string()])
    }

    pub fn entry(&self) -> PathBuf {
        PathBuf::from(
            self.server
                .as_ref()
                .and_then(|s| s.entry.as_deref())
                .unwrap_or(DEFAULT_ENTRY),
        )
    }

    pub fn server_args(&self) -> Vec<String> {
        self.server
            .as_ref()
            .and_then(|s| s.args.clone())
            .unwrap_or_default()
    }

    pub fn placement_rules(&self) -> PlacementRules {
        self.placement.unwrap_or_default()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_path(
            "environment.directory",
            &self.env_dir().to_string_lossy(),
        )?;
        validate_non_empty_string("environment.python", self.python())?;
        validate_path("dependencies.manifest", &self.manifest().to_string_lossy())?;
        validate_env_var_name("dependencies.install_flag", self.install_flag())?;
        validate_non_empty_string("server.command", self.server_command())?;
        validate_path("server.entry", &self.entry().to_string_lossy())?;

        let rules = self.placement_rules();
        validate_positive_number("placement.imcu_cap", rules.imcu_cap, 1)?;
        validate_positive_number("placement.soft_cap", rules.soft_cap, 1)?;
        validate_positive_number(
            "placement.max_new_before_spread",
            rules.max_new_before_spread,
            1,
        )?;

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
