use crate::config::toml_config::TomlConfig;
use crate::domain::model::StepCommand;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// 只有這個值會啟用依賴安裝
pub const INSTALL_TRUTHY_VALUE: &str = "1";

#[cfg(windows)]
const ENV_BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const ENV_BIN_DIR: &str = "bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallPolicy {
    #[default]
    Skip,
    Install,
}

impl InstallPolicy {
    pub fn from_flag(value: Option<&str>) -> Self {
        match value {
            Some(INSTALL_TRUTHY_VALUE) => InstallPolicy::Install,
            _ => InstallPolicy::Skip,
        }
    }

    pub fn should_install(&self) -> bool {
        matches!(self, InstallPolicy::Install)
    }
}

/// 啟動流程用到的完整路徑與指令
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub project_dir: PathBuf,
    pub env_dir: PathBuf,
    pub python: String,
    pub manifest: PathBuf,
    pub install_flag: String,
    pub install: InstallPolicy,
    pub server_command: String,
    pub server_subcommand: Vec<String>,
    pub entry: PathBuf,
    pub server_args: Vec<String>,
}

impl LaunchSettings {
    /// 從配置與目前行程的環境變數解析
    pub fn from_env(project_dir: impl Into<PathBuf>, config: &TomlConfig) -> Result<Self> {
        let flag_value = std::env::var(config.install_flag()).ok();
        Self::resolve(project_dir, config, flag_value.as_deref())
    }

    pub fn resolve(
        project_dir: impl Into<PathBuf>,
        config: &TomlConfig,
        install_flag_value: Option<&str>,
    ) -> Result<Self> {
        config.validate()?;

        // 子行程以專案目錄為 cwd，路徑必須是絕對路徑才不會被重複套用
        let project_dir = std::path::absolute(project_dir.into())?;
        let install = InstallPolicy::from_flag(install_flag_value);
        tracing::debug!(
            "{}={:?} -> {:?}",
            config.install_flag(),
            install_flag_value,
            install
        );

        Ok(Self {
            env_dir: project_dir.join(config.env_dir()),
            manifest: project_dir.join(config.manifest()),
            entry: project_dir.join(config.entry()),
            python: config.python().to_string(),
            install_flag: config.install_flag().to_string(),
            install,
            server_command: config.server_command().to_string(),
            server_subcommand: config.server_subcommand(),
            server_args: config.server_args(),
            project_dir,
        })
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.env_dir.join(ENV_BIN_DIR)
    }

    pub fn env_python(&self) -> PathBuf {
        self.bin_dir().join(executable_name("python"))
    }

    /// 環境內有安裝伺服器時優先使用，否則交給 PATH 搜尋
    pub fn server_program(&self) -> PathBuf {
        let local = self.bin_dir().join(executable_name(&self.server_command));
        if local.is_file() {
            local
        } else {
            PathBuf::from(&self.server_command)
        }
    }

    pub fn create_env_command(&self) -> StepCommand {
        StepCommand::new(&self.python, &self.project_dir)
            .args(["-m", "venv"])
            .arg(self.env_dir.display().to_string())
    }

    pub fn install_command(&self) -> StepCommand {
        self.activate(StepCommand::new(self.env_python(), &self.project_dir))
            .args(["-m", "pip", "install", "-q", "-r"])
            .arg(self.manifest.display().to_string())
            .quiet()
    }

    pub fn launch_command(&self) -> StepCommand {
        self.activate(StepCommand::new(self.server_program(), &self.project_dir))
            .args(self.server_subcommand.iter().cloned())
            .arg(self.entry.display().to_string())
            .args(self.server_args.iter().cloned())
    }

    /// 等同 `source <env>/bin/activate`
    fn activate(&self, command: StepCommand) -> StepCommand {
        let command = command.env("VIRTUAL_ENV", self.env_dir.display().to_string());

        let existing = std::env::var_os("PATH").unwrap_or_default();
        match prepend_path(self.bin_dir(), &existing) {
            Some(path) => command.env("PATH", path),
            None => command,
        }
    }

    pub fn env_exists(&self) -> bool {
        self.env_dir.is_dir()
    }
}

/// 無法組成合法 UTF-8 的 PATH 時保留原本的 PATH 不動
fn prepend_path(bin_dir: PathBuf, existing: &OsStr) -> Option<String> {
    let paths = std::iter::once(bin_dir).chain(std::env::split_paths(existing));
    let joined = match std::env::join_paths(paths) {
        Ok(joined) => joined,
        Err(e) => {
            tracing::warn!("Could not prepend environment to PATH: {}", e);
            return None;
        }
    };
    match joined.into_string() {
        Ok(path) => Some(path),
        Err(_) => {
            tracing::warn!("PATH is not valid UTF-8, leaving it unchanged");
            None
        }
    }
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) && Path::new(name).extension().is_none() {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}
