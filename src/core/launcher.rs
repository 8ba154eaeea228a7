use crate::config::settings::LaunchSettings;
use crate::domain::model::{EnvironmentState, LaunchReport, StepStatus};
use crate::domain::ports::CommandRunner;
use crate::utils::error::{GeoOwlError, Result};
use chrono::Local;

/// 環境建立 → (選擇性) 安裝依賴 → 啟動伺服器，任一步失敗即中止
pub struct Launcher<R: CommandRunner> {
    runner: R,
    settings: LaunchSettings,
}

impl<R: CommandRunner> Launcher<R> {
    pub fn new(runner: R, settings: LaunchSettings) -> Self {
        Self { runner, settings }
    }

    pub async fn run(&self) -> Result<LaunchReport> {
        let started_at = Local::now();
        tracing::info!("🚀 Starting Geo Owl from {}", self.settings.project_dir.display());

        let environment = self.ensure_environment().await?;
        let dependencies_installed = self.install_dependencies().await?;
        let server_status = self.launch().await?;

        Ok(LaunchReport {
            started_at,
            environment,
            dependencies_installed,
            server_status,
        })
    }

    /// 環境目錄已存在時不做任何事
    pub async fn ensure_environment(&self) -> Result<EnvironmentState> {
        if self.settings.env_exists() {
            tracing::debug!(
                "Reusing environment at {}",
                self.settings.env_dir.display()
            );
            return Ok(EnvironmentState::Reused);
        }

        tracing::info!(
            "📦 Creating virtual environment at {}",
            self.settings.env_dir.display()
        );
        let command = self.settings.create_env_command();
        let status = self.runner.run(&command).await?;

        if !status.success {
            return Err(GeoOwlError::EnvironmentCreationError {
                command: command.display(),
                status: status.exit_info(),
            });
        }

        Ok(EnvironmentState::Created)
    }

    /// 回傳是否實際執行了安裝
    pub async fn install_dependencies(&self) -> Result<bool> {
        if !self.settings.install.should_install() {
            tracing::debug!(
                "Skipping dependency installation ({} != 1)",
                self.settings.install_flag
            );
            return Ok(false);
        }

        tracing::info!(
            "📥 Installing dependencies from {}",
            self.settings.manifest.display()
        );
        let command = self.settings.install_command();
        let status = self.runner.run(&command).await?;

        if !status.success {
            return Err(GeoOwlError::DependencyInstallError {
                command: command.display(),
                status: status.exit_info(),
            });
        }

        Ok(true)
    }

    /// 阻塞直到伺服器結束
    pub async fn launch(&self) -> Result<StepStatus> {
        if !self.settings.entry.is_file() {
            tracing::warn!(
                "Entry file {} not found, launching anyway",
                self.settings.entry.display()
            );
        }

        let command = self.settings.launch_command();
        tracing::info!("🌐 Launching: {}", command.display());
        let status = self.runner.run(&command).await?;

        if !status.success {
            return Err(GeoOwlError::LaunchError {
                command: command.display(),
                status: status.exit_info(),
            });
        }

        tracing::info!("Server exited normally");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::TomlConfig;
    use crate::domain::model::StepCommand;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone)]
    struct MockRunner {
        calls: Arc<Mutex<Vec<StepCommand>>>,
        exit_codes: Arc<Mutex<Vec<i32>>>,
    }

    impl MockRunner {
        /// 依序回傳指定的退出碼，用完後一律成功
        fn with_exit_codes(codes: &[i32]) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                exit_codes: Arc::new(Mutex::new(codes.iter().rev().copied().collect())),
            }
        }

        fn calls(&self) -> Vec<StepCommand> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for MockRunner {
        async fn run(&self, command: &StepCommand) -> Result<StepStatus> {
            self.calls.lock().unwrap().push(command.clone());
            let code = self.exit_codes.lock().unwrap().pop().unwrap_or(0);

            // 模擬 venv 建立目錄
            if code == 0 && command.args.iter().any(|a| a == "venv") {
                if let Some(dir) = command.args.last() {
                    std::fs::create_dir_all(dir).unwrap();
                }
            }

            Ok(if code == 0 {
                StepStatus::success()
            } else {
                StepStatus::failed(code)
            })
        }
    }

    fn launcher(project: &Path, flag: Option<&str>, runner: MockRunner) -> Launcher<MockRunner> {
        let settings = LaunchSettings::resolve(project, &TomlConfig::default(), flag).unwrap();
        Launcher::new(runner, settings)
    }

    #[tokio::test]
    async fn test_fresh_project_creates_environment_then_launches() {
        let project = TempDir::new().unwrap();
        let runner = MockRunner::with_exit_codes(&[]);
        let launcher = launcher(project.path(), None, runner.clone());

        let report = launcher.run().await.unwrap();

        assert_eq!(report.environment, EnvironmentState::Created);
        assert!(!report.dependencies_installed);
        assert!(project.path().join("venv").is_dir());

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].args.contains(&"venv".to_string()));
        assert_eq!(calls[1].args[0], "run");
    }

    #[tokio::test]
    async fn test_existing_environment_is_reused() {
        let project = TempDir::new().unwrap();
        std::fs::create_dir(project.path().join("venv")).unwrap();
        std::fs::write(project.path().join("venv/marker"), "keep").unwrap();

        let runner = MockRunner::with_exit_codes(&[]);
        let report = launcher(project.path(), None, runner.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.environment, EnvironmentState::Reused);
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(
            std::fs::read_to_string(project.path().join("venv/marker")).unwrap(),
            "keep"
        );
    }

    #[tokio::test]
    async fn test_install_runs_once_before_launch_when_flag_set() {
        let project = TempDir::new().unwrap();
        let runner = MockRunner::with_exit_codes(&[]);
        let report = launcher(project.path(), Some("1"), runner.clone())
            .run()
            .await
            .unwrap();

        assert!(report.dependencies_installed);
        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        let installs: Vec<_> = calls
            .iter()
            .filter(|c| c.args.contains(&"pip".to_string()))
            .collect();
        assert_eq!(installs.len(), 1);
        assert!(calls[1].args.contains(&"pip".to_string()));
        assert_eq!(calls[2].args[0], "run");
    }

    #[tokio::test]
    async fn test_install_skipped_for_other_flag_values() {
        for flag in [None, Some("0"), Some("true"), Some("")] {
            let project = TempDir::new().unwrap();
            let runner = MockRunner::with_exit_codes(&[]);
            launcher(project.path(), flag, runner.clone())
                .run()
                .await
                .unwrap();

            assert!(
                runner
                    .calls()
                    .iter()
                    .all(|c| !c.args.contains(&"pip".to_string())),
                "flag {:?} should not install",
                flag
            );
        }
    }

    #[test]
    fn test_environment_failure_aborts() {
        let project = TempDir::new().unwrap();
        let runner = MockRunner::with_exit_codes(&[4]);
        let launcher = launcher(project.path(), Some("1"), runner.clone());
        let err = tokio_test::block_on(launcher.run()).unwrap_err();

        assert!(matches!(err, GeoOwlError::EnvironmentCreationError { .. }));
        assert_eq!(err.exit_code(), 4);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_install_failure_aborts_before_launch() {
        let project = TempDir::new().unwrap();
        std::fs::create_dir(project.path().join("venv")).unwrap();
        let runner = MockRunner::with_exit_codes(&[2]);
        let err = launcher(project.path(), Some("1"), runner.clone())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, GeoOwlError::DependencyInstallError { .. }));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_entry_still_launches_and_propagates_status() {
        let project = TempDir::new().unwrap();
        std::fs::create_dir(project.path().join("venv")).unwrap();
        let runner = MockRunner::with_exit_codes(&[1]);
        let err = launcher(project.path(), None, runner.clone())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, GeoOwlError::LaunchError { .. }));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(runner.calls().len(), 1);
    }
}
