use crate::domain::model::{OutputMode, StepCommand, StepStatus};
use crate::domain::ports::CommandRunner;
use crate::utils::error::{GeoOwlError, Result};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// 以 tokio 子行程執行指令，stdin 與 stderr 直接繼承終端機
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, step: &StepCommand) -> Result<StepStatus> {
        let mut command = Command::new(&step.program);
        command
            .args(&step.args)
            .current_dir(&step.working_dir)
            .envs(&step.env)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        match step.output {
            OutputMode::Inherit => command.stdout(Stdio::inherit()),
            OutputMode::Quiet => command.stdout(Stdio::null()),
        };

        tracing::debug!("Spawning: {} (cwd: {})", step.display(), step.working_dir.display());

        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GeoOwlError::CommandNotFound {
                program: step.program.display().to_string(),
            },
            _ => GeoOwlError::IoError(e),
        })?;

        let status = child.wait().await?;
        tracing::debug!("{} finished with {}", step.display(), status);

        Ok(to_step_status(status))
    }
}

fn to_step_status(status: ExitStatus) -> StepStatus {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    StepStatus {
        success: status.success(),
        code: status.code(),
        signal,
    }
}
