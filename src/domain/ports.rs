use crate::domain::model::{StepCommand, StepStatus};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 執行外部指令並等待其結束
///
/// 找不到程式時必須回傳 `GeoOwlError::CommandNotFound`，
/// 指令本身失敗則以 `StepStatus` 回報，由呼叫端決定是否中止。
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &StepCommand) -> Result<StepStatus>;
}
