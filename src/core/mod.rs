pub mod floor;
pub mod launcher;
pub mod placer;

pub use crate::domain::model::{EnvironmentState, LaunchReport, StepCommand, StepStatus};
pub use crate::domain::ports::CommandRunner;
pub use crate::utils::error::Result;
