mod enums;
mod models;

pub use enums::{AuthMethod, ExtentRpm, ExtentType, TargetMode};
pub use models::*;
