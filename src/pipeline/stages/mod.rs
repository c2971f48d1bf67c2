//! Built-in array stages.
//!
//! Generic array operations only; anything domain-specific lives with the
//! embedding application and reaches the engine through the registry.

pub mod clamp;
pub mod create_array;
pub mod rename_array;
pub mod scale;
pub mod statistics;
pub mod threshold;

pub use clamp::ClampStage;
pub use create_array::CreateArrayStage;
pub use rename_array::RenameArrayStage;
pub use scale::ScaleStage;
pub use statistics::StatisticsStage;
pub use threshold::ThresholdStage;
