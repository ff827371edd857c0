pub mod document;
pub mod events;
pub mod record;
pub mod settings;

pub use document::{Fragment, PathSegment, Scalar, ThreadNode};
pub use events::Progress;
pub use record::{format_report, format_round, SummaryRecord};
pub use settings::{
    CondenseStrategy, GenerateSettings, ModelPreset, OverflowPolicy, SettingsError,
};
pub use sift_llm::ProviderType;
