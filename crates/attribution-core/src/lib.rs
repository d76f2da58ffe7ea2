pub mod attribution;
pub mod config;
pub mod error;
pub mod linking;
pub mod records;
pub mod single_period;
pub mod snapshot;
pub mod types;

pub use attribution::{run_attribution, AttributionInput, AttributionReport, PeriodInput};
pub use config::{AttributionConfig, CategoryReconciliation, MissingValuePolicy};
pub use error::AttributionError;
pub use linking::{modified_frongello, EffectHistory, LinkingMethod, ReturnHistory};
pub use records::{build_input, AttributionRecord};
pub use single_period::{
    brinson_topdown, EffectRow, EffectTable, PeriodAttribution, SinglePeriodMethod,
};
pub use snapshot::{Holding, Snapshot};
pub use types::*;

/// Standard result type for all attribution operations
pub type AttributionResult<T> = Result<T, AttributionError>;
