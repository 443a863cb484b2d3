// Flagline - typed feature flag evaluation for Rust
//
// This library resolves typed flag values from a pluggable provider and never
// fails the caller: every failure becomes the caller's default plus a
// structured error reason.

// Re-export core functionality
pub use flagline_core::*;

// Re-export optional crates
#[cfg(feature = "memory")]
pub use flagline_memory;

#[cfg(feature = "memory")]
pub use flagline_memory::InMemoryProvider;

pub mod prelude {
    pub use crate::{
        Client,
        ErrorCode,
        EvaluationContext,
        FeatureProvider,
        FlagApi,
        FlagEvaluationDetails,
        ProviderError,
        ProviderResult,
        Reason,
        ResolutionDetails,
        Value,
    };

    #[cfg(feature = "memory")]
    pub use crate::flagline_memory::{FlagDefinition, InMemoryProvider};
}
