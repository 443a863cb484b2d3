//! Typed feature flag evaluation for Flagline
//!
//! Resolves flags of a requested type from a pluggable [`FeatureProvider`]
//! and always hands the caller a well-typed value: the resolved one, or the
//! caller's default together with a structured [`ErrorCode`].
//!
//! # Features
//!
//! - **Typed evaluation** - `bool`, `String`, `i64`, `f64` and structured [`Value`] flags
//! - **Evaluation context** - immutable, mergeable subject attributes with a targeting key
//! - **Never fails the caller** - provider errors and panics become default values
//! - **Atomic provider swap** - replace the provider while evaluations are in flight
//!
//! # Quick Start
//!
//! ```
//! use flagline_core::*;
//!
//! # tokio_test::block_on(async {
//! let api = FlagApi::new();
//! let client = api.client("my-service");
//!
//! let context = EvaluationContext::builder()
//!     .targeting_key("user-123")
//!     .set("email", "user@example.com")
//!     .build();
//!
//! let details = client.get_bool_details("new-ui", false, Some(&context)).await;
//!
//! // No provider registered yet
//! assert_eq!(*details.value(), false);
//! assert_eq!(details.reason(), Reason::Error);
//! assert_eq!(details.error_code(), Some(ErrorCode::ProviderNotReady));
//! # });
//! ```

pub mod api;
pub mod client;
pub mod context;
pub mod details;
pub mod error;
pub mod provider;
pub mod value;

pub use api::FlagApi;
pub use client::{Client, FlagType};
pub use context::{EvaluationContext, EvaluationContextBuilder, TARGETING_KEY};
pub use details::{
    FlagEvaluationDetails, FlagMetadata, FlagMetadataValue, Reason, ResolutionDetails,
};
pub use error::{ERROR_CODES, ErrorCode, ProviderError, ProviderResult, ValueError};
pub use provider::{FeatureProvider, ProviderMetadata, ProviderStatus};
pub use value::{Structure, StructureBuilder, Value, ValueKind};
