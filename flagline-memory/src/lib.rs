//! In-memory flag provider for flagline
//!
//! Serves flags from definitions held in memory, loaded from JSON or TOML
//! documents or built in code.
//!
//! # Features
//!
//! - 🚀 **Static Variants** - Named variants with a default
//! - 🎯 **Targeting Rules** - Attribute conditions selecting a variant
//! - 🎲 **Gradual Rollout** - Percentage-based rollout bucketed by targeting key
//! - 📄 **Flag Documents** - JSON and TOML definition files
//!
//! # Quick Start
//!
//! ```
//! use flagline_memory::*;
//!
//! let provider = InMemoryProvider::new([(
//!     "new-ui".to_string(),
//!     FlagDefinition::boolean(false).with_rule(
//!         TargetingRule::new("on").with_condition(Condition::new(
//!             "email",
//!             Operator::EndsWith,
//!             vec!["@company.com".into()],
//!         )),
//!     ),
//! )]);
//! ```
//!
//! # Loading Definitions
//!
//! ```no_run
//! use flagline_memory::*;
//!
//! // Path taken from FLAGLINE_FLAGS_FILE
//! let provider = InMemoryProvider::from_env()?;
//!
//! // Or an explicit file
//! let provider = InMemoryProvider::from_file("flags.toml")?;
//! # Ok::<(), SourceError>(())
//! ```

pub mod error;
pub mod flag;
pub mod loader;
pub mod provider;

pub use error::{Result, SourceError};
pub use flag::{
    Condition, FlagDefinition, FlagState, Operator, Rollout, Selection, TargetingRule,
};
pub use loader::{FLAGS_FILE_ENV, FileFormat, FlagDocument, FlagLoader};
pub use provider::InMemoryProvider;
