//! Archival and cross-reference consistency engine for SpecWeave living docs.
//!
//! Moves increments, features and epics between their active and archived
//! zones without letting an identifier exist twice, cascades closure from
//! increments to features to epics, and rewrites markdown links so they keep
//! resolving after every move.

pub mod config;
pub mod error;
pub mod features;
pub mod fs_ops;
pub mod guard;
pub mod increments;
pub mod layout;
pub mod links;
pub mod metadata;
pub mod numbering;
pub mod registry;

pub use specweave_core as models;

pub use error::{ArchiveError, Result};
pub use features::{FeatureArchiverPort, FeatureEpicLifecycleManager};
pub use increments::{FeatureSync, IncrementLifecycleManager, RestoreOutcome};
pub use layout::Layout;
pub use links::LinkRewriter;
pub use numbering::IncrementNumberCache;
pub use registry::IdentifierRegistry;
