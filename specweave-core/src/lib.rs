//! Data model for the SpecWeave documentation corpus.
//!
//! # Core Concepts
//!
//! ## Temporary Entities
//!
//! - [`IncrementName`]: A numbered unit of implementation work stored as
//!   `.specweave/increments/{NNNN}-{slug}/`. Increments are archived once done.
//!
//! ## Permanent Entities ("living docs")
//!
//! - [`FeatureId`]: A grouping of user stories (`FS-NNN`), implemented by one or
//!   more increments over time. Lives in `_features/` plus per-project shards.
//! - [`EpicId`]: A grouping of features (`EPIC-N`).
//! - [`ProjectId`]: A project subtree under `specs/` holding feature shards.
//!
//! ## Zones
//!
//! Every entity occupies exactly one [`Zone`]: active, archived, or (for
//! increments only) abandoned.

mod archive;
mod duplicate;
mod feature;
mod ids;
mod increment;
mod link;
mod zone;

pub use archive::*;
pub use duplicate::*;
pub use feature::*;
pub use ids::*;
pub use increment::*;
pub use link::*;
pub use zone::*;
