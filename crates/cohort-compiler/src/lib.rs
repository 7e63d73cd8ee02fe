//! Cohort query compiler
//!
//! This crate provides:
//! - The query document sent to the count service ([`QueryDocument`])
//! - A pure, deterministic compiler from tree, constraints and population
//!   scope to a document ([`QueryCompiler`])
//! - JSON serialization behind the [`DocumentSerializer`] trait
//! - The SHA-256 [`Fingerprint`] used for staleness detection

pub mod compiler;
pub mod fingerprint;
pub mod model;
pub mod serialize;

pub use compiler::{CompileError, CompiledQuery, CompilerOptions, DEFAULT_VERSION, QueryCompiler};
pub use fingerprint::{Fingerprint, ParseFingerprintError};
pub use model::{
    CompiledConstraint, CompiledGroup, CompiledLeaf, CompiledNode, PopulationScope, QueryDocument,
    REQUEST_TYPE,
};
pub use serialize::{DocumentSerializer, JsonSerializer, SerializeError};
