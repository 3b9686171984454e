//! homsearch : find the genome assemblies closest to a query assembly by
//! comparing minhash sketches across curated collections called namespaces.
//!
//! The crate provides the core of the service :
//! - [ranked::BoundedRankedSet] collecting the best matches as distances stream in
//! - the [sink] chain of authorization filters ending in the result collector
//! - the [sink::registry::FilterRegistry] of configured filter factories
//! - [namespace] entities and the cross namespace compatibility rules
//! - the [loader] ingesting a sketch database and its metadata consistently
//! - the [search] engine orchestrating one query under timeout and cancellation
//!
//! Transport, configuration parsing, the persistence engine and the external
//! distance computation are collaborators behind the [storage::Storage] and
//! [comparator::SketchComparator] traits.

pub mod comparator;
pub mod error;
pub mod loader;
pub mod namespace;
pub mod ranked;
pub mod search;
pub mod sink;
pub mod storage;
pub mod types;
