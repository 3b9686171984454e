//! the sketch comparator seam.
//!
//! Distance computation is delegated to an external implementation (typically
//! a subprocess around mash or sourmash), the core only consumes the trait
//! below. A computation yields a finite, unordered stream of raw distance
//! records which the query engine pushes through the filter chain.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::HomError;
use crate::namespace::Implementation;
use crate::types::{DistanceRecord, SketchDbName};

/// handle on an opened sketch database
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SketchDatabase {
    name: SketchDbName,
    location: PathBuf,
    sequence_count: u64,
} // end of SketchDatabase

impl SketchDatabase {
    pub fn new(name: SketchDbName, location: &Path, sequence_count: u64) -> Self {
        SketchDatabase {
            name,
            location: location.to_path_buf(),
            sequence_count,
        }
    }

    pub fn get_name(&self) -> &SketchDbName {
        &self.name
    }

    pub fn get_location(&self) -> &Path {
        &self.location
    }

    pub fn get_sequence_count(&self) -> u64 {
        self.sequence_count
    }
} // end of impl SketchDatabase

//==================================================================================

/// outcome of one distance computation.
/// Warnings are gathered while opening the targets, for instance when a
/// target with diverging sketch parameters was skipped under non strict
/// matching. The record iterator is finite, bounded by the cardinality of the
/// target databases.
pub struct DistanceStream {
    /// non fatal notes to attach to the query result
    pub warnings: Vec<String>,
    /// the raw distances, in no particular order
    pub records: Box<dyn Iterator<Item = Result<DistanceRecord, HomError>> + Send>,
} // end of DistanceStream

//==================================================================================

/// the comparator contract.
///
/// Implementations wrap one similarity engine identified by
/// [Implementation] : distances from different implementations are not
/// comparable, which the namespace compatibility checker enforces upstream.
pub trait SketchComparator: Send + Sync {
    /// identity and version of the wrapped engine
    fn get_implementation(&self) -> Implementation;

    /// open and validate a sketch database.
    /// An unreadable or malformed database is an invalid-sketch error.
    fn open_database(
        &self,
        name: &SketchDbName,
        location: &Path,
    ) -> Result<SketchDatabase, HomError>;

    /// ids of all sequences sketched in the database
    fn list_sequence_ids(&self, db: &SketchDatabase) -> Result<BTreeSet<String>, HomError>;

    /// compare a query sketch file against the target databases.
    /// With `strict` set, any target whose sketch parameters disagree with
    /// the query aborts the computation with an incompatible-sketches error,
    /// otherwise such targets are skipped and reported in the warnings.
    /// `max_results` bounds the records returned per target, implementations
    /// may return fewer but never more than requested.
    fn compute(
        &self,
        query_sketch: &Path,
        targets: &[SketchDatabase],
        max_results: usize,
        strict: bool,
    ) -> Result<DistanceStream, HomError>;
} // end of trait SketchComparator
