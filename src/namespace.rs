//! namespace entity and cross namespace compatibility rules.
//!
//! A namespace is a named collection of sketches backed by one load. The
//! record is replaced wholesale on a successful load and never partially
//! updated. The compatibility checker decides whether a set of namespaces can
//! be queried together : distances are only comparable within one comparator
//! implementation, and one caller cannot satisfy two distinct authorization
//! domains in a single query.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HomError;
use crate::types::{AuthSource, FilterId, LoadId, NamespaceId, SketchDbName};

/// sketching parameters a namespace was built with.
/// Whether a query sketch is usable against a namespace is the comparator's
/// decision at computation time, the core only carries the values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchParams {
    kmer_size: u32,
    sketch_size: u32,
    /// scaling factor for scaled sketch implementations, absent for fixed size
    scaling: Option<u32>,
} // end of SketchParams

impl SketchParams {
    pub fn new(kmer_size: u32, sketch_size: u32, scaling: Option<u32>) -> Result<Self, HomError> {
        if kmer_size == 0 || sketch_size == 0 {
            return Err(HomError::IllegalParameter(String::from(
                "kmer size and sketch size must be positive",
            )));
        }
        Ok(SketchParams {
            kmer_size,
            sketch_size,
            scaling,
        })
    }

    /// returns kmer size
    pub fn get_kmer_size(&self) -> u32 {
        self.kmer_size
    }

    /// return sketch size
    pub fn get_sketch_size(&self) -> u32 {
        self.sketch_size
    }

    pub fn get_scaling(&self) -> Option<u32> {
        self.scaling
    }
} // end of impl SketchParams

//==================================================================================

/// comparator implementation identity : name decides distance comparability,
/// version is informational
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    name: String,
    version: String,
} // end of Implementation

impl Implementation {
    pub fn new(name: &str, version: &str) -> Result<Self, HomError> {
        if name.is_empty() {
            return Err(HomError::MissingParameter(String::from(
                "implementation name may not be empty",
            )));
        }
        Ok(Implementation {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_version(&self) -> &str {
        &self.version
    }
} // end of impl Implementation

//==================================================================================

/// the namespace record as persisted by storage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namespace {
    id: NamespaceId,
    implementation: Implementation,
    sketch_params: SketchParams,
    /// sketch database holding the namespace data, as known to the comparator
    db_name: SketchDbName,
    /// where the comparator finds the sketch database
    sketch_location: PathBuf,
    /// identifier of the source database the sequences came from
    source_db_id: String,
    /// tag of the organization the data came from, for instance "KBase"
    data_source: Option<String>,
    description: Option<String>,
    auth_source: Option<AuthSource>,
    filter_id: Option<FilterId>,
    load_id: LoadId,
    seq_count: u64,
    last_modified: DateTime<Utc>,
} // end of Namespace

impl Namespace {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: NamespaceId,
        implementation: Implementation,
        sketch_params: SketchParams,
        db_name: SketchDbName,
        sketch_location: &Path,
        source_db_id: &str,
        load_id: LoadId,
        seq_count: u64,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Namespace {
            id,
            implementation,
            sketch_params,
            db_name,
            sketch_location: sketch_location.to_path_buf(),
            source_db_id: source_db_id.to_string(),
            data_source: None,
            description: None,
            auth_source: None,
            filter_id: None,
            load_id,
            seq_count,
            last_modified,
        }
    } // end of new

    pub fn with_data_source(mut self, data_source: &str) -> Self {
        self.data_source = Some(data_source.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_auth_source(mut self, auth_source: AuthSource) -> Self {
        self.auth_source = Some(auth_source);
        self
    }

    pub fn with_filter_id(mut self, filter_id: FilterId) -> Self {
        self.filter_id = Some(filter_id);
        self
    }

    pub fn get_id(&self) -> &NamespaceId {
        &self.id
    }

    pub fn get_implementation(&self) -> &Implementation {
        &self.implementation
    }

    pub fn get_sketch_params(&self) -> &SketchParams {
        &self.sketch_params
    }

    pub fn get_db_name(&self) -> &SketchDbName {
        &self.db_name
    }

    pub fn get_sketch_location(&self) -> &Path {
        &self.sketch_location
    }

    pub fn get_source_db_id(&self) -> &str {
        &self.source_db_id
    }

    pub fn get_data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn get_auth_source(&self) -> Option<&AuthSource> {
        self.auth_source.as_ref()
    }

    pub fn get_filter_id(&self) -> Option<&FilterId> {
        self.filter_id.as_ref()
    }

    pub fn get_load_id(&self) -> &LoadId {
        &self.load_id
    }

    pub fn get_seq_count(&self) -> u64 {
        self.seq_count
    }

    pub fn get_last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }
} // end of impl Namespace

//==================================================================================

/// check that a set of namespaces can be answered by one query.
///
/// All namespaces must share the comparator implementation name, and either
/// all carry the same authorization source tag or none carries any. The
/// namespaces must also sit in distinct sketch databases : the query routes
/// each distance record to its namespace's filter chain by database name, so
/// two namespaces on one database could not be filtered independently. Sketch
/// parameter agreement with the query sketch is left to the comparator.
pub fn check_compatibility(namespaces: &[Namespace]) -> Result<(), HomError> {
    if namespaces.is_empty() {
        return Err(HomError::MissingParameter(String::from(
            "at least one namespace must be selected",
        )));
    }
    //
    let implementations: BTreeSet<&str> = namespaces
        .iter()
        .map(|ns| ns.get_implementation().get_name())
        .collect();
    if implementations.len() > 1 {
        let names: Vec<&str> = implementations.into_iter().collect();
        return Err(HomError::IncompatibleNamespaces(format!(
            "namespaces use different comparator implementations : {}",
            names.join(", ")
        )));
    }
    //
    // records are routed to filter chains by sketch database name, a shared
    // database would let one namespace's chain shadow the other's
    let mut by_db: BTreeMap<&SketchDbName, &NamespaceId> = BTreeMap::new();
    for ns in namespaces {
        if let Some(first) = by_db.insert(ns.get_db_name(), ns.get_id()) {
            return Err(HomError::IncompatibleNamespaces(format!(
                "namespaces {} and {} share sketch database {}",
                first.get(),
                ns.get_id().get(),
                ns.get_db_name().get()
            )));
        }
    }
    //
    let auth_sources: BTreeSet<Option<&str>> = namespaces
        .iter()
        .map(|ns| ns.get_auth_source().map(|a| a.get()))
        .collect();
    if auth_sources.len() > 1 {
        let tags: Vec<String> = auth_sources
            .into_iter()
            .map(|a| a.unwrap_or("<none>").to_string())
            .collect();
        return Err(HomError::IncompatibleAuthentication(format!(
            "namespaces mix authorization sources : {}",
            tags.join(", ")
        )));
    }
    Ok(())
} // end of check_compatibility

//==================================================================================

// end of mod tests
