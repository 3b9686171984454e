//! validated value types used across the query and load paths.
//!
//! All identifiers are immutable and checked at construction so the rest of
//! the crate can assume well formed values. [DistanceRecord] carries the raw
//! output of one comparator line and defines the total order the result
//! collector ranks by.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::HomError;

/// maximum length, in unicode code points, of any identifier
pub const MAX_ID_LEN: usize = 256;

// common checks : non empty, bounded, no control chars
fn check_basic(kind: &str, s: &str) -> Result<(), HomError> {
    if s.is_empty() {
        return Err(HomError::MissingParameter(format!("{} may not be empty", kind)));
    }
    if s.chars().count() > MAX_ID_LEN {
        return Err(HomError::IllegalParameter(format!(
            "{} exceeds maximum length of {} code points",
            kind, MAX_ID_LEN
        )));
    }
    if s.chars().any(|c| c.is_control()) {
        return Err(HomError::IllegalParameter(format!(
            "{} contains control characters : {}",
            kind, s
        )));
    }
    Ok(())
} // end of check_basic

//==================================================================================

/// identifier of a namespace, restricted to ascii alphanumerics and underscore
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespaceId(String);

impl NamespaceId {
    pub fn new(id: &str) -> Result<Self, HomError> {
        check_basic("namespace id", id)?;
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(HomError::IllegalParameter(format!(
                "namespace id must contain only ascii alphanumerics and _ : {}",
                id
            )));
        }
        Ok(NamespaceId(id.to_string()))
    }

    pub fn get(&self) -> &str {
        &self.0
    }
} // end of impl NamespaceId

//==================================================================================

/// identifier of one ingestion run of a namespace.
/// Reusing a LoadId overwrites the sequence rows sharing it, rows written
/// under a different, no longer referenced LoadId stay orphaned in storage.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoadId(String);

impl LoadId {
    pub fn new(id: &str) -> Result<Self, HomError> {
        check_basic("load id", id)?;
        Ok(LoadId(id.to_string()))
    }

    pub fn get(&self) -> &str {
        &self.0
    }
} // end of impl LoadId

//==================================================================================

/// name of a sketch database as known to the comparator
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SketchDbName(String);

impl SketchDbName {
    pub fn new(name: &str) -> Result<Self, HomError> {
        check_basic("sketch database name", name)?;
        Ok(SketchDbName(name.to_string()))
    }

    pub fn get(&self) -> &str {
        &self.0
    }
} // end of impl SketchDbName

//==================================================================================

/// identifier of a configured distance filter implementation
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterId(String);

impl FilterId {
    pub fn new(id: &str) -> Result<Self, HomError> {
        check_basic("filter id", id)?;
        Ok(FilterId(id.to_string()))
    }

    pub fn get(&self) -> &str {
        &self.0
    }
} // end of impl FilterId

//==================================================================================

/// tag of an authorization source. Namespaces tagged with different sources
/// cannot be queried together, see the compatibility checker.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthSource(String);

impl AuthSource {
    pub fn new(tag: &str) -> Result<Self, HomError> {
        check_basic("authorization source", tag)?;
        Ok(AuthSource(tag.to_string()))
    }

    pub fn get(&self) -> &str {
        &self.0
    }
} // end of impl AuthSource

//==================================================================================

/// a caller credential already validated by the service layer.
/// The core never verifies it, filters only forward it to their collaborator.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    pub fn new(token: &str) -> Result<Self, HomError> {
        if token.trim().is_empty() {
            return Err(HomError::NoToken);
        }
        Ok(Token(token.to_string()))
    }

    pub fn get(&self) -> &str {
        &self.0
    }
} // end of impl Token

// do not leak credentials in debug output
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token(***)")
    }
}

//==================================================================================

/// metadata of one sequence, as carried by one line of the load metadata stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceMetadata {
    /// sequence identifier, must match an id present in the sketch database
    id: String,
    /// identifiers of the sequence in related systems, keyed by system tag
    #[serde(default, rename = "relatedids")]
    related_ids: HashMap<String, String>,
    /// optional scientific name of the organism
    #[serde(default, rename = "sciname")]
    scientific_name: Option<String>,
    /// identifier in the source database the sequence came from
    #[serde(rename = "sourceid")]
    source_id: String,
} // end of SequenceMetadata

impl SequenceMetadata {
    pub fn new(id: &str, source_id: &str) -> Self {
        SequenceMetadata {
            id: id.to_string(),
            related_ids: HashMap::new(),
            scientific_name: None,
            source_id: source_id.to_string(),
        }
    }

    pub fn with_scientific_name(mut self, name: &str) -> Self {
        self.scientific_name = Some(name.to_string());
        self
    }

    pub fn with_related_id(mut self, tag: &str, id: &str) -> Self {
        self.related_ids.insert(tag.to_string(), id.to_string());
        self
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_source_id(&self) -> &str {
        &self.source_id
    }

    pub fn get_scientific_name(&self) -> Option<&str> {
        self.scientific_name.as_deref()
    }

    pub fn get_related_ids(&self) -> &HashMap<String, String> {
        &self.related_ids
    }
} // end of impl SequenceMetadata

//==================================================================================

/// one raw distance as streamed by the comparator.
/// Immutable once built, the distance is checked to lie in [0,1].
/// Total order : ascending distance, then sketch database name, then sequence
/// id, so that the best (closest) record is the smallest.
#[derive(Clone, Debug)]
pub struct DistanceRecord {
    /// sketch database the match was found in
    db_name: SketchDbName,
    /// id of the matching sequence
    sequence_id: String,
    /// distance in [0,1], 0 means identical sketches
    distance: f64,
} // end of DistanceRecord

impl DistanceRecord {
    pub fn new(db_name: SketchDbName, sequence_id: &str, distance: f64) -> Result<Self, HomError> {
        check_basic("sequence id", sequence_id)?;
        if !distance.is_finite() || !(0. ..=1.).contains(&distance) {
            return Err(HomError::IllegalParameter(format!(
                "distance must lie in [0,1] : {}",
                distance
            )));
        }
        Ok(DistanceRecord {
            db_name,
            sequence_id: sequence_id.to_string(),
            distance,
        })
    }

    pub fn get_db_name(&self) -> &SketchDbName {
        &self.db_name
    }

    pub fn get_sequence_id(&self) -> &str {
        &self.sequence_id
    }

    pub fn get_distance(&self) -> f64 {
        self.distance
    }
} // end of impl DistanceRecord

impl PartialEq for DistanceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.distance.total_cmp(&other.distance) == Ordering::Equal
            && self.db_name == other.db_name
            && self.sequence_id == other.sequence_id
    }
}

// sound : NaN distances are rejected at construction
impl Eq for DistanceRecord {}

impl Ord for DistanceRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.db_name.cmp(&other.db_name))
            .then_with(|| self.sequence_id.cmp(&other.sequence_id))
    }
}

impl PartialOrd for DistanceRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

//==================================================================================

// end of mod tests
