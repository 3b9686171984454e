//! workspace membership filter over KBase style sequence ids.
//!
//! Sequence ids in KBase sourced namespaces are UPAs : three underscore
//! separated positive integers `workspace_object_version`. The filter drops
//! any record whose workspace is not among the workspaces the caller may
//! read. The set of permitted workspaces is resolved per query from the
//! caller token by a [WorkspaceLister], the client of the actual workspace
//! service lives outside this crate.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::HomError;
use crate::sink::registry::FilterFactory;
use crate::sink::DistanceSink;
use crate::types::{AuthSource, DistanceRecord, FilterId, Token};

// part names in parse error messages, by position in the UPA
const UPA_PARTS: [&str; 3] = ["workspace id", "object id", "version"];

/// parse a UPA of the form `workspace_object_version`, all parts >= 1.
/// Errors are filter errors describing which part failed and why.
pub fn parse_upa(id: &str) -> Result<(i64, i64, i64), HomError> {
    let parts: Vec<&str> = id.split('_').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(HomError::Filter(format!("Invalid workspace UPA: {}", id)));
    }
    let mut nums = [0i64; 3];
    for (i, part) in parts.iter().enumerate() {
        let num: i64 = part.parse().map_err(|_| {
            HomError::Filter(format!(
                "Invalid workspace UPA {}: {} is not an integer",
                id, UPA_PARTS[i]
            ))
        })?;
        if num < 1 {
            return Err(HomError::Filter(format!(
                "Invalid workspace UPA {}: {} must be > 0",
                id, UPA_PARTS[i]
            )));
        }
        nums[i] = num;
    }
    Ok((nums[0], nums[1], nums[2]))
} // end of parse_upa

/// true if the id is syntactically a UPA. Used at load time to vet sketch ids.
pub fn is_upa(id: &str) -> bool {
    parse_upa(id).is_ok()
}

//==================================================================================

/// resolves the set of workspace ids a caller may read.
/// Implemented outside the core by a workspace service client. An absent
/// token is the implementor's business, typically resolving to the public
/// workspaces only.
pub trait WorkspaceLister: Send + Sync {
    fn list_workspaces(&self, token: Option<&Token>) -> Result<BTreeSet<i64>, HomError>;
} // end of trait WorkspaceLister

//==================================================================================

/// the filter stage proper. Holds its own copy of the permitted set, later
/// mutation of the caller's set cannot change filtering behavior.
pub struct WorkspaceFilter {
    permitted: BTreeSet<i64>,
    sink: Box<dyn DistanceSink>,
} // end of WorkspaceFilter

impl WorkspaceFilter {
    pub fn new(permitted: &BTreeSet<i64>, sink: Box<dyn DistanceSink>) -> Self {
        WorkspaceFilter {
            permitted: permitted.clone(),
            sink,
        }
    }
} // end of impl WorkspaceFilter

impl DistanceSink for WorkspaceFilter {
    fn accept(&mut self, record: DistanceRecord) -> Result<(), HomError> {
        let (workspace, _object, _version) = parse_upa(record.get_sequence_id())?;
        if self.permitted.contains(&workspace) {
            self.sink.accept(record)
        } else {
            // not an error : the caller may simply not see this workspace
            log::trace!("dropping record in workspace {}", workspace);
            Ok(())
        }
    }

    fn flush(&mut self) -> Result<(), HomError> {
        self.sink.flush()
    }
} // end of impl DistanceSink for WorkspaceFilter

//==================================================================================

/// factory producing [WorkspaceFilter] instances, one per query.
pub struct WorkspaceFilterFactory {
    id: FilterId,
    auth_source: AuthSource,
    lister: Arc<dyn WorkspaceLister>,
} // end of WorkspaceFilterFactory

impl WorkspaceFilterFactory {
    pub fn new(id: FilterId, auth_source: AuthSource, lister: Arc<dyn WorkspaceLister>) -> Self {
        WorkspaceFilterFactory {
            id,
            auth_source,
            lister,
        }
    }

    /// build from the opaque configuration of the filter registry.
    /// Recognized keys : `id` (default "kbase"), `auth-source` (default
    /// "kbase"). Unrecognized keys are a configuration error.
    pub fn from_config(
        config: &HashMap<String, String>,
        lister: Arc<dyn WorkspaceLister>,
    ) -> Result<Self, HomError> {
        for key in config.keys() {
            if key != "id" && key != "auth-source" {
                return Err(HomError::Configuration(format!(
                    "unrecognized key {} in workspace filter configuration",
                    key
                )));
            }
        }
        let id = config.get("id").map(|s| s.as_str()).unwrap_or("kbase");
        let auth = config
            .get("auth-source")
            .map(|s| s.as_str())
            .unwrap_or("kbase");
        let id = FilterId::new(id)
            .map_err(|e| HomError::Configuration(format!("workspace filter id : {}", e)))?;
        let auth = AuthSource::new(auth)
            .map_err(|e| HomError::Configuration(format!("workspace filter auth source : {}", e)))?;
        Ok(WorkspaceFilterFactory::new(id, auth, lister))
    } // end of from_config
} // end of impl WorkspaceFilterFactory

impl FilterFactory for WorkspaceFilterFactory {
    fn get_id(&self) -> &FilterId {
        &self.id
    }

    fn get_auth_source(&self) -> Option<&AuthSource> {
        Some(&self.auth_source)
    }

    fn build(
        &self,
        sink: Box<dyn DistanceSink>,
        token: Option<&Token>,
    ) -> Result<Box<dyn DistanceSink>, HomError> {
        let permitted = self.lister.list_workspaces(token)?;
        log::debug!(
            "workspace filter {} built with {} permitted workspaces",
            self.id.get(),
            permitted.len()
        );
        Ok(Box::new(WorkspaceFilter::new(&permitted, sink)))
    }

    fn validate_id(&self, sequence_id: &str) -> bool {
        is_upa(sequence_id)
    }
} // end of impl FilterFactory for WorkspaceFilterFactory

//==================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::sink::DistanceCollector;
    use crate::types::SketchDbName;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn record(id: &str) -> DistanceRecord {
        DistanceRecord::new(SketchDbName::new("testdb").unwrap(), id, 0.25).unwrap()
    }

    fn filter_with(permitted: &[i64]) -> (WorkspaceFilter, DistanceCollector) {
        let collector = DistanceCollector::new(10).unwrap();
        let set: BTreeSet<i64> = permitted.iter().cloned().collect();
        (WorkspaceFilter::new(&set, collector.as_sink()), collector)
    }

    #[test]
    fn test_member_forwarded() {
        log_init_test();
        let (mut filter, collector) = filter_with(&[2, 6, 8]);
        filter.accept(record("8_23_6")).unwrap();
        filter.flush().unwrap();
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.snapshot()[0].get_sequence_id(), "8_23_6");
    }

    #[test]
    fn test_non_member_dropped_silently() {
        log_init_test();
        let (mut filter, collector) = filter_with(&[2, 6, 8]);
        filter.accept(record("100_2_7")).unwrap();
        assert!(collector.is_empty());
    }

    #[test]
    fn test_version_not_integer() {
        log_init_test();
        let (mut filter, _collector) = filter_with(&[2, 6, 8]);
        let err = filter.accept(record("1_2_X")).unwrap_err();
        assert!(err.to_string().contains("version is not an integer"), "{}", err);
    }

    #[test]
    fn test_workspace_not_positive() {
        log_init_test();
        let (mut filter, _collector) = filter_with(&[2, 6, 8]);
        let err = filter.accept(record("0_2_1")).unwrap_err();
        assert!(err.to_string().contains("workspace id must be > 0"), "{}", err);
    }

    #[test]
    fn test_malformed_shapes() {
        log_init_test();
        let (mut filter, collector) = filter_with(&[1, 2]);
        for bad in ["1_2", "_1_2_3", "1_2_3_", "1__3", "1_2_3_4"] {
            let err = filter.accept(record(bad)).unwrap_err();
            assert!(
                err.to_string().contains("Invalid workspace UPA"),
                "id {} : {}",
                bad,
                err
            );
        }
        assert!(collector.is_empty());
    }

    #[test]
    fn test_permitted_set_defensively_copied() {
        log_init_test();
        let collector = DistanceCollector::new(10).unwrap();
        let mut set: BTreeSet<i64> = [8].into_iter().collect();
        let mut filter = WorkspaceFilter::new(&set, collector.as_sink());
        // mutate the caller set after construction
        set.clear();
        filter.accept(record("8_1_1")).unwrap();
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_is_upa() {
        log_init_test();
        assert!(is_upa("15792_446_1"));
        assert!(!is_upa("GCF_000518705.1"));
        assert!(!is_upa("1_2"));
    }

    struct FixedLister(BTreeSet<i64>);

    impl WorkspaceLister for FixedLister {
        fn list_workspaces(&self, _token: Option<&Token>) -> Result<BTreeSet<i64>, HomError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_factory_builds_bound_filter() {
        log_init_test();
        let lister = Arc::new(FixedLister([4].into_iter().collect()));
        let factory = WorkspaceFilterFactory::from_config(&HashMap::new(), lister).unwrap();
        assert_eq!(factory.get_id().get(), "kbase");
        assert_eq!(factory.get_auth_source().map(|a| a.get()), Some("kbase"));
        assert!(factory.validate_id("4_1_1"));
        assert!(!factory.validate_id("nope"));
        //
        let collector = DistanceCollector::new(5).unwrap();
        let mut sink = factory.build(collector.as_sink(), None).unwrap();
        sink.accept(record("4_1_1")).unwrap();
        sink.accept(record("5_1_1")).unwrap();
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_factory_rejects_unknown_key() {
        log_init_test();
        let lister = Arc::new(FixedLister(BTreeSet::new()));
        let mut config = HashMap::new();
        config.insert(String::from("url"), String::from("http://nowhere"));
        let err = WorkspaceFilterFactory::from_config(&config, lister)
            .map(|_| ())
            .unwrap_err();
        assert!(err.to_string().contains("unrecognized key url"));
    }
} // end of mod tests
