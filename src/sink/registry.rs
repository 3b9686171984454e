//! the filter factory registry.
//!
//! Filters are declared in configuration as (implementation name, opaque
//! string keyed config) pairs and instantiated once at process start. The set
//! of builtin implementations is closed and known at compile time, third
//! party factories go through [FilterRegistry::register] which accepts any
//! externally constructed factory. After construction the registry is read
//! only and shared by all queries without synchronization.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::HomError;
use crate::sink::workspace::{WorkspaceFilterFactory, WorkspaceLister};
use crate::sink::DistanceSink;
use crate::types::{AuthSource, FilterId, Token};

/// name of the builtin KBase workspace membership filter
pub const KBASE_FILTER: &str = "kbase";

/// a configuration bound plugin descriptor.
///
/// A factory manufactures one filter instance per query, bound to a
/// downstream sink and the caller token, and provides the stateless
/// sequence id validity predicate the loader uses to vet sketch databases.
pub trait FilterFactory: Send + Sync {
    /// declared id, unique within the active registry
    fn get_id(&self) -> &FilterId;

    /// authorization source this filter authenticates against, if any
    fn get_auth_source(&self) -> Option<&AuthSource>;

    /// a filter instance forwarding surviving records to `sink`
    fn build(
        &self,
        sink: Box<dyn DistanceSink>,
        token: Option<&Token>,
    ) -> Result<Box<dyn DistanceSink>, HomError>;

    /// true if the sequence id is syntactically acceptable to this filter
    fn validate_id(&self, sequence_id: &str) -> bool;
} // end of trait FilterFactory

//==================================================================================

/// one filter declaration from configuration
#[derive(Clone, Debug)]
pub struct FilterConfig {
    /// builtin implementation name, see [KBASE_FILTER]
    pub name: String,
    /// opaque configuration handed to the factory constructor
    pub config: HashMap<String, String>,
} // end of FilterConfig

/// collaborators builtin factories may need, injected by the embedding
/// service at startup
#[derive(Clone, Default)]
pub struct FilterCollaborators {
    /// workspace service client, required by the kbase filter
    pub workspace_lister: Option<Arc<dyn WorkspaceLister>>,
} // end of FilterCollaborators

//==================================================================================

/// the process wide set of filter factories
pub struct FilterRegistry {
    factories: Vec<Box<dyn FilterFactory>>,
} // end of FilterRegistry

impl FilterRegistry {
    /// an empty registry, to be populated via [FilterRegistry::register]
    pub fn new() -> Self {
        FilterRegistry {
            factories: Vec::new(),
        }
    }

    /// instantiate all configured factories.
    /// Any unknown implementation name, constructor failure, missing
    /// collaborator or duplicate factory id is a configuration error naming
    /// the offender.
    pub fn from_config(
        configs: &[FilterConfig],
        collaborators: &FilterCollaborators,
    ) -> Result<Self, HomError> {
        let mut registry = FilterRegistry::new();
        for cfg in configs {
            let factory: Box<dyn FilterFactory> = match cfg.name.as_str() {
                KBASE_FILTER => {
                    let lister = collaborators.workspace_lister.clone().ok_or_else(|| {
                        HomError::Configuration(format!(
                            "filter {} requires a workspace lister collaborator",
                            cfg.name
                        ))
                    })?;
                    let factory = WorkspaceFilterFactory::from_config(&cfg.config, lister)
                        .map_err(|e| {
                            HomError::Configuration(format!(
                                "could not construct filter {} : {}",
                                cfg.name, e
                            ))
                        })?;
                    Box::new(factory)
                }
                other => {
                    return Err(HomError::Configuration(format!(
                        "unknown filter implementation : {}",
                        other
                    )));
                }
            };
            registry.register(factory)?;
        }
        log::info!("filter registry loaded with {} factories", registry.len());
        Ok(registry)
    } // end of from_config

    /// add an externally constructed factory. This is the extension point for
    /// filter implementations not part of the builtin set.
    pub fn register(&mut self, factory: Box<dyn FilterFactory>) -> Result<(), HomError> {
        if self.get(factory.get_id()).is_some() {
            return Err(HomError::Configuration(format!(
                "duplicate filter factory id : {}",
                factory.get_id().get()
            )));
        }
        log::debug!("registered filter factory {}", factory.get_id().get());
        self.factories.push(factory);
        Ok(())
    } // end of register

    /// lookup by id. Linear scan, the active set is small.
    pub fn get(&self, id: &FilterId) -> Option<&dyn FilterFactory> {
        self.factories
            .iter()
            .find(|f| f.get_id() == id)
            .map(|f| f.as_ref())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
} // end of impl FilterRegistry

impl Default for FilterRegistry {
    fn default() -> Self {
        FilterRegistry::new()
    }
}

//==================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use std::collections::BTreeSet;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    struct NullLister;

    impl WorkspaceLister for NullLister {
        fn list_workspaces(&self, _token: Option<&Token>) -> Result<BTreeSet<i64>, HomError> {
            Ok(BTreeSet::new())
        }
    }

    fn kbase_config(id: &str) -> FilterConfig {
        let mut config = HashMap::new();
        config.insert(String::from("id"), String::from(id));
        FilterConfig {
            name: String::from(KBASE_FILTER),
            config,
        }
    }

    fn collaborators() -> FilterCollaborators {
        FilterCollaborators {
            workspace_lister: Some(Arc::new(NullLister)),
        }
    }

    #[test]
    fn test_builtin_loaded() {
        log_init_test();
        let registry =
            FilterRegistry::from_config(&[kbase_config("kbase")], &collaborators()).unwrap();
        assert_eq!(registry.len(), 1);
        let factory = registry.get(&FilterId::new("kbase").unwrap()).unwrap();
        assert_eq!(factory.get_auth_source().map(|a| a.get()), Some("kbase"));
        assert!(registry.get(&FilterId::new("other").unwrap()).is_none());
    }

    #[test]
    fn test_unknown_implementation_named_in_error() {
        log_init_test();
        let cfg = FilterConfig {
            name: String::from("com.example.NoSuchFilter"),
            config: HashMap::new(),
        };
        let err = FilterRegistry::from_config(&[cfg], &collaborators()).map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("com.example.NoSuchFilter"), "{}", err);
    }

    #[test]
    fn test_missing_collaborator_is_config_error() {
        log_init_test();
        let err = FilterRegistry::from_config(&[kbase_config("kbase")], &Default::default())
            .map(|_| ())
            .unwrap_err();
        assert!(err.to_string().contains("workspace lister"), "{}", err);
    }

    #[test]
    fn test_constructor_failure_named_in_error() {
        log_init_test();
        let mut config = HashMap::new();
        config.insert(String::from("bogus"), String::from("x"));
        let cfg = FilterConfig {
            name: String::from(KBASE_FILTER),
            config,
        };
        let err = FilterRegistry::from_config(&[cfg], &collaborators()).map(|_| ()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("could not construct filter kbase"), "{}", msg);
        assert!(msg.contains("bogus"), "{}", msg);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        log_init_test();
        let cfgs = [kbase_config("same"), kbase_config("same")];
        let err = FilterRegistry::from_config(&cfgs, &collaborators()).map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("duplicate filter factory id : same"), "{}", err);
    }
} // end of mod tests
