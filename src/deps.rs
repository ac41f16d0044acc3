use crate::config::EngineConfig;
use crate::id::IdGenerator;
use crate::session::Session;
use http::Extensions;
use std::sync::Arc;

/// Everything intents, nodes and effects may reach for.
///
/// The engine itself only uses `config` and `ids`. Flow catalogues register
/// their own collaborators (OTP senders, user stores, ...) as services and
/// look them up by type:
///
/// ```
/// use std::sync::Arc;
/// use authflow_engine::{Dependencies, EngineConfig};
///
/// #[derive(Clone)]
/// struct Mailer(&'static str);
///
/// let deps = Dependencies::new(EngineConfig::default()).with_service(Arc::new(Mailer("smtp")));
/// assert_eq!(deps.service::<Arc<Mailer>>().map(|m| m.0), Some("smtp"));
/// ```
///
/// While the [`Service`](crate::Service) drives a workflow, reactors also
/// find the workflow's [`Session`] here.
#[derive(Debug, Clone)]
pub struct Dependencies {
    pub config: EngineConfig,
    pub ids: Arc<IdGenerator>,
    services: Extensions,
}

impl Dependencies {
    pub fn new(config: EngineConfig) -> Self {
        let ids = IdGenerator::from_entropy(&config);
        Self::with_ids(config, ids)
    }

    pub fn with_ids(config: EngineConfig, ids: IdGenerator) -> Self {
        Self {
            config,
            ids: Arc::new(ids),
            services: Extensions::new(),
        }
    }

    /// Registers a collaborator, replacing any previous one of the same type.
    pub fn with_service<T: Clone + Send + Sync + 'static>(mut self, service: T) -> Self {
        self.services.insert(service);
        self
    }

    pub fn service<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.services.get::<T>()
    }

    /// A copy with `session` registered. IDs stay shared with `self`.
    pub(crate) fn for_session(&self, session: &Session) -> Self {
        self.clone().with_service(session.clone())
    }
}

impl Default for Dependencies {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
