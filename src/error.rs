use crate::registry::FlowType;
use thiserror::Error;

/// Boxed error type used for domain and infrastructure failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while driving a workflow.
///
/// Two variants are not failures at all: [`Error::Eof`] means the flow has
/// nothing left to do, and [`Error::NoChange`] means nothing anywhere in the
/// tree accepted the given input. Callers usually branch on them with
/// [`Error::is_eof`] and [`Error::is_no_change`].
///
/// # Non-Exhaustive
///
/// This enum is marked `#[non_exhaustive]`. When matching on it, always
/// include a wildcard pattern:
///
/// ```
/// use authflow_engine::Error;
///
/// fn describe(error: &Error) -> &'static str {
///     match error {
///         Error::Eof => "finished",
///         Error::NoChange => "ignored",
///         Error::UserAgentUnmatched => "hijacked",
///         _ => "failed",
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The flow has finished; there is no input reactor left.
    #[error("eof")]
    Eof,

    /// The input was not accepted by any reactor in the tree.
    #[error("no change")]
    NoChange,

    /// The caller's user agent differs from the one bound to the session.
    #[error("user agent unmatched")]
    UserAgentUnmatched,

    /// A JSON payload did not satisfy the schema of the type it targets.
    #[error("invalid input for {kind}: {}", errors.join("; "))]
    InvalidInput {
        /// Kind of the intent or input being instantiated
        kind: String,
        /// One message per schema violation
        errors: Vec<String>,
    },

    /// A kind string was not found in the registry consulted.
    #[error("unknown {registry} kind: {kind}")]
    UnknownKind {
        /// Which registry was consulted ("intent", "node", ...)
        registry: &'static str,
        /// The kind that was looked up
        kind: String,
    },

    /// No flow is registered for the referenced flow type.
    #[error("unknown flow type: {0}")]
    UnknownFlow(FlowType),

    /// A persisted node does not carry the field its `type` requires.
    #[error("invalid node: {0}")]
    InvalidNode(String),

    /// A schema document could not be compiled.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// No workflow snapshot exists for the instance ID.
    #[error("workflow not found: {instance_id}")]
    WorkflowNotFound {
        /// The instance ID that was looked up
        instance_id: String,
    },

    /// No session exists for the workflow ID.
    #[error("session not found: {workflow_id}")]
    SessionNotFound {
        /// The workflow ID that was looked up
        workflow_id: String,
    },

    /// JSON encoding or decoding failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An intent or node rejected the input, e.g. a wrong OTP.
    #[error(transparent)]
    Flow(BoxError),

    /// A storage or transport collaborator failed.
    #[error("storage error: {0}")]
    Storage(#[source] BoxError),
}

impl Error {
    /// Wraps a domain error returned by an intent or a node.
    pub fn flow(error: impl Into<BoxError>) -> Self {
        Error::Flow(error.into())
    }

    /// Wraps an infrastructure error returned by a collaborator.
    pub fn storage(error: impl Into<BoxError>) -> Self {
        Error::Storage(error.into())
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Eof)
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, Error::NoChange)
    }

    /// Returns true if this is a domain error of type `E`.
    pub fn is_flow<E: std::error::Error + 'static>(&self) -> bool {
        match self {
            Error::Flow(inner) => inner.is::<E>(),
            _ => false,
        }
    }
}
