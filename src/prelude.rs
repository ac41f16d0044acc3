//! Commonly used types and traits

pub use crate::accept::{accept, accept_synthetic_input};
pub use crate::deps::Dependencies;
pub use crate::effect::{CookieGetter, Effect, EffectGetter};
pub use crate::error::Error;
pub use crate::input::{as_input, Accepts, Input, InputSchema};
pub use crate::registry::{Flow, FlowReference, FlowType, PublicIntent, Registry};
pub use crate::schema::{SchemaBuilder, SchemaType};
pub use crate::service::{Data, DataOutputer, Service, ServiceOutput};
pub use crate::session::SessionOptions;
pub use crate::traverse::{Boundary, Milestone};
pub use crate::workflow::{InputReactor, Intent, Node, NodeSimple, Reaction, Workflow, Workflows};
