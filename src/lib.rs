//! # authflow-engine
//!
//! A resumable workflow engine for multi-step authentication flows.
//!
//! A flow is a tree: every [`Workflow`] has one [`Intent`] (its goal) and an
//! ordered list of [`Node`]s (what has happened so far). A node is either a
//! recorded step or a nested workflow with its own intent. Client input is
//! routed to the deepest place in the tree that can react to it, and each
//! accepted input produces a new immutable snapshot, persisted as JSON and
//! addressed by its instance ID.
//!
//! ## Features
//!
//! - **Accept protocol**: [`accept`] keeps feeding input down the tree until
//!   no reactor takes it further, committing all or nothing
//! - **Side effects**: nodes declare [`Effect::Run`] effects, replayed on
//!   every request, and [`Effect::OnCommit`] effects, run once on finish
//! - **JSON persistence**: kind-keyed [`Registry`] restores trees written by
//!   [`marshal_workflow`]
//! - **Schema-validated input**: inputs declare their shape with
//!   [`SchemaBuilder`], which is also advertised to clients
//! - **Service lifecycle**: [`Service`] creates, loads, feeds and finishes
//!   flows over a pluggable [`Store`]
//!
//! ## Quick Start
//!
//! ```rust
//! use authflow_engine::prelude::*;
//! use async_trait::async_trait;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct InputName {
//!     name: String,
//! }
//!
//! impl Input for InputName {
//!     fn kind(&self) -> &'static str { "InputName" }
//!
//!     fn json_schema(&self) -> SchemaBuilder {
//!         SchemaBuilder::new()
//!             .type_(SchemaType::Object)
//!             .required(&["name"])
//!             .property("name", SchemaBuilder::new().type_(SchemaType::String))
//!     }
//! }
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct NodeNamed {
//!     name: String,
//! }
//!
//! impl NodeSimple for NodeNamed {
//!     fn kind(&self) -> &'static str { "NodeNamed" }
//! }
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct IntentGreet {}
//!
//! #[async_trait]
//! impl InputReactor for IntentGreet {
//!     async fn can_react_to(
//!         &self,
//!         _deps: &Dependencies,
//!         workflows: Workflows<'_>,
//!     ) -> Result<Option<Box<dyn InputSchema>>, Error> {
//!         if workflows.nearest.nodes.is_empty() {
//!             Ok(Some(Accepts::<InputName>::boxed()))
//!         } else {
//!             Err(Error::Eof)
//!         }
//!     }
//!
//!     async fn react_to(
//!         &self,
//!         _deps: &Dependencies,
//!         _workflows: Workflows<'_>,
//!         input: Option<&dyn Input>,
//!     ) -> Result<Reaction, Error> {
//!         match input.and_then(as_input::<InputName>) {
//!             Some(input) => Ok(Reaction::Append(Node::simple(NodeNamed {
//!                 name: input.name.clone(),
//!             }))),
//!             None => Ok(Reaction::Incompatible),
//!         }
//!     }
//! }
//!
//! impl Intent for IntentGreet {
//!     fn kind(&self) -> &'static str { "IntentGreet" }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let deps = Arc::new(Dependencies::default());
//! let mut workflow = Workflow::new(
//!     deps.ids.new_workflow_id(),
//!     deps.ids.new_instance_id(),
//!     Arc::new(IntentGreet {}),
//! );
//!
//! // nothing to do without input
//! let result = accept(&deps, &mut workflow, None).await;
//! assert!(result.unwrap_err().is_no_change());
//!
//! let input = serde_json::json!({ "name": "Ada" });
//! let result = accept(&deps, &mut workflow, Some(&input)).await;
//! assert!(result.unwrap_err().is_eof());
//! assert_eq!(workflow.nodes.len(), 1);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! [`Error::Eof`] and [`Error::NoChange`] are signals rather than failures.
//! Domain errors raised by intents and nodes travel as [`Error::Flow`]:
//!
//! ```rust
//! use authflow_engine::Error;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("invalid OTP")]
//! struct InvalidOtp;
//!
//! let error = Error::flow(InvalidOtp);
//! match &error {
//!     Error::Eof => println!("finished"),
//!     Error::NoChange => println!("input ignored"),
//!     Error::Flow(_) if error.is_flow::<InvalidOtp>() => println!("try again"),
//!     _ => eprintln!("Error: {}", error),
//! }
//! ```

mod accept;
mod config;
mod deps;
mod effect;
mod error;
mod id;
mod input;
mod marshal;
mod registry;
mod schema;
mod service;
mod session;
mod traverse;
mod workflow;

pub mod prelude;

pub use accept::{accept, accept_synthetic_input, find_input_reactor, InputReactorResult, ReactorRef};
pub use config::EngineConfig;
pub use deps::Dependencies;
pub use effect::{
    apply_all_effects, apply_run_effects, collect_cookies, CookieGetter, Effect, EffectFn,
    EffectFuture, EffectGetter,
};
pub use error::{BoxError, Error};
pub use id::IdGenerator;
pub use input::{as_input, Accepts, AsAny, Input, InputSchema};
pub use marshal::{marshal_workflow, unmarshal_workflow, workflow_from_value, KindData};
pub use registry::{Flow, FlowReference, FlowType, PublicIntent, Registry};
pub use schema::{SchemaBuilder, SchemaType};
pub use service::{
    Data, DataOutputer, DataRedirectUri, FlowResponse, Service, ServiceDatabase, ServiceOutput,
    Store,
};
pub use session::{Session, SessionOptions, SessionOutput};
pub use traverse::{
    collect_boundaries, find_milestone, traverse_node, traverse_workflow, Boundary, Milestone,
    Visitor,
};
pub use workflow::{
    clone_node, clone_workflow, InputReactor, Intent, Node, NodeSimple, NodeType, Reaction,
    Workflow, Workflows,
};
