use crate::accept::{accept, accept_synthetic_input, find_input_reactor};
use crate::deps::Dependencies;
use crate::effect::{apply_all_effects, apply_run_effects, collect_cookies};
use crate::error::Error;
use crate::input::Input;
use crate::registry::{FlowReference, Registry};
use crate::schema::SchemaBuilder;
use crate::session::{Session, SessionOptions, SessionOutput};
use crate::workflow::{Intent, Workflow, Workflows};
use async_trait::async_trait;
use cookie::Cookie;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Client-facing data produced with each response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Data {
    /// The flow finished; continue at this URI.
    RedirectUri(DataRedirectUri),
    /// Whatever the current reactor chose to show.
    Map(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataRedirectUri {
    pub redirect_uri: String,
}

impl Data {
    pub fn empty() -> Self {
        Data::Map(Map::new())
    }
}

impl Default for Data {
    fn default() -> Self {
        Data::empty()
    }
}

/// Implemented by reactors that show something while waiting for input,
/// e.g. the masked address an OTP was sent to.
#[async_trait]
pub trait DataOutputer: Send + Sync {
    async fn output_data(&self, deps: &Dependencies, workflows: Workflows<'_>) -> Result<Data, Error>;
}

/// Persistence of sessions and workflow snapshots.
///
/// Snapshots are immutable: every accepted input produces a workflow with a
/// new instance ID, stored alongside the previous ones. Nothing here
/// serializes concurrent feeds to the same workflow; a store that needs
/// that must provide it.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<(), Error>;

    /// Returns [`Error::SessionNotFound`] when there is none.
    async fn get_session(&self, workflow_id: &str) -> Result<Session, Error>;

    async fn delete_session(&self, session: &Session) -> Result<(), Error>;

    async fn create_workflow(&self, workflow: &Workflow) -> Result<(), Error>;

    /// Returns [`Error::WorkflowNotFound`] when there is none.
    async fn get_workflow_by_instance_id(&self, instance_id: &str) -> Result<Workflow, Error>;

    /// Deletes every snapshot of the workflow.
    async fn delete_workflow(&self, workflow: &Workflow) -> Result<(), Error>;
}

/// Transaction boundaries for the work the service does.
#[async_trait]
pub trait ServiceDatabase: Send + Sync {
    /// Runs `work` in a write transaction, committing only if it succeeds.
    async fn with_tx(&self, work: BoxFuture<'_, Result<(), Error>>) -> Result<(), Error>;

    async fn read_only(&self, work: BoxFuture<'_, Result<(), Error>>) -> Result<(), Error>;
}

/// The result of every service operation.
#[derive(Debug)]
pub struct ServiceOutput {
    pub session: Session,
    pub session_output: SessionOutput,
    pub workflow: Workflow,
    /// True once the flow has finished and its bookkeeping is deleted.
    pub finished: bool,
    /// Shape of the input expected next. `None` when finished or when the
    /// next reactor needs no input.
    pub schema_builder: Option<SchemaBuilder>,
    pub data: Data,
    /// Cookies to set. Only produced when the flow finishes.
    pub cookies: Vec<Cookie<'static>>,
}

/// Wire form of a [`ServiceOutput`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowResponse {
    pub id: String,
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<SchemaBuilder>,
    pub data: Data,
}

impl ServiceOutput {
    pub fn to_response(&self) -> FlowResponse {
        FlowResponse {
            id: self.workflow.instance_id.clone(),
            finished: self.finished,
            json_schema: self.schema_builder.clone(),
            data: self.data.clone(),
        }
    }
}

struct Action {
    finished: bool,
    schema_builder: Option<SchemaBuilder>,
    data: Data,
}

#[derive(Clone, Copy)]
enum Feed<'i> {
    Raw(Option<&'i Value>),
    Synthetic(&'i dyn Input),
}

/// Drives workflows through their lifecycle: create, get, feed, finish.
#[derive(Clone)]
pub struct Service {
    deps: Arc<Dependencies>,
    registry: Arc<Registry>,
    store: Arc<dyn Store>,
    database: Arc<dyn ServiceDatabase>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("deps", &self.deps)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Service {
    pub fn new(
        deps: Arc<Dependencies>,
        registry: Arc<Registry>,
        store: Arc<dyn Store>,
        database: Arc<dyn ServiceDatabase>,
    ) -> Self {
        Self {
            deps,
            registry,
            store,
            database,
        }
    }

    pub fn deps(&self) -> &Arc<Dependencies> {
        &self.deps
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Starts a workflow pursuing `intent`.
    ///
    /// A new session is stored, the intent is fed no input so it can make
    /// whatever progress it makes on its own, and the first snapshot is
    /// stored. A flow that finishes right away is finished here too.
    #[instrument(skip_all, fields(intent = intent.kind()))]
    pub async fn create_new_workflow(
        &self,
        intent: Arc<dyn Intent>,
        options: &SessionOptions,
    ) -> Result<ServiceOutput, Error> {
        let session = Session::new(self.deps.ids.new_workflow_id(), options);
        self.store.create_session(&session).await?;

        let mut workflow = Workflow::new(
            session.workflow_id.clone(),
            self.deps.ids.new_instance_id(),
            intent,
        );
        info!(workflow_id = %workflow.workflow_id, "creating workflow");

        let deps = self.session_deps(&session);
        let (eof, action) = self
            .in_read_only(self.create_new_workflow_inner(&deps, &session, &mut workflow))
            .await?;

        let cookies = if eof {
            self.finish_workflow(&deps, &session, &workflow).await?
        } else {
            Vec::new()
        };

        Ok(Self::output(session, workflow, action, cookies))
    }

    /// Starts the flow named by `reference`.
    pub async fn create_new_flow(
        &self,
        reference: &FlowReference,
        options: &SessionOptions,
    ) -> Result<ServiceOutput, Error> {
        let intent = self.registry.instantiate_flow(reference)?;
        self.create_new_workflow(intent, options).await
    }

    /// Loads the snapshot `instance_id` without changing it.
    #[instrument(skip(self, user_agent_id))]
    pub async fn get(&self, instance_id: &str, user_agent_id: &str) -> Result<ServiceOutput, Error> {
        let workflow = self.store.get_workflow_by_instance_id(instance_id).await?;
        let session = self.store.get_session(&workflow.workflow_id).await?;
        check_user_agent(&session, user_agent_id)?;

        let deps = self.session_deps(&session);
        let action = self
            .in_read_only(async {
                apply_run_effects(&deps, Workflows::new(&workflow)).await?;
                self.determine_action(&deps, &session, &workflow).await
            })
            .await?;

        Ok(Self::output(session, workflow, action, Vec::new()))
    }

    /// Feeds raw JSON input to the snapshot `instance_id`.
    ///
    /// On success the output carries the new snapshot. If the flow
    /// finished, its effects have run, its bookkeeping is deleted and
    /// `finished` is set. Returns [`Error::NoChange`] if nothing accepted
    /// the input.
    #[instrument(skip(self, user_agent_id, raw))]
    pub async fn feed_input(
        &self,
        instance_id: &str,
        user_agent_id: &str,
        raw: Option<&Value>,
    ) -> Result<ServiceOutput, Error> {
        self.feed(instance_id, user_agent_id, Feed::Raw(raw)).await
    }

    /// Feeds `{ "kind": ..., "data": ... }`, instantiated through the
    /// registry, as a synthetic input.
    #[instrument(skip(self, user_agent_id, envelope))]
    pub async fn feed_input_envelope(
        &self,
        instance_id: &str,
        user_agent_id: &str,
        envelope: &Value,
    ) -> Result<ServiceOutput, Error> {
        let input = self.registry.instantiate_input_envelope(envelope)?;
        self.feed(instance_id, user_agent_id, Feed::Synthetic(input.as_ref()))
            .await
    }

    /// Feeds several inputs in order, each to the snapshot produced by the
    /// previous one, stopping early if the flow finishes. With no inputs
    /// this is [`Service::get`].
    pub async fn feed_batch_input(
        &self,
        instance_id: &str,
        user_agent_id: &str,
        inputs: &[Value],
    ) -> Result<ServiceOutput, Error> {
        let mut instance_id = instance_id.to_string();
        let mut last = None;
        for raw in inputs {
            let output = self.feed_input(&instance_id, user_agent_id, Some(raw)).await?;
            instance_id = output.workflow.instance_id.clone();
            let finished = output.finished;
            last = Some(output);
            if finished {
                break;
            }
        }
        match last {
            Some(output) => Ok(output),
            None => self.get(&instance_id, user_agent_id).await,
        }
    }

    async fn feed(
        &self,
        instance_id: &str,
        user_agent_id: &str,
        feed: Feed<'_>,
    ) -> Result<ServiceOutput, Error> {
        let mut workflow = self.store.get_workflow_by_instance_id(instance_id).await?;
        let session = self.store.get_session(&workflow.workflow_id).await?;
        check_user_agent(&session, user_agent_id)?;

        let deps = self.session_deps(&session);
        let (eof, action) = self
            .in_read_only(self.feed_input_inner(&deps, &session, &mut workflow, feed))
            .await?;

        let cookies = if eof {
            self.finish_workflow(&deps, &session, &workflow).await?
        } else {
            Vec::new()
        };

        Ok(Self::output(session, workflow, action, cookies))
    }

    /// The dependencies reactors see while `session`'s workflow is driven.
    fn session_deps(&self, session: &Session) -> Arc<Dependencies> {
        Arc::new(self.deps.for_session(session))
    }

    async fn create_new_workflow_inner(
        &self,
        deps: &Arc<Dependencies>,
        session: &Session,
        workflow: &mut Workflow,
    ) -> Result<(bool, Action), Error> {
        let eof = match accept(deps, workflow, None).await {
            Ok(()) | Err(Error::NoChange) => false,
            Err(Error::Eof) => true,
            Err(error) => return Err(error),
        };

        self.store.create_workflow(workflow).await?;
        let action = self.determine_action(deps, session, workflow).await?;
        Ok((eof, action))
    }

    async fn feed_input_inner(
        &self,
        deps: &Arc<Dependencies>,
        session: &Session,
        workflow: &mut Workflow,
        feed: Feed<'_>,
    ) -> Result<(bool, Action), Error> {
        apply_run_effects(deps, Workflows::new(workflow)).await?;

        let result = match feed {
            Feed::Raw(raw) => accept(deps, workflow, raw).await,
            Feed::Synthetic(input) => accept_synthetic_input(deps, workflow, input).await,
        };
        let eof = match result {
            Ok(()) => false,
            Err(Error::Eof) => true,
            Err(error) => return Err(error),
        };

        self.store.create_workflow(workflow).await?;
        let action = self.determine_action(deps, session, workflow).await?;
        Ok((eof, action))
    }

    /// Runs every effect and deletes the flow's bookkeeping in one write
    /// transaction. Returns the cookies the flow declared.
    async fn finish_workflow(
        &self,
        deps: &Arc<Dependencies>,
        session: &Session,
        workflow: &Workflow,
    ) -> Result<Vec<Cookie<'static>>, Error> {
        let mut cookies = Vec::new();
        self.database
            .with_tx(Box::pin(async {
                apply_all_effects(deps, Workflows::new(workflow)).await?;
                cookies = collect_cookies(deps, Workflows::new(workflow))?;
                self.store.delete_session(session).await?;
                self.store.delete_workflow(workflow).await
            }))
            .await?;
        info!(workflow_id = %workflow.workflow_id, "workflow finished");
        Ok(cookies)
    }

    async fn determine_action(
        &self,
        deps: &Dependencies,
        session: &Session,
        workflow: &Workflow,
    ) -> Result<Action, Error> {
        match find_input_reactor(deps, Workflows::new(workflow)).await {
            Err(Error::Eof) => Ok(Action {
                finished: true,
                schema_builder: None,
                data: Data::RedirectUri(DataRedirectUri {
                    redirect_uri: session.redirect_uri.clone(),
                }),
            }),
            Err(error) => Err(error),
            Ok(found) => {
                debug!(reactor = found.reactor.kind(), "awaiting input");
                let schema_builder = found.input_schema.as_ref().map(|s| s.schema_builder());
                let data = match found.reactor.as_data_outputer() {
                    Some(outputer) => outputer.output_data(deps, found.workflows).await?,
                    None => Data::empty(),
                };
                Ok(Action {
                    finished: false,
                    schema_builder,
                    data,
                })
            }
        }
    }

    /// Runs `work` inside [`ServiceDatabase::read_only`] and hands back its
    /// value.
    async fn in_read_only<'a, T: Send + 'a>(
        &'a self,
        work: impl Future<Output = Result<T, Error>> + Send + 'a,
    ) -> Result<T, Error> {
        let mut value = None;
        self.database
            .read_only(Box::pin(async {
                value = Some(work.await?);
                Ok::<(), Error>(())
            }))
            .await?;
        value.ok_or_else(|| Error::storage("read-only transaction did not run its work"))
    }

    fn output(session: Session, workflow: Workflow, action: Action, cookies: Vec<Cookie<'static>>) -> ServiceOutput {
        ServiceOutput {
            session_output: session.to_output(),
            session,
            workflow,
            finished: action.finished,
            schema_builder: action.schema_builder,
            data: action.data,
            cookies,
        }
    }
}

/// A session bound to a user agent may only be driven by that user agent.
fn check_user_agent(session: &Session, user_agent_id: &str) -> Result<(), Error> {
    if !session.user_agent_id.is_empty() && session.user_agent_id != user_agent_id {
        warn!(workflow_id = %session.workflow_id, "user agent unmatched");
        return Err(Error::UserAgentUnmatched);
    }
    Ok(())
}
