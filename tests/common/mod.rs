//! A simplified signup flow and an in-memory store shared by the
//! integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use authflow_engine::prelude::*;
use authflow_engine::{
    marshal_workflow, unmarshal_workflow, EngineConfig, IdGenerator, Session, ServiceDatabase,
    Store,
};
use cookie::Cookie;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
#[error("invalid OTP")]
pub struct InvalidOtp;

/// Effects append here when it is registered as a service.
#[derive(Debug, Clone, Default)]
pub struct EffectLog(Arc<Mutex<Vec<String>>>);

impl EffectLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

fn log_effect(deps: &Dependencies, entry: String) {
    if let Some(log) = deps.service::<EffectLog>() {
        log.push(entry);
    }
}

fn string_property(name: &str) -> SchemaBuilder {
    SchemaBuilder::new()
        .required(&[name])
        .property(name, SchemaBuilder::new().type_(SchemaType::String))
}

fn boolean_property(name: &str) -> SchemaBuilder {
    SchemaBuilder::new()
        .required(&[name])
        .property(name, SchemaBuilder::new().type_(SchemaType::Boolean))
}

// Inputs

#[derive(Debug, Default, Deserialize)]
pub struct InputIntentAuthenticate {
    pub login_id: String,
}

impl Input for InputIntentAuthenticate {
    fn kind(&self) -> &'static str {
        "InputIntentAuthenticate"
    }

    fn json_schema(&self) -> SchemaBuilder {
        string_property("login_id").type_(SchemaType::Object)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InputIntentSignup {
    #[serde(default)]
    pub login_id: String,
    #[serde(default)]
    pub create_password: bool,
}

impl Input for InputIntentSignup {
    fn kind(&self) -> &'static str {
        "InputIntentSignup"
    }

    fn json_schema(&self) -> SchemaBuilder {
        SchemaBuilder::new()
            .type_(SchemaType::Object)
            .one_of([string_property("login_id"), boolean_property("create_password")])
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InputIntentAddLoginId {
    pub login_id: String,
}

impl Input for InputIntentAddLoginId {
    fn kind(&self) -> &'static str {
        "InputIntentAddLoginId"
    }

    fn json_schema(&self) -> SchemaBuilder {
        string_property("login_id").type_(SchemaType::Object)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InputNodeVerifyLoginId {
    #[serde(default)]
    pub otp: String,
    #[serde(default)]
    pub resend: bool,
}

impl Input for InputNodeVerifyLoginId {
    fn kind(&self) -> &'static str {
        "InputNodeVerifyLoginId"
    }

    fn json_schema(&self) -> SchemaBuilder {
        SchemaBuilder::new()
            .type_(SchemaType::Object)
            .one_of([string_property("otp"), boolean_property("resend")])
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InputIntentCreatePassword {
    pub new_password: String,
}

impl Input for InputIntentCreatePassword {
    fn kind(&self) -> &'static str {
        "InputIntentCreatePassword"
    }

    fn json_schema(&self) -> SchemaBuilder {
        string_property("new_password").type_(SchemaType::Object)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InputTestBoundary {}

impl Input for InputTestBoundary {
    fn kind(&self) -> &'static str {
        "InputTestBoundary"
    }

    fn json_schema(&self) -> SchemaBuilder {
        SchemaBuilder::new()
    }
}

// Intents and nodes

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IntentAuthenticate {
    pub pretend_login_id_exists: bool,
}

#[async_trait]
impl InputReactor for IntentAuthenticate {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        if workflows.nearest.nodes.is_empty() {
            return Ok(Some(Accepts::<InputIntentAuthenticate>::boxed()));
        }
        Err(Error::Eof)
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
        input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        let Some(input) = input.and_then(as_input::<InputIntentAuthenticate>) else {
            return Ok(Reaction::Incompatible);
        };
        let login_id = input.login_id.clone();
        if self.pretend_login_id_exists {
            Ok(Reaction::Append(Node::sub_workflow(IntentLogin { login_id })))
        } else {
            Ok(Reaction::Append(Node::sub_workflow(IntentSignup { login_id })))
        }
    }
}

impl Intent for IntentAuthenticate {
    fn kind(&self) -> &'static str {
        "IntentAuthenticate"
    }
}

impl Flow for IntentAuthenticate {
    fn flow_type(&self) -> FlowType {
        FlowType::LoginFlow
    }

    fn flow_init(&mut self, reference: &FlowReference) {
        self.pretend_login_id_exists = reference.id == "existing";
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IntentLogin {
    pub login_id: String,
}

#[async_trait]
impl InputReactor for IntentLogin {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        Err(Error::Eof)
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
        _input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        Ok(Reaction::Incompatible)
    }
}

impl Intent for IntentLogin {
    fn kind(&self) -> &'static str {
        "IntentLogin"
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IntentSignup {
    pub login_id: String,
}

#[async_trait]
impl InputReactor for IntentSignup {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        if workflows.nearest.nodes.len() >= 2 {
            return Err(Error::Eof);
        }
        Ok(Some(Accepts::<InputIntentSignup>::boxed()))
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
        input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        match input.and_then(as_input::<InputIntentSignup>) {
            Some(input) if !input.login_id.is_empty() => {
                Ok(Reaction::Append(Node::sub_workflow(IntentAddLoginId {
                    login_id: self.login_id.clone(),
                })))
            }
            Some(input) if input.create_password => {
                Ok(Reaction::Append(Node::sub_workflow(IntentCreatePassword {})))
            }
            _ => Ok(Reaction::Incompatible),
        }
    }
}

impl Intent for IntentSignup {
    fn kind(&self) -> &'static str {
        "IntentSignup"
    }

    fn as_effect_getter(&self) -> Option<&dyn EffectGetter> {
        Some(self)
    }

    fn as_cookie_getter(&self) -> Option<&dyn CookieGetter> {
        Some(self)
    }
}

impl EffectGetter for IntentSignup {
    fn get_effects(&self, _deps: &Dependencies, _workflows: Workflows<'_>) -> Result<Vec<Effect>, Error> {
        let login_id = self.login_id.clone();
        Ok(vec![Effect::on_commit(move |deps| {
            let entry = format!("create user {login_id}");
            async move {
                log_effect(&deps, entry);
                Ok(())
            }
        })])
    }
}

impl CookieGetter for IntentSignup {
    fn get_cookies(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
    ) -> Result<Vec<Cookie<'static>>, Error> {
        Ok(vec![Cookie::new("session", "signed-up")])
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IntentAddLoginId {
    pub login_id: String,
}

#[async_trait]
impl InputReactor for IntentAddLoginId {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        if workflows.nearest.nodes.is_empty() {
            return Ok(Some(Accepts::<InputIntentAddLoginId>::boxed()));
        }
        Err(Error::Eof)
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
        input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        match input.and_then(as_input::<InputIntentAddLoginId>) {
            Some(_) => Ok(Reaction::Append(Node::simple(NodeVerifyLoginId {
                login_id: self.login_id.clone(),
                otp: "123456".to_string(),
            }))),
            None => Ok(Reaction::Incompatible),
        }
    }
}

impl Intent for IntentAddLoginId {
    fn kind(&self) -> &'static str {
        "IntentAddLoginId"
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeVerifyLoginId {
    pub login_id: String,
    pub otp: String,
}

#[async_trait]
impl InputReactor for NodeVerifyLoginId {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        Ok(Some(Accepts::<InputNodeVerifyLoginId>::boxed()))
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
        input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        match input.and_then(as_input::<InputNodeVerifyLoginId>) {
            Some(input) if !input.otp.is_empty() => {
                if input.otp != self.otp {
                    return Err(Error::flow(InvalidOtp));
                }
                Ok(Reaction::Append(Node::simple(NodeLoginIdVerified {
                    login_id: self.login_id.clone(),
                })))
            }
            Some(input) if input.resend => Ok(Reaction::UpdateLast(Node::simple(NodeVerifyLoginId {
                login_id: self.login_id.clone(),
                otp: "654321".to_string(),
            }))),
            _ => Ok(Reaction::Incompatible),
        }
    }

    fn as_data_outputer(&self) -> Option<&dyn DataOutputer> {
        Some(self)
    }
}

#[async_trait]
impl DataOutputer for NodeVerifyLoginId {
    async fn output_data(&self, _deps: &Dependencies, _workflows: Workflows<'_>) -> Result<Data, Error> {
        let mut data = serde_json::Map::new();
        data.insert("otp_sent_to".to_string(), self.login_id.clone().into());
        Ok(Data::Map(data))
    }
}

impl NodeSimple for NodeVerifyLoginId {
    fn kind(&self) -> &'static str {
        "NodeVerifyLoginId"
    }

    fn as_reactor(&self) -> Option<&dyn InputReactor> {
        Some(self)
    }

    fn as_effect_getter(&self) -> Option<&dyn EffectGetter> {
        Some(self)
    }
}

impl EffectGetter for NodeVerifyLoginId {
    fn get_effects(&self, _deps: &Dependencies, _workflows: Workflows<'_>) -> Result<Vec<Effect>, Error> {
        let entry = format!("send otp {} to {}", self.otp, self.login_id);
        Ok(vec![Effect::run(move |deps| {
            let entry = entry.clone();
            async move {
                log_effect(&deps, entry);
                Ok(())
            }
        })])
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeLoginIdVerified {
    pub login_id: String,
}

impl NodeSimple for NodeLoginIdVerified {
    fn kind(&self) -> &'static str {
        "NodeLoginIdVerified"
    }

    fn as_milestone(&self) -> Option<&dyn Milestone> {
        Some(self)
    }
}

impl Milestone for NodeLoginIdVerified {}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IntentCreatePassword {}

#[async_trait]
impl InputReactor for IntentCreatePassword {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        if workflows.nearest.nodes.is_empty() {
            return Ok(Some(Accepts::<InputIntentCreatePassword>::boxed()));
        }
        Err(Error::Eof)
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
        input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        match input.and_then(as_input::<InputIntentCreatePassword>) {
            Some(input) => Ok(Reaction::Append(Node::simple(NodeCreatePassword {
                hashed_new_password: input.new_password.clone(),
            }))),
            None => Ok(Reaction::Incompatible),
        }
    }
}

impl Intent for IntentCreatePassword {
    fn kind(&self) -> &'static str {
        "IntentCreatePassword"
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeCreatePassword {
    pub hashed_new_password: String,
}

impl NodeSimple for NodeCreatePassword {
    fn kind(&self) -> &'static str {
        "NodeCreatePassword"
    }

    fn as_effect_getter(&self) -> Option<&dyn EffectGetter> {
        Some(self)
    }

    fn as_cookie_getter(&self) -> Option<&dyn CookieGetter> {
        Some(self)
    }
}

impl EffectGetter for NodeCreatePassword {
    fn get_effects(&self, _deps: &Dependencies, _workflows: Workflows<'_>) -> Result<Vec<Effect>, Error> {
        Ok(vec![Effect::on_commit(|deps| async move {
            log_effect(&deps, "create password".to_string());
            Ok(())
        })])
    }
}

impl CookieGetter for NodeCreatePassword {
    fn get_cookies(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
    ) -> Result<Vec<Cookie<'static>>, Error> {
        Ok(vec![Cookie::new("password", "set")])
    }
}

/// Appends one boundary step per input, each needing its own input.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IntentTestBoundarySteps {}

#[async_trait]
impl InputReactor for IntentTestBoundarySteps {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        Ok(None)
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        workflows: Workflows<'_>,
        _input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        Ok(Reaction::Append(Node::sub_workflow(IntentTestBoundaryStep {
            name: workflows.nearest.nodes.len().to_string(),
        })))
    }
}

impl Intent for IntentTestBoundarySteps {
    fn kind(&self) -> &'static str {
        "IntentTestBoundarySteps"
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IntentTestBoundaryStep {
    pub name: String,
}

#[async_trait]
impl InputReactor for IntentTestBoundaryStep {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        if workflows.nearest.nodes.is_empty() {
            return Ok(Some(Accepts::<InputTestBoundary>::boxed()));
        }
        Err(Error::Eof)
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        workflows: Workflows<'_>,
        _input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        if workflows.nearest.nodes.is_empty() {
            return Ok(Reaction::Append(Node::simple(NodeTestBoundary {})));
        }
        Ok(Reaction::Incompatible)
    }
}

impl Intent for IntentTestBoundaryStep {
    fn kind(&self) -> &'static str {
        "IntentTestBoundaryStep"
    }

    fn as_boundary(&self) -> Option<&dyn Boundary> {
        Some(self)
    }
}

impl Boundary for IntentTestBoundaryStep {
    fn boundary(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeTestBoundary {}

impl NodeSimple for NodeTestBoundary {
    fn kind(&self) -> &'static str {
        "NodeTestBoundary"
    }
}

/// Proceeds without input and finishes after one node.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IntentNilInput {}

#[async_trait]
impl InputReactor for IntentNilInput {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        if workflows.nearest.nodes.is_empty() {
            return Ok(None);
        }
        Err(Error::Eof)
    }

    async fn react_to(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
        _input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        Ok(Reaction::Append(Node::simple(NodeNilInput {})))
    }
}

impl Intent for IntentNilInput {
    fn kind(&self) -> &'static str {
        "IntentNilInput"
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeNilInput {}

impl NodeSimple for NodeNilInput {
    fn kind(&self) -> &'static str {
        "NodeNilInput"
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InputServiceContext {}

impl Input for InputServiceContext {
    fn kind(&self) -> &'static str {
        "InputServiceContext"
    }

    fn json_schema(&self) -> SchemaBuilder {
        SchemaBuilder::new()
    }
}

/// Records the client ID of the session it runs in.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IntentServiceContext {}

#[async_trait]
impl InputReactor for IntentServiceContext {
    async fn can_react_to(
        &self,
        _deps: &Dependencies,
        workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error> {
        if workflows.nearest.nodes.is_empty() {
            return Ok(Some(Accepts::<InputServiceContext>::boxed()));
        }
        Err(Error::Eof)
    }

    async fn react_to(
        &self,
        deps: &Dependencies,
        _workflows: Workflows<'_>,
        input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        if input.and_then(as_input::<InputServiceContext>).is_none() {
            return Ok(Reaction::Incompatible);
        }
        let client_id = deps
            .service::<Session>()
            .map(|session| session.client_id.clone())
            .unwrap_or_default();
        Ok(Reaction::Append(Node::simple(NodeServiceContext { client_id })))
    }
}

impl Intent for IntentServiceContext {
    fn kind(&self) -> &'static str {
        "IntentServiceContext"
    }

    fn as_cookie_getter(&self) -> Option<&dyn CookieGetter> {
        Some(self)
    }
}

impl CookieGetter for IntentServiceContext {
    fn get_cookies(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
    ) -> Result<Vec<Cookie<'static>>, Error> {
        Ok(vec![Cookie::new("intentServiceContext", "intentServiceContext")])
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeServiceContext {
    pub client_id: String,
}

impl NodeSimple for NodeServiceContext {
    fn kind(&self) -> &'static str {
        "NodeServiceContext"
    }

    fn as_cookie_getter(&self) -> Option<&dyn CookieGetter> {
        Some(self)
    }
}

impl CookieGetter for NodeServiceContext {
    fn get_cookies(
        &self,
        _deps: &Dependencies,
        _workflows: Workflows<'_>,
    ) -> Result<Vec<Cookie<'static>>, Error> {
        Ok(vec![Cookie::new("nodeServiceContext", "nodeServiceContext")])
    }
}

pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_flow::<IntentAuthenticate>()
        .register_intent::<IntentLogin>()
        .register_intent::<IntentSignup>()
        .register_intent::<IntentAddLoginId>()
        .register_intent::<IntentCreatePassword>()
        .register_intent::<IntentTestBoundarySteps>()
        .register_intent::<IntentTestBoundaryStep>()
        .register_intent::<IntentNilInput>()
        .register_intent::<IntentServiceContext>()
        .register_node::<NodeVerifyLoginId>()
        .register_node::<NodeLoginIdVerified>()
        .register_node::<NodeCreatePassword>()
        .register_node::<NodeTestBoundary>()
        .register_node::<NodeNilInput>()
        .register_node::<NodeServiceContext>()
        .register_public_input::<InputNodeVerifyLoginId>()
        .register_public_input::<InputIntentCreatePassword>();
    registry
}

/// Dependencies with a seeded ID generator.
pub fn seeded_deps(seed: u64) -> Arc<Dependencies> {
    let config = EngineConfig::default();
    let ids = IdGenerator::seeded(seed, &config);
    Arc::new(Dependencies::with_ids(config, ids))
}

/// Seeded dependencies carrying an [`EffectLog`].
pub fn deps_with_log(seed: u64) -> (Arc<Dependencies>, EffectLog) {
    let config = EngineConfig::default();
    let ids = IdGenerator::seeded(seed, &config);
    let log = EffectLog::default();
    let deps = Dependencies::with_ids(config, ids).with_service(log.clone());
    (Arc::new(deps), log)
}

/// Keeps workflows as JSON so that every load goes through the registry.
pub struct MemoryStore {
    registry: Arc<Registry>,
    sessions: Mutex<HashMap<String, Session>>,
    workflows: Mutex<HashMap<String, (String, String)>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            sessions: Mutex::default(),
            workflows: Mutex::default(),
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn workflow_count(&self) -> usize {
        self.workflows.lock().len()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_session(&self, session: &Session) -> Result<(), Error> {
        self.record("create_session");
        self.sessions
            .lock()
            .insert(session.workflow_id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, workflow_id: &str) -> Result<Session, Error> {
        self.record("get_session");
        self.sessions
            .lock()
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound {
                workflow_id: workflow_id.to_string(),
            })
    }

    async fn delete_session(&self, session: &Session) -> Result<(), Error> {
        self.record("delete_session");
        self.sessions.lock().remove(&session.workflow_id);
        Ok(())
    }

    async fn create_workflow(&self, workflow: &Workflow) -> Result<(), Error> {
        self.record("create_workflow");
        let json = marshal_workflow(workflow)?;
        self.workflows.lock().insert(
            workflow.instance_id.clone(),
            (workflow.workflow_id.clone(), json),
        );
        Ok(())
    }

    async fn get_workflow_by_instance_id(&self, instance_id: &str) -> Result<Workflow, Error> {
        self.record("get_workflow");
        let json = self
            .workflows
            .lock()
            .get(instance_id)
            .map(|(_, json)| json.clone())
            .ok_or_else(|| Error::WorkflowNotFound {
                instance_id: instance_id.to_string(),
            })?;
        unmarshal_workflow(&self.registry, &json)
    }

    async fn delete_workflow(&self, workflow: &Workflow) -> Result<(), Error> {
        self.record("delete_workflow");
        self.workflows
            .lock()
            .retain(|_, (workflow_id, _)| *workflow_id != workflow.workflow_id);
        Ok(())
    }
}

/// Runs the work directly, counting transactions.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    pub write_transactions: Mutex<usize>,
    pub read_only_transactions: Mutex<usize>,
}

#[async_trait]
impl ServiceDatabase for MemoryDatabase {
    async fn with_tx(&self, work: BoxFuture<'_, Result<(), Error>>) -> Result<(), Error> {
        *self.write_transactions.lock() += 1;
        work.await
    }

    async fn read_only(&self, work: BoxFuture<'_, Result<(), Error>>) -> Result<(), Error> {
        *self.read_only_transactions.lock() += 1;
        work.await
    }
}

/// Installs a test subscriber once; engine logs show up with `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
