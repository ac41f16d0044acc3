use crate::error::Error;
use crate::input::Input;
use crate::marshal::KindData;
use crate::schema::SchemaBuilder;
use crate::workflow::{Intent, NodeSimple};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Top-level flows a client may start by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    SignupFlow,
    LoginFlow,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::SignupFlow => "signup_flow",
            FlowType::LoginFlow => "login_flow",
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names a configured flow: its type and the ID of its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReference {
    #[serde(rename = "type")]
    pub flow_type: FlowType,
    pub id: String,
}

/// An intent clients may start directly. Its payload is validated against
/// the schema before it is deserialized.
pub trait PublicIntent: Intent {
    fn json_schema(&self) -> SchemaBuilder;
}

/// An intent started from a [`FlowReference`].
pub trait Flow: Intent {
    fn flow_type(&self) -> FlowType;

    /// Binds a freshly defaulted flow to the reference it was started with.
    fn flow_init(&mut self, reference: &FlowReference);
}

type IntentFactory = Box<dyn Fn(Value) -> Result<Arc<dyn Intent>, Error> + Send + Sync>;
type NodeFactory = Box<dyn Fn(Value) -> Result<Arc<dyn NodeSimple>, Error> + Send + Sync>;
type InputFactory = Box<dyn Fn(&Value) -> Result<Box<dyn Input>, Error> + Send + Sync>;
type FlowFactory = Box<dyn Fn(&FlowReference) -> Arc<dyn Intent> + Send + Sync>;

/// Kind-keyed factories for everything a workflow tree can contain.
///
/// Registration happens once at startup and panics on a duplicate kind,
/// since two types sharing a kind could never be told apart when a
/// persisted workflow is read back. After startup the registry is only
/// read, typically behind an `Arc`.
///
/// # Examples
///
/// ```
/// use authflow_engine::prelude::*;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct IntentDone {}
///
/// #[async_trait::async_trait]
/// impl InputReactor for IntentDone {
///     async fn can_react_to(
///         &self,
///         _deps: &Dependencies,
///         _workflows: Workflows<'_>,
///     ) -> Result<Option<Box<dyn InputSchema>>, Error> {
///         Err(Error::Eof)
///     }
///
///     async fn react_to(
///         &self,
///         _deps: &Dependencies,
///         _workflows: Workflows<'_>,
///         _input: Option<&dyn Input>,
///     ) -> Result<Reaction, Error> {
///         Ok(Reaction::Incompatible)
///     }
/// }
///
/// impl Intent for IntentDone {
///     fn kind(&self) -> &'static str { "IntentDone" }
/// }
///
/// let mut registry = Registry::new();
/// registry.register_intent::<IntentDone>();
///
/// let intent = registry.instantiate_intent("IntentDone", serde_json::json!({})).unwrap();
/// assert_eq!(intent.kind(), "IntentDone");
/// assert!(registry.instantiate_intent("IntentMissing", serde_json::json!({})).is_err());
/// ```
#[derive(Default)]
pub struct Registry {
    intents: HashMap<&'static str, IntentFactory>,
    public_intents: HashMap<&'static str, IntentFactory>,
    nodes: HashMap<&'static str, NodeFactory>,
    public_inputs: HashMap<&'static str, InputFactory>,
    flows: HashMap<FlowType, FlowFactory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("intents", &self.intents.keys().collect::<Vec<_>>())
            .field("public_intents", &self.public_intents.keys().collect::<Vec<_>>())
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("public_inputs", &self.public_inputs.keys().collect::<Vec<_>>())
            .field("flows", &self.flows.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[allow(clippy::panic)]
fn insert_unique<K, V>(map: &mut HashMap<K, V>, registry: &str, kind: K, value: V)
where
    K: std::hash::Hash + Eq + fmt::Display,
{
    if map.contains_key(&kind) {
        panic!("{registry} kind registered twice: {kind}");
    }
    map.insert(kind, value);
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an intent for restoring persisted workflows. Its payload
    /// is trusted and not validated.
    pub fn register_intent<T>(&mut self) -> &mut Self
    where
        T: Intent + DeserializeOwned + Default + 'static,
    {
        let kind = T::default().kind();
        let factory: IntentFactory = Box::new(|data| {
            let intent: T = serde_json::from_value(data)?;
            Ok(Arc::new(intent))
        });
        insert_unique(&mut self.intents, "intent", kind, factory);
        self
    }

    /// Plain intent registration for the public intent and flow paths, so
    /// one type may go through both.
    fn register_intent_once<T>(&mut self) -> &mut Self
    where
        T: Intent + DeserializeOwned + Default + 'static,
    {
        if self.intents.contains_key(T::default().kind()) {
            return self;
        }
        self.register_intent::<T>()
    }

    /// Registers an intent clients may start. It is also registered as a
    /// plain intent unless that kind already is.
    pub fn register_public_intent<T>(&mut self) -> &mut Self
    where
        T: PublicIntent + DeserializeOwned + Default + 'static,
    {
        let kind = T::default().kind();
        let factory: IntentFactory = Box::new(|data| {
            let prototype = T::default();
            let intent: T = prototype.json_schema().parse(prototype.kind(), &data)?;
            Ok(Arc::new(intent))
        });
        insert_unique(&mut self.public_intents, "public intent", kind, factory);
        self.register_intent_once::<T>()
    }

    pub fn register_node<T>(&mut self) -> &mut Self
    where
        T: NodeSimple + DeserializeOwned + Default + 'static,
    {
        let kind = T::default().kind();
        let factory: NodeFactory = Box::new(|data| {
            let node: T = serde_json::from_value(data)?;
            Ok(Arc::new(node))
        });
        insert_unique(&mut self.nodes, "node", kind, factory);
        self
    }

    /// Registers an input clients may submit wrapped in a kind envelope.
    pub fn register_public_input<T>(&mut self) -> &mut Self
    where
        T: Input + DeserializeOwned + Default + 'static,
    {
        let kind = T::default().kind();
        let factory: InputFactory = Box::new(|data| {
            let prototype = T::default();
            let input: T = prototype.json_schema().parse(prototype.kind(), data)?;
            Ok(Box::new(input))
        });
        insert_unique(&mut self.public_inputs, "input", kind, factory);
        self
    }

    /// Registers the flow for its [`FlowType`]. It is also registered as a
    /// plain intent unless that kind already is.
    pub fn register_flow<T>(&mut self) -> &mut Self
    where
        T: Flow + DeserializeOwned + Default + 'static,
    {
        let flow_type = T::default().flow_type();
        let factory: FlowFactory = Box::new(|reference| {
            let mut flow = T::default();
            flow.flow_init(reference);
            Arc::new(flow)
        });
        insert_unique(&mut self.flows, "flow", flow_type, factory);
        self.register_intent_once::<T>()
    }

    pub fn instantiate_intent(&self, kind: &str, data: Value) -> Result<Arc<dyn Intent>, Error> {
        let factory = self.intents.get(kind).ok_or_else(|| Error::UnknownKind {
            registry: "intent",
            kind: kind.to_string(),
        })?;
        factory(data)
    }

    pub fn instantiate_public_intent(
        &self,
        kind: &str,
        data: Value,
    ) -> Result<Arc<dyn Intent>, Error> {
        let factory = self
            .public_intents
            .get(kind)
            .ok_or_else(|| Error::UnknownKind {
                registry: "public intent",
                kind: kind.to_string(),
            })?;
        factory(data)
    }

    pub fn instantiate_node(&self, kind: &str, data: Value) -> Result<Arc<dyn NodeSimple>, Error> {
        let factory = self.nodes.get(kind).ok_or_else(|| Error::UnknownKind {
            registry: "node",
            kind: kind.to_string(),
        })?;
        factory(data)
    }

    pub fn instantiate_input(&self, kind: &str, data: &Value) -> Result<Box<dyn Input>, Error> {
        let factory = self
            .public_inputs
            .get(kind)
            .ok_or_else(|| Error::UnknownKind {
                registry: "input",
                kind: kind.to_string(),
            })?;
        factory(data)
    }

    /// Instantiates an input from `{ "kind": ..., "data": ... }`.
    pub fn instantiate_input_envelope(&self, envelope: &Value) -> Result<Box<dyn Input>, Error> {
        let envelope = KindData::deserialize(envelope)?;
        self.instantiate_input(&envelope.kind, &envelope.data)
    }

    pub fn instantiate_flow(&self, reference: &FlowReference) -> Result<Arc<dyn Intent>, Error> {
        let factory = self
            .flows
            .get(&reference.flow_type)
            .ok_or(Error::UnknownFlow(reference.flow_type))?;
        Ok(factory(reference))
    }
}
