use crate::deps::Dependencies;
use crate::effect::{CookieGetter, EffectGetter};
use crate::error::Error;
use crate::input::{Input, InputSchema};
use crate::marshal;
use crate::service::DataOutputer;
use crate::traverse::{Boundary, Milestone};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How an input reactor responded to an input.
#[derive(Debug)]
pub enum Reaction {
    /// Append the node to the reactor's workflow and keep feeding.
    Append(Node),
    /// Replace the last node of the reactor's workflow and stop.
    UpdateLast(Node),
    /// The input was consumed but the tree stays as it is. Stops.
    SameNode,
    /// The input is not for this reactor. Stops.
    Incompatible,
}

/// Anything that can be asked what input it wants and then be fed it.
///
/// `can_react_to` returns `Err(Error::Eof)` when the reactor is finished,
/// `Ok(None)` when it can proceed without input, and `Ok(Some(schema))` when
/// it needs input of that shape. `react_to` receives the input parsed with
/// that schema, or `None` when the caller supplied nothing.
#[async_trait]
pub trait InputReactor: Send + Sync {
    async fn can_react_to(
        &self,
        deps: &Dependencies,
        workflows: Workflows<'_>,
    ) -> Result<Option<Box<dyn InputSchema>>, Error>;

    async fn react_to(
        &self,
        deps: &Dependencies,
        workflows: Workflows<'_>,
        input: Option<&dyn Input>,
    ) -> Result<Reaction, Error>;

    /// Extra data shown to the client while this reactor waits for input.
    fn as_data_outputer(&self) -> Option<&dyn DataOutputer> {
        None
    }
}

/// The goal of a workflow. Every workflow, nested or not, has exactly one.
///
/// An intent is always an input reactor. The `as_*` methods expose the
/// optional capabilities; override the ones the intent has.
pub trait Intent: InputReactor + erased_serde::Serialize + fmt::Debug {
    /// Registry key. Must be unique among intents.
    fn kind(&self) -> &'static str;

    fn as_effect_getter(&self) -> Option<&dyn EffectGetter> {
        None
    }

    fn as_cookie_getter(&self) -> Option<&dyn CookieGetter> {
        None
    }

    fn as_milestone(&self) -> Option<&dyn Milestone> {
        None
    }

    fn as_boundary(&self) -> Option<&dyn Boundary> {
        None
    }
}

/// A recorded step of a workflow.
pub trait NodeSimple: erased_serde::Serialize + fmt::Debug + Send + Sync {
    /// Registry key. Must be unique among nodes.
    fn kind(&self) -> &'static str;

    /// Only the last node of a workflow is ever asked to react.
    fn as_reactor(&self) -> Option<&dyn InputReactor> {
        None
    }

    fn as_effect_getter(&self) -> Option<&dyn EffectGetter> {
        None
    }

    fn as_cookie_getter(&self) -> Option<&dyn CookieGetter> {
        None
    }

    fn as_milestone(&self) -> Option<&dyn Milestone> {
        None
    }

    fn as_boundary(&self) -> Option<&dyn Boundary> {
        None
    }
}

erased_serde::serialize_trait_object!(Intent);
erased_serde::serialize_trait_object!(NodeSimple);

/// Discriminant of a persisted [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Simple,
    SubWorkflow,
}

#[derive(Debug, Clone)]
pub enum Node {
    Simple(Arc<dyn NodeSimple>),
    SubWorkflow(Box<Workflow>),
}

impl Node {
    pub fn simple(node: impl NodeSimple + 'static) -> Self {
        Node::Simple(Arc::new(node))
    }

    /// A nested workflow pursuing `intent`. Nested workflows carry no IDs.
    pub fn sub_workflow(intent: impl Intent + 'static) -> Self {
        Node::SubWorkflow(Box::new(Workflow::new(
            String::new(),
            String::new(),
            Arc::new(intent),
        )))
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Simple(_) => NodeType::Simple,
            Node::SubWorkflow(_) => NodeType::SubWorkflow,
        }
    }

    /// Kind of the simple node, or of the nested workflow's intent.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Simple(simple) => simple.kind(),
            Node::SubWorkflow(workflow) => workflow.intent.kind(),
        }
    }
}

/// A tree of recorded steps working towards one intent.
///
/// `workflow_id` is stable for the lifetime of a flow. `instance_id` names
/// one immutable snapshot and changes every time input is accepted. Both
/// are empty on nested workflows.
#[derive(Debug, Clone, Serialize)]
pub struct Workflow {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub workflow_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instance_id: String,
    #[serde(serialize_with = "marshal::serialize_intent")]
    pub intent: Arc<dyn Intent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
}

impl Workflow {
    pub fn new(workflow_id: String, instance_id: String, intent: Arc<dyn Intent>) -> Self {
        Self {
            workflow_id,
            instance_id,
            intent,
            nodes: Vec::new(),
        }
    }

    /// The nested workflow reached by following `path`, one node index per
    /// level. An empty path is `self`.
    pub(crate) fn level(&self, path: &[usize]) -> Option<&Workflow> {
        let mut level = self;
        for &index in path {
            match level.nodes.get(index) {
                Some(Node::SubWorkflow(sub)) => level = sub,
                _ => return None,
            }
        }
        Some(level)
    }

    pub(crate) fn level_mut(&mut self, path: &[usize]) -> Option<&mut Workflow> {
        let mut level = self;
        for &index in path {
            match level.nodes.get_mut(index) {
                Some(Node::SubWorkflow(sub)) => level = sub,
                _ => return None,
            }
        }
        Some(level)
    }
}

/// Copies the tree without its instance ID. Intents and simple nodes are
/// shared, nested workflows are copied.
pub fn clone_workflow(workflow: &Workflow) -> Workflow {
    let mut cloned = workflow.clone();
    cloned.instance_id.clear();
    cloned
}

pub fn clone_node(node: &Node) -> Node {
    match node {
        Node::Simple(simple) => Node::Simple(Arc::clone(simple)),
        Node::SubWorkflow(workflow) => Node::SubWorkflow(Box::new(clone_workflow(workflow))),
    }
}

/// Cursor handed to reactors and capability methods: the root of the tree
/// and the workflow nearest to the callee.
#[derive(Debug, Clone, Copy)]
pub struct Workflows<'a> {
    pub root: &'a Workflow,
    pub nearest: &'a Workflow,
}

impl<'a> Workflows<'a> {
    pub fn new(root: &'a Workflow) -> Self {
        Self {
            root,
            nearest: root,
        }
    }

    /// Same root, different nearest.
    pub fn replace(self, nearest: &'a Workflow) -> Self {
        Self {
            root: self.root,
            nearest,
        }
    }
}
