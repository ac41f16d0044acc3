//! JSON persistence of workflow trees.
//!
//! Serialization goes through `Serialize` on [`Workflow`] and [`Node`].
//! Deserialization needs a [`Registry`] to turn kind strings back into
//! intents and nodes, so it is exposed as functions here instead of a
//! `Deserialize` impl.

use crate::error::Error;
use crate::registry::Registry;
use crate::workflow::{Intent, Node, NodeType, Workflow};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;

/// `{ "kind": ..., "data": ... }`, the persisted form of a kind-keyed value.
#[derive(Serialize)]
struct Envelope<'a, T: ?Sized + Serialize> {
    kind: &'a str,
    data: &'a T,
}

/// Owned counterpart of the envelope, as read back from JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KindData {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct WorkflowJson {
    #[serde(default)]
    workflow_id: String,
    #[serde(default)]
    instance_id: String,
    intent: KindData,
    #[serde(default)]
    nodes: Vec<NodeJson>,
}

#[derive(Debug, Deserialize)]
struct NodeJson {
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default)]
    simple: Option<KindData>,
    #[serde(default)]
    workflow: Option<Box<WorkflowJson>>,
}

pub(crate) fn serialize_intent<S: Serializer>(
    intent: &Arc<dyn Intent>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    Envelope {
        kind: intent.kind(),
        data: intent.as_ref(),
    }
    .serialize(serializer)
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Node", 2)?;
        state.serialize_field("type", &self.node_type())?;
        match self {
            Node::Simple(simple) => {
                state.serialize_field(
                    "simple",
                    &Envelope {
                        kind: simple.kind(),
                        data: simple.as_ref(),
                    },
                )?;
            }
            Node::SubWorkflow(workflow) => {
                state.serialize_field("workflow", workflow.as_ref())?;
            }
        }
        state.end()
    }
}

pub fn marshal_workflow(workflow: &Workflow) -> Result<String, Error> {
    Ok(serde_json::to_string(workflow)?)
}

/// Rebuilds a workflow from its JSON text.
pub fn unmarshal_workflow(registry: &Registry, json: &str) -> Result<Workflow, Error> {
    let raw: WorkflowJson = serde_json::from_str(json)?;
    build_workflow(registry, raw)
}

/// Rebuilds a workflow from an already parsed JSON value.
pub fn workflow_from_value(registry: &Registry, value: Value) -> Result<Workflow, Error> {
    let raw: WorkflowJson = serde_json::from_value(value)?;
    build_workflow(registry, raw)
}

fn build_workflow(registry: &Registry, raw: WorkflowJson) -> Result<Workflow, Error> {
    let intent = registry.instantiate_intent(&raw.intent.kind, raw.intent.data)?;
    let nodes = raw
        .nodes
        .into_iter()
        .map(|node| build_node(registry, node))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Workflow {
        workflow_id: raw.workflow_id,
        instance_id: raw.instance_id,
        intent,
        nodes,
    })
}

fn build_node(registry: &Registry, raw: NodeJson) -> Result<Node, Error> {
    match raw.node_type {
        NodeType::Simple => {
            let simple = raw
                .simple
                .ok_or_else(|| Error::InvalidNode("SIMPLE node without simple".to_string()))?;
            let node = registry.instantiate_node(&simple.kind, simple.data)?;
            Ok(Node::Simple(node))
        }
        NodeType::SubWorkflow => {
            let workflow = raw.workflow.ok_or_else(|| {
                Error::InvalidNode("SUB_WORKFLOW node without workflow".to_string())
            })?;
            Ok(Node::SubWorkflow(Box::new(build_workflow(registry, *workflow)?)))
        }
    }
}
