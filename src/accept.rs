use crate::deps::Dependencies;
use crate::effect::apply_node_run_effects;
use crate::error::Error;
use crate::input::{Input, InputSchema};
use crate::service::DataOutputer;
use crate::workflow::{InputReactor, Intent, Node, NodeSimple, Reaction, Workflow, Workflows};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// The reactor found by [`find_input_reactor`].
#[derive(Clone, Copy)]
pub enum ReactorRef<'a> {
    /// The last simple node of the deepest workflow.
    Node(&'a dyn NodeSimple, &'a dyn InputReactor),
    /// The intent of some workflow on the path to the deepest one.
    Intent(&'a dyn Intent),
}

impl<'a> ReactorRef<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            ReactorRef::Node(node, _) => node.kind(),
            ReactorRef::Intent(intent) => intent.kind(),
        }
    }

    pub async fn react_to(
        &self,
        deps: &Dependencies,
        workflows: Workflows<'_>,
        input: Option<&dyn Input>,
    ) -> Result<Reaction, Error> {
        match self {
            ReactorRef::Node(_, reactor) => reactor.react_to(deps, workflows, input).await,
            ReactorRef::Intent(intent) => intent.react_to(deps, workflows, input).await,
        }
    }

    pub fn as_data_outputer(&self) -> Option<&'a dyn DataOutputer> {
        match *self {
            ReactorRef::Node(_, reactor) => reactor.as_data_outputer(),
            ReactorRef::Intent(intent) => intent.as_data_outputer(),
        }
    }
}

impl std::fmt::Debug for ReactorRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReactorRef").field(&self.kind()).finish()
    }
}

/// Where input should go next.
#[derive(Debug)]
pub struct InputReactorResult<'a> {
    /// `nearest` is the workflow that owns the reactor.
    pub workflows: Workflows<'a>,
    /// Node indices leading from the searched workflow to `workflows.nearest`.
    pub path: Vec<usize>,
    pub reactor: ReactorRef<'a>,
    /// `None` when the reactor can proceed without input.
    pub input_schema: Option<Box<dyn InputSchema>>,
    /// The innermost boundary enclosing the reactor.
    pub boundary: Option<String>,
}

/// Boundary of the node, or else of the deepest intent in `chain` that
/// declares one.
fn nearest_boundary(chain: &[(Vec<usize>, &Workflow)], node: Option<&dyn NodeSimple>) -> Option<String> {
    if let Some(boundary) = node.and_then(|n| n.as_boundary()) {
        return Some(boundary.boundary());
    }
    chain
        .iter()
        .rev()
        .find_map(|(_, level)| level.intent.as_boundary())
        .map(|b| b.boundary())
}

/// Finds the reactor that should receive the next input.
///
/// Descends along last nodes to the deepest workflow. If that workflow's
/// last node is a reactor it is asked first. Then the intents are asked
/// from the deepest workflow up to `workflows.nearest`. A reactor answering
/// [`Error::Eof`] passes the question to the next one; any other error is
/// returned. If every intent is finished the result is `Err(Error::Eof)`.
pub async fn find_input_reactor<'a>(
    deps: &Dependencies,
    workflows: Workflows<'a>,
) -> Result<InputReactorResult<'a>, Error> {
    let mut chain: Vec<(Vec<usize>, &'a Workflow)> = vec![(Vec::new(), workflows.nearest)];
    let mut last_simple: Option<&'a dyn NodeSimple> = None;
    loop {
        let (path, level) = match chain.last() {
            Some((path, level)) => (path, *level),
            None => break,
        };
        match level.nodes.last() {
            Some(Node::SubWorkflow(sub)) => {
                let mut sub_path = path.clone();
                sub_path.push(level.nodes.len() - 1);
                chain.push((sub_path, sub.as_ref()));
            }
            Some(Node::Simple(simple)) => {
                last_simple = Some(simple.as_ref());
                break;
            }
            None => break,
        }
    }

    if let (Some(node), Some((path, level))) = (last_simple, chain.last()) {
        if let Some(reactor) = node.as_reactor() {
            let level: &'a Workflow = *level;
            match reactor.can_react_to(deps, workflows.replace(level)).await {
                Ok(input_schema) => {
                    return Ok(InputReactorResult {
                        workflows: workflows.replace(level),
                        path: path.clone(),
                        reactor: ReactorRef::Node(node, reactor),
                        input_schema,
                        boundary: nearest_boundary(&chain, Some(node)),
                    })
                }
                Err(Error::Eof) => {}
                Err(error) => return Err(error),
            }
        }
    }

    for depth in (0..chain.len()).rev() {
        let (path, level) = &chain[depth];
        let level: &'a Workflow = *level;
        let intent = level.intent.as_ref();
        match intent.can_react_to(deps, workflows.replace(level)).await {
            Ok(input_schema) => {
                return Ok(InputReactorResult {
                    workflows: workflows.replace(level),
                    path: path.clone(),
                    reactor: ReactorRef::Intent(intent),
                    input_schema,
                    boundary: nearest_boundary(&chain[..=depth], None),
                })
            }
            Err(Error::Eof) => {}
            Err(error) => return Err(error),
        }
    }

    Err(Error::Eof)
}

#[derive(Clone, Copy)]
enum Source<'i> {
    Raw(Option<&'i Value>),
    Synthetic(&'i dyn Input),
}

/// Feeds raw JSON input into `workflow` until no reactor takes it further.
///
/// Each round finds the input reactor, parses `raw` with the schema it
/// declares and applies the reaction: `Append` appends the node, runs its
/// run effects and loops; `UpdateLast` replaces the last node and stops;
/// `SameNode` and `Incompatible` stop.
///
/// The work happens on a copy. The copy replaces `workflow`, with a new
/// instance ID, only if something changed and the loop ended with `Ok` or
/// [`Error::Eof`]. Any other error leaves `workflow` untouched.
///
/// Input never crosses a boundary: once a reactor inside one boundary has
/// taken the input, a reactor inside another boundary that asks for input
/// ends the loop instead of receiving it.
///
/// Returns [`Error::NoChange`] if nothing accepted the input, and
/// [`Error::Eof`] if the workflow has finished. A schema violation is
/// returned only if it happened before anything changed.
///
/// # Panics
///
/// If more than `max_accept_loops` reactors are resolved in one call, if a
/// reactor answers `UpdateLast` for a workflow without nodes, or if an
/// appended nested workflow's intent declares a run effect.
pub async fn accept(
    deps: &Arc<Dependencies>,
    workflow: &mut Workflow,
    raw: Option<&Value>,
) -> Result<(), Error> {
    accept_from(deps, workflow, Source::Raw(raw)).await
}

/// Like [`accept`], but every reactor is handed `input` as is.
pub async fn accept_synthetic_input(
    deps: &Arc<Dependencies>,
    workflow: &mut Workflow,
    input: &dyn Input,
) -> Result<(), Error> {
    accept_from(deps, workflow, Source::Synthetic(input)).await
}

async fn accept_from(
    deps: &Arc<Dependencies>,
    workflow: &mut Workflow,
    source: Source<'_>,
) -> Result<(), Error> {
    let mut working = workflow.clone();
    let mut changed = false;
    let result = accept_loop(deps, &mut working, source, &mut changed).await;

    match result {
        Ok(()) | Err(Error::Eof) => {
            if changed {
                working.instance_id = deps.ids.new_instance_id();
                debug!(instance_id = %working.instance_id, "workflow changed");
                *workflow = working;
            }
            match result {
                Ok(()) if !changed => Err(Error::NoChange),
                other => other,
            }
        }
        Err(error) => Err(error),
    }
}

#[allow(clippy::panic)]
async fn accept_loop(
    deps: &Arc<Dependencies>,
    working: &mut Workflow,
    source: Source<'_>,
    changed: &mut bool,
) -> Result<(), Error> {
    let mut loops = 0;
    let mut last_appended = "";
    // boundary of the reactor that last took the input
    let mut consumed_in: Option<Option<String>> = None;
    loop {
        loops += 1;
        if loops > deps.config.max_accept_loops {
            panic!("accept loop exceeded {loops} rounds; last appended node: {last_appended}");
        }

        let (path, reaction) = {
            let found = find_input_reactor(deps, Workflows::new(working)).await?;
            debug!(reactor = found.reactor.kind(), "found input reactor");

            if found.input_schema.is_some() {
                if let Some(consumed_in) = &consumed_in {
                    if *consumed_in != found.boundary {
                        debug!(boundary = ?found.boundary, "input does not cross boundary");
                        return Ok(());
                    }
                }
                consumed_in = Some(found.boundary.clone());
            }

            let parsed: Option<Box<dyn Input>>;
            let input: Option<&dyn Input> = match source {
                Source::Synthetic(input) => Some(input),
                Source::Raw(raw) => match (&found.input_schema, raw) {
                    (Some(schema), Some(raw)) => match schema.make_input(raw) {
                        Ok(made) => {
                            parsed = Some(made);
                            parsed.as_deref()
                        }
                        Err(error @ Error::InvalidInput { .. }) => {
                            debug!(%error, "input rejected by schema");
                            return if *changed { Ok(()) } else { Err(error) };
                        }
                        Err(error) => return Err(error),
                    },
                    _ => None,
                },
            };

            let reaction = found.reactor.react_to(deps, found.workflows, input).await?;
            (found.path, reaction)
        };

        match reaction {
            Reaction::Incompatible => return Ok(()),
            Reaction::SameNode => {
                *changed = true;
                return Ok(());
            }
            Reaction::UpdateLast(node) => {
                let Some(level) = working.level_mut(&path) else {
                    unreachable!("input reactor path left the tree");
                };
                let Some(last) = level.nodes.last_mut() else {
                    panic!(
                        "{} answered UpdateLast for a workflow without nodes",
                        level.intent.kind()
                    );
                };
                *last = node;
                *changed = true;
                return Ok(());
            }
            Reaction::Append(node) => {
                last_appended = node.kind();
                debug!(node = last_appended, "appending node");
                append_node(deps, working, &path, node).await?;
                *changed = true;
            }
        }
    }
}

async fn append_node(
    deps: &Arc<Dependencies>,
    root: &mut Workflow,
    path: &[usize],
    node: Node,
) -> Result<(), Error> {
    let Some(level) = root.level_mut(path) else {
        unreachable!("input reactor path left the tree");
    };
    level.nodes.push(node);

    let root: &Workflow = root;
    let Some(level) = root.level(path) else {
        unreachable!("input reactor path left the tree");
    };
    let Some(appended) = level.nodes.last() else {
        unreachable!("node was just appended");
    };
    apply_node_run_effects(deps, Workflows::new(root), level, appended).await
}
