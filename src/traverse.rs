use crate::error::Error;
use crate::input::AsAny;
use crate::workflow::{Intent, Node, NodeSimple, Workflow};

/// Marker for intents or nodes that record that something happened, e.g.
/// "the login ID was verified". Looked up by concrete type with
/// [`find_milestone`].
pub trait Milestone: AsAny + Send + Sync {}

/// Marks an intent or node that delimits a part of the tree.
pub trait Boundary: Send + Sync {
    fn boundary(&self) -> String;
}

/// Callbacks for a postorder walk.
///
/// For each workflow, every node is visited in order (recursing into nested
/// workflows) and then the workflow's intent. The `workflow` argument is the
/// workflow that directly contains the visited node or intent.
pub trait Visitor<'w> {
    fn visit_node_simple(
        &mut self,
        _node: &'w dyn NodeSimple,
        _workflow: &'w Workflow,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn visit_intent(&mut self, _intent: &'w dyn Intent, _workflow: &'w Workflow) -> Result<(), Error> {
        Ok(())
    }
}

/// Walks `workflow` in postorder. The first error aborts the walk.
pub fn traverse_workflow<'w, V>(visitor: &mut V, workflow: &'w Workflow) -> Result<(), Error>
where
    V: Visitor<'w> + ?Sized,
{
    for node in &workflow.nodes {
        traverse_node(visitor, workflow, node)?;
    }
    visitor.visit_intent(workflow.intent.as_ref(), workflow)
}

/// Walks one node of `workflow`.
pub fn traverse_node<'w, V>(visitor: &mut V, workflow: &'w Workflow, node: &'w Node) -> Result<(), Error>
where
    V: Visitor<'w> + ?Sized,
{
    match node {
        Node::Simple(simple) => visitor.visit_node_simple(simple.as_ref(), workflow),
        Node::SubWorkflow(sub) => traverse_workflow(visitor, sub),
    }
}

struct MilestoneFinder<'w, T> {
    found: Option<&'w T>,
}

impl<'w, T: Milestone> MilestoneFinder<'w, T> {
    fn offer(&mut self, milestone: Option<&'w dyn Milestone>) {
        if let Some(found) = milestone.and_then(|m| m.as_any().downcast_ref::<T>()) {
            self.found = Some(found);
        }
    }
}

impl<'w, T: Milestone> Visitor<'w> for MilestoneFinder<'w, T> {
    fn visit_node_simple(&mut self, node: &'w dyn NodeSimple, _workflow: &'w Workflow) -> Result<(), Error> {
        self.offer(node.as_milestone());
        Ok(())
    }

    fn visit_intent(&mut self, intent: &'w dyn Intent, _workflow: &'w Workflow) -> Result<(), Error> {
        self.offer(intent.as_milestone());
        Ok(())
    }
}

/// The last milestone of type `T` in traversal order.
pub fn find_milestone<T: Milestone>(workflow: &Workflow) -> Option<&T> {
    let mut finder = MilestoneFinder { found: None };
    // the finder never fails
    let _ = traverse_workflow(&mut finder, workflow);
    finder.found
}

struct BoundaryCollector {
    boundaries: Vec<String>,
}

impl<'w> Visitor<'w> for BoundaryCollector {
    fn visit_node_simple(&mut self, node: &'w dyn NodeSimple, _workflow: &'w Workflow) -> Result<(), Error> {
        if let Some(boundary) = node.as_boundary() {
            self.boundaries.push(boundary.boundary());
        }
        Ok(())
    }

    fn visit_intent(&mut self, intent: &'w dyn Intent, _workflow: &'w Workflow) -> Result<(), Error> {
        if let Some(boundary) = intent.as_boundary() {
            self.boundaries.push(boundary.boundary());
        }
        Ok(())
    }
}

/// Every boundary in traversal order.
pub fn collect_boundaries(workflow: &Workflow) -> Vec<String> {
    let mut collector = BoundaryCollector {
        boundaries: Vec::new(),
    };
    let _ = traverse_workflow(&mut collector, workflow);
    collector.boundaries
}
