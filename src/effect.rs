use crate::deps::Dependencies;
use crate::error::Error;
use crate::traverse::{traverse_node, traverse_workflow, Visitor};
use crate::workflow::{Intent, Node, NodeSimple, Workflow, Workflows};
use cookie::Cookie;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

pub type EffectFuture = BoxFuture<'static, Result<(), Error>>;
pub type EffectFn = Box<dyn Fn(Arc<Dependencies>) -> EffectFuture + Send + Sync>;

/// A side effect declared by an intent or a node.
///
/// Run effects of a node execute when the node is appended and again
/// before every later input is fed, so they must be idempotent. On-commit
/// effects execute once, when the workflow finishes. Intents may only
/// declare on-commit effects.
pub enum Effect {
    Run(EffectFn),
    OnCommit(EffectFn),
}

impl Effect {
    pub fn run<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<Dependencies>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Effect::Run(Box::new(move |deps| Box::pin(f(deps))))
    }

    pub fn on_commit<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<Dependencies>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Effect::OnCommit(Box::new(move |deps| Box::pin(f(deps))))
    }

    pub fn is_run(&self) -> bool {
        matches!(self, Effect::Run(_))
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Run(_) => f.write_str("Effect::Run"),
            Effect::OnCommit(_) => f.write_str("Effect::OnCommit"),
        }
    }
}

pub trait EffectGetter: Send + Sync {
    fn get_effects(&self, deps: &Dependencies, workflows: Workflows<'_>) -> Result<Vec<Effect>, Error>;
}

pub trait CookieGetter: Send + Sync {
    fn get_cookies(
        &self,
        deps: &Dependencies,
        workflows: Workflows<'_>,
    ) -> Result<Vec<Cookie<'static>>, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Run,
    OnCommit,
}

struct EffectCollector<'w, 'd> {
    deps: &'d Dependencies,
    workflows: Workflows<'w>,
    phase: Phase,
    effects: Vec<EffectFn>,
}

impl<'w, 'd> EffectCollector<'w, 'd> {
    fn new(deps: &'d Dependencies, workflows: Workflows<'w>, phase: Phase) -> Self {
        Self {
            deps,
            workflows,
            phase,
            effects: Vec::new(),
        }
    }
}

impl<'w, 'd> Visitor<'w> for EffectCollector<'w, 'd> {
    fn visit_node_simple(&mut self, node: &'w dyn NodeSimple, workflow: &'w Workflow) -> Result<(), Error> {
        let Some(getter) = node.as_effect_getter() else {
            return Ok(());
        };
        for effect in getter.get_effects(self.deps, self.workflows.replace(workflow))? {
            match (self.phase, effect) {
                (Phase::Run, Effect::Run(f)) | (Phase::OnCommit, Effect::OnCommit(f)) => {
                    self.effects.push(f)
                }
                _ => {}
            }
        }
        Ok(())
    }

    #[allow(clippy::panic)]
    fn visit_intent(&mut self, intent: &'w dyn Intent, workflow: &'w Workflow) -> Result<(), Error> {
        let Some(getter) = intent.as_effect_getter() else {
            return Ok(());
        };
        for effect in getter.get_effects(self.deps, self.workflows.replace(workflow))? {
            match effect {
                Effect::Run(_) => panic!("intent {} declared a run effect", intent.kind()),
                Effect::OnCommit(f) if self.phase == Phase::OnCommit => self.effects.push(f),
                Effect::OnCommit(_) => {}
            }
        }
        Ok(())
    }
}

async fn execute(deps: &Arc<Dependencies>, effects: Vec<EffectFn>) -> Result<(), Error> {
    for effect in effects {
        if let Err(error) = effect(Arc::clone(deps)).await {
            warn!(%error, "effect failed");
            return Err(error);
        }
    }
    Ok(())
}

fn collect(
    deps: &Dependencies,
    workflows: Workflows<'_>,
    phase: Phase,
) -> Result<Vec<EffectFn>, Error> {
    let mut collector = EffectCollector::new(deps, workflows, phase);
    traverse_workflow(&mut collector, workflows.nearest)?;
    Ok(collector.effects)
}

/// Re-runs the run effects of every node under `workflows.nearest`, in
/// traversal order. Executed before feeding input to a restored workflow so
/// that per-request state is re-established.
pub async fn apply_run_effects(deps: &Arc<Dependencies>, workflows: Workflows<'_>) -> Result<(), Error> {
    let effects = collect(deps, workflows, Phase::Run)?;
    debug!(count = effects.len(), "applying run effects");
    execute(deps, effects).await
}

/// Runs every run effect, then every on-commit effect. Called once when
/// the workflow finishes.
pub async fn apply_all_effects(deps: &Arc<Dependencies>, workflows: Workflows<'_>) -> Result<(), Error> {
    apply_run_effects(deps, workflows).await?;
    let effects = collect(deps, workflows, Phase::OnCommit)?;
    debug!(count = effects.len(), "applying on-commit effects");
    execute(deps, effects).await
}

/// Runs the run effects of a node that was just appended to `workflow`.
pub(crate) async fn apply_node_run_effects(
    deps: &Arc<Dependencies>,
    workflows: Workflows<'_>,
    workflow: &Workflow,
    node: &Node,
) -> Result<(), Error> {
    let effects = {
        let mut collector = EffectCollector::new(deps, workflows, Phase::Run);
        traverse_node(&mut collector, workflow, node)?;
        collector.effects
    };
    execute(deps, effects).await
}

struct CookieCollector<'w, 'd> {
    deps: &'d Dependencies,
    workflows: Workflows<'w>,
    cookies: Vec<Cookie<'static>>,
}

impl<'w, 'd> Visitor<'w> for CookieCollector<'w, 'd> {
    fn visit_node_simple(&mut self, node: &'w dyn NodeSimple, workflow: &'w Workflow) -> Result<(), Error> {
        if let Some(getter) = node.as_cookie_getter() {
            let cookies = getter.get_cookies(self.deps, self.workflows.replace(workflow))?;
            self.cookies.extend(cookies);
        }
        Ok(())
    }

    fn visit_intent(&mut self, intent: &'w dyn Intent, workflow: &'w Workflow) -> Result<(), Error> {
        if let Some(getter) = intent.as_cookie_getter() {
            let cookies = getter.get_cookies(self.deps, self.workflows.replace(workflow))?;
            self.cookies.extend(cookies);
        }
        Ok(())
    }
}

/// Every cookie declared under `workflows.nearest`, in traversal order.
pub fn collect_cookies(deps: &Dependencies, workflows: Workflows<'_>) -> Result<Vec<Cookie<'static>>, Error> {
    let mut collector = CookieCollector {
        deps,
        workflows,
        cookies: Vec::new(),
    };
    traverse_workflow(&mut collector, workflows.nearest)?;
    Ok(collector.cookies)
}
