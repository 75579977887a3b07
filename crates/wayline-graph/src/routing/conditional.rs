use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use wayline_core::error::Result;
use wayline_core::traits::Agent;
use wayline_core::types::{AgentOutcome, Route, WorkflowState};

type RouteFn = dyn Fn(&WorkflowState) -> Option<String> + Send + Sync;

/// Centralized routing: one pure function decides where every wrapped agent
/// goes next.
///
/// The function sees the state the agent produced and returns an agent name,
/// the human-pause sentinel, or `None` to end the workflow. Its answer
/// overrides whatever the agent set itself, except when the agent requested
/// approval: a pending approval keeps the human pause.
#[derive(Clone)]
pub struct ConditionalRouter {
    route: Arc<RouteFn>,
}

impl ConditionalRouter {
    pub fn new(route: impl Fn(&WorkflowState) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            route: Arc::new(route),
        }
    }

    /// Evaluate the routing function against a state.
    pub fn next_agent(&self, state: &WorkflowState) -> Route {
        (self.route)(state).into()
    }

    pub fn wrap(&self, agent: impl Agent) -> Routed {
        self.wrap_shared(Arc::new(agent))
    }

    pub fn wrap_shared(&self, agent: Arc<dyn Agent>) -> Routed {
        Routed {
            inner: agent,
            router: self.clone(),
        }
    }

    /// Wrap a whole agent set, keeping the names.
    pub fn wrap_all(
        &self,
        agents: impl IntoIterator<Item = (String, Arc<dyn Agent>)>,
    ) -> Vec<(String, Arc<dyn Agent>)> {
        agents
            .into_iter()
            .map(|(name, agent)| {
                let routed: Arc<dyn Agent> = Arc::new(self.wrap_shared(agent));
                (name, routed)
            })
            .collect()
    }
}

/// An agent whose route is decided by a [`ConditionalRouter`].
pub struct Routed {
    inner: Arc<dyn Agent>,
    router: ConditionalRouter,
}

impl Agent for Routed {
    fn run(&self, state: WorkflowState) -> BoxFuture<'_, Result<AgentOutcome>> {
        Box::pin(async move {
            let prior = state.clone();
            let mut next = self.inner.run(state).await?.into_state(prior);

            if next.is_waiting_for_approval() {
                debug!("Approval pending, keeping human pause");
                return Ok(AgentOutcome::Updated(next));
            }

            let route = self.router.next_agent(&next);
            debug!(next = %route, "Conditional route applied");
            next.set_next_agent(route);
            Ok(AgentOutcome::Updated(next))
        })
    }
}
