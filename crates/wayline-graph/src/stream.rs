//! Step-by-step execution as a pull-driven event stream.
//!
//! The stream runs on the caller's task: nothing happens between polls, so
//! dropping the stream (or simply not polling it) stops the workflow at the
//! last yielded event. An agent is only invoked once the caller asks for the
//! event after its `agent_start`.

use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::info;

use wayline_core::error::{Result, WaylineError};
use wayline_core::event::StreamEvent;
use wayline_core::types::{Route, WorkflowState};

use crate::executor::{Cursor, GraphExecutor, InvokeOptions, Step};

enum Phase {
    /// First poll: nothing has run yet.
    Start,
    /// Pick the next agent or stop.
    Select,
    /// Call the agent announced by the last `agent_start`.
    Invoke(String),
    Done,
}

struct StreamRun<'a> {
    executor: &'a GraphExecutor,
    cursor: Cursor,
    options: InvokeOptions,
    timeout: Duration,
    phase: Phase,
    queue: VecDeque<Result<StreamEvent>>,
}

impl StreamRun<'_> {
    fn emit(&mut self, event: StreamEvent) {
        self.executor.publish(event.clone());
        self.queue.push_back(Ok(event));
    }

    /// Report the error as an event, then surface it and end the stream.
    fn fail(&mut self, agent: &str, error: WaylineError) {
        self.emit(StreamEvent::error(Some(agent), &error));
        self.queue.push_back(Err(error));
        self.phase = Phase::Done;
    }

    async fn advance(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Done => {}
            Phase::Start => {
                info!(
                    start = %self.cursor.current,
                    thread_id = self.options.thread_id.as_deref().unwrap_or("-"),
                    "Starting workflow stream"
                );
                self.phase = Phase::Select;
            }
            Phase::Select => match self.executor.next_step(&mut self.cursor, &self.options) {
                Step::Invoke(agent) => {
                    self.emit(StreamEvent::agent_start(&agent));
                    self.phase = Phase::Invoke(agent);
                }
                Step::Stop(termination) => {
                    info!(
                        iterations = self.cursor.iterations,
                        termination = ?termination,
                        "Workflow stream finished"
                    );
                    let event = StreamEvent::complete(self.cursor.state.clone());
                    self.emit(event);
                }
            },
            Phase::Invoke(agent) => {
                let before = self.cursor.state.messages().len();
                if let Err(e) = self
                    .executor
                    .invoke_agent(&agent, &mut self.cursor.state, self.timeout)
                    .await
                {
                    self.fail(&agent, e);
                    return;
                }

                let appended: Vec<_> = self
                    .cursor
                    .state
                    .messages()
                    .iter()
                    .skip(before)
                    .cloned()
                    .collect();
                for message in appended {
                    self.emit(StreamEvent::message(&agent, message));
                }

                if let Err(e) = self.executor.finish_step(&mut self.cursor, &self.options) {
                    self.fail(&agent, e);
                    return;
                }
                let event = StreamEvent::agent_complete(&self.cursor.current);
                self.emit(event);
                self.phase = Phase::Select;
            }
        }
    }
}

impl GraphExecutor {
    /// Execute like [`invoke`](Self::invoke), yielding lifecycle events.
    ///
    /// Per step: `agent_start`, one `message` per appended message, then
    /// `agent_complete` naming the next agent. A normal exit ends with
    /// `complete`, which carries the final state. On failure the stream
    /// yields an `error` event followed by the `Err` itself, then ends.
    pub fn stream<'a>(
        &'a self,
        initial: &WorkflowState,
        start_agent: &str,
        options: InvokeOptions,
    ) -> BoxStream<'a, Result<StreamEvent>> {
        let run = StreamRun {
            executor: self,
            cursor: Cursor {
                state: initial.clone(),
                current: Route::from(start_agent),
                iterations: 0,
            },
            timeout: self.timeout_for(&options),
            options,
            phase: Phase::Start,
            queue: VecDeque::new(),
        };

        stream::unfold(run, |mut run| async move {
            loop {
                if let Some(item) = run.queue.pop_front() {
                    return Some((item, run));
                }
                if matches!(run.phase, Phase::Done) {
                    return None;
                }
                run.advance().await;
            }
        })
        .boxed()
    }
}
