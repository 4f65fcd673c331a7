//! Streaming tool-call loop.
//!
//! One generation is a sequence of provider turns driven by an explicit
//! state machine inside [`futures::stream::unfold`]:
//!
//! ```text
//!   StartTurn ──▶ Streaming ──▶ (tool calls?) ──▶ ExecutingTools ──▶ StartTurn
//!                     │                 no
//!                     └────────────▶ Done { cost }
//! ```
//!
//! Each follow-up turn re-enters `StartTurn` instead of recursing, so
//! stack depth stays constant however many turns a generation takes.
//!
//! Two context modes exist. **Chained** (the request named a
//! `previous_response_id`) sends only the trailing user message, then
//! only tool outputs, each time continuing from the previous turn's
//! response id. **Rebuilt** (the default) regenerates the full context
//! every turn, appending an assistant message carrying the turn's tool
//! calls and results.

use std::panic::AssertUnwindSafe;

use futures::{FutureExt, StreamExt};
use serde_json::{Map, Value};

use super::{GenerationRequest, GenerationService, UserData};
use crate::context::{ContextItem, generate_context, trailing_user_item};
use crate::cost;
use crate::error::GenerationError;
use crate::message::{FunctionCall, Message, ToolCall};
use crate::provider::{Capability, ReasoningEffort, ResponseRequest, ToolDefinition};
use crate::stream::{EventStream, FunctionCallItem, ProviderEvent, ProviderStream, StreamEvent};
use crate::tool::{ExecutableToolRegistry, ToolError};
use crate::usage::{Credits, Usage};
use crate::world::World;

pub(super) fn generation_stream(
    service: GenerationService,
    request: GenerationRequest,
) -> EventStream {
    if let Err(err) = request.validate() {
        return Box::pin(futures::stream::once(async move { Err(err) }));
    }

    let stream = futures::stream::unfold(LoopState::new(service, request), |mut state| async move {
        loop {
            match std::mem::replace(&mut state.phase, Phase::Done) {
                Phase::Done => return None,
                Phase::StartTurn => match phase_start_turn(&mut state).await {
                    PhaseResult::Yield(event, next) => {
                        state.phase = next;
                        return Some((event, state));
                    }
                    PhaseResult::Continue(next) => state.phase = next,
                },
                Phase::Streaming(stream) => match phase_streaming(&mut state, stream).await {
                    PhaseResult::Yield(event, next) => {
                        state.phase = next;
                        return Some((event, state));
                    }
                    PhaseResult::Continue(next) => state.phase = next,
                },
                Phase::ExecutingTools => {
                    state.phase = phase_executing_tools(&mut state).await;
                }
            }
        }
    });
    Box::pin(stream)
}

enum PhaseResult {
    Yield(Result<StreamEvent, GenerationError>, Phase),
    Continue(Phase),
}

enum Phase {
    StartTurn,
    Streaming(ProviderStream),
    ExecutingTools,
    /// Terminal: unfold returns `None` on the next poll.
    Done,
}

/// A function call captured during a turn, consumed once its result is
/// folded into the next turn's input.
struct PendingToolCall {
    call_id: String,
    name: String,
    arguments: Value,
    raw_arguments: String,
}

impl PendingToolCall {
    fn parse(item: FunctionCallItem) -> Self {
        let arguments = match serde_json::from_str::<Value>(&item.arguments) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    tool = %item.name,
                    call_id = %item.call_id,
                    error = %e,
                    "unparseable tool arguments, calling with an empty object"
                );
                Value::Object(Map::new())
            }
        };
        Self {
            call_id: item.call_id,
            name: item.name,
            arguments,
            raw_arguments: item.arguments,
        }
    }
}

struct LoopState {
    service: GenerationService,
    model: String,
    reasoning: Option<ReasoningEffort>,
    tools: Vec<ToolDefinition>,
    parallel_tool_calls: Option<bool>,
    user_data: UserData,
    max_tokens: Option<u64>,
    max_credits: Option<Credits>,
    world: World,
    chained: bool,
    /// Working copy of the caller's history, extended in rebuilt mode.
    history: Vec<Message>,
    previous_response_id: Option<String>,
    /// Next turn's input in chained mode.
    tool_outputs: Vec<ContextItem>,
    response_id: Option<String>,
    text: String,
    pending: Vec<PendingToolCall>,
    total_cost: Credits,
    total_usage: Usage,
    turn: u32,
    phase: Phase,
}

impl LoopState {
    fn new(service: GenerationService, request: GenerationRequest) -> Self {
        let model = service.get_model(request.model.as_deref());
        let reasoning = request.reasoning_effort.filter(|_| {
            service.provider.metadata().supports(Capability::Reasoning)
                && service
                    .catalog
                    .get(&model)
                    .is_some_and(|info| info.supports_reasoning)
        });
        let world = request.world.unwrap_or_else(|| service.world.clone());
        Self {
            model,
            reasoning,
            tools: request.tools,
            parallel_tool_calls: request.parallel_tool_calls,
            user_data: request.user_data,
            max_tokens: request.max_tokens,
            max_credits: request.max_credits,
            world,
            chained: request.previous_response_id.is_some(),
            history: request.input,
            previous_response_id: request.previous_response_id,
            tool_outputs: Vec::new(),
            response_id: None,
            text: String::new(),
            pending: Vec::new(),
            total_cost: Credits::ZERO,
            total_usage: Usage::default(),
            turn: 0,
            phase: Phase::StartTurn,
            service,
        }
    }

    fn next_input(&mut self) -> Vec<ContextItem> {
        if !self.chained {
            return generate_context(&self.history, &self.world);
        }
        if self.turn == 1 {
            trailing_user_item(&self.history).into_iter().collect()
        } else {
            std::mem::take(&mut self.tool_outputs)
        }
    }

    /// Output-token limit for a turn over `input`.
    ///
    /// With a credit ceiling, the budget is what previous turns left over.
    /// A budget that cannot pay for the input plus one output token fails
    /// the turn before the provider is called.
    ///
    /// The restrained limit is zero as well once the input reaches the
    /// model's output limit. That is not a budget failure: the turn falls
    /// back to what the budget alone affords and the provider enforces
    /// its own context window.
    fn output_limit(&self, input: &[ContextItem]) -> Result<Option<u64>, GenerationError> {
        let Some(max_credits) = self.max_credits else {
            return Ok(self.max_tokens);
        };
        let remaining = max_credits
            .checked_sub(self.total_cost)
            .unwrap_or(Credits::ZERO);
        let input_tokens = self.service.estimate_context_tokens(&self.model, input);

        let budget_only =
            cost::budget_output_tokens(&self.service.catalog, remaining, &self.model, input_tokens)?;
        let Some(budget_only) = budget_only.filter(|&tokens| tokens > 0) else {
            return Err(GenerationError::InvalidRequest(format!(
                "credit budget exhausted: {remaining} left for ~{input_tokens} input tokens on {}",
                self.model
            )));
        };

        let restrained =
            self.service
                .max_output_tokens_restrained(remaining, &self.model, input_tokens)?;
        let affordable = if restrained > 0 {
            restrained
        } else {
            tracing::debug!(
                model = %self.model,
                input_tokens,
                "input exceeds the model's output limit, using the budget-only limit"
            );
            budget_only
        };
        Ok(Some(self.max_tokens.map_or(affordable, |t| t.min(affordable))))
    }
}

async fn phase_start_turn(state: &mut LoopState) -> PhaseResult {
    state.turn += 1;
    let input = state.next_input();

    let max_output_tokens = match state.output_limit(&input) {
        Ok(limit) => limit,
        Err(e) => return PhaseResult::Yield(Err(e), Phase::Done),
    };

    let request = ResponseRequest {
        model: state.model.clone(),
        reasoning: state.reasoning,
        max_output_tokens,
        input,
        tools: state.tools.clone(),
        parallel_tool_calls: state.parallel_tool_calls,
        previous_response_id: state.previous_response_id.clone(),
        user: state.user_data.id.clone(),
        metadata: state.user_data.metadata.clone(),
    };

    tracing::debug!(
        turn = state.turn,
        model = %request.model,
        items = request.input.len(),
        chained = state.chained,
        "opening provider stream"
    );

    match state.service.provider.stream_boxed(&request).await {
        Ok(stream) => {
            state.text.clear();
            state.response_id = None;
            PhaseResult::Continue(Phase::Streaming(stream))
        }
        Err(e) => {
            state.service.report_failure(&e);
            PhaseResult::Yield(Err(e), Phase::Done)
        }
    }
}

async fn phase_streaming(state: &mut LoopState, mut stream: ProviderStream) -> PhaseResult {
    let event = match stream.next().await {
        Some(Ok(event)) => event,
        Some(Err(e)) => {
            state.service.report_failure(&e);
            return PhaseResult::Yield(Err(e), Phase::Done);
        }
        None => return finish_turn(state),
    };

    match event {
        ProviderEvent::Created { response_id } => {
            state.response_id = Some(response_id);
            PhaseResult::Continue(Phase::Streaming(stream))
        }
        ProviderEvent::TextDelta(delta) => {
            state.text.push_str(&delta);
            PhaseResult::Yield(Ok(StreamEvent::Text { content: delta }), Phase::Streaming(stream))
        }
        ProviderEvent::FunctionCall(item) => {
            state.pending.push(PendingToolCall::parse(item));
            PhaseResult::Continue(Phase::Streaming(stream))
        }
        ProviderEvent::Completed { usage } => {
            match state.service.response_cost(&state.model, &usage) {
                Ok(cost) => {
                    state.total_cost += cost;
                    state.total_usage += &usage;
                    PhaseResult::Continue(Phase::Streaming(stream))
                }
                Err(e) => PhaseResult::Yield(Err(e), Phase::Done),
            }
        }
        ProviderEvent::Error { message } => {
            let err = GenerationError::Stream(message);
            state.service.report_failure(&err);
            PhaseResult::Yield(Err(err), Phase::Done)
        }
    }
}

/// The provider stream ended: run tools, or finish the generation.
fn finish_turn(state: &mut LoopState) -> PhaseResult {
    state.service.report_success();
    if !state.pending.is_empty() {
        return PhaseResult::Continue(Phase::ExecutingTools);
    }
    tracing::debug!(
        turns = state.turn,
        input_tokens = state.total_usage.input_tokens,
        output_tokens = state.total_usage.output_tokens,
        cost = state.total_cost.get(),
        "generation complete"
    );
    PhaseResult::Yield(
        Ok(StreamEvent::Done {
            cost: state.total_cost,
        }),
        Phase::Done,
    )
}

async fn phase_executing_tools(state: &mut LoopState) -> Phase {
    let calls = std::mem::take(&mut state.pending);
    let registry = state.service.tools.as_ref();
    let results =
        futures::future::join_all(calls.iter().map(|call| run_tool(registry, call))).await;

    if state.chained {
        state.previous_response_id = state
            .response_id
            .take()
            .or_else(|| state.previous_response_id.take());
        state.tool_outputs = calls
            .iter()
            .zip(&results)
            .map(|(call, result)| ContextItem::function_call_output(call.call_id.as_str(), result))
            .collect();
    } else {
        let tool_calls = calls
            .into_iter()
            .zip(results)
            .map(|(call, result)| ToolCall {
                id: call.call_id,
                function: FunctionCall {
                    name: call.name,
                    arguments: call.raw_arguments,
                },
                result: Some(result),
            })
            .collect();
        let text = std::mem::take(&mut state.text);
        state
            .history
            .push(Message::assistant_with_tools(text, tool_calls));
    }

    Phase::StartTurn
}

/// Runs one call. Every failure becomes a string result for the model.
async fn run_tool(registry: &dyn ExecutableToolRegistry, call: &PendingToolCall) -> Value {
    let execution = AssertUnwindSafe(registry.execute(&call.name, call.arguments.clone()));
    let message = match execution.catch_unwind().await {
        Ok(Ok(value)) => return value,
        Ok(Err(e @ ToolError::NotFound(_))) => e.to_string(),
        Ok(Err(e)) => format!("Tool {} failed: {e}", call.name),
        Err(_) => format!("Tool {} failed: panicked", call.name),
    };
    tracing::warn!(tool = %call.name, call_id = %call.call_id, %message, "tool call failed");
    Value::String(message)
}
