//! Streaming event types.
//!
//! Two vocabularies live here:
//!
//! - **[`ProviderEvent`]**: what a provider binding yields from one turn.
//!   Every binding maps its native protocol onto exactly these events.
//! - **[`StreamEvent`]**: what the caller of
//!   [`generate_response_streaming`](crate::GenerationService::generate_response_streaming)
//!   sees. Zero or more [`Text`](StreamEvent::Text) events followed by
//!   exactly one terminal [`Done`](StreamEvent::Done), no matter how many
//!   tool-call turns happened in between.
//!
//! # Consuming a generation
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use gen_stack::{EventStream, StreamEvent};
//!
//! async fn print_stream(mut stream: EventStream) {
//!     while let Some(event) = stream.next().await {
//!         match event {
//!             Ok(StreamEvent::Text { content }) => print!("{content}"),
//!             Ok(StreamEvent::Done { cost }) => println!("\n[{cost}]"),
//!             Err(e) => eprintln!("generation failed: {e}"),
//!         }
//!     }
//! }
//! ```

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::usage::{Credits, Usage};

/// A pinned, boxed, `Send` stream of caller-facing events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, GenerationError>> + Send>>;

/// A pinned, boxed, `Send` stream of one provider turn's events.
///
/// Dropping it must release the underlying network stream.
pub type ProviderStream =
    Pin<Box<dyn Stream<Item = Result<ProviderEvent, GenerationError>> + Send>>;

/// A caller-facing generation event.
///
/// Serializes as `{"type": "text", "content": ...}` or
/// `{"type": "done", "cost": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of model output, forwarded as soon as it arrives.
    Text {
        /// The fragment.
        content: String,
    },
    /// Terminal event carrying the cost of every turn of the generation.
    Done {
        /// Total cost across all turns.
        cost: Credits,
    },
}

impl StreamEvent {
    /// Shorthand for a text event.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }
}

/// One event from a provider turn.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderEvent {
    /// The provider accepted the request and assigned a response id.
    Created {
        /// Id usable as `previous_response_id` on the next turn.
        response_id: String,
    },
    /// A fragment of output text.
    TextDelta(String),
    /// A complete function-call item.
    FunctionCall(FunctionCallItem),
    /// The turn finished.
    Completed {
        /// Token counts for the turn.
        usage: Usage,
    },
    /// The provider reported a failure mid-stream.
    Error {
        /// Provider message.
        message: String,
    },
}

/// A function call as emitted by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallItem {
    /// Id of the output item.
    pub id: String,
    /// Call id the output must reference.
    pub call_id: String,
    /// Function name.
    pub name: String,
    /// JSON-encoded arguments, possibly malformed.
    pub arguments: String,
}
