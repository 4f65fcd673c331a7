//! Message History Adapter: stored messages to provider context items.
//!
//! [`generate_context`] is pure. It never touches the network, keeps no
//! counters, and returns the same items for the same input.
//!
//! One message can expand into several items. An assistant message with
//! `N` tool calls becomes its turn item followed by, per call, a
//! `function_call` item and (only when a result exists) a
//! `function_call_output` item with the same call id:
//!
//! ```text
//! assistant(text, [c1 ✓, c2 ✗])  →  message · call(c1) · output(c1) · call(c2)
//! ```
//!
//! A history without a system message gets one synthesized from the
//! [`World`] at position 0.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{Message, Role, ToolCall};
use crate::world::World;

/// One element of the provider-facing input sequence.
///
/// Serialized with a `type` tag in the shape the Responses wire format
/// expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextItem {
    /// A plain turn.
    Message {
        /// `"system"`, `"user"` or `"assistant"`.
        role: String,
        /// Raw text of the turn.
        content: String,
    },
    /// The model invoked a function.
    FunctionCall {
        /// Item id.
        id: String,
        /// Call id, shared with the matching output.
        call_id: String,
        /// Function name.
        name: String,
        /// JSON-encoded arguments.
        arguments: String,
    },
    /// The result of a function call.
    FunctionCallOutput {
        /// Item id.
        id: String,
        /// Call id of the call this answers.
        call_id: String,
        /// The result, as text.
        output: String,
    },
}

impl ContextItem {
    /// A plain turn item.
    pub fn message(role: Role, content: impl Into<String>) -> Option<Self> {
        role.as_str().map(|role| Self::Message {
            role: role.to_owned(),
            content: content.into(),
        })
    }

    /// A `function_call` item whose item id and call id are both `call_id`.
    pub fn function_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        let call_id = call_id.into();
        Self::FunctionCall {
            id: call_id.clone(),
            call_id,
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// A `function_call_output` item answering `call_id`.
    pub fn function_call_output(call_id: impl Into<String>, output: &Value) -> Self {
        let call_id = call_id.into();
        Self::FunctionCallOutput {
            id: call_id.clone(),
            call_id,
            output: output_text(output),
        }
    }

    /// Role of a plain turn item.
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::Message { role, .. } => Some(role),
            _ => None,
        }
    }

    /// Call id of a function call or output item.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::FunctionCall { call_id, .. } | Self::FunctionCallOutput { call_id, .. } => {
                Some(call_id)
            }
            Self::Message { .. } => None,
        }
    }

    /// The textual payload of the item, used for token estimation.
    pub fn text(&self) -> &str {
        match self {
            Self::Message { content, .. } => content,
            Self::FunctionCall { arguments, .. } => arguments,
            Self::FunctionCallOutput { output, .. } => output,
        }
    }
}

/// Strings pass through untouched, anything else is JSON-encoded.
fn output_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the provider context for `messages`.
///
/// Messages with an unrecognized role are skipped.
pub fn generate_context(messages: &[Message], world: &World) -> Vec<ContextItem> {
    let mut items = Vec::with_capacity(messages.len() + 1);

    if !messages.iter().any(|m| m.role == Role::System) {
        items.push(ContextItem::Message {
            role: "system".to_owned(),
            content: world.to_system_prompt(),
        });
    }

    for message in messages {
        let Some(turn) = ContextItem::message(message.role, message.text.as_str()) else {
            continue;
        };
        items.push(turn);

        if message.role == Role::Assistant {
            for call in message.tool_calls.iter().flatten() {
                push_tool_call(&mut items, call);
            }
        }
    }

    items
}

fn push_tool_call(items: &mut Vec<ContextItem>, call: &ToolCall) {
    items.push(ContextItem::function_call(
        call.id.as_str(),
        call.function.name.as_str(),
        call.function.arguments.as_str(),
    ));
    if let Some(result) = &call.result {
        items.push(ContextItem::function_call_output(call.id.as_str(), result));
    }
}

/// The single-item input sent when chaining on a previous response: the
/// most recent user message.
pub fn trailing_user_item(messages: &[Message]) -> Option<ContextItem> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .and_then(|m| ContextItem::message(m.role, m.text.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str, result: Option<Value>) -> ToolCall {
        ToolCall {
            id: id.into(),
            function: crate::message::FunctionCall {
                name: "lookup".into(),
                arguments: "{\"q\":1}".into(),
            },
            result,
        }
    }

    #[test]
    fn test_single_user_message_gets_system_item() {
        let items = generate_context(&[Message::user("hi")], &World::default());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].role(), Some("system"));
        assert_eq!(items[0].text(), World::default().to_system_prompt());
        assert_eq!(items[1].role(), Some("user"));
        assert_eq!(items[1].text(), "hi");
    }

    #[test]
    fn test_existing_system_message_is_kept_in_place() {
        let msgs = [Message::user("hi"), Message::system("be brief")];
        let items = generate_context(&msgs, &World::new("ignored"));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].role(), Some("user"));
        assert_eq!(items[1].text(), "be brief");
    }

    #[test]
    fn test_empty_history_is_just_system() {
        let items = generate_context(&[], &World::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].role(), Some("system"));
    }

    #[test]
    fn test_unknown_roles_skipped() {
        let msgs = [
            Message::user("a"),
            Message {
                role: Role::Unknown,
                text: "junk".into(),
                tool_calls: None,
            },
            Message::assistant("b"),
        ];
        let items = generate_context(&msgs, &World::default());
        let texts: Vec<_> = items.iter().skip(1).map(ContextItem::text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_tool_calls_with_results_expand_to_pairs() {
        let msgs = [Message::assistant_with_tools(
            "checking",
            vec![
                call("c1", Some(json!({"ok": true}))),
                call("c2", Some(json!("plain"))),
                call("c3", Some(json!(7))),
            ],
        )];
        let items = generate_context(&msgs, &World::default());
        // system + 1 + 2 * 3
        assert_eq!(items.len(), 1 + 1 + 2 * 3);

        let expanded = &items[2..];
        for (pair, id) in expanded.chunks(2).zip(["c1", "c2", "c3"]) {
            assert!(matches!(pair[0], ContextItem::FunctionCall { .. }));
            assert!(matches!(pair[1], ContextItem::FunctionCallOutput { .. }));
            assert_eq!(pair[0].call_id(), Some(id));
            assert_eq!(pair[1].call_id(), Some(id));
        }
        assert_eq!(expanded[1].text(), r#"{"ok":true}"#);
        assert_eq!(expanded[3].text(), "plain");
        assert_eq!(expanded[5].text(), "7");
    }

    #[test]
    fn test_call_without_result_has_no_output() {
        let msgs = [Message::assistant_with_tools(
            "",
            vec![call("c1", None), call("c2", Some(json!(1)))],
        )];
        let items = generate_context(&msgs, &World::default());
        assert_eq!(items.len(), 1 + 1 + 1 + 2);
        let outputs = items
            .iter()
            .filter(|i| matches!(i, ContextItem::FunctionCallOutput { .. }))
            .count();
        assert_eq!(outputs, 1);
        assert_eq!(items[2].call_id(), Some("c1"));
        assert_eq!(items[3].call_id(), Some("c2"));
    }

    #[test]
    fn test_function_call_reuses_id() {
        let item = ContextItem::function_call("call_9", "f", "{}");
        assert_eq!(
            item,
            ContextItem::FunctionCall {
                id: "call_9".into(),
                call_id: "call_9".into(),
                name: "f".into(),
                arguments: "{}".into(),
            }
        );
    }

    #[test]
    fn test_tool_calls_on_user_message_ignored() {
        let msgs = [Message {
            role: Role::User,
            text: "hi".into(),
            tool_calls: Some(vec![call("c1", Some(json!(1)))]),
        }];
        assert_eq!(generate_context(&msgs, &World::default()).len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let msgs = vec![
            Message::system("s"),
            Message::user("u"),
            Message::assistant_with_tools("a", vec![call("c1", Some(json!([1, 2])))]),
        ];
        let world = World::new("w").with_fact("k", "v");
        let first = generate_context(&msgs, &world);
        let second = generate_context(&msgs, &world);
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialized_shape() {
        let items = vec![
            ContextItem::message(Role::User, "hi").unwrap(),
            ContextItem::function_call("c1", "f", "{}"),
            ContextItem::function_call_output("c1", &json!("done")),
        ];
        assert_eq!(
            serde_json::to_value(&items).unwrap(),
            json!([
                {"type": "message", "role": "user", "content": "hi"},
                {"type": "function_call", "id": "c1", "call_id": "c1", "name": "f", "arguments": "{}"},
                {"type": "function_call_output", "id": "c1", "call_id": "c1", "output": "done"}
            ])
        );
    }

    #[test]
    fn test_trailing_user_item() {
        let msgs = [
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
            Message::assistant("another"),
        ];
        assert_eq!(trailing_user_item(&msgs).unwrap().text(), "second");
        assert!(trailing_user_item(&[Message::assistant("x")]).is_none());
    }
}
