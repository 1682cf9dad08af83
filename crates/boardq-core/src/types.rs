// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the stores, queue gateway, processor, and executor.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Identifier of a shared board. Commands are partitioned by board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub String);

impl BoardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BoardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Store-assigned identifier of a command. Callers never pick one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub String);

impl CommandId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle status of a command.
///
/// Legal edges: `pending -> processing -> {completed, failed}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl CommandStatus {
    pub const ALL: [CommandStatus; 4] = [
        CommandStatus::Pending,
        CommandStatus::Processing,
        CommandStatus::Completed,
        CommandStatus::Failed,
    ];

    /// `completed` and `failed` are never left once entered.
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandStatus::Completed | CommandStatus::Failed)
    }

    /// Whether a write moving a command from `self` to `next` is legal.
    pub fn can_transition_to(self, next: CommandStatus) -> bool {
        matches!(
            (self, next),
            (CommandStatus::Pending, CommandStatus::Processing)
                | (CommandStatus::Processing, CommandStatus::Completed)
                | (CommandStatus::Processing, CommandStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandStatus::Pending => "pending",
            CommandStatus::Processing => "processing",
            CommandStatus::Completed => "completed",
            CommandStatus::Failed => "failed",
        }
    }
}

/// One typed mutation request produced by the interpreter.
///
/// Opaque to the queue; only the executor reads `name` and `arguments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Builds a tool call from a name and a JSON object of arguments.
    ///
    /// Non-object `arguments` values are treated as no arguments.
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// The unit of work: one queued natural-language request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: CommandId,
    pub board_id: BoardId,
    pub user_id: String,
    pub input: String,
    pub status: CommandStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Command {
    /// Queue order: oldest `created_at` first, ties broken by id.
    pub fn queue_order(&self, other: &Command) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Applies a grouped patch in place. Fields absent from the patch are kept.
    pub fn apply_patch(&mut self, patch: &CommandPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if self.started_at.is_none() {
            self.started_at = patch.started_at;
        }
        if self.completed_at.is_none() {
            self.completed_at = patch.completed_at;
        }
        if let Some(result) = &patch.result {
            self.result = Some(result.clone());
        }
        if let Some(error) = &patch.error {
            self.error = Some(error.clone());
        }
    }

    /// Returns the first lifecycle invariant this record violates, if any.
    pub fn lifecycle_violation(&self) -> Option<&'static str> {
        match self.status {
            CommandStatus::Pending => {
                if self.started_at.is_some() {
                    return Some("pending command has started_at");
                }
                if self.completed_at.is_some() || self.result.is_some() || self.error.is_some() {
                    return Some("pending command carries terminal fields");
                }
            }
            CommandStatus::Processing => {
                if self.started_at.is_none() {
                    return Some("processing command without started_at");
                }
                if self.completed_at.is_some() || self.result.is_some() || self.error.is_some() {
                    return Some("processing command carries terminal fields");
                }
            }
            CommandStatus::Completed | CommandStatus::Failed => {
                if self.started_at.is_none() {
                    return Some("terminal command never entered processing");
                }
                if self.completed_at.is_none() {
                    return Some("terminal command without completed_at");
                }
                if self.result.is_some() == self.error.is_some() {
                    return Some("terminal command must carry exactly one of result/error");
                }
                if self.status == CommandStatus::Completed && self.result.is_none() {
                    return Some("completed command without result");
                }
            }
        }
        None
    }
}

/// Fields supplied by the gateway when creating a command.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCommand {
    pub user_id: String,
    pub input: String,
    pub created_at: DateTime<Utc>,
}

impl NewCommand {
    /// Materializes the stored record for a freshly allocated id.
    pub fn into_command(self, id: CommandId, board_id: BoardId) -> Command {
        Command {
            id,
            board_id,
            user_id: self.user_id,
            input: self.input,
            status: CommandStatus::Pending,
            created_at: self.created_at,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }
}

/// A grouped field update applied by a store as one write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandPatch {
    pub status: Option<CommandStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<Vec<ToolCall>>,
    pub error: Option<String>,
}

impl CommandPatch {
    /// A bare status write. `processing` also stamps `started_at`.
    pub fn status(status: CommandStatus, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            started_at: (status == CommandStatus::Processing).then_some(now),
            ..Self::default()
        }
    }

    pub fn completed(result: Vec<ToolCall>, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(CommandStatus::Completed),
            completed_at: Some(now),
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(CommandStatus::Failed),
            completed_at: Some(now),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Filter and cap for gateway range reads and subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandQuery {
    /// Keep only commands whose status is listed. `None` keeps everything.
    pub status_filter: Option<Vec<CommandStatus>>,
    /// Read at most this many of the most recently created commands.
    pub limit: Option<usize>,
}

impl CommandQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(statuses: impl IntoIterator<Item = CommandStatus>) -> Self {
        Self {
            status_filter: Some(statuses.into_iter().collect()),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, command: &Command) -> bool {
        self.status_filter
            .as_ref()
            .is_none_or(|statuses| statuses.contains(&command.status))
    }
}

/// Raw store range read: ascending by `created_at`, optionally capped to the
/// last `limit_to_last` records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeQuery {
    pub limit_to_last: Option<usize>,
}

/// Change notification pushed by a store after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// The board that changed. `None` means any board may have changed.
    pub board_id: Option<BoardId>,
}

impl StoreChange {
    pub fn board(board_id: BoardId) -> Self {
        Self {
            board_id: Some(board_id),
        }
    }

    pub fn any() -> Self {
        Self { board_id: None }
    }

    pub fn affects(&self, board_id: &BoardId) -> bool {
        self.board_id.as_ref().is_none_or(|b| b == board_id)
    }
}

/// Outcome of one processed command, delivered to the completion callback.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub command: Command,
    pub success: bool,
    pub tool_calls: Vec<ToolCall>,
    pub error: Option<String>,
}

/// Response of the external interpreter for one input text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl Interpretation {
    pub fn succeeded(message: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            success: true,
            message: message.into(),
            tool_calls,
            errors: Vec::new(),
        }
    }

    pub fn rejected(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            tool_calls: Vec::new(),
            errors,
        }
    }

    /// The single failure message written to a failed command.
    pub fn failure_message(&self) -> String {
        if self.errors.is_empty() {
            if self.message.is_empty() {
                "interpreter rejected the command".to_string()
            } else {
                self.message.clone()
            }
        } else {
            self.errors.join("; ")
        }
    }
}

/// An object on the shared board, as seen through the mutation boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardObject {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// A board object before the board assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBoardObject {
    pub object_type: String,
    pub properties: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn command(id: &str, secs: i64) -> Command {
        NewCommand {
            user_id: "u1".into(),
            input: "x".into(),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
        .into_command(CommandId::from(id), BoardId::from("b1"))
    }

    #[test]
    fn status_transitions_are_monotonic() {
        use CommandStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        for status in CommandStatus::ALL {
            assert!(!status.can_transition_to(Pending));
        }
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Processing));
    }

    #[test]
    fn status_string_forms_match() {
        for status in CommandStatus::ALL {
            assert_eq!(status.to_string(), status.as_str());
            assert_eq!(CommandStatus::from_str(status.as_str()).unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn queue_order_breaks_ties_by_id() {
        let a = command("a", 10);
        let b = command("b", 10);
        let old = command("z", 5);
        assert_eq!(a.queue_order(&b), Ordering::Less);
        assert_eq!(old.queue_order(&a), Ordering::Less);
    }

    #[test]
    fn patch_never_overwrites_timestamps() {
        let mut cmd = command("a", 10);
        let t1 = Utc.timestamp_opt(20, 0).unwrap();
        let t2 = Utc.timestamp_opt(30, 0).unwrap();
        cmd.apply_patch(&CommandPatch::status(CommandStatus::Processing, t1));
        cmd.apply_patch(&CommandPatch::status(CommandStatus::Processing, t2));
        assert_eq!(cmd.started_at, Some(t1));
        assert!(cmd.lifecycle_violation().is_none());

        cmd.apply_patch(&CommandPatch::completed(vec![], t2));
        assert_eq!(cmd.completed_at, Some(t2));
        assert_eq!(cmd.status, CommandStatus::Completed);
        assert!(cmd.lifecycle_violation().is_none());
    }

    #[test]
    fn lifecycle_violation_detects_both_payloads() {
        let mut cmd = command("a", 10);
        let now = Utc.timestamp_opt(20, 0).unwrap();
        cmd.apply_patch(&CommandPatch::status(CommandStatus::Processing, now));
        cmd.apply_patch(&CommandPatch::failed("boom", now));
        assert!(cmd.lifecycle_violation().is_none());
        cmd.result = Some(vec![]);
        assert!(cmd.lifecycle_violation().is_some());
    }

    #[test]
    fn tool_call_json_is_camel_case_and_skips_missing_id() {
        let call = ToolCall::new(
            "createStickyNote",
            serde_json::json!({"text": "hi", "color": "#ff0000"}),
        );
        let json = serde_json::to_value(&call).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["arguments"]["color"], "#ff0000");

        let parsed: ToolCall =
            serde_json::from_value(serde_json::json!({"name": "getBoardState"})).unwrap();
        assert!(parsed.arguments.is_empty());
    }

    #[test]
    fn interpretation_failure_message_prefers_errors() {
        let rejected = Interpretation::rejected("nope", vec!["a".into(), "b".into()]);
        assert_eq!(rejected.failure_message(), "a; b");
        let bare = Interpretation::rejected("could not parse", vec![]);
        assert_eq!(bare.failure_message(), "could not parse");
    }

    #[test]
    fn query_matches_status_filter() {
        let cmd = command("a", 1);
        assert!(CommandQuery::all().matches(&cmd));
        assert!(CommandQuery::with_status([CommandStatus::Pending]).matches(&cmd));
        assert!(!CommandQuery::with_status([CommandStatus::Failed]).matches(&cmd));
    }

    #[test]
    fn store_change_scoping() {
        let b1 = BoardId::from("b1");
        let b2 = BoardId::from("b2");
        assert!(StoreChange::any().affects(&b1));
        assert!(StoreChange::board(b1.clone()).affects(&b1));
        assert!(!StoreChange::board(b1).affects(&b2));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn apply_patch_along_legal_path_keeps_invariants(
                fail in any::<bool>(),
                start in 0i64..1_000,
                delta in 0i64..1_000,
            ) {
                let mut cmd = command("p", start);
                prop_assert!(cmd.lifecycle_violation().is_none());
                let t1 = Utc.timestamp_opt(start + delta, 0).unwrap();
                cmd.apply_patch(&CommandPatch::status(CommandStatus::Processing, t1));
                prop_assert!(cmd.lifecycle_violation().is_none());
                let patch = if fail {
                    CommandPatch::failed("boom", t1)
                } else {
                    CommandPatch::completed(vec![ToolCall::new("getBoardState", Value::Null)], t1)
                };
                cmd.apply_patch(&patch);
                prop_assert!(cmd.status.is_terminal());
                prop_assert!(cmd.lifecycle_violation().is_none());
            }
        }
    }
}
