// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Processor lifecycle state.
//!
//! The processor is in exactly one of three states. Every transition is a
//! pure function of the current state so the reactor and the control
//! methods (`start`/`stop`) can apply them atomically through a single
//! `watch` channel.

use boardq_core::{BoardId, CommandId};

/// What a processor is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessorState {
    /// Not subscribed; no claims will be made.
    #[default]
    Stopped,
    /// Subscribed to `board_id` and waiting for pending work.
    Idle { board_id: BoardId },
    /// Running one claimed command.
    Busy {
        board_id: BoardId,
        command_id: CommandId,
    },
}

impl ProcessorState {
    /// Entering a run always lands in `Idle` for the new board.
    pub fn started(board_id: BoardId) -> Self {
        ProcessorState::Idle { board_id }
    }

    /// `Idle` becomes `Busy`. Returns `None` from any other state, meaning the
    /// processor must not claim.
    pub fn begin(&self, command_id: CommandId) -> Option<Self> {
        match self {
            ProcessorState::Idle { board_id } => Some(ProcessorState::Busy {
                board_id: board_id.clone(),
                command_id,
            }),
            _ => None,
        }
    }

    /// `Busy` returns to `Idle`. A processor stopped mid-command stays
    /// `Stopped`.
    pub fn finish(&self) -> Self {
        match self {
            ProcessorState::Busy { board_id, .. } => ProcessorState::Idle {
                board_id: board_id.clone(),
            },
            other => other.clone(),
        }
    }

    pub fn stopped(&self) -> Self {
        ProcessorState::Stopped
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, ProcessorState::Stopped)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ProcessorState::Idle { .. })
    }

    pub fn board_id(&self) -> Option<&BoardId> {
        match self {
            ProcessorState::Stopped => None,
            ProcessorState::Idle { board_id } | ProcessorState::Busy { board_id, .. } => {
                Some(board_id)
            }
        }
    }

    /// The command being processed, if any.
    pub fn current_command(&self) -> Option<&CommandId> {
        match self {
            ProcessorState::Busy { command_id, .. } => Some(command_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessorState::Stopped => write!(f, "stopped"),
            ProcessorState::Idle { board_id } => write!(f, "idle({board_id})"),
            ProcessorState::Busy {
                board_id,
                command_id,
            } => write!(f, "busy({board_id}/{command_id})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn board() -> BoardId {
        BoardId::new("b1")
    }

    #[test]
    fn idle_to_busy_and_back() {
        let idle = ProcessorState::started(board());
        assert!(idle.is_active());
        assert!(idle.is_idle());

        let busy = idle.begin(CommandId::from("c1")).unwrap();
        assert_eq!(busy.current_command(), Some(&CommandId::from("c1")));
        assert_eq!(busy.board_id(), Some(&board()));
        assert!(busy.begin(CommandId::from("c2")).is_none());

        assert_eq!(busy.finish(), idle);
    }

    #[test]
    fn stopped_never_claims() {
        let stopped = ProcessorState::Stopped;
        assert!(!stopped.is_active());
        assert!(stopped.begin(CommandId::from("c1")).is_none());
        assert_eq!(stopped.finish(), ProcessorState::Stopped);
    }

    #[test]
    fn stop_while_busy_stays_stopped_after_finish() {
        let busy = ProcessorState::started(board())
            .begin(CommandId::from("c1"))
            .unwrap();
        let stopped = busy.stopped();
        assert_eq!(stopped.finish(), ProcessorState::Stopped);
    }

    #[test]
    fn display_forms() {
        assert_eq!(ProcessorState::Stopped.to_string(), "stopped");
        assert_eq!(ProcessorState::started(board()).to_string(), "idle(b1)");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Start,
        Begin(u8),
        Finish,
        Stop,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Start),
            any::<u8>().prop_map(Op::Begin),
            Just(Op::Finish),
            Just(Op::Stop),
        ]
    }

    proptest! {
        #[test]
        fn at_most_one_command_in_flight(ops in proptest::collection::vec(op(), 0..40)) {
            let mut state = ProcessorState::Stopped;
            let mut in_flight: Option<CommandId> = None;
            for op in ops {
                match op {
                    Op::Start => {
                        if in_flight.is_none() {
                            state = ProcessorState::started(board());
                        }
                    }
                    Op::Begin(n) => {
                        if let Some(next) = state.begin(CommandId(format!("c{n}"))) {
                            prop_assert!(in_flight.is_none());
                            in_flight = next.current_command().cloned();
                            state = next;
                        }
                    }
                    Op::Finish => {
                        state = state.finish();
                        in_flight = None;
                    }
                    Op::Stop => state = state.stopped(),
                }
                if let Some(current) = state.current_command() {
                    prop_assert_eq!(Some(current), in_flight.as_ref());
                }
            }
        }
    }
}
