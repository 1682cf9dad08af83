// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for the sequential executor over the built-in tools.

use boardq_core::ToolCall;
use boardq_executor::{ExecuteOptions, MemoryBoard, SequentialExecutor};
use proptest::prelude::*;
use serde_json::json;

/// `true` plans a sticky note, `false` a call to a tool that does not exist.
fn plan(steps: &[bool]) -> Vec<ToolCall> {
    steps
        .iter()
        .enumerate()
        .map(|(i, ok)| {
            if *ok {
                ToolCall::new("createStickyNote", json!({"text": format!("note {i}")}))
            } else {
                ToolCall::new("noSuchTool", json!({}))
            }
        })
        .collect()
}

fn run(steps: &[bool], stop_on_error: bool) -> boardq_executor::ExecutionReport {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let calls = plan(steps);
    let options = ExecuteOptions {
        stop_on_error,
        ..ExecuteOptions::default()
    };
    runtime.block_on(async {
        SequentialExecutor::with_builtins()
            .execute(&calls, &MemoryBoard::new(), &options)
            .await
    })
}

proptest! {
    #[test]
    fn every_step_runs_in_order_and_failures_are_numbered(
        steps in proptest::collection::vec(any::<bool>(), 0..12)
    ) {
        let report = run(&steps, false);

        prop_assert_eq!(report.step_results.len(), steps.len());
        for (i, step) in report.step_results.iter().enumerate() {
            prop_assert_eq!(step.index, i);
            prop_assert_eq!(step.success, steps[i]);
        }

        let expected_errors: Vec<String> = steps
            .iter()
            .enumerate()
            .filter(|(_, ok)| !**ok)
            .map(|(i, _)| format!("Step {}: Unknown tool: noSuchTool", i + 1))
            .collect();
        prop_assert_eq!(&report.errors, &expected_errors);
        prop_assert_eq!(report.success, expected_errors.is_empty());

        let created = steps.iter().filter(|ok| **ok).count();
        prop_assert_eq!(report.affected_objects.len(), created);
    }

    #[test]
    fn stop_on_error_halts_at_first_failure(
        steps in proptest::collection::vec(any::<bool>(), 1..12)
    ) {
        let report = run(&steps, true);
        let expected = steps
            .iter()
            .position(|ok| !ok)
            .map_or(steps.len(), |first_failure| first_failure + 1);

        prop_assert_eq!(report.step_results.len(), expected);
        prop_assert!(report.errors.len() <= 1);
    }
}
