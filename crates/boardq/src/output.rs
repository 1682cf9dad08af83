// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human and `--json` rendering of commands and tools.

use std::io::IsTerminal;

use boardq_core::{BoardqError, Command, CommandStatus, ProcessingResult};
use boardq_executor::ToolRegistry;
use colored::Colorize;

/// Colors are used only on a terminal and never with `--plain`.
pub fn use_color(plain: bool) -> bool {
    !plain && std::io::stdout().is_terminal()
}

fn status_label(status: CommandStatus, use_color: bool) -> String {
    let label = format!("{:<10}", status.as_str());
    if !use_color {
        return label;
    }
    match status {
        CommandStatus::Pending => label.yellow().to_string(),
        CommandStatus::Processing => label.cyan().to_string(),
        CommandStatus::Completed => label.green().to_string(),
        CommandStatus::Failed => label.red().to_string(),
    }
}

/// One summary line: id, status, creation time, input, and the error if any.
pub fn command_line(command: &Command, use_color: bool) -> String {
    let mut line = format!(
        "{}  {}  {}  {}",
        command.id,
        status_label(command.status, use_color),
        command.created_at.format("%Y-%m-%d %H:%M:%S"),
        command.input
    );
    if let Some(error) = &command.error {
        let error = if use_color {
            error.red().to_string()
        } else {
            error.clone()
        };
        line.push_str(&format!("  ({error})"));
    }
    line
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, BoardqError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| BoardqError::Internal(format!("failed to serialize output: {e}")))
}

pub fn render_commands(
    commands: &[Command],
    json: bool,
    use_color: bool,
) -> Result<String, BoardqError> {
    if json {
        return to_json(commands);
    }
    if commands.is_empty() {
        return Ok("no commands".to_string());
    }
    Ok(commands
        .iter()
        .map(|c| command_line(c, use_color))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Full detail for one command, including its tool calls.
pub fn render_command(command: &Command, json: bool, use_color: bool) -> Result<String, BoardqError> {
    if json {
        return to_json(command);
    }
    let mut out = vec![
        format!("id:        {}", command.id),
        format!("board:     {}", command.board_id),
        format!("user:      {}", command.user_id),
        format!("status:    {}", status_label(command.status, use_color).trim_end()),
        format!("input:     {}", command.input),
        format!("created:   {}", command.created_at.to_rfc3339()),
    ];
    if let Some(at) = command.started_at {
        out.push(format!("started:   {}", at.to_rfc3339()));
    }
    if let Some(at) = command.completed_at {
        out.push(format!("completed: {}", at.to_rfc3339()));
    }
    if let Some(error) = &command.error {
        out.push(format!("error:     {error}"));
    }
    if let Some(calls) = &command.result {
        out.push(format!("actions:   {}", calls.len()));
        for call in calls {
            out.push(format!(
                "  - {} {}",
                call.name,
                serde_json::Value::Object(call.arguments.clone())
            ));
        }
    }
    Ok(out.join("\n"))
}

/// The line printed by `process` when a command finishes.
pub fn result_line(result: &ProcessingResult, use_color: bool) -> String {
    let outcome = match (&result.error, use_color) {
        (None, false) => format!("done ({} actions)", result.tool_calls.len()),
        (None, true) => format!("done ({} actions)", result.tool_calls.len())
            .green()
            .to_string(),
        (Some(error), false) => format!("failed: {error}"),
        (Some(error), true) => format!("failed: {error}").red().to_string(),
    };
    format!("{}  {}  {outcome}", result.command.id, result.command.input)
}

pub fn render_tools(json: bool, use_color: bool) -> Result<String, BoardqError> {
    let registry = ToolRegistry::with_builtins();
    if json {
        return to_json(&registry.tool_definitions());
    }
    Ok(registry
        .names()
        .into_iter()
        .filter_map(|name| registry.get(name))
        .map(|tool| {
            let name = if use_color {
                tool.name().bold().to_string()
            } else {
                tool.name().to_string()
            };
            format!("{name}  {}", tool.description())
        })
        .collect::<Vec<_>>()
        .join("\n"))
}
