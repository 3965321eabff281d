// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `%`-substitution templating for `failover_command`, `failback_command`,
//! and `follow_primary_command`, and the synchronous shell invocation of
//! the expanded string.

use pgsup_core::backend::NodeId;

/// The backend-shaped pieces a template substitution can reference. Reused
/// for the failed node and the new main node; the old-primary reference
/// only ever needs `id`/`host`/`port`, but carrying `data_directory`
/// unconditionally keeps one shape instead of two near-identical ones.
#[derive(Debug, Clone)]
pub struct NodeRef {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
    pub data_directory: String,
}

/// Everything a failover/failback/follow-primary command template may
/// reference. Any field left `None` expands its substitutions to `""`
/// ("missing nodes yield \"\"").
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub failed: Option<NodeRef>,
    pub new_main: Option<NodeRef>,
    pub old_main_id: Option<NodeId>,
    pub old_primary: Option<NodeRef>,
}

/// Expands every `%x` token in `template` per the substitution table.
/// `%%` becomes a literal `%`; an unrecognized `%x` is passed through
/// verbatim (there is no sensible default and a silent drop would hide a
/// configuration typo less visibly than leaving the token in place).
pub fn expand(template: &str, ctx: &CommandContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('d') => out.push_str(&ctx.failed.as_ref().map(|n| n.id.to_string()).unwrap_or_default()),
            Some('h') => out.push_str(&ctx.failed.as_ref().map(|n| n.host.clone()).unwrap_or_default()),
            Some('p') => out.push_str(&ctx.failed.as_ref().map(|n| n.port.to_string()).unwrap_or_default()),
            Some('D') => {
                out.push_str(&ctx.failed.as_ref().map(|n| n.data_directory.clone()).unwrap_or_default())
            }
            Some('m') => {
                out.push_str(&ctx.new_main.as_ref().map(|n| n.id.to_string()).unwrap_or_default())
            }
            Some('H') => {
                out.push_str(&ctx.new_main.as_ref().map(|n| n.host.clone()).unwrap_or_default())
            }
            Some('r') => {
                out.push_str(&ctx.new_main.as_ref().map(|n| n.port.to_string()).unwrap_or_default())
            }
            Some('R') => out.push_str(
                &ctx.new_main.as_ref().map(|n| n.data_directory.clone()).unwrap_or_default(),
            ),
            Some('M') => out.push_str(&ctx.old_main_id.map(|id| id.to_string()).unwrap_or_default()),
            Some('P') => {
                out.push_str(&ctx.old_primary.as_ref().map(|n| n.id.to_string()).unwrap_or_default())
            }
            Some('N') => {
                out.push_str(&ctx.old_primary.as_ref().map(|n| n.host.clone()).unwrap_or_default())
            }
            Some('S') => {
                out.push_str(&ctx.old_primary.as_ref().map(|n| n.port.to_string()).unwrap_or_default())
            }
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Runs `template` (after expansion) synchronously through the host shell.
/// Exit status is only logged — a failing command never aborts the state
/// transition that triggered it.
pub async fn run(template: &str, ctx: &CommandContext) -> std::io::Result<std::process::ExitStatus> {
    let expanded = expand(template, ctx);
    let status = tokio::process::Command::new("sh").arg("-c").arg(&expanded).status().await?;
    if !status.success() {
        tracing::warn!(command = %expanded, code = ?status.code(), "command exited non-zero");
    } else {
        tracing::info!(command = %expanded, "command completed");
    }
    Ok(status)
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
