//! Rendering the `<intent_context>` block.
//!
//! The block binds the selected intent, a slice of recent trace history,
//! and the shared knowledge file into one string injected into the
//! model's context.

use ward_protocol::Intent;
use ward_protocol::TraceEntry;

/// How many related trace entries the brief history carries.
pub const BRIEF_HISTORY_LEN: usize = 5;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn push_list(out: &mut String, outer: &str, inner: &str, items: &[String]) {
    if items.is_empty() {
        out.push_str(&format!("    <{outer}/>\n"));
        return;
    }
    out.push_str(&format!("    <{outer}>\n"));
    for item in items {
        out.push_str(&format!("      <{inner}>{}</{inner}>\n", escape(item)));
    }
    out.push_str(&format!("    </{outer}>\n"));
}

/// Render the full context block.
///
/// `history` must already be filtered to entries related to the intent;
/// only the last [`BRIEF_HISTORY_LEN`] are emitted.
pub fn render_context_block(
    intent: &Intent,
    history: &[TraceEntry],
    shared_knowledge: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str("<intent_context>\n");

    out.push_str("  <intent_specification>\n");
    out.push_str(&format!("    <id>{}</id>\n", escape(&intent.id)));
    out.push_str(&format!("    <name>{}</name>\n", escape(&intent.name)));
    out.push_str(&format!("    <status>{}</status>\n", intent.status.as_str()));
    push_list(&mut out, "owned_scope", "path", &intent.owned_scope);
    push_list(&mut out, "constraints", "constraint", &intent.constraints);
    push_list(
        &mut out,
        "acceptance_criteria",
        "criteria",
        &intent.acceptance_criteria,
    );
    out.push_str("  </intent_specification>\n");

    let start = history.len().saturating_sub(BRIEF_HISTORY_LEN);
    let recent = &history[start..];
    if recent.is_empty() {
        out.push_str("  <brief_history/>\n");
    } else {
        out.push_str("  <brief_history>\n");
        for entry in recent {
            let files: Vec<&str> = entry
                .files
                .iter()
                .map(|f| f.relative_path.as_str())
                .collect();
            out.push_str(&format!(
                "    <trace_entry id=\"{}\" timestamp=\"{}\" tool=\"{}\" files=\"{}\"/>\n",
                escape(&entry.id),
                escape(&entry.timestamp),
                escape(&entry.tool),
                escape(&files.join(",")),
            ));
        }
        out.push_str("  </brief_history>\n");
    }

    match shared_knowledge {
        Some(knowledge) if !knowledge.trim().is_empty() => {
            out.push_str("  <shared_knowledge>\n");
            out.push_str(&escape(knowledge.trim_end()));
            out.push_str("\n  </shared_knowledge>\n");
        }
        _ => out.push_str("  <shared_knowledge/>\n"),
    }

    out.push_str("</intent_context>");
    out
}
