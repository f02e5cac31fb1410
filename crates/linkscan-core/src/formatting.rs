//! Report rendering for finished investigations
//!
//! Everything here is pure: the same [`ScanResult`] always renders to the
//! same text.

use crate::contract::{ScanResult, ScanStatus, VerdictCategory};

/// Width of the confidence bar in blocks
pub const CONFIDENCE_BAR_LENGTH: usize = 10;
/// Column width for the wrapped explanation
pub const EXPLANATION_WIDTH: usize = 45;
/// Column width for the wrapped technical reasoning
pub const REASONING_WIDTH: usize = 40;

const FILLED_BLOCK: char = '█';
const EMPTY_BLOCK: char = '░';
const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";
const SHORT_ID_LEN: usize = 12;

// ============================================================================
// Truncation utilities
// ============================================================================

/// Truncate to at most `max` characters, never splitting a char
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", truncate_chars(s, max.saturating_sub(3)))
    }
}

// ============================================================================
// Severity tiers
// ============================================================================

/// Severity tier a category is displayed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Safe,
    Suspicious,
    Dangerous,
    Unrecognized,
}

impl Severity {
    pub fn of(category: &VerdictCategory) -> Self {
        match category {
            VerdictCategory::Safe => Severity::Safe,
            VerdictCategory::Suspicious => Severity::Suspicious,
            VerdictCategory::Phishing
            | VerdictCategory::Malware
            | VerdictCategory::Advertisement => Severity::Dangerous,
            VerdictCategory::Other(_) => Severity::Unrecognized,
        }
    }

    /// Header emoji
    pub fn indicator(&self) -> &'static str {
        match self {
            Severity::Safe => "✅",
            Severity::Suspicious => "⚠️",
            Severity::Dangerous => "🚨",
            Severity::Unrecognized => "📎",
        }
    }
}

fn status_indicator(status: ScanStatus) -> &'static str {
    match status {
        ScanStatus::Completed => "✓",
        ScanStatus::Ongoing => "⏳",
        ScanStatus::Error => "✗",
    }
}

/// Category label with its tier colour
pub fn format_category(category: &VerdictCategory) -> String {
    match Severity::of(category) {
        Severity::Safe => "🟢 *SAFE*".to_string(),
        Severity::Suspicious => "🟡 *SUSPICIOUS*".to_string(),
        Severity::Dangerous => format!("🔴 *DANGEROUS* ({})", category),
        Severity::Unrecognized => format!("⚫ *{}*", category),
    }
}

/// Block bar with `floor(score * 10)` filled cells
pub fn confidence_bar(score: f64) -> String {
    let filled = if score.is_finite() {
        let cells = (score * CONFIDENCE_BAR_LENGTH as f64).floor().max(0.0) as usize;
        cells.min(CONFIDENCE_BAR_LENGTH)
    } else {
        0
    };

    let mut bar = String::with_capacity(CONFIDENCE_BAR_LENGTH * 3);
    for i in 0..CONFIDENCE_BAR_LENGTH {
        bar.push(if i < filled { FILLED_BLOCK } else { EMPTY_BLOCK });
    }
    bar
}

/// snake_case tool name to Title Case
pub fn format_tool_name(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Greedy word wrap; a single word longer than `width` gets its own line
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Render a finished investigation as a chat-friendly report
pub fn format_report(result: &ScanResult) -> String {
    let mut out = String::new();
    let verdict = result.final_verdict.as_ref();
    let severity = verdict.map(|v| Severity::of(&v.category)).unwrap_or(Severity::Unrecognized);
    let emoji = severity.indicator();

    out.push_str(&format!("{} *URL SCAN REPORT* {}\n", emoji, emoji));
    out.push_str(RULE);
    out.push_str("\n\n");

    out.push_str(&format!(
        "📋 *Status:* {} _{}_\n",
        status_indicator(result.status),
        result.status
    ));

    if result.investigation_id.is_empty() {
        out.push('\n');
    } else {
        out.push_str(&format!(
            "🔍 *ID:* ```{}...```\n\n",
            truncate_chars(&result.investigation_id, SHORT_ID_LEN)
        ));
    }

    out.push_str("╔══════════════════╗\n");
    out.push_str("║   *FINAL VERDICT*   ║\n");
    out.push_str("╚══════════════════╝\n\n");

    let explanation = verdict.map(|v| v.explanation.as_str()).unwrap_or("");
    match verdict {
        Some(v) => {
            out.push_str(&format!("⚡ *Category:* {}\n\n", format_category(&v.category)));
            out.push_str(&format!(
                "📊 *Confidence Score:*\n{} {:.0}%\n\n",
                confidence_bar(v.confidence_score),
                v.confidence_score * 100.0
            ));
        }
        None => out.push_str("⚡ *Category:* ⚪ *UNKNOWN*\n\n"),
    }

    let explanation_lines = wrap_text(explanation, EXPLANATION_WIDTH);
    if !explanation_lines.is_empty() {
        out.push_str("💬 *Explanation:*\n");
        for line in explanation_lines {
            out.push_str(&format!("_{}_\n", line));
        }
        out.push('\n');
    }

    if !result.reasoning.trim().is_empty() && result.reasoning != explanation {
        out.push_str("🔬 *Technical Analysis:*\n");
        let wrapped = wrap_text(&result.reasoning, REASONING_WIDTH).join("\n");
        out.push_str(&format!("```{}```\n\n", wrapped));
    }

    if !result.tool_calls.is_empty() {
        out.push_str("🛠️ *Security Checks Performed:*\n");
        for (i, call) in result.tool_calls.iter().enumerate() {
            out.push_str(&format!("{}. _{}_\n", i + 1, format_tool_name(&call.name)));
        }
        out.push('\n');
    }

    out.push_str(RULE);
    out.push('\n');
    out.push_str("_Generated by linkscan_");
    out
}
