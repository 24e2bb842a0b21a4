use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

/// Appended when a result is cut short
pub const TRUNCATION_MARKER: &str = "\n\n/* ... output truncated ... */";

// An opener is three backticks, optionally followed by a language tag that
// must end the line. The body stops at the first closing fence.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:[\w+#.\-]*[ \t]*\r?\n)?(.*?)```").unwrap());

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:[\w+#.\-]*[ \t]*(?:\r?\n|$))?").unwrap());

static TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?```$").unwrap());

static DANGEROUS_SHELL: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        // recursive force delete
        r"(?i)\brm\s+-[a-z]*(rf|fr)[a-z]*\b",
        r"(?i)\brm\s+(-r\s+-f|-f\s+-r)\b",
        // privilege escalation
        r"(?i)\bsudo\b",
        r"(?i)\bsu\s+-",
        // filesystem format
        r"(?i)\bmkfs(\.\w+)?\b",
        r"(?i)\bformat\s+[a-z]:",
        // raw disk write
        r"(?i)\bdd\s+if=",
        r"(?i)>\s*/dev/(sd|hd|nvme|disk)",
        // fork bomb
        r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        // world-writable permissions
        r"(?i)\bchmod\s+(-R\s+)?0?777\b",
        // bare network fetch
        r"(?i)\b(curl|wget)\s+",
    ])
    .unwrap()
});

/// Extract code from a reply that may wrap it in markdown fences.
///
/// All fenced blocks are joined with a blank line. Without a complete block a
/// dangling opening or closing fence is removed instead. Idempotent.
pub fn strip_fences(text: &str) -> String {
    let blocks: Vec<&str> = FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|body| body.as_str().trim())
        .collect();

    if !blocks.is_empty() {
        return blocks.join("\n\n").trim().to_string();
    }

    let text = text.trim();
    let text = LEADING_FENCE.replace(text, "");
    let text = TRAILING_FENCE.replace(&text, "");
    text.trim().to_string()
}

/// Advisory check for shell commands that could do damage if run.
/// Only used to warn; never blocks display.
pub fn has_dangerous_shell(text: &str) -> bool {
    DANGEROUS_SHELL.is_match(text)
}

/// Cut `text` to at most `max_len` characters, appending a marker when cut.
/// Counts and splits on `char` boundaries.
pub fn truncate_output(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
