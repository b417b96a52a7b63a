//! Road names from directions instruction markup.
//!
//! Instructions arrive as lightly formatted HTML, e.g.
//! `Turn <b>right</b> onto <b>Main St</b><div>Pass by the bank</div>`.
//! The road is whatever follows the last "onto", or failing that the
//! last "toward", once markup and asides are removed.

use std::sync::LazyLock;

use regex::Regex;

static DIV_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<div[^>]*>.*?</div>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").unwrap());
static PASS_BY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bpass by .+$").unwrap());
static ONTO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^.*\bonto\s+(.+)$").unwrap());
static TOWARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^.*\btoward\s+(.+)$").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Instruction text with markup, asides and "pass by" clauses removed.
pub fn plain_text(markup: &str) -> String {
    let s = DIV_BLOCK.replace_all(markup, " ");
    let s = TAG.replace_all(&s, "");
    let s = PARENTHETICAL.replace_all(&s, "");
    let s = PASS_BY.replace(&s, "");
    SPACES.replace_all(s.trim(), " ").into_owned()
}

/// The road named by an instruction, if any.
pub fn road_name(markup: &str) -> Option<String> {
    let text = plain_text(markup);

    ONTO.captures(&text)
        .or_else(|| TOWARD.captures(&text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|road| !road.is_empty())
}
