//! Line-local rewrite of MoinMoin markup into Org-mode outline markup.
//!
//! Every line is passed through a fixed, ordered table of rules. Rules never
//! look at neighbouring lines, so multi-line constructs are out of reach.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

pub const SOURCE_BULLET: char = '*';
pub const TARGET_BULLET: char = '-';
/// Outline depth marker; depth 1 belongs to article titles.
pub const SECTION_MARKER: &str = "*";
pub const MAX_HEADING_LEVEL: usize = 5;

const HEADER_DELIMITER: &str = "=";
const CELL_SEPARATOR: &str = "||";
const TARGET_CELL_SEPARATOR: &str = "|";

struct Rule {
    name: &'static str,
    apply: fn(&str) -> Cow<'_, str>,
}

const RULES: &[Rule] = &[
    Rule {
        name: "list_marker",
        apply: replace_list_marker,
    },
    Rule {
        name: "headers",
        apply: replace_headers,
    },
    Rule {
        name: "bold",
        apply: strip_bold,
    },
    Rule {
        name: "table_separators",
        apply: replace_table_separators,
    },
];

static HEADER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    (1..=MAX_HEADING_LEVEL)
        .map(|level| {
            let run = HEADER_DELIMITER.repeat(level);
            let pattern = format!(r"^{run}(\s+[^=\s](?:.*[^=\s])?\s+){run}\s*$");
            Regex::new(&pattern).expect("header pattern is valid")
        })
        .collect()
});

static BOLD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'''(.+?)'''").expect("bold pattern is valid"));

/// Names of the rewrite rules in the order they run.
pub fn rule_names() -> impl Iterator<Item = &'static str> {
    RULES.iter().map(|rule| rule.name)
}

pub fn translate_line(line: &str) -> String {
    let mut current = line.to_string();
    for rule in RULES {
        let rewritten = match (rule.apply)(&current) {
            Cow::Borrowed(_) => continue,
            Cow::Owned(rewritten) => rewritten,
        };
        trace!(rule = rule.name, "rewrote line");
        current = rewritten;
    }
    current
}

/// Translate every line of `text`, one output line per input line.
pub fn translate_text(text: &str) -> Vec<String> {
    text.lines().map(translate_line).collect()
}

fn replace_list_marker(line: &str) -> Cow<'_, str> {
    match line.strip_prefix(SOURCE_BULLET) {
        Some(rest) => Cow::Owned(format!("{TARGET_BULLET}{rest}")),
        None => Cow::Borrowed(line),
    }
}

// `== Title ==` at level i becomes i+1 section markers followed by the inner
// text. The inner text must be whitespace-padded and its first and last
// visible characters must not be delimiters, so `=== x ===` never reads as a
// padded level 2 heading.
fn replace_headers(line: &str) -> Cow<'_, str> {
    for (index, pattern) in HEADER_PATTERNS.iter().enumerate() {
        if let Some(captures) = pattern.captures(line) {
            let markers = SECTION_MARKER.repeat(index + 2);
            return Cow::Owned(format!("{markers}{}", &captures[1]));
        }
    }
    Cow::Borrowed(line)
}

fn strip_bold(line: &str) -> Cow<'_, str> {
    BOLD_PATTERN.replace_all(line, "$1")
}

// A `||` is a cell separator when it borders a non-empty cell, so the closing
// separator of one cell also opens the next one.
fn replace_table_separators(line: &str) -> Cow<'_, str> {
    let segments: Vec<&str> = line.split(CELL_SEPARATOR).collect();
    if segments.len() < 3 {
        return Cow::Borrowed(line);
    }

    let separators = segments.len() - 1;
    let mut rewrite = vec![false; separators];
    for (index, interior) in segments[1..separators].iter().enumerate() {
        if !interior.is_empty() {
            rewrite[index] = true;
            rewrite[index + 1] = true;
        }
    }
    if !rewrite.contains(&true) {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    for (index, segment) in segments.iter().enumerate() {
        out.push_str(segment);
        if index < separators {
            out.push_str(if rewrite[index] {
                TARGET_CELL_SEPARATOR
            } else {
                CELL_SEPARATOR
            });
        }
    }
    Cow::Owned(out)
}
