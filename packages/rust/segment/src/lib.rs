//! Response segmentation: free-form model answers → titled, verdict-tagged sections.
//!
//! [`segment`] tries an ordered list of splitting strategies and commits to the
//! first one that yields sections:
//! 1. Markdown headers (`#`, `##`, `###` at line start)
//! 2. Emphasized labels (`**Label:**`)
//!
//! If neither applies, the whole answer becomes one untagged section. The
//! result is never empty.

mod verdict;

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use underwriter_shared::{AnalysisSection, Verdict};

use verdict::{CueTable, EMPHASIS_CUES, HEADER_CUES};

/// Title of the single section produced when no structure is found.
pub const FALLBACK_TITLE: &str = "Underwriting Analysis";

/// Content used when a header block has nothing below its title line.
pub const EMPTY_CONTENT: &str = "(No additional detail)";

const NO_RESPONSE_TITLE: &str = "Error";
const NO_RESPONSE_CONTENT: &str = "No response received from the analysis engine.";

/// A splitting strategy. `None` means "does not apply, try the next one".
type Strategy = fn(&str) -> Option<Vec<AnalysisSection>>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("headers", split_by_headers),
    ("emphasis", split_by_emphasis),
];

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Start of a header line: one to three `#` then whitespace.
static HEADER_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,3}\s+").expect("header start regex"));

/// Leading header markers on a title line.
static HEADER_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,3}\s*").expect("header marker regex"));

/// An emphasized span anywhere in the text.
static EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^*]+\*\*").expect("emphasis regex"));

/// An emphasized label at the start of a block, with optional `:` and spacing.
static EMPHASIS_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*([^*]+)\*\*:?\s*").expect("emphasis label regex"));

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Split a model answer into display sections.
///
/// Pure and deterministic. Blank input yields a single `fail` section saying
/// no response was received.
pub fn segment(text: &str) -> Vec<AnalysisSection> {
    if text.trim().is_empty() {
        return vec![AnalysisSection {
            title: NO_RESPONSE_TITLE.into(),
            content: NO_RESPONSE_CONTENT.into(),
            verdict: Some(Verdict::Fail),
        }];
    }

    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| {
            let sections = strategy(text)?;
            debug!(strategy = *name, sections = sections.len(), "answer segmented");
            Some(sections)
        })
        .unwrap_or_else(|| {
            debug!("no structure found, using single section");
            vec![AnalysisSection {
                title: FALLBACK_TITLE.into(),
                content: text.to_string(),
                verdict: None,
            }]
        })
}

/// Render sections back to Markdown, one `##` block per section.
///
/// The verdict, if any, is appended to the header as a bracketed badge.
pub fn to_markdown(sections: &[AnalysisSection]) -> String {
    sections
        .iter()
        .map(|s| match s.verdict {
            Some(v) => format!("## {} [{}]\n\n{}\n", s.title, v.label(), s.content),
            None => format!("## {}\n\n{}\n", s.title, s.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Split before every match start, dropping whitespace-only pieces.
fn split_before<'a>(text: &'a str, re: &Regex) -> Vec<&'a str> {
    let mut starts: Vec<usize> = re.find_iter(text).map(|m| m.start()).collect();
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    starts.push(text.len());

    starts
        .windows(2)
        .map(|w| &text[w[0]..w[1]])
        .filter(|block| !block.trim().is_empty())
        .collect()
}

fn non_empty(sections: Vec<AnalysisSection>) -> Option<Vec<AnalysisSection>> {
    (!sections.is_empty()).then_some(sections)
}

fn section(title: String, content: &str, cues: &CueTable) -> AnalysisSection {
    let content = if content.is_empty() {
        EMPTY_CONTENT.to_string()
    } else {
        content.to_string()
    };
    let verdict = cues.classify(&title, &content);
    AnalysisSection {
        title,
        content,
        verdict,
    }
}

/// Strategy 1: Markdown headers.
///
/// Text before the first header counts as a block of its own, titled by its
/// first line.
fn split_by_headers(text: &str) -> Option<Vec<AnalysisSection>> {
    let blocks = split_before(text, &HEADER_START_RE);
    if blocks.len() <= 1 {
        return None;
    }

    let sections = blocks
        .into_iter()
        .filter_map(|block| {
            let block = block.trim();
            let (first, rest) = block.split_once('\n').unwrap_or((block, ""));
            let title = HEADER_MARKER_RE.replace(first, "").replace('*', "");
            let title = title.trim();
            if title.is_empty() {
                return None;
            }
            Some(section(title.to_string(), rest.trim(), &HEADER_CUES))
        })
        .collect();

    non_empty(sections)
}

/// Strategy 2: emphasized labels such as `**Collectibility:**`.
///
/// Blocks that do not open with an emphasized label are skipped.
fn split_by_emphasis(text: &str) -> Option<Vec<AnalysisSection>> {
    let blocks = split_before(text, &EMPHASIS_RE);
    if blocks.len() <= 1 {
        return None;
    }

    let sections = blocks
        .into_iter()
        .filter_map(|block| {
            let caps = EMPHASIS_LABEL_RE.captures(block)?;
            let title = caps[1].trim().trim_end_matches(':').trim_end();
            if title.is_empty() {
                return None;
            }
            let content = block[caps.get(0)?.end()..].trim();
            Some(section(title.to_string(), content, &EMPHASIS_CUES))
        })
        .collect();

    non_empty(sections)
}
