//! Keyword and symbol cues that tag a section with a verdict.
//!
//! Matching runs on the lowercased `title + " " + content` and checks pass,
//! then fail, then caution; the first hit wins. Negation is not understood
//! ("not sufficient" still hits `sufficient`).

use std::sync::LazyLock;

use regex::Regex;

use underwriter_shared::Verdict;

/// One regex per verdict, checked in precedence order.
pub(crate) struct CueTable {
    pass: Regex,
    fail: Regex,
    caution: Regex,
}

impl CueTable {
    fn new(pass: &str, fail: &str, caution: &str) -> Self {
        Self {
            pass: Regex::new(pass).expect("pass cue regex"),
            fail: Regex::new(fail).expect("fail cue regex"),
            caution: Regex::new(caution).expect("caution cue regex"),
        }
    }

    pub(crate) fn classify(&self, title: &str, content: &str) -> Option<Verdict> {
        let haystack = format!("{title} {content}").to_lowercase();
        if self.pass.is_match(&haystack) {
            Some(Verdict::Pass)
        } else if self.fail.is_match(&haystack) {
            Some(Verdict::Fail)
        } else if self.caution.is_match(&haystack) {
            Some(Verdict::Caution)
        } else {
            None
        }
    }
}

/// Cues for header-delimited sections.
pub(crate) static HEADER_CUES: LazyLock<CueTable> = LazyLock::new(|| {
    CueTable::new(
        r"✅|verdict:\s*pass|\bpass\b.*complet|recommend.*fund|strong|sufficient",
        r"❌|verdict:\s*fail|decline|do not fund|reject|not recommended",
        r"⚠|verdict:\s*caution|conditional|insufficient|additional.*needed|gaps?\s*identif",
    )
});

/// Cues for emphasis-delimited sections. Broader: bare `pass`/`fail`/`caution`.
pub(crate) static EMPHASIS_CUES: LazyLock<CueTable> = LazyLock::new(|| {
    CueTable::new(
        r"pass|sufficient|strong|recommend.*fund|✅",
        r"fail|decline|reject|not recommended|❌",
        r"caution|conditional|insufficient|gaps|⚠",
    )
});
