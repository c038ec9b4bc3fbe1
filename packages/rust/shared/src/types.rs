//! Core domain types: intake form, attachments, prompt parts, analysis sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UnderwriterError};

// ---------------------------------------------------------------------------
// IntakeForm
// ---------------------------------------------------------------------------

/// The case-description fields collected before analysis.
///
/// Every field is free text and defaults to empty; the compositor renders
/// empty fields as placeholders so the model always sees the same schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntakeForm {
    /// What happened, how it was discovered, key facts.
    pub case_narrative: String,
    /// Court or jurisdiction where the case is or would be filed.
    pub jurisdiction: String,
    /// Primary legal basis and supporting documents.
    pub key_documents: String,
    /// Defendant identity, assets, insurance, financial condition.
    pub defendant_profile: String,
    /// Estimated damages with methodology.
    pub damages_estimate: String,
    /// Requested funding amount in USD, as typed.
    pub funding_request: String,
    /// `represented`, `seeking`, `preliminary`, or anything else (passed through).
    pub representation_status: String,
    /// Only meaningful when represented.
    pub firm_name: String,
    pub attorney_name: String,
    pub fee_structure: String,
}

impl IntakeForm {
    /// Check the fields that must be present before a submission is allowed.
    pub fn validate(&self) -> Result<()> {
        if self.case_narrative.trim().is_empty() {
            return Err(UnderwriterError::validation("Case narrative is required."));
        }
        if self.funding_request.trim().is_empty() {
            return Err(UnderwriterError::validation("Funding request is required."));
        }
        Ok(())
    }

    /// Parsed representation status, if it is one of the recognized values.
    pub fn representation(&self) -> Option<RepresentationStatus> {
        self.representation_status.parse().ok()
    }
}

/// Recognized values of [`IntakeForm::representation_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationStatus {
    /// Counsel is engaged.
    Represented,
    /// Looking for counsel.
    Seeking,
    /// Exploring options only.
    Preliminary,
}

impl std::str::FromStr for RepresentationStatus {
    type Err = UnderwriterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "represented" => Ok(Self::Represented),
            "seeking" => Ok(Self::Seeking),
            "preliminary" => Ok(Self::Preliminary),
            other => Err(UnderwriterError::parse(format!(
                "unknown representation status '{other}'"
            ))),
        }
    }
}

/// Format a typed amount as en-US grouped digits (`"1250000"` → `"1,250,000"`).
///
/// All non-digit characters are dropped first; returns an empty string when no
/// digits remain. Meant for a numeric input field, where the user sees the
/// result; never apply it to free text such as `"2.5 million"`.
pub fn format_currency(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return if raw.chars().any(|c| c.is_ascii_digit()) {
            "0".into()
        } else {
            String::new()
        };
    }

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// An encoded user file. Serialized as `{name, type, content}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name.
    pub name: String,
    /// Declared or guessed MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Standard base64 of the raw bytes.
    #[serde(rename = "content")]
    pub encoded_content: String,
}

impl Attachment {
    /// Images travel as their own prompt part; everything else is inlined.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Inbound analyze payload: the form fields plus optional attachments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(flatten)]
    pub form: IntakeForm,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

// ---------------------------------------------------------------------------
// ContentPart
// ---------------------------------------------------------------------------

/// One unit of a multi-modal prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        mime_type: String,
        encoded_content: String,
    },
}

// ---------------------------------------------------------------------------
// Analysis output
// ---------------------------------------------------------------------------

/// Classification attached to a section of the model's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    Caution,
}

impl Verdict {
    /// Badge text for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "DECLINE",
            Self::Caution => "CAUTION",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
            Self::Caution => write!(f, "caution"),
        }
    }
}

/// One titled unit of the model's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

/// Successful outcome of one analyze invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Segmented answer, never empty.
    pub sections: Vec<AnalysisSection>,
    /// The model's answer as received.
    pub raw_text: String,
    /// Model identifier (or the remote server URL when analyzed remotely).
    pub model: String,
    /// Number of attachments sent with the prompt.
    pub attachment_count: usize,
    /// Wall-clock time of the model round trip, in milliseconds.
    pub elapsed_ms: u64,
    pub generated_at: DateTime<Utc>,
}
