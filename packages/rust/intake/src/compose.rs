//! Prompt composition: intake form + attachments → narrative text and content parts.
//!
//! Every field is always rendered, in a fixed order, with a placeholder when
//! empty. The single text part comes first; image parts follow in attachment
//! order.

use std::fmt::Write as _;

use underwriter_shared::{
    Attachment, ContentPart, IntakeForm, RepresentationStatus, format_currency,
};

use crate::attachment::strip_data_uri;

const NOT_PROVIDED: &str = "Not provided";
const NOT_SPECIFIED: &str = "Not specified";

/// The fully assembled prompt for one analyze request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    /// Labeled narrative including inlined non-image documents.
    pub narrative: String,
    /// `parts[0]` is the narrative text part; images follow.
    pub parts: Vec<ContentPart>,
}

impl ComposedPrompt {
    /// Number of image parts.
    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, ContentPart::Image { .. }))
            .count()
    }
}

/// Build the narrative and content parts. Pure; no I/O.
pub fn compose(form: &IntakeForm, attachments: &[Attachment]) -> ComposedPrompt {
    let mut narrative = String::from("=== LITIGATION FUNDING APPLICATION ===\n");

    let fields = [
        ("CASE NARRATIVE", or(&form.case_narrative, NOT_PROVIDED)),
        ("JURISDICTION", or(&form.jurisdiction, NOT_SPECIFIED)),
        ("KEY DOCUMENTS & LEGAL BASIS", or(&form.key_documents, NOT_PROVIDED)),
        ("DEFENDANT & ASSET PROFILE", or(&form.defendant_profile, NOT_PROVIDED)),
        ("DAMAGES ESTIMATE", or(&form.damages_estimate, NOT_PROVIDED)),
        ("FUNDING REQUEST (USD)", funding(&form.funding_request)),
        ("LEGAL REPRESENTATION", representation(form)),
    ];
    for (label, value) in fields {
        let _ = write!(narrative, "\n{label}:\n{value}\n");
    }
    // No trailing newline after the last field.
    narrative.pop();

    let mut images = Vec::new();
    if !attachments.is_empty() {
        narrative.push_str("\n\n--- ATTACHED DOCUMENTS ---\n");
        for doc in attachments {
            let content = strip_data_uri(&doc.encoded_content);
            if doc.is_image() {
                images.push(ContentPart::Image {
                    mime_type: doc.mime_type.clone(),
                    encoded_content: content.to_string(),
                });
                let _ = write!(narrative, "\n[Image attachment: {}]", doc.name);
            } else {
                let _ = write!(narrative, "\nDocument: {}\n{content}\n", doc.name);
            }
        }
    }

    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(ContentPart::Text {
        text: narrative.clone(),
    });
    parts.extend(images);

    ComposedPrompt { narrative, parts }
}

fn or(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

/// `$` plus the amount as typed. Only plain digit strings (commas allowed)
/// are regrouped; anything else is forwarded verbatim.
fn funding(raw: &str) -> String {
    let amount = raw.trim();
    if amount.is_empty() {
        return NOT_SPECIFIED.to_string();
    }
    let amount = amount.strip_prefix('$').map_or(amount, str::trim_start);
    let plain_digits = amount.chars().any(|c| c.is_ascii_digit())
        && amount.chars().all(|c| c.is_ascii_digit() || c == ',');
    if plain_digits {
        format!("${}", format_currency(amount))
    } else {
        format!("${amount}")
    }
}

fn representation(form: &IntakeForm) -> String {
    match form.representation() {
        Some(RepresentationStatus::Represented) => {
            let mut out = String::from("Represented");
            let subfields = [
                ("Firm", &form.firm_name),
                ("Lead Attorney", &form.attorney_name),
                ("Fee Structure", &form.fee_structure),
            ];
            for (label, value) in subfields {
                if !value.is_empty() {
                    let _ = write!(out, "\n  {label}: {value}");
                }
            }
            out
        }
        Some(RepresentationStatus::Seeking) => "Seeking Representation".to_string(),
        Some(RepresentationStatus::Preliminary) => {
            "Preliminary Only — exploring options".to_string()
        }
        None => or(&form.representation_status, NOT_SPECIFIED),
    }
}
