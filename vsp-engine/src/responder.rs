//! Context-specific response rendering.
//!
//! Each clinical context speaks with its own persona: the patient's companion
//! during anamnesis, the examining physician's objective findings during the
//! exam, and the resident reporting results in the labs context. The persona
//! for a context is resolved once at construction through [`ResponderSet`];
//! queries dispatch through the [`Responder`] trait.

use vsp_case::ClinicalContext;

/// One revealed datum handed to a responder for rendering.
#[derive(Debug, Clone)]
pub struct ClinicalDatum {
    pub label: String,
    pub summary: String,
    pub content: String,
}

/// Renders responses for one clinical context.
pub trait Responder: Send + Sync {
    /// Render a response for newly revealed data. `data` is never empty.
    fn respond(&self, query: &str, data: &[ClinicalDatum]) -> String;

    /// Line used when the query revealed nothing new.
    fn no_discovery_line(&self, already_revealed: bool) -> String;

    /// Line used when the classified intent was rejected by the context
    /// allow-list.
    fn context_filtered_line(&self) -> String;

    /// Line used when the query could not be classified at all.
    fn clarification_line(&self) -> String;
}

/// The patient's companion answering history questions.
#[derive(Debug, Default)]
pub struct CompanionResponder;

impl Responder for CompanionResponder {
    fn respond(&self, _query: &str, data: &[ClinicalDatum]) -> String {
        data.iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn no_discovery_line(&self, already_revealed: bool) -> String {
        if already_revealed {
            "I've already provided that information earlier in our conversation. \
             Is there anything specific you'd like me to clarify or expand on?"
                .to_string()
        } else {
            "I'm not sure I have more information about that right now.".to_string()
        }
    }

    fn context_filtered_line(&self) -> String {
        "I can help you with information about the patient's history and symptoms. \
         What would you like to know?"
            .to_string()
    }

    fn clarification_line(&self) -> String {
        "I'm not sure I understood your question completely. \
         Could you be more specific about what you'd like to know?"
            .to_string()
    }
}

/// Objective findings reported directly, no persona voice.
#[derive(Debug, Default)]
pub struct ExamResponder;

impl Responder for ExamResponder {
    fn respond(&self, _query: &str, data: &[ClinicalDatum]) -> String {
        data.iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn no_discovery_line(&self, _already_revealed: bool) -> String {
        "That examination finding is not available in this case.".to_string()
    }

    fn context_filtered_line(&self) -> String {
        "What aspect of the physical examination would you like me to perform?".to_string()
    }

    fn clarification_line(&self) -> String {
        "Could you clarify which examination you'd like me to perform?".to_string()
    }
}

/// The resident reporting laboratory and imaging results.
#[derive(Debug, Default)]
pub struct LabsResponder;

impl Responder for LabsResponder {
    fn respond(&self, _query: &str, data: &[ClinicalDatum]) -> String {
        data.iter()
            .map(|d| format!("{}: {}", d.label, d.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn no_discovery_line(&self, _already_revealed: bool) -> String {
        "That test hasn't been performed at this time.".to_string()
    }

    fn context_filtered_line(&self) -> String {
        "What laboratory tests or imaging studies would you like me to order or review \
         for this patient?"
            .to_string()
    }

    fn clarification_line(&self) -> String {
        "I'm not sure I understand. Could you clarify what test or imaging you're asking about?"
            .to_string()
    }
}

/// Per-context responders, resolved once at construction.
pub struct ResponderSet {
    anamnesis: Box<dyn Responder>,
    exam: Box<dyn Responder>,
    labs: Box<dyn Responder>,
}

impl ResponderSet {
    /// The default persona assignment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            anamnesis: Box::new(CompanionResponder),
            exam: Box::new(ExamResponder),
            labs: Box::new(LabsResponder),
        }
    }

    /// Replace the responder for one context.
    #[must_use]
    pub fn with_responder(mut self, context: ClinicalContext, responder: Box<dyn Responder>) -> Self {
        match context {
            ClinicalContext::Anamnesis => self.anamnesis = responder,
            ClinicalContext::Exam => self.exam = responder,
            ClinicalContext::Labs => self.labs = responder,
        }
        self
    }

    #[must_use]
    pub fn for_context(&self, context: ClinicalContext) -> &dyn Responder {
        match context {
            ClinicalContext::Anamnesis => self.anamnesis.as_ref(),
            ClinicalContext::Exam => self.exam.as_ref(),
            ClinicalContext::Labs => self.labs.as_ref(),
        }
    }
}

impl Default for ResponderSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum(label: &str, content: &str) -> ClinicalDatum {
        ClinicalDatum {
            label: label.to_string(),
            summary: content.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn labs_responder_prefixes_labels() {
        let set = ResponderSet::new();
        let text = set.for_context(ClinicalContext::Labs).respond(
            "cbc please",
            &[datum("Blood Results", "WBC 9.8, Hgb 10.2.")],
        );
        assert_eq!(text, "Blood Results: WBC 9.8, Hgb 10.2.");
    }

    #[test]
    fn exam_responder_concatenates_findings() {
        let set = ResponderSet::new();
        let text = set.for_context(ClinicalContext::Exam).respond(
            "listen to lungs",
            &[
                datum("Lung Examination", "Bibasilar crackles."),
                datum("Vital Signs", "RR 24."),
            ],
        );
        assert_eq!(text, "Bibasilar crackles. RR 24.");
    }

    #[test]
    fn fallback_lines_distinguish_already_revealed() {
        let set = ResponderSet::new();
        let responder = set.for_context(ClinicalContext::Anamnesis);
        assert!(responder.no_discovery_line(true).contains("already provided"));
        assert!(responder.no_discovery_line(false).contains("not sure"));
    }
}
