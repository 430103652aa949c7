//! Health chat and narrative generation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::context::ClinicalContext;
use crate::error::AssistantResult;
use crate::llm::{LlmClient, LlmMessage};

/// Earlier chat messages sent along with a question.
pub const HISTORY_LIMIT: usize = 20;

pub const CHAT_SYSTEM_PROMPT: &str = "You are Carebridge, an assistant that helps patients \
understand their own health records. Answer in plain language using the record provided. \
If the record does not contain the answer, say so. You do not give medical advice, \
diagnoses or treatment decisions; for those, tell the patient to talk to their care team. \
If something sounds urgent, tell them to contact emergency services.";

pub const NARRATIVE_SYSTEM_PROMPT: &str = "You are Carebridge. Write a short, plain-language \
summary of the patient's health record for the patient to read. Cover ongoing conditions, \
current medications, allergies and notable recent results. Do not speculate beyond the \
record and do not give medical advice.";

const NO_RECORD: &str = "No health record is connected.";

/// Answers questions about a patient's record and writes summaries of it.
#[derive(Clone)]
pub struct AssistantService {
    llm: Arc<dyn LlmClient>,
}

impl AssistantService {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Whether a model is available. When it is not, every call fails with
    /// [`AssistantError::NotConfigured`](crate::AssistantError::NotConfigured).
    pub fn is_configured(&self) -> bool {
        self.llm.is_configured()
    }

    /// Builds the prompt for a chat turn.
    ///
    /// Order: system prompt, patient record, the last [`HISTORY_LIMIT`]
    /// history messages, then the question.
    pub fn chat_messages(
        question: &str,
        history: &[LlmMessage],
        context: Option<&ClinicalContext>,
    ) -> Vec<LlmMessage> {
        let mut messages = vec![LlmMessage::system(CHAT_SYSTEM_PROMPT)];
        messages.push(LlmMessage::system(record_block(context)));

        let skip = history.len().saturating_sub(HISTORY_LIMIT);
        messages.extend(history.iter().skip(skip).cloned());
        messages.push(LlmMessage::user(question));
        messages
    }

    /// Answers `question` given earlier `history` and the patient's record.
    pub async fn answer(
        &self,
        question: &str,
        history: &[LlmMessage],
        context: Option<&ClinicalContext>,
    ) -> AssistantResult<String> {
        let messages = Self::chat_messages(question, history, context);
        debug!(
            history = history.len().min(HISTORY_LIMIT),
            has_record = context.is_some(),
            "Answering chat question"
        );
        self.llm.complete(&messages).await
    }

    /// Writes a plain-language summary of the record.
    pub async fn narrative(&self, context: &ClinicalContext) -> AssistantResult<String> {
        let messages = vec![
            LlmMessage::system(NARRATIVE_SYSTEM_PROMPT),
            LlmMessage::user(record_block(Some(context))),
        ];
        let narrative = self.llm.complete(&messages).await?;
        info!(
            chars = narrative.len(),
            truncated_record = context.truncated,
            "Generated health narrative"
        );
        Ok(narrative)
    }
}

fn record_block(context: Option<&ClinicalContext>) -> String {
    match context {
        Some(context) if !context.is_empty() => {
            let mut block = format!("Patient health record:\n{}", context.text);
            if context.truncated {
                block.push_str("\n(Record shortened; some entries are not shown.)");
            }
            block
        }
        _ => NO_RECORD.to_string(),
    }
}
