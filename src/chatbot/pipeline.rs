//! Reply pipeline: primary model → secondary model → local search → escalation.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chatbot::journal::Journal;
use crate::chatbot::knowledge::KnowledgeStore;
use crate::chatbot::provider::{invoke, CompletionProvider, OpenAiCompatible};
use crate::chatbot::search::search;
use crate::config::{Config, Contacts};

/// A provider paired with the model it is asked for.
pub struct ProviderStage {
    pub provider: Arc<dyn CompletionProvider>,
    pub model: String,
}

impl ProviderStage {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

/// Answers user questions. Stateless between calls; share it behind an `Arc`.
pub struct ReplyPipeline {
    data_dir: PathBuf,
    contacts: Contacts,
    journal: Journal,
    /// Tried in order, each exactly once per request.
    stages: Vec<ProviderStage>,
}

impl ReplyPipeline {
    pub fn new(data_dir: impl Into<PathBuf>, contacts: Contacts, stages: Vec<ProviderStage>) -> Self {
        let data_dir = data_dir.into();
        Self {
            journal: Journal::new(data_dir.clone()),
            data_dir,
            contacts,
            stages,
        }
    }

    /// Build provider clients for every configured credential, primary first.
    pub fn from_config(config: &Config) -> Self {
        let stages = [&config.primary, &config.secondary]
            .into_iter()
            .flatten()
            .filter_map(|p| match OpenAiCompatible::from_config(p) {
                Ok(client) => {
                    info!("Provider enabled: {} ({}, timeout {:?})", p.label, p.model, p.timeout);
                    let provider: Arc<dyn CompletionProvider> = Arc::new(client);
                    Some(ProviderStage::new(provider, p.model.clone()))
                }
                Err(e) => {
                    warn!("Provider {} disabled: {e}", p.label);
                    None
                }
            })
            .collect::<Vec<_>>();

        if stages.is_empty() {
            warn!("No model providers configured, answering from local data only");
        }

        Self::new(config.data_dir.clone(), config.contacts.clone(), stages)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn contacts(&self) -> &Contacts {
        &self.contacts
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Produce a reply for `user_message`. Never fails: the last resort is the
    /// escalation message.
    pub async fn generate_reply(&self, user_message: &str) -> String {
        let knowledge = KnowledgeStore::load(&self.data_dir, |e| {
            let note = format!("Failed reading {}", e.path.display());
            self.note_failure("", &note, Some(&e));
        });
        let prompt = system_prompt(&self.contacts, &knowledge.compact_summary());

        for stage in &self.stages {
            let name = stage.provider.name();
            match invoke(stage.provider.as_ref(), &stage.model, &prompt, user_message).await {
                Ok(reply) => {
                    info!("✅ {} answered ({})", name, stage.model);
                    self.persist_exchange(user_message, &reply);
                    return self.with_channel(&reply);
                }
                Err(e) => {
                    warn!("⚠️ {} failed: {}", name, e);
                    self.note_failure(user_message, &format!("{name} failed"), Some(&e));
                }
            }
        }

        if let Some(found) = search(&knowledge, user_message) {
            info!("📚 Answered from local data");
            self.persist_exchange(user_message, &found);
            return self.with_channel(&found);
        }

        warn!("All layers failed, escalating to {}", self.contacts.admin);
        self.note_failure(user_message, "All layers failed", None);
        escalation_message(&self.contacts)
    }

    fn with_channel(&self, reply: &str) -> String {
        format!("{}\n\n📢 {}", reply, self.contacts.channel)
    }

    // Journal writes are best-effort: the result is dropped here and never
    // reaches the caller.
    fn persist_exchange(&self, user_message: &str, reply: &str) {
        if let Err(e) = self.journal.record_exchange(user_message, reply) {
            debug!("Exchange not saved: {e}");
        }
    }

    fn note_failure(&self, user_message: &str, note: &str, cause: Option<&dyn Error>) {
        if let Err(e) = self.journal.record_failure(user_message, note, cause) {
            debug!("Diagnostic not saved: {e}");
        }
    }
}

/// Terminal reply when nothing could answer.
pub fn escalation_message(contacts: &Contacts) -> String {
    format!("⚠️ Couldn't find an answer. Contact admins: {}", contacts.admin)
}

pub fn system_prompt(contacts: &Contacts, knowledge: &str) -> String {
    let Contacts { admin, modules, .. } = contacts;

    format!(
        r#"
You are Savvy Chatbot, a helpful, concise assistant for Addis Ababa University (AAU) students.
Prefer AAU knowledge below for AAU questions; use general knowledge otherwise.

If about promotions, events, announcements, persons, or absent from AAU data: Direct to official bot {admin}.
If about course modules/study materials: Direct to {modules}.
Be concise, avoid hallucinations; be transparent if uncertain.

AAU Knowledge (compact):
{knowledge}
"#
    )
}
