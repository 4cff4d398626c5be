//! Query engine seam between the orchestrator and the LM.
//!
//! The orchestrator only needs "determine steps for this source" and "answer
//! this prompt". [`LmQueryEngine`] implements both on top of any
//! [`LmBackend`] by framing prompts with the document text.
mod command;
mod http;
mod response;

pub use command::CommandBackend;
pub use http::{HttpBackend, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use response::{extract_json, parse_answer};

use crate::util::render_template;
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DOCUMENT_FRAME: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/document_frame.md"
));

/// Black-box answering engine consumed by the orchestrator.
///
/// Both calls may be slow and may return malformed JSON.
pub trait QueryEngine {
    /// Ask for the raw step-set JSON describing `source`.
    fn determine_steps(&mut self, source: &Path) -> Result<String>;

    /// Ask a prompt about the current source and return the raw answer text.
    fn answer(&mut self, prompt: &str) -> Result<String>;
}

/// Text completion transport.
pub trait LmBackend {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl LmBackend for Box<dyn LmBackend> {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

#[derive(Debug, Clone)]
struct LoadedDocument {
    name: String,
    text: String,
}

/// Query engine that puts the whole document in front of every prompt.
///
/// Documents are loaded once and reused for later queries on the same path.
pub struct LmQueryEngine<B> {
    backend: B,
    initial_prompt: String,
    documents: BTreeMap<PathBuf, LoadedDocument>,
    active: Option<PathBuf>,
}

impl<B: LmBackend> LmQueryEngine<B> {
    pub fn new(backend: B, initial_prompt: impl Into<String>) -> Self {
        Self {
            backend,
            initial_prompt: initial_prompt.into(),
            documents: BTreeMap::new(),
            active: None,
        }
    }

    /// Load `source` (or reuse it) and make it the subject of later answers.
    pub fn load(&mut self, source: &Path) -> Result<()> {
        if !self.documents.contains_key(source) {
            let bytes =
                fs::read(source).with_context(|| format!("read source {}", source.display()))?;
            let name = source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| source.display().to_string());
            tracing::info!(
                source = %source.display(),
                bytes = bytes.len(),
                "loaded source document"
            );
            self.documents.insert(
                source.to_path_buf(),
                LoadedDocument {
                    name,
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                },
            );
        }
        self.active = Some(source.to_path_buf());
        Ok(())
    }

    fn frame(&self, task: &str) -> Result<String> {
        let document = self
            .active
            .as_ref()
            .and_then(|path| self.documents.get(path))
            .ok_or_else(|| anyhow!("no source document loaded for query"))?;
        Ok(render_template(
            DOCUMENT_FRAME,
            &[
                ("document_name", document.name.as_str()),
                ("document_text", document.text.as_str()),
                ("task", task),
            ],
        ))
    }
}

impl<B: LmBackend> QueryEngine for LmQueryEngine<B> {
    fn determine_steps(&mut self, source: &Path) -> Result<String> {
        self.load(source)?;
        let prompt = self.frame(&self.initial_prompt)?;
        self.backend.complete(&prompt)
    }

    fn answer(&mut self, prompt: &str) -> Result<String> {
        let prompt = self.frame(prompt)?;
        self.backend.complete(&prompt)
    }
}
