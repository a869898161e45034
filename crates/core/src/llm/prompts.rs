use crate::config::Settings;
use crate::error::{ensure_valid, MacroError, Result};
use std::borrow::Cow;
use std::path::PathBuf;

pub const INPUT_PLACEHOLDER: &str = "{{INPUT_JSON}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptName {
    MacroQuad,
    DailyReport,
    StockOpinion,
}

impl PromptName {
    pub fn file_name(self) -> &'static str {
        match self {
            PromptName::MacroQuad => "macro-quad-v1.prompt",
            PromptName::DailyReport => "macro-report-daily-v1.prompt",
            PromptName::StockOpinion => "stock-opinion-v1.prompt",
        }
    }

    fn embedded(self) -> &'static str {
        match self {
            PromptName::MacroQuad => include_str!("../../prompts/macro-quad-v1.prompt"),
            PromptName::DailyReport => include_str!("../../prompts/macro-report-daily-v1.prompt"),
            PromptName::StockOpinion => include_str!("../../prompts/stock-opinion-v1.prompt"),
        }
    }
}

/// Prompt templates, compiled in. A directory override replaces individual
/// templates by file name; files that are absent there fall back to the
/// built-in text.
#[derive(Debug, Clone, Default)]
pub struct PromptStore {
    override_dir: Option<PathBuf>,
}

impl PromptStore {
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self { override_dir }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.prompt_dir.as_ref().map(PathBuf::from))
    }

    pub async fn template(&self, name: PromptName) -> Result<Cow<'static, str>> {
        let Some(dir) = &self.override_dir else {
            return Ok(Cow::Borrowed(name.embedded()));
        };

        let path = dir.join(name.file_name());
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Cow::Owned(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "prompt override missing; using built-in");
                Ok(Cow::Borrowed(name.embedded()))
            }
            Err(source) => Err(MacroError::Storage {
                op: "read prompt",
                path,
                source,
            }),
        }
    }

    /// Loads the template and substitutes `input_json` at its placeholder.
    pub async fn render(&self, name: PromptName, input_json: &str) -> Result<String> {
        let template = self.template(name).await?;
        render(&template, input_json)
    }
}

pub fn render(template: &str, input_json: &str) -> Result<String> {
    let count = template.matches(INPUT_PLACEHOLDER).count();
    ensure_valid!(
        count == 1,
        "prompt template must contain exactly one {INPUT_PLACEHOLDER} (found {count})"
    );
    Ok(template.replacen(INPUT_PLACEHOLDER, input_json, 1))
}
