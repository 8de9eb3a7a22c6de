//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to
//! embedded defaults, and renders them with Handlebars.

use std::path::PathBuf;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use tracing::debug;

use super::embedded;

/// Loads and renders prompt templates
///
/// Strict mode is on: a template referencing a placeholder the caller did
/// not supply is a render error, not silently-empty output.
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// User override directory (e.g. `.museflow/prompts/`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader; `override_dir` of None means embedded prompts only
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        debug!(?override_dir, "PromptLoader::new: called");
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(true);
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs, override_dir }
    }

    /// Resolve the template body: override file first, then embedded
    fn template_body(&self, name: &str) -> Result<String> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(format!("{}.md", name));
            if path.exists() {
                debug!(%name, path = %path.display(), "template_body: using override file");
                return Ok(std::fs::read_to_string(&path)?);
            }
        }

        embedded::get(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Unknown prompt template: {}", name))
    }

    /// Render a template with the given data
    pub fn render(&self, name: &str, data: &serde_json::Value) -> Result<String> {
        debug!(%name, "render: called");
        let body = self.template_body(name)?;
        self.hbs
            .render_template(&body, data)
            .map_err(|e| eyre!("Failed to render prompt '{}': {}", name, e))
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_embedded_with_data() {
        let loader = PromptLoader::default();
        let rendered = loader
            .render(
                "step-execution",
                &json!({ "step_index": 0, "task": "find songs", "action": "search broadly" }),
            )
            .unwrap();

        assert!(rendered.contains("step 0"));
        assert!(rendered.contains("find songs"));
        assert!(rendered.contains("search broadly"));
    }

    #[test]
    fn test_render_missing_placeholder_fails() {
        let loader = PromptLoader::default();
        let result = loader.render("step-execution", &json!({ "task": "t" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_template_fails() {
        let loader = PromptLoader::default();
        assert!(loader.render("does-not-exist", &json!({})).is_err());
    }

    #[test]
    fn test_override_file_wins() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("plan-generation.md"), "custom planning prompt").unwrap();

        let loader = PromptLoader::new(Some(temp.path().to_path_buf()));
        let rendered = loader.render("plan-generation", &json!({})).unwrap();
        assert_eq!(rendered, "custom planning prompt");
    }

    #[test]
    fn test_missing_override_falls_back_to_embedded() {
        let temp = tempfile::tempdir().unwrap();
        let loader = PromptLoader::new(Some(temp.path().to_path_buf()));
        let rendered = loader.render("idea-coach", &json!({})).unwrap();
        assert!(rendered.contains("idea coach"));
    }
}
