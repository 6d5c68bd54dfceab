//! Prompt rendering for the question-answering path.

use std::path::Path;

const QUESTION_PLACEHOLDER: &str = "{{question}}";
const DOCUMENTS_PLACEHOLDER: &str = "{{documents}}";

const DEFAULT_TEMPLATE: &str = "You answer questions about the articles of a technical blog.\n\
Use only the excerpts below. If they do not contain the answer, say that you do not know.\n\
\n\
{{documents}}\n\
Question: {{question}}\n";

/// Template with `{{question}}` and `{{documents}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    separator: String,
}

impl PromptTemplate {
    /// Built-in template wrapping excerpts in `<separator>` tags.
    pub fn new(separator: impl Into<String>) -> Self {
        Self::with_template(DEFAULT_TEMPLATE, separator)
    }

    /// Use a custom template body.
    pub fn with_template(template: impl Into<String>, separator: impl Into<String>) -> Self {
        let template = template.into();
        if !template.contains(QUESTION_PLACEHOLDER) {
            tracing::warn!("Prompt template has no {{{{question}}}} placeholder");
        }
        Self {
            template,
            separator: separator.into(),
        }
    }

    /// Load a template body from disk.
    pub fn from_file(path: &Path, separator: impl Into<String>) -> std::io::Result<Self> {
        let template = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded prompt template");
        Ok(Self::with_template(template, separator))
    }

    /// Wrap one excerpt in separator tags.
    pub fn excerpt(&self, content: &str) -> String {
        format!(
            "<{sep}>\n{content}\n</{sep}>\n",
            sep = self.separator
        )
    }

    /// Fill the placeholders with `question` and the wrapped `excerpts`.
    pub fn render<'a, I>(&self, question: &str, excerpts: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let documents: String = excerpts
            .into_iter()
            .map(|content| self.excerpt(content))
            .collect();
        self.template
            .replace(DOCUMENTS_PLACEHOLDER, &documents)
            .replace(QUESTION_PLACEHOLDER, question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn excerpts_are_wrapped_in_separator_tags() {
        let template = PromptTemplate::with_template("{{documents}}|{{question}}", "document");
        let prompt = template.render("Why?", ["first", "second"]);
        assert_eq!(
            prompt,
            "<document>\nfirst\n</document>\n<document>\nsecond\n</document>\n|Why?"
        );
    }

    #[test]
    fn custom_separator_is_used() {
        let template = PromptTemplate::new("excerpt");
        let prompt = template.render("How do I log in?", ["Use SSO."]);
        assert!(prompt.contains("<excerpt>\nUse SSO.\n</excerpt>\n"));
        assert!(prompt.contains("Question: How do I log in?"));
    }

    #[test]
    fn question_text_is_not_reinterpreted() {
        let template = PromptTemplate::with_template("{{question}} {{documents}}", "d");
        let prompt = template.render("what is {{documents}}?", std::iter::empty());
        assert_eq!(prompt, "what is {{documents}}? ");
    }

    #[test]
    fn template_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"Q={{question}}\n{{documents}}").expect("write");
        let template = PromptTemplate::from_file(file.path(), "doc").expect("template");
        assert_eq!(template.render("x", ["y"]), "Q=x\n<doc>\ny\n</doc>\n");
    }
}
