//! Postback URL templates.
//!
//! A template is an endpoint URL with `{name}` placeholders. Rendering it
//! with a data item replaces each placeholder by the URL-encoded value of
//! `name`, producing one [`DeliveryInstruction`].

use crate::error::TemplateError;
use crate::instruction::DeliveryInstruction;
use regex::Regex;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\w*\}").unwrap());

/// Endpoint method plus a URL with `{name}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostbackTemplate {
    method: String,
    url: String,
    placeholders: Vec<String>,
}

impl PostbackTemplate {
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        let url = url.into();
        let placeholders = PLACEHOLDER
            .find_iter(&url)
            .map(|m| m.as_str().to_string())
            .collect();

        Self {
            method: method.as_ref().to_uppercase(),
            url,
            placeholders,
        }
    }

    /// Render the template for one data item.
    ///
    /// An empty data item leaves the URL untouched, so any placeholder in it
    /// then fails the final `{`/`}` check. Empty values count as unknown.
    pub fn render(&self, data: &HashMap<String, String>) -> Result<DeliveryInstruction, TemplateError> {
        let mut rendered = self.url.clone();

        if !data.is_empty() {
            for placeholder in &self.placeholders {
                let name = placeholder.trim_start_matches('{').trim_end_matches('}');
                let value = data
                    .get(name)
                    .filter(|value| !value.is_empty())
                    .ok_or_else(|| TemplateError::UnknownParameter(name.to_string()))?;

                rendered = rendered.replace(placeholder.as_str(), &urlencoding::encode(value));
            }
        }

        if rendered.contains(['{', '}']) {
            return Err(TemplateError::MissingParameters(rendered));
        }

        Url::parse(&rendered).map_err(|e| TemplateError::InvalidUrl {
            url: rendered.clone(),
            details: e.to_string(),
        })?;

        Ok(DeliveryInstruction::new(&self.method, rendered))
    }

    /// Render every data item, stopping at the first failure
    pub fn render_all(&self, items: &[HashMap<String, String>]) -> Result<Vec<DeliveryInstruction>, TemplateError> {
        items.iter().map(|item| self.render(item)).collect()
    }
}
