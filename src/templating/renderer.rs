//! Template rendering engine with Tera.

use anyhow::Result;
use regex::Regex;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::TemplateVars;
use crate::core::ContainerCiError;

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Renders config strings against a fixed [`TemplateVars`] set.
///
/// The tera context is built once per renderer, so create one renderer per variable
/// set (per resolve, per job, per container) and reuse it for every field.
pub struct TemplateRenderer {
    vars: TemplateVars,
    context: TeraContext,
}

impl TemplateRenderer {
    /// Create a renderer for the given variables.
    pub fn new(vars: &TemplateVars) -> Self {
        Self {
            vars: vars.clone(),
            context: vars.to_tera_context(),
        }
    }

    /// The variables this renderer resolves against.
    pub fn vars(&self) -> &TemplateVars {
        &self.vars
    }

    /// Render a single template string.
    ///
    /// `${NAME}` references are expanded first; unknown names are left untouched so a
    /// later shell can still see them. The result then goes through tera when it
    /// contains template syntax. Undefined tera variables are an error.
    pub fn render(&self, template: &str) -> Result<String> {
        let expanded = if template.contains("${") {
            shellexpand::env_with_context_no_errors(template, |name| self.vars.get(name))
                .into_owned()
        } else {
            template.to_string()
        };

        if !Self::has_template_syntax(&expanded) {
            return Ok(expanded);
        }

        Tera::one_off(&expanded, &self.context, false).map_err(|e| {
            tracing::debug!("Failed to render template: {}", template);
            ContainerCiError::Template {
                message: self.describe_error(&e),
            }
            .into()
        })
    }

    /// Render every template of a list, preserving order.
    pub fn render_all(&self, templates: &[String]) -> Result<Vec<String>> {
        templates.iter().map(|template| self.render(template)).collect()
    }

    /// Render an optional template.
    pub fn render_opt(&self, template: Option<&str>) -> Result<Option<String>> {
        template.map(|t| self.render(t)).transpose()
    }

    fn has_template_syntax(content: &str) -> bool {
        content.contains("{{") || content.contains("{%") || content.contains("{#")
    }

    fn describe_error(&self, error: &tera::Error) -> String {
        let message = Self::format_tera_error(error);
        let Some(name) = Self::extract_variable_name(&message) else {
            return message;
        };

        let suggestions = Self::find_similar_variables(&name, &self.vars.names());
        if suggestions.is_empty() {
            message
        } else {
            format!("{message}\n  did you mean: {}", suggestions.join(", "))
        }
    }

    /// Extract variable name from "Variable `foo` not found" message
    fn extract_variable_name(error_msg: &str) -> Option<String> {
        let re = Regex::new(r"Variable `([^`]+)` not found").ok()?;
        re.captures(error_msg).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
    }

    /// Find similar variable names using Levenshtein distance
    fn find_similar_variables(target: &str, available: &[&str]) -> Vec<String> {
        let mut scored: Vec<_> =
            available.iter().map(|var| (*var, levenshtein(target, var))).collect();

        scored.sort_by_key(|(_, dist)| *dist);

        scored
            .into_iter()
            .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .take(3)
            .map(|(var, _)| var.to_string())
            .collect()
    }

    /// Flatten a tera error chain, dropping tera's internal one-off template name.
    pub fn format_tera_error(error: &tera::Error) -> String {
        use std::error::Error;

        let mut all_messages = vec![error.to_string()];
        let mut current_error: Option<&dyn Error> = error.source();
        while let Some(err) = current_error {
            all_messages.push(err.to_string());
            current_error = err.source();
        }

        let messages: Vec<String> = all_messages
            .into_iter()
            .map(|msg| {
                msg.replace("while rendering '__tera_one_off'", "")
                    .replace("Failed to render '__tera_one_off'", "Template rendering failed")
                    .replace("Failed to parse '__tera_one_off'", "Template syntax error")
                    .replace("'__tera_one_off'", "template")
                    .trim()
                    .to_string()
            })
            .filter(|cleaned| {
                !cleaned.is_empty()
                    && cleaned != "Template rendering failed"
                    && cleaned != "Template syntax error"
            })
            .collect();

        if messages.is_empty() {
            "Template syntax error".to_string()
        } else {
            messages.join("\n  → ")
        }
    }
}
