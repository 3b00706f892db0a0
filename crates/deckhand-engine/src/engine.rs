//! Template engine based on MiniJinja

use deckhand_core::{Chart, ReleaseOptions, RenderContext, Values};
use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeMap;

use crate::error::{EngineError, Result, TemplateError};
use crate::filters;
use crate::functions;

/// Template that renders into the release notes
const NOTES_TEMPLATE: &str = "NOTES.txt";

/// Template name suffixes dropped from the output path
const TEMPLATE_SUFFIXES: &[&str] = &[".j2", ".jinja2"];

/// Result of rendering a chart
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderResult {
    /// Rendered documents keyed by path relative to `templates/`
    pub manifests: BTreeMap<String, String>,

    /// Rendered `NOTES.txt`, if the chart has one
    pub notes: Option<String>,
}

impl RenderResult {
    /// Concatenate every document into one manifest stream
    ///
    /// Each document is preceded by a `# Source:` line naming its template,
    /// in path order.
    pub fn manifest_stream(&self, chart_name: &str) -> String {
        let mut out = String::new();
        for (path, content) in &self.manifests {
            out.push_str("---\n");
            out.push_str(&format!("# Source: {}/templates/{}\n", chart_name, path));
            out.push_str(content.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Expands a chart into its Rendered Output Set
///
/// The orchestrator and CLI depend on this trait so tests can substitute
/// a canned renderer.
pub trait TemplateEngine {
    /// Render every template of `chart` against a prepared context
    fn render_chart(&self, chart: &Chart, context: &RenderContext) -> Result<RenderResult>;

    /// Render `chart` for a release, layering `overrides` over the chart defaults
    fn render(
        &self,
        chart: &Chart,
        overrides: &Values,
        release: ReleaseOptions,
    ) -> Result<RenderResult> {
        let context = RenderContext::new(chart, overrides, release);
        self.render_chart(chart, &context)
    }
}

/// Template engine builder
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// The MiniJinja-backed engine
#[derive(Debug, Clone)]
pub struct Engine {
    strict_mode: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Engine {
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        env.set_undefined_behavior(if self.strict_mode {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        });
        env.set_keep_trailing_newline(true);

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("indent", filters::indent);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("required", filters::required);
        env.add_filter("trunc", filters::trunc);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);
        env.add_filter("sha256", filters::sha256);

        env.add_function("fail", functions::fail);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);
        env.add_function("tostring", functions::tostring);
        env.add_function("now", functions::now);

        env
    }

    /// Render a single template string
    pub fn render_string(
        &self,
        template: &str,
        context: &RenderContext,
        template_name: &str,
    ) -> Result<String> {
        let mut env = self.create_environment();
        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template))?;

        let tmpl = env
            .get_template(template_name)
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template))?;

        tmpl.render(template_context(context))
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template).into())
    }
}

impl TemplateEngine for Engine {
    fn render_chart(&self, chart: &Chart, context: &RenderContext) -> Result<RenderResult> {
        let mut env = self.create_environment();

        // Every template is registered first so helpers resolve through include/import
        for (name, source) in &chart.templates {
            env.add_template_owned(name.clone(), source.clone())
                .map_err(|e| TemplateError::from_minijinja(e, name, source))?;
        }

        let ctx = template_context(context);
        let mut result = RenderResult::default();
        let mut sources: BTreeMap<String, &str> = BTreeMap::new();

        for (name, source) in &chart.templates {
            if is_helper(name) {
                continue;
            }

            let rendered = env
                .get_template(name)
                .and_then(|tmpl| tmpl.render(&ctx))
                .map_err(|e| EngineError::from(TemplateError::from_minijinja(e, name, source)))?;

            if name == NOTES_TEMPLATE {
                result.notes = Some(rendered);
                continue;
            }

            let trimmed = rendered.trim();
            if trimmed.is_empty() || trimmed == "---" {
                tracing::debug!(template = %name, "template rendered empty, skipping");
                continue;
            }

            let output = output_name(name);
            if let Some(first) = sources.insert(output.clone(), name.as_str()) {
                return Err(EngineError::DuplicateOutput {
                    output,
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
            result.manifests.insert(output, rendered);
        }

        tracing::debug!(
            chart = %chart.name(),
            documents = result.manifests.len(),
            "rendered chart"
        );

        Ok(result)
    }
}

fn template_context(context: &RenderContext) -> minijinja::Value {
    minijinja::context! {
        values => &context.values,
        release => &context.release,
        chart => &context.chart,
        capabilities => &context.capabilities,
    }
}

/// Helper templates have a file name starting with `_`
fn is_helper(name: &str) -> bool {
    name.rsplit('/').next().is_some_and(|file| file.starts_with('_'))
}

fn output_name(name: &str) -> String {
    TEMPLATE_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
        .to_string()
}
