//! MiniJinja-based renderer for Deckhand charts

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;

pub use engine::{Engine, EngineBuilder, RenderResult, TemplateEngine};
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
