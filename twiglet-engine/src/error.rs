//! Error types for twiglet-engine.

use std::error::Error as StdError;

use thiserror::Error;

/// All errors that can arise from compiling or rendering templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template text does not match the tag or expression grammar.
    #[error("syntax error in {template} at line {line}: {message}")]
    Syntax {
        template: String,
        line: usize,
        message: String,
    },

    /// No loader could resolve the template name.
    #[error("Template {name} not found")]
    NotFound { name: String },

    /// A `{% name %}` tag nobody registered.
    #[error("unknown tag `{name}` in {template} at line {line}")]
    UnknownTag {
        template: String,
        name: String,
        line: usize,
    },

    #[error("unknown filter `{0}`")]
    UnknownFilter(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    /// Evaluation failed (bad operand types, wrong argument count, …).
    #[error("{0}")]
    Runtime(String),

    /// An extension tag failed with its own error type.
    #[error("{tag}: {source}")]
    Extension {
        tag: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl TemplateError {
    pub fn runtime(message: impl Into<String>) -> Self {
        TemplateError::Runtime(message.into())
    }

    /// Wrap an error raised by the extension tag `tag`.
    pub fn extension(tag: &str, source: impl StdError + Send + Sync + 'static) -> Self {
        TemplateError::Extension {
            tag: tag.to_string(),
            source: Box::new(source),
        }
    }

    /// The typed source of an [`TemplateError::Extension`] error.
    pub fn extension_source<T: StdError + 'static>(&self) -> Option<&T> {
        match self {
            TemplateError::Extension { source, .. } => source.downcast_ref::<T>(),
            _ => None,
        }
    }
}

/// Grammar error without position; the parser attaches template and line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        SyntaxError {
            message: message.into(),
        }
    }
}
