//! Extension tag interface.
//!
//! A [`Tag`] is registered once per environment and compiles every
//! occurrence of `{% name … %}` into a [`TagInstance`]. Block tags declare
//! their end keyword; the parser hands the statements up to it to
//! [`TagInstance::render`] untouched, so a tag can inspect, rewrite or
//! render its body however it needs.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::environment::Environment;
use crate::error::{SyntaxError, TemplateError};
use crate::parser::Node;
use crate::scope::Scope;

pub trait Tag: Send + Sync {
    /// Keyword that opens the tag.
    fn name(&self) -> &str;

    /// Keyword closing a block tag; `None` for standalone tags.
    fn end_tag(&self) -> Option<&str> {
        None
    }

    /// Compile one occurrence. `source` is the full tag text, keyword included.
    fn compile(&self, source: &str) -> Result<Arc<dyn TagInstance>, SyntaxError>;
}

pub trait TagInstance: Debug + Send + Sync {
    fn render(
        &self,
        env: &Environment,
        scope: &mut Scope<'_>,
        body: &[Node],
    ) -> Result<String, TemplateError>;

    fn as_any(&self) -> &dyn Any;
}
