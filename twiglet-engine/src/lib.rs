//! # twiglet-engine
//!
//! A compact Twig-dialect template engine with extension points for custom
//! tags, filters and functions.
//!
//! ## Usage
//!
//! ```rust
//! use twiglet_engine::{Environment, MemoryLoader, Map, Value};
//!
//! let env = Environment::with_loader(MemoryLoader::new().with("hello.twig", "Hello {{ name|upper }}!"));
//! let mut vars = Map::new();
//! vars.insert("name".into(), Value::from("world"));
//! assert_eq!(env.render("hello.twig", vars).unwrap(), "Hello WORLD!");
//! ```

mod builtins;
mod eval;

pub mod environment;
pub mod error;
pub mod expr;
pub mod parser;
pub mod scope;
pub mod syntax;
pub mod tag;
pub mod value;

pub use environment::{Environment, FilterFn, FunctionFn, Loader, MemoryLoader, TemplateCache};
pub use error::{SyntaxError, TemplateError};
pub use expr::Expr;
pub use parser::{Node, TagNode, Template};
pub use scope::Scope;
pub use tag::{Tag, TagInstance};
pub use value::{map_from_json, Map, Object, Value};
