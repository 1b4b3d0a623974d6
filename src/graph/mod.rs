pub mod resolver;

mod cycles;
mod order;

pub use resolver::{GraphBuild, ResolveError, RuleGraph};
