mod columns;
mod document;
mod hierarchy;
mod level;
mod pipeline;
mod rows;
mod run;
mod source;
mod upload;

pub use run::run;

pub(crate) use hierarchy::HierarchyState;
pub(crate) use source::list_sheets;
