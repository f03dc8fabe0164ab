pub mod file_collect;
pub mod language;
pub mod parser;
pub mod pipeline;
pub mod visitor;


pub use file_collect::*;
pub use language::*;
pub use parser::*;
pub use pipeline::*;
pub use visitor::*;
