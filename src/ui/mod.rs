mod compose;
mod envelopes;
mod help;
mod reader;
pub mod row_index;
pub mod table;

pub use compose::*;
pub use envelopes::*;
pub use help::*;
pub use reader::*;
