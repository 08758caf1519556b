pub mod parser;
pub mod reader;

pub use parser::{apply_output, FieldLayouts};
pub use reader::{Reader, TfrecReader};
