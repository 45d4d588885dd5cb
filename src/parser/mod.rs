// Value parsers for extracted style and data strings

pub mod color;
pub mod lexer;

// Public API re-exports
pub use color::parse_color;
pub use lexer::parse_number;
