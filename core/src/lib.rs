pub mod util;
pub mod word;

// Expression loading and evaluation
pub mod vm;
