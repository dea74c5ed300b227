pub mod file;
pub mod rollup;
