pub mod cost;
pub mod operator;
pub mod profiling;
pub mod translate;
