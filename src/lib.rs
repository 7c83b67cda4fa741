pub mod assemble;
pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod hocr;
pub mod inspect;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod schedule;
pub mod source;
pub mod tools;
pub mod transform;
pub mod util;
pub mod workspace;
