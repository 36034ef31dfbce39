#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod interleave;
pub mod logging;
pub mod manage;
pub mod segment;
