pub mod ai;
pub mod analysis;
pub mod archive;
pub mod cli;
pub mod config;
pub mod console;
pub mod doctor;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod render;
pub mod report;
pub mod storage;
pub mod util;
pub mod workflow;
