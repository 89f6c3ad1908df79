pub mod archive;
pub mod cross;
pub mod docker;
pub mod dockerfile;
pub mod tag;
pub mod target;
pub mod utils;
pub mod workflow;
