//! Library side of the `feed-check` command: logging setup and the check pipeline.

pub mod logging;
pub mod pipeline;
