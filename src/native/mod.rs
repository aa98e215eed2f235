//! Native module runs the toolchain straight on the host through
//! `tokio::process`, without containers or kernel-level isolation.
pub mod executor;
pub mod process;
pub mod toolchain;
