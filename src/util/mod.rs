//! General utility code that didn't fit anywhere else
// (c) 2026 tftpd contributors

mod dirsize;
pub use dirsize::dir_size;

mod tracing;
pub use tracing::{TimeFormat, is_initialized as tracing_is_initialised, setup as setup_tracing};
