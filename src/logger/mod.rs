//! Bootstrap logging with a filter that can be swapped once settings are
//! parsed.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
