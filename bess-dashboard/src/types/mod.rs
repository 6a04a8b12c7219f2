mod timestamp;
mod window;

pub use timestamp::{format_rfc3339, parse_rfc3339};
pub use window::HistoryWindow;
