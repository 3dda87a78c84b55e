mod utils;

pub use utils::{display_width, sanitize_label, truncate_to_width};
