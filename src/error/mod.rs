mod types;

pub use types::{PanelError, Result};
