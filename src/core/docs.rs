/// Static operator documentation, shown verbatim
use std::path::Path;

use crate::core::error::{PanelError, PanelResult};

pub fn read_docs(path: &Path) -> PanelResult<String> {
    std::fs::read_to_string(path).map_err(|e| PanelError::io(path, e))
}
