use crate::error::{CoreError, CoreResult};
use std::path::Path;

pub fn validate_directory_exists(path: &Path) -> CoreResult<()> {
    if !path.is_dir() {
        return Err(CoreError::DirectoryNotFound(path.to_path_buf()));
    }
    Ok(())
}
