//! Bounded payload reads

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::diagnostics::FileError;

/// Read up to `cap_bytes` from the regular file at `path` (whole file when
/// `None`).
pub fn read_payload(path: &Path, cap_bytes: Option<usize>) -> Result<Vec<u8>, FileError> {
    let read_error = |source| FileError::Read {
        path: path.to_path_buf(),
        source,
    };

    let metadata = std::fs::metadata(path).map_err(read_error)?;
    if !metadata.is_file() {
        return Err(FileError::NotRegular {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(read_error)?;
    let mut payload = Vec::new();
    match cap_bytes {
        Some(cap) => {
            let hint = usize::try_from(metadata.len()).unwrap_or(usize::MAX).min(cap);
            payload.reserve(hint);
            file.take(cap as u64)
                .read_to_end(&mut payload)
                .map_err(read_error)?;
        }
        None => {
            let mut file = file;
            file.read_to_end(&mut payload).map_err(read_error)?;
        }
    }
    Ok(payload)
}

/// Normalise an extension filter entry: lowercase, no leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Whether `path` passes an extension allow-list. `None` allows everything.
pub fn extension_allowed(path: &Path, allowed: Option<&[String]>) -> bool {
    let Some(allowed) = allowed else {
        return true;
    };
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = normalize_extension(ext);
    allowed.iter().any(|a| normalize_extension(a) == ext)
}
