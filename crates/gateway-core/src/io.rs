use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Append one line to a file, creating the file (and its parents) if needed.
///
/// The line and its trailing newline go out in a single `write_all` on an
/// `O_APPEND` handle, so concurrent appenders never interleave within a line.
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    f.write_all(buf.as_bytes())?;
    Ok(())
}
