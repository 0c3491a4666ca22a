//! Owner-only file writes

use std::io;
use std::path::Path;

use tokio::io::AsyncWriteExt;

/// Write `bytes` to `path`, readable and writable by the owner only
///
/// With `create_new` the write fails if the file already exists; otherwise
/// an existing file is truncated.
pub async fn write_private(path: &Path, bytes: &[u8], create_new: bool) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.flush().await
}
