use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::{fs, io};
use tracing::debug;

/// Per-table binary files under `<root>/tables/<table>.table`.
///
/// Files only ever grow by whole rows appended at the end, so row `n` of a table starts at
/// `n * row_width`. A handle is opened for each call and dropped before returning.
#[derive(Debug, Clone)]
pub struct TableFiles {
    dir: PathBuf,
}

impl TableFiles {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join("tables"),
        }
    }

    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.table"))
    }

    /// Appends `row` and returns the offset its first byte was written at.
    pub async fn append_row(&self, table: &str, row: &[u8]) -> io::Result<u64> {
        let path = self.path_for(table);
        fs::create_dir_all(&self.dir).await?;
        let mut file = fs::File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;
        let offset = file.seek(SeekFrom::End(0)).await?;
        file.write_all(row).await?;
        // tokio hands the write to a blocking thread, flush waits for it to land
        file.flush().await?;
        debug!(path = %path.display(), offset, len = row.len(), "Appended row");
        Ok(offset)
    }

    /// Number of whole rows stored for `table`; a table without a file has none.
    pub async fn stored_rows(&self, table: &str, row_width: usize) -> io::Result<u64> {
        if row_width == 0 {
            return Ok(0);
        }
        match fs::metadata(self.path_for(table)).await {
            Ok(meta) => Ok(meta.len() / row_width as u64),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }
}
