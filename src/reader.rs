use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info};

/// Configuration for corpus reading
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            buffer_size: 8192, // WHY: 8KB is optimal for most filesystems and network storage
        }
    }
}

/// Statistics for one corpus read
#[derive(Debug, Clone)]
pub struct ReadStats {
    pub file_path: String,
    pub lines_read: u64,
    pub bytes_read: u64,
    pub duration_ms: u64,
}

/// Async reader for plain UTF-8 text corpora
pub struct CorpusReader {
    config: ReaderConfig,
}

impl CorpusReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read the whole file as text, keeping line endings exactly as stored
    /// WHY: word offsets are taken against `text.split('\n')`, so nothing may be rewritten here
    pub async fn read_text<P: AsRef<Path>>(&self, file_path: P) -> Result<(String, ReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();

        debug!("Starting async read of corpus: {}", path.display());

        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open file {}", path.display()))?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .with_context(|| format!("Failed to read file {}", path.display()))?;

        let text = String::from_utf8(bytes)
            .with_context(|| format!("UTF-8 decoding error in {}", path.display()))?;

        let stats = ReadStats {
            file_path: path.display().to_string(),
            lines_read: text.split('\n').count() as u64,
            bytes_read: text.len() as u64,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Successfully read {}: {} lines, {} bytes in {}ms",
            path.display(),
            stats.lines_read,
            stats.bytes_read,
            stats.duration_ms
        );

        Ok((text, stats))
    }
}

/// Convenience function for reading a corpus with default configuration
pub async fn read_corpus<P: AsRef<Path>>(file_path: P) -> Result<String> {
    let reader = CorpusReader::new(ReaderConfig::default());
    let (text, _stats) = reader.read_text(file_path).await?;
    Ok(text)
}
