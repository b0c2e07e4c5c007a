//! Line-delimited JSON output.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::Chunk;

/// `<dir>/<stem>_chunks.jsonl` for a source file name.
pub fn output_path<P: AsRef<Path>>(dir: P, source: &str) -> PathBuf {
    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());
    dir.as_ref().join(format!("{}_chunks.jsonl", stem))
}

/// Write chunks one JSON record per line.
///
/// Records go to a temporary sibling first; the target only appears once
/// every record has been written, so a failed run never leaves a partial
/// file behind. Returns the number of records written.
pub fn write_jsonl<'c, P, I>(path: P, chunks: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'c Chunk>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let written = match write_lines(&tmp, chunks) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };
    fs::rename(&tmp, path)?;
    Ok(written)
}

fn write_lines<'c, I>(path: &Path, chunks: I) -> Result<usize>
where
    I: IntoIterator<Item = &'c Chunk>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut count = 0;
    for chunk in chunks {
        writer.write_all(chunk.to_json_line()?.as_bytes())?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path("data/processed", "JESD84-B51.pdf"),
            PathBuf::from("data/processed/JESD84-B51_chunks.jsonl")
        );
    }
}
