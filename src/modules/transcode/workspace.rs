use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const INPUT_FILE: &str = "input.mp4";
const OUTPUT_DIR: &str = "hls";

/// Scratch directory owned by a single job.
///
/// Removed on drop; `close` does the same but reports removal errors.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    pub fn create(parent: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("hls-").tempdir_in(parent)?;
        std::fs::create_dir(dir.path().join(OUTPUT_DIR))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.path().join(INPUT_FILE)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join(OUTPUT_DIR)
    }

    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}
