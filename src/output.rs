use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

/// Writes generated sources to disk, creating parent directories as needed.
pub struct OutputWriter {
    output_dir: PathBuf,
}

impl OutputWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Save one generated file under the output directory.
    pub fn save(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(relative);
        self.write(&path, content)?;
        Ok(path)
    }

    /// Persist a generated project tree under `{output_dir}/{name}`.
    pub fn save_project(
        &self,
        name: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<PathBuf> {
        let project_dir = self.output_dir.join(name);
        for (relative, content) in files {
            self.write(&project_dir.join(relative), content)?;
        }
        Ok(project_dir)
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, content)
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        info!("Saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());

        let path = writer.save("nested/deep/hello.py", "print('hi')").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "print('hi')");
    }

    #[test]
    fn test_save_project_writes_all_files() {
        let dir = tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());

        let files = BTreeMap::from([
            ("main.py".to_string(), "# main".to_string()),
            ("README.md".to_string(), "# readme".to_string()),
        ]);
        let project_dir = writer.save_project("calculator", &files).unwrap();

        assert_eq!(project_dir, dir.path().join("calculator"));
        assert_eq!(
            fs::read_to_string(project_dir.join("main.py")).unwrap(),
            "# main"
        );
        assert_eq!(
            fs::read_to_string(project_dir.join("README.md")).unwrap(),
            "# readme"
        );
    }
}
