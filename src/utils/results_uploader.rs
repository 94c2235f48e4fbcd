use std::path::Path;

use anyhow::bail;

/// What to do with the log file of the winning variant.
pub trait ResultHandler {
    fn handle_result(&self, path: &Path) -> anyhow::Result<()>;
}

pub struct ResultIgnorer {}

impl ResultIgnorer {
    pub fn new() -> ResultIgnorer {
        ResultIgnorer {}
    }
}

impl ResultHandler for ResultIgnorer {
    fn handle_result(&self, _path: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Uploads result files with `curl <url> -T <file>`.
pub struct ResultsUploader {
    push_url: String,
}

impl ResultsUploader {
    pub fn new(url: String) -> Self {
        Self { push_url: url }
    }
}

impl ResultHandler for ResultsUploader {
    fn handle_result(&self, file: &Path) -> anyhow::Result<()> {
        if !file.is_file() {
            bail!(
                "can't upload result file which does not exist, '{}'",
                file.display()
            );
        }

        let exit = subprocess::Exec::cmd("curl")
            .arg(&self.push_url)
            .arg("-T")
            .arg(file.as_os_str())
            .join()?;

        if !exit.success() {
            bail!("curl exited with {:?}", exit);
        }
        info!("result file '{}' uploaded to {}", file.display(), self.push_url);
        Ok(())
    }
}
