use super::model::{ClearReport, RunRecord, RunSummary};
use crate::Result;
use crate::error::RucurlError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const RESULTS_DIR: &str = "results";
const LOCK_FILE: &str = ".lock";

/// 结果目录中的执行记录
///
/// 每次执行一个 JSON 文件。写入先落到同目录的临时文件，再以 create-exclusive
/// 的方式改名，读者不会看到写了一半的记录。
pub struct RunStore {
    results_dir: PathBuf,
}

impl Default for RunStore {
    fn default() -> Self {
        let dir = std::env::var("RUCURL_RESULTS_DIR").unwrap_or_else(|_| RESULTS_DIR.to_string());
        Self {
            results_dir: PathBuf::from(dir),
        }
    }
}

impl RunStore {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.results_dir.exists() {
            fs::create_dir_all(&self.results_dir).map_err(RucurlError::IoError)?;
        }
        Ok(())
    }

    /// 目录级锁文件：写入和读取持共享锁，清理持独占锁
    fn open_lock(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.results_dir.join(LOCK_FILE))
            .map_err(RucurlError::IoError)
    }

    /// 保存一条记录，返回文件路径
    pub fn save(&self, record: &RunRecord) -> Result<PathBuf> {
        self.ensure_dir()?;
        let lock = self.open_lock()?;
        lock.lock_shared().map_err(RucurlError::IoError)?;

        let json = serde_json::to_string_pretty(record)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".tmp-")
            .suffix(".partial")
            .tempfile_in(&self.results_dir)
            .map_err(|e| RucurlError::PersistenceError(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;

        let target = self.results_dir.join(record.filename());
        temp.persist_noclobber(&target).map_err(|e| {
            RucurlError::PersistenceError(format!("Failed to write {}: {}", target.display(), e.error))
        })?;

        info!("Saved run {} to {}", record.id, target.display());
        Ok(target)
    }

    /// 所有 `.json` 结果文件名，按名称排序
    fn json_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.results_dir).map_err(RucurlError::IoError)? {
            let entry = entry.map_err(RucurlError::IoError)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") && entry.path().is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_record(&self, filename: &str) -> Result<RunRecord> {
        let content = fs::read_to_string(self.results_dir.join(filename)).map_err(RucurlError::IoError)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 列出所有记录摘要，最新的在前；无法解析的文件被跳过
    pub fn list(&self) -> Result<Vec<RunSummary>> {
        if !self.results_dir.exists() {
            return Ok(Vec::new());
        }

        let lock = self.open_lock()?;
        lock.lock_shared().map_err(RucurlError::IoError)?;

        let mut summaries = Vec::new();
        for name in self.json_files()? {
            match self.read_record(&name) {
                Ok(record) => summaries.push(record.summary(name)),
                Err(e) => debug!("Skipping unreadable result file {}: {}", name, e),
            }
        }

        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(summaries)
    }

    /// 按 ID 查找记录：第一个文件名包含该 ID 的结果文件
    pub fn get(&self, id: &str) -> Result<RunRecord> {
        let id = id.trim();
        if id.is_empty() {
            return Err(RucurlError::InvalidInput("Run id is empty".to_string()));
        }
        if !self.results_dir.exists() {
            return Err(RucurlError::RunNotFound(id.to_string()));
        }

        let lock = self.open_lock()?;
        lock.lock_shared().map_err(RucurlError::IoError)?;

        let name = self
            .json_files()?
            .into_iter()
            .find(|name| name.contains(id))
            .ok_or_else(|| RucurlError::RunNotFound(id.to_string()))?;

        self.read_record(&name).map_err(|e| {
            RucurlError::PersistenceError(format!("Failed to read {}: {}", name, e))
        })
    }

    /// 删除结果目录下的所有文件和子目录，单个失败只记录不中断
    pub fn clear(&self) -> Result<ClearReport> {
        let mut report = ClearReport::default();
        if !self.results_dir.exists() {
            return Ok(report);
        }

        let lock = self.open_lock()?;
        lock.lock_exclusive().map_err(RucurlError::IoError)?;

        for entry in fs::read_dir(&self.results_dir).map_err(RucurlError::IoError)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    report.errors.push(e.to_string());
                    continue;
                }
            };
            if path.file_name().is_some_and(|name| name == LOCK_FILE) {
                continue;
            }
            remove_tree(&path, &mut report);
        }

        info!(
            "Cleared {} result file(s), {} error(s)",
            report.removed,
            report.errors.len()
        );
        Ok(report)
    }
}

fn remove_tree(path: &Path, report: &mut ClearReport) {
    if !path.is_dir() {
        match fs::remove_file(path) {
            Ok(()) => report.removed += 1,
            Err(e) => report.errors.push(format!("{}: {}", path.display(), e)),
        }
        return;
    }

    match fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok(entry) => remove_tree(&entry.path(), report),
                    Err(e) => report.errors.push(format!("{}: {}", path.display(), e)),
                }
            }
        }
        Err(e) => report.errors.push(format!("{}: {}", path.display(), e)),
    }

    if let Err(e) = fs::remove_dir(path) {
        report.errors.push(format!("{}: {}", path.display(), e));
    }
}
