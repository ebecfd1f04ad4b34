use crate::{Result, RucurlError};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;
use tracing::debug;

/// 一次性的命令脚本
///
/// 命令写进临时脚本再执行，这样多行续行（`\` 或 `^`）和引号都按目标 shell 的规则处理。
/// 脚本在 [`ScriptFile::remove`] 或 drop 时删除，删除失败只记日志。
pub struct ScriptFile {
    path: TempPath,
}

impl ScriptFile {
    /// 为当前平台生成脚本文件
    pub fn create(command: &str, shell: &str) -> Result<Self> {
        let (suffix, content) = script_content(command, shell);

        let mut file = tempfile::Builder::new()
            .prefix("rucurl-")
            .suffix(suffix)
            .tempfile()
            .map_err(|e| RucurlError::ExecutionError(format!("Failed to create script: {}", e)))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        // 关闭写句柄，Windows 上执行仍被打开的文件会失败
        let path = file.into_temp_path();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 删除脚本文件
    pub fn remove(self) {
        let shown = self.path.display().to_string();
        if let Err(e) = self.path.close() {
            debug!("Failed to remove script {}: {}", shown, e);
        }
    }
}

/// 生成脚本后缀和内容
///
/// Windows 使用 `@echo off` 防止命令回显混进 stdout，其它平台写入 shebang。
pub fn script_content(command: &str, shell: &str) -> (&'static str, String) {
    if cfg!(windows) {
        (".bat", format!("@echo off\r\n{}", command))
    } else {
        (".sh", format!("#!{}\n{}", shell, command))
    }
}
