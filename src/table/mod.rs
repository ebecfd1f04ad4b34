//! 表格变量源
//!
//! 表格的每一行以列名为键转换为一个 [`VariableSet`]。

use std::fs;
use std::path::Path;

use crate::variable::VariableSet;
use crate::{Result, RucurlError};

/// 按行提供变量的数据源
pub trait TabularSource {
    /// 列名，按表头顺序
    fn columns(&self) -> &[String];

    /// 数据行总数（不含表头）
    fn total_rows(&self) -> Result<usize>;

    /// 逐行读取；单行读取失败以 `Err` 形式返回
    fn rows(&self) -> Box<dyn Iterator<Item = Result<VariableSet>> + '_>;
}

/// CSV 数据源
///
/// 单元格一律保留为字符串。列数与表头不一致的行会产生读取错误。
#[derive(Debug, Clone)]
pub struct CsvSource {
    name: String,
    text: String,
    columns: Vec<String>,
}

impl CsvSource {
    /// 从文件打开
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            RucurlError::TableError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_text(path.display().to_string(), text)
    }

    /// 从内存中的 CSV 文本构建
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let text = text.into();

        let mut reader = Self::reader(&text);
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        if columns.iter().all(|column| column.is_empty()) {
            return Err(RucurlError::TableError(format!("{} has no columns", name)));
        }

        Ok(Self {
            name,
            text,
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn reader(text: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(text.as_bytes())
    }
}

impl TabularSource for CsvSource {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn total_rows(&self) -> Result<usize> {
        let mut count = 0;
        for record in Self::reader(&self.text).into_records() {
            record?;
            count += 1;
        }
        Ok(count)
    }

    fn rows(&self) -> Box<dyn Iterator<Item = Result<VariableSet>> + '_> {
        let columns = &self.columns;
        Box::new(
            Self::reader(&self.text)
                .into_records()
                .map(move |record| {
                    let record = record?;
                    let mut variables = VariableSet::new();
                    for (column, cell) in columns.iter().zip(record.iter()) {
                        variables.insert(column.clone(), cell);
                    }
                    Ok(variables)
                }),
        )
    }
}
