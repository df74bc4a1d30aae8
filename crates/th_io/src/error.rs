// crates/th_io/src/error.rs

//! IO 错误类型定义
//!
//! 提供 IO 模块的统一错误枚举，通过 thiserror 自动实现 Display。
//! 所有错误最终可转换为 [`ThError`] 以实现跨层错误传递；加载失败时
//! 调用方（驱动器）负责清空或保留上一个有效网格。

use th_foundation::ThError;
use thiserror::Error;

/// IO 模块结果类型别名
pub type IoResult<T> = Result<T, IoError>;

/// IO 错误枚举
#[derive(Error, Debug)]
pub enum IoError {
    /// DEM 加载失败（文件缺失、不可读或为空）
    #[error("DEM 加载失败: {path}: {reason}")]
    LoadFailed {
        path: String,
        reason: String,
    },

    /// 文件格式识别失败
    #[error("无法识别文件格式: {path}")]
    UnknownFormat { path: String },

    /// 栅格驱动不可用（未启用 gdal 特性）
    #[error("栅格驱动不可用 (需启用 gdal 特性): {path}")]
    RasterDriverUnavailable { path: String },

    /// 栅格逐行读取失败
    #[error("栅格读取失败: 行 {row}: {message}")]
    RasterIo { row: usize, message: String },

    /// 文本解析错误
    #[error("文件解析错误: {file}:{line} - {message}")]
    ParseError {
        file: String,
        line: usize,
        message: String,
    },

    /// 结果写出失败
    #[error("结果写出失败: {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    /// 加载后的网格尺寸非法
    #[error("无效的网格尺寸: {nx} x {ny}")]
    InvalidDimensions { nx: usize, ny: usize },

    /// 基础层错误转换
    #[error("基础层错误: {0}")]
    Foundation(#[from] ThError),
}

impl From<IoError> for ThError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::LoadFailed { path, reason } => {
                ThError::io(format!("DEM 加载失败 [{path}]: {reason}"))
            }
            IoError::UnknownFormat { path } => {
                ThError::invalid_input(format!("无法识别文件格式: {path}"))
            }
            IoError::RasterDriverUnavailable { path } => {
                ThError::invalid_input(format!("栅格驱动不可用: {path}"))
            }
            IoError::RasterIo { row, message } => {
                ThError::io(format!("栅格读取失败 [行 {row}]: {message}"))
            }
            IoError::ParseError {
                file,
                line,
                message,
            } => ThError::invalid_input(format!("文件解析错误 [{file}:{line}]: {message}")),
            IoError::WriteFailed { path, reason } => {
                ThError::io(format!("结果写出失败 [{path}]: {reason}"))
            }
            IoError::InvalidDimensions { nx, ny } => {
                ThError::invalid_input(format!("无效的网格尺寸: {nx} x {ny}"))
            }
            IoError::Foundation(th_err) => th_err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_contains_context() {
        let err = IoError::ParseError {
            file: "dem.csv".to_string(),
            line: 3,
            message: "非法数字".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("dem.csv"));
        assert!(text.contains("3"));
    }

    #[test]
    fn test_downcast_to_foundation() {
        let err = IoError::InvalidDimensions { nx: 0, ny: 5 };
        let th: ThError = err.into();
        assert!(matches!(th, ThError::InvalidInput { .. }));
    }
}
