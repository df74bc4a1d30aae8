// crates/th_foundation/src/error.rs

//! 基础错误类型
//!
//! 定义整个项目的基础错误枚举，仅包含与基础设施相关的错误：
//! IO、尺寸、索引、内存与输入校验。投影、网格、求解等高层概念
//! 禁止出现在本模块中，高层错误通过 `From` 实现向下转换。
//!
//! # 错误分层
//!
//! ```text
//! 引擎错误 (th_engine::EngineError)
//!        ↓ (转换)
//! IO 错误 (th_io::IoError)
//!        ↓ (转换)
//! 基础错误 ← 你在这里 (th_foundation::ThError)
//! ```

use std::{fmt, io, path::PathBuf};

/// 统一结果类型别名
///
/// 等价于 `Result<T, ThError>`，用于简化函数签名。
pub type ThResult<T> = Result<T, ThError>;

/// 基础层错误
///
/// 包含所有基础设施级别的错误，是错误体系的根基。
#[derive(Debug)]
pub enum ThError {
    /// IO 操作失败
    Io {
        /// 描述性错误信息
        message: String,
        /// 底层 IO 错误源
        source: Option<io::Error>,
    },

    /// 文件不存在
    FileNotFound {
        /// 未找到的文件路径
        path: PathBuf,
    },

    /// 数组或集合大小不匹配
    ///
    /// 在需要严格大小一致性的操作中触发（如栅格数据与网格尺寸）。
    SizeMismatch {
        /// 数据名称（用于调试）
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 缓冲区分配失败
    ///
    /// 网格或求解器无法为 `h[]`、通量暂存等分配内存时触发。
    AllocationFailed {
        /// 分配对象名称
        what: &'static str,
        /// 请求的元素数量
        len: usize,
    },

    /// 输入数据验证失败
    ///
    /// 用于参数校验、前置条件检查等场景。
    InvalidInput {
        /// 说明无效原因
        message: String,
    },
}

// ============================================================================
// 便捷构造方法
// ============================================================================

impl ThError {
    /// 创建 IO 错误
    #[inline]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带源的 IO 错误
    ///
    /// 当需要保留底层 [`std::io::Error`] 时使用。
    #[inline]
    pub fn io_with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 创建文件未找到错误
    #[inline]
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 创建大小不匹配错误
    #[inline]
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 创建分配失败错误
    #[inline]
    pub fn allocation_failed(what: &'static str, len: usize) -> Self {
        Self::AllocationFailed { what, len }
    }

    /// 创建无效输入错误
    #[inline]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 验证数组大小是否匹配，不匹配则返回 [`ThError::SizeMismatch`]
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> ThResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// 标准库错误转换实现
// ============================================================================

impl From<io::Error> for ThError {
    /// 将 [`std::io::Error`] 转换为 [`ThError::Io`]
    fn from(err: io::Error) -> Self {
        Self::io_with_source("IO 操作失败", err)
    }
}

// ============================================================================
// 核心 Trait 实现
// ============================================================================

impl fmt::Display for ThError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { message, .. } => write!(f, "IO错误: {}", message),
            Self::FileNotFound { path } => write!(f, "文件不存在: {}", path.display()),
            Self::SizeMismatch {
                name,
                expected,
                actual,
            } => {
                write!(f, "数组大小不匹配: {} 期望{}, 实际{}", name, expected, actual)
            }
            Self::AllocationFailed { what, len } => {
                write!(f, "缓冲区分配失败: {} ({} 元素)", what, len)
            }
            Self::InvalidInput { message } => write!(f, "无效的输入数据: {}", message),
        }
    }
}

impl std::error::Error for ThError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => source.as_ref().map(|e| e as _),
            _ => None,
        }
    }
}

// ============================================================================
// 测试
// ============================================================================
