//! # Error 模块
//!
//! 定义 pano-runtime 中使用的错误类型。
//!
//! 所有错误都是非致命的：只中止当前请求的操作，编排状态保持干净。

use thiserror::Error;

/// API 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 无效的场景 / 热点标识符
    #[error("无效的引用 '{uid}'")]
    InvalidReference { uid: String },

    /// 参数类型或格式错误
    #[error("无效的参数: {message}")]
    InvalidArgument { message: String },

    /// 数值超出范围（音量必须在 0.0 - 1.0 之间）
    #[error("数值 {value} 超出范围，有效范围是 0.0 - 1.0")]
    OutOfRange { value: f64 },

    /// 当前场景 / 媒体状态不支持此操作
    #[error("不支持的操作: {message}")]
    UnsupportedOperation { message: String },

    /// 资源正被进行中的会话占用
    #[error("资源 '{resource}' 正被占用")]
    Busy { resource: String },
}

impl ApiError {
    /// 创建无效引用错误
    pub fn invalid_reference(uid: impl Into<String>) -> Self {
        Self::InvalidReference { uid: uid.into() }
    }

    /// 创建无效参数错误
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// 创建不支持操作错误
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
        }
    }

    /// 创建资源占用错误
    pub fn busy(resource: impl Into<String>) -> Self {
        Self::Busy {
            resource: resource.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::invalid_reference("scene-9");
        assert_eq!(err.to_string(), "无效的引用 'scene-9'");

        let err = ApiError::OutOfRange { value: 1.5 };
        assert!(err.to_string().contains("1.5"));

        let err = ApiError::busy("transition");
        assert_eq!(
            err,
            ApiError::Busy {
                resource: "transition".to_string()
            }
        );
    }
}
