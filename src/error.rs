//! 错误类型定义

use thiserror::Error;

/// 东方财富客户端错误类型
#[derive(Error, Debug)]
pub enum EmError {
    /// HTTP 请求错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// OCR 识别服务错误
    #[error("OCR error: {0}")]
    Ocr(String),

    /// 验证码格式错误 (识别结果必须是4位数字)
    #[error("Captcha format error: got {0:?}")]
    CaptchaFormat(String),

    /// 登录被服务器拒绝
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// 会话 token 提取失败
    #[error("Token extraction failed: {0}")]
    TokenExtraction(String),

    /// 加密错误 (公钥是内置的，失败说明代码有缺陷，不可恢复)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// 交易接口返回非零状态
    #[error("Server rejected: {message} (status: {status})")]
    ServerRejected { status: i64, message: String },

    /// 登录重试次数耗尽 (不可恢复，调用方应终止进程)
    #[error("Login failed after {attempts} attempts: {source}")]
    LoginExhausted {
        attempts: u32,
        #[source]
        source: Box<EmError>,
    },

    /// 响应格式错误
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 无效参数
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

impl EmError {
    /// 是否为不可恢复错误
    ///
    /// 首次登录失败耗尽重试、或密码加密失败时返回 true，
    /// 此时客户端没有可用身份，调用方应终止进程。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EmError::Encryption(_) | EmError::LoginExhausted { .. }
        )
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, EmError>;
