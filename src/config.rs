//! 客户端配置

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认交易站点地址
pub const DEFAULT_BASE_URL: &str = "https://jywg.18.cn";

/// 默认请求超时 (秒)
const DEFAULT_TIMEOUT_SECS: u64 = 3;

/// 默认会话续期间隔 (秒)
const DEFAULT_RENEW_INTERVAL_SECS: u64 = 600;

/// 东方财富客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmClientConfig {
    /// 资金账号
    pub account: String,
    /// 登录密码 (明文，提交前由 crypto 模块加密)
    pub password: String,
    /// OCR 识别服务地址 (如 "http://127.0.0.1:9898")
    pub ocr_host: String,
    /// 交易站点地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 请求超时 (秒)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 会话续期间隔 (秒)
    #[serde(default = "default_renew_interval_secs")]
    pub renew_interval_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_renew_interval_secs() -> u64 {
    DEFAULT_RENEW_INTERVAL_SECS
}

impl EmClientConfig {
    /// 新建配置，其余字段取默认值
    pub fn new(account: &str, password: &str, ocr_host: &str) -> Self {
        Self {
            account: account.to_string(),
            password: password.to_string(),
            ocr_host: ocr_host.to_string(),
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            renew_interval_secs: DEFAULT_RENEW_INTERVAL_SECS,
        }
    }

    /// 覆盖交易站点地址 (测试时指向 mock 服务器)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// 覆盖续期间隔
    pub fn with_renew_interval(mut self, secs: u64) -> Self {
        self.renew_interval_secs = secs;
        self
    }

    /// 从环境变量创建配置
    ///
    /// # 环境变量
    /// - `EM_ACCOUNT`: 资金账号 (必填)
    /// - `EM_PASSWORD`: 登录密码 (必填)
    /// - `EM_OCR_HOST`: OCR 服务地址 (必填)
    /// - `EM_BASE_URL`: 交易站点地址 (可选)
    pub fn from_env() -> Option<Self> {
        let account = std::env::var("EM_ACCOUNT").ok()?;
        let password = std::env::var("EM_PASSWORD").ok()?;
        let ocr_host = std::env::var("EM_OCR_HOST").ok()?;
        let base_url = std::env::var("EM_BASE_URL").unwrap_or_else(|_| default_base_url());

        Some(Self {
            account,
            password,
            ocr_host,
            base_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            renew_interval_secs: DEFAULT_RENEW_INTERVAL_SECS,
        })
    }

    /// 请求超时
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 会话续期间隔
    pub fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.renew_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EmClientConfig::new("540800000000", "pwd", "http://127.0.0.1:9898");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert_eq!(config.renew_interval(), Duration::from_secs(600));
    }

    #[test]
    fn test_config_overrides() {
        let config = EmClientConfig::new("u1", "p1", "http://ocr")
            .with_base_url("http://127.0.0.1:8080/")
            .with_renew_interval(1);
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.renew_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_env() {
        std::env::set_var("EM_ACCOUNT", "540800000000");
        std::env::set_var("EM_PASSWORD", "pwd");
        std::env::set_var("EM_OCR_HOST", "http://127.0.0.1:9898");

        let config = EmClientConfig::from_env().unwrap();
        assert_eq!(config.account, "540800000000");
        assert_eq!(config.ocr_host, "http://127.0.0.1:9898");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        std::env::remove_var("EM_ACCOUNT");
        std::env::remove_var("EM_PASSWORD");
        std::env::remove_var("EM_OCR_HOST");
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let json = r#"{"account":"u1","password":"p1","ocr_host":"http://ocr"}"#;
        let config: EmClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.renew_interval_secs, 600);
    }
}
