//! OCR 识别服务客户端
//!
//! 验证码图片交给外部识别服务，返回识别文本。
//! 无内部状态也不做重试，失败由登录重试循环兜底。

use crate::error::{EmError, Result};
use reqwest::multipart;

/// OCR 服务客户端
#[derive(Debug)]
pub struct OcrClient {
    client: reqwest::Client,
    host: String,
}

impl OcrClient {
    /// 创建 OCR 客户端，复用会话的 HTTP 传输
    pub fn new(client: reqwest::Client, host: &str) -> Self {
        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    /// 识别验证码图片，返回原始响应文本
    pub async fn recognize(&self, image: Vec<u8>) -> Result<String> {
        let part = multipart::Part::bytes(image).file_name("verify_image");
        let form = multipart::Form::new().part("image", part);

        let url = format!("{}/ocr/file", self.host);
        tracing::debug!("Posting captcha image to {}", url);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| EmError::Ocr(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            return Err(EmError::Ocr(format!("HTTP {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| EmError::Ocr(format!("Failed to read response body: {}", e)))
    }
}
