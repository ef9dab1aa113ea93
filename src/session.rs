//! 会话管理模块 - 登录协议与定时续期
//!
//! 登录流程:
//! 1. 用随机种子请求验证码图片 (服务器把图片绑定到该种子)
//! 2. 图片交给外部 OCR 服务识别，结果必须是4位数字
//! 3. RSA 加密密码后提交登录表单
//! 4. 从持仓页面 HTML 中解析出会话 token (validatekey)
//!
//! 首次登录最多重试5次，全部失败则返回不可恢复错误。
//! 登录成功后启动后台续期任务，每隔固定间隔重新登录；
//! 续期失败不影响已有 token，等下个周期再试。

use crate::config::EmClientConfig;
use crate::crypto;
use crate::error::{EmError, Result};
use crate::ocr::OcrClient;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell, RwLock};

/// 登录最大重试次数
const LOGIN_MAX_ATTEMPTS: u32 = 5;

/// token 所在节点的 CSS 选择器
const VALIDATE_KEY_SELECTOR: &str = "#em_validatekey";

/// 模拟网页端的 User-Agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// 登录接口响应
///
/// Status 字段偶尔不是数字，统一按 Value 解析再判断。
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "Status", default)]
    status: serde_json::Value,
    #[serde(rename = "Errcode", default)]
    _errcode: serde_json::Value,
    #[serde(rename = "Message", default)]
    message: String,
}

/// 认证会话
///
/// 每个进程只应存在一个会话。token 只由会话自身写入
/// (首次登录和每次续期)，交易调用在发请求时读取最新值；
/// 写入是整体替换，读方不会看到半新半旧的值。
#[derive(Debug)]
pub struct EmSession {
    /// 共享 HTTP 传输 (连接池 + cookie jar)
    http: reqwest::Client,
    config: EmClientConfig,
    ocr: OcrClient,
    /// 当前会话 token，空字符串表示尚未建立会话
    token: RwLock<String>,
    /// 续期任务停止信号
    shutdown_tx: watch::Sender<bool>,
}

impl EmSession {
    /// 构建会话对象 (不登录、不启动续期)
    fn build(config: EmClientConfig) -> Result<(Arc<Self>, watch::Receiver<bool>)> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "sec-ch-ua-platform",
            reqwest::header::HeaderValue::from_static("Linux"),
        );

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ocr = OcrClient::new(http.clone(), &config.ocr_host);

        let session = Arc::new(Self {
            http,
            config,
            ocr,
            token: RwLock::new(String::new()),
            shutdown_tx,
        });
        Ok((session, shutdown_rx))
    }

    /// 初始化会话: 建立传输、完成首次登录、启动后台续期
    ///
    /// 首次登录耗尽重试后返回 `EmError::LoginExhausted`，
    /// 此时客户端没有可用身份，由调用方决定终止进程。
    pub async fn initialize(config: EmClientConfig) -> Result<Arc<Self>> {
        let (session, shutdown_rx) = Self::build(config)?;

        session.login_with_retry().await?;

        let renew = session.clone();
        let interval = renew.config.renew_interval();
        tokio::spawn(async move {
            renew.renewal_loop(interval, shutdown_rx).await;
        });

        Ok(session)
    }

    /// 后台续期循环
    ///
    /// 续期之间严格串行，任一时刻至多一个登录在进行。
    async fn renewal_loop(&self, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        // interval 的第一次 tick 立即返回，跳过
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::info!("Renewing session...");
                    match self.login_with_retry().await {
                        Ok(()) => tracing::info!("Session renewed"),
                        // 续期失败不致命，旧 token 继续使用
                        Err(e) => tracing::warn!(
                            "Session renewal failed, keeping previous token: {}", e
                        ),
                    }
                }
                _ = shutdown_rx.changed() => {
                    tracing::info!("Renewal loop stopped");
                    break;
                }
            }
        }
    }

    /// 带重试的登录
    ///
    /// 对错误种类不加区分地立即重试 (换验证码/换 OCR 结果都靠重试解决)，
    /// 只有加密错误例外: 内置密钥出问题重试没有意义。
    async fn login_with_retry(&self) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.login().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Login attempt {}/{} failed: {}",
                        attempt,
                        LOGIN_MAX_ATTEMPTS,
                        e
                    );
                    if attempt >= LOGIN_MAX_ATTEMPTS {
                        return Err(EmError::LoginExhausted {
                            attempts: attempt,
                            source: Box::new(e),
                        });
                    }
                }
            }
        }
    }

    /// 单次登录尝试
    async fn login(&self) -> Result<()> {
        // 服务器把验证码图片绑定到这个随机种子上
        let rand_seed = format!("{}", rand::random::<f64>());

        let image = self.fetch_captcha(&rand_seed).await?;
        let captcha = self.ocr.recognize(image).await?;

        // 东方财富的验证码全是数字，识别出其他形状说明 OCR 读错了，
        // 不做局部修正，交给重试循环换一张图
        if captcha.len() != 4 || !captcha.chars().all(|c| c.is_ascii_digit()) {
            return Err(EmError::CaptchaFormat(captcha));
        }

        let encrypted = crypto::encrypt_password(&self.config.password)?;
        self.submit_login(&rand_seed, &captcha, &encrypted).await?;

        let token = self.fetch_validate_key().await?;
        *self.token.write().await = token;
        tracing::info!("Login succeeded, session token refreshed");
        Ok(())
    }

    /// 获取验证码图片
    async fn fetch_captcha(&self, rand_seed: &str) -> Result<Vec<u8>> {
        let url = format!("{}/Login/YZM", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("randNum", rand_seed)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmError::Protocol(format!(
                "Captcha endpoint returned HTTP {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// 提交登录表单
    async fn submit_login(&self, rand_seed: &str, captcha: &str, encrypted: &str) -> Result<()> {
        let url = format!("{}/Login/Authentication?validatekey=", self.config.base_url);
        let form = [
            ("userId", self.config.account.as_str()),
            ("randNumber", rand_seed),
            ("identifyCode", captcha),
            ("secInfo", ""),
            ("password", encrypted),
            ("duration", "30"),
            ("type", "Z"),
            ("authCode", ""),
        ];

        let response = self.http.post(&url).form(&form).send().await?;
        let result: LoginResponse = response.json().await?;

        match result.status.as_f64() {
            Some(s) if s == 0.0 => Ok(()),
            _ => Err(EmError::AuthRejected(result.message)),
        }
    }

    /// 从已认证页面取回会话 token
    ///
    /// validatekey 藏在 HTML 里，随便访问一个需要登录的页面解析出来即可。
    async fn fetch_validate_key(&self) -> Result<String> {
        let url = format!("{}/Search/Position", self.config.base_url);
        let response = self.http.get(&url).send().await?;
        let html = response.text().await?;
        extract_validate_key(&html)
    }

    /// 当前会话 token (空字符串表示尚未建立会话)
    pub async fn validate_key(&self) -> String {
        self.token.read().await.clone()
    }

    /// 是否已建立会话
    pub async fn is_authenticated(&self) -> bool {
        !self.token.read().await.is_empty()
    }

    /// 停止后台续期任务
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.config.base_url
    }

    #[cfg(test)]
    pub(crate) async fn set_token(&self, token: &str) {
        *self.token.write().await = token.to_string();
    }

    #[cfg(test)]
    pub(crate) fn build_for_test(config: EmClientConfig) -> (Arc<Self>, watch::Receiver<bool>) {
        Self::build(config).unwrap()
    }
}

/// 从 HTML 中提取会话 token
///
/// 要求恰好存在一个 id 为 em_validatekey 的节点，且带有 value 属性。
fn extract_validate_key(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(VALIDATE_KEY_SELECTOR)
        .map_err(|e| EmError::TokenExtraction(format!("Invalid selector: {}", e)))?;

    let nodes: Vec<_> = document.select(&selector).collect();
    if nodes.len() != 1 {
        return Err(EmError::TokenExtraction(format!(
            "Expected exactly 1 #em_validatekey node, found {}",
            nodes.len()
        )));
    }

    match nodes[0].value().attr("value") {
        Some(value) => Ok(value.to_string()),
        None => Err(EmError::TokenExtraction(
            "Node has no value attribute".to_string(),
        )),
    }
}

/// 会话初始化器
///
/// 把并发的初始化调用收敛为一次真实登录: 第一个调用者执行登录，
/// 其余调用者等待并共享同一个会话对象。
pub struct SessionInitializer {
    config: EmClientConfig,
    cell: OnceCell<Arc<EmSession>>,
}

impl SessionInitializer {
    /// 创建初始化器，登录推迟到第一次 `get_or_init`
    pub fn new(config: EmClientConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// 获取会话，必要时执行初始化
    pub async fn get_or_init(&self) -> Result<Arc<EmSession>> {
        self.cell
            .get_or_try_init(|| EmSession::initialize(self.config.clone()))
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_config(server: &mockito::Server) -> EmClientConfig {
        EmClientConfig::new("u1", "p1", &server.url()).with_base_url(&server.url())
    }

    async fn mock_captcha(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/Login/YZM")
            .match_query(Matcher::Regex("randNum=0".to_string()))
            .with_body([0x89, 0x50, 0x4e, 0x47])
            .create_async()
            .await
    }

    async fn mock_ocr(server: &mut mockito::ServerGuard, text: &str) -> mockito::Mock {
        server
            .mock("POST", "/ocr/file")
            .with_body(text)
            .create_async()
            .await
    }

    async fn mock_login_ok(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/Login/Authentication")
            .match_query(Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("userId".into(), "u1".into()),
                Matcher::UrlEncoded("identifyCode".into(), "1234".into()),
                Matcher::UrlEncoded("duration".into(), "30".into()),
                Matcher::UrlEncoded("type".into(), "Z".into()),
                Matcher::UrlEncoded("secInfo".into(), "".into()),
            ]))
            .with_body(r#"{"Status":0,"Errcode":0,"Message":""}"#)
            .create_async()
            .await
    }

    async fn mock_token_page(server: &mut mockito::ServerGuard, token: &str) -> mockito::Mock {
        server
            .mock("GET", "/Search/Position")
            .with_body(format!(
                r#"<html><body><input id="em_validatekey" type="hidden" value="{}"/></body></html>"#,
                token
            ))
            .create_async()
            .await
    }

    #[test]
    fn test_extract_token() {
        let html = r#"<html><input id="em_validatekey" value="ABC123"/></html>"#;
        assert_eq!(extract_validate_key(html).unwrap(), "ABC123");
    }

    #[test]
    fn test_extract_token_missing_node() {
        let err = extract_validate_key("<html><body></body></html>").unwrap_err();
        assert!(matches!(err, EmError::TokenExtraction(_)));
    }

    #[test]
    fn test_extract_token_duplicate_node() {
        let html = r#"<div><input id="em_validatekey" value="A"/><input id="em_validatekey" value="B"/></div>"#;
        let err = extract_validate_key(html).unwrap_err();
        assert!(matches!(err, EmError::TokenExtraction(_)));
    }

    #[test]
    fn test_extract_token_missing_value_attr() {
        let html = r#"<html><input id="em_validatekey"/></html>"#;
        let err = extract_validate_key(html).unwrap_err();
        assert!(matches!(err, EmError::TokenExtraction(_)));
    }

    #[tokio::test]
    async fn test_initialize_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        mock_captcha(&mut server).await;
        mock_ocr(&mut server, "1234").await;
        let login = mock_login_ok(&mut server).await;
        mock_token_page(&mut server, "TOK-1").await;

        let session = EmSession::initialize(test_config(&server)).await.unwrap();
        assert_eq!(session.validate_key().await, "TOK-1");
        assert!(session.is_authenticated().await);
        login.assert_async().await;

        session.shutdown();
    }

    #[tokio::test]
    async fn test_bad_captcha_shape_skips_login_call() {
        let mut server = mockito::Server::new_async().await;
        mock_captcha(&mut server).await;
        // OCR 识别出字母，说明读错了
        mock_ocr(&mut server, "12a4").await;
        let login = server
            .mock("POST", "/Login/Authentication")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (session, _rx) = EmSession::build(test_config(&server)).unwrap();
        let err = session.login().await.unwrap_err();
        assert!(matches!(err, EmError::CaptchaFormat(ref s) if s == "12a4"));
        // 验证码格式错误后不再发起登录请求
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_rejected_carries_server_message() {
        let mut server = mockito::Server::new_async().await;
        mock_captcha(&mut server).await;
        mock_ocr(&mut server, "1234").await;
        server
            .mock("POST", "/Login/Authentication")
            .match_query(Matcher::Any)
            .with_body(r#"{"Status":-1,"Errcode":"E001","Message":"密码错误"}"#)
            .create_async()
            .await;

        let (session, _rx) = EmSession::build(test_config(&server)).unwrap();
        let err = session.login().await.unwrap_err();
        assert!(matches!(err, EmError::AuthRejected(ref m) if m == "密码错误"));
    }

    #[tokio::test]
    async fn test_initialize_retries_exactly_five_times() {
        let mut server = mockito::Server::new_async().await;
        mock_captcha(&mut server).await;
        mock_ocr(&mut server, "1234").await;
        let login = server
            .mock("POST", "/Login/Authentication")
            .match_query(Matcher::Any)
            .with_body(r#"{"Status":-1,"Errcode":0,"Message":"验证码错误"}"#)
            .expect(5)
            .create_async()
            .await;

        let err = EmSession::initialize(test_config(&server)).await.unwrap_err();
        match err {
            EmError::LoginExhausted { attempts, source } => {
                assert_eq!(attempts, 5);
                assert!(matches!(*source, EmError::AuthRejected(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_renewal_keeps_previous_token() {
        let mut server = mockito::Server::new_async().await;
        mock_captcha(&mut server).await;
        mock_ocr(&mut server, "1234").await;
        mock_login_ok(&mut server).await;
        mock_token_page(&mut server, "TOK-1").await;

        let (session, _rx) = EmSession::build(test_config(&server)).unwrap();
        session.login().await.unwrap();
        assert_eq!(session.validate_key().await, "TOK-1");

        // 后注册的 mock 优先匹配: 之后的登录一律被拒绝
        server
            .mock("POST", "/Login/Authentication")
            .match_query(Matcher::Any)
            .with_body(r#"{"Status":9,"Errcode":0,"Message":"会话冲突"}"#)
            .create_async()
            .await;

        let err = session.login_with_retry().await.unwrap_err();
        assert!(err.is_fatal());
        // 续期失败后旧 token 原样保留
        assert_eq!(session.validate_key().await, "TOK-1");
    }

    #[tokio::test]
    async fn test_initializer_collapses_concurrent_calls() {
        let mut server = mockito::Server::new_async().await;
        mock_captcha(&mut server).await;
        mock_ocr(&mut server, "1234").await;
        let login = mock_login_ok(&mut server).await;
        mock_token_page(&mut server, "TOK-1").await;

        let initializer = SessionInitializer::new(test_config(&server));
        let (a, b) = tokio::join!(initializer.get_or_init(), initializer.get_or_init());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        // 只执行了一次真实登录
        login.assert_async().await;

        a.shutdown();
    }
}
