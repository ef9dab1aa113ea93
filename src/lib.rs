//! 东方财富网页交易客户端
//!
//! 模拟网页端完成登录认证并维持会话，在此之上提供下单、撤单、
//! 查询和新股新债申购接口。
//!
//! # 功能
//!
//! - 自动登录: 验证码识别 (外部 OCR 服务) + RSA 加密密码
//! - 会话维持: 后台任务定时重新登录刷新 validatekey
//! - 交易接口: 下单/撤单/委托查询/成交查询/持仓与资产查询
//! - 打新: 可申购新股/新债查询与一键批量申购
//!
//! # 示例
//!
//! ```no_run
//! use eastmoney_client::{EmClient, EmClientConfig, EmSession};
//!
//! #[tokio::main]
//! async fn main() -> eastmoney_client::Result<()> {
//!     let config = EmClientConfig::new("资金账号", "登录密码", "http://127.0.0.1:9898");
//!     let session = EmSession::initialize(config).await?;
//!
//!     let client = EmClient::new(session);
//!     let account = client.query_asset_and_position().await?;
//!     println!("总资产: {}", account.total_assets);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod ocr;
pub mod session;
pub mod trade;
pub mod types;

pub use config::EmClientConfig;
pub use error::{EmError, Result};
pub use ocr::OcrClient;
pub use session::{EmSession, SessionInitializer};
pub use trade::{is_etf, market_for_code, EmClient};
pub use types::{
    AccountDetail, BondOffering, Envelope, NewBondList, NewQuota, NewStockList, Order,
    PositionDetail, SubmittedOrder, SubscribeParam, SubscribeResult, TradeOrderForm, TradeSide,
};
