//! 数据类型定义
//!
//! 服务器返回的 JSON 字段是拼音缩写 (Wtbh=委托编号, Zqdm=证券代码 等)，
//! 通过 serde rename 映射到可读的字段名。

use crate::error::{EmError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 通用 JSON 响应信封 `{Status, Message, Data}`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// 状态码，0 表示成功
    #[serde(rename = "Status", alias = "status", default)]
    pub status: i64,
    /// 服务器消息
    #[serde(rename = "Message", default)]
    pub message: String,
    /// 业务数据
    #[serde(rename = "Data", default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// 校验状态码并取出业务数据
    pub fn into_data(self) -> Result<T> {
        if self.status != 0 {
            return Err(EmError::ServerRejected {
                status: self.status,
                message: self.message,
            });
        }
        self.data
            .ok_or_else(|| EmError::Protocol("Response has no Data field".to_string()))
    }
}

/// 委托方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    /// 买入
    Buy,
    /// 卖出
    Sell,
}

impl TradeSide {
    /// 接口使用的单字母标识
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "B",
            TradeSide::Sell => "S",
        }
    }
}

/// 委托下单表单
#[derive(Debug, Clone)]
pub struct TradeOrderForm {
    /// 证券代码
    pub code: String,
    /// 证券名称
    pub name: String,
    /// 委托数量 (股)
    pub amount: u32,
    /// 委托价格
    pub price: Decimal,
    /// 委托方向
    pub side: TradeSide,
}

impl TradeOrderForm {
    /// 创建买入委托
    pub fn buy(code: &str, name: &str, amount: u32, price: Decimal) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            amount,
            price,
            side: TradeSide::Buy,
        }
    }

    /// 创建卖出委托
    pub fn sell(code: &str, name: &str, amount: u32, price: Decimal) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            amount,
            price,
            side: TradeSide::Sell,
        }
    }
}

/// 委托/成交记录
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    /// 委托日期 (yyyyMMdd)
    #[serde(rename = "Wtrq", default)]
    pub date: String,
    /// 委托时间
    #[serde(rename = "Wtsj", default)]
    pub time: String,
    /// 委托编号
    #[serde(rename = "Wtbh", default)]
    pub order_id: String,
    /// 证券代码
    #[serde(rename = "Zqdm", default)]
    pub code: String,
    /// 证券名称
    #[serde(rename = "Zqmc", default)]
    pub name: String,
    /// 委托数量
    #[serde(rename = "Wtsl", default)]
    pub amount: String,
    /// 委托价格
    #[serde(rename = "Wtjg", default)]
    pub price: String,
    /// 成交数量
    #[serde(rename = "Cjsl", default)]
    pub deal_amount: String,
    /// 委托状态 (已报/已成/已撤 等)
    #[serde(rename = "Wtzt", default)]
    pub status: String,
    /// 买卖方向说明
    #[serde(rename = "Mmsm", default)]
    pub side: String,
}

/// 下单响应的业务数据
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedOrder {
    /// 委托编号
    #[serde(rename = "Wtbh")]
    pub order_id: String,
}

/// 持仓明细
#[derive(Debug, Clone, Deserialize)]
pub struct PositionDetail {
    /// 证券代码
    #[serde(rename = "Zqdm", default)]
    pub code: String,
    /// 证券名称
    #[serde(rename = "Zqmc", default)]
    pub name: String,
    /// 持仓数量
    #[serde(rename = "Zqsl", default)]
    pub amount: String,
    /// 可用数量
    #[serde(rename = "Kysl", default)]
    pub available: String,
    /// 成本价
    #[serde(rename = "Cbjg", default)]
    pub cost_price: String,
    /// 最新价
    #[serde(rename = "Zxjg", default)]
    pub latest_price: String,
    /// 最新市值
    #[serde(rename = "Zxsz", default)]
    pub market_value: String,
    /// 持仓盈亏
    #[serde(rename = "Ljyk", default)]
    pub profit: String,
    /// 盈亏比例
    #[serde(rename = "Ykbl", default)]
    pub profit_ratio: String,
}

/// 账户资产与持仓
#[derive(Debug, Clone, Deserialize)]
pub struct AccountDetail {
    /// 资金余额
    #[serde(rename = "Zjye", default)]
    pub balance: String,
    /// 可用资金
    #[serde(rename = "Kyzj", default)]
    pub available_funds: String,
    /// 可取资金
    #[serde(rename = "Kqzj", default)]
    pub withdrawable_funds: String,
    /// 证券市值
    #[serde(rename = "Zxsz", default)]
    pub securities_value: String,
    /// 总资产
    #[serde(rename = "Zzc", default)]
    pub total_assets: String,
    /// 持仓列表
    #[serde(rename = "positions", default)]
    pub positions: Vec<PositionDetail>,
}

/// 批量申购参数 (单只证券)
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeParam {
    /// 申购代码
    #[serde(rename = "StockCode")]
    pub stock_code: String,
    /// 申购名称
    #[serde(rename = "StockName")]
    pub stock_name: String,
    /// 申购价格
    #[serde(rename = "Price")]
    pub price: String,
    /// 申购数量
    #[serde(rename = "Amount")]
    pub amount: u32,
    /// 委托方向 (申购恒为 "B")
    #[serde(rename = "TradeType")]
    pub trade_type: String,
    /// 市场
    #[serde(rename = "Market")]
    pub market: String,
}

/// 批量申购结果
///
/// Data 中是每只证券的申报回执，结构随服务器版本变化，保留原始 JSON。
#[derive(Debug, Deserialize)]
pub struct SubscribeResult {
    /// 状态码，0 表示整体受理成功
    #[serde(rename = "Status", default)]
    pub status: i64,
    /// 服务器消息
    #[serde(rename = "Message", default)]
    pub message: String,
    /// 每只证券的申报回执
    #[serde(rename = "Data", default)]
    pub data: Vec<serde_json::Value>,
}

/// 可申购新股列表
#[derive(Debug, Clone, Deserialize)]
pub struct NewStockList {
    /// 可用资金
    #[serde(rename = "Kyzj", default)]
    pub available_funds: f64,
    /// 资金余额
    #[serde(rename = "Zjye", default)]
    pub balance: String,
    /// 各市场申购额度
    #[serde(rename = "NewQuota", default)]
    pub quotas: Vec<NewQuota>,
    /// 新股原始行 (逗号分隔: 序号,证券代码,证券名称,申购代码,...)
    #[serde(rename = "NewStockList", default)]
    pub stocks: Vec<String>,
}

impl NewStockList {
    /// 转换为批量申购参数
    ///
    /// 新股申购价格和数量由交易所按额度确定，留空由服务器填写。
    pub fn subscribe_params(&self) -> Vec<SubscribeParam> {
        self.stocks
            .iter()
            .filter_map(|row| {
                let fields: Vec<&str> = row.split(',').collect();
                if fields.len() < 4 {
                    return None;
                }
                Some(SubscribeParam {
                    stock_code: fields[3].to_string(),
                    stock_name: fields[2].to_string(),
                    price: String::new(),
                    amount: 0,
                    trade_type: "B".to_string(),
                    market: String::new(),
                })
            })
            .collect()
    }
}

/// 单市场申购额度
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuota {
    /// 股东代码
    #[serde(rename = "Gddm", default)]
    pub holder_account: String,
    /// 科创板申购额度
    #[serde(rename = "Kcbsged", default)]
    pub star_market_quota: String,
    /// 可申购市值额度
    #[serde(rename = "Ksgsz", default)]
    pub quota: String,
    /// 市场
    #[serde(rename = "Market", default)]
    pub market: String,
}

/// 可申购新债列表 (自带信封字段)
#[derive(Debug, Clone, Deserialize)]
pub struct NewBondList {
    /// 状态码，0 表示成功
    #[serde(rename = "Status", default)]
    pub status: i64,
    /// 服务器消息
    #[serde(rename = "Message", default)]
    pub message: String,
    /// 新债列表
    #[serde(rename = "Data", default)]
    pub bonds: Vec<BondOffering>,
}

impl NewBondList {
    /// 转换为批量申购参数
    ///
    /// 新债按面值顶格申购：价格取面值，数量取单户申购上限。
    pub fn subscribe_params(&self) -> Vec<SubscribeParam> {
        self.bonds
            .iter()
            .map(|bond| SubscribeParam {
                stock_code: bond.subscribe_code.clone(),
                stock_name: bond.subscribe_name.clone(),
                price: bond.par_value.clone(),
                amount: bond.limit_buy_volume.parse().unwrap_or(0),
                trade_type: "B".to_string(),
                market: bond.market.clone(),
            })
            .collect()
    }
}

/// 新债发行信息
#[derive(Debug, Clone, Deserialize)]
pub struct BondOffering {
    /// 债券代码
    #[serde(rename = "BONDCODE", default)]
    pub bond_code: String,
    /// 债券名称
    #[serde(rename = "BONDNAME", default)]
    pub bond_name: String,
    /// 申购代码
    #[serde(rename = "SUBCODE", default)]
    pub subscribe_code: String,
    /// 申购名称
    #[serde(rename = "SUBNAME", default)]
    pub subscribe_name: String,
    /// 面值 (申购价格)
    #[serde(rename = "PARVALUE", default)]
    pub par_value: String,
    /// 单户申购上限 (张)
    #[serde(rename = "LIMITBUYVOL", default)]
    pub limit_buy_volume: String,
    /// 最小申购数量 (张)
    #[serde(rename = "FLOORBUYVOL", default)]
    pub floor_buy_volume: String,
    /// 信用评级
    #[serde(rename = "CREDITRATING", default)]
    pub credit_rating: String,
    /// 申购日期
    #[serde(rename = "PURCHASEDATE", default)]
    pub purchase_date: String,
    /// 市场
    #[serde(rename = "Market", default)]
    pub market: String,
}
