//! 交易操作模块 - 下单/撤单/查询/新股新债申购
//!
//! 所有接口都带 `validatekey` 查询参数，取值为会话当前 token，
//! 每次调用时重新读取。本层不参与会话续期: token 失效时请求会被
//! 服务器拒绝并原样返回给调用方，等下个续期周期自愈。

use crate::error::{EmError, Result};
use crate::session::EmSession;
use crate::types::{
    AccountDetail, Envelope, NewBondList, NewStockList, Order, PositionDetail, SubmittedOrder,
    SubscribeParam, SubscribeResult, TradeOrderForm,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// 委托/成交查询的请求行数
const ORDER_QUERY_ROWS: &str = "100";

/// 持仓查询的请求行数
const POSITION_QUERY_ROWS: &str = "10";

/// 根据证券代码推断市场 (沪市 HA / 深市 SA)
///
/// 沪市: 股票 6 开头，基金 5 开头，可转债 11 开头；其余按深市处理。
pub fn market_for_code(code: &str) -> &'static str {
    if code.starts_with('6') || code.starts_with('5') || code.starts_with("11") {
        "HA"
    } else {
        "SA"
    }
}

/// 是否为场内基金 (沪 51x / 深 15x)
pub fn is_etf(code: &str) -> bool {
    code.starts_with("51") || code.starts_with("15")
}

/// 交易客户端
///
/// 只消费会话的 token，自身无状态，可按需创建多个实例。
pub struct EmClient {
    session: Arc<EmSession>,
}

impl EmClient {
    /// 创建交易客户端
    pub fn new(session: Arc<EmSession>) -> Self {
        Self { session }
    }

    /// 提交委托，返回委托编号
    pub async fn submit_trade(&self, order: &TradeOrderForm) -> Result<String> {
        if order.amount == 0 {
            return Err(EmError::InvalidParams("委托数量不能为0".to_string()));
        }

        // 基金价格精确到3位小数，股票2位
        let price = if is_etf(&order.code) {
            order.price.round_dp(3)
        } else {
            order.price.round_dp(2)
        };

        let amount = order.amount.to_string();
        let price_str = price.to_string();
        let form = [
            ("stockCode", order.code.as_str()),
            ("zqmc", order.name.as_str()),
            ("amount", amount.as_str()),
            ("tradeType", order.side.as_str()),
            ("market", market_for_code(&order.code)),
            ("price", price_str.as_str()),
        ];

        let envelope: Envelope<Vec<SubmittedOrder>> =
            self.post_form("/Trade/SubmitTradeV2", &form).await?;
        let mut data = envelope.into_data()?;

        if data.len() != 1 {
            return Err(EmError::Protocol(format!(
                "Expected exactly 1 order id, got {}",
                data.len()
            )));
        }
        let submitted = data.remove(0);
        tracing::info!(
            "Order submitted: id={}, code={}, amount={}, price={}, side={}",
            submitted.order_id,
            order.code,
            order.amount,
            price,
            order.side.as_str()
        );
        Ok(submitted.order_id)
    }

    /// 查询当日全部委托
    pub async fn get_orders_list(&self) -> Result<Vec<Order>> {
        self.query_orders("/Search/GetOrdersData").await
    }

    /// 查询当日成交
    pub async fn get_deal_list(&self) -> Result<Vec<Order>> {
        self.query_orders("/Search/GetDealData").await
    }

    /// 查询可撤委托
    pub async fn get_revoke_list(&self) -> Result<Vec<Order>> {
        self.query_orders("/Trade/GetRevokeList").await
    }

    async fn query_orders(&self, path: &str) -> Result<Vec<Order>> {
        let form = [("qqhs", ORDER_QUERY_ROWS)];
        let envelope: Envelope<Vec<Order>> = self.post_form(path, &form).await?;
        envelope.into_data()
    }

    /// 撤单，支持批量
    ///
    /// 服务器以自由文本逐单报告结果 (格式: 委托编号: 消息)，
    /// 原样返回，由调用方自行判断是否全部成功。
    pub async fn revoke_orders(&self, orders: &[Order]) -> Result<String> {
        if orders.is_empty() {
            return Err(EmError::InvalidParams("没有需要撤单的委托".to_string()));
        }

        let revokes = orders
            .iter()
            .map(|o| format!("{}_{}", o.date, o.order_id))
            .collect::<Vec<_>>()
            .join(",");
        let form = [("revokes", revokes.as_str())];

        let url = self.authed_url("/Trade/RevokeOrders").await;
        let response = self.session.http().post(&url).form(&form).send().await?;
        Ok(response.text().await?)
    }

    /// 查询当前持仓
    pub async fn get_stock_list(&self) -> Result<Vec<PositionDetail>> {
        let form = [("qqhs", POSITION_QUERY_ROWS)];
        let envelope: Envelope<Vec<PositionDetail>> =
            self.post_form("/Search/GetStockList", &form).await?;
        envelope.into_data()
    }

    /// 查询账户资产和持仓
    pub async fn query_asset_and_position(&self) -> Result<AccountDetail> {
        let form = [("moneyType", "RMB")];
        let envelope: Envelope<Vec<AccountDetail>> =
            self.post_form("/Com/queryAssetAndPositionV1", &form).await?;
        let mut data = envelope.into_data()?;

        if data.len() != 1 {
            return Err(EmError::Protocol(format!(
                "Expected exactly 1 account detail, got {}",
                data.len()
            )));
        }
        Ok(data.remove(0))
    }

    /// 查询可申购新股列表
    pub async fn get_new_stock_list(&self) -> Result<NewStockList> {
        let url = self.authed_url("/Trade/GetCanBuyNewStockListV3").await;
        let response = self.session.http().post(&url).send().await?;
        Ok(response.json().await?)
    }

    /// 查询可申购新债列表
    pub async fn get_new_bond_list(&self) -> Result<NewBondList> {
        let url = self.authed_url("/Trade/GetConvertibleBondListV2").await;
        let response = self.session.http().post(&url).send().await?;
        let list: NewBondList = response.json().await?;

        if list.status != 0 {
            return Err(EmError::ServerRejected {
                status: list.status,
                message: list.message,
            });
        }
        Ok(list)
    }

    /// 批量申购新股/新债
    pub async fn submit_bat_trade(&self, params: &[SubscribeParam]) -> Result<SubscribeResult> {
        if params.is_empty() {
            return Err(EmError::InvalidParams("没有需要申购的证券".to_string()));
        }

        let url = self.authed_url("/Trade/SubmitBatTradeV2").await;
        let response = self.session.http().post(&url).json(params).send().await?;
        let result: SubscribeResult = response.json().await?;

        if result.status != 0 {
            return Err(EmError::ServerRejected {
                status: result.status,
                message: result.message,
            });
        }
        tracing::info!("Batch subscription accepted: {} securities", params.len());
        Ok(result)
    }

    /// 拼接带 validatekey 的接口地址，token 在调用时读取最新值
    async fn authed_url(&self, path: &str) -> String {
        format!(
            "{}{}?validatekey={}",
            self.session.base_url(),
            path,
            self.session.validate_key().await
        )
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Envelope<T>> {
        let url = self.authed_url(path).await;
        let response = self.session.http().post(&url).form(form).send().await?;
        Ok(response.json().await?)
    }
}
