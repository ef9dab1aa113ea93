//! 资产与持仓查询案例
//!
//! 用法:
//! ```bash
//! EM_ACCOUNT=资金账号 EM_PASSWORD=密码 EM_OCR_HOST=http://127.0.0.1:9898 \
//!     cargo run --example query_assets
//! ```

use eastmoney_client::{EmClient, EmClientConfig, EmSession};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("eastmoney_client=info,query_assets=info")),
        )
        .init();

    let Some(config) = EmClientConfig::from_env() else {
        eprintln!("缺少环境变量: EM_ACCOUNT / EM_PASSWORD / EM_OCR_HOST");
        std::process::exit(1);
    };

    println!("==================================================");
    println!("东方财富交易客户端 - 资产查询");
    println!("==================================================");
    println!("账号: {}", config.account);
    println!("站点: {}", config.base_url);
    println!("==================================================");

    // 登录并启动后台续期
    println!("\n[1] 正在登录...");
    let session = match EmSession::initialize(config).await {
        Ok(session) => session,
        Err(e) => {
            // 首次登录失败没有可用身份，直接退出
            eprintln!("[1] 登录失败: {}", e);
            std::process::exit(1);
        }
    };
    println!("[1] *** 登录成功! ***");

    let client = EmClient::new(session.clone());

    // 查询资产
    println!("\n[2] 查询账户资产...");
    let account = client.query_asset_and_position().await?;
    println!("[2] ----------------------------------------");
    println!("[2] 总资产: {}", account.total_assets);
    println!("[2] 资金余额: {}", account.balance);
    println!("[2] 可用资金: {}", account.available_funds);
    println!("[2] 可取资金: {}", account.withdrawable_funds);
    println!("[2] 证券市值: {}", account.securities_value);
    println!("[2] ----------------------------------------");

    // 打印持仓 (CSV格式)
    println!("\n[3] 当前持仓 ({} 只):", account.positions.len());
    println!("代码,名称,数量,可用,成本价,最新价,市值,盈亏,盈亏比例");
    for p in &account.positions {
        println!(
            "{},{},{},{},{},{},{},{},{}",
            p.code,
            p.name,
            p.amount,
            p.available,
            p.cost_price,
            p.latest_price,
            p.market_value,
            p.profit,
            p.profit_ratio
        );
    }

    // 查询当日委托
    println!("\n[4] 当日委托:");
    let orders = client.get_orders_list().await?;
    if orders.is_empty() {
        println!("    (无)");
    }
    for o in &orders {
        println!(
            "    {} {} {} {} {}股 @{} 状态:{}",
            o.time, o.order_id, o.code, o.name, o.amount, o.price, o.status
        );
    }

    session.shutdown();
    println!("\n==================================================");
    println!("查询完成!");
    println!("==================================================");
    Ok(())
}
