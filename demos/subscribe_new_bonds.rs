//! 新债一键申购案例
//!
//! 查询当日可申购的新债并顶格申购。
//!
//! 用法:
//! ```bash
//! EM_ACCOUNT=资金账号 EM_PASSWORD=密码 EM_OCR_HOST=http://127.0.0.1:9898 \
//!     cargo run --example subscribe_new_bonds
//! ```

use eastmoney_client::{EmClient, EmClientConfig, EmSession};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("eastmoney_client=info,subscribe_new_bonds=info")
        }))
        .init();

    let Some(config) = EmClientConfig::from_env() else {
        eprintln!("缺少环境变量: EM_ACCOUNT / EM_PASSWORD / EM_OCR_HOST");
        std::process::exit(1);
    };

    println!("==================================================");
    println!("东方财富交易客户端 - 新债申购");
    println!("==================================================");
    println!("账号: {}", config.account);
    println!("日期: {}", chrono::Local::now().format("%Y-%m-%d"));
    println!("==================================================");

    println!("\n[1] 正在登录...");
    let session = match EmSession::initialize(config).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("[1] 登录失败: {}", e);
            std::process::exit(1);
        }
    };
    println!("[1] *** 登录成功! ***");

    let client = EmClient::new(session.clone());

    // 查询可申购新债
    println!("\n[2] 查询可申购新债...");
    let bonds = client.get_new_bond_list().await?;
    if bonds.bonds.is_empty() {
        println!("[2] 今日无新债可申购");
        session.shutdown();
        return Ok(());
    }
    for b in &bonds.bonds {
        println!(
            "[2] {} {} (申购代码 {}, 评级 {}, 上限 {}张)",
            b.bond_code, b.bond_name, b.subscribe_code, b.credit_rating, b.limit_buy_volume
        );
    }

    // 顶格申购
    println!("\n[3] 提交批量申购...");
    let params = bonds.subscribe_params();
    let result = client.submit_bat_trade(&params).await?;
    println!("[3] *** 申购受理成功! 共 {} 笔回执 ***", result.data.len());
    for receipt in &result.data {
        println!("[3] {}", receipt);
    }

    session.shutdown();
    println!("\n==================================================");
    println!("申购完成!");
    println!("==================================================");
    Ok(())
}
