// ==========================================
// 轮岗人员调配系统 - 命令行入口
// ==========================================
// 用法: rotation-allocation [db_path] [date]
// 默认: 用户数据目录下的数据库, 当天日期
// ==========================================

use anyhow::Context;
use chrono::{Local, NaiveDate};
use rotation_allocation::logging;
use rotation_allocation::service::{get_default_db_path, AllocationService, ServiceOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", rotation_allocation::APP_NAME, rotation_allocation::VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let date = match args.next() {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .with_context(|| format!("日期格式应为 YYYY-MM-DD: {}", raw))?,
        None => Local::now().date_naive(),
    };

    tracing::info!("使用数据库: {}", db_path);
    let service = AllocationService::open(&db_path, ServiceOptions::default())
        .context("初始化调配服务失败")?;

    let ranking = service
        .rank_all_branches(date)
        .await
        .with_context(|| format!("生成 {} 的全局排名失败", date))?;

    if ranking.is_empty() {
        tracing::info!(%date, "当日无人员缺口");
    }
    for (index, item) in ranking.iter().enumerate() {
        tracing::info!(
            rank = index + 1,
            branch = %item.branch_code,
            position = %item.position_name,
            current = item.current_count,
            minimum = item.minimum_required,
            designated = item.designated_quota,
            group1 = item.group1_score,
            group2 = item.group2_score,
            group3 = item.group3_score,
            legacy_score = item.legacy_score,
            reason = %item.reason,
            "排名"
        );
    }

    service.shutdown().await.context("停止回写队列失败")?;
    Ok(())
}
