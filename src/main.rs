// ==========================================
// 销售批次守护 - 命令行入口
// ==========================================
// 用法:
//   sales-batch-guard import-batches <file.csv>
//   sales-batch-guard validate-invoice <document.json> [--allow-override]
//   sales-batch-guard validate-work-order <work_order.json> [--allow-override]
//   sales-batch-guard check-availability <document.json>
//   sales-batch-guard batch-dates <batch_no>
// 环境变量:
//   SALES_BATCH_GUARD_DB_PATH  数据库路径
//   SALES_BATCH_GUARD_LOG_JSON 非空时输出 JSON 日志
// ==========================================

use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use sales_batch_guard::api::ApiError;
use sales_batch_guard::app::{get_default_db_path, AppState};
use sales_batch_guard::{logging, SalesDocument, ValidationOutcome, WorkOrder};
use serde::de::DeserializeOwned;
use serde_json::json;

/// 阻断保存时的退出码
const EXIT_BLOCKED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init(std::env::var_os("SALES_BATCH_GUARD_LOG_JSON").is_some());

    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("执行失败: {:#}", e);
            eprintln!("错误: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("help");
    let allow_override = args.iter().any(|a| a == "--allow-override");
    let positional = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .map(String::as_str);

    if command == "help" || command == "--help" {
        print_usage();
        return Ok(ExitCode::SUCCESS);
    }

    let db_path = get_default_db_path();
    tracing::info!("{} v{} 使用数据库: {}", sales_batch_guard::APP_NAME, sales_batch_guard::VERSION, db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!("无法初始化AppState: {}", e))?;

    match command {
        "import-batches" => {
            let path = positional.context("缺少 CSV 文件路径")?;
            let summary = state.batch_importer.import_file(Path::new(path))?;
            print_json(&summary)?;
            Ok(ExitCode::SUCCESS)
        }
        "validate-invoice" => {
            let path = positional.context("缺少单据 JSON 路径")?;
            let doc: SalesDocument = read_json(path)?;
            let result = state
                .batch_validation_api
                .validate_sales_document(&doc, allow_override)
                .await;
            report_validation(result)
        }
        "validate-work-order" => {
            let path = positional.context("缺少工单 JSON 路径")?;
            let order: WorkOrder = read_json(path)?;
            let result = state
                .batch_validation_api
                .validate_work_order(&order, allow_override)
                .await;
            report_validation(result)
        }
        "check-availability" => {
            let path = positional.context("缺少单据 JSON 路径")?;
            let doc: SalesDocument = read_json(path)?;
            match state.batch_validation_api.check_available_qty(&doc).await {
                Ok(shortages) => {
                    print_json(&json!({ "blocked": false, "shortages": shortages }))?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(ApiError::InsufficientBatchAvailability { reason, shortages }) => {
                    print_json(&json!({ "blocked": true, "reason": reason, "shortages": shortages }))?;
                    Ok(ExitCode::from(EXIT_BLOCKED))
                }
                Err(e) => Err(e.into()),
            }
        }
        "batch-dates" => {
            let dates = state.batch_validation_api.batch_dates(positional)?;
            print_json(&dates)?;
            Ok(ExitCode::SUCCESS)
        }
        other => {
            print_usage();
            bail!("未知命令: {}", other)
        }
    }
}

fn report_validation(
    result: Result<ValidationOutcome, ApiError>,
) -> anyhow::Result<ExitCode> {
    match result {
        Ok(outcome) => {
            print_json(&outcome)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(ApiError::BatchQuantityBlocked { reason, violations }) => {
            let rows: Vec<_> = violations
                .iter()
                .map(|v| {
                    json!({
                        "index": v.index,
                        "item_code": v.item_code,
                        "batch_no": v.batch_no,
                        "qty": v.qty,
                        "batch_size": v.limit.value(),
                        "reason": v.reason.describe(),
                    })
                })
                .collect();
            print_json(&json!({
                "blocked": true,
                "reason": reason,
                "violations": rows,
                "hint": "调整数量/更换批次，或使用 --allow-override 重新保存",
            }))?;
            Ok(ExitCode::from(EXIT_BLOCKED))
        }
        Err(e) => Err(e.into()),
    }
}

fn read_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("读取文件失败: {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("JSON 解析失败: {}", path))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_usage() {
    println!("{} v{}", sales_batch_guard::APP_NAME, sales_batch_guard::VERSION);
    println!();
    println!("用法:");
    println!("  sales-batch-guard import-batches <file.csv>");
    println!("  sales-batch-guard validate-invoice <document.json> [--allow-override]");
    println!("  sales-batch-guard validate-work-order <work_order.json> [--allow-override]");
    println!("  sales-batch-guard check-availability <document.json>");
    println!("  sales-batch-guard batch-dates <batch_no>");
}
