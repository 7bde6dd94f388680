//! 结核病筛查命令行程序
//!
//! 从 JSON 文件读取症状和生命体征，执行一次多模态评估，将报告以 JSON 输出到 stdout。

use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tbscreen_admin::{bootstrap_subscriber, init_logging, ConfigManager};
use tbscreen_core::{PatientContext, RawValue, SymptomInput, VitalInput};
use tbscreen_fusion::FusionEngine;
use tbscreen_workflow::{AssessmentPipeline, AssessmentRequest};
use tracing::{error, info};

/// 筛查命令行参数
#[derive(Parser, Debug)]
#[command(name = "tbscreen")]
#[command(about = "结核病多模态筛查：临床评分 + 胸片特征 + 融合")]
struct Args {
    /// 症状 JSON 文件
    #[arg(short, long)]
    symptoms: PathBuf,

    /// 生命体征 JSON 文件
    #[arg(short, long)]
    vitals: Option<PathBuf>,

    /// 患者年龄（岁）
    #[arg(short, long)]
    age: Option<String>,

    /// 患者性别，仅作展示
    #[arg(short, long)]
    gender: Option<String>,

    /// 胸片文件路径
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,
}

/// 评估结束后等待遗留后台任务的最长时间
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    let args = Args::parse();

    // 配置加载期间的日志先输出到临时订阅器
    let bootstrap = bootstrap_subscriber(args.log_level.as_deref())?;
    let config_manager = tracing::subscriber::with_default(bootstrap, || {
        ConfigManager::new(args.config.as_deref())
    })?;
    let mut config = config_manager.get_config().clone();
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    // 初始化日志
    init_logging(&config.logging)?;

    info!("启动结核病筛查评估...");
    info!("  融合权重: 临床 {} / 影像 {}", config.fusion.clinical_weight, config.fusion.radiology_weight);
    info!("  影像超时: {}s", config.pipeline.radiology_timeout_secs);
    info!("  影像失败策略: {:?}", config.pipeline.errored_radiology);

    let symptoms: SymptomInput = read_json(&args.symptoms)?;
    let vitals: VitalInput = match &args.vitals {
        Some(path) => read_json(path)?,
        None => VitalInput::default(),
    };

    let request = AssessmentRequest {
        symptoms,
        vitals,
        patient: PatientContext {
            age: args.age.map(RawValue::Text),
            gender: args.gender,
        },
        image_path: args.image,
    };

    let pipeline = AssessmentPipeline::new(config.pipeline.clone())
        .with_fusion_engine(FusionEngine::with_weights(config.fusion)?);

    let report = block_on_with_grace(pipeline.assess(request))?;

    let output = match serde_json::to_string_pretty(&report) {
        Ok(output) => output,
        Err(e) => {
            error!("报告序列化失败: {}", e);
            return Err(e.into());
        }
    };
    println!("{}", output);

    Ok(())
}

/// 在独立运行时中执行，返回后最多等待 [`SHUTDOWN_GRACE`]
///
/// 超过截止时间的影像解码仍占用阻塞线程池，运行时不会等待它结束。
fn block_on_with_grace<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("无法创建异步运行时")?;

    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}

/// 读取并解析 JSON 输入文件
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(tbscreen_core::TbError::from)
        .with_context(|| format!("无法读取输入文件: {}", path.display()))?;

    serde_json::from_str(&content)
        .map_err(tbscreen_core::TbError::from)
        .with_context(|| format!("无法解析输入文件: {}", path.display()))
}
