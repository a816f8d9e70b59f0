use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use answer_sheet_grader::utils::logging;
use answer_sheet_grader::{App, Config, ScoreField};

#[derive(Parser, Debug)]
#[command(name = "answer-sheet-grader", version, about = "用视觉大模型批改答题卡")]
struct Cli {
    /// TOML 配置文件路径
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 输出 debug 级别日志
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 交互式评分（默认）
    Run,
    /// 批量评分一个文件夹中的答题卡
    GradeDir {
        /// 答案卷图片
        #[arg(long, value_name = "IMAGE")]
        key: PathBuf,
        /// 学生答题卡文件夹
        #[arg(long, value_name = "DIR")]
        students: PathBuf,
        /// 导出的 CSV 路径（默认按时间生成文件名）
        #[arg(long, value_name = "CSV")]
        out: Option<PathBuf>,
        /// 单选题每题分值
        #[arg(long, value_name = "POINTS")]
        mc: Option<String>,
        /// 多选题每题分值
        #[arg(long, value_name = "POINTS")]
        complex: Option<String>,
        /// 问答题每题最高分
        #[arg(long, value_name = "POINTS")]
        essay: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置（缺少 API Key 直接退出）
    let config = Config::load(cli.config.as_deref()).context("加载配置失败")?;

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => App::initialize(config).run_interactive().await,
        Commands::GradeDir {
            key,
            students,
            out,
            mc,
            complex,
            essay,
        } => {
            let mut scoring = config.default_scores;
            let overrides = [
                (ScoreField::MultipleChoice, mc),
                (ScoreField::ComplexMultipleChoice, complex),
                (ScoreField::Essay, essay),
            ];
            for (field, raw) in overrides {
                if let Some(raw) = raw {
                    let value = field
                        .coerce(&raw)
                        .with_context(|| format!("无效的分值参数: {}", field.name()))?;
                    scoring.set(field, value);
                }
            }

            App::initialize(config)
                .run_batch(&key, &students, out, scoring)
                .await?;
            Ok(())
        }
    }
}
