//! 交互式命令行 - 编排层
//!
//! 每一行输入用 clap 解析为一个子命令，交给 `WorkflowController` 执行。
//! 错误直接显示在行内，不会结束会话。
//!
//! 摄像头会话在进入扫描步骤时打开，重置或退出时释放。

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, WorkflowError};
use crate::infrastructure::{CameraDevice, CameraSession};
use crate::models::{load_image_file, AnswerKey, CapturedImage, GradedStudent, ScoreField};
use crate::services::{default_export_path, write_csv_file};
use crate::workflow::{WorkflowController, WorkflowState};

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand)]
enum ShellCommand {
    /// 选择答案卷图片文件
    Key { path: PathBuf },
    /// 用摄像头拍摄答案卷
    KeyCamera,
    /// 分析答案键
    Analyze,
    /// 显示已提取的答案键
    ShowKey,
    /// 设置分值：score <mc|complex|essay> <值>
    Score {
        field: ScoreField,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// 开始扫描学生答题卡
    Start,
    /// 评分一份答题卡图片文件
    Scan { path: PathBuf },
    /// 用摄像头拍摄并评分一份答题卡
    ScanCamera,
    /// 显示成绩表
    Table,
    /// 导出成绩 CSV
    Export { path: Option<PathBuf> },
    /// 显示当前状态
    Status,
    /// 清除全部数据，回到第 1 步
    Reset,
    /// 退出
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, PartialEq)]
enum LineOutcome {
    Continue,
    Failed(String),
    Quit,
}

/// 交互式会话
pub struct Shell {
    controller: WorkflowController,
    camera: Option<Arc<dyn CameraDevice>>,
    scan_session: Option<CameraSession>,
}

impl Shell {
    pub fn new(controller: WorkflowController, camera: Option<Arc<dyn CameraDevice>>) -> Self {
        Self {
            controller,
            camera,
            scan_session: None,
        }
    }

    /// 读取标准输入直到 quit 或 EOF
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("输入 help 查看命令。");
        self.print_step();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("grader [{}]> ", self.controller.state());
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            match self.run_line(&line).await {
                LineOutcome::Continue => {}
                LineOutcome::Failed(message) => println!("❌ {}", message),
                LineOutcome::Quit => break,
            }
        }

        // 离开扫描界面，释放摄像头
        self.scan_session = None;
        Ok(())
    }

    /// 解析并执行一行输入
    ///
    /// 失败时显示本次命令产生的错误，而不是会话里之前记录的错误
    async fn run_line(&mut self, line: &str) -> LineOutcome {
        let args = split_args(line);
        if args.is_empty() {
            return LineOutcome::Continue;
        }

        let command = match ShellLine::try_parse_from(args) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                println!("{}", e);
                return LineOutcome::Continue;
            }
        };

        if matches!(command, ShellCommand::Quit) {
            return LineOutcome::Quit;
        }

        match self.execute(command).await {
            Ok(()) => LineOutcome::Continue,
            Err(e) => LineOutcome::Failed(e.to_string()),
        }
    }

    async fn execute(&mut self, command: ShellCommand) -> AppResult<()> {
        debug!("执行命令: {:?}", command);
        match command {
            ShellCommand::Key { path } => {
                let image = load_image_file(&path).await?;
                self.controller.select_key_image(image)?;
                println!("✓ 已选择答案卷: {}", path.display());
            }
            ShellCommand::KeyCamera => {
                if self.controller.state() != WorkflowState::AwaitingKey {
                    return Err(WorkflowError::InvalidState {
                        current: self.controller.state().name(),
                        expected: WorkflowState::AwaitingKey.name(),
                    }
                    .into());
                }
                // 拍完即返回上传界面，会话在此作用域结束时释放
                let image = {
                    let mut session = self.open_camera().await?;
                    session.capture().await?
                };
                println!("✓ 已拍摄答案卷: {}", image.label);
                self.controller.select_key_image(image)?;
            }
            ShellCommand::Analyze => {
                println!("分析中...");
                let busy = self.controller.busy_flag();
                let key = with_progress(busy, self.controller.analyze_key()).await?;
                println!("\n✓ 答案键提取完成");
                print!("{}", render_key(key));
                self.print_step();
            }
            ShellCommand::ShowKey => match self.controller.session().answer_key() {
                Some(key) => print!("{}", render_key(key)),
                None => println!("尚未提取答案键"),
            },
            ShellCommand::Score { field, value } => {
                self.controller.set_score(field, &value)?;
                println!("✓ {}", self.controller.session().scoring());
            }
            ShellCommand::Start => {
                self.controller.start_scanning()?;
                self.print_step();
                if self.camera.is_some() {
                    let opened = self.open_camera().await;
                    match opened {
                        Ok(session) => self.scan_session = Some(session),
                        Err(e) => println!("❌ {}", e),
                    }
                }
            }
            ShellCommand::Scan { path } => {
                let image = load_image_file(&path).await?;
                self.grade(image).await?;
            }
            ShellCommand::ScanCamera => {
                let image = self.capture_student_sheet().await?;
                self.grade(image).await?;
            }
            ShellCommand::Table => print!("{}", render_table(self.controller.results())),
            ShellCommand::Export { path } => {
                let path = path.unwrap_or_else(default_export_path);
                write_csv_file(self.controller.results(), &path)?;
                println!(
                    "✓ 已导出 {} 条成绩到 {}",
                    self.controller.results().len(),
                    path.display()
                );
            }
            ShellCommand::Status => self.print_status(),
            ShellCommand::Reset => {
                self.controller.reset()?;
                self.scan_session = None;
                println!("✓ 已重置");
                self.print_step();
            }
            ShellCommand::Quit => {}
        }
        Ok(())
    }

    async fn grade(&mut self, image: CapturedImage) -> AppResult<()> {
        println!("评分中: {}", image.label);
        let busy = self.controller.busy_flag();
        let record = with_progress(busy, self.controller.grade_student(image)).await?;
        println!();
        print!("{}", render_table(std::slice::from_ref(&record)));
        Ok(())
    }

    /// 扫描步骤的拍照：摄像头不可用时拒绝，不自动重试
    async fn capture_student_sheet(&mut self) -> AppResult<CapturedImage> {
        if self.controller.state() != WorkflowState::ScanningStudents {
            return Err(WorkflowError::InvalidState {
                current: self.controller.state().name(),
                expected: WorkflowState::ScanningStudents.name(),
            }
            .into());
        }
        if self.controller.is_busy() {
            return Err(WorkflowError::Busy.into());
        }

        if self.scan_session.is_none() {
            self.scan_session = Some(self.open_camera().await?);
        }
        match self.scan_session.as_mut() {
            Some(session) => Ok(session.capture().await?),
            None => Err(WorkflowError::MissingPrerequisite("摄像头").into()),
        }
    }

    async fn open_camera(&self) -> AppResult<CameraSession> {
        let camera = self.camera.as_ref().ok_or(AppError::Workflow(
            WorkflowError::MissingPrerequisite("摄像头（请配置 CAMERA_COMMAND）"),
        ))?;
        match camera.open().await {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!("无法打开摄像头 {}: {}", camera.name(), e);
                Err(e.into())
            }
        }
    }

    fn print_step(&self) {
        let state = self.controller.state();
        println!("== {} ==", state.step_title());
        match state {
            WorkflowState::AwaitingKey => {
                println!("  key <图片> 或 key-camera 选择答案卷，然后 analyze")
            }
            WorkflowState::ConfiguringScores => {
                println!("  当前分值: {}", self.controller.session().scoring());
                println!("  score <mc|complex|essay> <值> 修改分值，然后 start");
            }
            WorkflowState::ScanningStudents => {
                println!("  scan <图片> 或 scan-camera 评分，table 查看，export 导出，reset 重来")
            }
        }
    }

    fn print_status(&self) {
        let session = self.controller.session();
        println!("状态: {}", session.state().step_title());
        if let Some(image) = session.key_image() {
            println!("答案卷: {} ({})", image.label, image.mime_type);
        }
        if let Some(key) = session.answer_key() {
            println!("答案键: {}", key.summary());
        }
        println!("分值: {}", session.scoring());
        println!("已评分: {} 份", session.ledger().len());
        if let Some(session) = &self.scan_session {
            println!("摄像头: {}", session.device());
        }
        if let Some(error) = session.last_error() {
            println!("最近错误: {}", error);
        }
    }
}

/// 模型调用期间每隔一段时间打印一个点
async fn with_progress<F: Future>(busy: Arc<AtomicBool>, fut: F) -> F::Output {
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(500));
        loop {
            interval.tick().await;
            if busy.load(Ordering::Acquire) {
                print!(".");
                let _ = std::io::stdout().flush();
            }
        }
    });
    let output = fut.await;
    ticker.abort();
    output
}

/// 按空白切分参数，支持单引号和双引号
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        args.push(current);
    }
    args
}

/// 成绩表
fn render_table(records: &[GradedStudent]) -> String {
    if records.is_empty() {
        return "还没有评分记录，扫描答题卡后会显示在这里。\n".to_string();
    }

    let mut out = format!(
        "{:<10} {:>10} {:>10} {:>10} {:>10}\n",
        "学生", "单选题", "多选题", "问答题", "总分"
    );
    for record in records {
        let s = &record.scores;
        out.push_str(&format!(
            "{:<10} {:>10} {:>10} {:>10} {:>10}\n",
            format!("学生 #{}", record.id),
            s.multiple_choice_score,
            s.complex_multiple_choice_score,
            s.essay_score,
            s.total_score
        ));
    }
    out
}

/// 答案键
fn render_key(key: &AnswerKey) -> String {
    let mut out = format!("答案键: {}\n", key.summary());
    for item in &key.multiple_choice {
        out.push_str(&format!("  单选 {:>3}: {}\n", item.number, item.answer));
    }
    for item in &key.complex_multiple_choice {
        out.push_str(&format!(
            "  多选 {:>3}: {}\n",
            item.number,
            item.answers.join(", ")
        ));
    }
    for item in &key.essay {
        out.push_str(&format!("  问答 {:>3}: {}\n", item.number, item.key_points));
    }
    out
}
