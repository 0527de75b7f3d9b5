//! Trip Planner 命令行入口
//!
//! 逐行读取标准输入，每行作为一条用户消息交给编排器，打印 JSON 结果。
//! 命令：/new 开新会话，/history 查看当前会话历史，/quit 退出。

use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use trip_planner::config::load_config;
use trip_planner::observability;
use trip_planner::{TripOrchestrator, TurnRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load configuration")?;
    observability::init(&cfg.logging);

    let orchestrator = TripOrchestrator::from_config(&cfg);
    let mut conversation_id: Option<String> = None;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(b"Trip Planner ready. Try: Plan a 3 day trip to Paris with a budget of $1500\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        let output = match line {
            "" => String::new(),
            "/quit" | "/exit" => break,
            "/new" => {
                conversation_id = None;
                "Started a new conversation.\n".to_string()
            }
            "/history" => match &conversation_id {
                Some(id) => {
                    let history = orchestrator.get_history(id, None, None).await?;
                    format!("{}\n", serde_json::to_string_pretty(&history)?)
                }
                None => "No conversation yet.\n".to_string(),
            },
            text => {
                let mut request = TurnRequest::text(text);
                request.conversation_id = conversation_id.clone();
                let turn = orchestrator.process_message(request).await;
                conversation_id = Some(turn.conversation_id().to_string());
                format!("{}\n", serde_json::to_string_pretty(&turn)?)
            }
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}
