//! CLI channel: stdin/stdout REPL for local testing.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::RouterMode;
use crate::tasks::{PollReport, StatusPoller};
use crate::tools::ToolRegistry;
use crate::turn::{REQUEST_NOT_FOUND, TurnRouter, extract_task_id};

pub const CLIENT_TIMEOUT: &str =
    "Request timed out on the client side. The answer may still arrive; check its status later.";

const HELP: &str = "Commands: /summary, /help, /quit. Anything else is sent as a prompt.";

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel {
    tools: Arc<ToolRegistry>,
    router: Arc<TurnRouter>,
    poller: StatusPoller,
    user_id: String,
}

impl CliChannel {
    pub fn new(
        tools: Arc<ToolRegistry>,
        router: Arc<TurnRouter>,
        poller: StatusPoller,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            tools,
            router,
            poller,
            user_id: user_id.into(),
        }
    }

    /// Run the REPL on the process's stdin and stdout until EOF or `/quit`.
    pub async fn run(&self) -> std::io::Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        self.run_with(reader, tokio::io::stdout()).await
    }

    pub async fn run_with<R, W>(&self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        output.write_all(b"> ").await?;
        output.flush().await?;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                output.write_all(b"> ").await?;
                output.flush().await?;
                continue;
            }
            if line == "/quit" {
                break;
            }

            let reply = self.handle_line(line).await;
            output.write_all(format!("\n{reply}\n\n> ").as_bytes()).await?;
            output.flush().await?;
        }
        Ok(())
    }

    /// Resolve one input line to the text shown to the user.
    pub async fn handle_line(&self, line: &str) -> String {
        match line {
            "/help" => HELP.to_string(),
            "/summary" => self
                .call("summarize_history", serde_json::json!({"user_id": self.user_id}))
                .await,
            prompt => {
                let reply = self
                    .call(
                        "process_conversation_turn",
                        serde_json::json!({"user_id": self.user_id, "prompt": prompt}),
                    )
                    .await;
                if self.router.mode() != RouterMode::Deferred {
                    return reply;
                }
                match extract_task_id(&reply) {
                    Some(task_id) => self.wait_for(&task_id).await,
                    None => reply,
                }
            }
        }
    }

    async fn wait_for(&self, task_id: &str) -> String {
        tracing::debug!(task_id, "Waiting for deferred answer");
        let report = self.poller.wait(|| self.router.poll(task_id)).await;
        match report {
            PollReport::Ready(text) => text,
            PollReport::NotFound => REQUEST_NOT_FOUND.to_string(),
            PollReport::TimedOut { attempts } => {
                tracing::warn!(task_id, attempts, "Gave up polling");
                CLIENT_TIMEOUT.to_string()
            }
        }
    }

    async fn call(&self, tool: &str, params: serde_json::Value) -> String {
        match self.tools.execute(tool, params).await {
            Ok(output) => output.as_text(),
            Err(e) => format!("Error: {e}"),
        }
    }
}
