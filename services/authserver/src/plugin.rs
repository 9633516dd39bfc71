//! Line-oriented JSON RPC to an external plugin process.
//!
//! The original design loads plugins in-process; here a plugin is a
//! long-running subprocess spawned at startup that answers one JSON
//! request per line on stdin with one JSON response per line on stdout.
//! Calls are serialized over the pipe.

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

struct PluginProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

pub struct PluginClient {
    command: String,
    process: Mutex<Option<PluginProcess>>,
}

impl PluginClient {
    pub async fn spawn(command: &str, args: &[String]) -> anyhow::Result<Self> {
        let process = start(command, args).await?;
        Ok(Self {
            command: command.to_string(),
            process: Mutex::new(Some(process)),
        })
    }

    pub async fn call<Req, Resp>(&self, request: &Req) -> anyhow::Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut guard = self.process.lock().await;
        let process = guard
            .as_mut()
            .ok_or_else(|| anyhow!("plugin {} is stopped", self.command))?;

        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        process
            .stdin
            .write_all(line.as_bytes())
            .await
            .with_context(|| format!("plugin {}: write request", self.command))?;
        process.stdin.flush().await?;

        let mut response = String::new();
        let read = process
            .stdout
            .read_line(&mut response)
            .await
            .with_context(|| format!("plugin {}: read response", self.command))?;
        if read == 0 {
            // Plugin died; drop the handle so later calls fail fast.
            *guard = None;
            return Err(anyhow!("plugin {} closed its stdout", self.command));
        }
        serde_json::from_str(response.trim_end())
            .with_context(|| format!("plugin {}: malformed response", self.command))
    }

    pub async fn stop(&self) {
        let mut guard = self.process.lock().await;
        if let Some(mut process) = guard.take() {
            let _ = process.child.start_kill();
            let _ = process.child.wait().await;
        }
    }
}

async fn start(command: &str, args: &[String]) -> anyhow::Result<PluginProcess> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("spawn plugin {command}"))?;
    let stdin = child.stdin.take().ok_or_else(|| anyhow!("plugin stdin unavailable"))?;
    let stdout = child.stdout.take().ok_or_else(|| anyhow!("plugin stdout unavailable"))?;
    Ok(PluginProcess {
        child,
        stdin,
        stdout: BufReader::new(stdout),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn round_trips_one_line_per_call() {
        // `cat` echoes each request line back, which is a valid JSON
        // response for this transport.
        let client = PluginClient::spawn("cat", &[]).await.expect("spawn");
        let response: Value = client.call(&json!({"ping": 1})).await.expect("call");
        assert_eq!(response["ping"], 1);
        let response: Value = client.call(&json!({"ping": 2})).await.expect("call");
        assert_eq!(response["ping"], 2);
        client.stop().await;
    }

    #[tokio::test]
    async fn stopped_plugin_fails_fast() {
        let client = PluginClient::spawn("cat", &[]).await.expect("spawn");
        client.stop().await;
        let result: anyhow::Result<Value> = client.call(&json!({})).await;
        assert!(result.is_err());
    }
}
