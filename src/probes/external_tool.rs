//! Username enumeration through a locally installed CLI (sherlock by default).

use crate::probes::{Probe, ProbeContext, ProbeError, username_candidates};
use crate::types::payload::{ExternalToolReport, ToolHit};
use crate::types::{Capability, InvestigationInput, ProbePayload};
use crate::utils::toml_config::ProbeConfig;
use async_trait::async_trait;
use std::io;
use std::process::{Output, Stdio};
use tokio::process::Command;

pub const DEFAULT_BINARY: &str = "sherlock";

/// Default argument template; `{}` is replaced by the username.
pub fn default_args() -> Vec<String> {
    ["{}", "--print-found", "--no-color"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Parse `[+] Site: url` lines from the tool's output.
pub fn parse_found(stdout: &str) -> Vec<ToolHit> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("[+]"))
        .filter_map(|rest| {
            let (site, url) = rest.split_once(": ")?;
            let (site, url) = (site.trim(), url.trim());
            (!site.is_empty() && url.starts_with("http")).then(|| ToolHit {
                site: site.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Run a local CLI to completion, racing it against cancellation.
///
/// A binary that is not on `PATH` is reported as `Unavailable`. The child is
/// killed when the run is cancelled or the probe future is dropped.
pub(crate) async fn run_tool(
    ctx: &ProbeContext,
    binary: &str,
    args: &[String],
) -> Result<Output, ProbeError> {
    let mut command = Command::new(binary);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);
    let child = command.output();

    tokio::select! {
        _ = ctx.cancellation().cancelled() => Err(ProbeError::Cancelled),
        output = child => match output {
            Ok(output) => Ok(output),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ProbeError::Unavailable(
                format!("'{}' is not installed or not on PATH", binary),
            )),
            Err(e) => Err(ProbeError::Io(e)),
        },
    }
}

/// Failure for a tool that exited unsuccessfully without usable output.
pub(crate) fn exit_error(binary: &str, output: &Output) -> ProbeError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let excerpt: String = stderr.trim().chars().take(300).collect();
    ProbeError::Io(io::Error::other(format!(
        "'{}' exited with {}: {}",
        binary, output.status, excerpt
    )))
}

pub struct ExternalToolProbe {
    binary: String,
    args: Vec<String>,
}

impl ExternalToolProbe {
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            config.extra_str("binary").unwrap_or(DEFAULT_BINARY),
            config.extra_string_list("args").unwrap_or_else(default_args),
        )
    }
}

#[async_trait]
impl Probe for ExternalToolProbe {
    fn capability(&self) -> Capability {
        Capability::ExternalTool
    }

    fn description(&self) -> &str {
        "Username enumeration across many sites via a local sherlock-compatible CLI"
    }

    fn applies_to(&self, input: &InvestigationInput) -> bool {
        input.email_local_part().is_some()
    }

    async fn execute(&self, ctx: &ProbeContext) -> Result<ProbePayload, ProbeError> {
        let username = ctx
            .input()
            .email_local_part()
            .and_then(|local| username_candidates(local).into_iter().next())
            .ok_or_else(|| ProbeError::Unavailable("no username to enumerate".to_string()))?;

        let args: Vec<String> = self.args.iter().map(|a| a.replace("{}", &username)).collect();
        tracing::debug!(binary = %self.binary, username = %username, "running external tool");

        let output = run_tool(ctx, &self.binary, &args).await?;

        let found = parse_found(&String::from_utf8_lossy(&output.stdout));
        if !output.status.success() && found.is_empty() {
            return Err(exit_error(&self.binary, &output));
        }

        Ok(ProbePayload::ExternalTool(ExternalToolReport {
            tool: self.binary.clone(),
            username,
            found,
            exit_code: output.status.code(),
        }))
    }
}
