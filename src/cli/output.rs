//! Colored output helpers for CLI
//!
//! Terminal rendering of run summaries for the footprint CLI. Output is a
//! summary only; the full record is the JSON written by the storage sink.

use crate::types::{
    CorrelationFinding, InvestigationRecord, ProbeOutcome, ProbeStatus, RiskAssessment, RiskLevel,
    RunStatus, TimelineEvent,
};
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n  {} {}\n",
                "footprint".bright_cyan().bold(),
                version.dimmed()
            );
        } else {
            println!("\n  footprint {}\n", version);
        }
    }

    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// One line per capability slot.
    pub fn slot(&self, outcome: &ProbeOutcome) {
        let id = format!("{:<19}", outcome.capability.id());
        let status = format!("{:<12}", outcome.status.as_str());
        let detail = slot_detail(outcome);

        if self.colored {
            let status = match outcome.status {
                ProbeStatus::Ok => status.green().to_string(),
                ProbeStatus::NoKey | ProbeStatus::Unavailable => status.dimmed().to_string(),
                ProbeStatus::Timeout => status.yellow().to_string(),
                ProbeStatus::Error => status.red().to_string(),
            };
            println!("    {} {} {}", id.bright_white(), status, detail.dimmed());
        } else {
            println!("    {} {} {}", id, status, detail);
        }
    }

    pub fn finding(&self, finding: &CorrelationFinding) {
        let kind = serde_json::to_value(finding.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let confidence = format!("{:.2}", finding.confidence);

        if self.colored {
            println!(
                "    {} {} {}",
                format!("[{}]", kind).cyan(),
                confidence.bright_white().bold(),
                finding.description
            );
        } else {
            println!("    [{}] {} {}", kind, confidence, finding.description);
        }
    }

    pub fn timeline_event(&self, event: &TimelineEvent) {
        if self.colored {
            println!(
                "    {} {} {}",
                event.date.bright_white(),
                event.event,
                format!("({})", event.source.capability).dimmed()
            );
        } else {
            println!("    {} {} ({})", event.date, event.event, event.source.capability);
        }
    }

    pub fn risk(&self, risk: &RiskAssessment) {
        let level = format!("{:?}", risk.level).to_uppercase();
        let headline = format!("{}/100 ({})", risk.score, level);

        if self.colored {
            let headline = match risk.level {
                RiskLevel::Low => headline.green().bold().to_string(),
                RiskLevel::Medium => headline.yellow().bold().to_string(),
                RiskLevel::High | RiskLevel::Critical => headline.red().bold().to_string(),
            };
            println!("    {}: {}", "score".dimmed(), headline);
        } else {
            println!("    score: {}", headline);
        }
        for factor in &risk.factors {
            self.list_item(factor);
        }
    }

    /// Print the whole run summary.
    pub fn record(&self, record: &InvestigationRecord) {
        self.header("Target");
        if let Some(email) = record.target_info.email() {
            self.kv("email", email);
        }
        if let Some(phone) = record.target_info.phone() {
            self.kv("phone", phone);
        }
        self.kv("timestamp", &record.timestamp.to_rfc3339());

        self.header("Capabilities");
        for outcome in record.slots() {
            self.slot(outcome);
        }

        self.header("Correlations");
        if record.correlations.is_empty() {
            self.list_item("none");
        }
        for finding in &record.correlations {
            self.finding(finding);
        }

        if !record.timeline.is_empty() {
            self.header("Timeline");
            for event in &record.timeline {
                self.timeline_event(event);
            }
        }

        if let Some(risk) = &record.risk {
            self.header("Risk");
            self.risk(risk);
        }

        println!();
        match record.run_status {
            RunStatus::Complete => self.success("run complete"),
            RunStatus::Partial => self.warning("run partial: some probes timed out or failed"),
        }
    }

    pub fn newline(&self) {
        println!();
    }
}

fn slot_detail(outcome: &ProbeOutcome) -> String {
    let mut parts = Vec::new();
    if let Some(ms) = outcome.duration_ms().filter(|_| outcome.status != ProbeStatus::Unavailable)
    {
        parts.push(format!("{}ms", ms));
    }
    if let Some(detail) = &outcome.error_detail {
        parts.push(detail.clone());
    }
    parts.join("  ")
}
