//! A minimal interactive stdio `AdapterPort` for local use.
//!
//! No direct teacher equivalent: `clawft`'s adapters are transport-specific
//! (Discord/Telegram/Slack) and out of scope. Built straight from the
//! `AdapterPort` contract in spec.md §6 plus the 1900/4000/3000-byte
//! chunking convention it documents for other transports -- stdout has no
//! such limit, so this adapter prints unchunked.

use async_trait::async_trait;
use itak_core::ports::AdapterPort;
use itak_core::progress::ProgressEvent;
use itak_types::Result;

pub struct StdioAdapter;

#[async_trait]
impl AdapterPort for StdioAdapter {
    fn name(&self) -> &str {
        "cli"
    }

    async fn send(&self, _room_id: &str, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }

    async fn report_progress(&self, _room_id: &str, event: &ProgressEvent) -> Result<()> {
        match event {
            ProgressEvent::Plan { plan_text } => eprintln!("[plan] {plan_text}"),
            ProgressEvent::StepAdded { description, .. } => eprintln!("[step] {description}"),
            ProgressEvent::Progress { message, .. } => eprintln!("[progress] {message}"),
            ProgressEvent::StepComplete { result, .. } => eprintln!("[done] {result}"),
            ProgressEvent::Complete { summary, .. } => eprintln!("[complete] {summary}"),
            ProgressEvent::Error { message } => eprintln!("[error] {message}"),
        }
        Ok(())
    }
}
