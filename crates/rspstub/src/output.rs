use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rspstub_session::{Feature, SessionEnd, SessionStats};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct FeaturesOutput {
    pub packet_size: usize,
    pub supported_reply: String,
    pub features: Vec<Feature>,
}

#[derive(Serialize)]
pub struct ChecksumOutput {
    pub body: String,
    pub checksum: String,
    pub packet: String,
}

#[derive(Serialize)]
pub struct SessionSummary {
    pub listen_addr: String,
    pub peer_addr: Option<String>,
    pub end: SessionEnd,
    pub stats: SessionStats,
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_features(out: &FeaturesOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FEATURE", "ENABLED"]);
            for feature in &out.features {
                table.add_row(vec![feature.name.to_string(), feature.enabled.to_string()]);
            }
            println!("{table}");
            println!("qSupported reply: {}", out.supported_reply);
        }
        OutputFormat::Pretty => {
            println!(
                "packet_size={} (0x{:x})",
                out.packet_size, out.packet_size
            );
            for feature in &out.features {
                let state = if feature.enabled { "+" } else { "-" };
                println!("  {}{}", feature.name, state);
            }
            println!("reply={}", out.supported_reply);
        }
    }
}

pub fn print_checksum(out: &ChecksumOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["BODY", "CHECKSUM", "PACKET"]);
            table.add_row(vec![
                out.body.clone(),
                out.checksum.clone(),
                out.packet.clone(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.packet),
    }
}

pub fn print_session(out: &SessionSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["PEER", "END", "PACKETS", "REPLIES", "NAKS SENT"]);
            table.add_row(vec![
                out.peer_addr.clone().unwrap_or_else(|| "-".to_string()),
                end_name(out.end).to_string(),
                out.stats.packets.to_string(),
                out.stats.replies.to_string(),
                out.stats.checksum_failures.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "session ended ({}) peer={} packets={} replies={} checksum_failures={} framing_errors={}",
                end_name(out.end),
                out.peer_addr.as_deref().unwrap_or("-"),
                out.stats.packets,
                out.stats.replies,
                out.stats.checksum_failures,
                out.stats.framing_errors,
            );
        }
    }
}

fn end_name(end: SessionEnd) -> &'static str {
    match end {
        SessionEnd::PeerClosed => "peer closed",
        SessionEnd::Detached => "detached",
        SessionEnd::Killed => "killed",
    }
}
