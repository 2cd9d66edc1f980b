//! Text renderings of the device registry.
//!
//! Every format shows the same columns, taken from the stock tool:
//!
//! | Column      | Source                         |
//! |-------------|--------------------------------|
//! | Vendor      | brand tag (`xm`)               |
//! | MAC Address | registry key                   |
//! | Name        | `HostName`                     |
//! | IP Address  | `HostIP`, unpacked to dotted   |
//! | Port        | `TCPPort`                      |
//! | SN          | `SN` (csv and html only)       |
//!
//! Fields a camera never reported render as empty cells.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use camhunt_core::DeviceRecord;

/// An export format accepted by the command bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Table,
    Csv,
    Html,
    Json,
}

impl FromStr for ExportFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(ExportFormat::Table),
            "csv" => Ok(ExportFormat::Csv),
            "html" => Ok(ExportFormat::Html),
            "json" => Ok(ExportFormat::Json),
            _ => Err(()),
        }
    }
}

/// One display row.
struct Row {
    vendor: String,
    mac: String,
    name: String,
    ip: String,
    port: String,
    serial: String,
}

impl Row {
    fn from_record(record: &DeviceRecord) -> Self {
        Self {
            vendor: record.brand().to_string(),
            mac: record.mac().to_string(),
            name: record.host_name().unwrap_or_default().to_string(),
            ip: record.host_ip().map(|ip| ip.to_string()).unwrap_or_default(),
            port: record.tcp_port().map(|p| p.to_string()).unwrap_or_default(),
            serial: record.serial_number().unwrap_or_default().to_string(),
        }
    }
}

/// Renders `records` in `format`.
///
/// # Errors
///
/// Only [`ExportFormat::Json`] can fail, if a passthrough value cannot be
/// serialized.
pub fn render(format: ExportFormat, records: &[DeviceRecord]) -> Result<String, serde_json::Error> {
    Ok(match format {
        ExportFormat::Table => render_table(records),
        ExportFormat::Csv => render_csv(records),
        ExportFormat::Html => render_html(records),
        ExportFormat::Json => render_json(records)?,
    })
}

pub fn render_table(records: &[DeviceRecord]) -> String {
    let mut out = String::from("Vendor\tMAC Address\t\tName\tIP Address\tPort\n");
    for row in records.iter().map(Row::from_record) {
        let _ = writeln!(out, "{}\t{}\t{}\t{}\t{}", row.vendor, row.mac, row.name, row.ip, row.port);
    }
    out
}

pub fn render_csv(records: &[DeviceRecord]) -> String {
    let mut out = String::from("Vendor;MAC Address;Name;IP Address;Port;SN\n");
    for row in records.iter().map(Row::from_record) {
        let _ = writeln!(
            out,
            "{};{};{};{};{};{}",
            row.vendor, row.mac, row.name, row.ip, row.port, row.serial
        );
    }
    out
}

pub fn render_html(records: &[DeviceRecord]) -> String {
    let mut out = String::from(
        "<table border=1><th>Vendor</th><th>MAC Address</th><th>Name</th><th>IP Address</th><th>Port</th><th>SN</th>\r\n",
    );
    for row in records.iter().map(Row::from_record) {
        out.push_str("<tr>");
        for cell in [&row.vendor, &row.mac, &row.name, &row.ip, &row.port, &row.serial] {
            out.push_str("<td>");
            out.push_str(&escape_html(cell));
            out.push_str("</td>");
        }
        out.push_str("</tr>\r\n");
    }
    out.push_str("</table>\r\n");
    out
}

/// All records as one JSON object keyed by MAC.
pub fn render_json(records: &[DeviceRecord]) -> Result<String, serde_json::Error> {
    let by_mac: BTreeMap<&str, &DeviceRecord> = records.iter().map(|r| (r.mac(), r)).collect();
    serde_json::to_string(&by_mac)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
