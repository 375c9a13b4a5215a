use chrono::{DateTime, Utc};

use crate::{Alert, Direction, Severity};

/// Telegram rejects messages longer than this.
pub const MAX_MESSAGE_CHARS: usize = 4_096;

/// One rendered message and how many leading alerts of the batch it lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBatch {
    pub text: String,
    /// Alerts `[..included]` are in `text`; the rest were left out.
    pub included: usize,
}

impl RenderedBatch {
    pub fn is_complete(&self, batch_len: usize) -> bool {
        self.included == batch_len
    }
}

/// Renders one HTML message for a batch of alerts.
///
/// Blocks are appended in order until the next one would push the message
/// past `MAX_MESSAGE_CHARS`. Alerts that do not fit are counted in a trailing
/// line and reported through `included` so the caller can send them later.
pub fn render_batch(alerts: &[Alert], at: DateTime<Utc>) -> RenderedBatch {
    let mut text = format!(
        "<b>📊 Z-score divergence</b> <i>{}</i>",
        at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let mut len = text.chars().count();
    let mut included = 0;

    for (i, alert) in alerts.iter().enumerate() {
        let block = render_alert(alert);
        let block_len = block.chars().count();
        let remaining = alerts.len() - i;
        // room for the block plus a worst-case overflow footer
        let footer_room = if remaining > 1 { 64 } else { 0 };
        if len + 2 + block_len + footer_room > MAX_MESSAGE_CHARS {
            text.push_str(&format!("\n\n… and {remaining} more in the next message"));
            break;
        }
        text.push_str("\n\n");
        text.push_str(&block);
        len += 2 + block_len;
        included += 1;
    }

    RenderedBatch { text, included }
}

fn render_alert(alert: &Alert) -> String {
    let (icon, z) = match alert.severity {
        Severity::Extreme => ("🔴", format!("<b>{:.3}</b>", alert.z_score)),
        Severity::Normal => ("📊", format!("{:.3}", alert.z_score)),
    };
    let direction = match alert.direction {
        Direction::Up => "▲ up",
        Direction::Down => "▼ down",
    };
    format!(
        "{icon} <code>{} / {}</code>\nZ-score: {z} {direction}",
        escape_html(&alert.pair_a),
        escape_html(&alert.pair_b),
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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
