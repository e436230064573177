use crate::models::{ ResultKind, SearchResult };
use crate::session::{ DropState, SearchMode, SearchSession, SearchStatus };

pub const TITLE: &str = "Multimodal Search Engine";
pub const IMAGE_LABEL: &str = "[Image]";

const CARD_RULE: &str = "----------------------------------------";

/// Extra digits printed when checking for an exact halfway value. Any finite
/// `f64` that is not exactly on a tie differs from it well within this many places.
const TIE_CHECK_DIGITS: usize = 60;

/// Fixed-point formatting with `digits` decimals where exact halfway values
/// round away from zero, as a browser's `Number.prototype.toFixed` does.
/// `format!("{:.4}")` alone rounds those ties to even.
pub fn to_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();

    let expanded = format!("{:.*}", digits + TIE_CHECK_DIGITS, magnitude);
    let (head, tail) = expanded.split_at(expanded.len() - TIE_CHECK_DIGITS);
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');

    let rounded = if is_tie {
        increment_last_digit(head.trim_end_matches('.'))
    } else {
        format!("{:.*}", digits, magnitude)
    };
    format!("{}{}", sign, rounded)
}

/// Add one unit in the last place of a plain decimal string, carrying as needed.
fn increment_last_digit(number: &str) -> String {
    let mut bytes = number.as_bytes().to_vec();
    for byte in bytes.iter_mut().rev() {
        match *byte {
            b'.' => {}
            b'9' => {
                *byte = b'0';
            }
            digit => {
                *byte = digit + 1;
                return String::from_utf8_lossy(&bytes).into_owned();
            }
        }
    }
    format!("1{}", String::from_utf8_lossy(&bytes))
}

/// The text lines of one result card.
pub fn result_card(result: &SearchResult) -> Vec<String> {
    let mut lines = Vec::with_capacity(3);
    lines.push(match result.kind {
        ResultKind::Image => IMAGE_LABEL.to_string(),
        _ => result.content.clone().unwrap_or_default(),
    });
    lines.push(format!("Score: {}", to_fixed(result.score, 4)));
    if let Some(metadata) = result.metadata.as_ref().filter(|m| !m.is_null()) {
        lines.push(format!("Metadata: {}", metadata));
    }
    lines
}

/// The "Results" section, or `None` when there is nothing to show.
pub fn render_results(results: &[SearchResult]) -> Option<String> {
    if results.is_empty() {
        return None;
    }
    let mut out = String::from("Results\n");
    for result in results {
        out.push_str(CARD_RULE);
        out.push('\n');
        for line in result_card(result) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    Some(out)
}

pub fn drop_zone_prompt(state: DropState) -> &'static str {
    match state {
        DropState::Accept => "Drop the image here",
        DropState::Reject => "Only a single .png, .jpg or .jpeg image can be dropped",
        DropState::Idle => "Drag and drop an image here, or click to select",
    }
}

fn tab_bar(active: SearchMode) -> String {
    [SearchMode::Text, SearchMode::Image]
        .iter()
        .map(|&mode| {
            if mode == active { format!("[{}]", mode.label()) } else { format!(" {} ", mode.label()) }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Render the whole screen as plain text.
pub fn render_view(session: &SearchSession) -> String {
    let mut out = String::new();
    out.push_str(TITLE);
    out.push('\n');
    out.push_str(&tab_bar(session.mode()));
    out.push_str("\n\n");

    match session.mode() {
        SearchMode::Text => {
            out.push_str(&format!("Enter your search query: {}\n", session.query()));
            let button = if session.submit_enabled() { "[ Search ]" } else { "[ Search ] (disabled)" };
            out.push_str(button);
            out.push('\n');
        }
        SearchMode::Image => {
            out.push_str(drop_zone_prompt(session.drop_state()));
            out.push('\n');
        }
    }

    match session.status() {
        SearchStatus::Loading => out.push_str("\nSearching...\n"),
        SearchStatus::Failed(message) => out.push_str(&format!("\nSearch failed: {}\n", message)),
        SearchStatus::Idle => {}
    }

    if let Some(results) = render_results(session.results()) {
        out.push('\n');
        out.push_str(&results);
    }
    out
}
