//! Transcript normalization
//!
//! Turns either the provider's structured turn list or its raw text into the
//! readable `[mm:ss] Speaker: text` form handed to the extraction service.

use crate::domain::entities::{Speaker, TranscriptTurn};

/// Longest label accepted as a speaker prefix in raw text (`Agent: ...`)
const MAX_SPEAKER_LABEL_LEN: usize = 20;

/// Render a transcript for extraction.
///
/// Structured turns win over raw text; returns `None` when neither carries
/// any content.
pub fn format_transcript(turns: &[TranscriptTurn], raw_text: Option<&str>) -> Option<String> {
    let lines: Vec<String> = turns
        .iter()
        .filter(|turn| turn.is_substantive())
        .map(|turn| {
            let stamp = turn
                .start_secs
                .map(|secs| format!("[{}] ", format_offset(secs)))
                .unwrap_or_default();
            format!("{}{}: {}", stamp, turn.speaker.label(), turn.content.trim())
        })
        .collect();

    if !lines.is_empty() {
        return Some(lines.join("\n"));
    }

    let raw = raw_text.map(str::trim).filter(|text| !text.is_empty())?;
    let parsed = parse_text_turns(raw);
    if parsed.is_empty() {
        return Some(raw.to_string());
    }
    Some(
        parsed
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker.label(), turn.content))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Split raw `Label: text` transcript lines into turns.
///
/// Lines without a label continue the previous turn. Returns an empty list
/// when no line carries a label.
pub fn parse_text_turns(text: &str) -> Vec<TranscriptTurn> {
    let mut turns: Vec<TranscriptTurn> = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match split_label(line) {
            Some((label, content)) => {
                turns.push(TranscriptTurn::new(Speaker::from_role(label), content));
            }
            None => {
                if let Some(last) = turns.last_mut() {
                    last.content.push(' ');
                    last.content.push_str(line);
                }
            }
        }
    }

    turns
}

fn split_label(line: &str) -> Option<(&str, &str)> {
    let (label, content) = line.split_once(':')?;
    let label = label.trim();
    let valid = !label.is_empty()
        && label.len() <= MAX_SPEAKER_LABEL_LEN
        && label.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '_');
    valid.then(|| (label, content.trim()))
}

fn format_offset(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
