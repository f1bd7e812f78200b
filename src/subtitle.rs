use std::fs::File;
use std::io::Write;
use std::path::Path;

use regex::Regex;

use crate::error::Result;
use crate::tts::Segment;

/// Estimated pause the voice makes at punctuation, in seconds. Tune these
/// to the chosen voice if captions drift.
const COMMA_PAUSE: f64 = 0.20;
const SENTENCE_END_PAUSE: f64 = 0.40;

/// Sub-linear exponent for distributing speaking time over words by their
/// character count.
const WEIGHT_ALPHA: f64 = 0.5;

const WRAP_COLUMNS: usize = 80;

/// One caption with absolute timestamps into the narration.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Builds word-level cues from the measured duration of each narration
/// chunk: punctuation eats a fixed pause, the remaining time is split
/// across words weighted by length. No audio analysis involved, so timings
/// are estimates, but they cannot drift across chunk boundaries because
/// every chunk is anchored at its measured start.
pub fn build_cues(segments: &[Segment]) -> Vec<Cue> {
    let word_re = Regex::new(r"(\w[\w'-]*)|([,.!?])").unwrap();
    let mut cues = Vec::new();
    let mut clock = 0.0_f64;

    for segment in segments {
        let start = clock;
        let end = clock + segment.duration_seconds;
        let elements: Vec<&str> = word_re
            .find_iter(&segment.text)
            .map(|m| m.as_str())
            .collect();

        if elements.is_empty() {
            cues.push(Cue {
                start,
                end,
                text: segment.text.clone(),
            });
            clock = end;
            continue;
        }

        let mut pause_total = 0.0;
        let mut words = Vec::new();
        for &element in &elements {
            match element {
                "," => pause_total += COMMA_PAUSE,
                "." | "!" | "?" => pause_total += SENTENCE_END_PAUSE,
                _ => words.push(element),
            }
        }

        let speaking_time = (segment.duration_seconds - pause_total).max(0.0);
        let total_weight: f64 = words.iter().map(|w| weight(w)).sum();

        let mut cursor = start;
        for element in elements {
            match element {
                "," => cursor += COMMA_PAUSE,
                "." | "!" | "?" => cursor += SENTENCE_END_PAUSE,
                word => {
                    let duration = if total_weight > 0.0 {
                        speaking_time * weight(word) / total_weight
                    } else {
                        0.0
                    };
                    cues.push(Cue {
                        start: cursor,
                        end: cursor + duration,
                        text: word.to_string(),
                    });
                    cursor += duration;
                }
            }
        }

        clock = end;
    }

    cues
}

fn weight(word: &str) -> f64 {
    (word.chars().count() as f64).powf(WEIGHT_ALPHA)
}

pub fn write_srt(path: &Path, cues: &[Cue]) -> Result<()> {
    let mut file = File::create(path)?;
    for (i, cue) in cues.iter().enumerate() {
        writeln!(file, "{}", i + 1)?;
        writeln!(
            file,
            "{} --> {}",
            format_timestamp(cue.start),
            format_timestamp(cue.end)
        )?;
        for line in wrap(&cue.text, WRAP_COLUMNS) {
            writeln!(file, "{line}")?;
        }
        writeln!(file)?;
    }
    Ok(())
}

fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
