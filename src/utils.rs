use regex::Regex;
use tracing::warn;

/// Rough speaking rate of the synthesized voice, used only to trim overlong
/// stories before synthesis. Real durations always come from the audio.
const WORDS_PER_MINUTE: f64 = 150.0;

/// Strips Reddit markdown the narrator would otherwise read aloud:
/// emphasis runs, headers, links. Newlines collapse to spaces.
pub fn clean_markdown(text: &str) -> String {
    let emphasis = Regex::new(r"\*+").unwrap();
    let headers = Regex::new(r"#+\s*").unwrap();
    let links = Regex::new(r"\[.*?\]\(.*?\)").unwrap();
    let newlines = Regex::new(r"\n+").unwrap();

    let text = emphasis.replace_all(text, "");
    let text = headers.replace_all(&text, "");
    let text = links.replace_all(&text, "");
    let text = newlines.replace_all(&text, " ");
    text.trim().to_string()
}

/// Splits text into sentences, keeping the terminating punctuation. Text
/// without sentence breaks comes back as a single element.
pub fn split_sentences(text: &str) -> Vec<String> {
    let re = Regex::new(r"(?s)([^.!?]+[.!?]+)|([^.!?]+$)").unwrap();
    let mut sentences = Vec::new();
    for cap in re.captures_iter(text) {
        let s = cap.get(0).unwrap().as_str().trim();
        if !s.is_empty() {
            sentences.push(s.to_string());
        }
    }
    sentences
}

/// Greedily packs whole sentences into chunks of at most `max_chars`. A
/// single sentence longer than the limit becomes its own oversized chunk
/// rather than being split mid-sentence.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        warn!("No sentence breaks found; using whole text as one chunk");
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for sentence in sentences {
        if current.is_empty() {
            current.push_str(&sentence);
        } else if current.len() + 1 + sentence.len() <= max_chars {
            current.push(' ');
            current.push_str(&sentence);
        } else {
            chunks.push(current);
            current = sentence;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub fn estimate_duration_seconds(text: &str) -> f64 {
    let words = text.split_whitespace().count() as f64;
    words / WORDS_PER_MINUTE * 60.0
}

/// Keeps as many complete sentences as fit within `max_seconds` at the
/// estimated speaking rate. Always keeps at least one sentence so the
/// narration is never empty.
pub fn truncate_to_duration(text: &str, max_seconds: f64) -> String {
    let max_words = (max_seconds / 60.0 * WORDS_PER_MINUTE) as usize;
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return text.to_string();
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut count = 0;
    for sentence in &sentences {
        let words = sentence.split_whitespace().count();
        if count + words > max_words && !kept.is_empty() {
            break;
        }
        kept.push(sentence);
        count += words;
    }
    if kept.is_empty() {
        return sentences[0].clone();
    }
    kept.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_is_stripped() {
        let raw = "**AITA** for leaving?\n\nSee [the update](https://example.com) here. ## Edit\nThanks all.";
        let clean = clean_markdown(raw);
        assert_eq!(
            clean,
            "AITA for leaving? See  here. Edit Thanks all."
        );
        assert!(!clean.contains('*'));
        assert!(!clean.contains('\n'));
        assert!(!clean.contains("example.com"));
    }

    #[test]
    fn sentences_keep_punctuation() {
        let s = split_sentences("First one. Second one! Third?");
        assert_eq!(s, vec!["First one.", "Second one!", "Third?"]);
    }

    #[test]
    fn trailing_fragment_is_its_own_sentence() {
        let s = split_sentences("A full stop. and then a trailer");
        assert_eq!(s, vec!["A full stop.", "and then a trailer"]);
    }

    #[test]
    fn chunks_respect_limit_without_splitting_sentences() {
        let text = "One two three. Four five six. Seven eight nine.";
        let chunks = chunk_text(text, 30);
        assert_eq!(chunks, vec!["One two three. Four five six.", "Seven eight nine."]);
    }

    #[test]
    fn oversized_sentence_becomes_single_chunk() {
        let text = "This sentence is much longer than the tiny limit.";
        let chunks = chunk_text(text, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn unbreakable_text_falls_back_to_one_chunk() {
        let chunks = chunk_text("", 100);
        assert_eq!(chunks, vec![""]);
    }

    #[test]
    fn estimate_matches_word_count() {
        // 150 words at 150 wpm is one minute.
        let text = "word ".repeat(150);
        let secs = estimate_duration_seconds(&text);
        assert!((secs - 60.0).abs() < 1e-9);
    }

    #[test]
    fn truncation_keeps_whole_sentences() {
        let text = "one two three four five. six seven eight nine ten. eleven twelve.";
        // 20 seconds at 150 wpm = 50 words, plenty for everything.
        assert_eq!(truncate_to_duration(text, 20.0), text);
        // 4 seconds = 10 words: the first two sentences fit, the third does not.
        assert_eq!(
            truncate_to_duration(text, 4.0),
            "one two three four five. six seven eight nine ten."
        );
    }

    #[test]
    fn truncation_never_returns_empty() {
        let text = "one two three four five six seven eight nine ten.";
        let out = truncate_to_duration(text, 0.1);
        assert_eq!(out, text);
    }
}
