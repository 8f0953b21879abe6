use once_cell::sync::Lazy;
use regex::Regex;

static BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(br\s*/?|/p|/div|/li|/h[1-6])\s*>").expect("valid break pattern")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// Plain text of a rich-text description. Block ends become line breaks,
/// runs of whitespace collapse to one space, empty lines are dropped.
pub fn strip_markup(text: &str) -> String {
    let broken = BREAK_RE.replace_all(text, "\n");
    let bare = TAG_RE.replace_all(&broken, "");
    let decoded = bare
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    split_lines(&decoded)
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}

/// Relative advance of a character at font size 1.
fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' | '.' | ',' | ':' | ';' | '|' | '!' | '\'' | 'i' | 'j' | 'l' | 'I' => 0.28,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '{' | '}' | '1' => 0.36,
        'm' | 'w' | 'M' | 'W' | '@' | '%' | '&' | '#' => 0.9,
        'A'..='Z' => 0.66,
        _ if ch.is_ascii() => 0.56,
        // CJK and other wide glyphs
        _ => 1.0,
    }
}

pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

pub fn wrap_line(line: &str, max_width: f32, font_size: f32) -> Vec<String> {
    if text_width(line, font_size) <= max_width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font_size) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wraps `text` to `max_width` and reports the block it occupies.
pub fn measure_label(text: &str, max_width: f32, font_size: f32, line_height: f32) -> TextBlock {
    let mut lines: Vec<String> = split_lines(text)
        .iter()
        .flat_map(|line| wrap_line(line, max_width, font_size))
        .collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    let width = lines
        .iter()
        .map(|line| text_width(line, font_size))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_turns_blocks_into_lines() {
        assert_eq!(
            strip_markup("<p>First&nbsp;part</p><p>Second <i>part</i></p>"),
            "First part\nSecond part"
        );
        assert_eq!(strip_markup("a<br/>b"), "a\nb");
        assert_eq!(strip_markup("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(strip_markup("   "), "");
    }

    #[test]
    fn split_lines_collapses_whitespace() {
        assert_eq!(split_lines("  hello   there \n world "), vec!["hello there", "world"]);
    }

    #[test]
    fn text_width_scales_with_font_size() {
        let w10 = text_width("Hello", 10.0);
        let w20 = text_width("Hello", 20.0);
        assert!((w20 - w10 * 2.0).abs() < 0.01);
    }

    #[test]
    fn wrap_line_keeps_short_text() {
        assert_eq!(wrap_line("short", 1000.0, 14.0), vec!["short"]);
    }

    #[test]
    fn wrap_line_splits_long_text() {
        let lines = wrap_line("the system validates the entered card number", 80.0, 14.0);
        assert!(lines.len() > 1, "expected wrapping, got {lines:?}");
        assert!(lines.iter().all(|l| !l.is_empty()));
    }

    #[test]
    fn measure_label_counts_lines() {
        let block = measure_label("one\ntwo", 500.0, 10.0, 1.5);
        assert_eq!(block.lines, vec!["one", "two"]);
        assert!((block.height - 30.0).abs() < 0.01);
    }
}
