//! Telegram HTML helpers.

/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wrap plain text in a `<pre>` block (escaped).
pub fn pre(text: &str) -> String {
    format!("<pre>{}</pre>", escape_html(text))
}

/// Split a plain-text report into `<pre>` chunks that each fit within `limit` bytes
/// once escaped and wrapped.
///
/// Splits on line boundaries; a single line longer than the budget is cut at a char
/// boundary.
pub fn split_preformatted(text: &str, limit: usize) -> Vec<String> {
    const WRAP: usize = "<pre></pre>".len();
    let budget = limit.saturating_sub(WRAP).max(16);

    let mut out = Vec::new();
    let mut chunk = String::new();

    for line in text.lines() {
        let mut escaped = escape_html(line);
        escaped.push('\n');

        while escaped.len() > budget {
            if !chunk.is_empty() {
                out.push(std::mem::take(&mut chunk));
            }
            let (head, tail) = split_utf8_prefix(&escaped, budget);
            out.push(head.to_string());
            escaped = tail.to_string();
        }

        if chunk.len() + escaped.len() > budget {
            out.push(std::mem::take(&mut chunk));
        }
        chunk.push_str(&escaped);
    }

    if !chunk.is_empty() || out.is_empty() {
        out.push(chunk);
    }

    out.into_iter()
        .map(|c| format!("<pre>{}</pre>", c.trim_end_matches('\n')))
        .collect()
}

fn split_utf8_prefix(s: &str, max_bytes: usize) -> (&str, &str) {
    let mut end = max_bytes.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    // Avoid cutting through an entity like `&amp;`.
    if let Some(amp) = s[..end].rfind('&') {
        if !s[amp..end].contains(';') && amp > 0 {
            end = amp;
        }
    }
    s.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_special_chars() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn short_report_stays_in_one_block() {
        let chunks = split_preformatted("CPU 1%\nRAM 2%", 4000);
        assert_eq!(chunks, vec!["<pre>CPU 1%\nRAM 2%</pre>".to_string()]);
    }

    #[test]
    fn long_report_is_split_on_lines_under_limit() {
        let text = (0..200)
            .map(|i| format!("line {i:03} <sda>"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = split_preformatted(&text, 300);

        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.len() <= 300, "chunk too long: {}", c.len());
            assert!(c.starts_with("<pre>") && c.ends_with("</pre>"));
        }
        let joined: String = chunks
            .iter()
            .map(|c| c.trim_start_matches("<pre>").trim_end_matches("</pre>"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(joined.contains("line 000 &lt;sda&gt;"));
        assert!(joined.contains("line 199 &lt;sda&gt;"));
    }

    #[test]
    fn overlong_single_line_is_cut() {
        let chunks = split_preformatted(&"x".repeat(1000), 100);
        assert!(chunks.len() >= 10);
        assert!(chunks.iter().all(|c| c.len() <= 100));
    }
}
