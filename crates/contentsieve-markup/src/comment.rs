//! HTML comments carrying filter messages.

/// Escape text for use in HTML content or a quoted attribute.
pub fn html_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render `message` as an HTML comment.
///
/// The body is HTML-escaped and never contains `--`, so the comment cannot
/// be closed early.
///
/// ```
/// use contentsieve_markup::comment::html_comment;
///
/// assert_eq!(html_comment("bad --> <script>"), "<!-- bad -&#45;&gt; &lt;script&gt; -->");
/// ```
pub fn html_comment(message: &str) -> String {
    let encoded = html_encode(message);
    let mut body = String::with_capacity(encoded.len());
    for c in encoded.chars() {
        if c == '-' && body.ends_with('-') {
            body.push_str("&#45;");
        } else {
            body.push(c);
        }
    }
    format!("<!-- {} -->", body)
}
