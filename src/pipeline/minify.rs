// src/pipeline/minify.rs

//! Builtin text minifier for `minify` steps without a command.

/// Strip `/* */` comments, trim every line and drop blank lines.
///
/// Content that is not UTF-8 (images, fonts) passes through unchanged.
pub fn minify_bytes(input: &[u8]) -> Vec<u8> {
    match std::str::from_utf8(input) {
        Ok(text) => minify_text(text).into_bytes(),
        Err(_) => input.to_vec(),
    }
}

pub fn minify_text(text: &str) -> String {
    strip_block_comments(text)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove block comments, leaving quoted strings intact.
///
/// A string ends at its closing quote or at the end of the line; `\` escapes
/// the next character. An unterminated comment runs to the end of the text.
fn strip_block_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                out.push(c);
                while let Some(s) = chars.next() {
                    out.push(s);
                    if s == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if s == c || s == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for s in chars.by_ref() {
                    if prev == '*' && s == '/' {
                        break;
                    }
                    prev = s;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_blank_lines() {
        let css = "/* header\n spans lines */\nbody {\n    color: red;\n}\n\n\n/* x */a{}\n";
        assert_eq!(minify_text(css), "body {\ncolor: red;\n}\na{}");
    }

    #[test]
    fn comment_markers_inside_strings_are_kept() {
        let css = "a{content:\"/*\"}\nb{color:red}\n/* c */\n";
        assert_eq!(minify_text(css), "a{content:\"/*\"}\nb{color:red}");

        let js = "var s = 'it\\'s /* not */ a comment'; /* gone */ f();";
        assert_eq!(minify_text(js), "var s = 'it\\'s /* not */ a comment';  f();");
    }

    #[test]
    fn comment_closer_needs_its_own_star() {
        assert_eq!(minify_text("a/*/ still comment */b"), "ab");
        assert_eq!(minify_text("keep /* never closed"), "keep");
    }

    #[test]
    fn binary_content_is_untouched() {
        let png = vec![0x89, b'P', b'N', b'G', 0xff, 0x00, b'\n', b' '];
        assert_eq!(minify_bytes(&png), png);
    }
}
