//! Quoted-token codec for the group text format.
//!
//! Special characters are escaped by prefixing them with a single quote
//! character (a backslash by default). The quote character escapes itself.
//!
//! # Examples
//! ```
//! use impress_groups::codec::{quote, unquote};
//! let quoted = quote("A;B", ";", '\\');
//! assert_eq!(quoted, "A\\;B");
//! assert_eq!(unquote(&quoted, '\\'), "A;B");
//! ```

use crate::config::SerializationConfig;

/// Escape every char of `specials` and the quote char itself.
pub fn quote(value: &str, specials: &str, quote_char: char) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        if c == quote_char || specials.contains(c) {
            result.push(quote_char);
        }
        result.push(c);
    }
    result
}

/// Remove one level of escaping.
///
/// A dangling quote char at the end of the input is kept literally.
pub fn unquote(value: &str, quote_char: char) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == quote_char {
            match chars.next() {
                Some(escaped) => result.push(escaped),
                None => result.push(c),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Quote a value for a group field with the default serialization settings.
#[cfg_attr(feature = "native", uniffi::export)]
pub fn quote_group_value(value: &str) -> String {
    let config = SerializationConfig::default();
    quote(value, &config.specials(), config.quote_char)
}

/// Inverse of [`quote_group_value`].
#[cfg_attr(feature = "native", uniffi::export)]
pub fn unquote_group_value(value: &str) -> String {
    unquote(value, SerializationConfig::default().quote_char)
}

/// Byte offset of the first unescaped occurrence of any char in `targets`.
pub fn find_unquoted(input: &str, targets: &[char], quote_char: char) -> Option<usize> {
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == quote_char {
            chars.next();
        } else if targets.contains(&c) {
            return Some(i);
        }
    }
    None
}

/// Splits text at unescaped delimiters, yielding the still-quoted tokens.
///
/// A delimiter at the very end does not produce a trailing empty token, so
/// `"a;b;"` yields `a` and `b` while `"a;;"` yields `a` and an empty token.
#[derive(Debug, Clone)]
pub struct QuotedTokenizer<'a> {
    input: &'a str,
    delimiter: char,
    quote_char: char,
    pos: usize,
}

impl<'a> QuotedTokenizer<'a> {
    pub fn new(input: &'a str, delimiter: char, quote_char: char) -> Self {
        Self {
            input,
            delimiter,
            quote_char,
            pos: 0,
        }
    }

    pub fn has_more_tokens(&self) -> bool {
        self.pos < self.input.len()
    }

    /// Next token with escaping removed.
    pub fn next_unquoted(&mut self) -> Option<String> {
        let quote_char = self.quote_char;
        self.next().map(|token| unquote(token, quote_char))
    }
}

impl<'a> Iterator for QuotedTokenizer<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if !self.has_more_tokens() {
            return None;
        }
        let rest = &self.input[self.pos..];
        match find_unquoted(rest, &[self.delimiter], self.quote_char) {
            Some(offset) => {
                let token = &rest[..offset];
                self.pos += offset + self.delimiter.len_utf8();
                Some(token)
            }
            None => {
                self.pos = self.input.len();
                Some(rest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes_specials_and_quote_char() {
        assert_eq!(quote("a;b\\c", ";", '\\'), "a\\;b\\\\c");
        assert_eq!(quote("plain", ";", '\\'), "plain");
        assert_eq!(quote("", ";", '\\'), "");
    }

    #[test]
    fn unquote_reverses_quote() {
        for s in ["A;B", "x\\;y", "(a,b)", "\\\\", "emoji ✓;"] {
            let quoted = quote(s, ";,()", '\\');
            assert_eq!(unquote(&quoted, '\\'), s);
        }
    }

    #[test]
    fn dangling_quote_is_literal() {
        assert_eq!(unquote("abc\\", '\\'), "abc\\");
    }

    #[test]
    fn tokenizer_respects_escapes() {
        let tokens: Vec<&str> = QuotedTokenizer::new("A\\;B;0;key;", ';', '\\').collect();
        assert_eq!(tokens, vec!["A\\;B", "0", "key"]);
    }

    #[test]
    fn tokenizer_keeps_inner_empty_tokens() {
        let tokens: Vec<&str> = QuotedTokenizer::new("a;;b", ';', '\\').collect();
        assert_eq!(tokens, vec!["a", "", "b"]);

        let mut tokenizer = QuotedTokenizer::new("n\\;1;", ';', '\\');
        assert_eq!(tokenizer.next_unquoted().as_deref(), Some("n;1"));
        assert!(!tokenizer.has_more_tokens());
    }

    #[test]
    fn find_unquoted_skips_escaped() {
        assert_eq!(find_unquoted("a\\(b(c", &['('], '\\'), Some(4));
        assert_eq!(find_unquoted("a\\(b", &['('], '\\'), None);
    }

    #[test]
    fn default_group_value_quoting() {
        let quoted = quote_group_value("A;B,(C)");
        assert_eq!(quoted, "A\\;B\\,\\(C\\)");
        assert_eq!(unquote_group_value(&quoted), "A;B,(C)");
    }
}
