//! Parser for the declarative subset of Compass `config.rb` files.
//!
//! Compass projects configure themselves with a Ruby file made of plain
//! assignments and `require` lines:
//!
//! ```text
//! require 'sass-globbing'
//! http_path = "/journal/"
//! output_style = :compressed
//! line_comments = false
//! ```
//!
//! Only that subset is understood. Assignments are collected into a
//! [`toml::Table`] so they deserialize through the same serde schema as
//! `sassbuild.toml`; `require` lines become the `plugins` array.

use thiserror::Error;
use toml::{Table, Value};
use tracing::warn;

/// Keys understood by [`super::SassConfig`].
pub const KNOWN_KEYS: &[&str] = &[
    "project_type",
    "http_path",
    "http_images_path",
    "http_generated_images_path",
    "http_fonts_path",
    "http_stylesheets_path",
    "css_dir",
    "sass_dir",
    "images_dir",
    "generated_images_dir",
    "fonts_dir",
    "additional_import_paths",
    "line_comments",
    "output_style",
    "globbing",
];

/// Syntax error in a `config.rb` file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config.rb line {line}: {message}")]
pub struct RubyParseError {
    /// 1-based line number
    pub line: usize,
    /// What went wrong
    pub message: String,
}

impl RubyParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

/// Parse a `config.rb` source into a configuration table.
///
/// Unknown keys and statements that are not assignments are skipped with a
/// warning; values that cannot be read as literals are errors.
pub fn parse_config_rb(source: &str) -> Result<Table, RubyParseError> {
    let mut table = Table::new();
    let mut plugins = Vec::new();
    let mut lines = source.lines().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let mut line = strip_comment(raw).trim().to_string();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("require") {
            if rest.starts_with(char::is_whitespace) || rest.starts_with('(') {
                let arg = rest.trim().trim_start_matches('(').trim_end_matches(')').trim();
                let (value, tail) = parse_string(arg, line_no)?;
                if !tail.trim().is_empty() {
                    return Err(RubyParseError::new(line_no, "unexpected text after require"));
                }
                plugins.push(Value::String(value));
                continue;
            }
        }

        let Some((key, value)) = split_assignment(&line) else {
            warn!(line = line_no, statement = %line, "skipping unsupported config.rb statement");
            continue;
        };
        let key = key.to_string();

        // Arrays and hashes may span lines until the closing bracket.
        let mut value = value.to_string();
        if let Some(close) = open_bracket_close(&value) {
            if !value.ends_with(close) {
                for (_, next) in lines.by_ref() {
                    value.push(' ');
                    value.push_str(strip_comment(next).trim());
                    if value.ends_with(close) {
                        break;
                    }
                }
                line = format!("{} = {}", key, value);
            }
        }

        if !KNOWN_KEYS.contains(&key.as_str()) {
            warn!(line = line_no, key = %key, "ignoring unknown config.rb key");
            continue;
        }

        let parsed = parse_value(&value, line_no)
            .map_err(|e| RubyParseError::new(line_no, format!("{} in '{}'", e.message, line)))?;

        match parsed {
            Some(value) => {
                table.insert(key, value);
            }
            None => {
                // nil leaves the default in place
                table.remove(&key);
            }
        }
    }

    if !plugins.is_empty() {
        table.insert("plugins".to_string(), Value::Array(plugins));
    }
    Ok(table)
}

/// Closing bracket for a value that opens an array or hash literal.
fn open_bracket_close(value: &str) -> Option<char> {
    match value.chars().next() {
        Some('[') => Some(']'),
        Some('{') => Some('}'),
        _ => None,
    }
}

/// Split `key = value`, rejecting comparisons and compound operators.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let eq = line.find('=')?;
    let key = line[..eq].trim();
    let value = line[eq + 1..].trim();
    if value.starts_with('=') || value.starts_with('~') {
        return None;
    }
    let is_ident = !key.is_empty()
        && key.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_ident {
        Some((key, value))
    } else {
        None
    }
}

/// Remove a trailing `#` comment that is not inside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '#' => return &line[..i],
                _ => {}
            },
        }
    }
    line
}

/// Parse a literal. `nil` yields `None`.
fn parse_value(text: &str, line: usize) -> Result<Option<Value>, RubyParseError> {
    let text = text.trim();
    match text {
        "true" => return Ok(Some(Value::Boolean(true))),
        "false" => return Ok(Some(Value::Boolean(false))),
        "nil" => return Ok(None),
        _ => {}
    }

    if let Some(inner) = text.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| RubyParseError::new(line, "unterminated array"))?;
        let mut items = Vec::new();
        let mut rest = inner.trim();
        while !rest.is_empty() {
            let (item, tail) = parse_scalar(rest, line)?;
            items.push(item);
            rest = tail.trim_start();
            if let Some(after_comma) = rest.strip_prefix(',') {
                rest = after_comma.trim_start();
            } else if !rest.is_empty() {
                return Err(RubyParseError::new(line, "expected ',' between array items"));
            }
        }
        return Ok(Some(Value::Array(items)));
    }

    let (value, tail) = parse_scalar(text, line)?;
    if !tail.trim().is_empty() {
        return Err(RubyParseError::new(line, "unsupported expression"));
    }
    Ok(Some(value))
}

/// Parse one string, symbol or integer and return the remaining text.
fn parse_scalar(text: &str, line: usize) -> Result<(Value, &str), RubyParseError> {
    if text.starts_with('"') || text.starts_with('\'') {
        let (s, tail) = parse_string(text, line)?;
        return Ok((Value::String(s), tail));
    }

    if let Some(sym) = text.strip_prefix(':') {
        let end = sym.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(sym.len());
        if end == 0 {
            return Err(RubyParseError::new(line, "empty symbol"));
        }
        return Ok((Value::String(sym[..end].to_string()), &sym[end..]));
    }

    let end = text.find(|c: char| !(c.is_ascii_digit() || c == '-' || c == '_')).unwrap_or(text.len());
    if end > 0 {
        let digits: String = text[..end].chars().filter(|c| *c != '_').collect();
        if let Ok(n) = digits.parse::<i64>() {
            return Ok((Value::Integer(n), &text[end..]));
        }
    }

    Err(RubyParseError::new(line, "unsupported expression"))
}

/// Parse a single- or double-quoted string literal.
fn parse_string(text: &str, line: usize) -> Result<(String, &str), RubyParseError> {
    let mut chars = text.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('"' | '\''))) => q,
        _ => return Err(RubyParseError::new(line, "expected a string literal")),
    };

    let mut out = String::new();
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            match (quote, c) {
                ('"', 'n') => out.push('\n'),
                ('"', 't') => out.push('\t'),
                (_, c) if c == quote || c == '\\' => out.push(c),
                (_, c) => {
                    out.push('\\');
                    out.push(c);
                }
            }
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((out, &text[i + c.len_utf8()..]));
        } else {
            out.push(c);
        }
    }

    Err(RubyParseError::new(line, "unterminated string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOURNAL_CONFIG: &str = r#"require 'sass-globbing'

# Require any additional compass plugins here.
project_type = :stand_alone

# Publishing paths
http_path = "/journal/"
http_images_path = "/journal/images"
http_generated_images_path = "/images"
http_fonts_path = "/journal/fonts"
css_dir = "public/journal/stylesheets"

# Local development paths
sass_dir = "sass"
images_dir = "source/images"
fonts_dir = "source/fonts"

line_comments = false
output_style = :compressed
"#;

    #[test]
    fn test_parse_compass_config() {
        let table = parse_config_rb(JOURNAL_CONFIG).unwrap();
        assert_eq!(table["project_type"].as_str(), Some("stand_alone"));
        assert_eq!(table["http_path"].as_str(), Some("/journal/"));
        assert_eq!(table["css_dir"].as_str(), Some("public/journal/stylesheets"));
        assert_eq!(table["line_comments"].as_bool(), Some(false));
        assert_eq!(table["output_style"].as_str(), Some("compressed"));
        let plugins = table["plugins"].as_array().unwrap();
        assert_eq!(plugins[0].as_str(), Some("sass-globbing"));
    }

    #[test]
    fn test_comment_inside_string_kept() {
        let table = parse_config_rb("http_path = \"/a#b/\" # trailing").unwrap();
        assert_eq!(table["http_path"].as_str(), Some("/a#b/"));
    }

    #[test]
    fn test_single_quoted_and_escapes() {
        let table = parse_config_rb(r#"sass_dir = 'it\'s'"#).unwrap();
        assert_eq!(table["sass_dir"].as_str(), Some("it's"));
    }

    #[test]
    fn test_multiline_array() {
        let source = "additional_import_paths = [\n  \"vendor/a\", # first\n  'vendor/b'\n]\n";
        let table = parse_config_rb(source).unwrap();
        let paths = table["additional_import_paths"].as_array().unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1].as_str(), Some("vendor/b"));
    }

    #[test]
    fn test_nil_keeps_default() {
        let table = parse_config_rb("sass_dir = \"x\"\nsass_dir = nil").unwrap();
        assert!(!table.contains_key("sass_dir"));
    }

    #[test]
    fn test_unknown_key_ignored() {
        let table = parse_config_rb("environment = :production\nsass_dir = \"s\"").unwrap();
        assert!(!table.contains_key("environment"));
        assert_eq!(table["sass_dir"].as_str(), Some("s"));
    }

    #[test]
    fn test_unknown_key_with_hash_value_ignored() {
        let table = parse_config_rb("sass_options = {:debug_info => false}\nsass_dir = 'sass'\n").unwrap();
        assert!(!table.contains_key("sass_options"));
        assert_eq!(table["sass_dir"].as_str(), Some("sass"));
    }

    #[test]
    fn test_unknown_key_with_multiline_hash_ignored() {
        let source = "sass_options = {\n  :debug_info => false,\n  :quiet => true\n}\ncss_dir = 'out'\n";
        let table = parse_config_rb(source).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table["css_dir"].as_str(), Some("out"));
    }

    #[test]
    fn test_known_key_with_expression_still_errors() {
        let err = parse_config_rb("sass_dir = File.join('a', 'b')").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unsupported expression"));
    }

    #[test]
    fn test_unsupported_statement_skipped() {
        let table = parse_config_rb("Sass::Script::Number.precision = 10\nputs 'hi'").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_expression_is_error_with_line() {
        let err = parse_config_rb("\n\noutput_style = (env == :prod) ? :compressed : :expanded")
            .unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse_config_rb("css_dir = \"public").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        assert_eq!(split_assignment("a == b"), None);
        assert_eq!(split_assignment("css_dir = 'x'"), Some(("css_dir", "'x'")));
    }
}
