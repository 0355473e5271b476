//! Backup file name templates
//!
//! A template such as `Vault-Backup-%Y_%m_%d-%H_%M_%S` is used two ways:
//! rendered with the current time to name a new archive, and compiled into a
//! regular expression that recognizes archives created earlier.
//!
//! Recognized tokens are `%Y` (four digit year) and `%m %d %H %M %S` (two
//! digits each). Everything else in the template is literal text and is
//! escaped before it reaches the regex engine.

use chrono::{Datelike, NaiveDateTime, Timelike};
use regex::Regex;

use crate::error::BackupResult;

/// Date placeholder tokens understood by templates
const TOKENS: [char; 6] = ['Y', 'm', 'd', 'H', 'M', 'S'];

/// A template segment after tokenizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Token(char),
}

/// Split a template into literal runs and date tokens
fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch != '%' {
            continue;
        }
        let Some(&(_, next)) = chars.peek() else {
            break;
        };
        if TOKENS.contains(&next) {
            if literal_start < idx {
                out.push(Segment::Literal(&template[literal_start..idx]));
            }
            out.push(Segment::Token(next));
            chars.next();
            literal_start = idx + 2;
        }
    }

    if literal_start < template.len() {
        out.push(Segment::Literal(&template[literal_start..]));
    }
    out
}

/// Matcher for file names produced by a template
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    template: String,
    regex: Regex,
}

impl CompiledMatcher {
    /// Test whether `file_name` contains a rendering of the template
    ///
    /// The match is not anchored, so an extension or prefix around the
    /// rendered name is accepted.
    pub fn is_match(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    /// The template this matcher was compiled from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The generated regular expression source
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Compile a template into a matcher
pub fn compile(template: &str) -> BackupResult<CompiledMatcher> {
    let mut source = String::with_capacity(template.len() * 2);
    for segment in segments(template) {
        match segment {
            Segment::Literal(text) => source.push_str(&regex::escape(text)),
            Segment::Token('Y') => source.push_str(r"\d{4}"),
            Segment::Token(_) => source.push_str(r"\d{2}"),
        }
    }

    Ok(CompiledMatcher {
        template: template.to_string(),
        regex: Regex::new(&source)?,
    })
}

/// Render a template for the given moment
pub fn render(template: &str, when: &NaiveDateTime) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    for segment in segments(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Token('Y') => out.push_str(&format!("{:04}", when.year())),
            Segment::Token('m') => out.push_str(&format!("{:02}", when.month())),
            Segment::Token('d') => out.push_str(&format!("{:02}", when.day())),
            Segment::Token('H') => out.push_str(&format!("{:02}", when.hour())),
            Segment::Token('M') => out.push_str(&format!("{:02}", when.minute())),
            Segment::Token('S') => out.push_str(&format!("{:02}", when.second())),
            Segment::Token(_) => {}
        }
    }
    out
}

/// Date placeholders in ISO order, with underscores between date parts
pub fn date_placeholders(include_time: bool) -> &'static str {
    if include_time {
        "%Y_%m_%d-%H_%M_%S"
    } else {
        "%Y_%m_%d"
    }
}

/// Default file name template for a vault
pub fn default_file_name_format(vault_name: &str) -> String {
    format!("{}-Backup-{}", vault_name, date_placeholders(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_render_default_template() {
        let name = render("Vault-Backup-%Y_%m_%d-%H_%M_%S", &at(2024, 1, 5, 7, 3, 9));
        assert_eq!(name, "Vault-Backup-2024_01_05-07_03_09");
    }

    #[test]
    fn test_compile_generates_digit_classes() {
        let matcher = compile("Vault-Backup-%Y_%m_%d").unwrap();
        assert_eq!(matcher.as_str(), r"Vault\-Backup\-\d{4}_\d{2}_\d{2}");
    }

    #[test]
    fn test_round_trip_over_many_dates() {
        let templates = [
            "Vault-Backup-%Y_%m_%d-%H_%M_%S",
            "%Y%m%d",
            "notes (%d.%m.%Y) [%H%M]",
            "plain-%S-%S",
            "100%-%Y",
        ];
        let start = at(1999, 12, 31, 23, 59, 58);
        for template in templates {
            let matcher = compile(template).unwrap();
            for step in 0..400 {
                let when = start + chrono::Duration::minutes(step * 1_337);
                let rendered = render(template, &when);
                assert!(
                    matcher.is_match(&rendered),
                    "{template} did not match {rendered}"
                );
            }
        }
    }

    #[test]
    fn test_substring_match() {
        let matcher = compile("Vault-Backup-%Y_%m_%d-%H_%M_%S").unwrap();
        assert!(matcher.is_match("Vault-Backup-2023_01_01-00_00_00.zip"));
        assert!(matcher.is_match("old-Vault-Backup-2023_01_01-00_00_00.7z"));
        assert!(!matcher.is_match("Vault-Backup-2023_1_1-00_00_00.zip"));
        assert!(!matcher.is_match("Other-Backup-2023_01_01-00_00_00.zip"));
    }

    #[test]
    fn test_literal_metacharacters_are_escaped() {
        let matcher = compile("backup.%Y").unwrap();
        assert!(matcher.is_match("backup.2024"));
        assert!(!matcher.is_match("backupX2024"));

        let matcher = compile("(vault)+%m").unwrap();
        assert!(matcher.is_match("(vault)+04"));
        assert!(!matcher.is_match("vaultvault04"));
    }

    #[test]
    fn test_unknown_percent_sequences_are_literal() {
        let when = at(2024, 3, 4, 5, 6, 7);
        assert_eq!(render("%x-%Y-%", &when), "%x-2024-%");

        let matcher = compile("%x-%Y-%").unwrap();
        assert!(matcher.is_match("%x-2024-%"));
    }

    #[test]
    fn test_default_file_name_format() {
        assert_eq!(
            default_file_name_format("Notes"),
            "Notes-Backup-%Y_%m_%d-%H_%M_%S"
        );
        assert_eq!(date_placeholders(false), "%Y_%m_%d");
    }
}
