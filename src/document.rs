//! Untyped INI documents.
//!
//! A document maps section names to key/value pairs, all values kept as
//! strings. Typing and validation happen in [`crate::config`].

use core::fmt;
use core::str::FromStr;

use std::collections::BTreeMap;

use log::trace;

use crate::error::ConfigError;

/// Key/value pairs of one section.
pub type Section = BTreeMap<String, String>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    sections: BTreeMap<String, Section>,
}

impl Document {
    pub fn new() -> Document {
        Document::default()
    }

    /// Parses INI text.
    ///
    /// Section names are case-sensitive, keys are folded to lower case.
    /// `#` or `;` at the start of a line comments out the line; `#` at the
    /// start of a value or after whitespace comments out the rest of it.
    pub fn parse(text: &str) -> Result<Document, ConfigError> {
        let mut document = Document::new();
        let mut current: Option<String> = None;
        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let header = if line.starts_with('[') {
                strip_comment(line).trim_end()
            } else {
                line
            };
            if header.starts_with('[') && header.ends_with(']') {
                let name = header[1..header.len() - 1].trim();
                if name.is_empty() {
                    return Err(ConfigError::Syntax {
                        line: line_number,
                        message: "empty section name".to_string(),
                    });
                }
                if document.sections.contains_key(name) {
                    return Err(ConfigError::DuplicateSection {
                        line: line_number,
                        section: name.to_string(),
                    });
                }
                trace!("line {line_number}: section [{name}]");
                document.sections.insert(name.to_string(), Section::new());
                current = Some(name.to_string());
                continue;
            }
            let (key, value) = split_pair(line).ok_or_else(|| ConfigError::Syntax {
                line: line_number,
                message: format!("expected `key = value` or `[section]`, found {line:?}"),
            })?;
            let section_name = current.as_ref().ok_or_else(|| ConfigError::Syntax {
                line: line_number,
                message: format!("key {key} appears before any section header"),
            })?;
            let section = document.sections.entry(section_name.clone()).or_default();
            if section.contains_key(&key) {
                return Err(ConfigError::DuplicateKey {
                    line: line_number,
                    section: section_name.clone(),
                    key,
                });
            }
            section.insert(key, value);
        }
        Ok(document)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    /// Sets a value, creating the section if needed.
    ///
    /// Names and values that would read back differently after writing
    /// the document out are rejected, e.g. a value with ` #` in it.
    pub fn set(
        &mut self,
        section: &str,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let value = value.into();
        let reject = |reason: &str| ConfigError::invalid_value(section, key, reason);
        if section.is_empty()
            || section.trim() != section
            || section.chars().any(char::is_control)
            || strip_comment(&format!("[{section}]")).len() != section.len() + 2
        {
            return Err(reject("section name cannot be written as a header"));
        }
        if key.is_empty()
            || key.trim() != key
            || key.chars().any(|c| c.is_control() || c == '=' || c == ':')
            || key.starts_with(|c: char| c == '#' || c == ';' || c == '[')
        {
            return Err(reject("key cannot be written as `key = value`"));
        }
        if value.trim() != value
            || value.chars().any(char::is_control)
            || strip_comment(&value).len() != value.len()
        {
            return Err(reject(
                "value has surrounding whitespace, a line break or a comment",
            ));
        }
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_lowercase(), value);
        Ok(())
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Splits `key = value` (or `key: value`) at the first delimiter.
fn split_pair(line: &str) -> Option<(String, String)> {
    let pos = line.find(|c: char| c == '=' || c == ':')?;
    let key = line[..pos].trim();
    if key.is_empty() {
        return None;
    }
    let value = strip_comment(&line[pos + 1..]).trim();
    Some((key.to_lowercase(), value.to_string()))
}

fn strip_comment(value: &str) -> &str {
    let mut previous: Option<char> = None;
    for (i, c) in value.char_indices() {
        if c == '#' && previous.map_or(true, char::is_whitespace) {
            return &value[..i];
        }
        previous = Some(c);
    }
    value
}

impl FromStr for Document {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Document, ConfigError> {
        Document::parse(s)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        for (i, (name, section)) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{name}]")?;
            for (key, value) in section {
                if value.is_empty() {
                    writeln!(f, "{key} =")?;
                } else {
                    writeln!(f, "{key} = {value}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const SAMPLE: &str = "\
# controller access
[opensprinkler]
controller = http://192.168.1.20
password = a6d82bced638de3def1e9bbb4983225c  # md5 of the password

; database
[database]
config: host=localhost dbname=garden
Table = public.lines
";

    #[test]
    fn parses_sections_and_keys() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert_eq!(doc.get("opensprinkler", "controller"), Some("http://192.168.1.20"));
        assert_eq!(
            doc.get("opensprinkler", "password"),
            Some("a6d82bced638de3def1e9bbb4983225c")
        );
        assert_eq!(doc.get("database", "config"), Some("host=localhost dbname=garden"));
        assert_eq!(doc.get("database", "table"), Some("public.lines"));
        assert_eq!(doc.get("database", "TABLE"), Some("public.lines"));
        assert_eq!(doc.get("Database", "table"), None);
        assert_eq!(doc.sections().count(), 2);
    }

    #[test]
    fn hash_inside_a_word_is_kept() {
        let doc = Document::parse("[s]\npassword = se#cret\nother =#gone\n").unwrap();
        assert_eq!(doc.get("s", "password"), Some("se#cret"));
        assert_eq!(doc.get("s", "other"), Some(""));
    }

    #[test]
    fn empty_value_is_allowed() {
        let doc = Document::parse("[irrigation]\nprogram_name_prefix =\n").unwrap();
        assert_eq!(doc.get("irrigation", "program_name_prefix"), Some(""));
    }

    #[test]
    fn comment_after_header() {
        let doc = Document::parse("[irrigation]  # watering schedule\nslot_minutes = 60\n")
            .unwrap();
        assert_eq!(doc.get("irrigation", "slot_minutes"), Some("60"));
        let doc = Document::parse("[a#b]\nk = v\n").unwrap();
        assert_eq!(doc.get("a#b", "k"), Some("v"));
        assert!(matches!(
            Document::parse("[irrigation # schedule]\n"),
            Err(ConfigError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn set_rejects_what_cannot_be_read_back() {
        let mut doc = Document::new();
        assert!(doc.set("irrigation", "slot_1_name", "front #2").is_err());
        assert!(doc.set("irrigation", "slot_1_name", "#2").is_err());
        assert!(doc.set("irrigation", "slot_1_name", " front").is_err());
        assert!(doc.set("irrigation", "slot_1_name", "front\nback").is_err());
        assert!(doc.set("irrigation", "slot=1", "front").is_err());
        assert!(doc.set("irrigation", "; slot", "front").is_err());
        assert!(doc.set("irrigation", "[slot]", "front").is_err());
        assert!(doc.set("irr #1", "slot", "front").is_err());
        assert!(doc.set("", "slot", "front").is_err());
        assert!(doc.is_empty());

        doc.set("irrigation", "slot_1_name", "front#2").unwrap();
        assert_eq!(Document::parse(&doc.to_string()).unwrap(), doc);
    }

    #[test]
    fn pair_before_header_is_rejected() {
        match Document::parse("\nkey = value\n") {
            Err(ConfigError::Syntax { line: 2, .. }) => {}
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn garbage_line_is_rejected() {
        assert!(matches!(
            Document::parse("[s]\njust some words\n"),
            Err(ConfigError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            Document::parse("[s]\n= value\n"),
            Err(ConfigError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            Document::parse("[ ]\n"),
            Err(ConfigError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn duplicates_are_rejected() {
        assert!(matches!(
            Document::parse("[s]\na = 1\n[s]\n"),
            Err(ConfigError::DuplicateSection { line: 3, .. })
        ));
        assert!(matches!(
            Document::parse("[s]\na = 1\nA = 2\n"),
            Err(ConfigError::DuplicateKey { line: 3, .. })
        ));
    }

    #[test]
    fn serializes_canonically() {
        let mut doc = Document::new();
        doc.set("b", "Key", "value").unwrap();
        doc.set("a", "empty", "").unwrap();
        assert_eq!(doc.to_string(), "[a]\nempty =\n\n[b]\nkey = value\n");
    }

    fn document_strategy() -> impl Strategy<Value = Document> {
        let section = prop::collection::btree_map(
            "[a-z_][a-z0-9_]{0,12}",
            "([A-Za-z0-9_./@=:-][A-Za-z0-9_./@=:# -]{0,24}[A-Za-z0-9_./@=:-])?",
            0..8,
        );
        prop::collection::btree_map("[A-Za-z_][A-Za-z0-9_ ]{0,12}[a-z]", section, 0..5)
            .prop_map(|sections| Document { sections })
    }

    /// Documents built through `set`, with whatever it accepts.
    fn set_document_strategy() -> impl Strategy<Value = Document> {
        prop::collection::vec(("[ -~]{0,6}", "[ -~]{0,8}", "[ -~]{0,12}"), 0..24).prop_map(
            |entries| {
                let mut doc = Document::new();
                for (section, key, value) in entries {
                    let _ = doc.set(&section, &key, value);
                }
                doc
            },
        )
    }

    proptest! {
        /// Property: parse(serialize(parse(text))) == parse(text).
        #[test]
        fn round_trip_preserves_mapping(doc in document_strategy()) {
            let once = Document::parse(&doc.to_string()).unwrap();
            let twice = Document::parse(&once.to_string()).unwrap();
            prop_assert_eq!(&once, &twice);
        }

        /// Property: whatever `set` accepts is read back unchanged.
        #[test]
        fn written_document_reads_back(doc in set_document_strategy()) {
            let text = doc.to_string();
            let parsed = Document::parse(&text);
            prop_assert!(parsed.is_ok(), "{:?} does not parse", text);
            prop_assert_eq!(parsed.unwrap(), doc);
        }

        /// Property: the parser never panics.
        #[test]
        fn parse_never_panics(text in "(\\PC{0,40}\n){0,8}") {
            let _ = Document::parse(&text);
        }
    }
}
