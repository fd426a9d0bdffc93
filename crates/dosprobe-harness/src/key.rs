//! Stroke tokens and their translation to virtual key codes.
//!
//! A stroke is either a literal directive (`":ABC"`, one key per character)
//! or a named key (`"enter"`, `"left"`, ...). [`translate`] turns a script of
//! strokes into the flat sequence of key codes the sequencer dispatches.

use std::fmt;

use crate::error::HarnessError;

/// Prefix marking a literal directive.
pub const LITERAL_PREFIX: char = ':';

/// A platform virtual key code, as carried by host keyboard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const ENTER: KeyCode = KeyCode(13);
    pub const ALT: KeyCode = KeyCode(18);
    pub const ESC: KeyCode = KeyCode(27);
    pub const LEFT: KeyCode = KeyCode(37);
    pub const UP: KeyCode = KeyCode(38);
    pub const RIGHT: KeyCode = KeyCode(39);
    pub const DOWN: KeyCode = KeyCode(40);

    /// The key code for an ASCII letter or digit.
    ///
    /// Letters map to their upper-case ordinal, digits to their own.
    pub fn from_alphanumeric(ch: char) -> Option<KeyCode> {
        ch.is_ascii_alphanumeric()
            .then(|| KeyCode(u16::from(ch.to_ascii_uppercase() as u8)))
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The fixed vocabulary of named keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Left,
    Up,
    Right,
    Down,
    Alt,
    Enter,
    Esc,
}

impl NamedKey {
    pub const ALL: [NamedKey; 7] = [
        NamedKey::Left,
        NamedKey::Up,
        NamedKey::Right,
        NamedKey::Down,
        NamedKey::Alt,
        NamedKey::Enter,
        NamedKey::Esc,
    ];

    /// The token that names this key in a script.
    pub fn name(self) -> &'static str {
        match self {
            NamedKey::Left => "left",
            NamedKey::Up => "up",
            NamedKey::Right => "right",
            NamedKey::Down => "down",
            NamedKey::Alt => "alt",
            NamedKey::Enter => "enter",
            NamedKey::Esc => "esc",
        }
    }

    pub fn code(self) -> KeyCode {
        match self {
            NamedKey::Left => KeyCode::LEFT,
            NamedKey::Up => KeyCode::UP,
            NamedKey::Right => KeyCode::RIGHT,
            NamedKey::Down => KeyCode::DOWN,
            NamedKey::Alt => KeyCode::ALT,
            NamedKey::Enter => KeyCode::ENTER,
            NamedKey::Esc => KeyCode::ESC,
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<NamedKey> {
        NamedKey::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(name))
    }
}

/// One parsed stroke token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stroke {
    /// Characters typed one key at a time, already validated.
    Literal(String),
    Named(NamedKey),
}

impl Stroke {
    /// Parse a single token, rejecting anything outside the vocabulary.
    pub fn parse(token: &str) -> Result<Stroke, HarnessError> {
        if let Some(text) = token.strip_prefix(LITERAL_PREFIX) {
            if let Some(bad) = text.chars().find(|c| !c.is_ascii_alphanumeric()) {
                return Err(HarnessError::InvalidStroke {
                    token: token.to_string(),
                    character: Some(bad),
                    reason: format!("character {bad:?} is not alphanumeric"),
                });
            }
            return Ok(Stroke::Literal(text.to_string()));
        }

        NamedKey::from_name(token)
            .map(Stroke::Named)
            .ok_or_else(|| HarnessError::InvalidStroke {
                token: token.to_string(),
                character: None,
                reason: "unknown key name".to_string(),
            })
    }

    /// The key codes this stroke expands to, in typing order.
    pub fn key_codes(&self) -> Vec<KeyCode> {
        match self {
            // Characters were validated by `parse`.
            Stroke::Literal(text) => text.chars().filter_map(KeyCode::from_alphanumeric).collect(),
            Stroke::Named(key) => vec![key.code()],
        }
    }
}

/// Translate a stroke script into key codes.
///
/// Fails on the first malformed token; nothing is returned for a partially
/// valid script.
pub fn translate<S: AsRef<str>>(strokes: &[S]) -> Result<Vec<KeyCode>, HarnessError> {
    let mut codes = Vec::new();
    for token in strokes {
        codes.extend(Stroke::parse(token.as_ref())?.key_codes());
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(codes: &[KeyCode]) -> Vec<u16> {
        codes.iter().map(|c| c.value()).collect()
    }

    #[test]
    fn literal_and_named_scenario() {
        let codes = translate(&[":AB", "enter"]).unwrap();
        assert_eq!(values(&codes), vec![65, 66, 13]);
    }

    #[test]
    fn literal_is_upper_cased() {
        let codes = translate(&[":dir"]).unwrap();
        assert_eq!(values(&codes), vec![68, 73, 82]);
    }

    #[test]
    fn literal_digits_keep_their_ordinal() {
        let codes = translate(&[":a1Z9"]).unwrap();
        assert_eq!(values(&codes), vec![65, 49, 90, 57]);
    }

    #[test]
    fn literal_length_matches_code_count() {
        for text in ["", "x", "HELLO", "abc123XYZ"] {
            let codes = translate(&[format!(":{text}")]).unwrap();
            assert_eq!(codes.len(), text.len(), "literal {text:?}");
            for (code, ch) in codes.iter().zip(text.chars()) {
                assert_eq!(code.value(), u16::from(ch.to_ascii_uppercase() as u8));
            }
        }
    }

    #[test]
    fn every_named_key_has_its_code() {
        let expected = [
            ("left", 37),
            ("up", 38),
            ("right", 39),
            ("down", 40),
            ("alt", 18),
            ("enter", 13),
            ("esc", 27),
        ];
        for (name, code) in expected {
            assert_eq!(values(&translate(&[name]).unwrap()), vec![code], "{name}");
        }
    }

    #[test]
    fn named_keys_are_case_insensitive() {
        assert_eq!(values(&translate(&["ENTER", "Esc"]).unwrap()), vec![13, 27]);
    }

    #[test]
    fn non_alphanumeric_literal_names_character_and_token() {
        let err = translate(&[":OK", ":A B"]).unwrap_err();
        match err {
            HarnessError::InvalidStroke {
                token, character, ..
            } => {
                assert_eq!(token, ":A B");
                assert_eq!(character, Some(' '));
            }
            other => panic!("expected InvalidStroke, got {other}"),
        }
    }

    #[test]
    fn non_ascii_letters_rejected() {
        assert!(matches!(
            translate(&[":caf\u{e9}"]),
            Err(HarnessError::InvalidStroke { character: Some('\u{e9}'), .. })
        ));
    }

    #[test]
    fn unknown_name_rejected() {
        let err = translate(&["enter", "tab"]).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::InvalidStroke { ref token, character: None, .. } if token == "tab"
        ));
        assert!(err.to_string().contains("unknown key name"));
    }

    #[test]
    fn bare_text_is_not_a_literal() {
        assert!(translate(&["AB"]).is_err());
    }

    #[test]
    fn empty_script_translates_to_nothing() {
        let empty: [&str; 0] = [];
        assert!(translate(&empty).unwrap().is_empty());
    }
}
