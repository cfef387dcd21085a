//! Key-sequence mini-language parsing and escape sequence encoding.
//!
//! Test scripts describe input as a plain string where every character is a
//! literal keystroke, except a bracketed region `<name>` which names a
//! special key: `"jj<enter><tab>q"` presses `j` twice, Enter, Tab, then `q`.
//!
//! # Grammar
//!
//! - Any character outside brackets is a [`KeyToken::Literal`].
//! - `<` captures everything up to the next `>` verbatim as a
//!   [`KeyToken::Named`] token.
//! - A `<` with no closing `>` is not an error: the `<` and everything after
//!   it are treated as literal characters. Parsing is total.
//!
//! # Permissive encoding
//!
//! An unrecognized key name encodes as its own characters in UTF-8. This is
//! intentional fallback behavior, not a bug: key names are user-supplied,
//! and a test script with a typo should degrade to typing the name rather
//! than hard-failing the whole capture. Callers that want strictness can
//! pre-validate with [`unknown_names`].
//!
//! # Example
//!
//! ```rust
//! use tuishot::keys::{parse_keys, token_bytes, KeyToken};
//!
//! let tokens = parse_keys("jj<enter>");
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(token_bytes(&tokens[2]), b"\r");
//! ```

use bitflags::bitflags;

bitflags! {
    /// Modifier keys recognized in `<mod+key>` names.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Control key, as in `<ctrl+c>`.
        const CTRL = 0b01;
        /// Alt/Option key, as in `<alt+x>`.
        const ALT  = 0b10;
    }
}

/// A single parsed key: either a literal character or a named special key.
///
/// Tokens are produced by [`parse_keys`] and consumed immediately by
/// [`token_bytes`]; named keys keep the raw name (case preserved) so the
/// permissive fallback can echo it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyToken {
    /// A literal character keystroke.
    Literal(char),
    /// A bracketed special key name, e.g. `enter` or `ctrl+c`.
    Named(String),
}

/// Parses a key-sequence string into tokens.
///
/// Never fails: malformed bracket syntax falls back to literal characters.
///
/// # Example
///
/// ```rust
/// use tuishot::keys::{parse_keys, KeyToken};
///
/// let tokens = parse_keys("a<up>");
/// assert_eq!(tokens[0], KeyToken::Literal('a'));
/// assert_eq!(tokens[1], KeyToken::Named("up".to_string()));
/// ```
pub fn parse_keys(spec: &str) -> Vec<KeyToken> {
    let chars: Vec<char> = spec.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '<' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '>') {
                let name: String = chars[i + 1..i + 1 + end].iter().collect();
                tokens.push(KeyToken::Named(name));
                i += end + 2;
                continue;
            }
            // Unterminated bracket: fall through and emit '<' as a literal.
        }
        tokens.push(KeyToken::Literal(chars[i]));
        i += 1;
    }

    tokens
}

/// Encodes a token into the raw bytes to write to the PTY master.
///
/// Recognized names are matched case-insensitively against a fixed table of
/// control and escape sequences; anything else encodes permissively as the
/// name's own characters (see the module docs).
pub fn token_bytes(token: &KeyToken) -> Vec<u8> {
    match token {
        KeyToken::Literal(c) => c.to_string().into_bytes(),
        KeyToken::Named(name) => {
            named_bytes(name).unwrap_or_else(|| name.clone().into_bytes())
        }
    }
}

/// Encodes a whole key-sequence string, one byte sequence per token.
///
/// Total over every input string: an empty spec yields an empty vec, and no
/// token ever encodes to zero bytes.
pub fn encode_keys(spec: &str) -> Vec<Vec<u8>> {
    parse_keys(spec).iter().map(token_bytes).collect()
}

/// Returns the named tokens in `spec` that do not match the key table.
///
/// The encoder itself stays permissive; this is the opt-in strictness hook
/// for callers that want to reject typos up front.
pub fn unknown_names(spec: &str) -> Vec<String> {
    parse_keys(spec)
        .into_iter()
        .filter_map(|t| match t {
            KeyToken::Named(name) if named_bytes(&name).is_none() => Some(name),
            _ => None,
        })
        .collect()
}

/// Looks up a special key name in the fixed encoding table.
///
/// Arrow keys use CSI sequences, F1-F4 use SS3, and `ctrl+`/`alt+` prefixes
/// apply the usual control-character and ESC-prefix transforms.
fn named_bytes(name: &str) -> Option<Vec<u8>> {
    let mut lower = name.to_ascii_lowercase();

    let mut mods = Modifiers::empty();
    loop {
        if let Some(rest) = lower.strip_prefix("ctrl+") {
            mods |= Modifiers::CTRL;
            lower = rest.to_string();
        } else if let Some(rest) = lower.strip_prefix("alt+") {
            mods |= Modifiers::ALT;
            lower = rest.to_string();
        } else {
            break;
        }
    }

    if !mods.is_empty() {
        let mut chars = lower.chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        return modified_char(mods, c);
    }

    let bytes: &[u8] = match lower.as_str() {
        "enter" | "return" => b"\r",
        "tab" => b"\t",
        "esc" | "escape" => b"\x1b",
        "space" => b" ",
        "backspace" => b"\x7f",
        "delete" => b"\x1b[3~",
        "insert" => b"\x1b[2~",
        "up" => b"\x1b[A",
        "down" => b"\x1b[B",
        "right" => b"\x1b[C",
        "left" => b"\x1b[D",
        "home" => b"\x1b[H",
        "end" => b"\x1b[F",
        "pgup" | "pageup" => b"\x1b[5~",
        "pgdown" | "pagedown" => b"\x1b[6~",
        "f1" => b"\x1bOP",
        "f2" => b"\x1bOQ",
        "f3" => b"\x1bOR",
        "f4" => b"\x1bOS",
        "f5" => b"\x1b[15~",
        "f6" => b"\x1b[17~",
        "f7" => b"\x1b[18~",
        "f8" => b"\x1b[19~",
        "f9" => b"\x1b[20~",
        "f10" => b"\x1b[21~",
        "f11" => b"\x1b[23~",
        "f12" => b"\x1b[24~",
        _ => return None,
    };

    Some(bytes.to_vec())
}

/// Encodes a modified character keystroke.
///
/// Ctrl maps A-Z into the ASCII control range 1-26 (punctuation forms
/// follow the usual terminal conventions); Alt prefixes the keystroke with
/// ESC. `ctrl+alt+c` applies both.
fn modified_char(mods: Modifiers, c: char) -> Option<Vec<u8>> {
    let key = if mods.contains(Modifiers::CTRL) {
        let upper = c.to_ascii_uppercase();
        let byte = match upper {
            'A'..='Z' => (upper as u8) - b'A' + 1,
            '@' => 0,
            '[' => 27,
            '\\' => 28,
            ']' => 29,
            '^' => 30,
            '_' => 31,
            '?' => 127,
            _ => return None,
        };
        vec![byte]
    } else {
        c.to_string().into_bytes()
    };

    if mods.contains(Modifiers::ALT) {
        let mut bytes = vec![0x1b];
        bytes.extend_from_slice(&key);
        Some(bytes)
    } else {
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals_and_named() {
        let tokens = parse_keys("jj<enter>");
        assert_eq!(
            tokens,
            vec![
                KeyToken::Literal('j'),
                KeyToken::Literal('j'),
                KeyToken::Named("enter".to_string()),
            ]
        );
    }

    #[test]
    fn enter_encodes_as_carriage_return() {
        assert_eq!(token_bytes(&KeyToken::Named("enter".to_string())), b"\r");
        assert_eq!(token_bytes(&KeyToken::Named("RETURN".to_string())), b"\r");
    }

    #[test]
    fn unterminated_bracket_is_literal() {
        let tokens = parse_keys("a<up");
        assert_eq!(
            tokens,
            vec![
                KeyToken::Literal('a'),
                KeyToken::Literal('<'),
                KeyToken::Literal('u'),
                KeyToken::Literal('p'),
            ]
        );
    }

    #[test]
    fn empty_bracket_pair_is_named_empty() {
        // "<>" captures an empty name, which is unknown and echoes nothing
        // meaningful; the encoder still produces the name bytes (empty) for
        // it, but parse keeps it a Named token.
        let tokens = parse_keys("<>");
        assert_eq!(tokens, vec![KeyToken::Named(String::new())]);
    }

    #[test]
    fn arrows_and_function_keys() {
        assert_eq!(token_bytes(&KeyToken::Named("up".into())), b"\x1b[A");
        assert_eq!(token_bytes(&KeyToken::Named("Left".into())), b"\x1b[D");
        assert_eq!(token_bytes(&KeyToken::Named("f1".into())), b"\x1bOP");
        assert_eq!(token_bytes(&KeyToken::Named("f4".into())), b"\x1bOS");
        assert_eq!(token_bytes(&KeyToken::Named("pgdown".into())), b"\x1b[6~");
    }

    #[test]
    fn control_combinations() {
        assert_eq!(token_bytes(&KeyToken::Named("ctrl+c".into())), vec![3]);
        assert_eq!(token_bytes(&KeyToken::Named("ctrl+d".into())), vec![4]);
        assert_eq!(token_bytes(&KeyToken::Named("ctrl+P".into())), vec![16]);
        assert_eq!(token_bytes(&KeyToken::Named("alt+x".into())), b"\x1bx");
        assert_eq!(token_bytes(&KeyToken::Named("ctrl+alt+c".into())), b"\x1b\x03");
    }

    #[test]
    fn unknown_name_falls_back_to_literal_text() {
        assert_eq!(token_bytes(&KeyToken::Named("bogus".into())), b"bogus");
    }

    #[test]
    fn encoding_is_total() {
        // Every input, including pathological ones, encodes without panics.
        for spec in ["", "<", ">", "<<>>", "a<b<c>", "<ctrl+>", "héllo<ünknown>"] {
            let _ = encode_keys(spec);
        }
        assert!(!encode_keys("x").is_empty());
    }

    #[test]
    fn unknown_names_reports_typos_only() {
        let unknown = unknown_names("j<enter><entr><ctrl+c><wat>");
        assert_eq!(unknown, vec!["entr".to_string(), "wat".to_string()]);
    }

    #[test]
    fn utf8_literals_encode_as_utf8() {
        assert_eq!(token_bytes(&KeyToken::Literal('é')), "é".as_bytes());
    }
}
