use std::char;
use std::cmp::min;

use crate::ctype::isdigit;

include!(concat!(env!("OUT_DIR"), "/entitydata.rs"));

pub const ENTITY_MIN_LENGTH: usize = 2;
pub const ENTITY_MAX_LENGTH: usize = 32;

fn isxdigit(ch: u8) -> bool {
    ch.is_ascii_hexdigit()
}

/// Tries to decode an entity at the start of `text` (just past the `&`).
/// Returns the replacement bytes and the number of input bytes consumed.
pub fn unescape(text: &[u8]) -> Option<(Vec<u8>, usize)> {
    if text.len() >= 3 && text[0] == b'#' {
        let mut codepoint: u32 = 0;
        let mut i = 0;

        let num_digits = if isdigit(text[1]) {
            i = 1;
            while i < text.len() && isdigit(text[i]) {
                codepoint = (codepoint * 10) + (text[i] as u32 - '0' as u32);
                codepoint = min(codepoint, 0x11_0000);
                i += 1;
            }
            i - 1
        } else if text[1] == b'x' || text[1] == b'X' {
            i = 2;
            while i < text.len() && isxdigit(text[i]) {
                codepoint = (codepoint * 16) + ((text[i] as u32 | 32) % 39 - 9);
                codepoint = min(codepoint, 0x11_0000);
                i += 1;
            }
            i - 2
        } else {
            0
        };

        if (1..=8).contains(&num_digits) && i < text.len() && text[i] == b';' {
            if codepoint == 0 || (0xD800..=0xE000).contains(&codepoint) || codepoint >= 0x110000 {
                codepoint = 0xFFFD;
            }
            return Some((
                char::from_u32(codepoint)
                    .unwrap_or('\u{FFFD}')
                    .to_string()
                    .into_bytes(),
                i + 1,
            ));
        }
        return None;
    }

    let size = min(text.len(), ENTITY_MAX_LENGTH);
    for i in ENTITY_MIN_LENGTH..size {
        if text[i] == b' ' {
            return None;
        }

        if text[i] == b';' {
            return lookup(&text[..i]).map(|e| (e.as_bytes().to_vec(), i + 1));
        }
    }

    None
}

fn lookup(text: &[u8]) -> Option<&'static str> {
    let name = std::str::from_utf8(text).ok()?;
    entitydata::NAMED_ENTITIES
        .binary_search_by(|(ent, _)| ent.cmp(&name))
        .ok()
        .map(|ix| entitydata::NAMED_ENTITIES[ix].1)
}

/// Decodes every `&entity;` occurrence in `src`.
pub fn unescape_html(src: &str) -> String {
    let bytes = src.as_bytes();
    let size = bytes.len();
    let mut i = 0;
    let mut v: Vec<u8> = Vec::with_capacity(size);

    while i < size {
        let org = i;
        while i < size && bytes[i] != b'&' {
            i += 1;
        }

        if i > org {
            if org == 0 && i >= size {
                return src.to_string();
            }
            v.extend_from_slice(&bytes[org..i]);
        }

        if i >= size {
            break;
        }

        i += 1;
        match unescape(&bytes[i..]) {
            Some((chs, consumed)) => {
                v.extend_from_slice(&chs);
                i += consumed;
            }
            None => v.push(b'&'),
        }
    }

    String::from_utf8(v).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_numeric() {
        assert_eq!(unescape_html("&amp;"), "&");
        assert_eq!(unescape_html("&#65;"), "A");
        assert_eq!(unescape_html("&#x41;b"), "Ab");
        assert_eq!(unescape_html("&nosuch;x"), "&nosuch;x");
        assert_eq!(unescape_html("a &lt; b"), "a < b");
    }
}
