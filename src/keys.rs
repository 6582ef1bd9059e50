//! Key name vocabulary shared by settings, hotkey resolution and backends.
//!
//! Key names are case-insensitive and whitespace-trimmed. A name is either a
//! single printable character (`"q"`, `"1"`, `";"`) or one of the named keys
//! listed in [`KEY_NAMES`]. Common aliases such as `esc` or `return` collapse
//! to a canonical name through [`normalize`].

/// Hardware scan code for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCode {
    /// Set-1 make code.
    pub code: u16,
    /// Whether the key sits behind the `E0` extended prefix.
    pub extended: bool,
}

impl ScanCode {
    const fn plain(code: u16) -> Self {
        Self {
            code,
            extended: false,
        }
    }

    const fn extended(code: u16) -> Self {
        Self {
            code,
            extended: true,
        }
    }
}

/// Canonical names of every key in the scan-code table.
pub const KEY_NAMES: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9",
    "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "space", "enter",
    "escape", "tab", "backspace", "shift", "ctrl", "alt", "capslock", "numpad0", "numpad1",
    "numpad2", "numpad3", "numpad4", "numpad5", "numpad6", "numpad7", "numpad8", "numpad9", "up",
    "down", "left", "right", "insert", "delete", "home", "end", "pageup", "pagedown",
];

/// Canonical, lowercase form of a key name.
///
/// A lone space character maps to `"space"`; everything else is trimmed,
/// lowercased and run through the alias table.
pub fn normalize(name: &str) -> String {
    if name == " " {
        return "space".to_string();
    }

    let lower = name.trim().to_lowercase();
    let canonical = match lower.as_str() {
        "esc" => "escape",
        "return" => "enter",
        "control" | "lctrl" | "rctrl" => "ctrl",
        "lshift" | "rshift" => "shift",
        "menu" | "lalt" | "ralt" => "alt",
        "caps" | "caps_lock" => "capslock",
        "spacebar" => "space",
        "back" | "bksp" => "backspace",
        "del" => "delete",
        "ins" => "insert",
        "pgup" | "page_up" => "pageup",
        "pgdn" | "page_down" => "pagedown",
        "arrowup" => "up",
        "arrowdown" => "down",
        "arrowleft" => "left",
        "arrowright" => "right",
        other => {
            if let Some(digit) = other.strip_prefix("num") {
                if digit.len() == 1 && digit.chars().all(|c| c.is_ascii_digit()) {
                    return format!("numpad{digit}");
                }
            }
            return other.to_string();
        }
    };
    canonical.to_string()
}

/// Modifier names in the order they appear in a canonical chord.
pub const MODIFIERS: &[&str] = &["ctrl", "alt", "shift", "meta"];

/// The canonical modifier a key name stands for, if it is one.
pub fn modifier(name: &str) -> Option<&'static str> {
    match normalize(name).as_str() {
        "ctrl" => Some("ctrl"),
        "alt" => Some("alt"),
        "shift" => Some("shift"),
        "meta" | "cmd" | "super" | "win" | "lwin" | "rwin" => Some("meta"),
        _ => None,
    }
}

/// Split a binding such as `"Ctrl+Shift+P"` into its modifiers (canonical
/// order, deduplicated) and its normalized key.
///
/// A lone modifier is a key, not a chord. When a leading part is not a
/// modifier the whole binding is kept as a single unresolvable key.
pub fn parse_chord(binding: &str) -> (Vec<&'static str>, String) {
    let trimmed = binding.trim();
    // "ctrl++" binds the plus key
    let split = if trimmed.len() > 2 && trimmed.ends_with("++") {
        Some(trimmed.len() - 2)
    } else {
        trimmed
            .rfind('+')
            .filter(|&i| i > 0 && i + 1 < trimmed.len())
    };
    let Some(split) = split else {
        return (Vec::new(), normalize(binding));
    };

    let (prefix, key) = (&trimmed[..split], &trimmed[split + 1..]);
    let mut held = Vec::new();
    for part in prefix.split('+') {
        match modifier(part) {
            Some(m) => held.push(m),
            None => return (Vec::new(), normalize(trimmed)),
        }
    }

    let modifiers = MODIFIERS
        .iter()
        .copied()
        .filter(|m| held.contains(m))
        .collect();
    (modifiers, normalize(key))
}

/// Canonical text of a binding: `"Shift+CTRL+p"` becomes `"ctrl+shift+p"`.
pub fn canonical(binding: &str) -> String {
    let (modifiers, key) = parse_chord(binding);
    if key.is_empty() {
        return key;
    }
    modifiers
        .into_iter()
        .chain(std::iter::once(key.as_str()))
        .collect::<Vec<_>>()
        .join("+")
}

/// Whether a configured binding matches a captured key identifier.
///
/// Keys must be equal and every modifier the binding names must be held.
/// Extra held modifiers do not prevent a match, so `"q"` still fires while
/// shift is down.
pub fn matches(binding: &str, identifier: &str) -> bool {
    let (wanted, key) = parse_chord(binding);
    if key.is_empty() {
        return false;
    }
    let (held, pressed) = parse_chord(identifier);
    key == pressed && wanted.iter().all(|m| held.contains(m))
}

/// Whether a name resolves through the table or is a single printable character.
pub fn is_known(name: &str) -> bool {
    scan_code(name).is_some() || printable_char(name).is_some()
}

/// The single printable character a name stands for, if it is one.
pub fn printable_char(name: &str) -> Option<char> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() && !c.is_whitespace() => Some(c),
        _ => None,
    }
}

/// Look up the scan code for a key name.
pub fn scan_code(name: &str) -> Option<ScanCode> {
    let code = match normalize(name).as_str() {
        // Letters
        "a" => ScanCode::plain(0x1E),
        "b" => ScanCode::plain(0x30),
        "c" => ScanCode::plain(0x2E),
        "d" => ScanCode::plain(0x20),
        "e" => ScanCode::plain(0x12),
        "f" => ScanCode::plain(0x21),
        "g" => ScanCode::plain(0x22),
        "h" => ScanCode::plain(0x23),
        "i" => ScanCode::plain(0x17),
        "j" => ScanCode::plain(0x24),
        "k" => ScanCode::plain(0x25),
        "l" => ScanCode::plain(0x26),
        "m" => ScanCode::plain(0x32),
        "n" => ScanCode::plain(0x31),
        "o" => ScanCode::plain(0x18),
        "p" => ScanCode::plain(0x19),
        "q" => ScanCode::plain(0x10),
        "r" => ScanCode::plain(0x13),
        "s" => ScanCode::plain(0x1F),
        "t" => ScanCode::plain(0x14),
        "u" => ScanCode::plain(0x16),
        "v" => ScanCode::plain(0x2F),
        "w" => ScanCode::plain(0x11),
        "x" => ScanCode::plain(0x2D),
        "y" => ScanCode::plain(0x15),
        "z" => ScanCode::plain(0x2C),

        // Numbers
        "1" => ScanCode::plain(0x02),
        "2" => ScanCode::plain(0x03),
        "3" => ScanCode::plain(0x04),
        "4" => ScanCode::plain(0x05),
        "5" => ScanCode::plain(0x06),
        "6" => ScanCode::plain(0x07),
        "7" => ScanCode::plain(0x08),
        "8" => ScanCode::plain(0x09),
        "9" => ScanCode::plain(0x0A),
        "0" => ScanCode::plain(0x0B),

        // Function keys
        "f1" => ScanCode::plain(0x3B),
        "f2" => ScanCode::plain(0x3C),
        "f3" => ScanCode::plain(0x3D),
        "f4" => ScanCode::plain(0x3E),
        "f5" => ScanCode::plain(0x3F),
        "f6" => ScanCode::plain(0x40),
        "f7" => ScanCode::plain(0x41),
        "f8" => ScanCode::plain(0x42),
        "f9" => ScanCode::plain(0x43),
        "f10" => ScanCode::plain(0x44),
        "f11" => ScanCode::plain(0x57),
        "f12" => ScanCode::plain(0x58),

        // Special keys
        "space" => ScanCode::plain(0x39),
        "enter" => ScanCode::plain(0x1C),
        "escape" => ScanCode::plain(0x01),
        "tab" => ScanCode::plain(0x0F),
        "backspace" => ScanCode::plain(0x0E),
        "shift" => ScanCode::plain(0x2A),
        "ctrl" => ScanCode::plain(0x1D),
        "alt" => ScanCode::plain(0x38),
        "capslock" => ScanCode::plain(0x3A),

        // Numpad
        "numpad0" => ScanCode::plain(0x52),
        "numpad1" => ScanCode::plain(0x4F),
        "numpad2" => ScanCode::plain(0x50),
        "numpad3" => ScanCode::plain(0x51),
        "numpad4" => ScanCode::plain(0x4B),
        "numpad5" => ScanCode::plain(0x4C),
        "numpad6" => ScanCode::plain(0x4D),
        "numpad7" => ScanCode::plain(0x47),
        "numpad8" => ScanCode::plain(0x48),
        "numpad9" => ScanCode::plain(0x49),

        // Navigation cluster shares make codes with the numpad, hence E0
        "up" => ScanCode::extended(0x48),
        "down" => ScanCode::extended(0x50),
        "left" => ScanCode::extended(0x4B),
        "right" => ScanCode::extended(0x4D),
        "insert" => ScanCode::extended(0x52),
        "delete" => ScanCode::extended(0x53),
        "home" => ScanCode::extended(0x47),
        "end" => ScanCode::extended(0x4F),
        "pageup" => ScanCode::extended(0x49),
        "pagedown" => ScanCode::extended(0x51),

        _ => return None,
    };

    Some(code)
}

/// Turn a captured virtual-key code into a key identifier.
///
/// Letters and digits come back as their lowercase character; named keys as
/// their canonical name. Codes outside the table yield `None`.
pub fn name_for_virtual_key(vk: u32) -> Option<String> {
    let name = match vk {
        0x41..=0x5A | 0x30..=0x39 => {
            let c = char::from_u32(vk)?.to_ascii_lowercase();
            return Some(c.to_string());
        }
        0x70..=0x7B => return Some(format!("f{}", vk - 0x70 + 1)),
        0x60..=0x69 => return Some(format!("numpad{}", vk - 0x60)),
        0x20 => "space",
        0x0D => "enter",
        0x1B => "escape",
        0x09 => "tab",
        0x08 => "backspace",
        0x10 | 0xA0 | 0xA1 => "shift",
        0x11 | 0xA2 | 0xA3 => "ctrl",
        0x12 | 0xA4 | 0xA5 => "alt",
        0x14 => "capslock",
        0x21 => "pageup",
        0x22 => "pagedown",
        0x23 => "end",
        0x24 => "home",
        0x25 => "left",
        0x26 => "up",
        0x27 => "right",
        0x28 => "down",
        0x2D => "insert",
        0x2E => "delete",
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_aliases() {
        assert_eq!(normalize("Esc"), "escape");
        assert_eq!(normalize(" RETURN "), "enter");
        assert_eq!(normalize("Control"), "ctrl");
        assert_eq!(normalize("ArrowUp"), "up");
        assert_eq!(normalize("num7"), "numpad7");
        assert_eq!(normalize(" "), "space");
        assert_eq!(normalize("Q"), "q");
        assert_eq!(normalize("F9"), "f9");
    }

    #[test]
    fn test_every_table_name_resolves() {
        for name in KEY_NAMES {
            assert!(scan_code(name).is_some(), "missing scan code for {name}");
            assert_eq!(normalize(name), *name);
        }
    }

    #[test]
    fn test_scan_codes() {
        assert_eq!(scan_code("q"), Some(ScanCode::plain(0x10)));
        assert_eq!(scan_code("Q"), Some(ScanCode::plain(0x10)));
        assert_eq!(scan_code("esc"), scan_code("escape"));
        assert_eq!(scan_code("f11"), Some(ScanCode::plain(0x57)));
        assert!(scan_code("up").is_some_and(|sc| sc.extended));
        assert!(scan_code("numpad8").is_some_and(|sc| !sc.extended));
        assert_eq!(scan_code("invalid_key_xyz"), None);
        assert_eq!(scan_code(""), None);
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        assert!(matches("Q", "q"));
        assert!(matches("esc", "escape"));
        assert!(!matches("", ""));
        assert!(!matches("q", "w"));
    }

    #[test]
    fn test_parse_chord() {
        assert_eq!(
            parse_chord("Shift+CTRL+p"),
            (vec!["ctrl", "shift"], "p".to_string())
        );
        assert_eq!(parse_chord("ctrl"), (Vec::new(), "ctrl".to_string()));
        assert_eq!(parse_chord("+"), (Vec::new(), "+".to_string()));
        assert_eq!(parse_chord("ctrl++").1, "+");
        assert_eq!(parse_chord("q+w"), (Vec::new(), "q+w".to_string()));
        assert_eq!(canonical("alt+Control+Esc"), "ctrl+alt+escape");
        assert_eq!(canonical("F9"), "f9");
    }

    #[test]
    fn test_matches_chords() {
        assert!(matches("ctrl+shift+p", "shift+ctrl+p"));
        assert!(matches("ctrl+p", "ctrl+alt+p"));
        assert!(matches("q", "shift+q"));
        assert!(!matches("ctrl+shift+p", "p"));
        assert!(!matches("ctrl+shift+p", "ctrl+p"));
        assert!(!matches("ctrl+p", "ctrl+q"));
        assert!(!matches("q+w", "w"));
    }

    #[test]
    fn test_is_known() {
        assert!(is_known("space"));
        assert!(is_known(";"));
        assert!(!is_known("hyperkey"));
        assert!(!is_known(""));
    }

    #[test]
    fn test_virtual_key_names() {
        assert_eq!(name_for_virtual_key(0x51).as_deref(), Some("q"));
        assert_eq!(name_for_virtual_key(0x35).as_deref(), Some("5"));
        assert_eq!(name_for_virtual_key(0x78).as_deref(), Some("f9"));
        assert_eq!(name_for_virtual_key(0x7B).as_deref(), Some("f12"));
        assert_eq!(name_for_virtual_key(0x63).as_deref(), Some("numpad3"));
        assert_eq!(name_for_virtual_key(0x1B).as_deref(), Some("escape"));
        assert_eq!(name_for_virtual_key(0xFF), None);
    }
}
