// Keyhook Key Type
// Raw key codes in the native code space of the active hook backend

use std::fmt;
use std::str::FromStr;

/// Represents a single keyboard key code.
///
/// This is a newtype wrapper around u16. The numeric value is whatever the
/// platform hook delivers: Linux input-event-codes.h values for the evdev
/// backend, Win32 virtual-key codes for the low-level Windows hook. The
/// named constants below resolve to the native value at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    /// Get the raw numeric code value
    pub const fn code(self) -> u16 {
        self.0
    }

    /// Get the name of this key, if it has one
    pub fn name(self) -> Option<&'static str> {
        KEY_NAMES
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(name, _)| *name)
    }
}

/// Declares named keys with their (evdev, virtual-key) code pairs.
macro_rules! native_keys {
    ($($name:ident = $evdev:expr, $vk:expr;)*) => {
        impl Key {
            $(
                pub const $name: Key = Key(if cfg!(windows) { $vk } else { $evdev });
            )*
        }

        /// Name table used for parsing and display
        const KEY_NAMES: &[(&str, Key)] = &[
            $((stringify!($name), Key::$name),)*
        ];
    };
}

native_keys! {
    ESC = 1, 0x1B;
    KEY_1 = 2, 0x31;
    KEY_2 = 3, 0x32;
    KEY_3 = 4, 0x33;
    KEY_4 = 5, 0x34;
    KEY_5 = 6, 0x35;
    KEY_6 = 7, 0x36;
    KEY_7 = 8, 0x37;
    KEY_8 = 9, 0x38;
    KEY_9 = 10, 0x39;
    KEY_0 = 11, 0x30;
    MINUS = 12, 0xBD;
    EQUAL = 13, 0xBB;
    BACKSPACE = 14, 0x08;
    TAB = 15, 0x09;
    Q = 16, 0x51;
    W = 17, 0x57;
    E = 18, 0x45;
    R = 19, 0x52;
    T = 20, 0x54;
    Y = 21, 0x59;
    U = 22, 0x55;
    I = 23, 0x49;
    O = 24, 0x4F;
    P = 25, 0x50;
    LEFT_BRACE = 26, 0xDB;
    RIGHT_BRACE = 27, 0xDD;
    ENTER = 28, 0x0D;
    LEFT_CTRL = 29, 0xA2;
    A = 30, 0x41;
    S = 31, 0x53;
    D = 32, 0x44;
    F = 33, 0x46;
    G = 34, 0x47;
    H = 35, 0x48;
    J = 36, 0x4A;
    K = 37, 0x4B;
    L = 38, 0x4C;
    SEMICOLON = 39, 0xBA;
    APOSTROPHE = 40, 0xDE;
    GRAVE = 41, 0xC0;
    LEFT_SHIFT = 42, 0xA0;
    BACKSLASH = 43, 0xDC;
    Z = 44, 0x5A;
    X = 45, 0x58;
    C = 46, 0x43;
    V = 47, 0x56;
    B = 48, 0x42;
    N = 49, 0x4E;
    M = 50, 0x4D;
    COMMA = 51, 0xBC;
    DOT = 52, 0xBE;
    SLASH = 53, 0xBF;
    RIGHT_SHIFT = 54, 0xA1;
    LEFT_ALT = 56, 0xA4;
    SPACE = 57, 0x20;
    CAPSLOCK = 58, 0x14;
    F1 = 59, 0x70;
    F2 = 60, 0x71;
    F3 = 61, 0x72;
    F4 = 62, 0x73;
    F5 = 63, 0x74;
    F6 = 64, 0x75;
    F7 = 65, 0x76;
    F8 = 66, 0x77;
    F9 = 67, 0x78;
    F10 = 68, 0x79;
    F11 = 87, 0x7A;
    F12 = 88, 0x7B;
    RIGHT_CTRL = 97, 0xA3;
    SYSRQ = 99, 0x2C;
    RIGHT_ALT = 100, 0xA5;
    HOME = 102, 0x24;
    UP = 103, 0x26;
    PAGE_UP = 104, 0x21;
    LEFT = 105, 0x25;
    RIGHT = 106, 0x27;
    END = 107, 0x23;
    DOWN = 108, 0x28;
    PAGE_DOWN = 109, 0x22;
    INSERT = 110, 0x2D;
    DELETE = 111, 0x2E;
    MUTE = 113, 0xAD;
    VOLUMEDOWN = 114, 0xAE;
    VOLUMEUP = 115, 0xAF;
    PAUSE = 119, 0x13;
    LEFT_META = 125, 0x5B;
    RIGHT_META = 126, 0x5C;
    NEXTSONG = 163, 0xB0;
    PLAYPAUSE = 164, 0xB3;
    PREVIOUSSONG = 165, 0xB1;
}

/// Common spellings that differ from the canonical table names
const KEY_ALIASES: &[(&str, &str)] = &[
    ("ESCAPE", "ESC"),
    ("RETURN", "ENTER"),
    ("DEL", "DELETE"),
    ("INS", "INSERT"),
    ("PGUP", "PAGE_UP"),
    ("PGDN", "PAGE_DOWN"),
    ("PRINT", "SYSRQ"),
    ("PRINTSCREEN", "SYSRQ"),
    ("PERIOD", "DOT"),
    ("BACKQUOTE", "GRAVE"),
];

/// Look up a key by name (case-insensitive).
///
/// Accepts canonical names (`"F1"`, `"LEFT_CTRL"`), bare digits (`"1"`) and
/// a handful of aliases (`"Escape"`, `"Return"`, ...).
pub fn key_from_name(name: &str) -> Option<Key> {
    let upper = name.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }

    let canonical = if upper.len() == 1 && upper.as_bytes()[0].is_ascii_digit() {
        format!("KEY_{}", upper)
    } else {
        KEY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map(|(_, target)| target.to_string())
            .unwrap_or(upper)
    };

    KEY_NAMES
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, key)| *key)
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "KEY_{:#04x}", self.0),
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        key_from_name(s).ok_or_else(|| format!("Unknown key: {}", s))
    }
}
