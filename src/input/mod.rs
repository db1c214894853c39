//! Tap input.
//!
//! The controller consumes a single kind of user event, the tap.  Two sources
//! feed it over a `tokio::sync::mpsc` channel:
//!
//! * [`KeyListener`]: a global key captured with `rdev` on a dedicated OS
//!   thread; the key's release is the "tap ended" event.
//! * [`forward_stdin_taps`]: Enter on standard input; `q` quits.
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use out_loud::input::{parse_key, KeyListener};
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! let key = parse_key("Space").expect("unknown key");
//! let _listener = KeyListener::start(key, tx);
//! ```

pub mod keyboard;
pub mod stdin;

pub use keyboard::KeyListener;
pub use stdin::forward_stdin_taps;

/// Events delivered to the state controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapEvent {
    /// The user tapped (key released, Enter pressed).
    Tap,
    /// The user asked to quit.
    Quit,
}

/// Parse a tap key name from a config string into an [`rdev::Key`].
///
/// Supports F1–F12, a few named keys and single ASCII letters
/// (case-insensitive).  Returns `None` for anything else.
///
/// ```
/// use out_loud::input::parse_key;
///
/// assert_eq!(parse_key("Space"), Some(rdev::Key::Space));
/// assert_eq!(parse_key("f9"), Some(rdev::Key::F9));
/// assert_eq!(parse_key("t"), Some(rdev::Key::KeyT));
/// assert_eq!(parse_key("Ctrl+T"), None);
/// ```
pub fn parse_key(name: &str) -> Option<rdev::Key> {
    use rdev::Key;

    const FUNCTION_KEYS: [Key; 12] = [
        Key::F1,
        Key::F2,
        Key::F3,
        Key::F4,
        Key::F5,
        Key::F6,
        Key::F7,
        Key::F8,
        Key::F9,
        Key::F10,
        Key::F11,
        Key::F12,
    ];
    const LETTER_KEYS: [Key; 26] = [
        Key::KeyA,
        Key::KeyB,
        Key::KeyC,
        Key::KeyD,
        Key::KeyE,
        Key::KeyF,
        Key::KeyG,
        Key::KeyH,
        Key::KeyI,
        Key::KeyJ,
        Key::KeyK,
        Key::KeyL,
        Key::KeyM,
        Key::KeyN,
        Key::KeyO,
        Key::KeyP,
        Key::KeyQ,
        Key::KeyR,
        Key::KeyS,
        Key::KeyT,
        Key::KeyU,
        Key::KeyV,
        Key::KeyW,
        Key::KeyX,
        Key::KeyY,
        Key::KeyZ,
    ];

    let name = name.trim();
    match name.to_ascii_lowercase().as_str() {
        "space" => return Some(Key::Space),
        "return" | "enter" => return Some(Key::Return),
        "escape" | "esc" => return Some(Key::Escape),
        "tab" => return Some(Key::Tab),
        _ => {}
    }

    if let Some(n) = name
        .strip_prefix(['F', 'f'])
        .and_then(|n| n.parse::<usize>().ok())
    {
        return FUNCTION_KEYS.get(n.checked_sub(1)?).cloned();
    }

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            let offset = (c.to_ascii_uppercase() as u8 - b'A') as usize;
            LETTER_KEYS.get(offset).cloned()
        }
        _ => None,
    }
}
