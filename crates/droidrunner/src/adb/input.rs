//! Argument building for `adb shell input`

use crate::bridge::PressType;

/// Normalize a key name to an Android key code name.
///
/// `MENU`, `menu` and `KEYCODE_MENU` all become `KEYCODE_MENU`; numeric
/// key codes pass through untouched.
pub fn key_code(key: &str) -> String {
    let key = key.trim();
    if key.chars().all(|c| c.is_ascii_digit()) || key.starts_with("KEYCODE_") {
        key.to_string()
    } else {
        format!("KEYCODE_{}", key.to_uppercase())
    }
}

/// Escape text for `input text`, which splits on spaces and runs through
/// the device shell
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' => escaped.push_str("%s"),
            '(' | ')' | '<' | '>' | '|' | ';' | '&' | '*' | '\\' | '~' | '"' | '\'' | '`'
            | '$' | '?' | '[' | ']' | '{' | '}' | '#' | '!' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `input` arguments for a touch at (x, y)
pub fn touch_args(x: i32, y: i32, kind: PressType) -> Vec<String> {
    let (x, y) = (x.to_string(), y.to_string());
    match kind {
        PressType::DownAndUp => vec!["tap".to_string(), x, y],
        PressType::Down => vec!["motionevent".to_string(), "DOWN".to_string(), x, y],
        PressType::Up => vec!["motionevent".to_string(), "UP".to_string(), x, y],
    }
}

/// `input` arguments for a key press, or `None` when nothing needs sending.
///
/// `input keyevent --longpress` releases the key itself, so an `Up` after a
/// `Down` has nothing left to do.
pub fn key_args(key: &str, kind: PressType) -> Option<Vec<String>> {
    let code = key_code(key);
    match kind {
        PressType::DownAndUp => Some(vec!["keyevent".to_string(), code]),
        PressType::Down => Some(vec![
            "keyevent".to_string(),
            "--longpress".to_string(),
            code,
        ]),
        PressType::Up => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_code() {
        assert_eq!(key_code("menu"), "KEYCODE_MENU");
        assert_eq!(key_code("KEYCODE_HOME"), "KEYCODE_HOME");
        assert_eq!(key_code("66"), "66");
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("hello world"), "hello%sworld");
        assert_eq!(escape_text("a&b;c"), "a\\&b\\;c");
        assert_eq!(escape_text("it's $5"), "it\\'s%s\\$5");
        assert_eq!(escape_text("plain"), "plain");
    }

    #[test]
    fn test_touch_args() {
        assert_eq!(touch_args(10, 20, PressType::DownAndUp), vec!["tap", "10", "20"]);
        assert_eq!(
            touch_args(1, 2, PressType::Up),
            vec!["motionevent", "UP", "1", "2"]
        );
    }

    #[test]
    fn test_key_args() {
        assert_eq!(
            key_args("back", PressType::Down).unwrap(),
            vec!["keyevent", "--longpress", "KEYCODE_BACK"]
        );
        assert!(key_args("back", PressType::Up).is_none());
    }
}
