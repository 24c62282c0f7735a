//! `am` command lines for intents and instrumentation

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::bridge::Intent;

lazy_static! {
    static ref RESULT_LINE: Regex = Regex::new(r"^INSTRUMENTATION_RESULT: ([^=]+)=(.*)$").unwrap();
    static ref CODE_LINE: Regex = Regex::new(r"^INSTRUMENTATION_CODE: (-?\d+)").unwrap();
}

/// Quote one word for the device shell
pub fn shell_quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c))
    {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

fn extra_args(key: &str, value: &Value) -> Vec<String> {
    let (flag, text) = match value {
        Value::Null => return vec!["--esn".to_string(), key.to_string()],
        Value::Bool(b) => ("--ez", b.to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => ("--ei", i.to_string()),
            Some(i) => ("--el", i.to_string()),
            None => ("--ef", n.to_string()),
        },
        Value::String(s) => ("--es", s.clone()),
        other => ("--es", other.to_string()),
    };
    vec![flag.to_string(), key.to_string(), text]
}

/// Arguments following `am start` / `am broadcast`
pub fn intent_args(intent: &Intent) -> Vec<String> {
    let mut args = Vec::new();

    let options = [
        ("-a", &intent.action),
        ("-d", &intent.data),
        ("-t", &intent.mime_type),
        ("-n", &intent.component),
    ];
    for (flag, value) in options {
        if let Some(value) = value {
            args.push(flag.to_string());
            args.push(value.clone());
        }
    }

    for category in &intent.categories {
        args.push("-c".to_string());
        args.push(category.clone());
    }

    for (key, value) in &intent.extras {
        args.extend(extra_args(key, value));
    }

    if intent.flags != 0 {
        args.push("-f".to_string());
        args.push(intent.flags.to_string());
    }

    if let Some(uri) = &intent.uri {
        args.push(uri.clone());
    }

    args
}

/// Full shell command line for an `am` subcommand applied to `intent`
pub fn am_command(subcommand: &str, intent: &Intent) -> String {
    let mut words = vec!["am".to_string(), subcommand.to_string()];
    words.extend(intent_args(intent).iter().map(|a| shell_quote(a)));
    words.join(" ")
}

/// Shell command line running `class_name` under `am instrument`
pub fn instrument_command(class_name: &str, args: &HashMap<String, Value>) -> String {
    let mut words = vec!["am", "instrument", "-w", "-r"]
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut keys: Vec<&String> = args.keys().collect();
    keys.sort();
    for key in keys {
        let value = match &args[key] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        words.push("-e".to_string());
        words.push(shell_quote(key));
        words.push(shell_quote(&value));
    }

    words.push(shell_quote(class_name));
    words.join(" ")
}

/// Collect `INSTRUMENTATION_RESULT` entries; continuation lines belong to
/// the preceding key. The exit code lands under `code`.
pub fn parse_instrumentation(output: &str) -> HashMap<String, Value> {
    let mut result: HashMap<String, String> = HashMap::new();
    let mut code = None;
    let mut current: Option<String> = None;

    for line in output.lines() {
        if let Some(caps) = RESULT_LINE.captures(line) {
            let key = caps[1].to_string();
            result.insert(key.clone(), caps[2].to_string());
            current = Some(key);
        } else if let Some(caps) = CODE_LINE.captures(line) {
            code = caps[1].parse::<i64>().ok();
            current = None;
        } else if line.starts_with("INSTRUMENTATION_") {
            current = None;
        } else if let Some(key) = &current {
            if let Some(value) = result.get_mut(key) {
                value.push('\n');
                value.push_str(line);
            }
        }
    }

    let mut map: HashMap<String, Value> = result
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    if let Some(code) = code {
        map.insert("code".to_string(), Value::from(code));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_args_order() {
        let intent = Intent::new()
            .with_uri("content://contacts/people/1")
            .with_action("android.intent.action.VIEW")
            .with_mime_type("text/plain")
            .with_category("android.intent.category.DEFAULT")
            .with_component("com.example/.Main")
            .with_flags(268435456);

        assert_eq!(
            intent_args(&intent),
            vec![
                "-a",
                "android.intent.action.VIEW",
                "-t",
                "text/plain",
                "-n",
                "com.example/.Main",
                "-c",
                "android.intent.category.DEFAULT",
                "-f",
                "268435456",
                "content://contacts/people/1",
            ]
        );
    }

    #[test]
    fn test_typed_extras() {
        let intent = Intent::new()
            .with_extra("name", "bob smith")
            .with_extra("count", 3)
            .with_extra("big", 5_000_000_000i64)
            .with_extra("ratio", 0.5)
            .with_extra("on", true)
            .with_extra("none", Value::Null);

        let args = intent_args(&intent);
        let joined = args.join(" ");
        assert!(joined.contains("--es name bob smith"));
        assert!(joined.contains("--ei count 3"));
        assert!(joined.contains("--el big 5000000000"));
        assert!(joined.contains("--ef ratio 0.5"));
        assert!(joined.contains("--ez on true"));
        assert!(joined.contains("--esn none"));
    }

    #[test]
    fn test_am_command_quotes() {
        let intent = Intent::new()
            .with_action("com.example.SAY")
            .with_extra("msg", "it's here");
        assert_eq!(
            am_command("broadcast", &intent),
            r"am broadcast -a com.example.SAY --es msg 'it'\''s here'"
        );
    }

    #[test]
    fn test_instrument_command() {
        let mut args = HashMap::new();
        args.insert("size".to_string(), json!("small"));
        args.insert("debug".to_string(), json!(false));
        assert_eq!(
            instrument_command("com.example.test/androidx.test.runner.AndroidJUnitRunner", &args),
            "am instrument -w -r -e debug false -e size small com.example.test/androidx.test.runner.AndroidJUnitRunner"
        );
    }

    #[test]
    fn test_parse_instrumentation() {
        let output = "INSTRUMENTATION_STATUS: id=AndroidJUnitRunner\n\
            INSTRUMENTATION_RESULT: stream=\n\
            Time: 0.42\n\
            \n\
            OK (3 tests)\n\
            INSTRUMENTATION_RESULT: shortMsg=done\n\
            INSTRUMENTATION_CODE: -1\n";

        let result = parse_instrumentation(output);
        assert_eq!(result["stream"], json!("\nTime: 0.42\n\nOK (3 tests)"));
        assert_eq!(result["shortMsg"], json!("done"));
        assert_eq!(result["code"], json!(-1));
        assert!(!result.contains_key("id"));
    }
}
