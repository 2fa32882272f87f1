use serde::Serialize;
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
}

impl OutputOptions {
    pub fn to_json<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}

pub fn detect_color(color_flag: bool) -> bool {
    if !color_flag {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stdout().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_color_respects_flag() {
        assert!(!detect_color(false));
    }

    #[test]
    fn to_json_compact_and_pretty() {
        let mut opts = OutputOptions {
            format: OutputFormat::Json,
            pretty: false,
            use_color: false,
        };
        let value = serde_json::json!({ "cost": 1.5 });
        assert_eq!(opts.to_json(&value).unwrap(), r#"{"cost":1.5}"#);
        opts.pretty = true;
        assert!(opts.to_json(&value).unwrap().contains('\n'));
    }
}
