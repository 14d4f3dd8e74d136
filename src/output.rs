use std::str::FromStr;
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("MESHAUDIT_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

impl FromStr for OutputMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputMode::Human),
            "json" => Ok(OutputMode::Json),
            _ => Err(crate::Error::Config(format!("Unknown output format: {}", s))),
        }
    }
}

/// JSON envelope for machine-readable command output
pub fn success_envelope(command: &str, data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    })
}

pub fn error_envelope(command: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "command": command,
        "error": message,
    })
}

pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&success_envelope(command, data))?),
        OutputMode::Human => {
            if !is_quiet() {
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
        }
    }
    Ok(())
}
