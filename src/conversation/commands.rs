/// Text commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Confirm,
    Cancel,
    Edit,
    /// A "change ..." / "add ..." request. Accepted but not applied to the
    /// pending event yet.
    PendingEdit(String),
    Help,
}

impl Command {
    /// Classify a text message; matching is trimmed and case-insensitive
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_lowercase();

        match normalized.as_str() {
            "confirm" | "✅ confirm" => Command::Confirm,
            "cancel" | "❌ cancel" => Command::Cancel,
            "edit" | "✏️ edit" => Command::Edit,
            t if t.starts_with("change") || t.starts_with("add") => {
                Command::PendingEdit(text.trim().to_string())
            }
            _ => Command::Help,
        }
    }
}
