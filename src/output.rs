use serde::Serialize;

pub trait OutputFormatter {
    fn format_text(&self) -> String;
    fn format_json(&self, pretty: bool) -> crate::Result<String>;
}

pub fn print_output<T: OutputFormatter>(
    data: &T,
    as_json: bool,
    json_pretty: bool,
) -> crate::Result<()> {
    let output = if as_json {
        data.format_json(json_pretty)?
    } else {
        data.format_text()
    };

    println!("{}", output);
    Ok(())
}

pub fn to_json<T: Serialize>(data: &T, pretty: bool) -> crate::Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(data)?)
    } else {
        Ok(serde_json::to_string(data)?)
    }
}

pub mod text {
    use colored::Colorize;

    pub fn success(msg: &str) -> String {
        format!("{} {}", "✓".green().bold(), msg)
    }

    pub fn error(msg: &str) -> String {
        format!("{} {}", "✗".red().bold(), msg)
    }

    pub fn warning(msg: &str) -> String {
        format!("{} {}", "⚠".yellow().bold(), msg)
    }

    pub fn bullet(msg: &str) -> String {
        format!("  • {}", msg)
    }

    pub fn section(title: &str) -> String {
        format!("\n{}\n{}", title.bold(), "─".repeat(title.len()))
    }

    pub fn key_value(key: &str, value: &str) -> String {
        format!("  {}: {}", key.bold(), value)
    }
}
