//! Presentation settings.
//!
//! Nothing functional rides on these: they shape the prompt and the
//! boot greeting, and hosts may override them with a small
//! `key = value` overlay at build time.

use tracing::warn;

/// Environment presentation settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prompt template; `{user}` and `{cwd}` are substituted.
    pub prompt_format: String,
    /// Greeting shown when the environment boots.
    pub motd_text: String,
    pub motd_enabled: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            prompt_format: "{user}@terrarium:{cwd}$ ".to_string(),
            motd_text: "welcome to terrarium".to_string(),
            motd_enabled: true,
        }
    }
}

impl Config {
    /// Apply overlay lines of the form `dotted.key = value`. Blank
    /// lines and `#` comments are skipped. Unknown keys and malformed
    /// lines are returned as warnings and otherwise ignored.
    pub fn apply_overlay(&mut self, text: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warnings.push(format!(
                    "line {}: expected key = value, got '{line}'",
                    index + 1
                ));
                continue;
            };
            let key = key.trim();
            // Only leading whitespace is dropped: prompt formats
            // legitimately end in a space.
            let value = value.trim_start();
            match key {
                "prompt.format" => self.prompt_format = value.to_string(),
                "motd.text" => self.motd_text = value.to_string(),
                "motd.enabled" => match value.trim_end().parse::<bool>() {
                    Ok(flag) => self.motd_enabled = flag,
                    Err(_) => warnings.push(format!(
                        "line {}: motd.enabled takes true or false, got '{value}'",
                        index + 1
                    )),
                },
                _ => warnings.push(format!("line {}: unknown key '{key}'", index + 1)),
            }
        }
        for warning in &warnings {
            warn!("config overlay: {warning}");
        }
        warnings
    }

    /// Render the prompt for a user and working directory.
    pub fn prompt(&self, user: &str, cwd: &str) -> String {
        self.prompt_format
            .replace("{user}", user)
            .replace("{cwd}", cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_sets_known_keys() {
        let mut config = Config::default();
        let warnings = config.apply_overlay(
            "# comment\n\
             prompt.format = {user}> \n\
             motd.enabled = false\n",
        );
        assert!(warnings.is_empty());
        assert_eq!(config.prompt("guest", "/"), "guest> ");
        assert!(!config.motd_enabled);
    }

    #[test]
    fn overlay_reports_unknown_and_malformed_lines() {
        let mut config = Config::default();
        let warnings = config.apply_overlay("colors.scheme = dark\nnot a pair\n");
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("unknown key 'colors.scheme'"));
        assert!(warnings[1].contains("line 2"));
        // untouched settings keep their defaults
        assert_eq!(config.motd_text, Config::default().motd_text);
    }

    #[test]
    fn prompt_substitutes_both_placeholders() {
        let config = Config::default();
        assert_eq!(
            config.prompt("root", "/tmp"),
            "root@terrarium:/tmp$ "
        );
    }
}
