use anyhow::{anyhow, bail, Result};

use crate::chat::ModelFilter;
use crate::config::Config;
use crate::series::{Mode, Range};

/// Operator input read line by line from stdin while the daemon runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Range(Range),
    Mode(Mode),
    Toggle(String),
    Resize(u32),
    Filter(ModelFilter),
    /// Swap a card between its translation and the original text.
    Translate(String),
    /// Dump the raw account-totals response.
    Totals,
    Frame,
    Quit,
}

impl Command {
    pub fn parse(line: &str, cfg: &Config) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| anyhow!("empty command"))?;
        let arg = parts.next();
        let cmd = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("range", Some(a)) => {
                if a.eq_ignore_ascii_case("window") {
                    Command::Range(Range::trailing_hours(cfg.window_hours))
                } else {
                    Command::Range(Range::parse(a).ok_or_else(|| anyhow!("unknown range {}", a))?)
                }
            }
            ("mode", Some(a)) => Command::Mode(Mode::parse(a).ok_or_else(|| anyhow!("unknown mode {}", a))?),
            ("toggle", Some(a)) => Command::Toggle(a.to_string()),
            ("resize", Some(a)) => Command::Resize(a.parse().map_err(|_| anyhow!("bad width {}", a))?),
            ("filter", Some(a)) => Command::Filter(ModelFilter::parse(a)),
            ("translate", Some(a)) | ("original", Some(a)) => Command::Translate(a.to_string()),
            ("totals", None) => Command::Totals,
            ("frame", None) => Command::Frame,
            ("quit", None) | ("exit", None) => Command::Quit,
            (v, _) => bail!("unrecognized command: {}", v),
        };
        if parts.next().is_some() {
            bail!("too many arguments: {}", line.trim());
        }
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        let mut c = Config::from_env();
        c.window_hours = 12;
        c
    }

    #[test]
    fn test_parse_view_commands() {
        let c = cfg();
        assert_eq!(Command::parse("range 72H", &c).unwrap(), Command::Range(Range::trailing_hours(72)));
        assert_eq!(Command::parse("range window", &c).unwrap(), Command::Range(Range::trailing_hours(12)));
        assert_eq!(Command::parse("range all", &c).unwrap(), Command::Range(Range::All));
        assert_eq!(Command::parse("mode %", &c).unwrap(), Command::Mode(Mode::Percent));
        assert_eq!(Command::parse("  toggle gpt-5 ", &c).unwrap(), Command::Toggle("gpt-5".to_string()));
        assert_eq!(Command::parse("resize 375", &c).unwrap(), Command::Resize(375));
    }

    #[test]
    fn test_parse_chat_commands() {
        let c = cfg();
        assert_eq!(Command::parse("filter ALL", &c).unwrap(), Command::Filter(ModelFilter::All));
        assert_eq!(
            Command::parse("original qwen:1700000000", &c).unwrap(),
            Command::Translate("qwen:1700000000".to_string())
        );
        assert_eq!(Command::parse("quit", &c).unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let c = cfg();
        assert!(Command::parse("", &c).is_err());
        assert!(Command::parse("range", &c).is_err());
        assert!(Command::parse("range 5D", &c).is_err());
        assert!(Command::parse("range 9999999999999999H", &c).is_err());
        assert!(Command::parse("resize wide", &c).is_err());
        assert!(Command::parse("quit now", &c).is_err());
        assert!(Command::parse("dance", &c).is_err());
    }
}
