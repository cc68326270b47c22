//! Parser mínimo de `<comando> --flag valor ...`.

use std::collections::HashMap;

use crate::error::CliError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub command: String,
    flags: HashMap<String, String>,
    switches: Vec<String>,
}

impl ParsedArgs {
    /// `args` sin el nombre del binario. Un `--flag` seguido de otro
    /// `--flag` (o al final) es un interruptor sin valor.
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let Some((command, rest)) = args.split_first() else {
            return Err(CliError::Usage("falta el comando".into()));
        };
        let mut parsed = Self { command: command.clone(),
                                ..Self::default() };
        let mut i = 0;
        while i < rest.len() {
            let Some(name) = rest[i].strip_prefix("--") else {
                return Err(CliError::Usage(format!("argumento inesperado `{}`", rest[i])));
            };
            match rest.get(i + 1) {
                Some(value) if !value.starts_with("--") => {
                    parsed.flags.insert(name.to_string(), value.clone());
                    i += 2;
                }
                _ => {
                    parsed.switches.push(name.to_string());
                    i += 1;
                }
            }
        }
        Ok(parsed)
    }

    pub fn optional(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    pub fn required(&self, name: &str) -> Result<&str, CliError> {
        self.optional(name)
            .ok_or_else(|| CliError::Usage(format!("{} requiere --{name}", self.command)))
    }

    pub fn switch(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s == name)
    }

    /// Valores separados por coma; vacío si el flag no está.
    pub fn list(&self, name: &str) -> Vec<String> {
        self.optional(name)
            .map(|v| {
                v.split(',')
                 .map(str::trim)
                 .filter(|s| !s.is_empty())
                 .map(str::to_string)
                 .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_flags_switches_and_lists() {
        let p = ParsedArgs::parse(&args(&["inbox", "--process", "a.json,b.json", "--dry-run", "--roles", "ops, qa"])).unwrap();
        assert_eq!(p.command, "inbox");
        assert_eq!(p.list("process"), vec!["a.json", "b.json"]);
        assert_eq!(p.list("roles"), vec!["ops", "qa"]);
        assert!(p.switch("dry-run"));
        assert!(p.list("users").is_empty());
    }

    #[test]
    fn reports_usage_errors() {
        assert!(matches!(ParsedArgs::parse(&[]), Err(CliError::Usage(_))));
        assert!(matches!(ParsedArgs::parse(&args(&["trigger", "stray"])), Err(CliError::Usage(_))));
        let p = ParsedArgs::parse(&args(&["trigger"])).unwrap();
        assert!(matches!(p.required("key"), Err(CliError::Usage(m)) if m.contains("--key")));
    }
}
