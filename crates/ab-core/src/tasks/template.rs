//! Plantillas `{{var}}` resueltas contra el contexto de la instancia.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::context::ProcessContext;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("valid placeholder regex"));

fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Sustituye cada `{{ruta}}`; las rutas desconocidas quedan vacías.
pub fn render(template: &str, context: &ProcessContext) -> String {
    PLACEHOLDER.replace_all(template, |caps: &Captures| context.lookup(&caps[1]).map(as_text).unwrap_or_default())
               .into_owned()
}

/// Renderiza recursivamente los strings de un valor JSON. Un string que es
/// exactamente un placeholder se reemplaza por el valor con su tipo.
pub fn render_value(value: &Value, context: &ProcessContext) -> Value {
    match value {
        Value::String(s) => match PLACEHOLDER.captures(s) {
            Some(caps) if caps[0].len() == s.len() => context.lookup(&caps[1]).cloned().unwrap_or(Value::Null),
            _ => Value::String(render(s, context)),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, context)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), render_value(v, context))).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_vars_and_input_paths() {
        let mut ctx = ProcessContext::new(json!({"customer": {"name": "Ada"}}));
        ctx.set_var("total", json!(42)).unwrap();
        assert_eq!(render("Hi {{customer.name}}, total {{ total }}{{nope}}", &ctx), "Hi Ada, total 42");
    }

    #[test]
    fn whole_placeholder_keeps_type() {
        let mut ctx = ProcessContext::default();
        ctx.set_var("limit", json!(5)).unwrap();
        let q = json!({"limit": "{{limit}}", "label": "max {{limit}}"});
        assert_eq!(render_value(&q, &ctx), json!({"limit": 5, "label": "max 5"}));
    }
}
