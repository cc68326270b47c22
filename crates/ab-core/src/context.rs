//! Contexto persistido de una instancia de proceso.
//!
//! El contexto es un blob JSON con tres claves reservadas (`input`,
//! `startTaskID`, `taskState`) y variables libres del proceso al mismo
//! nivel. Es la única fuente de verdad de una instancia: todo lo necesario
//! para reanudarla vive aquí.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{KEY_INPUT, RESERVED_KEYS};
use crate::errors::ProcessError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Waiting,
    Completed,
    Error,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
                        Self::Waiting => "waiting",
                        Self::Completed => "completed",
                        Self::Error => "error",
                    })
    }
}

/// Estado de una tarea dentro del contexto.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub status: TaskStatus,
    /// Mensaje del último fallo (sólo con `status = error`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskState {
    pub fn waiting() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
    }

    pub fn flag(&self, key: &str) -> bool {
        self.extra.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Aplica `overrides` encima del estado: las claves del override ganan,
    /// incluidas `status` y `error`.
    pub fn merged(mut self, overrides: Option<&Map<String, Value>>) -> Result<Self, ProcessError> {
        let Some(overrides) = overrides else {
            return Ok(self);
        };
        for (k, v) in overrides {
            match k.as_str() {
                "status" => {
                    self.status = serde_json::from_value(v.clone())
                        .map_err(|e| ProcessError::InvalidContext(format!("task status: {e}")))?;
                }
                "error" => self.error = v.as_str().map(str::to_string),
                _ => {
                    self.extra.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessContext {
    #[serde(default)]
    pub input: Value,
    #[serde(rename = "startTaskID", default, skip_serializing_if = "Option::is_none")]
    pub start_task_id: Option<String>,
    #[serde(rename = "taskState", default)]
    pub task_state: BTreeMap<String, TaskState>,
    #[serde(flatten)]
    vars: Map<String, Value>,
}

impl ProcessContext {
    pub fn new(input: Value) -> Self {
        Self { input,
               ..Self::default() }
    }

    /// Valida y construye un contexto desde el blob persistido.
    pub fn from_value(value: Value) -> Result<Self, ProcessError> {
        if !value.is_object() {
            return Err(ProcessError::InvalidContext("context must be a JSON object".into()));
        }
        serde_json::from_value(value).map_err(|e| ProcessError::InvalidContext(e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value, ProcessError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn is_reserved(key: &str) -> bool {
        RESERVED_KEYS.contains(&key)
    }

    pub fn var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn vars(&self) -> &Map<String, Value> {
        &self.vars
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: Value) -> Result<(), ProcessError> {
        let key = key.into();
        if Self::is_reserved(&key) {
            return Err(ProcessError::ReservedKey(key));
        }
        self.vars.insert(key, value);
        Ok(())
    }

    pub fn state(&self, task_id: &str) -> Option<&TaskState> {
        self.task_state.get(task_id)
    }

    /// Estado de la tarea; las tareas sin estado cuentan como `waiting`.
    pub fn status_of(&self, task_id: &str) -> TaskStatus {
        self.task_state.get(task_id).map(|s| s.status).unwrap_or_default()
    }

    /// Resuelve una ruta con puntos: primero en variables, después en
    /// `input`. `input.x` fuerza la búsqueda en `input`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let head = parts.next()?;
        let root = if head == KEY_INPUT {
            Some(&self.input)
        } else {
            self.vars.get(head).or_else(|| self.input.get(head))
        }?;
        parts.try_fold(root, |v, p| match v {
                 Value::Object(m) => m.get(p),
                 Value::Array(a) => p.parse::<usize>().ok().and_then(|i| a.get(i)),
                 _ => None,
             })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn persisted_shape_uses_reserved_keys() {
        let mut ctx = ProcessContext::new(json!({"amount": 10}));
        ctx.start_task_id = Some("Trigger_1".into());
        ctx.task_state.insert("Task_A".into(), TaskState::waiting());
        ctx.set_var("approved", json!(true)).unwrap();
        let v = ctx.to_value().unwrap();
        assert_eq!(v["startTaskID"], json!("Trigger_1"));
        assert_eq!(v["taskState"]["Task_A"]["status"], json!("waiting"));
        assert_eq!(v["approved"], json!(true));
        assert_eq!(ProcessContext::from_value(v).unwrap(), ctx);
    }

    #[test]
    fn set_var_rejects_reserved_keys() {
        let mut ctx = ProcessContext::default();
        for key in RESERVED_KEYS {
            assert!(matches!(ctx.set_var(key, json!(1)), Err(ProcessError::ReservedKey(_))));
        }
    }

    #[test]
    fn from_value_rejects_malformed_blobs() {
        assert!(ProcessContext::from_value(json!([1, 2])).is_err());
        assert!(ProcessContext::from_value(json!({"startTaskID": 5})).is_err());
        assert!(ProcessContext::from_value(json!({"taskState": {"A": {"status": "running"}}})).is_err());
        assert!(ProcessContext::from_value(json!({"taskState": {"A": {"status": "error", "error": "boom"}}})).is_ok());
    }

    #[test]
    fn overrides_win_over_defaults() {
        let mut base = TaskState::waiting();
        base.set("retries", json!(0));
        let over = json!({"retries": 2, "status": "completed"});
        let merged = base.merged(over.as_object()).unwrap();
        assert_eq!(merged.status, TaskStatus::Completed);
        assert_eq!(merged.get("retries"), Some(&json!(2)));
    }

    #[test]
    fn lookup_prefers_vars_then_input() {
        let mut ctx = ProcessContext::new(json!({"customer": {"name": "Ada"}, "total": 3}));
        ctx.set_var("total", json!(5)).unwrap();
        assert_eq!(ctx.lookup("total"), Some(&json!(5)));
        assert_eq!(ctx.lookup("input.total"), Some(&json!(3)));
        assert_eq!(ctx.lookup("customer.name"), Some(&json!("Ada")));
        assert_eq!(ctx.lookup("missing"), None);
    }
}
