//! Constantes del motor de procesos.

/// Clave reservada: datos con los que se disparó el proceso.
pub const KEY_INPUT: &str = "input";
/// Clave reservada: id de diagrama del Trigger que creó la instancia.
pub const KEY_START_TASK_ID: &str = "startTaskID";
/// Clave reservada: estado por tarea (`diagramId -> TaskState`).
pub const KEY_TASK_STATE: &str = "taskState";

pub const RESERVED_KEYS: [&str; 3] = [KEY_INPUT, KEY_START_TASK_ID, KEY_TASK_STATE];

/// Máximo de ejecuciones de `do_task` por llamada a `run`.
pub const DEFAULT_MAX_TASK_STEPS: usize = 1000;

/// Versión lógica del motor. Forma parte del hash de definición para que un
/// cambio incompatible del motor se detecte al reanudar instancias.
pub const ENGINE_VERSION: &str = "AB1.0";
