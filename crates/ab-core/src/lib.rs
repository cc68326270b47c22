//! ab-core: motor de procesos.
//!
//! - `definition`: grafo de elementos (Trigger, End, Email, ServiceQuery,
//!   UserTask, Gateway, Generic) compilado desde el diagrama.
//! - `context`: blob JSON persistido con claves reservadas validadas.
//! - `tasks`: trait `ProcessTask` y sus variantes.
//! - `runtime`: máquina de estados por tarea, suspensión y reanudación.
//! - `store`: persistencia de instancias (`InstanceStore`) con paridad en
//!   memoria.

pub mod constants;
pub mod context;
pub mod definition;
pub mod errors;
pub mod hashing;
pub mod instance;
pub mod runtime;
pub mod store;
pub mod tasks;

pub use context::{ProcessContext, TaskState, TaskStatus};
pub use definition::{ElementKind, Participant, ProcessDefinition, ProcessElement, SequenceFlow};
pub use errors::{ProcessError, ServiceError};
pub use instance::{InstanceStatus, LogEntry, ProcessInstance};
pub use runtime::{InboxItem, ProcessRuntime};
pub use store::{InMemoryInstanceStore, InstanceStore};
pub use tasks::{EmailMessage, EmailTask, EndTask, GatewayTask, GenericTask, LogMailer, Mailer, ProcessTask, QueryRunner,
                ServiceQueryTask, TaskRun, TaskServices, TriggerTask, UserTask};
