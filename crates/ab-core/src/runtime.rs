//! Runtime de procesos: máquina de estados `waiting -> completed | error`
//! por tarea, con el contexto persistido después de cada transición.
//!
//! Una tarea es ejecutable cuando no está completada ni en error, tiene
//! flujos entrantes y todos sus predecesores lógicos están completados (los
//! Triggers que no iniciaron la instancia no cuentan como predecesores).
//! Dentro de una instancia se ejecuta una tarea a la vez; instancias
//! distintas pueden correr en paralelo.

use log::{debug, error, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::constants::DEFAULT_MAX_TASK_STEPS;
use crate::context::{ProcessContext, TaskState, TaskStatus};
use crate::definition::{ElementKind, ProcessDefinition, ProcessElement};
use crate::errors::ProcessError;
use crate::instance::{InstanceStatus, ProcessInstance};
use crate::store::InstanceStore;
use crate::tasks::{ProcessTask, TaskRun, TaskServices};

/// Tarea humana pendiente, tal como la ve el inbox.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxItem {
    pub instance_id: Uuid,
    pub process_id: Uuid,
    pub process_name: String,
    pub task_id: String,
    pub task_name: String,
    pub instructions: String,
    pub requested_at: Option<String>,
}

pub struct ProcessRuntime<S>
    where S: InstanceStore
{
    store: S,
    services: TaskServices,
    max_steps: usize,
}

impl<S> ProcessRuntime<S> where S: InstanceStore
{
    pub fn new(store: S, services: TaskServices) -> Self {
        Self { store,
               services,
               max_steps: DEFAULT_MAX_TASK_STEPS }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Dispara el Trigger ligado a `key` con `data` y ejecuta la instancia
    /// nueva hasta que se complete, se suspenda o falle una tarea.
    pub async fn trigger(&self, def: &ProcessDefinition, key: &str, data: Value) -> Result<ProcessInstance, ProcessError> {
        def.validate()?;
        let element = def.task_for_trigger_key(key)
                         .ok_or_else(|| ProcessError::NoTriggerForKey(key.to_string()))?;
        let ElementKind::Trigger(task) = &element.kind else {
            return Err(ProcessError::NoTriggerForKey(key.to_string()));
        };
        let context = task.trigger(&element.id, data)?;
        self.instance_new(def, context).await
    }

    /// Crea, persiste y ejecuta una instancia a partir de un contexto ya
    /// sembrado por un Trigger.
    pub async fn instance_new(&self,
                              def: &ProcessDefinition,
                              mut context: ProcessContext)
                              -> Result<ProcessInstance, ProcessError> {
        let start = context.start_task_id
                           .clone()
                           .ok_or_else(|| ProcessError::InvalidContext("missing startTaskID".into()))?;
        match def.element_for_diagram_id(&start) {
            Some(e) if e.is_trigger() => {}
            Some(_) => return Err(ProcessError::InvalidContext(format!("startTaskID `{start}` is not a trigger"))),
            None => return Err(ProcessError::UnknownElement(start)),
        }
        for element in def.elements(|e| e.is_task() && !e.is_trigger()) {
            if context.state(&element.id).is_none() {
                let task = Self::task_of(element)?;
                let state = task.init_state(&context, None)?;
                context.task_state.insert(element.id.clone(), state);
            }
        }

        let mut instance = ProcessInstance::new(def.id, def.definition_hash()?, context);
        instance.log(Some(&start), format!("instance of `{}` created", def.name));
        self.store.save(&instance).await?;
        self.run(def, instance).await
    }

    /// Avanza la instancia hasta que no quede ninguna tarea ejecutable.
    ///
    /// Los fallos de tarea quedan contenidos en la instancia (estado
    /// `error`); sólo los errores de persistencia o de definición se
    /// devuelven como `Err`.
    pub async fn run(&self, def: &ProcessDefinition, mut instance: ProcessInstance) -> Result<ProcessInstance, ProcessError> {
        instance.status = InstanceStatus::Running;
        let mut attempted: HashSet<String> = HashSet::new();
        let mut steps = 0usize;

        loop {
            let next = def.elements
                          .values()
                          .find(|e| !attempted.contains(&e.id) && Self::is_runnable(def, &instance.context, e));
            let Some(element) = next else {
                break;
            };
            attempted.insert(element.id.clone());
            steps += 1;
            if steps > self.max_steps {
                instance.status = InstanceStatus::Waiting;
                self.persist(&mut instance).await?;
                return Err(ProcessError::StepBudgetExceeded(self.max_steps));
            }

            let task = Self::task_of(element)?;
            let outcome = {
                let mut run = TaskRun::new(instance.id, element, &mut instance.context, &self.services);
                task.do_task(&mut run).await
            };
            match outcome {
                Ok(true) => {
                    let state = instance.context.task_state.entry(element.id.clone()).or_default();
                    state.status = TaskStatus::Completed;
                    state.error = None;
                    instance.log(Some(element.display_name()), "completed");
                    if element.is_end() {
                        instance.status = InstanceStatus::Completed;
                        instance.log(None, "reached end");
                        self.persist(&mut instance).await?;
                        return Ok(instance);
                    }
                    self.persist(&mut instance).await?;
                }
                Ok(false) => {
                    debug!("process instance={} task={} waiting", instance.id, element.id);
                    self.persist(&mut instance).await?;
                }
                Err(e) => {
                    let message = format!("{} : {}", element.display_name(), e);
                    error!("process instance={} {}", instance.id, message);
                    let state = instance.context.task_state.entry(element.id.clone()).or_default();
                    state.status = TaskStatus::Error;
                    state.error = Some(e.to_string());
                    instance.log(Some(element.display_name()), message);
                    instance.status = InstanceStatus::Error;
                    self.persist(&mut instance).await?;
                    return Ok(instance);
                }
            }
        }

        instance.status = InstanceStatus::Waiting;
        self.persist(&mut instance).await?;
        Ok(instance)
    }

    /// Reanuda una instancia persistida. Las instancias completadas o en
    /// error se devuelven sin ejecutar nada.
    pub async fn resume(&self, def: &ProcessDefinition, id: Uuid) -> Result<ProcessInstance, ProcessError> {
        let instance = self.load(def, id).await?;
        if instance.status.is_terminal() {
            debug!("process instance={} is {}; nothing to resume", id, instance.status);
            return Ok(instance);
        }
        self.run(def, instance).await
    }

    /// Entrega la respuesta humana a una UserTask en espera y reanuda.
    pub async fn respond(&self,
                         def: &ProcessDefinition,
                         id: Uuid,
                         task_id: &str,
                         response: Value)
                         -> Result<ProcessInstance, ProcessError> {
        let mut instance = self.load(def, id).await?;
        let element = def.element_for_diagram_id(task_id)
                         .ok_or_else(|| ProcessError::UnknownElement(task_id.to_string()))?;
        if element.as_user_task().is_none() {
            return Err(ProcessError::InvalidTaskState { task: task_id.to_string(),
                                                        status: element.kind.key().to_string(),
                                                        expected: "userTask".into() });
        }
        Self::expect_status(&instance.context, task_id, TaskStatus::Waiting)?;
        // Sólo se responde a lo que el inbox ya ha mostrado.
        if !instance.context.state(task_id).is_some_and(|s| s.flag("requested")) {
            return Err(ProcessError::InvalidTaskState { task: task_id.to_string(),
                                                        status: "not requested yet".into(),
                                                        expected: "a requested userTask".into() });
        }

        let mut overrides = Self::state_overrides(instance.context.state(task_id))?;
        overrides.insert("response".into(), response);
        let state = Self::task_of(element)?.init_state(&instance.context, Some(&overrides))?;
        instance.context.task_state.insert(task_id.to_string(), state);
        instance.log(Some(element.display_name()), "response received");
        self.persist(&mut instance).await?;
        if instance.status.is_terminal() {
            return Ok(instance);
        }
        self.run(def, instance).await
    }

    /// Reintento manual: devuelve una tarea en `error` a `waiting` y reanuda.
    pub async fn retry_task(&self, def: &ProcessDefinition, id: Uuid, task_id: &str) -> Result<ProcessInstance, ProcessError> {
        let mut instance = self.load(def, id).await?;
        let element = def.element_for_diagram_id(task_id)
                         .ok_or_else(|| ProcessError::UnknownElement(task_id.to_string()))?;
        Self::expect_status(&instance.context, task_id, TaskStatus::Error)?;

        let mut overrides = Self::state_overrides(instance.context.state(task_id))?;
        overrides.insert("status".into(), Value::String(TaskStatus::Waiting.to_string()));
        overrides.insert("error".into(), Value::Null);
        let state = Self::task_of(element)?.init_state(&instance.context, Some(&overrides))?;
        instance.context.task_state.insert(task_id.to_string(), state);
        instance.log(Some(element.display_name()), "retry requested");
        instance.status = InstanceStatus::Running;
        self.persist(&mut instance).await?;
        self.run(def, instance).await
    }

    /// Tareas humanas en espera visibles para `roles`/`users`.
    pub async fn inbox(&self,
                       defs: &[ProcessDefinition],
                       roles: &[String],
                       users: &[String])
                       -> Result<Vec<InboxItem>, ProcessError> {
        let mut items = Vec::new();
        for instance in self.store.list_by_status(InstanceStatus::Waiting).await? {
            let Some(def) = defs.iter().find(|d| d.id == instance.process_id) else {
                continue;
            };
            for element in def.elements(|e| e.as_user_task().is_some()) {
                let Some(task) = element.as_user_task() else {
                    continue;
                };
                let Some(state) = instance.context.state(&element.id) else {
                    continue;
                };
                if state.status != TaskStatus::Waiting || !state.flag("requested") || !task.visible_to(roles, users) {
                    continue;
                }
                items.push(InboxItem { instance_id: instance.id,
                                       process_id: def.id,
                                       process_name: def.name.clone(),
                                       task_id: element.id.clone(),
                                       task_name: element.display_name().to_string(),
                                       instructions: task.instructions.clone(),
                                       requested_at: state.get("requestedAt").and_then(Value::as_str).map(str::to_string) });
            }
        }
        Ok(items)
    }

    async fn load(&self, def: &ProcessDefinition, id: Uuid) -> Result<ProcessInstance, ProcessError> {
        let instance = self.store.load(id).await?.ok_or(ProcessError::UnknownInstance(id))?;
        if instance.process_id != def.id {
            return Err(ProcessError::Definition(format!("instance {id} belongs to process {}", instance.process_id)));
        }
        let hash = def.definition_hash()?;
        if hash != instance.definition_hash {
            warn!("process instance={} was created with definition {} but resumes with {}",
                  id, instance.definition_hash, hash);
        }
        Ok(instance)
    }

    async fn persist(&self, instance: &mut ProcessInstance) -> Result<(), ProcessError> {
        instance.touch();
        self.store.save(instance).await
    }

    fn task_of(element: &ProcessElement) -> Result<&dyn ProcessTask, ProcessError> {
        element.kind
               .as_task()
               .ok_or_else(|| ProcessError::Definition(format!("element `{}` is not a task", element.id)))
    }

    fn expect_status(context: &ProcessContext, task_id: &str, expected: TaskStatus) -> Result<(), ProcessError> {
        let status = context.status_of(task_id);
        if status != expected {
            return Err(ProcessError::InvalidTaskState { task: task_id.to_string(),
                                                        status: status.to_string(),
                                                        expected: expected.to_string() });
        }
        Ok(())
    }

    fn state_overrides(state: Option<&TaskState>) -> Result<Map<String, Value>, ProcessError> {
        match state {
            Some(s) => match serde_json::to_value(s)? {
                Value::Object(map) => Ok(map),
                _ => Ok(Map::new()),
            },
            None => Ok(Map::new()),
        }
    }

    fn is_runnable(def: &ProcessDefinition, context: &ProcessContext, element: &ProcessElement) -> bool {
        if !element.is_task() || element.is_trigger() || context.status_of(&element.id) != TaskStatus::Waiting {
            return false;
        }
        let start = context.start_task_id.as_deref();
        let mut predecessors = 0;
        for flow in def.connections_incoming(&element.id) {
            let Some(source) = def.element_for_diagram_id(&flow.source) else {
                return false;
            };
            if source.is_trigger() && Some(source.id.as_str()) != start {
                continue;
            }
            if context.status_of(&source.id) != TaskStatus::Completed {
                return false;
            }
            predecessors += 1;
        }
        predecessors > 0
    }
}
