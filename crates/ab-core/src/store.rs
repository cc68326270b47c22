//! Persistencia de instancias.
//!
//! `InstanceStore` abstrae el backend; `InMemoryInstanceStore` guarda cada
//! instancia serializada (como haría una base de datos) para que cargar
//! siempre reconstruya desde el blob persistido y no desde memoria viva.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::errors::ProcessError;
use crate::instance::{InstanceStatus, ProcessInstance};

#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Inserta o reemplaza la instancia.
    async fn save(&self, instance: &ProcessInstance) -> Result<(), ProcessError>;

    async fn load(&self, id: Uuid) -> Result<Option<ProcessInstance>, ProcessError>;

    async fn list_by_status(&self, status: InstanceStatus) -> Result<Vec<ProcessInstance>, ProcessError>;
}

#[derive(Debug, Default)]
pub struct InMemoryInstanceStore {
    inner: DashMap<Uuid, String>,
    saves: AtomicUsize,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Número total de `save` realizados.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn save(&self, instance: &ProcessInstance) -> Result<(), ProcessError> {
        let blob = serde_json::to_string(instance)?;
        self.inner.insert(instance.id, blob);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<ProcessInstance>, ProcessError> {
        match self.inner.get(&id) {
            Some(blob) => Ok(Some(serde_json::from_str(blob.value())?)),
            None => Ok(None),
        }
    }

    async fn list_by_status(&self, status: InstanceStatus) -> Result<Vec<ProcessInstance>, ProcessError> {
        let mut out = Vec::new();
        for entry in self.inner.iter() {
            let instance: ProcessInstance = serde_json::from_str(entry.value())?;
            if instance.status == status {
                out.push(instance);
            }
        }
        out.sort_by_key(|i| i.created_at);
        Ok(out)
    }
}

#[async_trait]
impl<S> InstanceStore for std::sync::Arc<S> where S: InstanceStore + ?Sized
{
    async fn save(&self, instance: &ProcessInstance) -> Result<(), ProcessError> {
        (**self).save(instance).await
    }

    async fn load(&self, id: Uuid) -> Result<Option<ProcessInstance>, ProcessError> {
        (**self).load(id).await
    }

    async fn list_by_status(&self, status: InstanceStatus) -> Result<Vec<ProcessInstance>, ProcessError> {
        (**self).list_by_status(status).await
    }
}
