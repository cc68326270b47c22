//! Definición de proceso: grafo de elementos compilado desde el diagrama.

mod element;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

use crate::constants::ENGINE_VERSION;
use crate::errors::ProcessError;
use crate::hashing::hash_value;

pub use element::{ElementKind, Participant, ProcessElement, SequenceFlow};

static DIAGRAM_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bid="([^"]+)""#).expect("valid diagram id regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub id: Uuid,
    pub name: String,
    /// XML del diagrama. El motor sólo extrae sus atributos `id`.
    #[serde(default)]
    pub diagram: String,
    #[serde(default)]
    pub elements: IndexMap<String, ProcessElement>,
    #[serde(default)]
    pub flows: Vec<SequenceFlow>,
}

impl ProcessDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               diagram: String::new(),
               elements: IndexMap::new(),
               flows: Vec::new() }
    }

    /// Elementos que cumplen `filter`, en orden de definición.
    pub fn elements<F>(&self, filter: F) -> Vec<&ProcessElement>
        where F: Fn(&ProcessElement) -> bool
    {
        self.elements.values().filter(|e| filter(e)).collect()
    }

    pub fn all_elements(&self) -> Vec<&ProcessElement> {
        self.elements(|_| true)
    }

    pub fn element_for_diagram_id(&self, id: &str) -> Option<&ProcessElement> {
        self.elements.get(id)
    }

    /// Primer Trigger ligado a `key`.
    pub fn task_for_trigger_key(&self, key: &str) -> Option<&ProcessElement> {
        self.elements.values().find(|e| matches!(&e.kind, ElementKind::Trigger(t) if t.trigger_key == key))
    }

    pub fn element_add(&mut self, element: ProcessElement) -> Result<(), ProcessError> {
        if self.elements.contains_key(&element.id) {
            return Err(ProcessError::Definition(format!("duplicate element id `{}`", element.id)));
        }
        self.elements.insert(element.id.clone(), element);
        Ok(())
    }

    /// Quita el elemento y los flujos que lo tocan.
    pub fn element_remove(&mut self, id: &str) -> Option<ProcessElement> {
        let removed = self.elements.shift_remove(id)?;
        self.flows.retain(|f| f.source != id && f.target != id);
        Some(removed)
    }

    /// Añade un flujo `source -> target` con id derivado.
    pub fn connect(&mut self, source: &str, target: &str) -> Result<(), ProcessError> {
        for end in [source, target] {
            if !self.elements.contains_key(end) {
                return Err(ProcessError::UnknownElement(end.to_string()));
            }
        }
        self.flows.push(SequenceFlow { id: format!("Flow_{source}_{target}"),
                                       source: source.to_string(),
                                       target: target.to_string() });
        Ok(())
    }

    pub fn connections_incoming(&self, id: &str) -> Vec<&SequenceFlow> {
        self.flows.iter().filter(|f| f.target == id).collect()
    }

    pub fn connections_outgoing(&self, id: &str) -> Vec<&SequenceFlow> {
        self.flows.iter().filter(|f| f.source == id).collect()
    }

    /// Ids presentes en el XML del diagrama, en orden de aparición.
    pub fn diagram_element_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        DIAGRAM_ID.captures_iter(&self.diagram)
                  .map(|c| c[1].to_string())
                  .filter(|id| seen.insert(id.clone()))
                  .collect()
    }

    pub fn is_startable(&self) -> bool {
        self.elements.values().any(ProcessElement::is_trigger)
    }

    /// Ids únicos y coherentes con su clave, flujos con extremos conocidos
    /// y sin carriles en el grafo.
    pub fn validate(&self) -> Result<(), ProcessError> {
        for (key, element) in &self.elements {
            if key != &element.id {
                return Err(ProcessError::Definition(format!("element `{}` stored under key `{key}`", element.id)));
            }
        }
        let mut flow_ids = HashSet::new();
        for flow in &self.flows {
            if !flow_ids.insert(flow.id.as_str()) {
                return Err(ProcessError::Definition(format!("duplicate flow id `{}`", flow.id)));
            }
            for end in [&flow.source, &flow.target] {
                match self.elements.get(end) {
                    None => return Err(ProcessError::UnknownElement(end.clone())),
                    Some(e) if !e.is_task() => {
                        return Err(ProcessError::Definition(format!("flow `{}` touches participant `{end}`", flow.id)))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Hash estable de la definición ejecutable (elementos + flujos).
    pub fn definition_hash(&self) -> Result<String, ProcessError> {
        let value = json!({
            "engine": ENGINE_VERSION,
            "elements": serde_json::to_value(&self.elements)?,
            "flows": serde_json::to_value(&self.flows)?,
        });
        Ok(hash_value(&value))
    }
}
