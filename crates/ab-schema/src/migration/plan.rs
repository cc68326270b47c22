use serde::{Deserialize, Serialize};
use std::fmt;

use super::artifact::SchemaArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationOp {
    Create,
    Update,
    Drop,
}

impl fmt::Display for MigrationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
                        Self::Create => "create",
                        Self::Update => "update",
                        Self::Drop => "drop",
                    })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub op: MigrationOp,
    pub artifact: SchemaArtifact,
}

/// Secuencia ordenada de pasos DDL. Construirla es puro; aplicarla es
/// trabajo del `MigrationEngine`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    steps: Vec<PlanStep>,
}

impl MigrationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pasos de creación/actualización en orden de dependencias ascendente.
    /// El orden relativo dentro de un mismo rango se conserva.
    pub fn forward(mut steps: Vec<PlanStep>) -> Self {
        steps.sort_by_key(|s| s.artifact.rank());
        Self { steps }
    }

    /// Pasos de borrado en orden inverso de dependencias.
    pub fn backward(mut steps: Vec<PlanStep>) -> Self {
        steps.sort_by_key(|s| std::cmp::Reverse(s.artifact.rank()));
        Self { steps }
    }

    pub fn create(artifacts: Vec<SchemaArtifact>) -> Self {
        Self::forward(Self::tag(MigrationOp::Create, artifacts))
    }

    pub fn update(artifacts: Vec<SchemaArtifact>) -> Self {
        Self::forward(Self::tag(MigrationOp::Update, artifacts))
    }

    pub fn drop(artifacts: Vec<SchemaArtifact>) -> Self {
        Self::backward(Self::tag(MigrationOp::Drop, artifacts))
    }

    pub fn tag(op: MigrationOp, artifacts: Vec<SchemaArtifact>) -> Vec<PlanStep> {
        artifacts.into_iter().map(|artifact| PlanStep { op, artifact }).collect()
    }

    /// Concatena `next` después de los pasos actuales.
    pub fn then(mut self, next: MigrationPlan) -> Self {
        self.steps.extend(next.steps);
        self
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddl::{ColumnDef, ColumnType, Identifier, TriggerBody, TriggerEvent};

    fn id(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn sample() -> Vec<SchemaArtifact> {
        vec![SchemaArtifact::Trigger { table: id("t"),
                                       name: id("t_c_update"),
                                       event: TriggerEvent::Update,
                                       body: TriggerBody::Concat { target: id("c"),
                                                                   sources: vec![id("a")],
                                                                   separator: "+".into() } },
             SchemaArtifact::Index { table: id("t"),
                                     name: id("UNQ_t_c"),
                                     columns: vec![id("c")],
                                     unique: true },
             SchemaArtifact::Column { table: id("t"),
                                      column: ColumnDef::new(id("c"), ColumnType::VarChar(535)) },
             SchemaArtifact::Table { table: id("t"),
                                     columns: vec![],
                                     primary_key: None }]
    }

    #[test]
    fn create_orders_table_columns_indexes_triggers() {
        let plan = MigrationPlan::create(sample());
        let ranks: Vec<u8> = plan.steps().iter().map(|s| s.artifact.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn drop_orders_triggers_first() {
        let plan = MigrationPlan::drop(sample());
        let ranks: Vec<u8> = plan.steps().iter().map(|s| s.artifact.rank()).collect();
        assert_eq!(ranks, vec![3, 2, 1, 0]);
        assert!(plan.steps().iter().all(|s| s.op == MigrationOp::Drop));
    }
}
