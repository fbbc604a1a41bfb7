// src/models/rbac.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::List => "list",
        }
    }

    /// Ações que alteram dados e por isso geram registro de auditoria.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Action::Create | Action::Update | Action::Delete)
    }
}

// Recurso ou ação de uma regra: um nome concreto ou o curinga "*".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern<T> {
    // A ordem importa: "*" precisa ser tentado antes do nome concreto.
    Any(Wildcard),
    Exact(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wildcard {
    #[serde(rename = "*")]
    Star,
}

impl<T: PartialEq> Pattern<T> {
    pub fn any() -> Self {
        Pattern::Any(Wildcard::Star)
    }

    pub fn matches(&self, value: &T) -> bool {
        match self {
            Pattern::Any(_) => true,
            Pattern::Exact(expected) => expected == value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Eq,
    Ne,
    In,
    NotIn,
    Exists,
}

/// Condição extra de uma regra, avaliada contra o contexto da requisição.
///
/// `field` aponta para `params.<nome>`, `body.<caminho>` ou `store_id`.
/// `value` pode referenciar o usuário com `$user.id`, `$user.username` ou `$user.role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub resource: Pattern<String>,
    pub action: Pattern<Action>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl PermissionRule {
    pub fn new(resource: &str, action: Action) -> Self {
        Self {
            resource: Pattern::Exact(resource.to_string()),
            action: Pattern::Exact(action),
            conditions: Vec::new(),
        }
    }

    pub fn wildcard() -> Self {
        Self {
            resource: Pattern::any(),
            action: Pattern::any(),
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// O que uma rota exige: declarado na tabela de rotas, consultado pelo guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequirement {
    pub resource: &'static str,
    pub action: Action,
    // Tabela usada no registro de auditoria; `None` desliga a auditoria da rota.
    pub audit_table: Option<&'static str>,
}

impl PermissionRequirement {
    pub const fn new(resource: &'static str, action: Action) -> Self {
        Self { resource, action, audit_table: None }
    }

    pub const fn audited(mut self, table: &'static str) -> Self {
        self.audit_table = Some(table);
        self
    }
}
