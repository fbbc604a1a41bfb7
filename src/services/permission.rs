// src/services/permission.rs

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::common::error::AppError;
use crate::models::auth::{GlobalRole, UserContext};
use crate::models::rbac::{Action, Condition, ConditionOperator, Pattern, PermissionRule};

/// Recursos que as rotas da aplicação declaram. A tabela padrão cobre todos.
pub const KNOWN_RESOURCES: &[&str] = &["store", "products", "audit_logs", "tenant_registry"];

// ---
// Tabela de políticas: cargo -> regras permitidas
// ---
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyTable {
    #[serde(default)]
    resources: HashSet<String>,
    roles: HashMap<GlobalRole, Vec<PermissionRule>>,
}

impl PolicyTable {
    pub fn new(resources: &[&str], roles: HashMap<GlobalRole, Vec<PermissionRule>>) -> Self {
        Self {
            resources: resources.iter().map(|r| r.to_string()).collect(),
            roles,
        }
    }

    /// Carrega a tabela de um arquivo JSON (`POLICY_FILE`).
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let mut table: PolicyTable = serde_json::from_str(raw)?;
        // Recursos citados nas regras também contam como conhecidos.
        let named: Vec<String> = table
            .roles
            .values()
            .flatten()
            .filter_map(|rule| match &rule.resource {
                Pattern::Exact(name) => Some(name.clone()),
                Pattern::Any(_) => None,
            })
            .collect();
        table.resources.extend(named);
        Ok(table)
    }

    pub fn rules_for(&self, role: GlobalRole) -> &[PermissionRule] {
        self.roles.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn knows_resource(&self, resource: &str) -> bool {
        self.resources.contains(resource)
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        use Action::*;

        let mut roles = HashMap::new();
        roles.insert(GlobalRole::AdminGlobal, vec![PermissionRule::wildcard()]);
        roles.insert(
            GlobalRole::StoreManager,
            vec![
                PermissionRule::new("store", Read),
                PermissionRule {
                    resource: Pattern::Exact("products".into()),
                    action: Pattern::any(),
                    conditions: vec![],
                },
                PermissionRule::new("audit_logs", List),
            ],
        );
        roles.insert(
            GlobalRole::StoreStaff,
            vec![
                PermissionRule::new("store", Read),
                PermissionRule::new("products", List),
                PermissionRule::new("products", Read),
                PermissionRule::new("products", Create),
            ],
        );
        roles.insert(
            GlobalRole::Viewer,
            vec![
                PermissionRule::new("store", Read),
                PermissionRule::new("products", List),
                PermissionRule::new("products", Read),
            ],
        );

        Self::new(KNOWN_RESOURCES, roles)
    }
}

// ---
// Contexto da requisição usado nas condições
// ---
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub store_id: Option<String>,
    pub params: HashMap<String, String>,
    pub body: Option<Value>,
}

impl RequestContext {
    pub fn for_store(store_id: impl Into<String>) -> Self {
        Self {
            store_id: Some(store_id.into()),
            ..Default::default()
        }
    }

    fn lookup(&self, field: &str) -> Option<Value> {
        if field == "store_id" {
            return self.store_id.clone().map(Value::String);
        }
        let (scope, path) = field.split_once('.')?;
        match scope {
            "params" => self.params.get(path).cloned().map(Value::String),
            "body" => self.body.as_ref().and_then(|b| json_path(b, path)).cloned(),
            _ => None,
        }
    }
}

fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

// ---
// O avaliador
// ---
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    policy: PolicyTable,
}

impl PermissionEvaluator {
    pub fn new(policy: PolicyTable) -> Self {
        Self { policy }
    }

    /// Erro de programação: a rota declarou um recurso que a tabela não conhece.
    pub fn ensure_known(&self, resource: &str) -> Result<(), AppError> {
        if self.policy.knows_resource(resource) {
            Ok(())
        } else {
            Err(AppError::PermissionConfiguration(format!(
                "recurso '{}' não existe na tabela de políticas",
                resource
            )))
        }
    }

    /// Cargos efetivos do usuário para o contexto.
    ///
    /// Em requisições de uma loja sem mapeamento, só `AdminGlobal` vale.
    pub fn effective_roles(&self, user: &UserContext, ctx: &RequestContext) -> Vec<GlobalRole> {
        let global = user.user.role;
        match &ctx.store_id {
            None => vec![global],
            Some(store_id) => match user.store_role(store_id) {
                Some(store_role) if store_role == global => vec![global],
                Some(store_role) => vec![global, store_role],
                None if global == GlobalRole::AdminGlobal => vec![global],
                None => Vec::new(),
            },
        }
    }

    pub fn has_permission(
        &self,
        user: &UserContext,
        resource: &str,
        action: Action,
        ctx: &RequestContext,
    ) -> bool {
        if user.user.is_superadmin {
            return true;
        }

        let resource = resource.to_string();
        self.effective_roles(user, ctx).into_iter().any(|role| {
            self.policy.rules_for(role).iter().any(|rule| {
                rule.resource.matches(&resource)
                    && rule.action.matches(&action)
                    && rule.conditions.iter().all(|c| condition_holds(c, user, ctx))
            })
        })
    }
}

// `None` para referência desconhecida: a condição nega.
fn resolve_value(value: &Value, user: &UserContext) -> Option<Value> {
    match value.as_str().and_then(|s| s.strip_prefix("$user.")) {
        Some("id") => Some(Value::String(user.id().to_string())),
        Some("username") => Some(Value::String(user.user.username.clone())),
        Some("role") => Some(Value::String(user.user.role.as_str().to_string())),
        Some(unknown) => {
            tracing::warn!("Condição referencia '$user.{}', que não existe", unknown);
            None
        }
        None => Some(value.clone()),
    }
}

fn condition_holds(condition: &Condition, user: &UserContext, ctx: &RequestContext) -> bool {
    let Some(expected) = resolve_value(&condition.value, user) else {
        return false;
    };
    let actual = ctx.lookup(&condition.field).filter(|v| !v.is_null());

    match condition.operator {
        ConditionOperator::Exists => actual.is_some(),
        ConditionOperator::Eq => actual.is_some_and(|v| loosely_equal(&v, &expected)),
        // Campo ausente não prova nada: nega.
        ConditionOperator::Ne => actual.is_some_and(|v| !loosely_equal(&v, &expected)),
        ConditionOperator::In | ConditionOperator::NotIn => {
            let (Some(v), Some(options)) = (actual, expected.as_array()) else {
                return false;
            };
            let mut resolved = Vec::with_capacity(options.len());
            for option in options {
                match resolve_value(option, user) {
                    Some(option) => resolved.push(option),
                    None => return false,
                }
            }
            let found = resolved.iter().any(|o| loosely_equal(&v, o));
            match condition.operator {
                ConditionOperator::In => found,
                _ => !found,
            }
        }
    }
}

// Parâmetros de rota chegam como texto, então "5" e 5 são iguais (e "true" e true).
// Null, listas e objetos só se igualam de forma estrita.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), scalar @ (Value::Number(_) | Value::Bool(_)))
        | (scalar @ (Value::Number(_) | Value::Bool(_)), Value::String(s)) => s == &scalar.to_string(),
        (Value::Null, _) | (_, Value::Null) => false,
        _ => a == b,
    }
}
