use thiserror::Error;

/// Errors surfaced by the fleet store and the action executor.
///
/// None of them is transient: a failure is either a caller problem
/// (`NotFound`, `Validation`) or a bug (`Internal`). Nothing is retried.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl FleetError {
    pub fn server_not_found(id: &str) -> Self {
        FleetError::NotFound { kind: EntityKind::Server, id: id.to_string() }
    }

    pub fn container_not_found(id: &str) -> Self {
        FleetError::NotFound { kind: EntityKind::Container, id: id.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    DataCenter,
    Rack,
    Server,
    Container,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::DataCenter => "data center",
            EntityKind::Rack => "rack",
            EntityKind::Server => "server",
            EntityKind::Container => "container",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
