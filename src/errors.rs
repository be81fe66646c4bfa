use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("collection `{0}` is not defined; register it with Engine::define(\"{0}\", ..)")]
    UndefinedCollection(String),

    #[error("error in scope `{scope}` on collection `{collection}`: {message}")]
    Scope { collection: String, scope: String, message: String },

    #[error("relation `{relation}` on collection `{collection}`: {message}")]
    Relation { collection: String, relation: String, message: String },

    #[error(
        "error in capability `{capability}` on collection `{collection}` record {record}: {message}"
    )]
    Capability { collection: String, capability: String, record: String, message: String },

    #[error("per_page must be positive, got {0}")]
    InvalidPageSize(usize),

    #[error("records are immutable: cannot assign `{field}` on collection `{collection}`")]
    Immutable { collection: String, field: String },

    #[error("no field, relation or capability `{name}` on collection `{collection}`")]
    UnknownAttribute { collection: String, name: String },

    #[error("JSON conversion: {0}")]
    Json(#[from] serde_json::Error),
}
