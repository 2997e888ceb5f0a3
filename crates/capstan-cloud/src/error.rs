use miette::Diagnostic;
use thiserror::Error;

/// Cloud pool error type for provider-facing operations
#[derive(Error, Debug, Diagnostic)]
pub enum CloudError {
    /// No pool matched the context hint
    #[error("No {provider} pool matches context '{hint}'")]
    #[diagnostic(
        code(capstan::cloud::context_not_found),
        help("Check the context hint against the pool names in the provider console. Use `list` to see available pools")
    )]
    ContextNotFound { provider: String, hint: String },

    /// More than one pool matched the context hint
    #[error("Context '{hint}' is ambiguous for {provider}: matches {matches:?}")]
    #[diagnostic(
        code(capstan::cloud::ambiguous_context),
        help("Narrow the context hint until it matches exactly one pool. No default is ever chosen")
    )]
    AmbiguousContext {
        provider: String,
        hint: String,
        matches: Vec<String>,
    },

    /// Provider management-plane call failed
    #[error("{provider} {operation} failed{}: {message}", .status.as_ref().map(|s| format!(" with status {}", s)).unwrap_or_default())]
    #[diagnostic(
        code(capstan::cloud::provider_api_error),
        help("Provider failures are fatal and never retried here. Diagnose (credentials, quota, pool state) and re-invoke")
    )]
    ProviderApi {
        provider: String,
        operation: String,
        status: Option<u16>,
        message: String,
    },

    /// Growth precondition failed: the requested size is below the current size
    #[error("Refusing to resize pool '{pool}' from {current} down to {requested}")]
    #[diagnostic(
        code(capstan::cloud::shrink_via_resize),
        help("grow_to is defined only for growth on this provider. Shrink by removing named instances with remove_instance")
    )]
    ShrinkViaResize {
        pool: String,
        current: u64,
        requested: u64,
    },

    /// Named instance is not a member of the pool
    #[error("Instance '{node_name}' not found in pool '{pool}'")]
    #[diagnostic(
        code(capstan::cloud::instance_not_found),
        help("The node may already be removed, or belong to a different pool. Use list_members to see current membership")
    )]
    InstanceNotFound { pool: String, node_name: String },

    /// Pool named in the context does not exist
    #[error("Pool '{pool}' not found")]
    #[diagnostic(
        code(capstan::cloud::pool_not_found),
        help("The pool behind this context no longer exists. Re-run resolve with the original context hint")
    )]
    PoolNotFound { pool: String },
}

/// Result type alias for cloud pool operations
pub type Result<T> = std::result::Result<T, CloudError>;

impl CloudError {
    pub fn context_not_found(provider: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::ContextNotFound {
            provider: provider.into(),
            hint: hint.into(),
        }
    }

    pub fn ambiguous_context(
        provider: impl Into<String>,
        hint: impl Into<String>,
        matches: Vec<String>,
    ) -> Self {
        Self::AmbiguousContext {
            provider: provider.into(),
            hint: hint.into(),
            matches,
        }
    }

    pub fn provider_api(
        provider: impl Into<String>,
        operation: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderApi {
            provider: provider.into(),
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    pub fn instance_not_found(pool: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self::InstanceNotFound {
            pool: pool.into(),
            node_name: node_name.into(),
        }
    }

    pub fn pool_not_found(pool: impl Into<String>) -> Self {
        Self::PoolNotFound { pool: pool.into() }
    }
}
