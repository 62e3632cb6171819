/// Input bounds enforced before a line reaches the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Longest accepted input line, in bytes.
    pub max_line_len: usize,
    /// Longest accepted token, in bytes.
    pub max_token_len: usize,
    /// Most tokens accepted on one line, including the `&` marker.
    pub max_tokens: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_len: 1024,
            max_token_len: 64,
            max_tokens: 64,
        }
    }
}

/// Runtime settings of a shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub limits: Limits,
    /// Number of hash buckets in the background registry.
    pub registry_buckets: usize,
    /// Keep an in-memory history of entered lines.
    pub history: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            registry_buckets: crate::registry::DEFAULT_BUCKETS,
            history: true,
        }
    }
}
