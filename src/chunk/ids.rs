//! Chunk identifiers.

use uuid::Uuid;

/// How chunk ids are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdScheme {
    /// UUID v5 over `"{source}#{ordinal}"`; identical across re-runs
    #[default]
    Deterministic,
    /// UUID v4
    Random,
}

/// Issues ids in chunk creation order for one run.
#[derive(Debug, Clone)]
pub struct ChunkIds {
    scheme: IdScheme,
    source: String,
    issued: usize,
}

impl ChunkIds {
    pub fn new(scheme: IdScheme, source: impl Into<String>) -> Self {
        Self {
            scheme,
            source: source.into(),
            issued: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        let ordinal = self.issued;
        self.issued += 1;
        match self.scheme {
            IdScheme::Deterministic => {
                let name = format!("{}#{}", self.source, ordinal);
                Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
            }
            IdScheme::Random => Uuid::new_v4().to_string(),
        }
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> usize {
        self.issued
    }
}
