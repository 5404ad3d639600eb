use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrtError {
    #[error("Sensitive volume '{leaf}' has a path of only {depth} nodes (strip, module, tagger and detector are required)")]
    MissingAncestor { leaf: String, depth: usize },

    #[error("Invalid CRT matching parameter: {0}")]
    InvalidMatchParameter(String),

    #[error("Invalid TPC geometry: {0}")]
    InvalidTpcGeometry(String),
}

impl PartialEq for CrtError {
    fn eq(&self, other: &Self) -> bool {
        use CrtError::*;
        match (self, other) {
            (
                MissingAncestor {
                    leaf: a,
                    depth: da,
                },
                MissingAncestor {
                    leaf: b,
                    depth: db,
                },
            ) => a == b && da == db,
            (InvalidMatchParameter(a), InvalidMatchParameter(b)) => a == b,
            (InvalidTpcGeometry(a), InvalidTpcGeometry(b)) => a == b,
            _ => false,
        }
    }
}
