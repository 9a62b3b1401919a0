use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object tree: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Peer(#[from] peerlink::peer::PeerError),

    #[error(transparent)]
    Script(#[from] peerlink::script::ScriptError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("script failed")]
    ScriptFailed,
}

pub type Result<T> = std::result::Result<T, CliError>;
