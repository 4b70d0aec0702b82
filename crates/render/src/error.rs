use std::fmt;
use std::path::PathBuf;

/// One programmable stage of a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors from GPU resource and draw operations.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to read {stage} shader {}: {source}", path.display())]
    ShaderIo {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("shader program failed to link: {log}")]
    Link { log: String },
    #[error("attribute slot {slot} is already configured on this vertex array")]
    DuplicateAttributeSlot { slot: u32 },
    #[error("invalid vertex attribute at slot {slot}: {reason}")]
    InvalidAttribute { slot: u32, reason: String },
    #[error("vertex array has no index buffer")]
    MissingIndexBuffer,
    #[error("no vertex array is bound")]
    NoVertexArrayBound,
    #[error("no shader program is bound")]
    NoProgramBound,
    #[error("program reads vertex input {slot} but the bound vertex array does not enable it")]
    MissingVertexInput { slot: u32 },
    #[error("draw of {count} indices exceeds the {available} indices in the bound index buffer")]
    IndexOutOfRange { count: u32, available: u32 },
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("graphics backend error: {0}")]
    Backend(String),
}
