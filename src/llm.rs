//! Generative backend access: the backend boundary, the Gemini client and the
//! invocation policy layered on top.

pub mod backend;
pub mod gemini;
pub mod invocation;

pub use backend::{
    GeneratedImage, GenerationRequest, ImageBackend, ImageRequest, TextBackend, Tool,
};
pub use gemini::GeminiClient;
pub use invocation::generate_reply;
