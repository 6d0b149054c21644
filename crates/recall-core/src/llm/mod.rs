//! Chat-model and prompt-assembly collaborators.
//!
//! `ChatModel` is the port an external chat model plugs into; `PromptTemplate`
//! turns a windowed history plus retrieved context into the turns sent to it.

pub mod model;
pub mod prompt;
