mod assembler;
mod decoder;
mod transport;

#[cfg(test)]
pub mod testing;

pub use assembler::{AnswerAssembler, FragmentSink};
pub use transport::{CompletionTransport, HttpTransport};
