//! Shell channel: reading device output until a prompt, a question or
//! silence, and recognising what the output asks for.

mod buffer;
mod patterns;
mod pty;

pub use buffer::PatternBuffer;
pub use patterns::{ConfirmationPrompt, PhrasePrompt, PromptMatcher, compile_prompt_pattern};
pub use pty::{PtyChannel, PtyConfig};
