//! Backend adapters
//!
//! One adapter per TTS integration, all behind the [`crate::types::TtsBackend`] seam so
//! the dispatcher never sees a protocol difference:
//! - `ai_voice` - platform-native voice, group chats only
//! - `gsv2p` - cloud API, bearer token
//! - `gpt_sovits` - local reference-conditioned server
//! - `doubao` - ByteDance streaming API

mod ai_voice;
mod doubao;
mod doubao_stream;
mod gpt_sovits;
mod gsv2p;

pub use ai_voice::{builtin_alias_map, AiVoiceBackend};
pub use doubao::DoubaoBackend;
pub use doubao_stream::DoubaoStreamParser;
pub use gpt_sovits::GptSovitsBackend;
pub use gsv2p::Gsv2pBackend;
