//! Byte-exact wire formats.
//!
//! Every binary shape the orchestrator reads or writes lives here, built on
//! the shared cursor helpers in [`wire`]: ordered fixed-width fields plus
//! explicitly length-prefixed variable fields, compiled once into encode and
//! decode functions per shape. Call sites never do offset arithmetic.

pub mod counters;
pub mod discriminator;
pub mod event;
pub mod instruction;
pub mod record;
pub mod wire;

pub use counters::AggregateCounters;
pub use discriminator::Discriminator;
pub use event::{decode_event, ResultEvent, ResultPayload};
pub use instruction::CallbackInstruction;
pub use record::RequestRecord;
pub use wire::DecodeError;
