//! C++17 emission: the final pass of the pipeline, run over a tree that has
//! already cleared every analysis pass. Nothing in this crate reports a
//! diagnostic — by the time `emit_standalone`/`emit_embeddable` run, every
//! node that needs a type or shape already has one.

mod body;
mod doc;
mod expr;
mod predicates;
mod program;
mod types;

pub use doc::capture_doc_comment;
pub use predicates::{compute as compute_predicates, Predicates};
pub use program::{emit_embeddable, emit_standalone};
