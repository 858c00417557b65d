//! Arena-addressed token and AST types shared by the scanner, parser, and
//! analysis passes. Nodes are addressed by `NodeId` into a flat `Vec`-backed
//! arena; there are no owning references or reference counting anywhere in
//! this crate.

pub mod node;
pub mod scope;
pub mod token;

pub use node::{
    Ast, BinOp, CallClassification, ElemType, Node, NodeId, NodeKind, PostfixOp, UnOp,
};
pub use scope::{Scope, ScopeId, ScopeTable};
pub use token::{Token, TokenKind};
