//! Tree-shaped builders for generated source text.
//!
//! - [`CodeWriter`] - indentation-tracking output buffer
//! - [`Render`] - anything that can write itself into a [`CodeWriter`]
//! - [`Block`] - lines, statements, scopes and conditional regions
//! - [`SourceFile`], [`Namespace`], [`StructDecl`], [`ImplDecl`], [`Function`] - item builders
//!
//! Every node is owned by its parent. Rendering is one depth-first walk in
//! which the writer alone tracks indentation.

mod block;
mod items;
mod render;

pub use block::{Block, Node};
pub use items::{FieldDecl, Function, ImplDecl, Item, Namespace, SourceFile, StructDecl};
pub use render::{CodeWriter, Indent, Render, string_literal};
