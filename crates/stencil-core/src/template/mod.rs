//! Template module - fragment-embedding text templates
//!
//! A template file is arbitrary text with zero or more `${...}` fragments.
//! Each fragment holds one expression that is evaluated against the render's
//! execution context and spliced into the output.
//!
//! ## Syntax
//!
//! - Fragments: `${name}`, `${user.name}`, `${items[0]}`, `${a + b}`
//! - Calls: `${include('header', {title: 'Home'})}`, `${set('k', 1)}`
//! - Operators: `! - + * / % < <= > >= == != === !== && || ?? ?:`
//! - Literals: numbers, `'..'`/`".."`/`` `..` `` strings, `true`, `false`,
//!   `null`, `undefined`, `[..]`, `{k: v}`
//! - `await expr` is accepted; calls are always awaited in place
//! - Escape sequences: `\${literal}` renders `${literal}`, `\\${x}` renders a
//!   backslash followed by the value of `x`

pub mod compile;
pub mod error;
pub mod expr;
mod tokenize;
pub mod value;

pub use compile::{CompiledUnit, Compiler, Segment};
pub use error::{SyntaxError, SyntaxErrorKind};
pub use value::{Builtin, Map, Value};
