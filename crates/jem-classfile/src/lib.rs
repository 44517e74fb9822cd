//! Minimal JVM class-file reader.
//!
//! Only the parts needed to reason about thrown exceptions are decoded:
//! the class header, the type hierarchy, method `Exceptions` attributes and
//! `Code` attributes (instructions plus exception table).

#![forbid(unsafe_code)]

mod classfile;
mod code;
mod constant_pool;
mod descriptor;
mod error;
mod reader;

pub use crate::classfile::{access, ClassFile, MethodInfo};
pub use crate::code::{Code, ExceptionHandler, Instruction, InvokeKind, Op};
pub use crate::constant_pool::MemberRef;
pub use crate::descriptor::{parse_field_descriptor, parse_method_descriptor};
pub use crate::descriptor::{BaseType, FieldType, MethodDescriptor, ReturnType};
pub use crate::error::{Error, Result};
