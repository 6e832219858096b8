//! The standard builtin table shared between compiler and VM.
//!
//! The compiler only needs the names and their table indices; the
//! implementations live in the VM. A `GetBuiltin` operand is an index into
//! this table, so the order here is part of the compiler/VM contract.

/// Builtin names in table order. `len` is builtin 0.
pub const BUILTINS: &[&str] = &[
    "len",
    "print",
    "println",
    "first",
    "last",
    "rest",
    "push",
];
