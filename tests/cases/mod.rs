//! Shared helpers for the integration tests: arena AST builders mirroring
//! what the parser produces, plus bytecode assertion utilities.
#![allow(dead_code)]

use bumpalo::Bump;
use pretty_assertions::assert_eq;

use tarn::ast::{Block, Expr, Literal, Program, Stmt};
use tarn::compiler::{CompileError, Compiler};
use tarn::{Bytecode, CompiledFunction, Constant, Instructions};

pub fn compile<'a>(program: &'a Program<'a>) -> Bytecode {
    let mut compiler = Compiler::new();
    compiler.compile(program).expect("program should compile");
    compiler.finalize()
}

pub fn compile_error<'a>(program: &'a Program<'a>) -> CompileError {
    let mut compiler = Compiler::new();
    compiler
        .compile(program)
        .expect_err("compilation should fail")
}

pub fn concat(parts: &[Vec<u8>]) -> Instructions {
    let mut out = Instructions::new();
    for part in parts {
        out.push_bytes(part);
    }
    out
}

pub fn assert_bytecode(bytecode: &Bytecode, constants: &[Constant], instructions: &[Vec<u8>]) {
    assert_eq!(
        bytecode.instructions,
        concat(instructions),
        "wrong instructions, got:\n{}",
        bytecode.instructions
    );
    assert_eq!(bytecode.constants.as_slice(), constants);
}

pub fn function(instructions: &[Vec<u8>], num_locals: usize, num_parameters: usize) -> Constant {
    Constant::Function(CompiledFunction {
        instructions: concat(instructions),
        num_locals,
        num_parameters,
    })
}

pub fn str_constant(value: &str) -> Constant {
    Constant::Str(String::from(value))
}

// === AST builders ===

pub fn program<'a>(arena: &'a Bump, stmts: &[Stmt<'a>]) -> &'a Program<'a> {
    arena.alloc(Program {
        statements: arena.alloc_slice_copy(stmts),
    })
}

pub fn block<'a>(arena: &'a Bump, stmts: &[Stmt<'a>]) -> &'a Block<'a> {
    arena.alloc(Block {
        statements: arena.alloc_slice_copy(stmts),
    })
}

pub fn int<'a>(arena: &'a Bump, value: i64) -> &'a Expr<'a> {
    arena.alloc(Expr::Literal(Literal::Int(value)))
}

pub fn string<'a>(arena: &'a Bump, value: &'a str) -> &'a Expr<'a> {
    arena.alloc(Expr::Literal(Literal::Str(value)))
}

pub fn boolean<'a>(arena: &'a Bump, value: bool) -> &'a Expr<'a> {
    arena.alloc(Expr::Literal(Literal::Bool(value)))
}

pub fn null<'a>(arena: &'a Bump) -> &'a Expr<'a> {
    arena.alloc(Expr::Literal(Literal::Null))
}

pub fn ident<'a>(arena: &'a Bump, name: &'a str) -> &'a Expr<'a> {
    arena.alloc(Expr::Ident(name))
}

pub fn binary<'a>(
    arena: &'a Bump,
    op: &'a str,
    left: &'a Expr<'a>,
    right: &'a Expr<'a>,
) -> &'a Expr<'a> {
    arena.alloc(Expr::Binary { op, left, right })
}

pub fn array<'a>(arena: &'a Bump, elements: &[&'a Expr<'a>]) -> &'a Expr<'a> {
    arena.alloc(Expr::Array(arena.alloc_slice_copy(elements)))
}

pub fn hash<'a>(arena: &'a Bump, pairs: &[(&'a Expr<'a>, &'a Expr<'a>)]) -> &'a Expr<'a> {
    arena.alloc(Expr::Hash(arena.alloc_slice_copy(pairs)))
}

pub fn index<'a>(arena: &'a Bump, value: &'a Expr<'a>, idx: &'a Expr<'a>) -> &'a Expr<'a> {
    arena.alloc(Expr::Index { value, index: idx })
}

pub fn lambda<'a>(arena: &'a Bump, params: &[&'a str], stmts: &[Stmt<'a>]) -> &'a Expr<'a> {
    arena.alloc(Expr::Lambda {
        params: arena.alloc_slice_copy(params),
        body: block(arena, stmts),
    })
}

pub fn call<'a>(arena: &'a Bump, callable: &'a Expr<'a>, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
    arena.alloc(Expr::Call {
        callable,
        args: arena.alloc_slice_copy(args),
    })
}

pub fn if_expr<'a>(
    arena: &'a Bump,
    cond: &'a Expr<'a>,
    consequence: &'a Block<'a>,
    else_if: Option<&'a Expr<'a>>,
    alternative: Option<&'a Block<'a>>,
) -> &'a Expr<'a> {
    arena.alloc(Expr::If {
        cond,
        consequence,
        else_if,
        alternative,
    })
}

pub fn while_expr<'a>(arena: &'a Bump, cond: &'a Expr<'a>, body: &'a Block<'a>) -> &'a Expr<'a> {
    arena.alloc(Expr::While { cond, body })
}

pub fn expr_stmt<'a>(expr: &'a Expr<'a>) -> Stmt<'a> {
    Stmt::Expression(expr)
}

pub fn var<'a>(name: &'a str, value: &'a Expr<'a>) -> Stmt<'a> {
    Stmt::VarDeclaration { name, value }
}

pub fn assign<'a>(name: &'a str, value: &'a Expr<'a>) -> Stmt<'a> {
    Stmt::Assignment { name, value }
}

pub fn ret<'a>(value: &'a Expr<'a>) -> Stmt<'a> {
    Stmt::Return(value)
}
