//! Bytecode compiler implementation.
//!
//! A single recursive pass over the AST. Every expression's bytecode
//! leaves the expression's value on top of the operand stack; statement
//! forms leave the stack as they found it (expression statements append a
//! `Pop` behind the inner expression).
//!
//! Control flow is lowered with back-patching: jumps are emitted with a
//! placeholder operand and rewritten in place once the target offset is
//! known. Function literals open a fresh compilation scope and symbol
//! frame; on exit the sealed instructions become a `CompiledFunction`
//! constant and a `Closure` instruction is emitted in the enclosing scope,
//! preceded by one load per captured free variable.

use tracing::trace;

use crate::ast::{Block, Expr, Literal, Program, Stmt};
use crate::compiler::{CompileError, Symbol, SymbolScope, SymbolTable};
use crate::vm::{make, Bytecode, CompiledFunction, Constant, Instructions, Op, BUILTINS};
use crate::{ToString, Vec};

/// Placeholder operand for jumps that are patched once their target is
/// known. The value is a debug aid only; patches are tracked by position.
const PLACEHOLDER_TARGET: usize = 9999;

/// One function body under construction: its growing instruction buffer
/// plus a two-deep memo of what was last emitted, which is all the peephole
/// edits need.
#[derive(Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Op,
    position: usize,
}

/// The bytecode compiler.
///
/// One instance compiles one program: construct, [`compile`](Self::compile),
/// then [`finalize`](Self::finalize). After an error the instance is
/// mid-flight (the scope stack may be partially pushed) and must be
/// discarded.
pub struct Compiler<'a> {
    constants: Vec<Constant>,
    symbols: SymbolTable<'a>,
    scopes: Vec<CompilationScope>,
}

impl<'a> Compiler<'a> {
    /// A compiler seeded with the standard builtin table.
    pub fn new() -> Self {
        Self::with_builtins(BUILTINS)
    }

    /// A compiler seeded with a caller-supplied builtin table. The slice
    /// order defines the `GetBuiltin` indices.
    pub fn with_builtins(builtins: &[&'a str]) -> Self {
        let mut symbols = SymbolTable::new();
        for (index, name) in builtins.iter().enumerate() {
            symbols.define_builtin(index, name);
        }

        Compiler {
            constants: Vec::new(),
            symbols,
            scopes: crate::vec![CompilationScope::default()],
        }
    }

    /// Compile a whole program into the root scope.
    pub fn compile(&mut self, program: &'a Program<'a>) -> Result<(), CompileError> {
        for stmt in program.statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    /// Package the root scope's instructions and the constant pool.
    ///
    /// Only meaningful once every function scope has been left; nested
    /// bodies are reachable through their `Constant::Function` entries.
    pub fn finalize(mut self) -> Bytecode {
        debug_assert_eq!(self.scopes.len(), 1, "finalize with open function scopes");
        let root = self.scopes.pop().expect("the root scope always exists");

        Bytecode {
            instructions: root.instructions,
            constants: self.constants,
        }
    }

    fn compile_stmt(&mut self, stmt: &'a Stmt<'a>) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.compile_expr(expr)?;
                self.emit(Op::Pop, &[]);
            }
            Stmt::VarDeclaration { name, value } => {
                self.compile_expr(value)?;
                let symbol = self.symbols.define(name);
                self.emit_store(&symbol);
            }
            Stmt::Assignment { name, value } => {
                let symbol = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.to_string()))?;
                self.compile_expr(value)?;
                self.emit_store(&symbol);
            }
            Stmt::Return(value) => {
                if self.scopes.len() == 1 {
                    return Err(CompileError::ReturnInRootScope);
                }
                self.compile_expr(value)?;
                self.emit(Op::ReturnValue, &[]);
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &'a Expr<'a>) -> Result<(), CompileError> {
        match expr {
            Expr::Literal(literal) => self.compile_literal(literal),
            Expr::Ident(name) => {
                let symbol = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.to_string()))?;
                self.load_symbol(&symbol);
                Ok(())
            }
            Expr::Binary { op, left, right } => self.compile_binary(op, left, right),
            Expr::If {
                cond,
                consequence,
                else_if,
                alternative,
            } => self.compile_if(cond, consequence, *else_if, *alternative),
            Expr::While { cond, body } => self.compile_while(cond, body),
            Expr::Array(elements) => {
                for element in *elements {
                    self.compile_expr(element)?;
                }
                self.emit(Op::Array, &[elements.len()]);
                Ok(())
            }
            Expr::Hash(pairs) => {
                // Pairs compile in source order; the parser delivers them
                // as an ordered list.
                for (key, value) in *pairs {
                    self.compile_expr(key)?;
                    self.compile_expr(value)?;
                }
                self.emit(Op::Hash, &[pairs.len() * 2]);
                Ok(())
            }
            Expr::Index { value, index } => {
                self.compile_expr(value)?;
                self.compile_expr(index)?;
                self.emit(Op::Index, &[]);
                Ok(())
            }
            Expr::Lambda { params, body } => self.compile_lambda(params, body),
            Expr::Call { callable, args } => {
                self.compile_expr(callable)?;
                for arg in *args {
                    self.compile_expr(arg)?;
                }
                self.emit(Op::Call, &[args.len()]);
                Ok(())
            }
        }
    }

    fn compile_literal(&mut self, literal: &Literal<'a>) -> Result<(), CompileError> {
        match literal {
            Literal::Int(value) => {
                let index = self.add_constant(Constant::Int(*value));
                self.emit(Op::Constant, &[index]);
            }
            Literal::Str(value) => {
                let index = self.add_constant(Constant::Str(value.to_string()));
                self.emit(Op::Constant, &[index]);
            }
            Literal::Bool(true) => {
                self.emit(Op::True, &[]);
            }
            Literal::Bool(false) => {
                self.emit(Op::False, &[]);
            }
            Literal::Null => {
                self.emit(Op::Null, &[]);
            }
        }
        Ok(())
    }

    fn compile_binary(
        &mut self,
        op: &'a str,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    ) -> Result<(), CompileError> {
        // The one desugaring the compiler performs: `a < b` becomes
        // `b > a`, so the instruction set needs no less-than opcode.
        if op == "<" {
            self.compile_expr(right)?;
            self.compile_expr(left)?;
            self.emit(Op::GreaterThan, &[]);
            return Ok(());
        }

        self.compile_expr(left)?;
        self.compile_expr(right)?;

        match op {
            "+" => self.emit(Op::Add, &[]),
            "-" => self.emit(Op::Sub, &[]),
            "*" => self.emit(Op::Mul, &[]),
            "/" => self.emit(Op::Div, &[]),
            "==" => self.emit(Op::Equals, &[]),
            "!=" => self.emit(Op::NotEquals, &[]),
            ">" => self.emit(Op::GreaterThan, &[]),
            _ => return Err(CompileError::UnknownOperator(op.to_string())),
        };

        Ok(())
    }

    fn compile_if(
        &mut self,
        cond: &'a Expr<'a>,
        consequence: &'a Block<'a>,
        else_if: Option<&'a Expr<'a>>,
        alternative: Option<&'a Block<'a>>,
    ) -> Result<(), CompileError> {
        self.compile_expr(cond)?;

        let jump_not_true_pos = self.emit(Op::JumpIfNotTrue, &[PLACEHOLDER_TARGET]);

        self.compile_block(consequence)?;
        if self.last_instruction_is(Op::Pop) {
            // A block's value must survive as the if-expression's value.
            self.remove_last_pop();
        }

        let jump_pos = self.emit(Op::Jump, &[PLACEHOLDER_TARGET]);

        let after_consequence = self.current_instructions().len();
        self.change_operand(jump_not_true_pos, after_consequence);

        if let Some(else_if) = else_if {
            self.compile_expr(else_if)?;
            if self.last_instruction_is(Op::Pop) {
                self.remove_last_pop();
            }
        } else if let Some(alternative) = alternative {
            self.compile_block(alternative)?;
            if self.last_instruction_is(Op::Pop) {
                self.remove_last_pop();
            }
        } else {
            // The if-expression has a value even when the condition fails.
            self.emit(Op::Null, &[]);
        }

        let after_alternative = self.current_instructions().len();
        self.change_operand(jump_pos, after_alternative);

        Ok(())
    }

    fn compile_while(
        &mut self,
        cond: &'a Expr<'a>,
        body: &'a Block<'a>,
    ) -> Result<(), CompileError> {
        let loop_start = self.current_instructions().len();

        self.compile_expr(cond)?;
        let jump_not_true_pos = self.emit(Op::JumpIfNotTrue, &[PLACEHOLDER_TARGET]);

        self.compile_block(body)?;
        self.emit(Op::Jump, &[loop_start]);

        let after_body = self.current_instructions().len();
        self.change_operand(jump_not_true_pos, after_body);

        self.emit(Op::Null, &[]);

        Ok(())
    }

    fn compile_lambda(
        &mut self,
        params: &'a [&'a str],
        body: &'a Block<'a>,
    ) -> Result<(), CompileError> {
        self.enter_scope();

        // Parameters occupy the first frame slots in declaration order.
        for param in params {
            self.symbols.define(param);
        }

        self.compile_block(body)?;

        // The final expression of a function is implicitly returned.
        if self.last_instruction_is(Op::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Op::ReturnValue) && !self.last_instruction_is(Op::Return) {
            self.emit(Op::Return, &[]);
        }

        let free_symbols: Vec<Symbol<'a>> = self.symbols.free_symbols().to_vec();
        let num_locals = self.symbols.num_definitions();
        let instructions = self.leave_scope();

        // Push the captured values in capture order; the VM pops them into
        // the closure's free-variable array.
        for symbol in &free_symbols {
            self.load_symbol(symbol);
        }

        let function_index = self.add_constant(Constant::Function(CompiledFunction {
            instructions,
            num_locals,
            num_parameters: params.len(),
        }));
        self.emit(Op::Closure, &[function_index, free_symbols.len()]);

        Ok(())
    }

    fn compile_block(&mut self, block: &'a Block<'a>) -> Result<(), CompileError> {
        for stmt in block.statements {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn load_symbol(&mut self, symbol: &Symbol<'a>) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Op::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Op::GetFree, &[symbol.index]),
        };
    }

    fn emit_store(&mut self, symbol: &Symbol<'a>) {
        if symbol.scope == SymbolScope::Global {
            self.emit(Op::SetGlobal, &[symbol.index]);
        } else {
            self.emit(Op::SetLocal, &[symbol.index]);
        }
    }

    // === Constant pool ===

    /// Intern a constant and return its pool index. The pool is
    /// append-only, so returned indices stay valid for the whole
    /// compilation.
    fn add_constant(&mut self, constant: Constant) -> usize {
        self.constants.push(constant);
        self.constants.len() - 1
    }

    // === Instruction emission ===

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.add_instruction(&instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn add_instruction(&mut self, instruction: &[u8]) -> usize {
        let scope = self.current_scope_mut();
        let position = scope.instructions.len();
        scope.instructions.push_bytes(instruction);
        position
    }

    fn set_last_instruction(&mut self, opcode: Op, position: usize) {
        let scope = self.current_scope_mut();
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    fn last_instruction_is(&self, opcode: Op) -> bool {
        self.current_scope()
            .last_instruction
            .is_some_and(|last| last.opcode == opcode)
    }

    /// Drop a trailing `Pop` and restore the previous emission memo.
    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last_instruction {
            scope.instructions.0.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
        }
    }

    /// Overwrite the instruction at `position` in place. The replacement
    /// must have the same length as the instruction it replaces.
    fn replace_instruction(&mut self, position: usize, instruction: &[u8]) {
        let bytes = &mut self.current_scope_mut().instructions.0;
        bytes[position..position + instruction.len()].copy_from_slice(instruction);
    }

    /// Re-encode the instruction at `position` with its existing opcode and
    /// a new single operand; this is how jump placeholders are patched.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let byte = self.current_instructions().as_slice()[position];
        let op = Op::from_byte(byte).expect("patch site does not begin an instruction");

        trace!(position, operand, "patching operand");
        let instruction = make(op, &[operand]);
        self.replace_instruction(position, &instruction);
    }

    /// Turn a trailing `Pop` into `ReturnValue` (both are one byte).
    fn replace_last_pop_with_return(&mut self) {
        let position = self
            .current_scope()
            .last_instruction
            .expect("no trailing instruction to replace")
            .position;

        let instruction = make(Op::ReturnValue, &[]);
        self.replace_instruction(position, &instruction);
        self.current_scope_mut().last_instruction = Some(EmittedInstruction {
            opcode: Op::ReturnValue,
            position,
        });
    }

    // === Scope stack ===

    fn enter_scope(&mut self) {
        trace!(depth = self.scopes.len() + 1, "entering function scope");
        self.scopes.push(CompilationScope::default());
        self.symbols.enter();
    }

    /// Seal and return the innermost scope's instructions; its symbol
    /// frame is discarded with it.
    fn leave_scope(&mut self) -> Instructions {
        trace!(depth = self.scopes.len() - 1, "leaving function scope");
        let scope = self.scopes.pop().expect("leave_scope without enter_scope");
        self.symbols.leave();
        scope.instructions
    }

    fn current_instructions(&self) -> &Instructions {
        &self.current_scope().instructions
    }

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().expect("the root scope always exists")
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes
            .last_mut()
            .expect("the root scope always exists")
    }
}

impl<'a> Default for Compiler<'a> {
    fn default() -> Self {
        Self::new()
    }
}
