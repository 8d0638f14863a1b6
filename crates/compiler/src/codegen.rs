//! Native x86-64 code generation (System-V, NASM syntax)
//!
//! Emits assembly as text into a growing line buffer; the driver hands the
//! result to `nasm` and `ld`. Evaluation is stack-machine style: every
//! expression pushes its result, binary operators pop the right operand into
//! `rbx` and the left into `rax`, compute into `rax`, and push again.
//!
//! Each function gets a fixed 256-byte frame. Up to six integer/pointer
//! parameters are spilled from `rdi, rsi, rdx, rcx, r8, r9` into 8-byte
//! slots; every local occupies one 8-byte slot regardless of its nominal
//! size. `main` is emitted under the `_start` entry symbol and exits through
//! the `exit` syscall with its return value in `rdi`.
//!
//! The hand-written runtime prologue (`print_int`, `putchar`, `getchar`,
//! `ignis_alloc`, `ignis_free`) uses exactly three syscalls: `read`,
//! `write`, and `exit`. The heap is a one-MiB static region in `.bss`
//! served by a bump allocator; `ignis_free` is a no-op.

use crate::ast::{Block, Decl, Expr, FunctionDecl, Program, Stmt, StructDef, Ty};
use crate::diagnostics::{Level, Reporter};
use crate::lexer::{Token, TokenKind};
use std::collections::HashMap;

/// Size of the static heap served by `ignis_alloc`.
const HEAP_SIZE: usize = 1 << 20;

/// Fixed per-function frame size. Locals and spilled parameters beyond this
/// are rejected with E018.
const FRAME_SIZE: i64 = 256;

const ARG_REGISTERS: [&str; 6] = ["rdi", "rsi", "rdx", "rcx", "r8", "r9"];

#[derive(Debug, Clone)]
struct LocalVar {
    ty: Ty,
    offset: i64,
}

#[derive(Debug, Clone)]
struct FieldInfo {
    ty: Ty,
    offset: i64,
}

/// Byte layout of a struct: packed fields in declaration order.
#[derive(Debug, Clone)]
pub struct StructLayout {
    fields: HashMap<String, FieldInfo>,
    size: i64,
}

pub struct CodeGen<'a> {
    reporter: &'a Reporter,
    asm: Vec<String>,
    data: Vec<String>,
    locals: HashMap<String, LocalVar>,
    structs: HashMap<String, StructLayout>,
    functions: HashMap<String, Ty>,
    consts: HashMap<String, (Ty, Expr)>,
    current_function: String,
    stack_index: i64,
    label_counter: usize,
    /// Innermost-last stack of (continue target, end target)
    loop_labels: Vec<(String, String)>,
    strings: HashMap<String, String>,
    string_counter: usize,
}

impl<'a> CodeGen<'a> {
    pub fn new(reporter: &'a Reporter) -> Self {
        CodeGen {
            reporter,
            asm: Vec::new(),
            data: Vec::new(),
            locals: HashMap::new(),
            structs: HashMap::new(),
            functions: HashMap::new(),
            consts: HashMap::new(),
            current_function: String::new(),
            stack_index: 0,
            label_counter: 0,
            loop_labels: Vec::new(),
            strings: HashMap::new(),
            string_counter: 0,
        }
    }

    pub fn generate(&mut self, program: &Program) -> Result<String, String> {
        // Struct layouts and top-level tables first; declaration order
        // matters for struct-in-struct sizes.
        for decl in &program.decls {
            match decl {
                Decl::Struct(def) => self.register_struct(def)?,
                Decl::Const(c) => {
                    self.consts.insert(c.name.clone(), (c.ty.clone(), c.value.clone()));
                }
                Decl::Function(f) => {
                    self.functions.insert(f.name.clone(), f.return_ty.clone());
                }
            }
        }

        for decl in &program.decls {
            if let Decl::Function(f) = decl {
                self.gen_function(f)?;
            }
        }

        let mut out = Vec::new();
        out.push("section .data".to_string());
        out.push("  heap_next dq ignis_heap".to_string());
        out.append(&mut self.data);
        out.push(String::new());
        out.push("section .bss".to_string());
        out.push("  print_buf resb 32".to_string());
        out.push(format!("  ignis_heap resb {}", HEAP_SIZE));
        out.push(String::new());
        out.push("section .text".to_string());
        out.push("global _start".to_string());
        self.emit_print_int(&mut out);
        self.emit_putchar(&mut out);
        self.emit_getchar(&mut out);
        self.emit_alloc(&mut out);
        self.emit_free(&mut out);
        out.append(&mut self.asm);
        Ok(out.join("\n"))
    }

    fn emit(&mut self, line: impl Into<String>) {
        self.asm.push(line.into());
    }

    fn err(&self, code: &str, message: &str, token: &Token) -> String {
        self.reporter.render(Level::Error, code, message, token.line, token.column)
    }

    fn new_label(&mut self) -> usize {
        self.label_counter += 1;
        self.label_counter
    }

    /// `push imm` takes a sign-extended 32-bit immediate; wider literals
    /// travel through rax.
    fn push_immediate(&mut self, value: i64) {
        if i32::try_from(value).is_ok() {
            self.emit(format!("  push {}", value));
        } else {
            self.emit(format!("  mov rax, {}", value));
            self.emit("  push rax");
        }
    }

    // ------------------------------------------------------------------
    // Layout tables
    // ------------------------------------------------------------------

    fn register_struct(&mut self, def: &StructDef) -> Result<(), String> {
        let mut fields = HashMap::new();
        let mut offset = 0;
        for field in &def.fields {
            let size = self.type_size(&field.ty, &field.token)?;
            fields.insert(field.name.clone(), FieldInfo { ty: field.ty.clone(), offset });
            offset += size;
        }
        self.structs.insert(def.name.clone(), StructLayout { fields, size: offset });
        Ok(())
    }

    /// Size of a type in bytes: 8 for pointers and `int`, 1 for `char`, the
    /// aggregate size for structs.
    fn type_size(&self, ty: &Ty, token: &Token) -> Result<i64, String> {
        if ty.is_pointer() {
            return Ok(8);
        }
        match &ty.base {
            crate::ast::BaseTy::Int => Ok(8),
            crate::ast::BaseTy::Char => Ok(1),
            crate::ast::BaseTy::Struct(name) => match self.structs.get(name) {
                Some(layout) => Ok(layout.size),
                None => Err(self.err("E006", &format!("Unknown type '{}'", name), token)),
            },
            crate::ast::BaseTy::Void => {
                Err(self.err("E006", "Unknown type 'void'", token))
            }
        }
    }

    // ------------------------------------------------------------------
    // Type reconstruction
    //
    // The checker's tables are not shared; the code generator rebuilds the
    // types it needs from its own tables.
    // ------------------------------------------------------------------

    fn expr_ty(&self, expr: &Expr) -> Result<Ty, String> {
        match expr {
            Expr::Int { .. } => Ok(Ty::int()),
            Expr::Char { .. } => Ok(Ty::char_()),
            Expr::Str { .. } => Ok(Ty::char_ptr()),
            Expr::Var { name, token } => {
                if let Some(var) = self.locals.get(name) {
                    return Ok(var.ty.clone());
                }
                if let Some((ty, _)) = self.consts.get(name) {
                    return Ok(ty.clone());
                }
                Err(self.err("E004", &format!("Undeclared variable '{}'", name), token))
            }
            Expr::Unary { op, operand } => {
                let base = self.expr_ty(operand)?;
                match op.kind {
                    TokenKind::KwAddr => Ok(base.pointer_to()),
                    TokenKind::KwDeref => base
                        .pointee()
                        .ok_or_else(|| self.err("E005", "Cannot dereference a non-pointer type", op)),
                    _ => Ok(Ty::int()),
                }
            }
            Expr::Binary { op, left, right } => {
                let lt = self.expr_ty(left)?;
                let rt = self.expr_ty(right)?;
                match op.kind {
                    TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                        if lt.is_pointer() && !rt.is_pointer() {
                            Ok(lt)
                        } else if rt.is_pointer() && !lt.is_pointer() {
                            Ok(rt)
                        } else {
                            Ok(Ty::int())
                        }
                    }
                    _ => Ok(Ty::int()),
                }
            }
            Expr::Call { name, token, .. } => match name.as_str() {
                "print" | "putchar" | "getchar" => Ok(Ty::int()),
                _ => self
                    .functions
                    .get(name)
                    .cloned()
                    .ok_or_else(|| self.err("E004", &format!("Unknown function '{}'", name), token)),
            },
            Expr::Member { base, field, field_token } => {
                let info = self.member_info(base, field, field_token)?;
                Ok(info.ty)
            }
            Expr::Alloc { .. } => Ok(Ty::char_ptr()),
            Expr::New { ty, .. } => Ok(ty.pointer_to()),
            Expr::Free { .. } => Ok(Ty::void()),
            Expr::Block(block) => match &block.tail {
                Some(tail) => self.expr_ty(tail),
                None => Ok(Ty::void()),
            },
            Expr::If { then_block, else_block, .. } => {
                if else_block.is_none() {
                    return Ok(Ty::void());
                }
                match &then_block.tail {
                    Some(tail) => self.expr_ty(tail),
                    None => Ok(Ty::void()),
                }
            }
        }
    }

    fn member_info(&self, base: &Expr, field: &str, field_token: &Token) -> Result<FieldInfo, String> {
        let base_ty = self.expr_ty(base)?;
        let Some(struct_name) = base_ty.struct_name() else {
            return Err(self.err("E006", &format!("Unknown struct type '{}'", base_ty), base.token()));
        };
        let Some(layout) = self.structs.get(struct_name) else {
            return Err(self.err("E006", &format!("Unknown struct type '{}'", struct_name), base.token()));
        };
        match layout.fields.get(field) {
            Some(info) => Ok(info.clone()),
            None => Err(self.err(
                "E007",
                &format!("Struct '{}' has no field '{}'", struct_name, field),
                field_token,
            )),
        }
    }

    /// Whether evaluating this expression leaves a value on the machine
    /// stack. `free` and valueless `if`/blocks do not push.
    fn pushes_value(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Free { .. } => false,
            Expr::Block(block) => match &block.tail {
                Some(tail) => self.pushes_value(tail),
                None => false,
            },
            Expr::If { then_block, else_block, .. } => {
                else_block.is_some()
                    && match &then_block.tail {
                        Some(tail) => self.pushes_value(tail),
                        None => false,
                    }
            }
            _ => true,
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn gen_function(&mut self, decl: &FunctionDecl) -> Result<(), String> {
        self.current_function = decl.name.clone();
        self.locals.clear();
        self.stack_index = 0;

        let label = if decl.name == "main" { "_start" } else { decl.name.as_str() };
        self.emit(format!("{}:", label));
        self.emit("  push rbp");
        self.emit("  mov rbp, rsp");
        self.emit(format!("  sub rsp, {}", FRAME_SIZE));

        if decl.params.len() > ARG_REGISTERS.len() {
            let message = format!("Too many parameters in function '{}'", decl.name);
            return Err(self.err("E012", &message, &decl.name_token));
        }
        for (i, param) in decl.params.iter().enumerate() {
            let offset = self.alloc_slot(&param.token)?;
            self.locals.insert(param.name.clone(), LocalVar { ty: param.ty.clone(), offset });
            self.emit(format!("  mov [rbp{}], {}", offset, ARG_REGISTERS[i]));
        }

        self.gen_block(&decl.body)?;

        // Move the trailing block value into rax; otherwise zero it so a
        // body without return exits 0.
        if decl.body.tail.as_ref().is_some_and(|t| self.pushes_value(t)) {
            self.emit("  pop rax");
        } else if !matches!(decl.body.stmts.last(), Some(Stmt::Return { .. })) {
            self.emit("  xor rax, rax");
        }

        self.emit(format!("L_ret_{}:", decl.name));
        self.emit("  mov rsp, rbp");
        self.emit("  pop rbp");
        if decl.name == "main" {
            self.emit("  mov rdi, rax");
            self.emit("  mov rax, 60");
            self.emit("  syscall");
        } else {
            self.emit("  ret");
        }
        self.emit("");
        Ok(())
    }

    /// Reserve one 8-byte frame slot and return its rbp offset.
    fn alloc_slot(&mut self, token: &Token) -> Result<i64, String> {
        self.stack_index -= 8;
        if -self.stack_index > FRAME_SIZE {
            let message = format!(
                "Function '{}' needs more than {} bytes of locals",
                self.current_function, FRAME_SIZE
            );
            return Err(self.err("E018", &message, token));
        }
        Ok(self.stack_index)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn gen_block(&mut self, block: &Block) -> Result<(), String> {
        let saved_locals = self.locals.clone();
        let saved_index = self.stack_index;
        for stmt in &block.stmts {
            self.gen_stmt(stmt)?;
        }
        if let Some(tail) = &block.tail {
            self.gen_expr(tail)?;
        }
        self.locals = saved_locals;
        self.stack_index = saved_index;
        Ok(())
    }

    /// A block in statement position (loop body): a trailing value would
    /// otherwise accumulate on the stack every iteration.
    fn gen_block_stmt(&mut self, block: &Block) -> Result<(), String> {
        self.gen_block(block)?;
        if block.tail.as_ref().is_some_and(|t| self.pushes_value(t)) {
            self.emit("  add rsp, 8");
        }
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), String> {
        match stmt {
            Stmt::VarDecl { ty, name, init, name_token, .. } => {
                let offset = self.alloc_slot(name_token)?;
                let size = self.type_size(ty, name_token)?;
                self.locals.insert(name.clone(), LocalVar { ty: ty.clone(), offset });
                if let Some(init) = init {
                    let init_ty = self.expr_ty(init)?;
                    self.gen_expr(init)?;
                    if init_ty.is_struct_value() {
                        self.emit("  pop rsi");
                        self.emit(format!("  lea rdi, [rbp{}]", offset));
                        self.emit(format!("  mov rcx, {}", size));
                        self.emit("  rep movsb");
                    } else {
                        self.emit("  pop rax");
                        if size == 1 {
                            self.emit(format!("  mov [rbp{}], al", offset));
                        } else {
                            self.emit(format!("  mov [rbp{}], rax", offset));
                        }
                    }
                }
                Ok(())
            }
            Stmt::Assign { target, value, op_token } => self.gen_assign(target, value, op_token),
            Stmt::Return { value, .. } => {
                match value {
                    Some(value) => {
                        self.gen_expr(value)?;
                        self.emit("  pop rax");
                    }
                    None => self.emit("  xor rax, rax"),
                }
                self.emit(format!("  jmp L_ret_{}", self.current_function));
                Ok(())
            }
            Stmt::While { cond, body, .. } => {
                let n = self.new_label();
                let start = format!("L_while_start_{}", n);
                let end = format!("L_while_end_{}", n);
                self.loop_labels.push((start.clone(), end.clone()));
                self.emit(format!("{}:", start));
                self.gen_expr(cond)?;
                self.emit("  pop rax");
                self.emit("  cmp rax, 0");
                self.emit(format!("  je {}", end));
                self.gen_block_stmt(body)?;
                self.emit(format!("  jmp {}", start));
                self.emit(format!("{}:", end));
                self.loop_labels.pop();
                Ok(())
            }
            Stmt::Loop { body, .. } => {
                let n = self.new_label();
                let start = format!("L_loop_start_{}", n);
                let end = format!("L_loop_end_{}", n);
                self.loop_labels.push((start.clone(), end.clone()));
                self.emit(format!("{}:", start));
                self.gen_block_stmt(body)?;
                self.emit(format!("  jmp {}", start));
                self.emit(format!("{}:", end));
                self.loop_labels.pop();
                Ok(())
            }
            Stmt::For { init, cond, step, body, .. } => {
                let saved_locals = self.locals.clone();
                let saved_index = self.stack_index;
                let n = self.new_label();
                let start = format!("L_for_start_{}", n);
                let continue_label = format!("L_for_continue_{}", n);
                let end = format!("L_for_end_{}", n);
                if let Some(init) = init {
                    self.gen_stmt(init)?;
                }
                self.emit(format!("{}:", start));
                if let Some(cond) = cond {
                    self.gen_expr(cond)?;
                    self.emit("  pop rax");
                    self.emit("  cmp rax, 0");
                    self.emit(format!("  je {}", end));
                }
                self.loop_labels.push((continue_label.clone(), end.clone()));
                self.gen_block_stmt(body)?;
                self.loop_labels.pop();
                self.emit(format!("{}:", continue_label));
                if let Some(step) = step {
                    self.gen_stmt(step)?;
                }
                self.emit(format!("  jmp {}", start));
                self.emit(format!("{}:", end));
                self.locals = saved_locals;
                self.stack_index = saved_index;
                Ok(())
            }
            Stmt::Break { token } => match self.loop_labels.last() {
                Some((_, end)) => {
                    let end = end.clone();
                    self.emit(format!("  jmp {}", end));
                    Ok(())
                }
                None => Err(self.err("E013", "'break' outside of a loop", token)),
            },
            Stmt::Continue { token } => match self.loop_labels.last() {
                Some((continue_label, _)) => {
                    let continue_label = continue_label.clone();
                    self.emit(format!("  jmp {}", continue_label));
                    Ok(())
                }
                None => Err(self.err("E014", "'continue' outside of a loop", token)),
            },
            Stmt::Expr(expr) => {
                self.gen_expr(expr)?;
                if self.pushes_value(expr) {
                    self.emit("  add rsp, 8");
                }
                Ok(())
            }
        }
    }

    fn gen_assign(&mut self, target: &Expr, value: &Expr, op_token: &Token) -> Result<(), String> {
        let target_ty = self.expr_ty(target)?;

        // Whole-struct copies go through rep movsb.
        if target_ty.is_struct_value() {
            let size = self.type_size(&target_ty, op_token)?;
            self.gen_expr(value)?;
            self.gen_lvalue(target)?;
            self.emit("  pop rdi");
            self.emit("  pop rsi");
            self.emit(format!("  mov rcx, {}", size));
            self.emit("  rep movsb");
            return Ok(());
        }

        let size = self.type_size(&target_ty, op_token)?;
        self.gen_expr(value)?;
        match target {
            Expr::Member { base, field, field_token } => {
                self.gen_member(base, field, field_token, true)?;
                self.emit("  pop rbx");
                self.emit("  pop rax");
                if size == 1 {
                    self.emit("  mov [rbx], al");
                } else {
                    self.emit("  mov [rbx], rax");
                }
                Ok(())
            }
            Expr::Unary { op, operand } if op.kind == TokenKind::KwDeref => {
                self.gen_expr(operand)?;
                self.emit("  pop rbx");
                self.emit("  pop rax");
                if size == 1 {
                    self.emit("  mov [rbx], al");
                } else {
                    self.emit("  mov [rbx], rax");
                }
                Ok(())
            }
            Expr::Var { name, token } => {
                let Some(var) = self.locals.get(name) else {
                    return Err(self.err("E004", &format!("Undeclared variable '{}'", name), token));
                };
                let offset = var.offset;
                self.emit("  pop rax");
                if size == 1 {
                    self.emit(format!("  mov [rbp{}], al", offset));
                } else {
                    self.emit(format!("  mov [rbp{}], rax", offset));
                }
                Ok(())
            }
            other => Err(self.err("E010", "Invalid left-hand side in assignment", other.token())),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Push the address of a place: a variable slot, a member location, or
    /// the target of a dereference.
    fn gen_lvalue(&mut self, expr: &Expr) -> Result<(), String> {
        match expr {
            Expr::Var { name, token } => {
                let Some(var) = self.locals.get(name) else {
                    return Err(self.err("E004", &format!("Undeclared variable '{}'", name), token));
                };
                let offset = var.offset;
                self.emit(format!("  lea rax, [rbp{}]", offset));
                self.emit("  push rax");
                Ok(())
            }
            Expr::Member { base, field, field_token } => self.gen_member(base, field, field_token, true),
            Expr::Unary { op, operand } if op.kind == TokenKind::KwDeref => self.gen_expr(operand),
            other => Err(self.err(
                "E011",
                "'addr' can only be used on variables or struct members",
                other.token(),
            )),
        }
    }

    fn gen_member(
        &mut self,
        base: &Expr,
        field: &str,
        field_token: &Token,
        lvalue: bool,
    ) -> Result<(), String> {
        let base_ty = self.expr_ty(base)?;
        let info = self.member_info(base, field, field_token)?;
        // One pointer level dereferences implicitly: the pointer's value is
        // already the struct's address.
        if base_ty.is_pointer() {
            self.gen_expr(base)?;
        } else {
            self.gen_lvalue(base)?;
        }
        self.emit("  pop rax");
        if info.offset != 0 {
            self.emit(format!("  add rax, {}", info.offset));
        }
        if !lvalue && !info.ty.is_struct_value() {
            let size = self.type_size(&info.ty, field_token)?;
            if size == 1 {
                self.emit("  movzx rax, byte [rax]");
            } else {
                self.emit("  mov rax, [rax]");
            }
        }
        self.emit("  push rax");
        Ok(())
    }

    fn gen_expr(&mut self, expr: &Expr) -> Result<(), String> {
        match expr {
            Expr::Int { value, .. } => {
                self.push_immediate(*value);
                Ok(())
            }
            Expr::Char { value, .. } => {
                self.push_immediate(*value);
                Ok(())
            }
            Expr::Str { value, .. } => {
                let label = self.intern_string(value);
                self.emit(format!("  push {}", label));
                Ok(())
            }
            Expr::Var { name, token } => {
                if let Some(var) = self.locals.get(name) {
                    let offset = var.offset;
                    let ty = var.ty.clone();
                    if ty.is_struct_value() {
                        // A struct value is handled by address.
                        self.emit(format!("  lea rax, [rbp{}]", offset));
                    } else if self.type_size(&ty, token)? == 1 {
                        self.emit(format!("  movzx rax, byte [rbp{}]", offset));
                    } else {
                        self.emit(format!("  mov rax, [rbp{}]", offset));
                    }
                    self.emit("  push rax");
                    return Ok(());
                }
                // Constants expand their initializer inline.
                if let Some((_, value)) = self.consts.get(name) {
                    let value = value.clone();
                    return self.gen_expr(&value);
                }
                Err(self.err("E004", &format!("Undeclared variable '{}'", name), token))
            }
            Expr::Binary { op, left, right } => self.gen_binary(op, left, right),
            Expr::Unary { op, operand } => self.gen_unary(op, operand),
            Expr::Call { name, args, token } => {
                if args.len() > ARG_REGISTERS.len() {
                    return Err(self.err("E012", "Too many arguments in function call", token));
                }
                // Evaluate the last argument first so the first ends up on
                // top for the register pops.
                for arg in args.iter().rev() {
                    self.gen_expr(arg)?;
                }
                for register in ARG_REGISTERS.iter().take(args.len()) {
                    self.emit(format!("  pop {}", register));
                }
                let callee = match name.as_str() {
                    "print" => "print_int",
                    "main" => "_start",
                    other => other,
                };
                self.emit(format!("  call {}", callee));
                self.emit("  push rax");
                Ok(())
            }
            Expr::Member { base, field, field_token } => self.gen_member(base, field, field_token, false),
            Expr::Alloc { size, .. } => {
                self.gen_expr(size)?;
                self.emit("  pop rdi");
                self.emit("  call ignis_alloc");
                self.emit("  push rax");
                Ok(())
            }
            Expr::New { ty, token } => {
                let size = self.type_size(ty, token)?;
                self.emit(format!("  mov rdi, {}", size));
                self.emit("  call ignis_alloc");
                self.emit("  push rax");
                Ok(())
            }
            Expr::Free { operand, .. } => {
                self.gen_expr(operand)?;
                self.emit("  pop rdi");
                self.emit("  call ignis_free");
                Ok(())
            }
            Expr::Block(block) => self.gen_block(block),
            Expr::If { cond, then_block, else_block, .. } => {
                let n = self.new_label();
                let else_label = format!("L_else_{}", n);
                let end_label = format!("L_endif_{}", n);
                self.gen_expr(cond)?;
                self.emit("  pop rax");
                self.emit("  cmp rax, 0");
                match else_block {
                    Some(else_block) => {
                        self.emit(format!("  je {}", else_label));
                        self.gen_block(then_block)?;
                        self.emit(format!("  jmp {}", end_label));
                        self.emit(format!("{}:", else_label));
                        self.gen_block(else_block)?;
                    }
                    None => {
                        self.emit(format!("  je {}", end_label));
                        self.gen_block(then_block)?;
                    }
                }
                self.emit(format!("{}:", end_label));
                Ok(())
            }
        }
    }

    fn gen_unary(&mut self, op: &Token, operand: &Expr) -> Result<(), String> {
        match op.kind {
            TokenKind::KwAddr => {
                if !matches!(operand, Expr::Var { .. } | Expr::Member { .. }) {
                    return Err(self.err(
                        "E011",
                        "'addr' can only be used on variables or struct members",
                        operand.token(),
                    ));
                }
                self.gen_lvalue(operand)
            }
            TokenKind::KwDeref => {
                let ptr_ty = self.expr_ty(operand)?;
                let Some(pointee) = ptr_ty.pointee() else {
                    return Err(self.err("E005", "Cannot dereference a non-pointer type", op));
                };
                self.gen_expr(operand)?;
                // A dereferenced struct value is its address; scalars load.
                if !pointee.is_struct_value() {
                    self.emit("  pop rax");
                    if self.type_size(&pointee, op)? == 1 {
                        self.emit("  movzx rax, byte [rax]");
                    } else {
                        self.emit("  mov rax, [rax]");
                    }
                    self.emit("  push rax");
                }
                Ok(())
            }
            _ => {
                self.gen_expr(operand)?;
                self.emit("  pop rax");
                match op.kind {
                    TokenKind::KwBnot => self.emit("  not rax"),
                    TokenKind::KwNot => {
                        self.emit("  cmp rax, 0");
                        self.emit("  sete al");
                        self.emit("  movzx rax, al");
                    }
                    TokenKind::KwNnot => {
                        self.emit("  cmp rax, 0");
                        self.emit("  setne al");
                        self.emit("  movzx rax, al");
                    }
                    // The complemented bitwise complement cancels out.
                    TokenKind::KwNbnot => {}
                    TokenKind::Minus => self.emit("  neg rax"),
                    _ => {
                        return Err(self.err(
                            "E003",
                            &format!("Unsupported unary operator '{}'", op.text),
                            op,
                        ));
                    }
                }
                self.emit("  push rax");
                Ok(())
            }
        }
    }

    fn gen_binary(&mut self, op: &Token, left: &Expr, right: &Expr) -> Result<(), String> {
        match op.kind {
            TokenKind::KwAnd | TokenKind::KwNand => {
                let n = self.new_label();
                let false_label = format!("L_logic_false_{}", n);
                let end_label = format!("L_logic_end_{}", n);
                let (when_both, when_short) = if op.kind == TokenKind::KwNand { (0, 1) } else { (1, 0) };
                self.gen_expr(left)?;
                self.emit("  pop rax");
                self.emit("  cmp rax, 0");
                self.emit(format!("  je {}", false_label));
                self.gen_expr(right)?;
                self.emit("  pop rax");
                self.emit("  cmp rax, 0");
                self.emit(format!("  je {}", false_label));
                self.emit(format!("  mov rax, {}", when_both));
                self.emit(format!("  jmp {}", end_label));
                self.emit(format!("{}:", false_label));
                self.emit(format!("  mov rax, {}", when_short));
                self.emit(format!("{}:", end_label));
                self.emit("  push rax");
                return Ok(());
            }
            TokenKind::KwOr | TokenKind::KwNor => {
                let n = self.new_label();
                let true_label = format!("L_logic_true_{}", n);
                let end_label = format!("L_logic_end_{}", n);
                let (when_both, when_short) = if op.kind == TokenKind::KwNor { (1, 0) } else { (0, 1) };
                self.gen_expr(left)?;
                self.emit("  pop rax");
                self.emit("  cmp rax, 0");
                self.emit(format!("  jne {}", true_label));
                self.gen_expr(right)?;
                self.emit("  pop rax");
                self.emit("  cmp rax, 0");
                self.emit(format!("  jne {}", true_label));
                self.emit(format!("  mov rax, {}", when_both));
                self.emit(format!("  jmp {}", end_label));
                self.emit(format!("{}:", true_label));
                self.emit(format!("  mov rax, {}", when_short));
                self.emit(format!("{}:", end_label));
                self.emit("  push rax");
                return Ok(());
            }
            TokenKind::KwXor | TokenKind::KwXnor => {
                // Both sides always evaluate. The booleanized left spills to
                // the machine stack: evaluating the right may emit calls,
                // and no caller-saved register survives those.
                self.gen_expr(left)?;
                self.emit("  pop rax");
                self.emit("  cmp rax, 0");
                self.emit("  setne al");
                self.emit("  movzx rax, al");
                self.emit("  push rax");
                self.gen_expr(right)?;
                self.emit("  pop rax");
                self.emit("  cmp rax, 0");
                self.emit("  setne al");
                self.emit("  movzx rax, al");
                self.emit("  pop rbx");
                self.emit("  xor rax, rbx");
                if op.kind == TokenKind::KwXnor {
                    self.emit("  xor rax, 1");
                }
                self.emit("  push rax");
                return Ok(());
            }
            TokenKind::TypeEq => {
                // Folded at compile time from the static operand types; the
                // operands are never evaluated.
                let lt = self.expr_ty(left)?;
                let rt = self.expr_ty(right)?;
                let result = if lt == rt { 1 } else { 0 };
                self.emit(format!("  ; compile-time type check: {} === {}", lt, rt));
                self.emit(format!("  push {}", result));
                return Ok(());
            }
            _ => {}
        }

        let lt = self.expr_ty(left)?;
        let rt = self.expr_ty(right)?;

        self.gen_expr(left)?;
        self.gen_expr(right)?;
        self.emit("  pop rbx");
        self.emit("  pop rax");

        // Pointer arithmetic scales the integer operand by the pointee size.
        if matches!(op.kind, TokenKind::Plus | TokenKind::Minus) {
            if lt.is_pointer() && !rt.is_pointer() {
                let size = self.type_size(&lt.pointee().expect("pointer has a pointee"), op)?;
                if size > 1 {
                    self.emit(format!("  imul rbx, {}", size));
                }
            } else if rt.is_pointer() && !lt.is_pointer() {
                let size = self.type_size(&rt.pointee().expect("pointer has a pointee"), op)?;
                if size > 1 {
                    self.emit(format!("  imul rax, {}", size));
                }
            }
        }

        match op.kind {
            TokenKind::Plus => self.emit("  add rax, rbx"),
            TokenKind::Minus => self.emit("  sub rax, rbx"),
            TokenKind::Star => self.emit("  imul rax, rbx"),
            TokenKind::Slash => {
                self.emit("  cqo");
                self.emit("  idiv rbx");
            }
            TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq => {
                self.emit("  cmp rax, rbx");
                let setcc = match op.kind {
                    TokenKind::EqEq => "sete",
                    TokenKind::NotEq => "setne",
                    TokenKind::Less => "setl",
                    TokenKind::LessEq => "setle",
                    TokenKind::Greater => "setg",
                    _ => "setge",
                };
                self.emit(format!("  {} al", setcc));
                self.emit("  movzx rax, al");
            }
            TokenKind::KwBand | TokenKind::KwNband => self.emit("  and rax, rbx"),
            TokenKind::KwBor | TokenKind::KwNbor => self.emit("  or rax, rbx"),
            TokenKind::KwBxor | TokenKind::KwNbxor => self.emit("  xor rax, rbx"),
            _ => {
                return Err(self.err(
                    "E003",
                    &format!("Unsupported binary operator '{}'", op.text),
                    op,
                ));
            }
        }
        if matches!(op.kind, TokenKind::KwNband | TokenKind::KwNbor | TokenKind::KwNbxor) {
            self.emit("  not rax");
        }
        self.emit("  push rax");
        Ok(())
    }

    // ------------------------------------------------------------------
    // String literals
    // ------------------------------------------------------------------

    /// Intern a string literal into `.data`, deduplicated, NUL-terminated.
    fn intern_string(&mut self, value: &str) -> String {
        if let Some(label) = self.strings.get(value) {
            return label.clone();
        }
        let label = format!("L_str_{}", self.string_counter);
        self.string_counter += 1;
        self.data.push(format!("  {} db {}", label, nasm_string_bytes(value)));
        self.strings.insert(value.to_string(), label.clone());
        label
    }

    // ------------------------------------------------------------------
    // Hand-written runtime
    // ------------------------------------------------------------------

    /// Signed base-10 conversion into the BSS buffer, then one write.
    /// Returns its argument, including for the most negative value: `neg`
    /// leaves it unchanged and the unsigned division prints its magnitude.
    fn emit_print_int(&self, out: &mut Vec<String>) {
        out.extend(
            [
                "print_int:",
                "  push rdi",
                "  mov rax, rdi",
                "  lea rdi, [rel print_buf + 31]",
                "  mov byte [rdi], 10",
                "  mov r9, 1",
                "  mov r10, 10",
                "  xor r8, r8",
                "  test rax, rax",
                "  jns print_int_loop",
                "  mov r8, 1",
                "  neg rax",
                "print_int_loop:",
                "  xor rdx, rdx",
                "  div r10",
                "  add dl, '0'",
                "  dec rdi",
                "  mov [rdi], dl",
                "  inc r9",
                "  test rax, rax",
                "  jnz print_int_loop",
                "  test r8, r8",
                "  jz print_int_write",
                "  dec rdi",
                "  mov byte [rdi], '-'",
                "  inc r9",
                "print_int_write:",
                "  mov rax, 1",
                "  mov rsi, rdi",
                "  mov rdx, r9",
                "  mov rdi, 1",
                "  syscall",
                "  pop rax",
                "  ret",
                "",
            ]
            .map(String::from),
        );
    }

    fn emit_putchar(&self, out: &mut Vec<String>) {
        out.extend(
            [
                "putchar:",
                "  push rbp",
                "  mov rbp, rsp",
                "  sub rsp, 8",
                "  mov [rbp-8], dil",
                "  mov rax, 1",
                "  mov rdi, 1",
                "  lea rsi, [rbp-8]",
                "  mov rdx, 1",
                "  syscall",
                "  mov rsp, rbp",
                "  pop rbp",
                "  ret",
                "",
            ]
            .map(String::from),
        );
    }

    /// Reads one byte zero-extended; the buffer byte is cleared first so an
    /// EOF read returns 0 without a second syscall.
    fn emit_getchar(&self, out: &mut Vec<String>) {
        out.extend(
            [
                "getchar:",
                "  push rbp",
                "  mov rbp, rsp",
                "  sub rsp, 8",
                "  mov byte [rbp-8], 0",
                "  mov rax, 0",
                "  mov rdi, 0",
                "  lea rsi, [rbp-8]",
                "  mov rdx, 1",
                "  syscall",
                "  movzx rax, byte [rbp-8]",
                "  mov rsp, rbp",
                "  pop rbp",
                "  ret",
                "",
            ]
            .map(String::from),
        );
    }

    /// Bump allocator over the static heap; null when exhausted.
    fn emit_alloc(&self, out: &mut Vec<String>) {
        out.push("ignis_alloc:".to_string());
        out.push("  mov rax, [rel heap_next]".to_string());
        out.push("  lea rcx, [rax + rdi]".to_string());
        out.push(format!("  lea rdx, [rel ignis_heap + {}]", HEAP_SIZE));
        out.extend(
            [
                "  cmp rcx, rdx",
                "  ja ignis_alloc_fail",
                "  mov [rel heap_next], rcx",
                "  ret",
                "ignis_alloc_fail:",
                "  xor rax, rax",
                "  ret",
                "",
            ]
            .map(String::from),
        );
    }

    fn emit_free(&self, out: &mut Vec<String>) {
        out.extend(["ignis_free:", "  ret", ""].map(String::from));
    }
}

/// Render a string literal as NASM `db` operands: printable ASCII runs in
/// single quotes, everything else as numeric bytes, NUL terminator last.
fn nasm_string_bytes(value: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut run = String::new();
    for byte in value.bytes() {
        if (0x20..0x7f).contains(&byte) && byte != b'\'' {
            run.push(byte as char);
        } else {
            if !run.is_empty() {
                parts.push(format!("'{}'", run));
                run.clear();
            }
            parts.push(byte.to_string());
        }
    }
    if !run.is_empty() {
        parts.push(format!("'{}'", run));
    }
    parts.push("0".to_string());
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::Checker;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn compile(source: &str) -> Result<String, String> {
        let mut reporter = Reporter::new("test.ign", source);
        let program = {
            let lexer = Lexer::new(source, &reporter);
            let mut parser = Parser::new(lexer, &reporter)?;
            parser.parse()?
        };
        {
            let mut checker = Checker::new(&mut reporter);
            checker.check(&program)?;
        }
        let mut generator = CodeGen::new(&reporter);
        generator.generate(&program)
    }

    fn compile_ok(source: &str) -> String {
        compile(source).unwrap()
    }

    #[test]
    fn test_sections_and_entry() {
        let asm = compile_ok("int main() { return 0; }");
        assert!(asm.contains("section .data"));
        assert!(asm.contains("section .bss"));
        assert!(asm.contains("section .text"));
        assert!(asm.contains("global _start"));
        assert!(asm.contains("_start:"));
        assert!(asm.contains("  print_buf resb 32"));
    }

    #[test]
    fn test_main_exits_via_syscall() {
        let asm = compile_ok("int main() { return 0; }");
        assert!(asm.contains("  mov rdi, rax"));
        assert!(asm.contains("  mov rax, 60"));
        assert!(asm.contains("  syscall"));
    }

    #[test]
    fn test_function_prologue_and_fixed_frame() {
        let asm = compile_ok("int f() { return 1; } int main() { return f(); }");
        assert!(asm.contains("f:"));
        assert!(asm.contains("  push rbp"));
        assert!(asm.contains("  mov rbp, rsp"));
        assert!(asm.contains("  sub rsp, 256"));
        assert!(asm.contains("L_ret_f:"));
        assert!(asm.contains("  ret"));
    }

    #[test]
    fn test_arithmetic_instruction_selection() {
        let asm = compile_ok("int main() { return 2 + 3 * 4; }");
        assert!(asm.contains("  imul rax, rbx"));
        assert!(asm.contains("  add rax, rbx"));
        assert!(asm.contains("  pop rbx"));
    }

    #[test]
    fn test_division_uses_cqo_idiv() {
        let asm = compile_ok("int main() { return 7 / 2; }");
        assert!(asm.contains("  cqo"));
        assert!(asm.contains("  idiv rbx"));
    }

    #[test]
    fn test_comparison_uses_setcc() {
        let asm = compile_ok("int main() { return 3 > 2; }");
        assert!(asm.contains("  cmp rax, rbx"));
        assert!(asm.contains("  setg al"));
        assert!(asm.contains("  movzx rax, al"));
    }

    #[test]
    fn test_print_calls_runtime() {
        let asm = compile_ok("int main() { print(14); return 0; }");
        assert!(asm.contains("  call print_int"));
        // print's argument travels through rdi.
        assert!(asm.contains("  pop rdi"));
    }

    #[test]
    fn test_print_int_handles_sign() {
        let asm = compile_ok("int main() { return 0; }");
        assert!(asm.contains("  jns print_int_loop"));
        assert!(asm.contains("  neg rax"));
        assert!(asm.contains("  mov byte [rdi], '-'"));
    }

    #[test]
    fn test_parameters_spill_in_order() {
        let asm = compile_ok("int add(int a, int b) { return a + b; } int main() { return add(1, 2); }");
        assert!(asm.contains("  mov [rbp-8], rdi"));
        assert!(asm.contains("  mov [rbp-16], rsi"));
    }

    #[test]
    fn test_short_circuit_and() {
        let asm = compile_ok("int main() { return 1 and 2; }");
        assert!(asm.contains("L_logic_false_"));
        assert!(asm.contains("L_logic_end_"));
        assert!(asm.contains("  je L_logic_false_"));
    }

    #[test]
    fn test_short_circuit_or() {
        let asm = compile_ok("int main() { return 0 or 1; }");
        assert!(asm.contains("  jne L_logic_true_"));
    }

    #[test]
    fn test_xor_booleanizes_both_sides() {
        let asm = compile_ok("int main() { return 1 xor 0; }");
        assert_eq!(asm.matches("  setne al").count(), 2);
        assert!(asm.contains("  xor rax, rbx"));
    }

    #[test]
    fn test_xnor_inverts() {
        let asm = compile_ok("int main() { return 1 xnor 0; }");
        assert!(asm.contains("  xor rax, 1"));
    }

    #[test]
    fn test_xor_left_operand_survives_call_on_right() {
        // The booleanized left spills to the stack; a call in the right
        // operand clobbers every caller-saved register.
        let asm = compile_ok("int f() { return 0; } int main() { return 1 xor f(); }");
        let spill = asm.find("  setne al").unwrap();
        let call = asm.find("  call f").unwrap();
        assert!(spill < call);
        assert!(asm.contains("  pop rbx"));
        assert!(!asm.contains("  setne cl"));
    }

    #[test]
    fn test_inverted_bitwise_forms() {
        let asm = compile_ok("int main() { return 1 nband 3; }");
        assert!(asm.contains("  and rax, rbx"));
        assert!(asm.contains("  not rax"));
    }

    #[test]
    fn test_type_equal_folds_to_literal() {
        let asm = compile_ok("int main() { return 1 === 2; }");
        assert!(asm.contains("compile-time type check"));
        assert!(asm.contains("  push 1"));

        let asm = compile_ok("int main() { return 1 === 'a'; }");
        assert!(asm.contains("  push 0"));
    }

    #[test]
    fn test_pointer_arithmetic_scales_by_pointee() {
        let asm = compile_ok("int main() { mut int x = 1; ptr int p = addr x; ptr int q = p + 2; return deref q; }");
        assert!(asm.contains("  imul rbx, 8"));
    }

    #[test]
    fn test_char_pointer_arithmetic_has_no_scaling() {
        let asm = compile_ok(r#"int main() { ptr char s = "ab"; ptr char t = s + 1; return deref t; }"#);
        assert!(!asm.contains("  imul rbx, 1"));
    }

    #[test]
    fn test_addr_emits_lea() {
        let asm = compile_ok("int main() { mut int x = 7; ptr int p = addr x; return deref p; }");
        assert!(asm.contains("  lea rax, [rbp-8]"));
    }

    #[test]
    fn test_deref_char_pointer_loads_byte() {
        let asm = compile_ok(r#"int main() { ptr char s = "a"; return deref s; }"#);
        assert!(asm.contains("  movzx rax, byte [rax]"));
    }

    #[test]
    fn test_struct_layout_offsets() {
        let asm = compile_ok(
            "struct Pt { int x; int y; } int main() { mut Pt p; p.x = 3; p.y = 4; return p.x + p.y; }",
        );
        // Second field sits 8 bytes in.
        assert!(asm.contains("  add rax, 8"));
        assert!(asm.contains("  mov [rbx], rax"));
    }

    #[test]
    fn test_struct_copy_uses_rep_movsb() {
        let asm = compile_ok(
            "struct Pt { int x; int y; } int main() { mut Pt a; mut Pt b; a.x = 1; b = a; return b.x; }",
        );
        assert!(asm.contains("  rep movsb"));
        assert!(asm.contains("  mov rcx, 16"));
    }

    #[test]
    fn test_char_field_stores_byte() {
        let asm = compile_ok(
            "struct C { char c; } int main() { mut C v; v.c = 'x'; return 0; }",
        );
        assert!(asm.contains("  mov [rbx], al"));
    }

    #[test]
    fn test_string_literals_are_interned_and_deduped() {
        let asm = compile_ok(r#"int main() { ptr char a = "hi"; ptr char b = "hi"; return 0; }"#);
        assert_eq!(asm.matches("L_str_0 db").count(), 1);
        assert!(!asm.contains("L_str_1"));
        assert!(asm.contains("'hi', 0"));
    }

    #[test]
    fn test_string_escapes_emit_numeric_bytes() {
        let asm = compile_ok(r#"int main() { ptr char a = "a\nb"; return 0; }"#);
        assert!(asm.contains("'a', 10, 'b', 0"));
    }

    #[test]
    fn test_if_lowering() {
        let asm = compile_ok("int main() { int v = 1 if 3 > 2 else 0; return v; }");
        assert!(asm.contains("  je L_else_"));
        assert!(asm.contains("L_endif_"));
    }

    #[test]
    fn test_if_without_else_jumps_to_end() {
        let asm = compile_ok("int main() { if (1) { print(1); } return 0; }");
        assert!(asm.contains("  je L_endif_"));
        assert!(!asm.contains("L_else_"));
    }

    #[test]
    fn test_while_lowering() {
        let asm = compile_ok("int main() { mut int i = 0; while (i < 3) { i = i + 1; } return i; }");
        assert!(asm.contains("L_while_start_"));
        assert!(asm.contains("  je L_while_end_"));
        assert!(asm.contains("  jmp L_while_start_"));
    }

    #[test]
    fn test_loop_lowering() {
        let asm = compile_ok("int main() { loop { break; } return 0; }");
        assert!(asm.contains("L_loop_start_"));
        assert!(asm.contains("  jmp L_loop_end_"));
    }

    #[test]
    fn test_for_continue_targets_step() {
        let asm = compile_ok(
            "int main() { for (mut int i = 0; i < 3; i = i + 1) { continue; } return 0; }",
        );
        assert!(asm.contains("  jmp L_for_continue_"));
        assert!(asm.contains("L_for_start_"));
        assert!(asm.contains("L_for_end_"));
    }

    #[test]
    fn test_break_outside_loop_is_rejected() {
        let err = compile("int main() { break; }").unwrap_err();
        assert!(err.contains("E013"));
    }

    #[test]
    fn test_continue_outside_loop_is_rejected() {
        let err = compile("int main() { continue; }").unwrap_err();
        assert!(err.contains("E014"));
    }

    #[test]
    fn test_alloc_and_free_runtime() {
        let asm = compile_ok("int main() { ptr char m = alloc(16); free(m); return 0; }");
        assert!(asm.contains("  call ignis_alloc"));
        assert!(asm.contains("  call ignis_free"));
        assert!(asm.contains("ignis_alloc_fail:"));
        assert!(asm.contains(&format!("  ignis_heap resb {}", HEAP_SIZE)));
    }

    #[test]
    fn test_new_loads_aggregate_size() {
        let asm = compile_ok("struct Pt { int x; int y; } int main() { ptr Pt p = new Pt; free(p); return 0; }");
        assert!(asm.contains("  mov rdi, 16"));
        assert!(asm.contains("  call ignis_alloc"));
    }

    #[test]
    fn test_const_use_expands_initializer() {
        let asm = compile_ok("const int LIMIT = 10; int main() { return LIMIT; }");
        assert!(asm.contains("  push 10"));
    }

    #[test]
    fn test_expression_statement_discards_value() {
        let asm = compile_ok("int main() { 1 + 2; return 0; }");
        assert!(asm.contains("  add rsp, 8"));
    }

    #[test]
    fn test_trailing_block_value_lands_in_rax() {
        let asm = compile_ok("int main() { 7 }");
        assert!(asm.contains("  pop rax"));
    }

    #[test]
    fn test_body_without_value_zeroes_rax() {
        let asm = compile_ok("int main() { print(1); }");
        assert!(asm.contains("  xor rax, rax"));
    }

    #[test]
    fn test_frame_overflow_is_rejected() {
        let mut source = String::from("int main() {\n");
        for i in 0..33 {
            source.push_str(&format!("  int v{} = {};\n", i, i));
        }
        source.push_str("  return 0;\n}\n");
        let err = compile(&source).unwrap_err();
        assert!(err.contains("E018"));
    }

    #[test]
    fn test_getchar_clears_buffer_for_eof() {
        let asm = compile_ok("int main() { return getchar(); }");
        assert!(asm.contains("  mov byte [rbp-8], 0"));
        assert!(asm.contains("  movzx rax, byte [rbp-8]"));
    }

    #[test]
    fn test_nasm_string_bytes() {
        assert_eq!(nasm_string_bytes("abc"), "'abc', 0");
        assert_eq!(nasm_string_bytes("a\nb"), "'a', 10, 'b', 0");
        assert_eq!(nasm_string_bytes(""), "0");
        assert_eq!(nasm_string_bytes("it's"), "'it', 39, 's', 0");
    }

    #[test]
    fn test_wide_literal_travels_through_rax() {
        // push takes a sign-extended imm32; wider values need a register.
        let asm = compile_ok("int main() { return 4294967296; }");
        assert!(asm.contains("  mov rax, 4294967296"));
        let asm = compile_ok("int main() { return 14; }");
        assert!(asm.contains("  push 14"));
    }

    #[test]
    fn test_unary_minus_negates() {
        let asm = compile_ok("int main() { return -5; }");
        assert!(asm.contains("  neg rax"));
    }

    #[test]
    fn test_nbnot_is_identity() {
        let asm = compile_ok("int main() { return nbnot 5; }");
        // The operand is pushed, popped, and pushed back untouched.
        assert!(!asm.contains("  not rax"));
    }
}
