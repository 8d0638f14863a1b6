//! Semantic checker for Ignis
//!
//! Runs after parsing and before either code generator. Two pre-passes over
//! the top-level declarations register structs and function signatures, then
//! every remaining declaration is walked in source order against a stack of
//! scopes. The checker never mutates the AST; it only reports through the
//! reporter and keeps its own side tables.
//!
//! Semantic errors accumulate over the pass; when any was raised the joined
//! report is returned and code generation is skipped. Dead-loop diagnostics
//! (`W001`, `W002`) are warnings and accumulate without failing the run.

use crate::ast::{Block, ConstDecl, Decl, Expr, FunctionDecl, Program, Stmt, StructDef, Ty};
use crate::diagnostics::Reporter;
use crate::lexer::{Token, TokenKind};
use std::collections::HashMap;

/// Per-symbol information held by a scope.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub ty: Ty,
    pub mutable: bool,
}

/// A stack of flat name maps. The bottom scope is the global one (constants
/// live there); every block, loop body, and function body pushes a scope.
pub struct SymbolTable {
    scopes: Vec<HashMap<String, SymbolInfo>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { scopes: vec![HashMap::new()] }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot exit the global scope");
        self.scopes.pop();
    }

    /// Add a symbol to the innermost scope. Returns false when the name is
    /// already declared there.
    pub fn declare(&mut self, name: &str, info: SymbolInfo) -> bool {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        if scope.contains_key(name) {
            return false;
        }
        scope.insert(name.to_string(), info);
        true
    }

    /// Look a name up from the innermost scope outwards.
    pub fn lookup(&self, name: &str) -> Option<&SymbolInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Registered struct: field names to types, in declaration order.
#[derive(Debug, Clone)]
pub struct StructInfo {
    pub fields: Vec<(String, Ty)>,
}

impl StructInfo {
    pub fn field_ty(&self, name: &str) -> Option<&Ty> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

/// Registered function signature.
#[derive(Debug, Clone)]
pub struct FuncSig {
    pub return_ty: Ty,
    pub params: Vec<Ty>,
}

pub struct Checker<'a> {
    reporter: &'a mut Reporter,
    symbols: SymbolTable,
    structs: HashMap<String, StructInfo>,
    functions: HashMap<String, FuncSig>,
}

impl<'a> Checker<'a> {
    pub fn new(reporter: &'a mut Reporter) -> Self {
        Checker {
            reporter,
            symbols: SymbolTable::new(),
            structs: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    pub fn check(&mut self, program: &Program) -> Result<(), String> {
        // First pass: structs and function signatures.
        for decl in &program.decls {
            match decl {
                Decl::Struct(s) => self.register_struct(s),
                Decl::Function(f) => {
                    let sig = FuncSig {
                        return_ty: f.return_ty.clone(),
                        params: f.params.iter().map(|p| p.ty.clone()).collect(),
                    };
                    self.functions.insert(f.name.clone(), sig);
                }
                Decl::Const(_) => {}
            }
        }

        // Second pass: everything else in source order.
        for decl in &program.decls {
            match decl {
                Decl::Struct(_) => {}
                Decl::Const(c) => self.check_const(c),
                Decl::Function(f) => self.check_function(f),
            }
        }

        match self.reporter.error_report() {
            Some(report) => Err(report),
            None => Ok(()),
        }
    }

    fn error(&mut self, code: &str, message: &str, token: &Token) {
        self.reporter.error(code, message, token.line, token.column);
    }

    fn warning(&mut self, code: &str, message: &str, token: &Token) {
        self.reporter.warning(code, message, token.line, token.column);
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn register_struct(&mut self, def: &StructDef) {
        if self.structs.contains_key(&def.name) {
            let message = format!("Struct '{}' is already defined.", def.name);
            self.error("SE001", &message, &def.name_token);
            return;
        }
        let mut fields: Vec<(String, Ty)> = Vec::new();
        for field in &def.fields {
            if fields.iter().any(|(n, _)| n == &field.name) {
                let message = format!("Duplicate field '{}' in struct '{}'.", field.name, def.name);
                self.error("SE002", &message, &field.token);
            } else {
                fields.push((field.name.clone(), field.ty.clone()));
            }
        }
        self.structs.insert(def.name.clone(), StructInfo { fields });
    }

    fn check_const(&mut self, decl: &ConstDecl) {
        let value_ty = self.check_expr(&decl.value);
        if value_ty != decl.ty {
            let message = format!(
                "Type mismatch: cannot assign type '{}' to variable '{}' of type '{}'.",
                value_ty, decl.name, decl.ty
            );
            self.error("SE007", &message, decl.value.token());
        }
        // Constants are immutable; the ordinary SE009 path rejects writes.
        let info = SymbolInfo { ty: decl.ty.clone(), mutable: false };
        if !self.symbols.declare(&decl.name, info) {
            let message = format!("Variable '{}' is already declared in this scope.", decl.name);
            self.error("SE004", &message, &decl.name_token);
        }
    }

    fn check_function(&mut self, decl: &FunctionDecl) {
        self.symbols.enter_scope();
        for param in &decl.params {
            self.check_named_ty(&param.ty, &param.token);
            let info = SymbolInfo { ty: param.ty.clone(), mutable: false };
            if !self.symbols.declare(&param.name, info) {
                let message = format!("Variable '{}' is already declared in this scope.", param.name);
                self.error("SE004", &message, &param.token);
            }
        }
        self.check_block(&decl.body);
        self.symbols.exit_scope();
    }

    /// A declared type naming a struct must name a registered one.
    fn check_named_ty(&mut self, ty: &Ty, token: &Token) {
        if let Some(name) = ty.struct_name() {
            if !self.structs.contains_key(name) {
                let message = format!("Type '{}' is not a struct or not defined.", name);
                self.error("SE005", &message, token);
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Check a block in its own scope and return the type of its trailing
    /// value, or `void` when it has none.
    fn check_block(&mut self, block: &Block) -> Ty {
        self.symbols.enter_scope();
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        let ty = match &block.tail {
            Some(expr) => self.check_expr(expr),
            None => Ty::void(),
        };
        self.symbols.exit_scope();
        ty
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { ty, name, init, mutable, name_token } => {
                self.check_named_ty(ty, name_token);
                let info = SymbolInfo { ty: ty.clone(), mutable: *mutable };
                if !self.symbols.declare(name, info) {
                    let message = format!("Variable '{}' is already declared in this scope.", name);
                    self.error("SE004", &message, name_token);
                }
                if let Some(init) = init {
                    let init_ty = self.check_expr(init);
                    if init_ty != *ty {
                        let message = format!(
                            "Type mismatch: cannot assign type '{}' to variable '{}' of type '{}'.",
                            init_ty, name, ty
                        );
                        self.error("SE007", &message, init.token());
                    }
                }
            }
            Stmt::Assign { target, value, op_token } => self.check_assign(target, value, op_token),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(value);
                }
            }
            Stmt::While { cond, body, token } => {
                let constant_true = matches!(cond, Expr::Int { value, .. } if *value != 0);
                if constant_true && !has_break(body) {
                    self.warning(
                        "W002",
                        "'while' loop with a constant true condition has no 'break' and may run forever.",
                        token,
                    );
                }
                self.check_expr(cond);
                self.check_block(body);
            }
            Stmt::Loop { body, token } => {
                if !has_break(body) {
                    self.warning("W001", "'loop' statement has no 'break' and may run forever.", token);
                }
                self.check_block(body);
            }
            Stmt::For { init, cond, step, body, .. } => {
                // The init declaration is scoped to the whole loop.
                self.symbols.enter_scope();
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(cond) = cond {
                    self.check_expr(cond);
                }
                if let Some(step) = step {
                    self.check_stmt(step);
                }
                self.check_block(body);
                self.symbols.exit_scope();
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
        }
    }

    fn check_assign(&mut self, target: &Expr, value: &Expr, op_token: &Token) {
        match target {
            Expr::Var { .. } | Expr::Member { .. } => {}
            Expr::Unary { op, .. } => {
                if op.kind != TokenKind::KwDeref {
                    self.error(
                        "SE008-2",
                        "Invalid target for assignment. Only dereference operation is a valid l-value.",
                        op,
                    );
                    return;
                }
            }
            other => {
                self.error(
                    "SE008-1",
                    "Invalid target for assignment. Must be a variable, field, or dereferenced pointer.",
                    other.token(),
                );
                return;
            }
        }

        if let Expr::Var { name, token } = target {
            if let Some(symbol) = self.symbols.lookup(name) {
                if !symbol.mutable {
                    let message = format!("Cannot assign to immutable variable '{}'.", name);
                    let token = token.clone();
                    self.error("SE009", &message, &token);
                }
            }
        }

        let target_ty = self.check_expr(target);
        let value_ty = self.check_expr(value);
        if target_ty != value_ty {
            let message = format!(
                "Type mismatch: cannot assign type '{}' to an expression of type '{}'.",
                value_ty, target_ty
            );
            self.error("SE007", &message, op_token);
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Check an expression subtree and infer its type. Erroneous subtrees
    /// produce `void` so one mistake does not cascade.
    fn check_expr(&mut self, expr: &Expr) -> Ty {
        match expr {
            Expr::Int { .. } => Ty::int(),
            Expr::Char { .. } => Ty::char_(),
            Expr::Str { .. } => Ty::char_ptr(),
            Expr::Var { name, token } => match self.symbols.lookup(name) {
                Some(symbol) => symbol.ty.clone(),
                None => {
                    let message = format!("Variable '{}' is not defined.", name);
                    let token = token.clone();
                    self.error("SE003", &message, &token);
                    Ty::void()
                }
            },
            Expr::Binary { op, left, right } => self.check_binary(op, left, right),
            Expr::Unary { op, operand } => self.check_unary(op, operand),
            Expr::Call { name, args, token } => {
                for arg in args {
                    self.check_expr(arg);
                }
                match name.as_str() {
                    "print" | "putchar" | "getchar" => Ty::int(),
                    _ => match self.functions.get(name) {
                        Some(sig) => sig.return_ty.clone(),
                        None => {
                            let message = format!("Function '{}' is not defined.", name);
                            let token = token.clone();
                            self.error("SE003", &message, &token);
                            Ty::void()
                        }
                    },
                }
            }
            Expr::Member { base, field, field_token } => {
                let base_ty = self.check_expr(base);
                let Some(struct_name) = base_ty.struct_name().map(|s| s.to_string()) else {
                    let message = format!("Type '{}' is not a struct or not defined.", base_ty);
                    let token = base.token().clone();
                    self.error("SE005", &message, &token);
                    return Ty::void();
                };
                let Some(info) = self.structs.get(&struct_name) else {
                    let message = format!("Type '{}' is not a struct or not defined.", struct_name);
                    let token = base.token().clone();
                    self.error("SE005", &message, &token);
                    return Ty::void();
                };
                match info.field_ty(field) {
                    Some(ty) => ty.clone(),
                    None => {
                        let message =
                            format!("Struct '{}' has no field named '{}'.", struct_name, field);
                        let token = field_token.clone();
                        self.error("SE006", &message, &token);
                        Ty::void()
                    }
                }
            }
            Expr::Alloc { size, .. } => {
                self.check_expr(size);
                Ty::char_ptr()
            }
            Expr::New { ty, token } => {
                self.check_named_ty(ty, token);
                ty.pointer_to()
            }
            Expr::Free { operand, token } => {
                let ty = self.check_expr(operand);
                if !ty.is_pointer() {
                    let message = format!("Cannot free a non-pointer type '{}'.", ty);
                    let token = token.clone();
                    self.error("SE015", &message, &token);
                }
                Ty::void()
            }
            Expr::Block(block) => self.check_block(block),
            Expr::If { cond, then_block, else_block, .. } => {
                self.check_expr(cond);
                let then_ty = self.check_block(then_block);
                if let Some(else_block) = else_block {
                    self.check_block(else_block);
                }
                then_ty
            }
        }
    }

    fn check_binary(&mut self, op: &Token, left: &Expr, right: &Expr) -> Ty {
        let lt = self.check_expr(left);
        let rt = self.check_expr(right);
        let op = op.clone();
        match op.kind {
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                // Pointer arithmetic keeps the pointer's type.
                if lt.is_pointer() && rt.is_integer_like() {
                    return lt;
                }
                if rt.is_pointer() && lt.is_integer_like() {
                    return rt;
                }
                if !lt.is_integer_like() || !rt.is_integer_like() {
                    let message = format!(
                        "Arithmetic operator '{}' can only be applied to 'int' types, but got '{}' and '{}'.",
                        op.text, lt, rt
                    );
                    self.error("SE010", &message, &op);
                }
                Ty::int()
            }
            TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Less
            | TokenKind::LessEq
            | TokenKind::Greater
            | TokenKind::GreaterEq => {
                if lt != rt {
                    let message = format!(
                        "Comparison operator '{}' cannot be applied to different or non-numerical types: '{}' and '{}'.",
                        op.text, lt, rt
                    );
                    self.error("SE011", &message, &op);
                }
                Ty::int()
            }
            // The compile-time type comparison places no constraint on its
            // operands; the code generators fold it.
            TokenKind::TypeEq => Ty::int(),
            TokenKind::KwAnd
            | TokenKind::KwOr
            | TokenKind::KwXor
            | TokenKind::KwNand
            | TokenKind::KwNor
            | TokenKind::KwXnor => {
                if !lt.is_integer_like() || !rt.is_integer_like() {
                    let message = format!(
                        "Logical operator '{}' expects integer-like operands, but got '{}' and '{}'.",
                        op.text, lt, rt
                    );
                    self.error("SE012-1", &message, &op);
                }
                Ty::int()
            }
            TokenKind::KwBand
            | TokenKind::KwBor
            | TokenKind::KwBxor
            | TokenKind::KwNband
            | TokenKind::KwNbor
            | TokenKind::KwNbxor => {
                if !lt.is_integer_like() || !rt.is_integer_like() {
                    let message = format!(
                        "Bitwise operator '{}' expects numerical-like operands, but got '{}' and '{}'.",
                        op.text, lt, rt
                    );
                    self.error("SE012-2", &message, &op);
                }
                Ty::int()
            }
            _ => Ty::int(),
        }
    }

    fn check_unary(&mut self, op: &Token, operand: &Expr) -> Ty {
        let ty = self.check_expr(operand);
        let op = op.clone();
        match op.kind {
            TokenKind::KwNot => {
                if !ty.is_integer_like() {
                    let message = format!(
                        "Logical NOT operator can only be applied to integer-like types, but got '{}'.",
                        ty
                    );
                    self.error("SE013-1", &message, &op);
                }
                Ty::int()
            }
            TokenKind::KwNnot => {
                if !ty.is_integer_like() {
                    let message = format!(
                        "Logical NNOT operator can only be applied to integer-like types, but got '{}'.",
                        ty
                    );
                    self.error("SE013-2", &message, &op);
                }
                Ty::int()
            }
            TokenKind::KwBnot => {
                if !ty.is_integer_like() {
                    let message = format!(
                        "Logical BNOT operator can only be applied to integer-like types, but got '{}'.",
                        ty
                    );
                    self.error("SE013-3", &message, &op);
                }
                Ty::int()
            }
            TokenKind::KwNbnot => {
                if !ty.is_integer_like() {
                    let message = format!(
                        "Logical NBNOT operator can only be applied to integer-like types, but got '{}'.",
                        ty
                    );
                    self.error("SE013-4", &message, &op);
                }
                Ty::int()
            }
            TokenKind::Minus => {
                if ty != Ty::int() {
                    let message = format!("Unary minus can only be applied to 'int', but got '{}'.", ty);
                    self.error("SE014", &message, &op);
                }
                Ty::int()
            }
            TokenKind::KwDeref => match ty.pointee() {
                Some(pointee) => pointee,
                None => {
                    let message = format!("Cannot dereference a non-pointer type '{}'.", ty);
                    self.error("SE015", &message, &op);
                    Ty::void()
                }
            },
            TokenKind::KwAddr => {
                if !matches!(operand, Expr::Var { .. } | Expr::Member { .. }) {
                    self.error(
                        "SE016",
                        "Address-of operator can only be applied to variables or fields.",
                        operand.token(),
                    );
                }
                ty.pointer_to()
            }
            _ => Ty::int(),
        }
    }
}

// ----------------------------------------------------------------------
// Dead-loop scan
// ----------------------------------------------------------------------

/// Whether a loop body contains a `break` for the loop itself. The scan is
/// recursive but does not descend into nested `loop`/`while`/`for` bodies:
/// their breaks belong to them.
fn has_break(block: &Block) -> bool {
    block.stmts.iter().any(stmt_has_break)
        || block.tail.as_ref().is_some_and(expr_has_break)
}

fn stmt_has_break(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Break { .. } => true,
        Stmt::While { .. } | Stmt::Loop { .. } | Stmt::For { .. } => false,
        Stmt::VarDecl { init, .. } => init.as_ref().is_some_and(expr_has_break),
        Stmt::Assign { target, value, .. } => expr_has_break(target) || expr_has_break(value),
        Stmt::Return { value, .. } => value.as_ref().is_some_and(expr_has_break),
        Stmt::Continue { .. } => false,
        Stmt::Expr(expr) => expr_has_break(expr),
    }
}

fn expr_has_break(expr: &Expr) -> bool {
    match expr {
        Expr::Block(block) => has_break(block),
        Expr::If { cond, then_block, else_block, .. } => {
            expr_has_break(cond)
                || has_break(then_block)
                || else_block.as_ref().is_some_and(|b| has_break(b))
        }
        Expr::Binary { left, right, .. } => expr_has_break(left) || expr_has_break(right),
        Expr::Unary { operand, .. } => expr_has_break(operand),
        Expr::Call { args, .. } => args.iter().any(expr_has_break),
        Expr::Member { base, .. } => expr_has_break(base),
        Expr::Alloc { size, .. } => expr_has_break(size),
        Expr::Free { operand, .. } => expr_has_break(operand),
        _ => false,
    }
}
