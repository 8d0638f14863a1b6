//! C++17 code generation
//!
//! Emits a single translation unit that includes `ignis_runtime.h` and
//! `<cstdint>`; the driver compiles it with an external C++ compiler
//! against the embedded runtime. Observable behavior (stdout bytes, exit
//! code) matches the native back-end.
//!
//! Type mapping: `int` becomes `int64_t`, `char` stays `char`, pointer
//! levels become `*`, struct names are reproduced verbatim. Immutable
//! locals receive `const`, constants become `constexpr`. Expression-form
//! `if` and block-as-expression lower to immediately invoked lambdas whose
//! body returns the trailing value. C++ has no logical xor, so `xor` and
//! `xnor` are rendered through `!a != !b` / `!a == !b`.

use crate::ast::{BaseTy, Block, Decl, Expr, FunctionDecl, Program, Stmt, Ty};
use crate::diagnostics::{Level, Reporter};
use crate::lexer::{Token, TokenKind};
use std::collections::HashMap;

pub struct CodeGenCpp<'a> {
    reporter: &'a Reporter,
    out: Vec<String>,
    structs: HashMap<String, Vec<(String, Ty)>>,
    functions: HashMap<String, Ty>,
    consts: HashMap<String, Ty>,
    locals: HashMap<String, Ty>,
    current_return_ty: Ty,
}

impl<'a> CodeGenCpp<'a> {
    pub fn new(reporter: &'a Reporter) -> Self {
        CodeGenCpp {
            reporter,
            out: Vec::new(),
            structs: HashMap::new(),
            functions: HashMap::new(),
            consts: HashMap::new(),
            locals: HashMap::new(),
            current_return_ty: Ty::void(),
        }
    }

    pub fn generate(&mut self, program: &Program) -> Result<String, String> {
        for decl in &program.decls {
            match decl {
                Decl::Struct(def) => {
                    let fields = def
                        .fields
                        .iter()
                        .map(|f| (f.name.clone(), f.ty.clone()))
                        .collect();
                    self.structs.insert(def.name.clone(), fields);
                }
                Decl::Function(f) => {
                    self.functions.insert(f.name.clone(), f.return_ty.clone());
                }
                Decl::Const(c) => {
                    self.consts.insert(c.name.clone(), c.ty.clone());
                }
            }
        }

        self.out.push("#include \"ignis_runtime.h\"".to_string());
        self.out.push("#include <cstdint>".to_string());
        self.out.push(String::new());

        // Struct definitions first so every later signature can name them.
        for decl in &program.decls {
            if let Decl::Struct(def) = decl {
                self.out.push(format!("struct {} {{", def.name));
                for field in &def.fields {
                    self.out.push(format!("    {};", cpp_decl(&field.ty, &field.name)));
                }
                self.out.push("};".to_string());
                self.out.push(String::new());
            }
        }

        for decl in &program.decls {
            if let Decl::Const(c) = decl {
                let value = self.expr_str(&c.value)?;
                let line = if c.ty == Ty::char_ptr() && matches!(c.value, Expr::Str { .. }) {
                    format!("constexpr const char *{} = {};", c.name, value)
                } else {
                    format!("constexpr {} = {};", cpp_decl(&c.ty, &c.name), value)
                };
                self.out.push(line);
            }
        }
        if program.decls.iter().any(|d| matches!(d, Decl::Const(_))) {
            self.out.push(String::new());
        }

        // Prototypes so declaration order does not matter.
        let mut wrote_prototype = false;
        for decl in &program.decls {
            if let Decl::Function(f) = decl {
                if f.name != "main" {
                    self.out.push(format!("{};", self.signature(f)));
                    wrote_prototype = true;
                }
            }
        }
        if wrote_prototype {
            self.out.push(String::new());
        }

        for decl in &program.decls {
            if let Decl::Function(f) = decl {
                self.gen_function(f)?;
            }
        }

        Ok(self.out.join("\n"))
    }

    fn err(&self, code: &str, message: &str, token: &Token) -> String {
        self.reporter.render(Level::Error, code, message, token.line, token.column)
    }

    fn signature(&self, decl: &FunctionDecl) -> String {
        let return_ty = if decl.name == "main" {
            "int".to_string()
        } else {
            cpp_type(&decl.return_ty)
        };
        let params: Vec<String> = decl
            .params
            .iter()
            .map(|p| cpp_decl(&p.ty, &p.name))
            .collect();
        format!("{} {}({})", return_ty, decl.name, params.join(", "))
    }

    fn gen_function(&mut self, decl: &FunctionDecl) -> Result<(), String> {
        self.locals.clear();
        self.current_return_ty = if decl.name == "main" {
            Ty::int()
        } else {
            decl.return_ty.clone()
        };
        for param in &decl.params {
            self.locals.insert(param.name.clone(), param.ty.clone());
        }

        self.out.push(format!("{} {{", self.signature(decl)));

        let mut body_lines = Vec::new();
        for stmt in &decl.body.stmts {
            self.emit_stmt(stmt, 1, &mut body_lines)?;
        }
        match &decl.body.tail {
            Some(tail) if self.has_value(tail) => {
                let value = self.expr_str(tail)?;
                body_lines.push(format!("    return {};", value));
            }
            Some(tail) => {
                // A valueless tail (statement-form if, bare block) keeps
                // its statement shape so inner returns leave the function.
                self.emit_expr_stmt(tail, 1, &mut body_lines)?;
                if self.current_return_ty != Ty::void() {
                    body_lines.push("    return 0;".to_string());
                }
            }
            None => {
                let ends_with_return = matches!(decl.body.stmts.last(), Some(Stmt::Return { .. }));
                if !ends_with_return && self.current_return_ty != Ty::void() {
                    body_lines.push("    return 0;".to_string());
                }
            }
        }
        self.out.append(&mut body_lines);
        self.out.push("}".to_string());
        self.out.push(String::new());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn emit_stmt(&mut self, stmt: &Stmt, indent: usize, out: &mut Vec<String>) -> Result<(), String> {
        let pad = "    ".repeat(indent);
        match stmt {
            Stmt::VarDecl { .. } => {
                let line = self.var_decl_str(stmt)?;
                out.push(format!("{}{};", pad, line));
                Ok(())
            }
            Stmt::Assign { target, value, .. } => {
                let target = self.expr_str(target)?;
                let value = self.expr_str(value)?;
                out.push(format!("{}{} = {};", pad, target, value));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                match value {
                    Some(value) => {
                        let value = self.expr_str(value)?;
                        out.push(format!("{}return {};", pad, value));
                    }
                    None => {
                        if self.current_return_ty == Ty::void() {
                            out.push(format!("{}return;", pad));
                        } else {
                            out.push(format!("{}return 0;", pad));
                        }
                    }
                }
                Ok(())
            }
            Stmt::While { cond, body, .. } => {
                let cond = self.expr_str(cond)?;
                out.push(format!("{}while ({}) {{", pad, cond));
                self.emit_block_body(body, indent + 1, out)?;
                out.push(format!("{}}}", pad));
                Ok(())
            }
            Stmt::Loop { body, .. } => {
                out.push(format!("{}for (;;) {{", pad));
                self.emit_block_body(body, indent + 1, out)?;
                out.push(format!("{}}}", pad));
                Ok(())
            }
            Stmt::For { init, cond, step, body, .. } => {
                let saved = self.locals.clone();
                let init_str = match init {
                    Some(init) => self.stmt_header_str(init)?,
                    None => String::new(),
                };
                let cond_str = match cond {
                    Some(cond) => self.expr_str(cond)?,
                    None => String::new(),
                };
                let step_str = match step {
                    Some(step) => self.stmt_header_str(step)?,
                    None => String::new(),
                };
                out.push(format!("{}for ({}; {}; {}) {{", pad, init_str, cond_str, step_str));
                self.emit_block_body(body, indent + 1, out)?;
                out.push(format!("{}}}", pad));
                self.locals = saved;
                Ok(())
            }
            Stmt::Break { .. } => {
                out.push(format!("{}break;", pad));
                Ok(())
            }
            Stmt::Continue { .. } => {
                out.push(format!("{}continue;", pad));
                Ok(())
            }
            Stmt::Expr(expr) => self.emit_expr_stmt(expr, indent, out),
        }
    }

    /// Statement-position expressions: statement-form `if` and bare blocks
    /// keep their C++ statement shape, everything else becomes `expr;`.
    fn emit_expr_stmt(&mut self, expr: &Expr, indent: usize, out: &mut Vec<String>) -> Result<(), String> {
        let pad = "    ".repeat(indent);
        match expr {
            Expr::If { cond, then_block, else_block, .. } => {
                let cond = self.expr_str(cond)?;
                out.push(format!("{}if ({}) {{", pad, cond));
                self.emit_block_body(then_block, indent + 1, out)?;
                match else_block {
                    Some(else_block) => {
                        out.push(format!("{}}} else {{", pad));
                        self.emit_block_body(else_block, indent + 1, out)?;
                        out.push(format!("{}}}", pad));
                    }
                    None => out.push(format!("{}}}", pad)),
                }
                Ok(())
            }
            Expr::Block(block) => {
                out.push(format!("{}{{", pad));
                self.emit_block_body(block, indent + 1, out)?;
                out.push(format!("{}}}", pad));
                Ok(())
            }
            _ => {
                let value = self.expr_str(expr)?;
                out.push(format!("{}{};", pad, value));
                Ok(())
            }
        }
    }

    /// Emit a block's statements; a trailing value in statement position is
    /// evaluated and discarded.
    fn emit_block_body(&mut self, block: &Block, indent: usize, out: &mut Vec<String>) -> Result<(), String> {
        let saved = self.locals.clone();
        for stmt in &block.stmts {
            self.emit_stmt(stmt, indent, out)?;
        }
        if let Some(tail) = &block.tail {
            self.emit_expr_stmt(tail, indent, out)?;
        }
        self.locals = saved;
        Ok(())
    }

    /// Single-line statement for `for` headers (no trailing semicolon).
    fn stmt_header_str(&mut self, stmt: &Stmt) -> Result<String, String> {
        match stmt {
            Stmt::VarDecl { .. } => self.var_decl_str(stmt),
            Stmt::Assign { target, value, .. } => {
                let target = self.expr_str(target)?;
                let value = self.expr_str(value)?;
                Ok(format!("{} = {}", target, value))
            }
            Stmt::Expr(expr) => self.expr_str(expr),
            other => Err(self.err("E003", "Unsupported statement in for-loop header", other.token())),
        }
    }

    fn var_decl_str(&mut self, stmt: &Stmt) -> Result<String, String> {
        let Stmt::VarDecl { ty, name, init, mutable, .. } = stmt else {
            unreachable!("var_decl_str expects a variable declaration");
        };
        self.locals.insert(name.clone(), ty.clone());
        match init {
            Some(init) => {
                let value = self.expr_str(init)?;
                // String-literal initializers of immutable locals pick up
                // the literal's const typing.
                if !mutable && *ty == Ty::char_ptr() && matches!(init, Expr::Str { .. }) {
                    return Ok(format!("const char *{} = {}", name, value));
                }
                if *mutable {
                    Ok(format!("{} = {}", cpp_decl(ty, name), value))
                } else if ty.is_pointer() {
                    // Immutability binds the name, not the pointee.
                    Ok(format!("{} const {} = {}", cpp_type(ty), name, value))
                } else {
                    Ok(format!("const {} = {}", cpp_decl(ty, name), value))
                }
            }
            None => Ok(cpp_decl(ty, name)),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr_str(&mut self, expr: &Expr) -> Result<String, String> {
        match expr {
            Expr::Int { value, .. } => Ok(value.to_string()),
            Expr::Char { value, .. } => Ok(cpp_char_literal(*value)),
            Expr::Str { value, .. } => Ok(cpp_string_literal(value)),
            Expr::Var { name, token } => {
                if self.locals.contains_key(name) || self.consts.contains_key(name) {
                    Ok(name.clone())
                } else {
                    Err(self.err("E004", &format!("Undeclared variable '{}'", name), token))
                }
            }
            Expr::Binary { op, left, right } => self.binary_str(op, left, right),
            Expr::Unary { op, operand } => {
                let value = self.expr_str(operand)?;
                let rendered = match op.kind {
                    TokenKind::KwNot => format!("(!{})", value),
                    TokenKind::KwBnot => format!("(~{})", value),
                    TokenKind::KwNnot => format!("(!!{})", value),
                    // Matches the native back-end, where the complemented
                    // complement cancels out.
                    TokenKind::KwNbnot => format!("({})", value),
                    TokenKind::Minus => format!("(-{})", value),
                    TokenKind::KwAddr => format!("(&{})", value),
                    TokenKind::KwDeref => format!("(*{})", value),
                    _ => {
                        return Err(self.err(
                            "E003",
                            &format!("Unsupported unary operator '{}'", op.text),
                            op,
                        ));
                    }
                };
                Ok(rendered)
            }
            Expr::Call { name, args, token } => {
                if args.len() > 6 {
                    return Err(self.err("E012", "Too many arguments in function call", token));
                }
                let mut rendered = Vec::new();
                for arg in args {
                    rendered.push(self.expr_str(arg)?);
                }
                let callee = match name.as_str() {
                    "print" => "print_int",
                    "putchar" => "ignis_putchar",
                    "getchar" => "ignis_getchar",
                    other => other,
                };
                Ok(format!("{}({})", callee, rendered.join(", ")))
            }
            Expr::Member { base, field, .. } => {
                let base_ty = self.expr_ty(base)?;
                let base_str = self.expr_str(base)?;
                let accessor = if base_ty.is_pointer() { "->" } else { "." };
                Ok(format!("{}{}{}", base_str, accessor, field))
            }
            Expr::Alloc { size, .. } => {
                let size = self.expr_str(size)?;
                Ok(format!("ignis_alloc({})", size))
            }
            Expr::New { ty, .. } => {
                let inner = cpp_type(ty);
                Ok(format!("reinterpret_cast<{}*>(ignis_alloc(sizeof({})))", inner, inner))
            }
            Expr::Free { operand, .. } => {
                let operand = self.expr_str(operand)?;
                Ok(format!("ignis_free({})", operand))
            }
            Expr::Block(block) => self.block_lambda_str(block),
            Expr::If { cond, then_block, else_block, token } => {
                let Some(else_block) = else_block else {
                    return Err(self.err("E003", "if-expression without else in value position", token));
                };
                let cond = self.expr_str(cond)?;
                let then_part = self.lambda_body_str(then_block)?;
                let else_part = self.lambda_body_str(else_block)?;
                Ok(format!(
                    "([&] {{ if ({}) {{ {} }} else {{ {} }} }}())",
                    cond, then_part, else_part
                ))
            }
        }
    }

    fn binary_str(&mut self, op: &Token, left: &Expr, right: &Expr) -> Result<String, String> {
        if op.kind == TokenKind::TypeEq {
            // Folded from the static operand types; no runtime cost.
            let lt = self.expr_ty(left)?;
            let rt = self.expr_ty(right)?;
            return Ok(if lt == rt { "1".to_string() } else { "0".to_string() });
        }
        let l = self.expr_str(left)?;
        let r = self.expr_str(right)?;
        let rendered = match op.kind {
            TokenKind::Plus => format!("({} + {})", l, r),
            TokenKind::Minus => format!("({} - {})", l, r),
            TokenKind::Star => format!("({} * {})", l, r),
            TokenKind::Slash => format!("({} / {})", l, r),
            TokenKind::EqEq => format!("({} == {})", l, r),
            TokenKind::NotEq => format!("({} != {})", l, r),
            TokenKind::Less => format!("({} < {})", l, r),
            TokenKind::LessEq => format!("({} <= {})", l, r),
            TokenKind::Greater => format!("({} > {})", l, r),
            TokenKind::GreaterEq => format!("({} >= {})", l, r),
            TokenKind::KwAnd => format!("({} && {})", l, r),
            TokenKind::KwOr => format!("({} || {})", l, r),
            TokenKind::KwNand => format!("(!({} && {}))", l, r),
            TokenKind::KwNor => format!("(!({} || {}))", l, r),
            // C++ has no logical xor; compare the booleanized sides.
            TokenKind::KwXor => format!("(!{} != !{})", l, r),
            TokenKind::KwXnor => format!("(!{} == !{})", l, r),
            TokenKind::KwBand => format!("({} & {})", l, r),
            TokenKind::KwBor => format!("({} | {})", l, r),
            TokenKind::KwBxor => format!("({} ^ {})", l, r),
            TokenKind::KwNband => format!("(~({} & {}))", l, r),
            TokenKind::KwNbor => format!("(~({} | {}))", l, r),
            TokenKind::KwNbxor => format!("(~({} ^ {}))", l, r),
            _ => {
                return Err(self.err(
                    "E003",
                    &format!("Unsupported binary operator '{}'", op.text),
                    op,
                ));
            }
        };
        Ok(rendered)
    }

    /// Block as an expression: an immediately invoked lambda returning the
    /// trailing value.
    fn block_lambda_str(&mut self, block: &Block) -> Result<String, String> {
        let body = self.lambda_body_str(block)?;
        Ok(format!("([&] {{ {} }}())", body))
    }

    /// The inside of a value-block lambda: statements inline, then
    /// `return tail;`.
    fn lambda_body_str(&mut self, block: &Block) -> Result<String, String> {
        let saved = self.locals.clone();
        let mut parts = Vec::new();
        for stmt in &block.stmts {
            let mut lines = Vec::new();
            self.emit_stmt(stmt, 0, &mut lines)?;
            parts.extend(lines);
        }
        if let Some(tail) = &block.tail {
            let value = self.expr_str(tail)?;
            parts.push(format!("return {};", value));
        }
        self.locals = saved;
        Ok(parts.join(" "))
    }

    /// Whether the expression produces a value usable in return position.
    fn has_value(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Free { .. } => false,
            Expr::Block(block) => match &block.tail {
                Some(tail) => self.has_value(tail),
                None => false,
            },
            Expr::If { then_block, else_block, .. } => {
                else_block.is_some()
                    && match &then_block.tail {
                        Some(tail) => self.has_value(tail),
                        None => false,
                    }
            }
            _ => true,
        }
    }

    // ------------------------------------------------------------------
    // Type reconstruction (own tables; the checker's are not shared)
    // ------------------------------------------------------------------

    fn expr_ty(&self, expr: &Expr) -> Result<Ty, String> {
        match expr {
            Expr::Int { .. } => Ok(Ty::int()),
            Expr::Char { .. } => Ok(Ty::char_()),
            Expr::Str { .. } => Ok(Ty::char_ptr()),
            Expr::Var { name, token } => {
                if let Some(ty) = self.locals.get(name) {
                    return Ok(ty.clone());
                }
                if let Some(ty) = self.consts.get(name) {
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
                let base_ty = self.expr_ty(base)?;
                let Some(struct_name) = base_ty.struct_name() else {
                    return Err(self.err(
                        "E006",
                        &format!("Unknown struct type '{}'", base_ty),
                        base.token(),
                    ));
                };
                let Some(fields) = self.structs.get(struct_name) else {
                    return Err(self.err(
                        "E006",
                        &format!("Unknown struct type '{}'", struct_name),
                        base.token(),
                    ));
                };
                match fields.iter().find(|(n, _)| n == field) {
                    Some((_, ty)) => Ok(ty.clone()),
                    None => Err(self.err(
                        "E007",
                        &format!("Struct '{}' has no field '{}'", struct_name, field),
                        field_token,
                    )),
                }
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
}

/// C++ spelling of an Ignis type: base plus pointer stars.
fn cpp_type(ty: &Ty) -> String {
    let base = match &ty.base {
        BaseTy::Int => "int64_t",
        BaseTy::Char => "char",
        BaseTy::Void => "void",
        BaseTy::Struct(name) => name.as_str(),
    };
    format!("{}{}", base, "*".repeat(ty.ptr_level))
}

/// A declaration: type then name, stars attached to the type.
fn cpp_decl(ty: &Ty, name: &str) -> String {
    format!("{} {}", cpp_type(ty), name)
}

fn cpp_char_literal(value: i64) -> String {
    match value {
        10 => "'\\n'".to_string(),
        9 => "'\\t'".to_string(),
        92 => "'\\\\'".to_string(),
        39 => "'\\''".to_string(),
        0x20..=0x7e => format!("'{}'", (value as u8) as char),
        // Octal escapes are unambiguous regardless of what follows.
        _ => format!("'\\{:03o}'", value),
    }
}

fn cpp_string_literal(value: &str) -> String {
    let mut out = String::from("\"");
    for byte in value.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            other => out.push_str(&format!("\\{:03o}", other)),
        }
    }
    out.push('"');
    out
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
        let mut generator = CodeGenCpp::new(&reporter);
        generator.generate(&program)
    }

    fn compile_ok(source: &str) -> String {
        compile(source).unwrap()
    }

    #[test]
    fn test_includes_and_main_signature() {
        let cpp = compile_ok("int main() { return 0; }");
        assert!(cpp.contains("#include \"ignis_runtime.h\""));
        assert!(cpp.contains("#include <cstdint>"));
        assert!(cpp.contains("int main() {"));
        assert!(cpp.contains("return 0;"));
    }

    #[test]
    fn test_int_maps_to_int64() {
        let cpp = compile_ok("int f() { return 1; } int main() { return f(); }");
        assert!(cpp.contains("int64_t f()"));
    }

    #[test]
    fn test_immutable_local_gets_const() {
        let cpp = compile_ok("int main() { int x = 1; return x; }");
        assert!(cpp.contains("const int64_t x = 1;"));
    }

    #[test]
    fn test_mutable_local_has_no_const() {
        let cpp = compile_ok("int main() { mut int x = 1; x = 2; return x; }");
        assert!(cpp.contains("    int64_t x = 1;"));
        assert!(cpp.contains("    x = 2;"));
    }

    #[test]
    fn test_string_initializer_gets_const_char() {
        let cpp = compile_ok(r#"int main() { ptr char s = "hi"; return 0; }"#);
        assert!(cpp.contains("const char *s = \"hi\";"));
    }

    #[test]
    fn test_const_becomes_constexpr() {
        let cpp = compile_ok("const int LIMIT = 10; int main() { return LIMIT; }");
        assert!(cpp.contains("constexpr int64_t LIMIT = 10;"));
        assert!(cpp.contains("return LIMIT;"));
    }

    #[test]
    fn test_struct_definition_and_member_access() {
        let cpp = compile_ok(
            "struct Pt { int x; int y; } int main() { mut Pt p; p.x = 3; p.y = 4; return p.x + p.y; }",
        );
        assert!(cpp.contains("struct Pt {"));
        assert!(cpp.contains("    int64_t x;"));
        assert!(cpp.contains("Pt p;"));
        assert!(cpp.contains("p.x = 3;"));
        assert!(cpp.contains("(p.x + p.y)"));
    }

    #[test]
    fn test_member_through_pointer_uses_arrow() {
        let cpp = compile_ok(
            "struct Pt { int x; } int main() { mut Pt p; ptr Pt q = addr p; q.x = 1; return q.x; }",
        );
        assert!(cpp.contains("q->x = 1;"));
        assert!(cpp.contains("return q->x;"));
    }

    #[test]
    fn test_pointer_declaration_spelling() {
        let cpp = compile_ok("int main() { mut int x = 1; ptr int p = addr x; return deref p; }");
        assert!(cpp.contains("int64_t* const p = (&x);"));
        assert!(cpp.contains("return (*p);"));
    }

    #[test]
    fn test_logical_operators_map_to_cpp() {
        let cpp = compile_ok("int main() { return 1 and 0 or 1; }");
        assert!(cpp.contains("&&"));
        assert!(cpp.contains("||"));
    }

    #[test]
    fn test_xor_has_no_cpp_operator() {
        let cpp = compile_ok("int main() { return 1 xor 0; }");
        assert!(cpp.contains("(!1 != !0)"));
    }

    #[test]
    fn test_xnor_compares_equal() {
        let cpp = compile_ok("int main() { return 1 xnor 0; }");
        assert!(cpp.contains("(!1 == !0)"));
    }

    #[test]
    fn test_inverted_forms_wrap() {
        let cpp = compile_ok("int main() { return (1 nand 0) + (1 nor 0) + (1 nband 3) + (1 nbor 0) + (1 nbxor 0); }");
        assert!(cpp.contains("(!(1 && 0))"));
        assert!(cpp.contains("(!(1 || 0))"));
        assert!(cpp.contains("(~(1 & 3))"));
        assert!(cpp.contains("(~(1 | 0))"));
        assert!(cpp.contains("(~(1 ^ 0))"));
    }

    #[test]
    fn test_unary_operators() {
        let cpp = compile_ok("int main() { return (not 1) + (bnot 2) + (nnot 3) + (nbnot 4) + (-5); }");
        assert!(cpp.contains("(!1)"));
        assert!(cpp.contains("(~2)"));
        assert!(cpp.contains("(!!3)"));
        assert!(cpp.contains("(4)"));
        assert!(cpp.contains("(-5)"));
    }

    #[test]
    fn test_intrinsics_rename() {
        let cpp = compile_ok("int main() { print(1); putchar('a'); return getchar(); }");
        assert!(cpp.contains("print_int(1);"));
        assert!(cpp.contains("ignis_putchar('a');"));
        assert!(cpp.contains("return ignis_getchar();"));
    }

    #[test]
    fn test_alloc_new_free_lowering() {
        let cpp = compile_ok(
            "struct Pt { int x; } int main() { ptr char m = alloc(16); ptr Pt p = new Pt; free(m); free(p); return 0; }",
        );
        assert!(cpp.contains("ignis_alloc(16)"));
        assert!(cpp.contains("reinterpret_cast<Pt*>(ignis_alloc(sizeof(Pt)))"));
        assert!(cpp.contains("ignis_free(m);"));
    }

    #[test]
    fn test_if_expression_lowers_to_lambda() {
        let cpp = compile_ok("int main() { int v = 1 if 3 > 2 else 0; return v; }");
        assert!(cpp.contains("([&] { if ((3 > 2)) { return 1; } else { return 0; } }())"));
    }

    #[test]
    fn test_block_expression_lowers_to_lambda() {
        let cpp = compile_ok("int main() { int v = { int t = 2; t + 1 }; return v; }");
        assert!(cpp.contains("([&] { const int64_t t = 2; return (t + 1); }())"));
    }

    #[test]
    fn test_statement_if_keeps_statement_shape() {
        let cpp = compile_ok("int main() { if (1) { print(1); } else { print(2); } return 0; }");
        assert!(cpp.contains("    if (1) {"));
        assert!(cpp.contains("    } else {"));
        assert!(!cpp.contains("[&]"));
    }

    #[test]
    fn test_loop_forms() {
        let cpp = compile_ok(
            "int main() { mut int i = 0; while (i < 3) { i = i + 1; } for (mut int j = 0; j < 2; j = j + 1) { } loop { break; } return i; }",
        );
        assert!(cpp.contains("while ((i < 3)) {"));
        assert!(cpp.contains("for (int64_t j = 0; (j < 2); j = (j + 1)) {"));
        assert!(cpp.contains("for (;;) {"));
        assert!(cpp.contains("break;"));
    }

    #[test]
    fn test_type_equal_folds() {
        let cpp = compile_ok("int main() { return 1 === 2; }");
        assert!(cpp.contains("return 1;"));
        let cpp = compile_ok("int main() { return 1 === 'a'; }");
        assert!(cpp.contains("return 0;"));
    }

    #[test]
    fn test_main_without_return_returns_zero() {
        let cpp = compile_ok("int main() { print(1); }");
        assert!(cpp.contains("return 0;"));
    }

    #[test]
    fn test_trailing_value_becomes_return() {
        let cpp = compile_ok("int main() { 7 }");
        assert!(cpp.contains("return 7;"));
    }

    #[test]
    fn test_prototypes_precede_definitions() {
        let cpp = compile_ok("int helper() { return 1; } int main() { return helper(); }");
        let proto = cpp.find("int64_t helper();").unwrap();
        let def = cpp.find("int64_t helper() {").unwrap();
        assert!(proto < def);
    }

    #[test]
    fn test_char_literal_rendering() {
        assert_eq!(cpp_char_literal(97), "'a'");
        assert_eq!(cpp_char_literal(10), "'\\n'");
        assert_eq!(cpp_char_literal(39), "'\\''");
        assert_eq!(cpp_char_literal(7), "'\\007'");
    }

    #[test]
    fn test_string_literal_rendering() {
        assert_eq!(cpp_string_literal("hi"), "\"hi\"");
        assert_eq!(cpp_string_literal("a\nb"), "\"a\\nb\"");
        assert_eq!(cpp_string_literal("q\"q"), "\"q\\\"q\"");
        assert_eq!(cpp_string_literal("\x07"), "\"\\007\"");
    }

    #[test]
    fn test_pointer_arithmetic_is_plain_addition() {
        // C++ pointer arithmetic already scales by the pointee size.
        let cpp = compile_ok("int main() { mut int x = 1; ptr int p = addr x; ptr int q = p + 2; return deref q; }");
        assert!(cpp.contains("(p + 2)"));
    }

    #[test]
    fn test_elif_chain_nests_else() {
        let cpp = compile_ok(
            "int main() { if (1) { return 1; } elif (2) { return 2; } else { return 3; } }",
        );
        assert!(cpp.contains("if (1) {"));
        // The elif arm nests inside the else branch.
        assert!(cpp.contains("if (2) {"));
    }
}
