//! Canonical source rendering for parsed programs
//!
//! Renders an AST back to Ignis source in a canonical form: binary and
//! unary expressions fully parenthesized, four-space indentation, `elif`
//! chains normalized to nested `else` blocks. Rendering is idempotent
//! across a re-parse, which is what the round-trip tests lean on.

use crate::ast::{Block, Decl, Expr, Program, Stmt};
use crate::lexer::TokenKind;

pub fn program_to_source(program: &Program) -> String {
    let mut out = Vec::new();
    for decl in &program.decls {
        match decl {
            Decl::Struct(def) => {
                out.push(format!("struct {} {{", def.name));
                for field in &def.fields {
                    out.push(format!("    {} {};", field.ty, field.name));
                }
                out.push("}".to_string());
            }
            Decl::Const(c) => {
                out.push(format!("const {} {} = {};", c.ty, c.name, expr_str(&c.value)));
            }
            Decl::Function(f) => {
                let params: Vec<String> = f
                    .params
                    .iter()
                    .map(|p| format!("{} {}", p.ty, p.name))
                    .collect();
                out.push(format!("{} {}({}) {{", f.return_ty, f.name, params.join(", ")));
                block_lines(&f.body, 1, &mut out);
                out.push("}".to_string());
            }
        }
        out.push(String::new());
    }
    out.join("\n")
}

fn block_lines(block: &Block, indent: usize, out: &mut Vec<String>) {
    for stmt in &block.stmts {
        stmt_lines(stmt, indent, out);
    }
    if let Some(tail) = &block.tail {
        tail_lines(tail, indent, out);
    }
}

/// A block's trailing value: no semicolon. Statement-shaped tails keep
/// their multi-line form.
fn tail_lines(tail: &Expr, indent: usize, out: &mut Vec<String>) {
    let pad = "    ".repeat(indent);
    match tail {
        Expr::If { .. } if !is_ternary(tail) => if_lines(tail, indent, out),
        _ => out.push(format!("{}{}", pad, expr_str(tail))),
    }
}

fn stmt_lines(stmt: &Stmt, indent: usize, out: &mut Vec<String>) {
    let pad = "    ".repeat(indent);
    match stmt {
        Stmt::VarDecl { .. } => out.push(format!("{}{};", pad, var_decl_str(stmt))),
        Stmt::Assign { target, value, .. } => {
            out.push(format!("{}{} = {};", pad, expr_str(target), expr_str(value)));
        }
        Stmt::Return { value, .. } => match value {
            Some(value) => out.push(format!("{}return {};", pad, expr_str(value))),
            None => out.push(format!("{}return;", pad)),
        },
        Stmt::While { cond, body, .. } => {
            out.push(format!("{}while ({}) {{", pad, expr_str(cond)));
            block_lines(body, indent + 1, out);
            out.push(format!("{}}}", pad));
        }
        Stmt::Loop { body, .. } => {
            out.push(format!("{}loop {{", pad));
            block_lines(body, indent + 1, out);
            out.push(format!("{}}}", pad));
        }
        Stmt::For { init, cond, step, body, .. } => {
            let init = init.as_ref().map(|s| stmt_header_str(s)).unwrap_or_default();
            let cond = cond.as_ref().map(expr_str).unwrap_or_default();
            let step = step.as_ref().map(|s| stmt_header_str(s)).unwrap_or_default();
            out.push(format!("{}for ({}; {}; {}) {{", pad, init, cond, step));
            block_lines(body, indent + 1, out);
            out.push(format!("{}}}", pad));
        }
        Stmt::Break { .. } => out.push(format!("{}break;", pad)),
        Stmt::Continue { .. } => out.push(format!("{}continue;", pad)),
        Stmt::Expr(expr) => match expr {
            Expr::If { .. } if !is_ternary(expr) => if_lines(expr, indent, out),
            _ => out.push(format!("{}{};", pad, expr_str(expr))),
        },
    }
}

fn if_lines(expr: &Expr, indent: usize, out: &mut Vec<String>) {
    let Expr::If { cond, then_block, else_block, .. } = expr else {
        unreachable!("if_lines expects an if node");
    };
    let pad = "    ".repeat(indent);
    out.push(format!("{}if ({}) {{", pad, expr_str(cond)));
    block_lines(then_block, indent + 1, out);
    match else_block {
        Some(else_block) => {
            out.push(format!("{}}} else {{", pad));
            block_lines(else_block, indent + 1, out);
            out.push(format!("{}}}", pad));
        }
        None => out.push(format!("{}}}", pad)),
    }
}

fn var_decl_str(stmt: &Stmt) -> String {
    let Stmt::VarDecl { ty, name, init, mutable, .. } = stmt else {
        unreachable!("var_decl_str expects a variable declaration");
    };
    let mut s = String::new();
    if *mutable {
        s.push_str("mut ");
    }
    s.push_str(&format!("{} {}", ty, name));
    if let Some(init) = init {
        s.push_str(&format!(" = {}", expr_str(init)));
    }
    s
}

fn stmt_header_str(stmt: &Stmt) -> String {
    match stmt {
        Stmt::VarDecl { .. } => var_decl_str(stmt),
        Stmt::Assign { target, value, .. } => format!("{} = {}", expr_str(target), expr_str(value)),
        Stmt::Expr(expr) => expr_str(expr),
        _ => String::new(),
    }
}

/// An `if` whose arms are single trailing values renders as the ternary
/// suffix form.
fn is_ternary(expr: &Expr) -> bool {
    let Expr::If { then_block, else_block, .. } = expr else {
        return false;
    };
    let Some(else_block) = else_block else {
        return false;
    };
    then_block.stmts.is_empty()
        && then_block.tail.is_some()
        && else_block.stmts.is_empty()
        && else_block.tail.is_some()
}

fn expr_str(expr: &Expr) -> String {
    match expr {
        Expr::Int { value, .. } => value.to_string(),
        Expr::Char { value, .. } => char_literal_str(*value),
        Expr::Str { value, .. } => string_literal_str(value),
        Expr::Var { name, .. } => name.clone(),
        Expr::Binary { op, left, right } => {
            format!("({} {} {})", expr_str(left), op.text, expr_str(right))
        }
        Expr::Unary { op, operand } => {
            if op.kind == TokenKind::Minus {
                format!("(-{})", expr_str(operand))
            } else {
                format!("({} {})", op.text, expr_str(operand))
            }
        }
        Expr::Call { name, args, .. } => {
            let args: Vec<String> = args.iter().map(expr_str).collect();
            format!("{}({})", name, args.join(", "))
        }
        Expr::Member { base, field, .. } => format!("{}.{}", expr_str(base), field),
        Expr::Alloc { size, .. } => format!("alloc({})", expr_str(size)),
        Expr::New { ty, .. } => format!("new {}", ty),
        Expr::Free { operand, .. } => format!("free({})", expr_str(operand)),
        Expr::Block(block) => {
            let mut parts = Vec::new();
            for stmt in &block.stmts {
                let mut lines = Vec::new();
                stmt_lines(stmt, 0, &mut lines);
                parts.extend(lines);
            }
            if let Some(tail) = &block.tail {
                parts.push(expr_str(tail));
            }
            format!("{{ {} }}", parts.join(" "))
        }
        Expr::If { cond, then_block, else_block, .. } => {
            if is_ternary(expr) {
                let then_value = then_block.tail.as_ref().expect("ternary has a then value");
                let else_value = else_block
                    .as_ref()
                    .and_then(|b| b.tail.as_ref())
                    .expect("ternary has an else value");
                return format!(
                    "({} if {} else {})",
                    expr_str(then_value),
                    expr_str(cond),
                    expr_str(else_value)
                );
            }
            // Statement-shaped if in expression position: single line.
            let mut lines = Vec::new();
            if_lines(expr, 0, &mut lines);
            lines.join(" ")
        }
    }
}

fn char_literal_str(value: i64) -> String {
    match value {
        10 => "'\\n'".to_string(),
        9 => "'\\t'".to_string(),
        92 => "'\\\\'".to_string(),
        39 => "'\\''".to_string(),
        _ => format!("'{}'", (value as u8) as char),
    }
}

fn string_literal_str(value: &str) -> String {
    let mut out = String::from("\"");
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Reporter;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse(source: &str) -> Program {
        let reporter = Reporter::new("test.ign", source);
        let lexer = Lexer::new(source, &reporter);
        let mut parser = Parser::new(lexer, &reporter).unwrap();
        parser.parse().unwrap()
    }

    /// Pretty-printing must be a fixed point across a re-parse.
    fn assert_round_trip(source: &str) {
        let first = program_to_source(&parse(source));
        let second = program_to_source(&parse(&first));
        assert_eq!(first, second, "pretty-printing is not idempotent for:\n{}", source);
    }

    #[test]
    fn test_round_trip_arithmetic() {
        assert_round_trip("int main() { print(2 + 3 * 4); return 0; }");
    }

    #[test]
    fn test_round_trip_ternary() {
        assert_round_trip("int main() { int v = 1 if 3 > 2 else 0; print(v); return 0; }");
    }

    #[test]
    fn test_round_trip_structs_and_pointers() {
        assert_round_trip(
            "struct Pt { int x; int y; } int main() { mut Pt p; p.x = 3; ptr Pt q = addr p; return q.x; }",
        );
    }

    #[test]
    fn test_round_trip_loops() {
        assert_round_trip(
            "int main() { mut int i = 0; while (i < 3) { i = i + 1; } for (mut int j = 0; j < 2; j = j + 1) { continue; } loop { break; } return i; }",
        );
    }

    #[test]
    fn test_round_trip_if_statement() {
        assert_round_trip("int main() { if (1) { print(1); } else { print(2); } return 0; }");
    }

    #[test]
    fn test_round_trip_elif_chain() {
        assert_round_trip(
            "int main() { if (1) { return 1; } elif (2) { return 2; } else { return 3; } }",
        );
    }

    #[test]
    fn test_round_trip_strings_and_chars() {
        assert_round_trip(r#"int main() { ptr char s = "a\nb\"c"; char c = '\t'; return 0; }"#);
    }

    #[test]
    fn test_round_trip_alloc_free() {
        assert_round_trip(
            "struct Pt { int x; } int main() { ptr char m = alloc(8); ptr Pt p = new Pt; free(m); free(p); return 0; }",
        );
    }

    #[test]
    fn test_round_trip_operators() {
        assert_round_trip(
            "int main() { return 1 and 2 or not 3 xor 4 nand 5 band 6 nbxor 7 === 8; }",
        );
    }

    #[test]
    fn test_round_trip_const() {
        assert_round_trip("const int LIMIT = 10; int main() { return LIMIT; }");
    }

    #[test]
    fn test_round_trip_block_expression() {
        assert_round_trip("int main() { int v = { int t = 2; t + 1 }; return v; }");
    }

    #[test]
    fn test_canonical_parenthesization() {
        let rendered = program_to_source(&parse("int main() { return 2 + 3 * 4; }"));
        assert!(rendered.contains("(2 + (3 * 4))"));
    }

    #[test]
    fn test_ternary_renders_as_suffix_form() {
        let rendered = program_to_source(&parse("int main() { int v = 1 if 0 else 2; return v; }"));
        assert!(rendered.contains("(1 if 0 else 2)"));
    }
}
