//! Parser for Ignis
//!
//! Single-pass recursive descent with one token of lookahead (`current`,
//! `peek`). Binary operators are parsed by one table-driven precedence
//! climber instead of a function per level; the comparison level is
//! non-associative (at most one comparison per level).
//!
//! Statement dispatch inside a block: a leading type keyword, `mut`, `ptr`,
//! or an identifier followed by another identifier starts a variable
//! declaration; anything else is parsed as an expression and becomes an
//! assignment when `=` follows, a plain expression statement when `;`
//! follows, or the block's trailing value when the closing brace follows.

use crate::ast::{
    Block, ConstDecl, Decl, Expr, Field, FunctionDecl, Param, Program, Stmt, StructDef, Ty,
};
use crate::diagnostics::{Level, Reporter};
use crate::lexer::{Lexer, Token, TokenKind};

/// Binary operator levels, lowest precedence first. Level 5 (comparisons)
/// is non-associative.
const BINARY_LEVELS: &[&[TokenKind]] = &[
    &[TokenKind::KwOr, TokenKind::KwNor, TokenKind::KwXor, TokenKind::KwXnor],
    &[TokenKind::KwAnd, TokenKind::KwNand],
    &[TokenKind::KwBor, TokenKind::KwNbor],
    &[TokenKind::KwBxor, TokenKind::KwNbxor],
    &[TokenKind::KwBand, TokenKind::KwNband],
    &[
        TokenKind::EqEq,
        TokenKind::NotEq,
        TokenKind::Less,
        TokenKind::LessEq,
        TokenKind::Greater,
        TokenKind::GreaterEq,
        TokenKind::TypeEq,
    ],
    &[TokenKind::Plus, TokenKind::Minus],
    &[TokenKind::Star, TokenKind::Slash],
];

const COMPARISON_LEVEL: usize = 5;

const UNARY_OPS: &[TokenKind] = &[
    TokenKind::KwNot,
    TokenKind::KwBnot,
    TokenKind::KwNnot,
    TokenKind::KwNbnot,
    TokenKind::KwAddr,
    TokenKind::KwDeref,
    TokenKind::Minus,
];

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
    reporter: &'a Reporter,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>, reporter: &'a Reporter) -> Result<Self, String> {
        let current = lexer.next_token()?;
        let peek = lexer.next_token()?;
        Ok(Parser { lexer, current, peek, reporter })
    }

    pub fn parse(&mut self) -> Result<Program, String> {
        let mut decls = Vec::new();
        while self.current.kind != TokenKind::Eof {
            decls.push(self.declaration()?);
        }
        if decls.is_empty() {
            return Err(self.error("E001", "Source file contains no code (or no 'main' function).", &self.current));
        }
        Ok(Program { decls })
    }

    fn error(&self, code: &str, message: &str, token: &Token) -> String {
        self.reporter.render(Level::Error, code, message, token.line, token.column)
    }

    fn advance(&mut self) -> Result<Token, String> {
        let next = self.lexer.next_token()?;
        let consumed = std::mem::replace(&mut self.current, std::mem::replace(&mut self.peek, next));
        Ok(consumed)
    }

    fn eat(&mut self, kind: TokenKind) -> Result<Token, String> {
        if self.current.kind == kind {
            self.advance()
        } else {
            let message = format!(
                "Unexpected token: expected {}, but got {}",
                describe_kind(kind),
                describe_token(&self.current)
            );
            Err(self.error("E001", &message, &self.current))
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn declaration(&mut self) -> Result<Decl, String> {
        match self.current.kind {
            TokenKind::KwConst => {
                let decl = self.constant_declaration()?;
                self.eat(TokenKind::Semicolon)?;
                Ok(Decl::Const(decl))
            }
            TokenKind::KwStruct => Ok(Decl::Struct(self.struct_definition()?)),
            _ => Ok(Decl::Function(self.function_declaration()?)),
        }
    }

    fn constant_declaration(&mut self) -> Result<ConstDecl, String> {
        self.eat(TokenKind::KwConst)?;
        let ty = self.type_spec()?;
        let name_token = self.eat(TokenKind::Ident)?;
        self.eat(TokenKind::Assign)?;
        let value = self.expr()?;
        Ok(ConstDecl { ty, name: name_token.text.clone(), value, name_token })
    }

    fn struct_definition(&mut self) -> Result<StructDef, String> {
        self.eat(TokenKind::KwStruct)?;
        let name_token = self.eat(TokenKind::Ident)?;
        self.eat(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while self.current.kind != TokenKind::RBrace {
            let ty = self.type_spec()?;
            let token = self.eat(TokenKind::Ident)?;
            self.eat(TokenKind::Semicolon)?;
            fields.push(Field { ty, name: token.text.clone(), token });
        }
        if fields.is_empty() {
            let message = format!("Struct '{}' must have at least one field", name_token.text);
            return Err(self.error("E001", &message, &name_token));
        }
        self.eat(TokenKind::RBrace)?;
        Ok(StructDef { name: name_token.text.clone(), fields, name_token })
    }

    fn function_declaration(&mut self) -> Result<FunctionDecl, String> {
        let return_ty = self.type_spec()?;
        let name_token = self.eat(TokenKind::Ident)?;
        self.eat(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.current.kind != TokenKind::RParen {
            loop {
                let ty = self.type_spec()?;
                let token = self.eat(TokenKind::Ident)?;
                params.push(Param { ty, name: token.text.clone(), token });
                if self.current.kind != TokenKind::Comma {
                    break;
                }
                self.eat(TokenKind::Comma)?;
            }
        }
        if params.len() > 6 {
            let message = format!("Function '{}' has more than six parameters", name_token.text);
            return Err(self.error("E012", &message, &name_token));
        }
        self.eat(TokenKind::RParen)?;
        let body = self.block()?;
        Ok(FunctionDecl { return_ty, name: name_token.text.clone(), params, body, name_token })
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// `ptr* (int | char | IDENT)`
    fn type_spec(&mut self) -> Result<Ty, String> {
        let mut ptr_level = 0;
        while self.current.kind == TokenKind::KwPtr {
            self.advance()?;
            ptr_level += 1;
        }
        let mut ty = match self.current.kind {
            TokenKind::KwInt => {
                self.advance()?;
                Ty::int()
            }
            TokenKind::KwChar => {
                self.advance()?;
                Ty::char_()
            }
            TokenKind::Ident => {
                let token = self.advance()?;
                Ty::named(token.text)
            }
            _ => return Err(self.error("E017", "Expected a type specifier", &self.current)),
        };
        ty.ptr_level = ptr_level;
        Ok(ty)
    }

    /// A variable declaration starts with a type keyword, `mut`, `ptr`, or
    /// an identifier directly followed by another identifier.
    fn starts_var_decl(&self) -> bool {
        match self.current.kind {
            TokenKind::KwMut | TokenKind::KwInt | TokenKind::KwChar | TokenKind::KwPtr => true,
            TokenKind::Ident => self.peek.kind == TokenKind::Ident,
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// `[mut]? T NAME [= EXPR]?` without the trailing semicolon.
    fn variable_declaration(&mut self) -> Result<Stmt, String> {
        let mutable = if self.current.kind == TokenKind::KwMut {
            self.advance()?;
            true
        } else {
            false
        };
        let ty = self.type_spec()?;
        let name_token = self.eat(TokenKind::Ident)?;
        let init = if self.current.kind == TokenKind::Assign {
            self.advance()?;
            Some(self.expr()?)
        } else {
            None
        };
        Ok(Stmt::VarDecl { ty, name: name_token.text.clone(), init, mutable, name_token })
    }

    /// Validate an expression as an assignment target. Only variables,
    /// member accesses, and unary operations survive reinterpretation; the
    /// checker further restricts the unary case to `deref`.
    fn check_lvalue(&self, target: &Expr) -> Result<(), String> {
        match target {
            Expr::Var { .. } | Expr::Member { .. } | Expr::Unary { .. } => Ok(()),
            other => Err(self.error("E010", "Invalid left-hand side in assignment", other.token())),
        }
    }

    /// A declaration, assignment, or expression without the trailing
    /// semicolon; used by `for` headers and shared by `block`.
    fn simple_statement(&mut self) -> Result<Stmt, String> {
        if self.starts_var_decl() {
            return self.variable_declaration();
        }
        let expr = self.expr()?;
        if self.current.kind == TokenKind::Assign {
            self.check_lvalue(&expr)?;
            let op_token = self.advance()?;
            let value = self.expr()?;
            return Ok(Stmt::Assign { target: expr, value, op_token });
        }
        Ok(Stmt::Expr(expr))
    }

    fn while_statement(&mut self) -> Result<Stmt, String> {
        let token = self.eat(TokenKind::KwWhile)?;
        self.eat(TokenKind::LParen)?;
        let cond = self.expr()?;
        self.eat(TokenKind::RParen)?;
        let body = self.block()?;
        Ok(Stmt::While { cond, body, token })
    }

    fn loop_statement(&mut self) -> Result<Stmt, String> {
        let token = self.eat(TokenKind::KwLoop)?;
        let body = self.block()?;
        Ok(Stmt::Loop { body, token })
    }

    fn for_statement(&mut self) -> Result<Stmt, String> {
        let token = self.eat(TokenKind::KwFor)?;
        self.eat(TokenKind::LParen)?;

        let init = if self.current.kind != TokenKind::Semicolon {
            Some(Box::new(self.simple_statement()?))
        } else {
            None
        };
        self.eat(TokenKind::Semicolon)?;

        let cond = if self.current.kind != TokenKind::Semicolon {
            Some(self.expr()?)
        } else {
            None
        };
        self.eat(TokenKind::Semicolon)?;

        let step = if self.current.kind != TokenKind::RParen {
            Some(Box::new(self.simple_statement()?))
        } else {
            None
        };
        self.eat(TokenKind::RParen)?;

        let body = self.block()?;
        Ok(Stmt::For { init, cond, step, body, token })
    }

    fn return_statement(&mut self) -> Result<Stmt, String> {
        let token = self.eat(TokenKind::KwReturn)?;
        let value = if self.current.kind != TokenKind::Semicolon {
            Some(self.expr()?)
        } else {
            None
        };
        self.eat(TokenKind::Semicolon)?;
        Ok(Stmt::Return { value, token })
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    fn block(&mut self) -> Result<Block, String> {
        let token = self.eat(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        let mut tail = None;
        while self.current.kind != TokenKind::RBrace {
            match self.current.kind {
                TokenKind::KwWhile => stmts.push(self.while_statement()?),
                TokenKind::KwLoop => stmts.push(self.loop_statement()?),
                TokenKind::KwFor => stmts.push(self.for_statement()?),
                TokenKind::KwReturn => stmts.push(self.return_statement()?),
                TokenKind::KwBreak => {
                    let token = self.advance()?;
                    self.eat(TokenKind::Semicolon)?;
                    stmts.push(Stmt::Break { token });
                }
                TokenKind::KwContinue => {
                    let token = self.advance()?;
                    self.eat(TokenKind::Semicolon)?;
                    stmts.push(Stmt::Continue { token });
                }
                TokenKind::KwIf => {
                    // Statement-position `if` may omit its else arm and is
                    // not followed by a semicolon; before the closing brace
                    // it is the block's value instead.
                    let if_expr = self.if_expression(false)?;
                    if self.current.kind == TokenKind::RBrace {
                        tail = Some(if_expr);
                        break;
                    }
                    stmts.push(Stmt::Expr(if_expr));
                }
                _ => {
                    let stmt = self.simple_statement()?;
                    match (&stmt, self.current.kind) {
                        // An expression right before `}` is the block value.
                        (Stmt::Expr(_), TokenKind::RBrace) => {
                            if let Stmt::Expr(expr) = stmt {
                                tail = Some(expr);
                            }
                            break;
                        }
                        _ => {
                            self.eat(TokenKind::Semicolon)?;
                            stmts.push(stmt);
                        }
                    }
                }
            }
        }
        self.eat(TokenKind::RBrace)?;
        Ok(Block { stmts, tail, token })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Full expression: binary levels plus the right-associative ternary
    /// suffix `THEN if COND else ELSE`.
    pub fn expr(&mut self) -> Result<Expr, String> {
        let node = self.binary_expr(0)?;
        if self.current.kind == TokenKind::KwIf {
            let token = self.advance()?;
            let cond = self.expr()?;
            self.eat(TokenKind::KwElse)?;
            let else_expr = self.expr()?;
            return Ok(Expr::If {
                cond: Box::new(cond),
                then_block: Box::new(node.into_block()),
                else_block: Some(Box::new(else_expr.into_block())),
                token,
            });
        }
        Ok(node)
    }

    fn binary_expr(&mut self, level: usize) -> Result<Expr, String> {
        if level == BINARY_LEVELS.len() {
            return self.unary_expr();
        }
        let ops = BINARY_LEVELS[level];
        let mut node = self.binary_expr(level + 1)?;
        while ops.contains(&self.current.kind) {
            let op = self.advance()?;
            let right = self.binary_expr(level + 1)?;
            node = Expr::Binary { op, left: Box::new(node), right: Box::new(right) };
            if level == COMPARISON_LEVEL {
                break;
            }
        }
        Ok(node)
    }

    fn unary_expr(&mut self) -> Result<Expr, String> {
        if UNARY_OPS.contains(&self.current.kind) {
            let op = self.advance()?;
            let operand = self.unary_expr()?;
            return Ok(Expr::Unary { op, operand: Box::new(operand) });
        }
        self.postfix_expr()
    }

    /// Primary expression followed by a member access chain.
    fn postfix_expr(&mut self) -> Result<Expr, String> {
        let mut node = self.primary()?;
        while self.current.kind == TokenKind::Dot {
            self.advance()?;
            let field_token = self.eat(TokenKind::Ident)?;
            node = Expr::Member {
                base: Box::new(node),
                field: field_token.text.clone(),
                field_token,
            };
        }
        Ok(node)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.current.kind {
            TokenKind::Int => {
                let token = self.advance()?;
                Ok(Expr::Int { value: token.value, token })
            }
            TokenKind::CharLit => {
                let token = self.advance()?;
                Ok(Expr::Char { value: token.value, token })
            }
            TokenKind::Str => {
                let token = self.advance()?;
                Ok(Expr::Str { value: token.text.clone(), token })
            }
            TokenKind::LParen => {
                self.advance()?;
                let node = self.expr()?;
                self.eat(TokenKind::RParen)?;
                Ok(node)
            }
            TokenKind::LBrace => Ok(Expr::Block(Box::new(self.block()?))),
            TokenKind::KwIf => self.if_expression(true),
            TokenKind::Ident => {
                // Allocation forms are ordinary identifiers with dedicated
                // node shapes; `new` is followed by a type, not parentheses.
                if self.current.text == "alloc" && self.peek.kind == TokenKind::LParen {
                    let token = self.advance()?;
                    self.eat(TokenKind::LParen)?;
                    let size = self.expr()?;
                    self.eat(TokenKind::RParen)?;
                    return Ok(Expr::Alloc { size: Box::new(size), token });
                }
                if self.current.text == "free" && self.peek.kind == TokenKind::LParen {
                    let token = self.advance()?;
                    self.eat(TokenKind::LParen)?;
                    let operand = self.expr()?;
                    self.eat(TokenKind::RParen)?;
                    return Ok(Expr::Free { operand: Box::new(operand), token });
                }
                if self.current.text == "new" {
                    let token = self.advance()?;
                    let ty = self.type_spec()?;
                    return Ok(Expr::New { ty, token });
                }
                if self.peek.kind == TokenKind::LParen {
                    return self.function_call();
                }
                let token = self.advance()?;
                Ok(Expr::Var { name: token.text.clone(), token })
            }
            _ => Err(self.error("E001", "Invalid factor in expression", &self.current)),
        }
    }

    fn function_call(&mut self) -> Result<Expr, String> {
        let token = self.eat(TokenKind::Ident)?;
        self.eat(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.current.kind != TokenKind::RParen {
            loop {
                args.push(self.expr()?);
                if self.current.kind != TokenKind::Comma {
                    break;
                }
                self.eat(TokenKind::Comma)?;
            }
        }
        self.eat(TokenKind::RParen)?;
        Ok(Expr::Call { name: token.text.clone(), args, token })
    }

    /// `if (E) B (elif (E) B)* [else B]`. With `require_else` the trailing
    /// arm is mandatory (expression position).
    fn if_expression(&mut self, require_else: bool) -> Result<Expr, String> {
        let token = if self.current.kind == TokenKind::KwElif {
            self.advance()?
        } else {
            self.eat(TokenKind::KwIf)?
        };
        self.eat(TokenKind::LParen)?;
        let cond = self.expr()?;
        self.eat(TokenKind::RParen)?;
        let then_block = self.block()?;
        let else_block = if self.current.kind == TokenKind::KwElif {
            let chained = self.if_expression(require_else)?;
            Some(Box::new(chained.into_block()))
        } else if self.current.kind == TokenKind::KwElse {
            self.advance()?;
            Some(Box::new(self.block()?))
        } else if require_else {
            return Err(self.error("E001", "Expected 'else' or 'elif' for if-expression.", &self.current));
        } else {
            None
        };
        Ok(Expr::If {
            cond: Box::new(cond),
            then_block: Box::new(then_block),
            else_block,
            token,
        })
    }
}

/// Human-readable token kind for error messages.
fn describe_kind(kind: TokenKind) -> String {
    use TokenKind::*;
    let symbol = match kind {
        Plus => "+",
        Minus => "-",
        Star => "*",
        Slash => "/",
        LParen => "(",
        RParen => ")",
        LBrace => "{",
        RBrace => "}",
        Semicolon => ";",
        Comma => ",",
        Dot => ".",
        Assign => "=",
        Less => "<",
        Greater => ">",
        EqEq => "==",
        NotEq => "!=",
        LessEq => "<=",
        GreaterEq => ">=",
        TypeEq => "===",
        Ident => return "IDENTIFIER".to_string(),
        Int => return "INTEGER".to_string(),
        CharLit => return "CHAR".to_string(),
        Str => return "STRING".to_string(),
        Eof => return "EOF".to_string(),
        KwInt => "int",
        KwChar => "char",
        KwMut => "mut",
        KwConst => "const",
        KwReturn => "return",
        KwIf => "if",
        KwElse => "else",
        KwElif => "elif",
        KwWhile => "while",
        KwLoop => "loop",
        KwFor => "for",
        KwBreak => "break",
        KwContinue => "continue",
        KwPtr => "ptr",
        KwAddr => "addr",
        KwDeref => "deref",
        KwStruct => "struct",
        KwOr => "or",
        KwAnd => "and",
        KwNot => "not",
        KwXor => "xor",
        KwBor => "bor",
        KwBand => "band",
        KwBnot => "bnot",
        KwBxor => "bxor",
        KwNor => "nor",
        KwNand => "nand",
        KwNnot => "nnot",
        KwXnor => "xnor",
        KwNbor => "nbor",
        KwNband => "nband",
        KwNbnot => "nbnot",
        KwNbxor => "nbxor",
    };
    if symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        format!("keyword '{}'", symbol)
    } else {
        format!("'{}'", symbol)
    }
}

fn describe_token(token: &Token) -> String {
    match token.kind {
        TokenKind::Ident => format!("identifier '{}'", token.text),
        TokenKind::Eof => "EOF".to_string(),
        _ => describe_kind(token.kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BaseTy;

    fn parse_source(source: &str) -> Result<Program, String> {
        let reporter = Reporter::new("test.ign", source);
        let lexer = Lexer::new(source, &reporter);
        let mut parser = Parser::new(lexer, &reporter)?;
        parser.parse()
    }

    fn parse_ok(source: &str) -> Program {
        parse_source(source).unwrap()
    }

    fn main_body(program: &Program) -> &Block {
        for decl in &program.decls {
            if let Decl::Function(f) = decl {
                if f.name == "main" {
                    return &f.body;
                }
            }
        }
        panic!("no main in test program");
    }

    #[test]
    fn test_minimal_program() {
        let program = parse_ok("int main() { return 0; }");
        assert_eq!(program.decls.len(), 1);
        let Decl::Function(f) = &program.decls[0] else { panic!() };
        assert_eq!(f.name, "main");
        assert_eq!(f.return_ty, Ty::int());
        assert!(f.params.is_empty());
    }

    #[test]
    fn test_empty_source_is_error() {
        assert!(parse_source("").unwrap_err().contains("E001"));
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let program = parse_ok("int main() { return 2 + 3 * 4; }");
        let body = main_body(&program);
        let Stmt::Return { value: Some(Expr::Binary { op, left, right }), .. } = &body.stmts[0] else {
            panic!("expected return of a binary expression");
        };
        assert_eq!(op.kind, TokenKind::Plus);
        assert!(matches!(**left, Expr::Int { value: 2, .. }));
        assert!(matches!(**right, Expr::Binary { .. }));
    }

    #[test]
    fn test_comparison_is_non_associative() {
        let err = parse_source("int main() { return 1 < 2 < 3; }").unwrap_err();
        assert!(err.contains("E001"));
    }

    #[test]
    fn test_logical_precedence_below_comparison() {
        // a == b and c == d must parse as (a == b) and (c == d)
        let program = parse_ok("int main() { return 1 == 2 and 3 == 4; }");
        let body = main_body(&program);
        let Stmt::Return { value: Some(Expr::Binary { op, left, right }), .. } = &body.stmts[0] else {
            panic!();
        };
        assert_eq!(op.kind, TokenKind::KwAnd);
        assert!(matches!(**left, Expr::Binary { .. }));
        assert!(matches!(**right, Expr::Binary { .. }));
    }

    #[test]
    fn test_ternary_if_suffix() {
        let program = parse_ok("int main() { int v = 1 if 3 > 2 else 0; return v; }");
        let body = main_body(&program);
        let Stmt::VarDecl { init: Some(Expr::If { else_block, .. }), .. } = &body.stmts[0] else {
            panic!("expected var decl with if-expression initializer");
        };
        assert!(else_block.is_some());
    }

    #[test]
    fn test_if_expression_requires_else() {
        let err = parse_source("int main() { int v = if (1) { 2 }; return v; }").unwrap_err();
        assert!(err.contains("Expected 'else' or 'elif'"));
    }

    #[test]
    fn test_statement_if_may_omit_else() {
        let program = parse_ok("int main() { if (1) { return 2; } return 0; }");
        let body = main_body(&program);
        assert!(matches!(&body.stmts[0], Stmt::Expr(Expr::If { else_block: None, .. })));
    }

    #[test]
    fn test_elif_chain() {
        let program = parse_ok(
            "int main() { if (1) { return 1; } elif (2) { return 2; } else { return 3; } }",
        );
        let body = main_body(&program);
        let Some(Expr::If { else_block: Some(else_block), .. }) = &body.tail else {
            panic!("expected trailing if");
        };
        // The elif chain nests another if as the else-arm's value.
        assert!(matches!(&else_block.tail, Some(Expr::If { .. })));
    }

    #[test]
    fn test_block_tail_expression() {
        let program = parse_ok("int main() { int x = 1; x + 2 }");
        let body = main_body(&program);
        assert_eq!(body.stmts.len(), 1);
        assert!(matches!(&body.tail, Some(Expr::Binary { .. })));
    }

    #[test]
    fn test_pointer_types() {
        let program = parse_ok("int main() { ptr ptr int pp; return 0; }");
        let body = main_body(&program);
        let Stmt::VarDecl { ty, .. } = &body.stmts[0] else { panic!() };
        assert_eq!(ty.ptr_level, 2);
        assert_eq!(ty.base, BaseTy::Int);
    }

    #[test]
    fn test_struct_definition_and_var() {
        let program = parse_ok("struct Pt { int x; int y; } int main() { mut Pt p; return 0; }");
        let Decl::Struct(s) = &program.decls[0] else { panic!() };
        assert_eq!(s.name, "Pt");
        assert_eq!(s.fields.len(), 2);
        let body = main_body(&program);
        let Stmt::VarDecl { ty, mutable, .. } = &body.stmts[0] else { panic!() };
        assert_eq!(ty.struct_name(), Some("Pt"));
        assert!(*mutable);
    }

    #[test]
    fn test_empty_struct_is_error() {
        assert!(parse_source("struct S { } int main() { return 0; }").is_err());
    }

    #[test]
    fn test_member_access_chain() {
        let program = parse_ok("struct A { int b; } int main() { mut A a; return a.b; }");
        let body = main_body(&program);
        let Stmt::Return { value: Some(Expr::Member { field, .. }), .. } = &body.stmts[1] else {
            panic!();
        };
        assert_eq!(field, "b");
    }

    #[test]
    fn test_assignment_and_lvalue_error() {
        let program = parse_ok("int main() { mut int x = 0; x = 1; return x; }");
        let body = main_body(&program);
        assert!(matches!(&body.stmts[1], Stmt::Assign { target: Expr::Var { .. }, .. }));

        let err = parse_source("int main() { 1 + 2 = 3; return 0; }").unwrap_err();
        assert!(err.contains("E010"));
    }

    #[test]
    fn test_deref_assignment_target() {
        let program = parse_ok("int main() { mut int x = 1; ptr int p = addr x; deref p = 2; return x; }");
        let body = main_body(&program);
        let Stmt::Assign { target: Expr::Unary { op, .. }, .. } = &body.stmts[2] else { panic!() };
        assert_eq!(op.kind, TokenKind::KwDeref);
    }

    #[test]
    fn test_for_loop_header() {
        let program = parse_ok("int main() { for (mut int i = 0; i < 3; i = i + 1) { print(i); } return 0; }");
        let body = main_body(&program);
        let Stmt::For { init, cond, step, .. } = &body.stmts[0] else { panic!() };
        assert!(matches!(init.as_deref(), Some(Stmt::VarDecl { .. })));
        assert!(cond.is_some());
        assert!(matches!(step.as_deref(), Some(Stmt::Assign { .. })));
    }

    #[test]
    fn test_for_loop_empty_header() {
        let program = parse_ok("int main() { for (;;) { break; } return 0; }");
        let body = main_body(&program);
        let Stmt::For { init, cond, step, .. } = &body.stmts[0] else { panic!() };
        assert!(init.is_none());
        assert!(cond.is_none());
        assert!(step.is_none());
    }

    #[test]
    fn test_while_loop_and_break_continue() {
        let program = parse_ok("int main() { while (1) { break; continue; } return 0; }");
        let body = main_body(&program);
        let Stmt::While { body: loop_body, .. } = &body.stmts[0] else { panic!() };
        assert!(matches!(&loop_body.stmts[0], Stmt::Break { .. }));
        assert!(matches!(&loop_body.stmts[1], Stmt::Continue { .. }));
    }

    #[test]
    fn test_alloc_new_free() {
        let program = parse_ok(
            "struct Pt { int x; } int main() { ptr char m = alloc(16); ptr Pt p = new Pt; free(m); return 0; }",
        );
        let body = main_body(&program);
        assert!(matches!(&body.stmts[0], Stmt::VarDecl { init: Some(Expr::Alloc { .. }), .. }));
        let Stmt::VarDecl { init: Some(Expr::New { ty, .. }), .. } = &body.stmts[1] else { panic!() };
        assert_eq!(ty.struct_name(), Some("Pt"));
        assert!(matches!(&body.stmts[2], Stmt::Expr(Expr::Free { .. })));
    }

    #[test]
    fn test_call_with_arguments() {
        let program = parse_ok("int add(int a, int b) { return a + b; } int main() { return add(1, 2); }");
        let Decl::Function(f) = &program.decls[0] else { panic!() };
        assert_eq!(f.params.len(), 2);
        let body = main_body(&program);
        let Stmt::Return { value: Some(Expr::Call { name, args, .. }), .. } = &body.stmts[0] else {
            panic!();
        };
        assert_eq!(name, "add");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_too_many_parameters() {
        let err = parse_source("int f(int a, int b, int c, int d, int e, int g, int h) { return 0; } int main() { return 0; }")
            .unwrap_err();
        assert!(err.contains("E012"));
    }

    #[test]
    fn test_missing_type_is_e017() {
        let err = parse_source("const = 3; int main() { return 0; }").unwrap_err();
        assert!(err.contains("E017"));
    }

    #[test]
    fn test_unary_chain() {
        let program = parse_ok("int main() { return not not 0; }");
        let body = main_body(&program);
        let Stmt::Return { value: Some(Expr::Unary { operand, .. }), .. } = &body.stmts[0] else {
            panic!();
        };
        assert!(matches!(**operand, Expr::Unary { .. }));
    }

    #[test]
    fn test_string_and_char_literals() {
        let program = parse_ok(r#"int main() { ptr char s = "hi\n"; char c = 'x'; return 0; }"#);
        let body = main_body(&program);
        let Stmt::VarDecl { init: Some(Expr::Str { value, .. }), .. } = &body.stmts[0] else { panic!() };
        assert_eq!(value, "hi\n");
        let Stmt::VarDecl { init: Some(Expr::Char { value, .. }), .. } = &body.stmts[1] else { panic!() };
        assert_eq!(*value, 120);
    }

    #[test]
    fn test_type_equal_operator() {
        let program = parse_ok("int main() { return 1 === 2; }");
        let body = main_body(&program);
        let Stmt::Return { value: Some(Expr::Binary { op, .. }), .. } = &body.stmts[0] else { panic!() };
        assert_eq!(op.kind, TokenKind::TypeEq);
    }

    #[test]
    fn test_const_declaration() {
        let program = parse_ok("const int LIMIT = 10; int main() { return LIMIT; }");
        let Decl::Const(c) = &program.decls[0] else { panic!() };
        assert_eq!(c.name, "LIMIT");
        assert_eq!(c.ty, Ty::int());
    }
}
