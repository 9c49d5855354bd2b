use crate::error::{ParseError, ParseResult};
use crate::lang::ast::*;
use crate::lang::context::Context;
use crate::lang::lexer::{tokenize, Spanned, Token};
use std::sync::Arc;

/// Parses a complete OpenQASM 2 translation unit. `include` directives are
/// recorded in [`Program::includes`] but not resolved.
pub fn parse(source: &str, filename: &str) -> ParseResult<Program> {
    let tokens = tokenize(source, Arc::from(filename))?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_program(filename, true)
}

/// Parses an included file, for which the `OPENQASM` header is optional.
pub fn parse_fragment(source: &str, filename: &str) -> ParseResult<Program> {
    let tokens = tokenize(source, Arc::from(filename))?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_program(filename, false)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn context(&self) -> Context {
        self.tokens[self.pos.min(self.tokens.len() - 1)].context.clone()
    }

    fn advance(&mut self) -> Spanned {
        let spanned = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        spanned
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            format!("expected {}, found {}", expected, self.peek()),
            &self.context(),
        )
    }

    fn expect(&mut self, token: Token) -> ParseResult<Context> {
        if self.check(&token) {
            Ok(self.advance().context)
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn identifier(&mut self) -> ParseResult<String> {
        match self.peek() {
            Token::Id(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn integer(&mut self) -> ParseResult<u64> {
        match self.peek() {
            Token::Integer(v) => {
                let v = *v;
                self.advance();
                Ok(v)
            }
            _ => Err(self.unexpected("a non-negative integer")),
        }
    }

    fn index(&mut self) -> ParseResult<usize> {
        let context = self.context();
        let value = self.integer()?;
        usize::try_from(value)
            .map_err(|_| ParseError::new(format!("index {} is too large", value), &context))
    }

    fn parse_program(&mut self, filename: &str, require_header: bool) -> ParseResult<Program> {
        let version = if require_header || self.check(&Token::OpenQasm) {
            self.expect(Token::OpenQasm)?;
            let version = match self.peek() {
                Token::Real(v) => *v,
                Token::Integer(v) => *v as f64,
                _ => return Err(self.unexpected("a version number")),
            };
            self.advance();
            self.expect(Token::Semicolon)?;
            version
        } else {
            2.0
        };

        let mut includes = Vec::new();
        while self.check(&Token::Include) {
            let context = self.context();
            self.advance();
            let path = self.include_path()?;
            includes.push(Include { path, context });
        }

        let mut statements = Vec::new();
        while !self.check(&Token::Eof) {
            if self.check(&Token::Include) {
                return Err(ParseError::new(
                    "include directives must precede all other statements",
                    &self.context(),
                ));
            }
            statements.push(self.statement()?);
        }

        Ok(Program {
            filename: filename.to_string(),
            version,
            includes,
            statements,
        })
    }

    fn include_path(&mut self) -> ParseResult<String> {
        let path = match self.peek() {
            Token::Str(path) => path.clone(),
            _ => return Err(self.unexpected("a quoted file name")),
        };
        self.advance();
        self.expect(Token::Semicolon)?;
        Ok(path)
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        let context = self.context();
        let kind = match self.peek() {
            Token::Qreg => self.register(RegisterKind::Qubit)?,
            Token::Creg => self.register(RegisterKind::Classical)?,
            Token::Gate => self.gate_declaration()?,
            Token::Opaque => self.opaque_declaration()?,
            Token::Barrier => self.barrier()?,
            Token::If => self.if_statement()?,
            _ => return self.quantum_operation(),
        };
        Ok(Statement::new(kind, context))
    }

    fn register(&mut self, register: RegisterKind) -> ParseResult<StatementKind> {
        self.advance();
        let name = self.identifier()?;
        self.expect(Token::LBracket)?;
        let width = self.index()?;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;
        Ok(StatementKind::VariableDeclaration {
            register,
            name,
            width,
        })
    }

    // `name [ ( params ) ] args`
    fn signature(&mut self) -> ParseResult<(String, Option<Vec<String>>, Vec<String>)> {
        self.advance();
        let name = self.identifier()?;
        let parameters = if self.consume(&Token::LParen) {
            let list = if self.check(&Token::RParen) {
                Vec::new()
            } else {
                self.identifier_list()?
            };
            self.expect(Token::RParen)?;
            Some(list)
        } else {
            None
        };
        let arguments = self.identifier_list()?;
        Ok((name, parameters, arguments))
    }

    fn gate_declaration(&mut self) -> ParseResult<StatementKind> {
        let (name, parameters, arguments) = self.signature()?;
        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        while !self.consume(&Token::RBrace) {
            let context = self.context();
            let statement = match self.peek() {
                Token::Barrier => Statement::new(self.barrier()?, context),
                Token::U | Token::CX | Token::Id(_) => self.quantum_operation()?,
                Token::Eof => return Err(self.unexpected("'}'")),
                _ => {
                    return Err(ParseError::new(
                        format!("{} is not allowed inside a gate body", self.peek()),
                        &context,
                    ))
                }
            };
            body.push(statement);
        }
        Ok(StatementKind::Gate(GateDeclaration {
            name,
            parameters,
            arguments,
            body,
        }))
    }

    fn opaque_declaration(&mut self) -> ParseResult<StatementKind> {
        let (name, parameters, arguments) = self.signature()?;
        self.expect(Token::Semicolon)?;
        Ok(StatementKind::Opaque(OpaqueDeclaration {
            name,
            parameters,
            arguments,
        }))
    }

    fn barrier(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        let variables = self.argument_list()?;
        self.expect(Token::Semicolon)?;
        Ok(StatementKind::Barrier { variables })
    }

    fn if_statement(&mut self) -> ParseResult<StatementKind> {
        self.advance();
        self.expect(Token::LParen)?;
        let variable = self.argument()?;
        self.expect(Token::EqEq)?;
        let value = self.expression()?;
        self.expect(Token::RParen)?;
        let operation = Box::new(self.quantum_operation()?);
        Ok(StatementKind::If {
            variable,
            value,
            operation,
        })
    }

    // unitary operation, measure or reset
    fn quantum_operation(&mut self) -> ParseResult<Statement> {
        let context = self.context();
        let kind = match self.peek().clone() {
            Token::Measure => {
                self.advance();
                let source = self.argument()?;
                self.expect(Token::Arrow)?;
                let target = self.argument()?;
                StatementKind::Measure { source, target }
            }
            Token::Reset => {
                self.advance();
                StatementKind::Reset {
                    target: self.argument()?,
                }
            }
            Token::U => {
                self.advance();
                self.expect(Token::LParen)?;
                let parameters = self.expression_list()?;
                self.expect(Token::RParen)?;
                StatementKind::Unitary(UnitaryOperation {
                    operator: Operator::U,
                    parameters: Some(parameters),
                    arguments: self.argument_list()?,
                })
            }
            Token::CX => {
                self.advance();
                let parameters = self.optional_parameters()?;
                StatementKind::Unitary(UnitaryOperation {
                    operator: Operator::CX,
                    parameters,
                    arguments: self.argument_list()?,
                })
            }
            Token::Id(name) => {
                self.advance();
                let parameters = self.optional_parameters()?;
                StatementKind::Unitary(UnitaryOperation {
                    operator: Operator::Named(name),
                    parameters,
                    arguments: self.argument_list()?,
                })
            }
            _ => return Err(self.unexpected("a statement")),
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::new(kind, context))
    }

    fn optional_parameters(&mut self) -> ParseResult<Option<Vec<Expression>>> {
        if !self.consume(&Token::LParen) {
            return Ok(None);
        }
        let list = if self.check(&Token::RParen) {
            Vec::new()
        } else {
            self.expression_list()?
        };
        self.expect(Token::RParen)?;
        Ok(Some(list))
    }

    fn identifier_list(&mut self) -> ParseResult<Vec<String>> {
        let mut list = vec![self.identifier()?];
        while self.consume(&Token::Comma) {
            list.push(self.identifier()?);
        }
        Ok(list)
    }

    fn argument(&mut self) -> ParseResult<Variable> {
        let context = self.context();
        let name = self.identifier()?;
        let index = if self.consume(&Token::LBracket) {
            let i = self.index()?;
            self.expect(Token::RBracket)?;
            Some(i)
        } else {
            None
        };
        Ok(Variable {
            name,
            index,
            context,
        })
    }

    fn argument_list(&mut self) -> ParseResult<Vec<Variable>> {
        let mut list = vec![self.argument()?];
        while self.consume(&Token::Comma) {
            list.push(self.argument()?);
        }
        Ok(list)
    }

    fn expression_list(&mut self) -> ParseResult<Vec<Expression>> {
        let mut list = vec![self.expression()?];
        while self.consume(&Token::Comma) {
            list.push(self.expression()?);
        }
        Ok(list)
    }

    fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        let context = left.context.clone();
        Expression::new(
            ExpressionKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            context,
        )
    }

    fn expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = Self::binary(op, left, right);
        }
    }

    fn term(&mut self) -> ParseResult<Expression> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Times => BinaryOp::Mul,
                Token::Divide => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Self::binary(op, left, right);
        }
    }

    // -a^b is -(a^b)
    fn unary(&mut self) -> ParseResult<Expression> {
        let context = self.context();
        if self.consume(&Token::Minus) {
            let target = self.unary()?;
            return Ok(Expression::new(
                ExpressionKind::Minus(Box::new(target)),
                context,
            ));
        }
        self.power()
    }

    fn power(&mut self) -> ParseResult<Expression> {
        let base = self.atom()?;
        if self.consume(&Token::Caret) {
            let exponent = self.unary()?;
            return Ok(Self::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> ParseResult<Expression> {
        let context = self.context();
        let func = match self.peek() {
            Token::Sin => Some(UnaryFn::Sin),
            Token::Cos => Some(UnaryFn::Cos),
            Token::Tan => Some(UnaryFn::Tan),
            Token::Exp => Some(UnaryFn::Exp),
            Token::Ln => Some(UnaryFn::Ln),
            Token::Sqrt => Some(UnaryFn::Sqrt),
            _ => None,
        };
        if let Some(func) = func {
            self.advance();
            self.expect(Token::LParen)?;
            let target = Box::new(self.expression()?);
            self.expect(Token::RParen)?;
            return Ok(Expression::new(
                ExpressionKind::Unary { func, target },
                context,
            ));
        }

        let kind = match self.peek() {
            Token::Real(v) => ExpressionKind::Real(*v),
            Token::Integer(v) => ExpressionKind::Integer(*v),
            Token::Pi => ExpressionKind::Pi,
            Token::Id(_) => return Ok(Expression::new(ExpressionKind::Variable(self.argument()?), context)),
            Token::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(Expression::new(kind, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(body: &str) -> Program {
        parse(&format!("OPENQASM 2.0;\n{}", body), "test.qasm").unwrap()
    }

    fn single(body: &str) -> StatementKind {
        program(body).statements.remove(0).kind
    }

    fn expression(text: &str) -> String {
        match single(&format!("U({},0,0) q;", text)) {
            StatementKind::Unitary(op) => op.parameters.unwrap()[0].to_string(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_header_and_includes() {
        let p = parse("OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[1];", "a.qasm").unwrap();
        assert_eq!(p.version, 2.0);
        assert_eq!(p.includes.len(), 1);
        assert_eq!(p.includes[0].path, "qelib1.inc");
        assert_eq!(p.includes[0].context.line, 2);
        assert_eq!(p.statements.len(), 1);
        assert_eq!(p.statements[0].context.line, 3);
    }

    #[test]
    fn register_declarations() {
        assert_eq!(
            single("creg c[4];"),
            StatementKind::VariableDeclaration {
                register: RegisterKind::Classical,
                name: "c".into(),
                width: 4
            }
        );
    }

    #[test]
    fn gate_declaration_with_parameters_and_body() {
        match single("gate rot(a, b) x, y { U(a, b, 0) x; CX x, y; barrier x; }") {
            StatementKind::Gate(gate) => {
                assert_eq!(gate.name, "rot");
                assert_eq!(gate.parameters, Some(vec!["a".into(), "b".into()]));
                assert_eq!(gate.arguments, vec!["x".to_string(), "y".to_string()]);
                assert_eq!(gate.body.len(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn gate_body_rejects_measure() {
        assert!(parse("OPENQASM 2.0; gate g a { measure a -> a; }", "t").is_err());
    }

    #[test]
    fn named_call_with_empty_parameter_list() {
        match single("g() q[0], r;") {
            StatementKind::Unitary(op) => {
                assert_eq!(op.operator, Operator::Named("g".into()));
                assert_eq!(op.parameters, Some(vec![]));
                assert_eq!(op.arguments[0].index, Some(0));
                assert_eq!(op.arguments[1].index, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn measure_reset_if_and_opaque() {
        assert!(matches!(single("measure q[0] -> c[1];"), StatementKind::Measure { .. }));
        assert!(matches!(single("reset q;"), StatementKind::Reset { .. }));
        assert!(matches!(single("opaque magic(t) a, b;"), StatementKind::Opaque(_)));
        match single("if (c == 3) x q[0];") {
            StatementKind::If { variable, operation, .. } => {
                assert_eq!(variable.name, "c");
                assert!(matches!(operation.kind, StatementKind::Unitary(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn expression_precedence() {
        assert_eq!(expression("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(expression("1 - 2 - 3"), "((1 - 2) - 3)");
        assert_eq!(expression("2 ^ 3 ^ 2"), "(2 ^ (3 ^ 2))");
        assert_eq!(expression("-pi/2"), "(-pi / 2)");
        assert_eq!(expression("-2^2"), "-(2 ^ 2)");
        assert_eq!(expression("sin(pi) * (1 + 1)"), "(sin(pi) * (1 + 1))");
    }

    #[test]
    fn fragments_need_no_header() {
        let p = parse_fragment("gate g a { U(0,0,0) a; }", "lib.inc").unwrap();
        assert_eq!(p.statements.len(), 1);
        assert!(parse("gate g a { }", "main.qasm").is_err());
    }

    #[test]
    fn late_include_is_rejected() {
        let err = parse("OPENQASM 2.0; qreg q[1]; include \"x.inc\";", "t").unwrap_err();
        assert!(err.message.contains("include"));
    }

    #[test]
    fn errors_carry_positions() {
        let err = parse("OPENQASM 2.0;\nqreg q[1]\ncreg c[1];", "t").unwrap_err();
        assert_eq!(err.context.line, 3);
        assert!(err.message.contains("';'"));
    }
}
