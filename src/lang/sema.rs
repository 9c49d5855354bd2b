use crate::error::{SemanticError, SemanticErrorKind as Kind, SemanticResult};
use crate::lang::ast::*;
use crate::lang::context::Context;
use crate::lang::symbol_table::{Symbol, SymbolKind, SymbolTable};
use log::debug;

/// Runs both passes over `program` and hands back the populated table.
pub fn check(program: &Program) -> SemanticResult<SymbolTable> {
    let mut verifier = Verifier::new();
    verifier.declare_symbols(program)?;
    verifier.verify(program)?;
    Ok(verifier.into_symbol_table())
}

/// Two-pass semantic checker: a declaration pass that fills the symbol table
/// and saves one scope per gate, then a verification pass that re-enters
/// those scopes to check gate bodies.
pub struct Verifier {
    table: SymbolTable,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier {
    pub fn new() -> Self {
        let mut table = SymbolTable::new();
        table.push_scope();
        Verifier { table }
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn into_symbol_table(self) -> SymbolTable {
        self.table
    }

    pub fn declare_symbols(&mut self, program: &Program) -> SemanticResult<()> {
        debug!("declaring symbols of {}", program.filename);
        program
            .statements
            .iter()
            .try_for_each(|statement| self.declare_statement(statement))
    }

    pub fn verify(&mut self, program: &Program) -> SemanticResult<()> {
        debug!("verifying {}", program.filename);
        program
            .statements
            .iter()
            .try_for_each(|statement| self.verify_statement(statement))
    }

    fn declare(&mut self, name: &str, kind: SymbolKind, context: &Context) -> SemanticResult<()> {
        if let Some(existing) = self.table.lookup(name, true) {
            return Err(SemanticError::new(
                Kind::Redeclaration,
                format!("{} has already been declared in line {}", name, existing.line),
                context,
            ));
        }
        self.table
            .declare(Symbol::new(name, context.line, kind))
            .map(|_| ())
            .map_err(|symbol| {
                SemanticError::new(
                    Kind::Internal,
                    format!("no open scope to declare {} in", symbol.name),
                    context,
                )
            })
    }

    // gate and opaque declarations share everything but the body
    fn declare_gate(
        &mut self,
        name: &str,
        parameters: &Option<Vec<String>>,
        arguments: &[String],
        body: &[Statement],
        context: &Context,
    ) -> SemanticResult<()> {
        let params = parameters.as_deref().unwrap_or_default();
        self.declare(
            name,
            SymbolKind::Gate {
                parameters: params.len(),
                arguments: arguments.len(),
            },
            context,
        )?;

        self.table.push_scope();
        for (position, param) in params.iter().enumerate() {
            self.declare(param, SymbolKind::GateParameter { position }, context)?;
        }
        for (position, arg) in arguments.iter().enumerate() {
            self.declare(arg, SymbolKind::GateArgument { position }, context)?;
        }
        for statement in body {
            self.declare_statement(statement)
                .map_err(|e| e.within(context))?;
        }
        self.table.pop_and_save(name);
        Ok(())
    }

    fn declare_statement(&mut self, statement: &Statement) -> SemanticResult<()> {
        let context = &statement.context;
        match &statement.kind {
            StatementKind::VariableDeclaration {
                register,
                name,
                width,
            } => {
                if *width == 0 {
                    return Err(SemanticError::new(
                        Kind::EmptyRegister,
                        format!("Register {} must have at least one element", name),
                        context,
                    ));
                }
                self.declare(
                    name,
                    SymbolKind::Vector {
                        register: *register,
                        width: *width,
                    },
                    context,
                )
            }
            StatementKind::Gate(gate) => self.declare_gate(
                &gate.name,
                &gate.parameters,
                &gate.arguments,
                &gate.body,
                context,
            ),
            StatementKind::Opaque(opaque) => self.declare_gate(
                &opaque.name,
                &opaque.parameters,
                &opaque.arguments,
                &[],
                context,
            ),
            StatementKind::If { operation, .. } => self.declare_statement(operation),
            StatementKind::Unitary(_)
            | StatementKind::Measure { .. }
            | StatementKind::Reset { .. }
            | StatementKind::Barrier { .. } => Ok(()),
        }
    }

    fn verify_statement(&mut self, statement: &Statement) -> SemanticResult<()> {
        let context = &statement.context;
        match &statement.kind {
            StatementKind::VariableDeclaration { .. } | StatementKind::Opaque(_) => Ok(()),
            StatementKind::Gate(gate) => self.verify_gate(gate, context),
            StatementKind::If {
                variable,
                value,
                operation,
            } => {
                if self.is_qubit(variable)? {
                    return Err(SemanticError::new(
                        Kind::KindMismatch,
                        format!(
                            "the register '{}' compared in an if statement must be a cbit",
                            variable.name
                        ),
                        context,
                    ));
                }
                self.verify_expression(value)?;
                self.verify_statement(operation)
            }
            StatementKind::Measure { source, target } => {
                if !self.is_qubit(source)? {
                    return Err(SemanticError::new(
                        Kind::KindMismatch,
                        format!(
                            "the source '{}' of the measure operation must be a qubit",
                            source.name
                        ),
                        context,
                    ));
                }
                if self.is_qubit(target)? {
                    return Err(SemanticError::new(
                        Kind::KindMismatch,
                        format!(
                            "the target '{}' of the measure operation must be a cbit",
                            target.name
                        ),
                        context,
                    ));
                }
                Ok(())
            }
            StatementKind::Reset { target } => self.resolve_variable(target).map(|_| ()),
            StatementKind::Barrier { variables } => {
                for v in variables {
                    if !self.is_qubit(v)? {
                        return Err(SemanticError::new(
                            Kind::KindMismatch,
                            format!("the operand '{}' of the barrier must be a qubit", v.name),
                            context,
                        ));
                    }
                }
                Ok(())
            }
            StatementKind::Unitary(op) => self.verify_unitary(op, context),
        }
    }

    fn verify_gate(&mut self, gate: &GateDeclaration, context: &Context) -> SemanticResult<()> {
        if !self.table.restore(&gate.name) {
            return Err(SemanticError::new(
                Kind::Internal,
                format!("no saved scope for gate {}", gate.name),
                context,
            ));
        }
        let result = gate
            .body
            .iter()
            .try_for_each(|statement| self.verify_statement(statement));
        self.table.pop_and_save(&gate.name);
        result.map_err(|e| e.within(context))
    }

    fn verify_unitary(&self, op: &UnitaryOperation, context: &Context) -> SemanticResult<()> {
        let passed = op.parameter_count();
        let arity = |expected: usize, noun: &str| -> SemanticResult<()> {
            Err(SemanticError::new(
                Kind::ArityMismatch,
                format!(
                    "Operator {} expected {} {}, but {} {} were passed",
                    op.operator.name(),
                    expected,
                    noun,
                    op.arguments.len(),
                    noun
                ),
                context,
            ))
        };

        match &op.operator {
            Operator::Named(name) => {
                let symbol = self.table.lookup(name, false).ok_or_else(|| {
                    SemanticError::new(
                        Kind::UndefinedSymbol,
                        format!("Operator {} is not defined", name),
                        context,
                    )
                })?;
                let (parameters, arguments) = match symbol.kind {
                    SymbolKind::Gate {
                        parameters,
                        arguments,
                    } => (parameters, arguments),
                    _ => {
                        return Err(SemanticError::new(
                            Kind::KindMismatch,
                            format!(
                                "Cannot use symbol {}, declared in line {}, as an operator",
                                name, symbol.line
                            ),
                            context,
                        ))
                    }
                };
                if parameters != passed {
                    let passed_text = if op.parameters.is_none() {
                        "no parameters were passed".to_string()
                    } else {
                        format!("{} parameters were passed", passed)
                    };
                    return Err(SemanticError::new(
                        Kind::ArityMismatch,
                        format!(
                            "Operator {} expected {} parameters, but {}",
                            name, parameters, passed_text
                        ),
                        context,
                    ));
                }
                if arguments != op.arguments.len() {
                    return arity(arguments, "arguments");
                }
            }
            Operator::U => {
                if passed != 3 {
                    return Err(SemanticError::new(
                        Kind::ArityMismatch,
                        format!(
                            "Operator U expects 3 parameters, but {} parameters were passed",
                            passed
                        ),
                        context,
                    ));
                }
                if op.arguments.len() != 1 {
                    return arity(1, "arguments");
                }
            }
            Operator::CX => {
                if passed != 0 {
                    return Err(SemanticError::new(
                        Kind::ArityMismatch,
                        format!(
                            "Operator CX expects no parameters, but {} parameters were passed",
                            passed
                        ),
                        context,
                    ));
                }
                if op.arguments.len() != 2 {
                    return arity(2, "arguments");
                }
            }
        }

        for param in op.parameters.iter().flatten() {
            self.verify_expression(param)?;
        }
        for arg in &op.arguments {
            if !self.is_qubit(arg)? {
                return Err(SemanticError::new(
                    Kind::KindMismatch,
                    format!("{} is not a qubit. Operator arguments must be qubits", arg.name),
                    context,
                ));
            }
        }
        Ok(())
    }

    /// Looks `variable` up and checks that it names something usable as a
    /// variable, with an in-range index when it is a register.
    fn resolve_variable(&self, variable: &Variable) -> SemanticResult<&Symbol> {
        let symbol = self.table.lookup(&variable.name, false).ok_or_else(|| {
            SemanticError::new(
                Kind::UndefinedSymbol,
                format!("Variable {} is not defined", variable.name),
                &variable.context,
            )
        })?;
        match symbol.kind {
            SymbolKind::Vector { width, .. } => {
                if let Some(index) = variable.index.filter(|&i| i >= width) {
                    return Err(SemanticError::new(
                        Kind::IndexOutOfRange,
                        format!(
                            "Variable {} is vector of dimension {} and cannot be indexed at {}",
                            variable.name, width, index
                        ),
                        &variable.context,
                    ));
                }
                Ok(symbol)
            }
            SymbolKind::GateArgument { .. } | SymbolKind::GateParameter { .. } => Ok(symbol),
            SymbolKind::Gate { .. } => Err(SemanticError::new(
                Kind::KindMismatch,
                format!(
                    "Cannot use symbol {}, declared in line {}, as a variable",
                    variable.name, symbol.line
                ),
                &variable.context,
            )),
        }
    }

    fn is_qubit(&self, variable: &Variable) -> SemanticResult<bool> {
        Ok(self.resolve_variable(variable)?.is_qubit())
    }

    // a whole register is a vector; a register element or a gate-local name
    // used without an index is a scalar
    fn is_atom(&self, expression: &Expression) -> SemanticResult<bool> {
        match &expression.kind {
            ExpressionKind::Variable(variable) => {
                let symbol = self.resolve_variable(variable)?;
                Ok(match symbol.kind {
                    SymbolKind::Vector { .. } => variable.is_indexed(),
                    _ => !variable.is_indexed(),
                })
            }
            _ => Ok(true),
        }
    }

    fn expression_is_qubit(&self, expression: &Expression) -> SemanticResult<bool> {
        match &expression.kind {
            ExpressionKind::Variable(variable) => self.is_qubit(variable),
            _ => Ok(false),
        }
    }

    fn check_operand(&self, operation: &str, operand: &Expression) -> SemanticResult<()> {
        if !self.is_atom(operand)? {
            return Err(SemanticError::new(
                Kind::KindMismatch,
                format!(
                    "{} operations cannot be performed on vectors. {} is a vector",
                    operation, operand
                ),
                &operand.context,
            ));
        }
        if self.expression_is_qubit(operand)? {
            return Err(SemanticError::new(
                Kind::KindMismatch,
                format!(
                    "{} operations cannot be performed on qubits. {} is a qubit",
                    operation, operand
                ),
                &operand.context,
            ));
        }
        Ok(())
    }

    fn verify_expression(&self, expression: &Expression) -> SemanticResult<()> {
        match &expression.kind {
            ExpressionKind::Real(_) | ExpressionKind::Integer(_) | ExpressionKind::Pi => Ok(()),
            ExpressionKind::Variable(variable) => self.resolve_variable(variable).map(|_| ()),
            ExpressionKind::Minus(target) => self.verify_expression(target),
            ExpressionKind::Binary { op, left, right } => {
                self.verify_expression(left)?;
                self.verify_expression(right)?;
                self.check_operand(op.describe(), left)?;
                self.check_operand(op.describe(), right)
            }
            ExpressionKind::Unary { target, .. } => {
                self.verify_expression(target)?;
                self.check_operand("Unary", target)
            }
        }
    }
}
