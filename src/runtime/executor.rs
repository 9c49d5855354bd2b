use crate::config::RunConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::lang::ast::*;
use crate::runtime::expression::{evaluate, Bindings};
use crate::runtime::gate::{Gate, GateApplication};
use crate::runtime::state::State;
use log::{debug, trace};
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum GateDefinition {
    Defined(GateDeclaration),
    Opaque,
}

/// Runs a program against a [`State`], one statement at a time.
///
/// Gates become callable once their declaration has been executed, so a
/// program must declare a gate before its first use.
pub struct Executor {
    state: State,
    gates: HashMap<String, GateDefinition>,
}

/// Executes `program` on a fresh state built from `config`.
pub fn execute(program: &Program, config: &RunConfig) -> RuntimeResult<State> {
    let mut executor = Executor::new(config);
    executor.run(program)?;
    Ok(executor.into_state())
}

impl Executor {
    pub fn new(config: &RunConfig) -> Self {
        Executor::with_state(State::with_config(config))
    }

    pub fn with_state(state: State) -> Self {
        Executor {
            state,
            gates: HashMap::new(),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn into_state(self) -> State {
        self.state
    }

    pub fn run(&mut self, program: &Program) -> RuntimeResult<()> {
        debug!(
            "running {} ({} statements)",
            program.filename,
            program.statements.len()
        );
        for statement in &program.statements {
            self.execute(statement)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, statement: &Statement) -> RuntimeResult<()> {
        debug!("[{}] {:?}", statement.context, statement.kind);
        self.execute_kind(&statement.kind)
            .map_err(|e| e.at(&statement.context))
    }

    fn execute_kind(&mut self, kind: &StatementKind) -> RuntimeResult<()> {
        match kind {
            StatementKind::VariableDeclaration {
                register: RegisterKind::Qubit,
                name,
                width,
            } => self.state.declare_quantum_register(name, *width),
            StatementKind::VariableDeclaration {
                register: RegisterKind::Classical,
                name,
                width,
            } => self.state.declare_classical_register(name, *width),
            StatementKind::Gate(gate) => {
                debug!("gate {} defined", gate.name);
                self.gates
                    .insert(gate.name.clone(), GateDefinition::Defined(gate.clone()));
                Ok(())
            }
            StatementKind::Opaque(opaque) => {
                debug!("opaque gate {} declared", opaque.name);
                self.gates.insert(opaque.name.clone(), GateDefinition::Opaque);
                Ok(())
            }
            StatementKind::Unitary(op) => self.apply(op),
            StatementKind::Measure { source, target } => self.measure(source, target),
            StatementKind::Reset { target } => self.reset(target),
            StatementKind::Barrier { variables } => {
                // nothing to simulate, but the operands must exist
                for v in variables {
                    self.state.quantum_register(&v.name)?;
                }
                Ok(())
            }
            StatementKind::If {
                variable,
                value,
                operation,
            } => {
                let register = self.state.classical_register(&variable.name)?;
                let expected = evaluate(value, &Bindings::new())?.round();
                let taken = match variable.index {
                    Some(i) => {
                        let bit = register.bits.get(i).ok_or_else(|| {
                            RuntimeError::IndexOutOfRange {
                                name: variable.name.clone(),
                                index: i,
                                width: register.bits.len(),
                            }
                        })?;
                        expected == f64::from(*bit)
                    }
                    None => register.holds(expected),
                };
                debug!("if ({} == {}): {}", variable, expected, taken);
                if taken {
                    self.execute_kind(&operation.kind)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn measure(&mut self, source: &Variable, target: &Variable) -> RuntimeResult<()> {
        match (source.index, target.index) {
            (None, None) => self.state.measure(&source.name, &target.name),
            (Some(q), Some(c)) => self.state.measure_bit(&source.name, q, &target.name, c),
            _ => Err(RuntimeError::SizeMismatch(format!(
                "measure {} -> {} mixes a whole register with a single bit",
                source, target
            ))),
        }
    }

    fn reset(&mut self, target: &Variable) -> RuntimeResult<()> {
        let quantum = self.state.is_quantum(&target.name);
        match (quantum, target.index) {
            (true, None) => self.state.reset_register(&target.name),
            (true, Some(i)) => self.state.reset_register_bit(&target.name, i),
            (false, None) => self.state.reset_classical(&target.name),
            (false, Some(i)) => self.state.reset_classical_bit(&target.name, i),
        }
    }

    // absolute bits named by each argument: one for `q[i]`, all of them for `q`
    fn argument_bits(&self, arguments: &[Variable]) -> RuntimeResult<Vec<Vec<usize>>> {
        arguments
            .iter()
            .map(|arg| match arg.index {
                Some(i) => Ok(vec![self.state.qubit(&arg.name, i)?]),
                None => {
                    let reg = self.state.quantum_register(&arg.name)?;
                    Ok((reg.offset..reg.offset + reg.width).collect())
                }
            })
            .collect()
    }

    fn apply(&mut self, op: &UnitaryOperation) -> RuntimeResult<()> {
        let parameters = op
            .parameters
            .iter()
            .flatten()
            .map(|p| evaluate(p, &Bindings::new()))
            .collect::<RuntimeResult<Vec<f64>>>()?;

        let bits = self.argument_bits(&op.arguments)?;
        let mut repeat = None;
        for (arg, b) in op.arguments.iter().zip(&bits) {
            if arg.is_indexed() {
                continue;
            }
            match repeat {
                None => repeat = Some(b.len()),
                Some(n) if n != b.len() => {
                    return Err(RuntimeError::SizeMismatch(format!(
                        "registers passed to {} have different sizes",
                        op.operator.name()
                    )))
                }
                Some(_) => {}
            }
        }

        for k in 0..repeat.unwrap_or(1) {
            let targets: Vec<usize> = bits
                .iter()
                .map(|b| if b.len() == 1 { b[0] } else { b[k] })
                .collect();
            let gate = self.instantiate(&op.operator, &parameters, &mut Vec::new())?;
            trace!("{} on bits {:?}", op.operator.name(), targets);
            self.state.apply(gate, &targets)?;
        }
        Ok(())
    }

    /// Builds the gate for `operator` with concrete parameter values.
    ///
    /// `active` holds the names of the gates currently being expanded.
    fn instantiate(
        &self,
        operator: &Operator,
        parameters: &[f64],
        active: &mut Vec<String>,
    ) -> RuntimeResult<Gate> {
        let name = match operator {
            Operator::U => {
                return match parameters {
                    [theta, phi, lambda] => Ok(Gate::rotation(*theta, *phi, *lambda)),
                    _ => Err(RuntimeError::SizeMismatch(format!(
                        "U takes 3 parameters, got {}",
                        parameters.len()
                    ))),
                }
            }
            Operator::CX => return Ok(Gate::controlled_not()),
            Operator::Named(name) => name,
        };

        let declaration = match self.gates.get(name) {
            Some(GateDefinition::Defined(declaration)) => declaration,
            Some(GateDefinition::Opaque) => {
                return Err(RuntimeError::OpaqueGate(name.clone()))
            }
            None => return Err(RuntimeError::UndefinedGate(name.clone())),
        };
        if active.contains(name) {
            return Err(RuntimeError::RecursiveGate(name.clone()));
        }

        let names = declaration.parameters.as_deref().unwrap_or_default();
        if names.len() != parameters.len() {
            return Err(RuntimeError::SizeMismatch(format!(
                "{} takes {} parameters, got {}",
                name,
                names.len(),
                parameters.len()
            )));
        }
        let bindings: Bindings = names.iter().cloned().zip(parameters.iter().copied()).collect();

        active.push(name.clone());
        let mut steps = Vec::new();
        for statement in &declaration.body {
            let sub = match &statement.kind {
                StatementKind::Unitary(sub) => sub,
                _ => continue,
            };
            let values = sub
                .parameters
                .iter()
                .flatten()
                .map(|p| evaluate(p, &bindings))
                .collect::<RuntimeResult<Vec<f64>>>()
                .map_err(|e| e.at(&statement.context))?;
            let targets = sub
                .arguments
                .iter()
                .map(|arg| {
                    declaration
                        .arguments
                        .iter()
                        .position(|a| *a == arg.name && arg.index.is_none())
                        .ok_or_else(|| {
                            RuntimeError::UndefinedRegister(arg.to_string()).at(&arg.context)
                        })
                })
                .collect::<RuntimeResult<Vec<usize>>>()?;
            let gate = self
                .instantiate(&sub.operator, &values, active)
                .map_err(|e| e.at(&statement.context))?;
            steps.push(GateApplication::new(gate, targets));
        }
        active.pop();

        Ok(Gate::composite(declaration.arguments.len(), steps))
    }
}
