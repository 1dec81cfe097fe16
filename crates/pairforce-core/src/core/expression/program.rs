use super::parser;
use super::{Expression, ExpressionError, Variables, lookup};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Subtract => '-',
            BinaryOp::Multiply => '*',
            BinaryOp::Divide => '/',
            BinaryOp::Power => '^',
        }
    }

    #[inline]
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Subtract => lhs - rhs,
            BinaryOp::Multiply => lhs * rhs,
            BinaryOp::Divide => lhs / rhs,
            BinaryOp::Power => lhs.powf(rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Abs,
    Step,
    Min,
    Max,
}

impl Function {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sqrt" => Function::Sqrt,
            "exp" => Function::Exp,
            "log" => Function::Log,
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "abs" => Function::Abs,
            "step" => Function::Step,
            "min" => Function::Min,
            "max" => Function::Max,
            _ => return None,
        })
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Function::Sqrt => "sqrt",
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Abs => "abs",
            Function::Step => "step",
            Function::Min => "min",
            Function::Max => "max",
        }
    }

    pub(crate) fn arity(self) -> usize {
        match self {
            Function::Min | Function::Max => 2,
            _ => 1,
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        let x = args[0];
        match self {
            Function::Sqrt => x.sqrt(),
            Function::Exp => x.exp(),
            Function::Log => x.ln(),
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Abs => x.abs(),
            Function::Step => {
                if x >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Function::Min => x.min(args[1]),
            Function::Max => x.max(args[1]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Constant(f64),
    Variable(String),
    Negate(Box<Node>),
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Call {
        function: Function,
        args: Vec<Node>,
    },
}

impl Node {
    fn as_constant(&self) -> Option<f64> {
        match self {
            Node::Constant(c) => Some(*c),
            _ => None,
        }
    }

    fn is_constant(&self, value: f64) -> bool {
        self.as_constant() == Some(value)
    }

    fn evaluate(&self, variables: &Variables) -> Result<f64, ExpressionError> {
        match self {
            Node::Constant(c) => Ok(*c),
            Node::Variable(name) => lookup(variables, name),
            Node::Negate(inner) => Ok(-inner.evaluate(variables)?),
            Node::Binary { op, lhs, rhs } => {
                Ok(op.apply(lhs.evaluate(variables)?, rhs.evaluate(variables)?))
            }
            Node::Call { function, args } => {
                let mut values = [0.0; 2];
                for (slot, arg) in values.iter_mut().zip(args) {
                    *slot = arg.evaluate(variables)?;
                }
                Ok(function.apply(&values[..args.len()]))
            }
        }
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Node::Constant(_) => {}
            Node::Variable(name) => {
                out.insert(name.clone());
            }
            Node::Negate(inner) => inner.collect_variables(out),
            Node::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Node::Call { args, .. } => args.iter().for_each(|a| a.collect_variables(out)),
        }
    }

    fn differentiate(&self, var: &str) -> Node {
        match self {
            Node::Constant(_) => Node::Constant(0.0),
            Node::Variable(name) => Node::Constant(if name == var { 1.0 } else { 0.0 }),
            Node::Negate(inner) => negate(inner.differentiate(var)),
            Node::Binary { op, lhs, rhs } => {
                let (a, b) = (lhs.as_ref(), rhs.as_ref());
                let (da, db) = (a.differentiate(var), b.differentiate(var));
                match op {
                    BinaryOp::Add => add(da, db),
                    BinaryOp::Subtract => subtract(da, db),
                    BinaryOp::Multiply => add(multiply(da, b.clone()), multiply(a.clone(), db)),
                    BinaryOp::Divide => divide(
                        subtract(multiply(da, b.clone()), multiply(a.clone(), db)),
                        multiply(b.clone(), b.clone()),
                    ),
                    BinaryOp::Power => match b.as_constant() {
                        Some(c) => multiply(
                            multiply(Node::Constant(c), power(a.clone(), Node::Constant(c - 1.0))),
                            da,
                        ),
                        None => multiply(
                            power(a.clone(), b.clone()),
                            add(
                                multiply(db, call(Function::Log, vec![a.clone()])),
                                divide(multiply(b.clone(), da), a.clone()),
                            ),
                        ),
                    },
                }
            }
            Node::Call { function, args } => {
                let a = &args[0];
                let da = a.differentiate(var);
                match function {
                    Function::Sqrt => divide(
                        da,
                        multiply(Node::Constant(2.0), call(Function::Sqrt, vec![a.clone()])),
                    ),
                    Function::Exp => multiply(call(Function::Exp, vec![a.clone()]), da),
                    Function::Log => divide(da, a.clone()),
                    Function::Sin => multiply(call(Function::Cos, vec![a.clone()]), da),
                    Function::Cos => negate(multiply(call(Function::Sin, vec![a.clone()]), da)),
                    Function::Tan => divide(
                        da,
                        power(call(Function::Cos, vec![a.clone()]), Node::Constant(2.0)),
                    ),
                    Function::Abs => multiply(
                        subtract(
                            multiply(Node::Constant(2.0), call(Function::Step, vec![a.clone()])),
                            Node::Constant(1.0),
                        ),
                        da,
                    ),
                    Function::Step => Node::Constant(0.0),
                    Function::Min | Function::Max => {
                        let b = &args[1];
                        let db = b.differentiate(var);
                        // step(b-a) selects `a` for min, step(a-b) selects `a` for max.
                        let selector = match function {
                            Function::Min => subtract(b.clone(), a.clone()),
                            _ => subtract(a.clone(), b.clone()),
                        };
                        let pick_a = call(Function::Step, vec![selector]);
                        add(
                            multiply(pick_a.clone(), da),
                            multiply(subtract(Node::Constant(1.0), pick_a), db),
                        )
                    }
                }
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
    if let (Some(a), Some(b)) = (lhs.as_constant(), rhs.as_constant()) {
        return Node::Constant(op.apply(a, b));
    }
    Node::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

pub(crate) fn negate(node: Node) -> Node {
    match node {
        Node::Constant(c) => Node::Constant(-c),
        Node::Negate(inner) => *inner,
        other => Node::Negate(Box::new(other)),
    }
}

pub(crate) fn add(lhs: Node, rhs: Node) -> Node {
    if lhs.is_constant(0.0) {
        rhs
    } else if rhs.is_constant(0.0) {
        lhs
    } else {
        binary(BinaryOp::Add, lhs, rhs)
    }
}

pub(crate) fn subtract(lhs: Node, rhs: Node) -> Node {
    if rhs.is_constant(0.0) {
        lhs
    } else if lhs.is_constant(0.0) {
        negate(rhs)
    } else {
        binary(BinaryOp::Subtract, lhs, rhs)
    }
}

pub(crate) fn multiply(lhs: Node, rhs: Node) -> Node {
    if lhs.is_constant(0.0) || rhs.is_constant(0.0) {
        Node::Constant(0.0)
    } else if lhs.is_constant(1.0) {
        rhs
    } else if rhs.is_constant(1.0) {
        lhs
    } else {
        binary(BinaryOp::Multiply, lhs, rhs)
    }
}

pub(crate) fn divide(lhs: Node, rhs: Node) -> Node {
    if lhs.is_constant(0.0) {
        Node::Constant(0.0)
    } else if rhs.is_constant(1.0) {
        lhs
    } else {
        binary(BinaryOp::Divide, lhs, rhs)
    }
}

pub(crate) fn power(base: Node, exponent: Node) -> Node {
    if exponent.is_constant(1.0) {
        base
    } else if exponent.is_constant(0.0) {
        Node::Constant(1.0)
    } else {
        binary(BinaryOp::Power, base, exponent)
    }
}

pub(crate) fn call(function: Function, args: Vec<Node>) -> Node {
    if args.iter().all(|a| a.as_constant().is_some()) {
        let values: Vec<f64> = args.iter().filter_map(Node::as_constant).collect();
        return Node::Constant(function.apply(&values));
    }
    Node::Call { function, args }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Constant(c) => write!(f, "{c}"),
            Node::Variable(name) => write!(f, "{name}"),
            Node::Negate(inner) => write!(f, "-({inner})"),
            Node::Binary { op, lhs, rhs } => write!(f, "({lhs}{}{rhs})", op.symbol()),
            Node::Call { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A parsed, simplified expression tree ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionProgram {
    root: Node,
}

impl ExpressionProgram {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        Ok(Self {
            root: parser::parse_with_definitions(source)?,
        })
    }

    pub fn differentiate(&self, var: &str) -> Self {
        Self {
            root: self.root.differentiate(var),
        }
    }

    pub fn referenced_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.root.collect_variables(&mut out);
        out
    }

    /// Returns the value if the program does not depend on any variable.
    pub fn as_constant(&self) -> Option<f64> {
        self.root.as_constant()
    }
}

impl Expression for ExpressionProgram {
    #[inline]
    fn evaluate(&self, variables: &Variables) -> Result<f64, ExpressionError> {
        self.root.evaluate(variables)
    }
}

impl fmt::Display for ExpressionProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}
