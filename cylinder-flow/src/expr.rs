//! Symbolic expressions in named variables.
//!
//! An [`Expr`] is an immutable tree. It can be differentiated with respect to
//! any symbol ([`Expr::diff`]), tidied up ([`Expr::simplify`]) and finally
//! compiled against an ordered argument list into a [`Lambda`], the numeric
//! form used for sampling.

use std::collections::BTreeSet;
use std::fmt;

use ndarray::Array2;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    Sym(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Powi(Box<Expr>, i32),
    Sqrt(Box<Expr>),
    Sin(Box<Expr>),
    Cos(Box<Expr>),
    Ln(Box<Expr>),
    /// `atan2(y, x)`, the angle of the point `(x, y)`.
    Atan2(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn sym(name: &str) -> Self {
        Expr::Sym(name.to_string())
    }

    pub fn constant(value: f64) -> Self {
        Expr::Const(value)
    }

    pub fn powi(self, n: i32) -> Self {
        Expr::Powi(Box::new(self), n)
    }

    pub fn sqrt(self) -> Self {
        Expr::Sqrt(Box::new(self))
    }

    pub fn sin(self) -> Self {
        Expr::Sin(Box::new(self))
    }

    pub fn cos(self) -> Self {
        Expr::Cos(Box::new(self))
    }

    pub fn ln(self) -> Self {
        Expr::Ln(Box::new(self))
    }

    pub fn atan2(y: Expr, x: Expr) -> Self {
        Expr::Atan2(Box::new(y), Box::new(x))
    }

    /// Free symbols, sorted by name.
    pub fn symbols(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Const(_) => {}
            Expr::Sym(name) => {
                out.insert(name.as_str());
            }
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Atan2(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Neg(a)
            | Expr::Powi(a, _)
            | Expr::Sqrt(a)
            | Expr::Sin(a)
            | Expr::Cos(a)
            | Expr::Ln(a) => a.collect_symbols(out),
        }
    }

    /// Partial derivative with respect to `var`, simplified.
    ///
    /// Every other symbol is held constant.
    pub fn diff(&self, var: &str) -> Expr {
        self.diff_raw(var).simplify()
    }

    fn diff_raw(&self, var: &str) -> Expr {
        match self {
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Sym(name) => Expr::Const(if name == var { 1.0 } else { 0.0 }),
            Expr::Add(a, b) => a.diff_raw(var) + b.diff_raw(var),
            Expr::Sub(a, b) => a.diff_raw(var) - b.diff_raw(var),
            Expr::Mul(a, b) => a.diff_raw(var) * (**b).clone() + (**a).clone() * b.diff_raw(var),
            Expr::Div(a, b) => {
                (a.diff_raw(var) * (**b).clone() - (**a).clone() * b.diff_raw(var))
                    / (**b).clone().powi(2)
            }
            Expr::Neg(a) => -a.diff_raw(var),
            Expr::Powi(_, 0) => Expr::Const(0.0),
            Expr::Powi(a, n) => {
                Expr::Const(f64::from(*n)) * (**a).clone().powi(n - 1) * a.diff_raw(var)
            }
            Expr::Sqrt(a) => a.diff_raw(var) / (Expr::Const(2.0) * self.clone()),
            Expr::Sin(a) => (**a).clone().cos() * a.diff_raw(var),
            Expr::Cos(a) => -(**a).clone().sin() * a.diff_raw(var),
            Expr::Ln(a) => a.diff_raw(var) / (**a).clone(),
            Expr::Atan2(y, x) => {
                let (xe, ye) = ((**x).clone(), (**y).clone());
                (xe.clone() * y.diff_raw(var) - ye.clone() * x.diff_raw(var))
                    / (xe.powi(2) + ye.powi(2))
            }
        }
    }

    /// Folds constants and drops additive zeros, unit factors and double
    /// negations. The result evaluates to the same value wherever the input
    /// is defined.
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Const(_) | Expr::Sym(_) => self.clone(),
            Expr::Add(a, b) => add(a.simplify(), b.simplify()),
            Expr::Sub(a, b) => sub(a.simplify(), b.simplify()),
            Expr::Mul(a, b) => mul(a.simplify(), b.simplify()),
            Expr::Div(a, b) => div(a.simplify(), b.simplify()),
            Expr::Neg(a) => neg(a.simplify()),
            Expr::Powi(a, n) => powi(a.simplify(), *n),
            Expr::Sqrt(a) => fold_unary(a.simplify(), f64::sqrt, Expr::Sqrt),
            Expr::Sin(a) => fold_unary(a.simplify(), f64::sin, Expr::Sin),
            Expr::Cos(a) => fold_unary(a.simplify(), f64::cos, Expr::Cos),
            Expr::Ln(a) => fold_unary(a.simplify(), f64::ln, Expr::Ln),
            Expr::Atan2(y, x) => match (y.simplify(), x.simplify()) {
                (Expr::Const(y), Expr::Const(x)) => Expr::Const(y.atan2(x)),
                (y, x) => Expr::atan2(y, x),
            },
        }
    }

    /// Compiles the expression into a numeric function of `args`, in order.
    ///
    /// Fails if a symbol is not among `args` or a constant is not finite.
    pub fn compile(&self, args: &[&str]) -> Result<Lambda> {
        let root = Node::build(self, args)?;
        Ok(Lambda {
            args: args.iter().map(|a| a.to_string()).collect(),
            root,
        })
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Const(c) if *c < 0.0 => 3,
            Expr::Powi(..) => 4,
            _ => 5,
        }
    }
}

fn add(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Const(x), Expr::Const(y)) => Expr::Const(x + y),
        (Expr::Const(z), e) if z == 0.0 => e,
        (e, Expr::Const(z)) if z == 0.0 => e,
        (e, Expr::Neg(n)) => sub(e, *n),
        (a, b) => Expr::Add(Box::new(a), Box::new(b)),
    }
}

fn sub(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Const(x), Expr::Const(y)) => Expr::Const(x - y),
        (e, Expr::Const(z)) if z == 0.0 => e,
        (Expr::Const(z), e) if z == 0.0 => neg(e),
        (e, Expr::Neg(n)) => add(e, *n),
        (a, b) => Expr::Sub(Box::new(a), Box::new(b)),
    }
}

fn mul(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Const(x), Expr::Const(y)) => Expr::Const(x * y),
        (Expr::Const(z), _) if z == 0.0 => Expr::Const(0.0),
        (_, Expr::Const(z)) if z == 0.0 => Expr::Const(0.0),
        (Expr::Const(one), e) if one == 1.0 => e,
        (e, Expr::Const(one)) if one == 1.0 => e,
        (Expr::Const(m), e) if m == -1.0 => neg(e),
        (e, Expr::Const(m)) if m == -1.0 => neg(e),
        (Expr::Neg(a), Expr::Neg(b)) => mul(*a, *b),
        (Expr::Neg(a), b) => neg(mul(*a, b)),
        (a, Expr::Neg(b)) => neg(mul(a, *b)),
        // constants go to the left so they can meet and fold
        (e, Expr::Const(c)) => mul(Expr::Const(c), e),
        (Expr::Const(c), Expr::Mul(inner, rest)) => match *inner {
            Expr::Const(d) => mul(Expr::Const(c * d), *rest),
            inner => Expr::Mul(
                Box::new(Expr::Const(c)),
                Box::new(Expr::Mul(Box::new(inner), rest)),
            ),
        },
        (a, b) => Expr::Mul(Box::new(a), Box::new(b)),
    }
}

fn div(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Const(x), Expr::Const(y)) if y != 0.0 => Expr::Const(x / y),
        // keep 0/0 so evaluation reports it
        (Expr::Const(z), d) if z == 0.0 && !matches!(d, Expr::Const(_)) => Expr::Const(0.0),
        (e, Expr::Const(one)) if one == 1.0 => e,
        (Expr::Neg(a), b) => neg(div(*a, b)),
        (a, Expr::Neg(b)) => neg(div(a, *b)),
        (a, b) => Expr::Div(Box::new(a), Box::new(b)),
    }
}

fn neg(a: Expr) -> Expr {
    match a {
        Expr::Const(c) => Expr::Const(-c),
        Expr::Neg(inner) => *inner,
        e => Expr::Neg(Box::new(e)),
    }
}

fn powi(a: Expr, n: i32) -> Expr {
    match (a, n) {
        (_, 0) => Expr::Const(1.0),
        (e, 1) => e,
        (Expr::Const(c), n) if c != 0.0 || n > 0 => Expr::Const(c.powi(n)),
        (Expr::Powi(base, m), n) => powi(*base, m.saturating_mul(n)),
        (e, n) => Expr::Powi(Box::new(e), n),
    }
}

fn fold_unary(a: Expr, f: fn(f64) -> f64, wrap: fn(Box<Expr>) -> Expr) -> Expr {
    match a {
        Expr::Const(c) if f(c).is_finite() => Expr::Const(f(c)),
        e => wrap(Box::new(e)),
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{}", c),
            Expr::Sym(name) => write!(f, "{}", name),
            Expr::Add(a, b) => binary(f, a, " + ", b, 1, 1),
            Expr::Sub(a, b) => binary(f, a, " - ", b, 1, 2),
            Expr::Mul(a, b) => binary(f, a, "*", b, 2, 2),
            Expr::Div(a, b) => binary(f, a, "/", b, 2, 3),
            Expr::Neg(a) => {
                write!(f, "-")?;
                child(f, a, 4)
            }
            Expr::Powi(a, n) => {
                child(f, a, 5)?;
                write!(f, "^{}", n)
            }
            Expr::Sqrt(a) => write!(f, "sqrt({})", a),
            Expr::Sin(a) => write!(f, "sin({})", a),
            Expr::Cos(a) => write!(f, "cos({})", a),
            Expr::Ln(a) => write!(f, "ln({})", a),
            Expr::Atan2(y, x) => write!(f, "atan2({}, {})", y, x),
        }
    }
}

fn child(f: &mut fmt::Formatter<'_>, e: &Expr, min_prec: u8) -> fmt::Result {
    if e.precedence() < min_prec {
        write!(f, "({})", e)
    } else {
        write!(f, "{}", e)
    }
}

fn binary(
    f: &mut fmt::Formatter<'_>,
    a: &Expr,
    op: &str,
    b: &Expr,
    left: u8,
    right: u8,
) -> fmt::Result {
    child(f, a, left)?;
    write!(f, "{}", op)?;
    child(f, b, right)
}

/// Numeric form of an [`Expr`] with symbols resolved to argument slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    args: Vec<String>,
    root: Node,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnaryOp {
    Neg,
    Sqrt,
    Sin,
    Cos,
    Ln,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Atan2,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Const(f64),
    Arg(usize),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Powi(Box<Node>, i32),
}

impl Node {
    fn build(expr: &Expr, args: &[&str]) -> Result<Node> {
        let unary =
            |op, a: &Expr| -> Result<Node> { Ok(Node::Unary(op, Box::new(Node::build(a, args)?))) };
        let binary = |op, a: &Expr, b: &Expr| -> Result<Node> {
            Ok(Node::Binary(
                op,
                Box::new(Node::build(a, args)?),
                Box::new(Node::build(b, args)?),
            ))
        };
        match expr {
            Expr::Const(c) if !c.is_finite() => Err(Error::NonFiniteConstant(*c)),
            Expr::Const(c) => Ok(Node::Const(*c)),
            Expr::Sym(name) => args
                .iter()
                .position(|a| *a == name.as_str())
                .map(Node::Arg)
                .ok_or_else(|| Error::UnboundSymbol(name.clone())),
            Expr::Add(a, b) => binary(BinaryOp::Add, a, b),
            Expr::Sub(a, b) => binary(BinaryOp::Sub, a, b),
            Expr::Mul(a, b) => binary(BinaryOp::Mul, a, b),
            Expr::Div(a, b) => binary(BinaryOp::Div, a, b),
            Expr::Atan2(y, x) => binary(BinaryOp::Atan2, y, x),
            Expr::Neg(a) => unary(UnaryOp::Neg, a),
            Expr::Sqrt(a) => unary(UnaryOp::Sqrt, a),
            Expr::Sin(a) => unary(UnaryOp::Sin, a),
            Expr::Cos(a) => unary(UnaryOp::Cos, a),
            Expr::Ln(a) => unary(UnaryOp::Ln, a),
            Expr::Powi(a, n) => Ok(Node::Powi(Box::new(Node::build(a, args)?), *n)),
        }
    }

    fn eval(&self, args: &[f64]) -> Result<f64> {
        match self {
            Node::Const(c) => Ok(*c),
            Node::Arg(i) => Ok(args[*i]),
            Node::Unary(op, a) => {
                let a = a.eval(args)?;
                match op {
                    UnaryOp::Neg => Ok(-a),
                    UnaryOp::Sqrt if a < 0.0 => Err(Error::Domain { op: "sqrt", arg: a }),
                    UnaryOp::Sqrt => Ok(a.sqrt()),
                    UnaryOp::Sin => Ok(a.sin()),
                    UnaryOp::Cos => Ok(a.cos()),
                    UnaryOp::Ln if a <= 0.0 => Err(Error::Domain { op: "ln", arg: a }),
                    UnaryOp::Ln => Ok(a.ln()),
                }
            }
            Node::Binary(op, a, b) => {
                let a = a.eval(args)?;
                let b = b.eval(args)?;
                match op {
                    BinaryOp::Add => Ok(a + b),
                    BinaryOp::Sub => Ok(a - b),
                    BinaryOp::Mul => Ok(a * b),
                    BinaryOp::Div if b == 0.0 => Err(Error::DivisionByZero),
                    BinaryOp::Div => Ok(a / b),
                    BinaryOp::Atan2 => Ok(a.atan2(b)),
                }
            }
            Node::Powi(a, n) => {
                let a = a.eval(args)?;
                if a == 0.0 && *n < 0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(a.powi(*n))
            }
        }
    }
}

impl Lambda {
    /// Evaluates at one point. `args` must match the compiled argument list.
    pub fn eval(&self, args: &[f64]) -> Result<f64> {
        if args.len() != self.args.len() {
            return Err(Error::ArgumentCount {
                expected: self.args.len(),
                got: args.len(),
            });
        }
        self.root.eval(args)
    }

    /// Evaluates a two-argument function elementwise over two arrays.
    ///
    /// The inputs broadcast against each other: a `(rows, 1)` column with a
    /// `(1, cols)` row gives a `(rows, cols)` result.
    pub fn eval_grid(&self, a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
        if self.args.len() != 2 {
            return Err(Error::ArgumentCount {
                expected: self.args.len(),
                got: 2,
            });
        }
        let shape = broadcast_shape(a.dim(), b.dim())?;
        let mismatch = || Error::ShapeMismatch {
            left: a.dim(),
            right: b.dim(),
        };
        let a = a.broadcast(shape).ok_or_else(mismatch)?;
        let b = b.broadcast(shape).ok_or_else(mismatch)?;

        let mut out = Array2::<f64>::zeros(shape);
        for ((o, &p), &q) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
            *o = self.root.eval(&[p, q])?;
        }
        Ok(out)
    }
}

fn broadcast_shape(a: (usize, usize), b: (usize, usize)) -> Result<(usize, usize)> {
    let axis = |m: usize, n: usize| match (m, n) {
        _ if m == n => Some(m),
        (1, n) => Some(n),
        (m, 1) => Some(m),
        _ => None,
    };
    match (axis(a.0, b.0), axis(a.1, b.1)) {
        (Some(rows), Some(cols)) => Ok((rows, cols)),
        _ => Err(Error::ShapeMismatch { left: a, right: b }),
    }
}
