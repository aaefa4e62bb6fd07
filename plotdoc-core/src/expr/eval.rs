use super::parser::{Expr, Op};
use super::{Env, ExprError, ExprValue, MAX_DEPTH};

pub(super) fn eval(expr: &Expr, env: &Env) -> Result<ExprValue, ExprError> {
    match expr {
        Expr::Number(n) => Ok(ExprValue::Scalar(*n)),
        Expr::Name(name) => env.lookup(name),
        Expr::Neg(inner) => Ok(eval(inner, env)?.map(|v| -v)),
        Expr::Binary { op, left, right } => {
            let left = eval(left, env)?;
            let right = eval(right, env)?;
            match op {
                Op::Add => left.zip_with(&right, |a, b| a + b),
                Op::Sub => left.zip_with(&right, |a, b| a - b),
                Op::Mul => left.zip_with(&right, |a, b| a * b),
                Op::Div => left.zip_with(&right, |a, b| a / b),
                Op::Pow => left.zip_with(&right, f64::powf),
            }
        }
        Expr::Call { name, args } => {
            let args = args
                .iter()
                .map(|arg| eval(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, args, env)
        }
    }
}

fn arity(name: &str, args: &[ExprValue], expected: usize) -> Result<(), ExprError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExprError::Arity {
            name: name.to_owned(),
            expected,
            found: args.len(),
        })
    }
}

fn call(name: &str, args: Vec<ExprValue>, env: &Env) -> Result<ExprValue, ExprError> {
    // Customs shadow builtins.
    if let Some(function) = env.context.function(name) {
        arity(name, &args, function.params.len())?;
        if env.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep(name.to_owned()));
        }
        let mut inner = super::Env {
            context: env.context,
            data: env.data,
            variables: Vec::with_capacity(args.len()),
            hidden: env.hidden,
            depth: env.depth + 1,
        };
        for (param, value) in function.params.iter().zip(args) {
            inner.variables.push((param.as_str(), value));
        }
        return eval(&function.body, &inner);
    }

    let unary: Option<fn(f64) -> f64> = match name {
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        "asin" => Some(f64::asin),
        "acos" => Some(f64::acos),
        "atan" => Some(f64::atan),
        "exp" => Some(f64::exp),
        "log" => Some(f64::ln),
        "log10" => Some(f64::log10),
        "sqrt" => Some(f64::sqrt),
        "abs" => Some(f64::abs),
        "floor" => Some(f64::floor),
        "ceil" => Some(f64::ceil),
        _ => None,
    };
    if let Some(f) = unary {
        arity(name, &args, 1)?;
        return Ok(args[0].map(f));
    }

    let pick: fn(f64, f64) -> f64 = match name {
        "min" => f64::min,
        "max" => f64::max,
        _ => return Err(ExprError::UnknownFunction(name.to_owned())),
    };
    match args.as_slice() {
        // One argument reduces over its elements.
        [single] => Ok(ExprValue::Scalar(match single {
            ExprValue::Scalar(v) => *v,
            ExprValue::Vector(values) => values.iter().copied().fold(f64::NAN, pick),
            ExprValue::Grid(grid) => grid.values().iter().copied().fold(f64::NAN, pick),
        })),
        [a, b] => a.zip_with(b, pick),
        _ => Err(ExprError::Arity {
            name: name.to_owned(),
            expected: 2,
            found: args.len(),
        }),
    }
}
