//! Rendering of `eval` arithmetic expressions.
//!
//! The painless side reads operands through `doc[..].value` accessors and
//! wraps the whole thing in the matching `Math` call; the SPL side writes
//! the expression back in source form. A `Seq` nested below the top level
//! is a parenthesized sub-expression in both renderings.

use splq_core::ast::{EvalExpr, Evaluation};

use super::formatters::{docs, escape};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Dsl,
    Spl,
}

/// Painless script source for an evaluation: `Math.fn(arg[, arg])`.
pub fn script_source(eval: &Evaluation) -> String {
    let n1 = render(&eval.n1, 1, Target::Dsl);
    match &eval.n2 {
        Some(n2) => format!(
            "Math.{}({}, {})",
            eval.func.as_str(),
            n1,
            render(n2, 1, Target::Dsl)
        ),
        None => format!("Math.{}({})", eval.func.as_str(), n1),
    }
}

/// Canonical SPL text for an evaluation: `fn(arg[,arg])`.
pub fn spl_source(eval: &Evaluation) -> String {
    let n1 = render(&eval.n1, 1, Target::Spl);
    match &eval.n2 {
        Some(n2) => format!(
            "{}({},{})",
            eval.func.as_str(),
            n1,
            render(n2, 1, Target::Spl)
        ),
        None => format!("{}({})", eval.func.as_str(), n1),
    }
}

fn render(expr: &EvalExpr, level: usize, target: Target) -> String {
    match expr {
        EvalExpr::Field(field) => match target {
            Target::Dsl => docs(field),
            Target::Spl => escape(&field.field_name),
        },
        EvalExpr::Number(text) => text.clone(),
        EvalExpr::Operator(op) => op.to_string(),
        EvalExpr::Seq(items) => {
            let body: String = items
                .iter()
                .map(|item| render(item, level + 1, target))
                .collect();
            if level > 1 {
                format!("({body})")
            } else {
                body
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splq_core::ast::{EvalFunc, Field, FieldValueType};

    fn field(name: &str) -> EvalExpr {
        EvalExpr::Field(Field::new(name, FieldValueType::Number, None))
    }

    fn num(text: &str) -> EvalExpr {
        EvalExpr::Number(text.to_string())
    }

    #[test]
    fn unary_with_nested_sequence() {
        let eval = Evaluation {
            new_field_name: "v".to_string(),
            func: EvalFunc::Ceil,
            n1: EvalExpr::Seq(vec![
                field("fieldName"),
                EvalExpr::Operator('*'),
                EvalExpr::Seq(vec![num("3"), EvalExpr::Operator('+'), num("4")]),
            ]),
            n2: None,
        };
        assert_eq!(
            script_source(&eval),
            "Math.ceil(doc['fieldName_number'].value*(3+4))"
        );
        assert_eq!(spl_source(&eval), "ceil(fieldName*(3+4))");
    }

    #[test]
    fn top_level_sequence_is_not_parenthesized() {
        let eval = Evaluation {
            new_field_name: "v".to_string(),
            func: EvalFunc::Floor,
            n1: EvalExpr::Seq(vec![field("a"), EvalExpr::Operator('+'), num("1")]),
            n2: None,
        };
        assert_eq!(script_source(&eval), "Math.floor(doc['a_number'].value+1)");
        assert_eq!(spl_source(&eval), "floor(a+1)");
    }

    #[test]
    fn binary_argument_separators() {
        let eval = Evaluation {
            new_field_name: "m".to_string(),
            func: EvalFunc::Max,
            n1: field("a"),
            n2: Some(num("3")),
        };
        assert_eq!(script_source(&eval), "Math.max(doc['a_number'].value, 3)");
        assert_eq!(spl_source(&eval), "max(a,3)");
    }
}
