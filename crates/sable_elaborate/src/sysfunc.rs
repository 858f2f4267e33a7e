//! System subroutine binding, evaluation, and format-string checking.

use crate::compilation::{BindContext, Compilation};
use crate::expr::{ExprId, ExprKind, Expression};
use crate::types::{FloatKind, IntegerKind, Type};
use crate::value::{ConstantValue, SvInt};
use sable_common::Ident;
use sable_diagnostics::DiagCode;
use sable_source::Span;
use sable_syntax::ast::Expr;

impl<'a> Compilation<'a> {
    /// Binds a call of a `$`-prefixed system subroutine.
    pub(crate) fn bind_system_call(
        &mut self,
        name: Ident,
        args: &'a [Expr],
        span: Span,
        ctx: BindContext,
    ) -> ExprId {
        let mut bound = Vec::with_capacity(args.len());
        for arg in args {
            bound.push(self.bind_expr(arg, ctx));
        }
        if bound.iter().any(|&arg| self.exprs[arg].bad()) {
            return self.bad_expr(span);
        }

        let name_str = self.interner.resolve(name).to_string();
        let ty = match name_str.as_str() {
            "clog2" | "bits" => {
                if !self.check_arg_count(&bound, 1, 1, span) {
                    return self.bad_expr(span);
                }
                if name_str == "clog2" && !self.types.is_integral(self.exprs[bound[0]].ty) {
                    let desc = self.types.describe(self.exprs[bound[0]].ty);
                    self.diag(
                        DiagCode::BadSystemSubroutineArg,
                        format!("$clog2 requires an integral argument, not `{desc}`"),
                        self.exprs[bound[0]].span,
                    );
                    return self.bad_expr(span);
                }
                self.types.int()
            }
            "signed" | "unsigned" => {
                if !self.check_arg_count(&bound, 1, 1, span) {
                    return self.bad_expr(span);
                }
                let arg_ty = self.exprs[bound[0]].ty;
                let Some(width) = self.types.bit_width(arg_ty) else {
                    let desc = self.types.describe(arg_ty);
                    self.diag(
                        DiagCode::BadSystemSubroutineArg,
                        format!("${name_str} requires an integral argument, not `{desc}`"),
                        self.exprs[bound[0]].span,
                    );
                    return self.bad_expr(span);
                };
                let four_state = self.types.is_four_state(arg_ty);
                self.make_vector_type(width, name_str == "signed", four_state)
            }
            "display" | "displayb" | "displayo" | "displayh" | "write" | "writeb" | "writeo"
            | "writeh" | "strobe" | "monitor" | "error" | "warning" | "info" => {
                self.check_format_args(&bound, false);
                self.types.intern(Type::Void)
            }
            "fatal" => {
                // The first argument is the optional finish number.
                self.check_format_args(&bound, false);
                self.types.intern(Type::Void)
            }
            "sformatf" => {
                if !self.check_arg_count(&bound, 1, usize::MAX, span) {
                    return self.bad_expr(span);
                }
                self.check_format_args(&bound, true);
                self.types.intern(Type::Str)
            }
            "finish" | "stop" => {
                if !self.check_arg_count(&bound, 0, 1, span) {
                    return self.bad_expr(span);
                }
                self.types.intern(Type::Void)
            }
            "time" | "stime" => self.types.intern(Type::Predefined {
                kind: IntegerKind::Time,
                signed: false,
            }),
            "realtime" => self.types.intern(Type::Floating(FloatKind::RealTime)),
            _ => {
                self.diag(
                    DiagCode::UnknownSystemName,
                    format!("unknown system function `${name_str}`"),
                    span,
                );
                return self.bad_expr(span);
            }
        };

        // `$bits` is constant from the argument's type alone.
        let constant = if name_str == "bits" {
            self.types
                .bit_width(self.exprs[bound[0]].ty)
                .map(|w| ConstantValue::Vector(SvInt::from_i32(w as i32)))
        } else {
            None
        };

        self.alloc_expr(Expression {
            kind: ExprKind::SystemCall { name, args: bound },
            ty,
            constant,
            span,
        })
    }

    /// Checks a call's argument count against inclusive bounds.
    fn check_arg_count(&self, args: &[ExprId], min: usize, max: usize, span: Span) -> bool {
        if args.len() < min {
            self.diag(
                DiagCode::TooFewArguments,
                format!("expected at least {min} arguments, got {}", args.len()),
                span,
            );
            return false;
        }
        if args.len() > max {
            self.diag(
                DiagCode::TooManyArguments,
                format!("expected at most {max} arguments, got {}", args.len()),
                span,
            );
            return false;
        }
        true
    }

    /// Checks the arguments of a display-family call against the format
    /// specifiers of any string-literal format arguments.
    ///
    /// When `strict` (for `$sformatf`), every argument after the first must
    /// correspond to a specifier and leftovers are diagnosed.
    pub(crate) fn check_format_args(&mut self, args: &[ExprId], strict: bool) {
        let mut specs: Vec<(char, Span)> = Vec::new();
        let mut spec_index = 0usize;

        for (i, &arg) in args.iter().enumerate() {
            let literal = match (&self.exprs[arg].kind, &self.exprs[arg].constant) {
                (ExprKind::Literal, Some(ConstantValue::Str(s))) => Some(s.clone()),
                _ => None,
            };

            if spec_index >= specs.len() {
                // Not consuming specifiers: a string starts a new format run.
                if let Some(format) = literal {
                    specs = parse_format_specs(&format, self.exprs[arg].span);
                    spec_index = 0;
                    continue;
                }
                if strict && i > 0 {
                    self.diag(
                        DiagCode::FormatTooManyArgs,
                        "argument has no corresponding format specifier",
                        self.exprs[arg].span,
                    );
                }
                continue;
            }

            let (spec, _) = specs[spec_index];
            spec_index += 1;
            let arg_ty = self.exprs[arg].ty;
            let ok = match spec {
                'd' | 'x' | 'h' | 'o' | 'b' | 'c' => self.types.is_integral(arg_ty),
                's' => {
                    matches!(self.types.get(self.types.canonical(arg_ty)), Type::Str)
                        || self.types.is_integral(arg_ty)
                }
                'e' | 'f' | 'g' | 't' => {
                    self.types.is_floating(arg_ty) || self.types.is_integral(arg_ty)
                }
                _ => true,
            };
            if !ok && !self.types.is_error(arg_ty) {
                let desc = self.types.describe(arg_ty);
                self.diag(
                    DiagCode::FormatMismatchedType,
                    format!("`{desc}` does not match format specifier `%{spec}`"),
                    self.exprs[arg].span,
                );
            }
        }

        // Specifiers with no argument left to consume.
        for &(spec, span) in &specs[spec_index..] {
            self.diag(
                DiagCode::FormatNoArgument,
                format!("format specifier `%{spec}` has no corresponding argument"),
                span,
            );
        }
    }

    /// Evaluates the constant-capable system calls.
    pub(crate) fn eval_system_call(
        &mut self,
        name: Ident,
        args: &[ExprId],
        span: Span,
    ) -> Option<ConstantValue> {
        let name_str = self.interner.resolve(name).to_string();
        match name_str.as_str() {
            "clog2" => {
                let value = self.eval_expr(*args.first()?)?.to_i64()?;
                Some(ConstantValue::Vector(SvInt::from_i32(clog2(value) as i32)))
            }
            "bits" => {
                let arg_ty = self.exprs[*args.first()?].ty;
                let width = self.types.bit_width(arg_ty)?;
                Some(ConstantValue::Vector(SvInt::from_i32(width as i32)))
            }
            "signed" | "unsigned" => {
                let value = self.eval_expr(*args.first()?)?;
                match value {
                    ConstantValue::Vector(v) => Some(ConstantValue::Vector(SvInt {
                        value: v.value,
                        signed: name_str == "signed",
                    })),
                    other => Some(other),
                }
            }
            _ => {
                self.diag(
                    DiagCode::NotConstant,
                    format!("`${name_str}` is not allowed in constant expressions"),
                    span,
                );
                None
            }
        }
    }
}

/// Computes ceiling log2 per the `$clog2` definition: `clog2(0) == 0`,
/// `clog2(1) == 0`, `clog2(2) == 1`, `clog2(3) == 2`.
fn clog2(value: i64) -> u32 {
    if value <= 1 {
        return 0;
    }
    64 - ((value - 1) as u64).leading_zeros()
}

/// Extracts the argument-consuming conversion characters of a format
/// string. `%%` and `%m` consume nothing.
fn parse_format_specs(format: &str, span: Span) -> Vec<(char, Span)> {
    let mut specs = Vec::new();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        // Skip flags, width, and precision.
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit() || matches!(c, '-' | '.' | '0')) {
            chars.next();
        }
        let Some(spec) = chars.next() else { break };
        match spec.to_ascii_lowercase() {
            '%' | 'm' => {}
            spec => specs.push((spec, span)),
        }
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_source::FileId;

    fn dummy() -> Span {
        Span::new(FileId::from_raw(0), 0, 0)
    }

    #[test]
    fn clog2_follows_lrm() {
        assert_eq!(clog2(0), 0);
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(3), 2);
        assert_eq!(clog2(4), 2);
        assert_eq!(clog2(5), 3);
        assert_eq!(clog2(1024), 10);
        assert_eq!(clog2(1025), 11);
    }

    #[test]
    fn format_specs_extracted() {
        let specs = parse_format_specs("value=%d hex=%08h name=%s", dummy());
        let chars: Vec<char> = specs.iter().map(|(c, _)| *c).collect();
        assert_eq!(chars, vec!['d', 'h', 's']);
    }

    #[test]
    fn percent_escapes_consume_nothing() {
        let specs = parse_format_specs("100%% done in %m at %t", dummy());
        let chars: Vec<char> = specs.iter().map(|(c, _)| *c).collect();
        assert_eq!(chars, vec!['t']);
    }
}
