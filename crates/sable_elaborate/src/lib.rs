//! Symbol graph, type system, expression binding, and elaboration.
//!
//! This crate turns parsed syntax trees into an elaborated semantic model:
//! a [`Compilation`] owning symbols, scopes, interned types, bound
//! expressions, and constant values. Everything is built lazily — scope
//! members realize on first lookup, declared types and parameter values
//! resolve on demand with cycle detection — and every failure degrades to
//! an error sentinel rather than stopping the build, so broken input still
//! produces a usable partial model.
//!
//! # Architecture
//!
//! - **Symbols/scopes** ([`symbol`]): tagged symbol variants in an
//!   append-only arena; ID identity is symbol identity.
//! - **Types** ([`types`]): interned structural types with canonical forms.
//! - **Binding** ([`expr`]): syntax to typed expressions under the LRM's
//!   context-determined rules.
//! - **Constant evaluation** ([`const_eval`]): 4-state folding.
//! - **Instances** ([`instance`]): parameter override matching, instance
//!   arrays, depth limiting, implicit nets.

#![warn(missing_docs)]

pub mod arena;
pub mod compilation;
pub mod const_eval;
pub mod expr;
pub mod instance;
pub mod symbol;
pub mod sysfunc;
pub mod types;
pub mod value;

pub use compilation::{BindContext, BindFlags, Compilation, CompilationOptions};
pub use expr::{ExprId, ExprKind, Expression};
pub use symbol::{LookupLocation, ScopeId, Symbol, SymbolId, SymbolKind};
pub use types::{Type, TypeDb, TypeId};
pub use value::{ConstantRange, ConstantValue, SvInt};

#[cfg(test)]
mod tests {
    use super::*;
    use sable_common::Interner;
    use sable_diagnostics::{DiagCode, Diagnostic, DiagnosticSink};
    use sable_source::SourceDb;
    use sable_syntax::{PreprocessorOptions, SyntaxTree};

    /// Builds a compilation over one source file, runs `f` against it, and
    /// returns the accumulated diagnostics.
    fn check(
        source: &str,
        options: CompilationOptions,
        f: impl FnOnce(&mut Compilation<'_>, &Interner),
    ) -> Vec<Diagnostic> {
        let mut db = SourceDb::new();
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let tree = SyntaxTree::from_source(
            "test.sv",
            source,
            &mut db,
            &interner,
            &sink,
            PreprocessorOptions::default(),
        );
        assert!(
            !sink.has_errors(),
            "parse errors: {:?}",
            sink.diagnostics()
                .iter()
                .map(|d| (d.code, d.message.clone()))
                .collect::<Vec<_>>()
        );
        let mut compilation = Compilation::new(&interner, &db, &sink, options);
        compilation.add_tree(&tree);
        f(&mut compilation, &interner);
        sink.take_all()
    }

    fn codes(diags: &[Diagnostic]) -> Vec<DiagCode> {
        diags.iter().map(|d| d.code).collect()
    }

    fn count_module_instances(compilation: &Compilation<'_>) -> usize {
        let mut count = 0;
        compilation.visit_symbols(|_, symbol| {
            if matches!(symbol.kind, SymbolKind::ModuleInstance(_)) {
                count += 1;
            }
        });
        count
    }

    #[test]
    fn empty_compilation_has_no_roots() {
        let diags = check("", CompilationOptions::default(), |compilation, _| {
            assert!(compilation.root_instances().is_empty());
        });
        assert!(diags.is_empty());
    }

    #[test]
    fn simple_module_elaborates() {
        let diags = check(
            "module top(input logic clk, output logic [7:0] data);
                logic [7:0] internal;
                assign data = internal;
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                let roots = compilation.root_instances();
                assert_eq!(roots.len(), 1);
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn self_instantiation_stops_at_depth_limit() {
        // Five nested instances are created (depths 0 through 4), then the
        // sixth is refused with a diagnostic; compilation completes.
        let diags = check(
            "module m; m x(); endmodule",
            CompilationOptions {
                max_instance_depth: 4,
            },
            |compilation, _| {
                let roots = compilation.root_instances();
                assert_eq!(roots.len(), 1);
                assert_eq!(count_module_instances(compilation), 5);
            },
        );
        let depth_errors: Vec<_> = diags
            .iter()
            .filter(|d| d.code == DiagCode::MaxInstanceDepthExceeded)
            .collect();
        assert_eq!(depth_errors.len(), 1);
    }

    #[test]
    fn unknown_parameter_keeps_default() {
        let diags = check(
            "module m #(parameter int P = 1)(); endmodule
             module t; m #(.Q(2)) u(); endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let path: Vec<_> = ["t", "u", "P"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let p = compilation
                    .lookup_hierarchical(&path)
                    .expect("parameter P exists on the instance");
                let value = match &compilation.symbol(p).kind {
                    SymbolKind::Parameter(data) => data.value.clone(),
                    other => panic!("expected parameter, got {other:?}"),
                };
                assert_eq!(value.and_then(|v| v.to_i64()), Some(1));
            },
        );
        assert_eq!(
            codes(&diags)
                .iter()
                .filter(|&&c| c == DiagCode::ParameterDoesNotExist)
                .count(),
            1
        );
    }

    #[test]
    fn overridden_parameter_value() {
        let diags = check(
            "module m #(parameter int WIDTH = 8)(); endmodule
             module t; m #(.WIDTH(16)) u(); endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let path: Vec<_> = ["t", "u", "WIDTH"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let p = compilation.lookup_hierarchical(&path).unwrap();
                let value = match &compilation.symbol(p).kind {
                    SymbolKind::Parameter(data) => data.value.clone(),
                    _ => None,
                };
                assert_eq!(value.and_then(|v| v.to_i64()), Some(16));
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn ordered_parameters_and_extras() {
        let diags = check(
            "module m #(parameter int A = 1, parameter int B = 2)(); endmodule
             module t; m #(10, 20, 30) u(); endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::TooManyParamAssignments));
    }

    #[test]
    fn mixing_ordered_and_named_is_diagnosed() {
        let diags = check(
            "module m #(parameter int A = 1, parameter int B = 2)(); endmodule
             module t; m #(10, .B(20)) u(); endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::MixingOrderedAndNamedParams));
    }

    #[test]
    fn duplicate_named_parameter_assignment() {
        let diags = check(
            "module m #(parameter int A = 1)(); endmodule
             module t; m #(.A(1), .A(2)) u(); endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::DuplicateParamAssignment));
    }

    #[test]
    fn localparam_cannot_be_overridden() {
        let diags = check(
            "module m #(parameter int A = 1, localparam int L = 2)(); endmodule
             module t; m #(.L(3)) u(); endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::AssignedToLocalPortParam));
    }

    #[test]
    fn parameter_without_value_is_diagnosed() {
        let diags = check(
            "module m #(parameter int P)(); endmodule
             module t; m u(); endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::ParamHasNoValue));
    }

    #[test]
    fn type_parameter_override_and_misuse() {
        let diags = check(
            "module m #(parameter type T = int)(); T x; endmodule
             module t; m #(.T(5)) u(); endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::BadTypeParamExpr));
    }

    #[test]
    fn unknown_module_is_diagnosed() {
        let diags = check(
            "module t; missing u(); endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::UnknownModule));
    }

    #[test]
    fn enum_values_and_duplicates() {
        // Values are 0, 1, then an explicit 1 again, which is diagnosed.
        let diags = check(
            "module t;
                typedef enum { A, B, C = 1 } e_t;
                e_t x;
            endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let mut values = Vec::new();
                compilation.visit_symbols(|_, symbol| {
                    if let SymbolKind::EnumValue { value, .. } = &symbol.kind {
                        values.push((
                            interner.resolve(symbol.name).to_string(),
                            value.clone().and_then(|v| v.to_i64()),
                        ));
                    }
                });
                values.sort();
                assert_eq!(
                    values,
                    vec![
                        ("A".to_string(), Some(0)),
                        ("B".to_string(), Some(1)),
                        ("C".to_string(), Some(1)),
                    ]
                );
            },
        );
        assert_eq!(
            codes(&diags)
                .iter()
                .filter(|&&c| c == DiagCode::DuplicateEnumValue)
                .count(),
            1
        );
    }

    #[test]
    fn parameter_arithmetic_folds() {
        let diags = check(
            "module t #(parameter int W = 8);
                localparam int D = W * 2 + 1;
                logic [D-1:0] bus;
            endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let path: Vec<_> = ["t", "D"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let d = compilation.lookup_hierarchical(&path).unwrap();
                let value = match &compilation.symbol(d).kind {
                    SymbolKind::Parameter(data) => data.value.clone(),
                    _ => None,
                };
                assert_eq!(value.and_then(|v| v.to_i64()), Some(17));

                let path: Vec<_> = ["t", "bus"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let bus = compilation.lookup_hierarchical(&path).unwrap();
                let ty = match &compilation.symbol(bus).kind {
                    SymbolKind::Variable { declared } => declared.resolved.unwrap(),
                    _ => panic!("expected variable"),
                };
                assert_eq!(compilation.types.bit_width(ty), Some(17));
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn clog2_and_concat_fold() {
        let diags = check(
            "module t;
                localparam int L = $clog2(16);
                localparam logic [3:0] C = {2'b10, 2'b01};
            endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let l_path: Vec<_> = ["t", "L"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let l = compilation.lookup_hierarchical(&l_path).unwrap();
                let value = match &compilation.symbol(l).kind {
                    SymbolKind::Parameter(data) => data.value.clone(),
                    _ => None,
                };
                assert_eq!(value.and_then(|v| v.to_i64()), Some(4));

                let c_path: Vec<_> = ["t", "C"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let c = compilation.lookup_hierarchical(&c_path).unwrap();
                let value = match &compilation.symbol(c).kind {
                    SymbolKind::Parameter(data) => data.value.clone(),
                    _ => None,
                };
                assert_eq!(value.and_then(|v| v.to_i64()), Some(0b1001));
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn division_by_zero_in_constant() {
        let diags = check(
            "module t;
                localparam int X = 1 / 0;
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::DivideByZero));
        // The diagnostic is a warning; compilation still succeeds.
        assert!(diags
            .iter()
            .all(|d| d.code != DiagCode::DivideByZero
                || d.severity == sable_diagnostics::Severity::Warning));
    }

    #[test]
    fn recursive_parameter_is_diagnosed() {
        let diags = check(
            "module t;
                localparam int P = P + 1;
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        // Either the positional rule or the cycle detector catches this,
        // without overflowing the stack.
        assert!(
            codes(&diags).contains(&DiagCode::RecursiveResolution)
                || codes(&diags).contains(&DiagCode::UsedBeforeDeclared)
        );
    }

    #[test]
    fn typedef_cycle_is_diagnosed() {
        let diags = check(
            "module t;
                typedef a_t b_t;
                typedef b_t a_t;
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::RecursiveResolution));
    }

    #[test]
    fn typedef_chain_canonicalizes() {
        let diags = check(
            "module t;
                typedef int a_t;
                typedef a_t b_t;
                b_t x;
            endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let path: Vec<_> = ["t", "x"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let x = compilation.lookup_hierarchical(&path).unwrap();
                let ty = match &compilation.symbol(x).kind {
                    SymbolKind::Variable { declared } => declared.resolved.unwrap(),
                    _ => panic!("expected variable"),
                };
                let canonical = compilation.types.canonical(ty);
                // Canonicalization is idempotent and lands on `int`.
                assert_eq!(compilation.types.canonical(canonical), canonical);
                assert!(matches!(
                    compilation.types.get(canonical),
                    Type::Predefined { .. }
                ));
                assert_eq!(compilation.types.bit_width(ty), Some(32));
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn forward_typedef_category_mismatch() {
        let diags = check(
            "module t;
                typedef enum fwd_t;
                typedef struct packed { logic a; } fwd_t;
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::ForwardTypedefDoesNotMatch));
    }

    #[test]
    fn lookup_is_stable() {
        let diags = check(
            "module t;
                logic [7:0] sig;
            endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let path: Vec<_> = ["t", "sig"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let first = compilation.lookup_hierarchical(&path).unwrap();
                let second = compilation.lookup_hierarchical(&path).unwrap();
                // Repeated lookups resolve to the identical symbol.
                assert_eq!(first, second);
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn package_wildcard_import() {
        let diags = check(
            "package pkg;
                parameter int W = 4;
                typedef logic [W-1:0] data_t;
            endpackage
            module t;
                import pkg::*;
                data_t d;
            endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let path: Vec<_> = ["t", "d"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let d = compilation.lookup_hierarchical(&path).unwrap();
                let ty = match &compilation.symbol(d).kind {
                    SymbolKind::Variable { declared } => declared.resolved.unwrap(),
                    _ => panic!("expected variable"),
                };
                assert_eq!(compilation.types.bit_width(ty), Some(4));
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn scoped_package_reference() {
        let diags = check(
            "package pkg;
                parameter int W = 6;
            endpackage
            module t;
                logic [pkg::W-1:0] d;
            endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let path: Vec<_> = ["t", "d"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let d = compilation.lookup_hierarchical(&path).unwrap();
                let ty = match &compilation.symbol(d).kind {
                    SymbolKind::Variable { declared } => declared.resolved.unwrap(),
                    _ => panic!("expected variable"),
                };
                assert_eq!(compilation.types.bit_width(ty), Some(6));
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn implicit_nets_created_for_port_connections() {
        let diags = check(
            "module leaf(input logic a, output logic b); endmodule
             module top;
                leaf u(.a(x), .b(y));
             endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let x_path: Vec<_> = ["top", "x"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let x = compilation.lookup_hierarchical(&x_path).unwrap();
                assert!(matches!(
                    compilation.symbol(x).kind,
                    SymbolKind::Net { .. }
                ));
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn default_nettype_none_suppresses_implicit_nets() {
        let diags = check(
            "`default_nettype none
             module leaf(input logic a); endmodule
             module top;
                leaf u(.a(x));
             endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::UsedBeforeDeclared));
    }

    #[test]
    fn instance_arrays_share_parameters() {
        let diags = check(
            "module cell #(parameter int W = 3)(input logic a); endmodule
             module top;
                logic a;
                cell u[3:0](.a(a));
             endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                // Four concrete instances under one array symbol.
                let mut arrays = 0;
                let mut paths = Vec::new();
                compilation.visit_symbols(|_, symbol| match &symbol.kind {
                    SymbolKind::InstanceArray { elements } => {
                        arrays += 1;
                        assert_eq!(elements.len(), 4);
                    }
                    SymbolKind::ModuleInstance(data)
                        if interner.resolve(symbol.name) == "u" =>
                    {
                        paths.push(data.array_path.clone());
                    }
                    _ => {}
                });
                assert_eq!(arrays, 1);
                paths.sort();
                assert_eq!(paths, vec![vec![0], vec![1], vec![2], vec![3]]);
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn undeclared_identifier_in_body() {
        let diags = check(
            "module t;
                logic a;
                assign a = missing_signal;
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::UndeclaredIdentifier));
    }

    #[test]
    fn format_mismatch_in_display() {
        let diags = check(
            "module t;
                logic [7:0] v;
                initial $display(\"value=%d and name=%s\", v);
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::FormatNoArgument));
    }

    #[test]
    fn string_to_int_format_mismatch() {
        let diags = check(
            "module t;
                real r;
                initial $display(\"%c\", r);
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::FormatMismatchedType));
    }

    #[test]
    fn unknown_system_function() {
        let diags = check(
            "module t;
                initial $nonsense(1);
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::UnknownSystemName));
    }

    #[test]
    fn out_of_range_select_warns() {
        let diags = check(
            "module t;
                logic [7:0] v;
                localparam int I = 9;
                logic b;
                assign b = v[I];
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::IndexOutOfRange));
    }

    #[test]
    fn struct_member_access_types() {
        let diags = check(
            "module t;
                typedef struct packed {
                    logic [7:0] data;
                    logic valid;
                } packet_t;
                packet_t p;
                logic [7:0] d;
                assign d = p.data;
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn bad_assignment_of_string_to_vector() {
        let diags = check(
            "module t;
                logic [7:0] v;
                string s;
                assign v = s;
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::BadAssignment));
    }

    #[test]
    fn hierarchical_reference_in_constant_rejected() {
        let diags = check(
            "module leaf; localparam int X = 1; endmodule
             module top;
                leaf u();
                localparam int Y = u.X;
             endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::HierarchicalReferenceInConstant));
    }

    #[test]
    fn duplicate_member_diagnosed() {
        let diags = check(
            "module t;
                logic a;
                logic a;
            endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::DuplicateDefinition));
    }

    #[test]
    fn no_top_modules_warns() {
        // Both modules instantiate each other, so no root remains.
        let diags = check(
            "module a; b u(); endmodule
             module b; a u(); endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                assert!(compilation.root_instances().is_empty());
            },
        );
        assert!(codes(&diags).contains(&DiagCode::NoTopModules));
    }

    #[test]
    fn modport_selectors_are_checked() {
        let diags = check(
            "interface bus_if;
                logic valid;
                modport master(output valid);
             endinterface
             module good(bus_if.master p); endmodule
             module bad_member(bus_if.valid p); endmodule
             module bad_missing(bus_if.nothing p); endmodule
             module top;
                bus_if the_bus();
                good u1(the_bus);
                bad_member u2(the_bus);
                bad_missing u3(the_bus);
             endmodule",
            CompilationOptions::default(),
            |compilation, _| {
                compilation.root_instances();
            },
        );
        assert!(codes(&diags).contains(&DiagCode::NotAModport));
        assert!(codes(&diags).contains(&DiagCode::UnknownMember));
    }

    #[test]
    fn signedness_propagation_in_comparison() {
        // An unsigned operand makes the comparison unsigned: 8'hF0 > 8'sd1.
        let diags = check(
            "module t;
                localparam logic [7:0] U = 8'hF0;
                localparam bit S = U > 8'sd1;
            endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let path: Vec<_> = ["t", "S"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let s = compilation.lookup_hierarchical(&path).unwrap();
                let value = match &compilation.symbol(s).kind {
                    SymbolKind::Parameter(data) => data.value.clone(),
                    _ => None,
                };
                assert_eq!(value.and_then(|v| v.to_i64()), Some(1));
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn x_propagates_through_arithmetic() {
        let diags = check(
            "module t;
                localparam logic [3:0] X = 4'b10x0 + 4'b0001;
            endmodule",
            CompilationOptions::default(),
            |compilation, interner| {
                compilation.root_instances();
                let path: Vec<_> = ["t", "X"]
                    .iter()
                    .map(|s| interner.get_or_intern(s))
                    .collect();
                let x = compilation.lookup_hierarchical(&path).unwrap();
                let value = match &compilation.symbol(x).kind {
                    SymbolKind::Parameter(data) => data.value.clone(),
                    _ => None,
                };
                match value {
                    Some(ConstantValue::Vector(v)) => {
                        assert!(v.has_unknown());
                        assert_eq!(v.width(), 4);
                    }
                    other => panic!("expected a vector, got {other:?}"),
                }
            },
        );
        assert!(diags.is_empty(), "{diags:?}");
    }
}
