//! Trivia-preserving lexer, preprocessor, and error-recovering parser for
//! SystemVerilog.
//!
//! The main entry point is [`SyntaxTree::from_file`], which runs a source
//! file through the preprocessor and parser and returns the AST root
//! together with the preprocessed token stream. The token stream preserves
//! every input byte across raw text and trivia, so it reproduces the file
//! exactly — including after parse errors.
//!
//! # Architecture
//!
//! - **Lexer** ([`lexer`]): bytes to tokens with leading trivia; decodes
//!   string and numeric literals; keeps lexing through malformed input.
//! - **Preprocessor** ([`preproc`]): directives, macros, includes, and
//!   conditional compilation; directive text becomes trivia.
//! - **Parser** ([`parser`]): recursive descent with Pratt expression
//!   parsing and panic-mode recovery via poison nodes and skip sets.
//! - **AST** ([`ast`]): all node types with spans and serde support.

#![warn(missing_docs)]

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod preproc;
pub mod token;

mod decl;
mod expr;
mod stmt;

pub use ast::SourceUnit;
pub use preproc::{DefaultNetType, Preprocessor, PreprocessorOptions};
pub use token::{Token, TokenKind, Trivia, TriviaKind};

use sable_common::Interner;
use sable_diagnostics::DiagnosticSink;
use sable_source::{FileId, SourceDb};

/// A parsed source file: the AST root plus the preprocessed token stream.
///
/// The tree owns its tokens; elaboration borrows trees, so trees must
/// outlive the `Compilation` they are added to.
pub struct SyntaxTree {
    /// The parsed AST root.
    pub root: SourceUnit,
    /// The preprocessed token stream the root was parsed from.
    pub tokens: Vec<Token>,
    /// The file this tree was parsed from.
    pub file: FileId,
    /// The default nettype in force at the end of the file.
    pub default_nettype: DefaultNetType,
}

impl SyntaxTree {
    /// Preprocesses and parses a loaded source file.
    pub fn from_file(
        file: FileId,
        source_db: &mut SourceDb,
        interner: &Interner,
        sink: &DiagnosticSink,
        options: PreprocessorOptions,
    ) -> SyntaxTree {
        let preprocessor = Preprocessor::new(source_db, file, sink, options);
        let (tokens, default_nettype) = preprocessor.preprocess();

        let mut parser = parser::Parser::new(tokens, source_db, interner, sink);
        let root = parser.parse_source_unit();
        let tokens = parser.into_tokens();

        SyntaxTree {
            root,
            tokens,
            file,
            default_nettype,
        }
    }

    /// Adds `text` to the source database and parses it.
    pub fn from_source(
        name: &str,
        text: &str,
        source_db: &mut SourceDb,
        interner: &Interner,
        sink: &DiagnosticSink,
        options: PreprocessorOptions,
    ) -> SyntaxTree {
        let file = source_db.add_source(name, text.to_string());
        Self::from_file(file, source_db, interner, sink, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn parse_source(source: &str) -> (SyntaxTree, Vec<sable_diagnostics::Diagnostic>) {
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
        (tree, sink.take_all())
    }

    fn parse_ok(source: &str) -> SyntaxTree {
        let (tree, diags) = parse_source(source);
        assert!(
            diags.is_empty(),
            "unexpected diagnostics: {:?}",
            diags
                .iter()
                .map(|d| (d.code, d.message.clone()))
                .collect::<Vec<_>>()
        );
        tree
    }

    fn first_definition(tree: &SyntaxTree) -> &DefinitionDecl {
        match &tree.root.items[0] {
            Item::Definition(def) => def,
            other => panic!("expected a definition, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_empty_unit() {
        let tree = parse_ok("");
        assert!(tree.root.items.is_empty());
        assert_eq!(tree.tokens.len(), 1);
        assert_eq!(tree.tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn integration_counter() {
        let tree = parse_ok(
            "module counter #(parameter int WIDTH = 8)(
                input logic clk,
                input logic rst,
                input logic en,
                output logic [WIDTH-1:0] count
            );
                always_ff @(posedge clk or negedge rst) begin
                    if (!rst)
                        count <= 0;
                    else if (en)
                        count <= count + 1;
                end
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.kind, DefinitionKind::Module);
        assert_eq!(def.port_style, PortStyle::Ansi);
        assert_eq!(def.params.len(), 1);
        assert_eq!(def.ports.len(), 4);
        assert_eq!(def.items.len(), 1);
    }

    #[test]
    fn integration_mux_always_comb() {
        let tree = parse_ok(
            "module mux4(
                input logic [7:0] a, b,
                input logic [1:0] sel,
                output logic [7:0] y
            );
                always_comb begin
                    case (sel)
                        2'b00: y = a;
                        2'b01: y = b;
                        default: y = 8'h00;
                    endcase
                end
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.items.len(), 1);
    }

    #[test]
    fn integration_fsm_with_enum() {
        let tree = parse_ok(
            "module fsm(
                input logic clk, rst,
                input logic start,
                output logic done
            );
                typedef enum logic [1:0] {IDLE, RUN, STOP} state_t;
                state_t state;

                always_ff @(posedge clk or negedge rst) begin
                    if (!rst) begin
                        state <= IDLE;
                        done <= 0;
                    end else begin
                        unique case (state)
                            IDLE: begin
                                done <= 0;
                                if (start) state <= RUN;
                            end
                            RUN: state <= STOP;
                            STOP: begin
                                done <= 1;
                                state <= IDLE;
                            end
                        endcase
                    end
                end
            endmodule",
        );
        let def = first_definition(&tree);
        assert!(def.items.len() >= 3);
        assert!(matches!(def.items[0], ModuleItem::Typedef(_)));
    }

    #[test]
    fn integration_package_and_import() {
        let tree = parse_ok(
            "package my_pkg;
                parameter int WIDTH = 8;
                typedef logic [WIDTH-1:0] data_t;
                function int max(input int a, input int b);
                    return (a > b) ? a : b;
                endfunction
            endpackage

            module top;
                import my_pkg::*;
                logic [7:0] data;
            endmodule",
        );
        assert_eq!(tree.root.items.len(), 2);
        assert!(matches!(tree.root.items[0], Item::Package(_)));
        if let Item::Package(pkg) = &tree.root.items[0] {
            assert_eq!(pkg.items.len(), 3);
        }
        if let Item::Definition(def) = &tree.root.items[1] {
            assert_eq!(def.items.len(), 2);
        }
    }

    #[test]
    fn integration_interface_with_modport() {
        let tree = parse_ok(
            "interface axi_if;
                logic valid;
                logic ready;
                logic [31:0] data;

                modport master(output valid, output data, input ready);
                modport slave(input valid, input data, output ready);
            endinterface

            module producer(axi_if.master bus);
            endmodule",
        );
        assert_eq!(tree.root.items.len(), 2);
        if let Item::Definition(iface) = &tree.root.items[0] {
            assert_eq!(iface.kind, DefinitionKind::Interface);
            assert_eq!(iface.items.len(), 5);
        }
        if let Item::Definition(def) = &tree.root.items[1] {
            assert!(matches!(
                def.ports[0].kind,
                PortKind::Interface { .. }
            ));
        }
    }

    #[test]
    fn integration_program_definition() {
        let tree = parse_ok(
            "program test_prog(input logic clk);
                initial begin
                end
            endprogram",
        );
        let def = first_definition(&tree);
        assert_eq!(def.kind, DefinitionKind::Program);
    }

    #[test]
    fn integration_struct_packed() {
        let tree = parse_ok(
            "module top;
                typedef struct packed {
                    logic [7:0] data;
                    logic valid;
                } packet_t;

                packet_t pkt;
                always_comb begin
                    pkt.data = 8'hFF;
                    pkt.valid = 1;
                end
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.items.len(), 3);
    }

    #[test]
    fn integration_non_ansi_ports() {
        let tree = parse_ok(
            "module counter(clk, rst, count);
                input logic clk;
                input logic rst;
                output logic [7:0] count;
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.port_style, PortStyle::NonAnsi);
        assert_eq!(def.port_names.len(), 3);
        assert_eq!(def.items.len(), 3);
    }

    #[test]
    fn integration_instantiation_named_params() {
        let tree = parse_ok(
            "module top;
                counter #(.WIDTH(16)) c0 (.clk(clk), .rst(rst), .count(count));
            endmodule",
        );
        let def = first_definition(&tree);
        if let ModuleItem::Instantiation(inst) = &def.items[0] {
            assert_eq!(inst.params.len(), 1);
            assert!(matches!(inst.params[0], ParamAssignment::Named { .. }));
            assert_eq!(inst.instances.len(), 1);
            assert_eq!(inst.instances[0].connections.len(), 3);
        } else {
            panic!("expected instantiation");
        }
    }

    #[test]
    fn integration_instantiation_ordered_and_arrays() {
        let tree = parse_ok(
            "module top;
                buf_cell b[3:0] (in, out);
            endmodule",
        );
        let def = first_definition(&tree);
        if let ModuleItem::Instantiation(inst) = &def.items[0] {
            assert_eq!(inst.instances[0].dims.len(), 1);
            assert_eq!(inst.instances[0].connections.len(), 2);
        } else {
            panic!("expected instantiation");
        }
    }

    #[test]
    fn integration_wildcard_connection() {
        let tree = parse_ok(
            "module top;
                sub u (.*);
            endmodule",
        );
        let def = first_definition(&tree);
        if let ModuleItem::Instantiation(inst) = &def.items[0] {
            assert!(matches!(
                inst.instances[0].connections[0],
                PortConnection::Wildcard(_)
            ));
        } else {
            panic!("expected instantiation");
        }
    }

    #[test]
    fn integration_type_parameter() {
        let tree = parse_ok(
            "module fifo #(parameter type T = logic [7:0], parameter int DEPTH = 16)();
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.params.len(), 2);
        assert!(matches!(def.params[0].kind, ParamKind::Type { .. }));
        assert!(matches!(def.params[1].kind, ParamKind::Value { .. }));
    }

    #[test]
    fn integration_forward_typedefs() {
        let tree = parse_ok(
            "package p;
                typedef enum e_t;
                typedef struct s_t;
                typedef my_t;
                typedef enum { A, B } e_t;
            endpackage",
        );
        if let Item::Package(pkg) = &tree.root.items[0] {
            assert!(matches!(
                pkg.items[0],
                ModuleItem::ForwardTypedef(ForwardTypedefDecl {
                    category: ForwardCategory::Enum,
                    ..
                })
            ));
            assert!(matches!(
                pkg.items[1],
                ModuleItem::ForwardTypedef(ForwardTypedefDecl {
                    category: ForwardCategory::Struct,
                    ..
                })
            ));
            assert!(matches!(
                pkg.items[2],
                ModuleItem::ForwardTypedef(ForwardTypedefDecl {
                    category: ForwardCategory::None,
                    ..
                })
            ));
            assert!(matches!(pkg.items[3], ModuleItem::Typedef(_)));
        } else {
            panic!("expected package");
        }
    }

    #[test]
    fn integration_generate_with_always_ff() {
        let tree = parse_ok(
            "module gen_test #(parameter int N = 4)(
                input logic clk,
                input logic [N-1:0] din,
                output logic [N-1:0] dout
            );
                genvar i;
                generate
                    for (i = 0; i < N; i = i + 1) begin : gen_ff
                        always_ff @(posedge clk)
                            dout[i] <= din[i];
                    end
                endgenerate
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.items.len(), 2);
        assert!(matches!(def.items[1], ModuleItem::Generate(_)));
    }

    #[test]
    fn integration_function_with_return() {
        let tree = parse_ok(
            "module top;
                function int abs(input int val);
                    return (val < 0) ? -val : val;
                endfunction : abs

                int result;
                always_comb begin
                    result = abs(-42);
                end
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.items.len(), 3);
        if let ModuleItem::Function(f) = &def.items[0] {
            assert_eq!(f.args.len(), 1);
            assert!(f.end_label.is_some());
        } else {
            panic!("expected function");
        }
    }

    #[test]
    fn integration_end_labels() {
        let tree = parse_ok(
            "module top;
            endmodule : top

            interface bus_if;
            endinterface : bus_if

            package my_pkg;
            endpackage : my_pkg",
        );
        assert_eq!(tree.root.items.len(), 3);
        if let Item::Definition(def) = &tree.root.items[0] {
            assert!(def.end_label.is_some());
        }
    }

    #[test]
    fn integration_compound_assignments() {
        let tree = parse_ok(
            "module arith;
                int a;
                always_comb begin
                    a = 0;
                    a += 5;
                    a <<= 2;
                end
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.items.len(), 2);
    }

    #[test]
    fn integration_preprocessor_macro() {
        let tree = parse_ok(
            "`define WIDTH 8
            module top;
                logic [`WIDTH-1:0] data;
            endmodule",
        );
        let def = first_definition(&tree);
        assert!(matches!(def.items[0], ModuleItem::Data(_)));
    }

    #[test]
    fn integration_conditional_compilation() {
        let tree = parse_ok(
            "`define FANCY
            module top;
            `ifdef FANCY
                logic fancy_signal;
            `else
                logic plain_signal;
            `endif
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.items.len(), 1);
    }

    #[test]
    fn integration_error_recovery() {
        let mut db = SourceDb::new();
        let interner = Interner::new();
        let sink = DiagnosticSink::new();
        let tree = SyntaxTree::from_source(
            "test.sv",
            "module bad;
                wire ; // missing name
            endmodule

            module good(input logic clk);
                logic [7:0] data;
            endmodule",
            &mut db,
            &interner,
            &sink,
            PreprocessorOptions::default(),
        );
        assert_eq!(tree.root.items.len(), 2);
        assert!(sink.has_errors());
        if let Item::Definition(def) = &tree.root.items[1] {
            assert_eq!(interner.resolve(def.name), "good");
            assert_eq!(def.items.len(), 1);
        } else {
            panic!("expected second definition to survive recovery");
        }
    }

    #[test]
    fn round_trip_whole_file() {
        let source = "`define W 4\nmodule m #(parameter int P = `W)(input logic clk);\n  // body\n  logic [P-1:0] q;\nendmodule\n";
        let (tree, diags) = parse_source(source);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(lexer::round_trip(&tree.tokens, source), source);
    }

    #[test]
    fn round_trip_survives_parse_errors() {
        let source = "module m;\n  wire ;\n  assign = 4;\nendmodule\n";
        let (tree, diags) = parse_source(source);
        assert!(!diags.is_empty());
        assert_eq!(lexer::round_trip(&tree.tokens, source), source);
    }

    #[test]
    fn integration_serde_roundtrip() {
        let tree = parse_ok(
            "module top(input logic clk, output logic [7:0] data);
                assign data = 8'hFF;
            endmodule",
        );
        let json = serde_json::to_string(&tree.root).unwrap();
        let back: SourceUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(back.items.len(), tree.root.items.len());
    }

    #[test]
    fn integration_default_nettype_carried() {
        let (tree, _) = parse_source("`default_nettype none\nmodule m; endmodule\n");
        assert_eq!(tree.default_nettype, DefaultNetType::None);
    }

    #[test]
    fn integration_delay_and_event_controls() {
        let tree = parse_ok(
            "module tb;
                logic clk;
                initial begin
                    clk = 0;
                    forever #5 clk = ~clk;
                end
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.items.len(), 2);
    }

    #[test]
    fn integration_casts_and_selects() {
        let tree = parse_ok(
            "module m;
                int x;
                logic [31:0] v;
                always_comb begin
                    x = int'(v[7:0]);
                    v[15-:8] = 8'hA5;
                    v[3] = v[2+:1];
                end
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.items.len(), 3);
    }

    #[test]
    fn integration_concat_replication() {
        let tree = parse_ok(
            "module m(input logic [3:0] a, output logic [15:0] y);
                assign y = {4{a}};
                wire [7:0] w = {a, 4'b0000};
            endmodule",
        );
        let def = first_definition(&tree);
        assert_eq!(def.items.len(), 2);
    }
}
