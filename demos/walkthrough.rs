//! Analyzes a few small methods and prints their findings.
//!
//! Run with `--trace` and `RUST_LOG`-style verbosity (`-v`) to see the state before and after
//! every statement of the final pass.

use clap::{Parser, ValueEnum};

use flowcheck::algebra::{ArithOp, CmpOp};
use flowcheck::ast::{MethodId, Tree, TreeBuilder, UnaryOp};
use flowcheck::trace::{LogTrace, NoTrace, Trace};
use flowcheck::types::{Annotation, TypeRef};
use flowcheck::{Analyzer, AnalyzerConfig};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Program {
    /// `int count() { int i = 0; while (i < 10) i++; return i; }`
    Counter,
    /// `int len(boolean flag) { String s = null; if (flag) s = "abc"; return s.length(); }`
    Nulls,
    /// `int scale(@Min(-1) @Max(3) int d) { return 10 / d; }`
    Division,
    /// `@Positive int twice(@NotNull String s, @Min(0) int n) { ... }` called with `null` and `-1`.
    Contracts,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Program to analyze.
    #[arg(value_enum, default_value = "counter")]
    program: Program,

    /// Loop iterations before widening.
    #[clap(long, value_name = "INT", default_value = "3")]
    widening_threshold: usize,

    /// Hard cap on loop iterations.
    #[clap(long, value_name = "INT", default_value = "100")]
    max_iterations: usize,

    /// Log the state around every statement.
    #[clap(long)]
    trace: bool,

    /// Report dereferences of possibly-null values too.
    #[clap(long)]
    strict_nulls: bool,
}

fn counter() -> (Tree, MethodId) {
    let mut b = TreeBuilder::new();
    let i = b.local("i", TypeRef::int());
    let zero = b.int(0);
    let decl = b.declare(i, Some(zero));
    let read = b.name(i);
    let ten = b.int(10);
    let cond = b.cmp(CmpOp::Lt, read, ten);
    let read = b.name(i);
    let bump = b.unary(UnaryOp::PostInc, read);
    let step = b.expr_stmt(bump);
    let loop_ = b.while_loop(cond, step);
    let read = b.name(i);
    let ret = b.ret(Some(read));
    let body = b.block(vec![decl, loop_, ret]);
    let m = b.method("count", vec![], TypeRef::int(), vec![], Some(body));
    (b.build(), m)
}

fn nulls() -> (Tree, MethodId) {
    let mut b = TreeBuilder::new();
    let flag = b.param("flag", TypeRef::boolean(), vec![]);
    let s = b.local("s", TypeRef::String);
    let null = b.null();
    let decl = b.declare(s, Some(null));
    let read = b.name(flag);
    let abc = b.str_lit("abc");
    let assign = b.assign(s, abc);
    let set = b.expr_stmt(assign);
    let branch = b.if_then(read, set);
    let read = b.name(s);
    let len = b.length(read);
    let ret = b.ret(Some(len));
    let body = b.block(vec![decl, branch, ret]);
    let m = b.method("len", vec![flag], TypeRef::int(), vec![], Some(body));
    (b.build(), m)
}

fn division() -> (Tree, MethodId) {
    let mut b = TreeBuilder::new();
    let d = b.param("d", TypeRef::int(), vec![Annotation::Min(-1), Annotation::Max(3)]);
    let ten = b.int(10);
    let read = b.name(d);
    let quotient = b.arith(ArithOp::Div, ten, read);
    let ret = b.ret(Some(quotient));
    let m = b.method("scale", vec![d], TypeRef::int(), vec![], Some(ret));
    (b.build(), m)
}

fn contracts() -> (Tree, MethodId) {
    let mut b = TreeBuilder::new();
    let s = b.param("s", TypeRef::String, vec![Annotation::NotNull]);
    let n = b.param("n", TypeRef::int(), vec![Annotation::Min(0)]);
    let twice = b.method("twice", vec![s, n], TypeRef::int(), vec![Annotation::Positive], None);

    let k = b.param("k", TypeRef::int(), vec![Annotation::Max(5)]);
    let null = b.null();
    let minus = b.int(-1);
    let call = b.call(Some(twice), None, vec![null, minus]);
    let drop = b.expr_stmt(call);
    let read = b.name(k);
    let ret = b.ret(Some(read));
    let body = b.block(vec![drop, ret]);
    let m = b.method("caller", vec![k], TypeRef::int(), vec![Annotation::PositiveOrZero], Some(body));
    (b.build(), m)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();
    let level = if args.trace {
        simplelog::LevelFilter::Trace
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;
    println!("args = {:?}", args);

    let (tree, method) = match args.program {
        Program::Counter => counter(),
        Program::Nulls => nulls(),
        Program::Division => division(),
        Program::Contracts => contracts(),
    };

    let config = AnalyzerConfig {
        widening_threshold: args.widening_threshold,
        max_iterations: args.max_iterations,
        report_nullable_dereference: args.strict_nulls,
        ..AnalyzerConfig::default()
    };
    let analyzer = Analyzer::new(config);
    let mut trace: Box<dyn Trace> = if args.trace { Box::new(LogTrace) } else { Box::new(NoTrace) };

    let time = std::time::Instant::now();
    let analysis = analyzer.analyze_method_with_trace(&tree, method, trace.as_mut())?;
    let time = time.elapsed();

    println!("Analyzed {} nodes in {:.3}s", tree.len(), time.as_secs_f64());
    println!("exit state: {}", analysis.exit_state);
    if analysis.report.is_empty() {
        println!("no findings");
    } else {
        println!(
            "{} findings ({} definite):",
            analysis.report.len(),
            analysis.report.definite().count()
        );
        print!("{}", analysis.report);
    }

    Ok(())
}
