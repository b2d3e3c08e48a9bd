//! stack-demo: walks through the stack API and prints what happens.
//!
//! # Usage
//!
//! ```bash
//! stack-demo                      # untyped walk-through
//! stack-demo --kind integer 1 2 x # typed stack, JSON-decoded values
//! RUST_LOG=trace stack-demo --kind boolean true 3
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ts_stack::{downcast, Kind, TypedStack, UntypedStack};

/// Exercise a thread-safe stack from the command line.
#[derive(Parser, Debug)]
#[command(name = "stack-demo")]
#[command(about = "Push, pop, peek and drain a thread-safe stack")]
struct Cli {
    /// Declared kind for a typed stack (integer, float, string, boolean).
    /// Without it the untyped walk-through runs.
    #[arg(long)]
    kind: Option<Kind>,

    /// Values to push onto the typed stack, parsed as JSON
    /// (bare words are treated as strings).
    values: Vec<String>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` wins if set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.kind {
        Some(kind) => typed_demo(kind, &cli.values),
        None => untyped_demo(),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn untyped_demo() {
    let s = UntypedStack::new();
    s.push_value("foo");
    s.push_value("bar");
    s.push_value("baz");

    println!("Size: {}", s.size());
    for _ in 0..2 {
        report("Pop", downcast::<&'static str>(s.pop()));
    }
    report("Peek", downcast::<&'static str>(s.peek()));
    report("Pop", downcast::<&'static str>(s.pop()));
    println!("Size: {}", s.size());

    s.push_value("foo");
    s.push_value("bar");
    s.push_value("baz");
    s.drain();
    println!("Size: {}", s.size());

    s.push_value("foo");
    println!("Size: {}", s.size());
    report("Peek", downcast::<&'static str>(s.peek()));
    s.drain();
    report("Peek", downcast::<&'static str>(s.peek()));
}

fn typed_demo(kind: Kind, values: &[String]) {
    let s = TypedStack::new(kind);

    for raw in values {
        let value = match serde_json::from_str(raw) {
            Ok(json) => json,
            Err(_) => serde_json::Value::String(raw.clone()),
        };
        match s.push_json(value) {
            Ok(()) => println!("Push: {raw}"),
            Err(err) => tracing::warn!(value = %raw, error = %err, "push rejected"),
        }
    }

    println!("Size: {}", s.size());
    report("Peek", s.peek());
    while !s.is_empty() {
        report("Pop", s.pop());
    }
    report("Pop", s.pop());
}

fn report<V: std::fmt::Display>(label: &str, result: ts_stack::Result<V>) {
    match result {
        Ok(value) => println!("{label}: {value}"),
        Err(err) => tracing::warn!(error = %err, "{label} failed"),
    }
}
