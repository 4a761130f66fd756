use std::error::Error;
use std::process;

use clap::{Arg, ArgAction, ArgMatches, Command};
use duct::cmd;

type AnyResult<T> = Result<T, Box<dyn Error>>;
type StepFn = fn(&ArgMatches) -> AnyResult<()>;
type Step = (&'static str, StepFn);

fn cli() -> Command {
    Command::new("rainbow-tabs-task")
        .about("Tasks for managing the rainbow-tabs workspace")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("lint").about("Check formatting and run clippy").arg(
                Arg::new("fix")
                    .long("fix")
                    .action(ArgAction::SetTrue)
                    .help("Rewrite files with rustfmt instead of only checking"),
            ),
        )
        .subcommand(
            Command::new("test").about("Run workspace tests").arg(
                Arg::new("package")
                    .long("package")
                    .short('p')
                    .help("Only test this package"),
            ),
        )
        .subcommand(Command::new("bench").about("Run the palette benchmarks"))
        .subcommand(Command::new("all").about("Run lint and tests"))
}

fn main() {
    if let Err(error) = run() {
        eprintln!("xtask error: {error}");
        process::exit(1);
    }
}

fn run() -> AnyResult<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("lint", args)) => run_lint(args),
        Some(("test", args)) => run_tests(args),
        Some(("bench", args)) => run_bench(args),
        Some(("all", args)) => run_all(args),
        _ => unreachable!(),
    }
}

fn run_lint(args: &ArgMatches) -> AnyResult<()> {
    println!("Running Rust lint...");
    if args.try_get_one::<bool>("fix").ok().flatten().copied().unwrap_or(false) {
        run_cmd("cargo", &["fmt", "--all"])?;
    } else {
        run_cmd("cargo", &["fmt", "--all", "--check"])?;
    }
    run_cmd(
        "cargo",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )
}

fn run_tests(args: &ArgMatches) -> AnyResult<()> {
    println!("Running Rust tests...");
    match args.try_get_one::<String>("package").ok().flatten() {
        Some(package) => run_cmd("cargo", &["test", "-p", package.as_str()]),
        None => run_cmd("cargo", &["test", "--workspace"]),
    }
}

fn run_bench(_args: &ArgMatches) -> AnyResult<()> {
    println!("Running benchmarks...");
    run_cmd("cargo", &["bench", "-p", "rainbow-tabs"])
}

fn run_all(args: &ArgMatches) -> AnyResult<()> {
    let mut errors = Vec::new();

    const STEPS: &[Step] = &[("Rust lint", run_lint), ("Rust tests", run_tests)];

    for (label, step) in STEPS {
        if let Err(error) = step(args) {
            eprintln!("{label} failed: {error}");
            errors.push(format!("{label}: {error}"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("One or more tasks failed:\n{}", errors.join("\n")).into())
    }
}

fn run_cmd(program: &str, args: &[&str]) -> AnyResult<()> {
    println!("> {} {}", program, args.join(" "));
    cmd(program, args).run()?;
    Ok(())
}
