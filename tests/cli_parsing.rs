use clap::Parser;
use std::path::PathBuf;

use verifix::cli::{Cli, Commands};

#[test]
fn test_parse_run_with_overrides() {
    let cli = Cli::try_parse_from(vec![
        "verifix",
        "run",
        "--spec",
        "counter_spec.txt",
        "--budget",
        "3",
        "--model",
        "qwen2.5-coder:32b",
    ])
    .unwrap();

    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.spec, Some(PathBuf::from("counter_spec.txt")));
            assert_eq!(args.budget, Some(3));
            assert_eq!(args.model, Some("qwen2.5-coder:32b".to_string()));
            assert!(!args.dry_run);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_run_defaults() {
    let cli = Cli::try_parse_from(vec!["verifix", "run"]).unwrap();

    match cli.command {
        Commands::Run(args) => {
            assert!(args.spec.is_none());
            assert!(args.budget.is_none());
            assert!(args.model.is_none());
            assert!(!args.dry_run);
        }
        _ => panic!("Wrong top-level command"),
    }
    assert!(!cli.json);
}

#[test]
fn test_parse_run_dry_run_with_global_json() {
    let cli = Cli::try_parse_from(vec!["verifix", "run", "--dry-run", "--json"]).unwrap();

    assert!(cli.json);
    match cli.command {
        Commands::Run(args) => assert!(args.dry_run),
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_init_force() {
    let cli = Cli::try_parse_from(vec!["verifix", "init", "--force", "some/dir"]).unwrap();

    match cli.command {
        Commands::Init(args) => {
            assert!(args.force);
            assert_eq!(args.path, PathBuf::from("some/dir"));
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_trace_with_ticks() {
    let cli =
        Cli::try_parse_from(vec!["verifix", "trace", "dump.vcd", "--ticks", "4"]).unwrap();

    match cli.command {
        Commands::Trace(args) => {
            assert_eq!(args.file, PathBuf::from("dump.vcd"));
            assert_eq!(args.ticks, 4);
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_trace_requires_a_file() {
    assert!(Cli::try_parse_from(vec!["verifix", "trace"]).is_err());
}

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(vec!["verifix", "synthesize"]).is_err());
}
