use crate::cli::{format_table, Cli, Commands};
use crate::format::{FormatRegistry, DEFAULT_FORMAT_TOKENS};
use clap::Parser;

#[test]
fn test_serve_command() {
    let cli = Cli::try_parse_from([
        "detectors",
        "serve",
        "--config",
        "gateway.yaml",
        "--addr",
        "127.0.0.1:9000",
    ])
    .unwrap();
    match cli.command {
        Commands::Serve { config, addr } => {
            assert_eq!(config.unwrap().to_string_lossy(), "gateway.yaml");
            assert_eq!(addr.as_deref(), Some("127.0.0.1:9000"));
        }
        other => panic!("expected serve, got {other:?}"),
    }
}

#[test]
fn test_invoke_command() {
    let cli = Cli::try_parse_from([
        "detectors",
        "invoke",
        "--path",
        "/api/redis/connection/local/list/k/length",
        "--accept",
        "text/plain",
    ])
    .unwrap();
    match cli.command {
        Commands::Invoke { path, accept, .. } => {
            assert!(path.ends_with("/length"));
            assert_eq!(accept.as_deref(), Some("text/plain"));
        }
        other => panic!("expected invoke, got {other:?}"),
    }
}

#[test]
fn test_invoke_requires_path() {
    assert!(Cli::try_parse_from(["detectors", "invoke"]).is_err());
    assert!(Cli::try_parse_from(["detectors", "formats"]).is_ok());
}

#[test]
fn test_format_table() {
    let table = format_table(&FormatRegistry::with_defaults());
    assert_eq!(table.lines().count(), DEFAULT_FORMAT_TOKENS.len());
    assert!(table.contains("csv\tapplication/vnd+detectors.csv\tcsv\n"));
    assert!(table.contains("htm\ttext/html\t"));
}
