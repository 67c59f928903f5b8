use clap::{error::ErrorKind, Parser};
use tls_scan::{
    cli::Args,
    error::{exit_code_for, FatalError},
};

#[test]
fn short_v_prints_version() {
    let err = Args::try_parse_from(["tls-scan", "-v"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);

    let err = Args::try_parse_from(["tls-scan", "--version"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayVersion);
}

#[test]
fn flags_and_hosts_parse() {
    let args = Args::try_parse_from(["tls-scan", "-c", "-j", "-l", "2", "-s", "3", "a.example", "b.example"])
        .unwrap();
    assert!(args.cache);
    assert!(args.json);
    assert!(!args.mail);
    assert_eq!(args.log_level, Some(2));
    assert_eq!(args.concurrency, Some(3));
    assert_eq!(args.hosts, ["a.example", "b.example"]);
}

#[test]
fn out_of_range_values_are_rejected() {
    assert!(Args::try_parse_from(["tls-scan", "-s", "1"]).is_err());
    assert!(Args::try_parse_from(["tls-scan", "-s", "6"]).is_err());
    assert!(Args::try_parse_from(["tls-scan", "-l", "4"]).is_err());
}

#[test]
fn exit_codes_follow_the_fatal_error_kind() {
    let config: anyhow::Error = FatalError::Config("empty host list".into()).into();
    assert_eq!(exit_code_for(&config), 10);

    let service: anyhow::Error = FatalError::ServiceUnavailable("no slots".into()).into();
    assert_eq!(exit_code_for(&service.context("probing capacity")), 8);

    assert_eq!(exit_code_for(&anyhow::anyhow!("disk full")), 1);
}
