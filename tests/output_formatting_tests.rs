mod common;
use common::*;

fn one_line() -> String {
    access_line(
        "10.0.0.1",
        "01/Feb/2022:10:00:00",
        "GET /index.html HTTP/1.1",
        200,
        "Mozilla/5.0",
    )
}

#[test]
fn test_table_output_with_headers() {
    let (stdout, _, exit_code) = run_logparser_with_file(&["--print-headers"], &one_line());
    assert_eq!(exit_code, 0);
    assert_eq!(
        lines(&stdout),
        vec![
            "Status\tRemote IP      \tDate/Time           \tTime diff\tUser agent\tRequest",
            "200\t10.0.0.1       \t01-02-2022 10:00:00 \t0       \tMozilla/5.0\tGET /index.html HTTP/1.1",
        ]
    );
}

#[test]
fn test_csv_output_with_headers() {
    let (stdout, _, exit_code) = run_logparser_with_file(
        &["--print-headers", "--output-format", "csv"],
        &one_line(),
    );
    assert_eq!(exit_code, 0);
    assert_eq!(
        lines(&stdout),
        vec![
            "Status,Remote IP,Date/Time,Time diff,User agent,Request",
            "200,10.0.0.1,01-02-2022 10:00:00,0,Mozilla/5.0,GET /index.html HTTP/1.1",
        ]
    );
}

#[test]
fn test_all_fields_in_registry_order() {
    let (stdout, _, exit_code) = run_logparser_with_file(
        &[
            "--included-fields",
            "all",
            "--excluded-fields",
            "log_file_name,country,city",
            "--print-headers",
            "--output-format",
            "csv",
        ],
        &one_line(),
    );
    assert_eq!(exit_code, 0);
    assert_eq!(
        lines(&stdout)[0],
        "Status,Remote IP,Date/Time,Time diff,User agent,Request"
    );
}

#[test]
fn test_request_control_characters_escaped() {
    let line = access_line(
        "10.0.0.1",
        "01/Feb/2022:10:00:00",
        "GET /\ta HTTP/1.1",
        200,
        "curl",
    );
    let (stdout, _, exit_code) = run_logparser_with_file(
        &["--included-fields", "http_request", "--output-format", "csv"],
        &line,
    );
    assert_eq!(exit_code, 0);
    assert_eq!(lines(&stdout), vec![r"GET /\ta HTTP/1.1"]);
}

#[test]
fn test_stats_without_invalid_lines() {
    let (stdout, _, exit_code) = run_logparser_with_file(&["--show-stats"], &one_line());
    assert_eq!(exit_code, 0);
    assert!(stdout.contains("Processed log entries: 1"));
    assert!(stdout.contains("Matched log entries:   1"));
    assert!(!stdout.contains("Invalid lines:"));
}

#[test]
fn test_verbose_diagnostics_go_to_stderr() {
    let (stdout, stderr, exit_code) =
        run_logparser_with_file(&["-v", "--output-format", "csv"], &one_line());
    assert_eq!(exit_code, 0);
    assert!(stderr.contains("Processing file"));
    assert!(!stdout.contains("Processing file"));
}
