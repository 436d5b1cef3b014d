use std::io::Write;

use nttfpga_backend::SimBackend;
use tempfile::NamedTempFile;

use crate::error::Error;
use crate::streaming::{
    bytes_per_input_point, bytes_per_output_point, compare_words, load_points, parse_point_line,
    run_streaming_test, words_per_input_point, words_per_output_point, Mismatch,
};

#[test]
fn test_point_widths_round_to_stream_width() {
    // scalar (253) + 3 field elements (3·377) rounds to 3 DDR beats,
    // 4 field elements likewise: both records are 192 bytes / 48 words.
    assert_eq!(bytes_per_input_point(), 192);
    assert_eq!(bytes_per_output_point(), 192);
    assert_eq!(words_per_input_point(), 48);
    assert_eq!(words_per_output_point(), 48);
}

#[test]
fn test_parse_least_significant_word_at_line_tail() {
    let words = parse_point_line("0000000100000002", 4, 1).unwrap();
    assert_eq!(words, vec![0x2, 0x1, 0, 0]);
}

#[test]
fn test_parse_full_width_point() {
    let line = "deadbeef00000003000000020000000b";
    let words = parse_point_line(line, 4, 1).unwrap();
    assert_eq!(words, vec![0xb, 0x2, 0x3, 0xdead_beef]);
}

#[test]
fn test_parse_rejects_ragged_line() {
    assert!(matches!(
        parse_point_line("abcde", 4, 7),
        Err(Error::PointParse { line_number: 7, .. })
    ));
}

#[test]
fn test_parse_rejects_overlong_line() {
    let line = "00000001".repeat(5);
    assert!(matches!(parse_point_line(&line, 4, 2), Err(Error::PointParse { line_number: 2, .. })));
}

#[test]
fn test_parse_rejects_non_hex() {
    assert!(matches!(parse_point_line("0000zzzz", 4, 3), Err(Error::PointParse { .. })));
}

#[test]
fn test_load_points_packs_fixed_width_records() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "00000001").unwrap();
    writeln!(file, "0000000300000002").unwrap();
    file.flush().unwrap();

    let words = load_points(file.path(), 4).unwrap();
    assert_eq!(words, vec![0x1, 0, 0, 0, 0x2, 0x3, 0, 0]);
}

#[test]
fn test_compare_words_locates_mismatches() {
    let expected = vec![0, 1, 2, 3, 4, 5];
    let mut fpga = expected.clone();
    fpga[4] = 99;

    let mismatches = compare_words(&fpga, &expected, 3);
    assert_eq!(mismatches, vec![Mismatch { point: 1, word: 1, fpga: 99, expected: 4 }]);
}

#[test]
fn test_compare_words_all_match() {
    let words = vec![7u32; 96];
    assert!(compare_words(&words, &words, 48).is_empty());
}

/// A single mismatched word anywhere in the run must fail the test.
#[test]
fn test_single_mismatch_fails_the_run() {
    let expected = vec![0u32; 48];
    let mut fpga = expected.clone();
    fpga[47] = 1;
    assert_eq!(compare_words(&fpga, &expected, 48).len(), 1);
}

fn point_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_streaming_run_passes_on_zero_expectation() {
    // The simulation streams back zeros, so an all-zero expected file passes.
    let backend = SimBackend::new();
    let program = point_file(&[]);
    let input = point_file(&["00000001", "00000002"]);
    let expected = point_file(&["00000000", "00000000"]);

    let passed = run_streaming_test(&backend, program.path(), input.path(), expected.path()).unwrap();
    assert!(passed);
}

#[test]
fn test_streaming_run_fails_on_mismatch() {
    let backend = SimBackend::new();
    let program = point_file(&[]);
    let input = point_file(&["00000001"]);
    let expected = point_file(&["00000005"]);

    let passed = run_streaming_test(&backend, program.path(), input.path(), expected.path()).unwrap();
    assert!(!passed);
}

#[test]
fn test_streaming_missing_input_file_is_io_error() {
    let backend = SimBackend::new();
    let program = point_file(&[]);
    let expected = point_file(&[]);

    let result = run_streaming_test(
        &backend,
        program.path(),
        std::path::Path::new("/nonexistent/points.txt"),
        expected.path(),
    );
    assert!(matches!(result, Err(Error::Io { .. })));
}
