//! Single-shot streaming self-test.
//!
//! Independent of the pipeline: this feeds a file of test points through
//! the accelerator's streaming path once and compares every output word
//! against an expected-output file. Points are fixed-width records rounded
//! up to the DDR/AXI width, written as hexadecimal text with the least
//! significant 8-hex-digit word at the end of each line.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use nttfpga_backend::ExecutionBackend;
use snafu::ResultExt;
use tracing::{error, info};

use crate::error::{DeviceProgramSnafu, IoSnafu, PointParseSnafu, Result};

/// Scalar width in bits.
pub const SCALAR_BITS: usize = 253;
/// Base-field element width in bits.
pub const FIELD_BITS: usize = 377;
/// DDR/AXI stream width in bits; point records are rounded up to this.
pub const DDR_BITS: usize = 512;

/// Bytes per input point: a scalar plus an affine point (3 field elements),
/// rounded up to the stream width.
pub const fn bytes_per_input_point() -> usize {
    (SCALAR_BITS + 3 * FIELD_BITS).div_ceil(DDR_BITS) * DDR_BITS / 8
}

/// Bytes per output point: 4 field elements, rounded up to the stream width.
pub const fn bytes_per_output_point() -> usize {
    (4 * FIELD_BITS).div_ceil(DDR_BITS) * DDR_BITS / 8
}

/// 32-bit words per input point record.
pub const fn words_per_input_point() -> usize {
    bytes_per_input_point() / 4
}

/// 32-bit words per output point record.
pub const fn words_per_output_point() -> usize {
    bytes_per_output_point() / 4
}

/// One output word that differed from the expected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub point: usize,
    pub word: usize,
    pub fpga: u32,
    pub expected: u32,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "word did not match: fpga[{:08x}] expected[{:08x}] point[{}] word[{}]",
            self.fpga, self.expected, self.point, self.word
        )
    }
}

/// Parse one point line into a fixed-width little-endian word record.
///
/// Word `i` is the 8-hex-digit chunk ending `8·i` characters before the end
/// of the line; lines shorter than a full record leave the missing high
/// words zero. The line length must be a multiple of 8 and fit the record.
pub fn parse_point_line(line: &str, words_per_point: usize, line_number: usize) -> Result<Vec<u32>> {
    let line = line.trim_end();
    snafu::ensure!(
        line.is_ascii(),
        PointParseSnafu { line_number, reason: "non-ASCII character in point line".to_string() }
    );
    snafu::ensure!(
        line.len() % 8 == 0,
        PointParseSnafu { line_number, reason: format!("length {} is not a multiple of 8", line.len()) }
    );
    snafu::ensure!(
        line.len() / 8 <= words_per_point,
        PointParseSnafu {
            line_number,
            reason: format!("line holds {} words but a point is {words_per_point}", line.len() / 8),
        }
    );

    let mut words = vec![0u32; words_per_point];
    for (i, word) in words.iter_mut().enumerate().take(line.len() / 8) {
        let end = line.len() - 8 * i;
        let chunk = &line[end - 8..end];
        *word = u32::from_str_radix(chunk, 16).map_err(|err| {
            PointParseSnafu { line_number, reason: format!("bad hex word {chunk:?}: {err}") }.build()
        })?;
    }
    Ok(words)
}

/// Load a point file into word-packed records of `words_per_point` each.
pub fn load_points(path: &Path, words_per_point: usize) -> Result<Vec<u32>> {
    let file = File::open(path).context(IoSnafu { path: path.display().to_string() })?;
    let mut words = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context(IoSnafu { path: path.display().to_string() })?;
        words.extend(parse_point_line(&line, words_per_point, index + 1)?);
    }
    Ok(words)
}

/// Compare streamed output words against the expected words.
pub fn compare_words(fpga: &[u32], expected: &[u32], words_per_point: usize) -> Vec<Mismatch> {
    fpga.iter()
        .zip(expected)
        .enumerate()
        .filter(|(_, (fpga, expected))| fpga != expected)
        .map(|(index, (&fpga, &expected))| Mismatch {
            point: index / words_per_point,
            word: index % words_per_point,
            fpga,
            expected,
        })
        .collect()
}

/// Run the streaming self-test: program the device, stream the input file
/// through, and check every output word against the expected file.
///
/// Returns `Ok(true)` when all words match. Failure to program any device
/// is fatal (`DeviceProgram`); callers at the binary level exit on it.
pub fn run_streaming_test(
    backend: &dyn ExecutionBackend,
    program: &Path,
    input_points: &Path,
    expected_points: &Path,
) -> Result<bool> {
    let input = load_points(input_points, words_per_input_point())?;
    let expected = load_points(expected_points, words_per_output_point())?;
    info!(
        input_points = input.len() / words_per_input_point(),
        output_points = expected.len() / words_per_output_point(),
        "running streaming test"
    );

    backend.load_program(program).map_err(|err| {
        DeviceProgramSnafu { path: program.display().to_string(), reason: err.to_string() }.build()
    })?;

    let fpga = backend.stream(&input, expected.len())?;

    let mismatches = compare_words(&fpga, &expected, words_per_output_point());
    for mismatch in &mismatches {
        error!("{mismatch}");
    }

    let passed = mismatches.is_empty();
    info!(passed, mismatched_words = mismatches.len(), "streaming test finished");
    Ok(passed)
}
