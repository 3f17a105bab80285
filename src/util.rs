/*
 * Trivial to understand utility functions that need not clutter other namespaces.
 */
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Instant;

/// Reads a file into a Vec of big-endian f32s.
pub fn read_file_as_f32s<P: AsRef<Path>>(filename: P) -> io::Result<Vec<f32>> {
    let f = File::open(filename)?;
    let mut reader = BufReader::new(f);

    // Iterate the file into f32s
    let mut floats: Vec<f32> = Vec::new();
    loop {
        match reader.read_f32::<BigEndian>() {
            Ok(f) => floats.push(f),
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }
    Ok(floats)
}

/// Reads a file into a Vec of f32s and verifies that the byte-count of the
/// input file matches with the expected amount of f32s.
pub fn read_file_as_f32s_checked<P: AsRef<Path>>(
    filename: P,
    expected_len: usize,
) -> io::Result<Vec<f32>> {
    let v = read_file_as_f32s(&filename)?;
    let len = v.len();
    if len != expected_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "expected {} f32s to be read from \"{}\", but {} were read",
                expected_len,
                filename.as_ref().display(),
                len
            ),
        ));
    }
    Ok(v)
}

/// Writes f32s into a file as big-endian, creating parent directories as needed.
pub fn write_file_f32s<P: AsRef<Path>>(filename: P, data: &[f32]) -> io::Result<()> {
    if let Some(parent) = filename.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(filename)?);
    for &f in data {
        writer.write_f32::<BigEndian>(f)?;
    }
    writer.flush()
}

/// Panics with the first mismatching index if the two buffers differ by more than `margin`.
pub fn verify(output: &[f32], correct: &[f32], margin: f32) {
    assert_eq!(output.len(), correct.len(), "buffer lengths differ");
    for (idx, (o, c)) in output.iter().zip(correct).enumerate() {
        assert!(
            (o - c).abs() <= margin,
            "mismatch at {}: got {}, expected {} (margin {})",
            idx,
            o,
            c,
            margin
        );
    }
}

/// Milliseconds between two instants, as a float.
pub fn duration_between(start: Instant, end: Instant) -> f64 {
    let duration = end.duration_since(start);
    duration.as_secs() as f64 * 1000f64 + f64::from(duration.subsec_nanos()) / 1_000_000f64
}
