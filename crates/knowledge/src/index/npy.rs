//! Minimal NumPy `.npy` reader/writer for little-endian `f32` matrices.
//!
//! Only the subset numpy itself produces for `np.save(path, arr.astype(np.float32))`
//! on a 2-D C-ordered array: format 1.0 or 2.0, `descr '<f4'`, `fortran_order False`.

use cairn_core::{AppError, AppResult};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Header + preamble length is padded to a multiple of this.
const ALIGNMENT: usize = 64;

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl Matrix {
    pub fn empty(cols: usize) -> Self {
        Self {
            rows: 0,
            cols,
            data: Vec::new(),
        }
    }

    /// Stack equally sized rows. Fails on a ragged input.
    pub fn from_rows(rows: &[Vec<f32>], cols: usize) -> AppResult<Self> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(AppError::Index(format!(
                    "Embedding {} has dimension {}, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0; an empty-column matrix has no rows anyway
        self.data.chunks_exact(self.cols.max(1))
    }
}

/// Write `matrix` as an `.npy` file.
pub fn write_matrix(path: &Path, matrix: &Matrix) -> AppResult<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(&header_bytes(matrix.rows, matrix.cols))?;
    for value in &matrix.data {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Read an `.npy` file written by [`write_matrix`] or by numpy.
pub fn read_matrix(path: &Path) -> AppResult<Matrix> {
    let bytes = fs::read(path)?;
    parse_matrix(&bytes).map_err(|reason| AppError::Index(format!("{:?}: {}", path, reason)))
}

fn header_bytes(rows: usize, cols: usize) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows, cols
    );

    // magic(6) + version(2) + header_len(2) + dict + padding + '\n'
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    let header_len = dict.len() + padding + 1;

    let mut out = Vec::with_capacity(unpadded + padding);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend(std::iter::repeat(b' ').take(padding));
    out.push(b'\n');
    out
}

fn parse_matrix(bytes: &[u8]) -> Result<Matrix, String> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err("not a .npy file".to_string());
    }

    let (header_len, preamble) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 if bytes.len() >= 12 => (
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
            12,
        ),
        v => return Err(format!("unsupported .npy version {}", v)),
    };

    let data_start = preamble + header_len;
    let header = bytes
        .get(preamble..data_start)
        .ok_or_else(|| "truncated header".to_string())?;
    let header = std::str::from_utf8(header).map_err(|_| "header is not UTF-8".to_string())?;

    if !header.contains("'descr': '<f4'") {
        return Err(format!("unsupported dtype in header {}", header.trim()));
    }
    if !header.contains("'fortran_order': False") {
        return Err("Fortran-ordered arrays are not supported".to_string());
    }

    let (rows, cols) = parse_shape(header)?;

    let data = &bytes[data_start..];
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| format!("shape ({}, {}) is too large", rows, cols))?;
    if data.len() != expected {
        return Err(format!(
            "expected {} data bytes for shape ({}, {}), found {}",
            expected,
            rows,
            cols,
            data.len()
        ));
    }

    let data = data
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(Matrix { rows, cols, data })
}

fn parse_shape(header: &str) -> Result<(usize, usize), String> {
    let start = header
        .find("'shape':")
        .and_then(|i| header[i..].find('(').map(|j| i + j + 1))
        .ok_or_else(|| "header has no shape".to_string())?;
    let end = header[start..]
        .find(')')
        .map(|j| start + j)
        .ok_or_else(|| "unterminated shape".to_string())?;

    let dims: Vec<usize> = header[start..end]
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.parse::<usize>().map_err(|_| format!("bad dimension '{}'", d)))
        .collect::<Result<_, _>>()?;

    match dims.as_slice() {
        [rows, cols] => Ok((*rows, *cols)),
        _ => Err(format!("expected a 2-D array, found shape {:?}", dims)),
    }
}
