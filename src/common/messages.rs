//! # Message Protocol
//!
//! Defines the message types exchanged over both coordinator ports:
//! - Worker port: [`Task`] (coordinator → worker) and [`PartialResult`] (worker → coordinator)
//! - Client port: [`CalculationRequest`] (client → coordinator) and
//!   [`CalculationResponse`] (coordinator → client)
//!
//! Messages are serialized to camelCase JSON and sent over TCP with a 4-byte
//! length prefix (see [`Connection`](super::connection::Connection)).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{FrameError, MatrixError};

// ============================================================================
// MATRIX
// ============================================================================

/// Address of one matrix entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub column: usize,
}

impl Cell {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// A square N×N grid of `f64` values with N ≥ 1.
///
/// Stored row-major in a flat buffer. On the wire a matrix is an array of row
/// arrays; decoding rejects empty and ragged grids so every `Matrix` value in
/// the process is known to be square.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Matrix {
    size: usize,
    values: Vec<f64>,
}

impl Matrix {
    /// Build a matrix from its rows.
    ///
    /// # Returns
    /// - `Err(MatrixError::Empty)` for a grid with no rows
    /// - `Err(MatrixError::NotSquare)` when any row length differs from the row count
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let size = rows.len();
        if size == 0 {
            return Err(MatrixError::Empty);
        }

        let mut values = Vec::with_capacity(size * size);
        for (row, entries) in rows.into_iter().enumerate() {
            if entries.len() != size {
                return Err(MatrixError::NotSquare {
                    row,
                    len: entries.len(),
                    expected: size,
                });
            }
            values.extend(entries);
        }

        Ok(Self { size, values })
    }

    /// A matrix of the same size as `other` with every entry set to zero.
    pub fn zeros_like(other: &Matrix) -> Self {
        Self {
            size: other.size,
            values: vec![0.0; other.values.len()],
        }
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of entries, N².
    pub fn cell_count(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.size && cell.column < self.size
    }

    pub fn get(&self, cell: Cell) -> Option<f64> {
        if self.contains(cell) {
            Some(self.values[cell.row * self.size + cell.column])
        } else {
            None
        }
    }

    /// Overwrite one entry. Returns `false` (and changes nothing) if `cell` is
    /// out of bounds.
    pub fn set(&mut self, cell: Cell, value: f64) -> bool {
        if !self.contains(cell) {
            return false;
        }
        self.values[cell.row * self.size + cell.column] = value;
        true
    }

    /// All cell addresses in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let size = self.size;
        (0..size).flat_map(move |row| (0..size).map(move |column| Cell::new(row, column)))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.size)
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(<[f64]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
    type Error = MatrixError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Matrix::from_rows(rows)
    }
}

impl From<Matrix> for Vec<Vec<f64>> {
    fn from(matrix: Matrix) -> Self {
        matrix.to_rows()
    }
}

// ============================================================================
// WIRE MESSAGES
// ============================================================================

/// One unit of work: compute the cofactor at (`row`, `column`) of `matrix`.
///
/// The matrix is shared between all tasks of a round, so building N² tasks
/// does not copy it N² times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub row: usize,
    pub column: usize,
    pub matrix: Arc<Matrix>,
}

impl Task {
    pub fn new(cell: Cell, matrix: Arc<Matrix>) -> Self {
        Self {
            row: cell.row,
            column: cell.column,
            matrix,
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::new(self.row, self.column)
    }
}

/// A worker's answer for one [`Task`].
///
/// `cofactor` is `None` (JSON `null` or absent) when the value is not a finite
/// number, e.g. the determinant overflowed. That is a valid answer, not a
/// protocol fault: the cell stays unset and the worker keeps its place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResult {
    pub row: usize,
    pub column: usize,
    #[serde(default)]
    pub cofactor: Option<f64>,
}

impl PartialResult {
    /// Answer for `cell`; a non-finite `value` becomes `None`.
    pub fn new(cell: Cell, value: f64) -> Self {
        Self {
            row: cell.row,
            column: cell.column,
            cofactor: value.is_finite().then_some(value),
        }
    }

    pub fn cell(&self) -> Cell {
        Cell::new(self.row, self.column)
    }
}

/// A client's submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    pub matrix: Matrix,
}

/// The assembled cofactor matrix plus the wall-clock time spent distributing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResponse {
    pub matrix: Matrix,
    pub elapsed_ms: u64,
}

/// A value that travels inside a frame as JSON.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Serialize to JSON bytes for transmission.
    fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from JSON bytes received from the network.
    fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl WireMessage for Task {}
impl WireMessage for PartialResult {}
impl WireMessage for CalculationRequest {}
impl WireMessage for CalculationResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_rejects_empty_and_ragged() {
        assert_eq!(Matrix::from_rows(vec![]), Err(MatrixError::Empty));
        assert_eq!(
            Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]),
            Err(MatrixError::NotSquare {
                row: 1,
                len: 1,
                expected: 2
            })
        );
        assert!(Matrix::from_rows(vec![vec![1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_cells_are_row_major() {
        let matrix = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let cells: Vec<Cell> = matrix.cells().collect();
        assert_eq!(
            cells,
            vec![Cell::new(0, 0), Cell::new(0, 1), Cell::new(1, 0), Cell::new(1, 1)]
        );
        assert_eq!(matrix.get(Cell::new(1, 0)), Some(3.0));
        assert_eq!(matrix.get(Cell::new(2, 0)), None);
    }

    #[test]
    fn test_set_out_of_bounds_is_ignored() {
        let source = Matrix::from_rows(vec![vec![5.0]]).unwrap();
        let mut result = Matrix::zeros_like(&source);
        assert!(!result.set(Cell::new(0, 1), 9.0));
        assert!(result.set(Cell::new(0, 0), 9.0));
        assert_eq!(result.to_rows(), vec![vec![9.0]]);
    }

    #[test]
    fn test_wire_field_names() {
        let response = CalculationResponse {
            matrix: Matrix::from_rows(vec![vec![1.5]]).unwrap(),
            elapsed_ms: 12,
        };
        let json = String::from_utf8(response.to_bytes().unwrap()).unwrap();
        assert_eq!(json, r#"{"matrix":[[1.5]],"elapsedMs":12}"#);

        let result = PartialResult::from_bytes(br#"{"row":1,"column":0,"cofactor":-2.0}"#).unwrap();
        assert_eq!(result.cell(), Cell::new(1, 0));
        assert_eq!(result.cofactor, Some(-2.0));
    }

    #[test]
    fn test_non_finite_cofactor_is_null() {
        let overflow = PartialResult::new(Cell::new(0, 0), f64::INFINITY);
        assert_eq!(overflow.cofactor, None);
        let json = String::from_utf8(overflow.to_bytes().unwrap()).unwrap();
        assert_eq!(json, r#"{"row":0,"column":0,"cofactor":null}"#);

        let nan = PartialResult::new(Cell::new(1, 1), f64::NAN);
        assert_eq!(nan.cofactor, None);

        let absent = PartialResult::from_bytes(br#"{"row":2,"column":1}"#).unwrap();
        assert_eq!(absent.cofactor, None);
        assert_eq!(absent.cell(), Cell::new(2, 1));
    }

    #[test]
    fn test_request_with_empty_matrix_is_format_error() {
        let err = CalculationRequest::from_bytes(br#"{"matrix":[]}"#).unwrap_err();
        assert!(matches!(err, FrameError::Format(_)));
    }
}
