//! Cofactor arithmetic used by the reference worker.

use crate::common::messages::{Cell, Matrix};

/// `(-1)^(row+column) * det(minor(row, column))`.
///
/// The minor of a 1×1 matrix is empty and has determinant 1.
pub fn cofactor(matrix: &Matrix, cell: Cell) -> f64 {
    let minor: Vec<Vec<f64>> = matrix
        .rows()
        .enumerate()
        .filter(|(row, _)| *row != cell.row)
        .map(|(_, values)| {
            values
                .iter()
                .enumerate()
                .filter(|(column, _)| *column != cell.column)
                .map(|(_, value)| *value)
                .collect()
        })
        .collect();

    let sign = if (cell.row + cell.column) % 2 == 0 {
        1.0
    } else {
        -1.0
    };
    sign * determinant(minor)
}

/// Determinant by Gaussian elimination with partial pivoting.
pub fn determinant(mut rows: Vec<Vec<f64>>) -> f64 {
    let n = rows.len();
    let mut det = 1.0;

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| rows[a][col].abs().total_cmp(&rows[b][col].abs()))
            .unwrap_or(col);
        if rows[pivot][col] == 0.0 {
            return 0.0;
        }
        if pivot != col {
            rows.swap(pivot, col);
            det = -det;
        }

        let pivot_row = rows[col].clone();
        let pivot_value = pivot_row[col];
        det *= pivot_value;

        for row in rows.iter_mut().skip(col + 1) {
            let factor = row[col] / pivot_value;
            if factor == 0.0 {
                continue;
            }
            for (value, pivot_entry) in row.iter_mut().zip(&pivot_row).skip(col) {
                *value -= factor * pivot_entry;
            }
        }
    }

    det
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_two_by_two_cofactors() {
        let matrix = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let cofactors: Vec<f64> = matrix.cells().map(|cell| cofactor(&matrix, cell)).collect();
        assert_eq!(cofactors, vec![4.0, -3.0, -2.0, 1.0]);
    }

    #[test]
    fn test_one_by_one_cofactor_is_one() {
        let matrix = Matrix::from_rows(vec![vec![42.0]]).unwrap();
        assert_eq!(cofactor(&matrix, Cell::new(0, 0)), 1.0);
    }

    #[test]
    fn test_determinant_needs_pivoting() {
        // Leading zero forces a row swap
        let det = determinant(vec![
            vec![0.0, 2.0, 1.0],
            vec![1.0, 1.0, 0.0],
            vec![2.0, 0.0, 3.0],
        ]);
        assert!(approx(det, -8.0), "det = {}", det);
    }

    #[test]
    fn test_singular_determinant_is_zero() {
        let det = determinant(vec![vec![1.0, 2.0], vec![2.0, 4.0]]);
        assert!(approx(det, 0.0));
    }
}
