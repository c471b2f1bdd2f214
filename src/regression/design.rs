//! Regression design with fixed harmonic, holiday and outlier blocks.

use super::basis::{harmonic_basis, HarmonicOrder};
use crate::core::HolidayMatrix;
use crate::error::{Result, WsaError};
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use std::ops::Range;

/// Column block of a [`DesignMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Harmonic,
    Holiday,
    Outlier,
}

/// Design matrix `[harmonic | holiday | outlier]`.
///
/// Column order is fixed so components can be reconstructed by slicing
/// block offsets. Outlier columns are unit indicators, one per outlier row.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    matrix: DMatrix<f64>,
    labels: Vec<String>,
    order: HarmonicOrder,
    holiday_cols: usize,
    outlier_rows: Vec<usize>,
}

impl DesignMatrix {
    /// Assemble the design for `dates`.
    ///
    /// `outlier_rows` are row indices of additive outliers; they must be
    /// in range and distinct.
    pub fn build(
        dates: &[NaiveDate],
        order: HarmonicOrder,
        holidays: Option<&HolidayMatrix>,
        outlier_rows: &[usize],
    ) -> Result<Self> {
        let n = dates.len();
        if let Some(h) = holidays {
            h.check_rows(n)?;
        }
        for (i, &row) in outlier_rows.iter().enumerate() {
            if row >= n {
                return Err(WsaError::InvalidParameter(format!(
                    "outlier row {} outside series of length {}",
                    row, n
                )));
            }
            if outlier_rows[..i].contains(&row) {
                return Err(WsaError::InvalidParameter(format!(
                    "outlier at {} listed twice",
                    dates[row]
                )));
            }
        }

        let basis = harmonic_basis(order, dates);
        let holiday_cols = holidays.map(|h| h.ncols()).unwrap_or(0);
        let harmonic_cols = basis.matrix.ncols();
        let total = harmonic_cols + holiday_cols + outlier_rows.len();

        let mut matrix = DMatrix::zeros(n, total);
        matrix
            .columns_mut(0, harmonic_cols)
            .copy_from(&basis.matrix);

        let mut labels = basis.labels;
        if let Some(h) = holidays {
            for (j, column) in h.columns().iter().enumerate() {
                for (row, &v) in column.iter().enumerate() {
                    matrix[(row, harmonic_cols + j)] = v;
                }
            }
            labels.extend(h.labels().iter().cloned());
        }

        let offset = harmonic_cols + holiday_cols;
        for (j, &row) in outlier_rows.iter().enumerate() {
            matrix[(row, offset + j)] = 1.0;
            labels.push(outlier_label(dates[row]));
        }

        Ok(Self {
            matrix,
            labels,
            order,
            holiday_cols,
            outlier_rows: outlier_rows.to_vec(),
        })
    }

    /// A new design with one more outlier indicator appended.
    pub fn with_outlier(&self, row: usize, date: NaiveDate) -> Result<Self> {
        let n = self.nrows();
        if row >= n {
            return Err(WsaError::InvalidParameter(format!(
                "outlier row {} outside series of length {}",
                row, n
            )));
        }
        if self.outlier_rows.contains(&row) {
            return Err(WsaError::InvalidParameter(format!(
                "outlier at {} listed twice",
                date
            )));
        }

        let p = self.ncols();
        let mut matrix = self.matrix.clone().insert_column(p, 0.0);
        matrix[(row, p)] = 1.0;

        let mut labels = self.labels.clone();
        labels.push(outlier_label(date));
        let mut outlier_rows = self.outlier_rows.clone();
        outlier_rows.push(row);

        Ok(Self {
            matrix,
            labels,
            order: self.order,
            holiday_cols: self.holiday_cols,
            outlier_rows,
        })
    }

    /// A new design without the outlier indicator at block position `index`.
    pub fn without_outlier(&self, index: usize) -> Self {
        let col = self.block(Block::Outlier).start + index;
        let matrix = self.matrix.clone().remove_column(col);
        let mut labels = self.labels.clone();
        labels.remove(col);
        let mut outlier_rows = self.outlier_rows.clone();
        outlier_rows.remove(index);

        Self {
            matrix,
            labels,
            order: self.order,
            holiday_cols: self.holiday_cols,
            outlier_rows,
        }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn order(&self) -> HarmonicOrder {
        self.order
    }

    pub fn outlier_rows(&self) -> &[usize] {
        &self.outlier_rows
    }

    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn has_holidays(&self) -> bool {
        self.holiday_cols > 0
    }

    pub fn has_outliers(&self) -> bool {
        !self.outlier_rows.is_empty()
    }

    /// Column range of a block.
    pub fn block(&self, block: Block) -> Range<usize> {
        let harmonic = self.order.columns();
        let holiday_end = harmonic + self.holiday_cols;
        match block {
            Block::Harmonic => 0..harmonic,
            Block::Holiday => harmonic..holiday_end,
            Block::Outlier => holiday_end..holiday_end + self.outlier_rows.len(),
        }
    }

    /// Contribution of one block at `row` for the given coefficients.
    pub fn block_value(&self, block: Block, coefficients: &DVector<f64>, row: usize) -> f64 {
        self.block(block)
            .map(|col| self.matrix[(row, col)] * coefficients[col])
            .sum()
    }
}

fn outlier_label(date: NaiveDate) -> String {
    format!("AO{}", date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn weekly_dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 5).unwrap();
        (0..n).map(|i| start + Duration::days(7 * i as i64)).collect()
    }

    fn holidays(n: usize) -> HolidayMatrix {
        let col: Vec<f64> = (0..n).map(|i| if i % 10 == 0 { 1.0 } else { 0.0 }).collect();
        HolidayMatrix::new(vec!["easter".into()], vec![col]).unwrap()
    }

    #[test]
    fn blocks_are_laid_out_in_order() {
        let dates = weekly_dates(30);
        let h = holidays(30);
        let design =
            DesignMatrix::build(&dates, HarmonicOrder::new(1, 1), Some(&h), &[3, 7]).unwrap();

        assert_eq!(design.ncols(), 4 + 1 + 2);
        assert_eq!(design.block(Block::Harmonic), 0..4);
        assert_eq!(design.block(Block::Holiday), 4..5);
        assert_eq!(design.block(Block::Outlier), 5..7);
        assert_eq!(design.labels()[4], "easter");
        assert_eq!(design.labels()[5], "AO2020-01-26");
        assert_eq!(design.matrix()[(3, 5)], 1.0);
        assert_eq!(design.matrix()[(7, 6)], 1.0);
        assert_eq!(design.matrix().column(5).sum(), 1.0);
    }

    #[test]
    fn outlier_snapshots_do_not_mutate_original() {
        let dates = weekly_dates(20);
        let base = DesignMatrix::build(&dates, HarmonicOrder::new(1, 0), None, &[]).unwrap();
        let grown = base.with_outlier(4, dates[4]).unwrap();

        assert_eq!(base.ncols(), 2);
        assert_eq!(grown.ncols(), 3);
        assert_eq!(grown.outlier_rows(), &[4]);
        assert_eq!(grown.matrix()[(4, 2)], 1.0);

        let shrunk = grown.without_outlier(0);
        assert_eq!(shrunk.ncols(), 2);
        assert!(!shrunk.has_outliers());
    }

    #[test]
    fn rejects_duplicate_outliers() {
        let dates = weekly_dates(10);
        assert!(DesignMatrix::build(&dates, HarmonicOrder::NONE, None, &[2, 2]).is_err());
        let design = DesignMatrix::build(&dates, HarmonicOrder::NONE, None, &[2]).unwrap();
        assert!(design.with_outlier(2, dates[2]).is_err());
        assert!(design.with_outlier(10, dates[9]).is_err());
    }

    #[test]
    fn rejects_misaligned_holidays() {
        let dates = weekly_dates(10);
        let h = holidays(12);
        assert!(matches!(
            DesignMatrix::build(&dates, HarmonicOrder::NONE, Some(&h), &[]),
            Err(WsaError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn block_values_slice_coefficients() {
        let dates = weekly_dates(10);
        let h = holidays(10);
        let design = DesignMatrix::build(&dates, HarmonicOrder::new(1, 0), Some(&h), &[5]).unwrap();
        let beta = DVector::from_vec(vec![2.0, -1.0, 3.0, 7.0]);

        let m = design.matrix();
        let harmonic = 2.0 * m[(0, 0)] - m[(0, 1)];
        assert_relative_eq!(
            design.block_value(Block::Harmonic, &beta, 0),
            harmonic,
            epsilon = 1e-12
        );
        assert_relative_eq!(design.block_value(Block::Holiday, &beta, 0), 3.0);
        assert_relative_eq!(design.block_value(Block::Outlier, &beta, 5), 7.0);
        assert_relative_eq!(design.block_value(Block::Outlier, &beta, 4), 0.0);
    }
}
