use crate::common_io::{read_lines_of_types, write_lines, Delimiter, ReadLinesOut};
use crate::traits::*;
pub use nalgebra::{DMatrix, DVector};

use std::fmt::Display;
use std::str::FromStr;

fn rows_to_dmatrix<T>(file: &str, data: ReadLinesOut<T>) -> anyhow::Result<DMatrix<T>>
where
    T: nalgebra::Scalar,
{
    let data = data.lines;

    if data.is_empty() {
        return Err(anyhow::anyhow!("No data in file: {}", file));
    }

    let ncols = data[0].len();
    let nrows = data.len();

    if let Some((i, _)) = data.iter().enumerate().find(|(_, x)| x.len() != ncols) {
        return Err(anyhow::anyhow!(
            "{}: data line {} has {} fields, expected {}",
            file,
            i + 1,
            data[i].len(),
            ncols
        ));
    }

    let data = data.into_iter().flatten().collect::<Vec<_>>();
    Ok(DMatrix::<T>::from_row_iterator(nrows, ncols, data))
}

impl<T> IoOps for DMatrix<T>
where
    T: nalgebra::Scalar + Send + FromStr + Display + Copy,
    <T as FromStr>::Err: Display,
{
    type Scalar = T;
    type Mat = Self;

    fn read_file_delim(
        tsv_file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat> {
        let hdr_line = match skip {
            Some(skip) => skip as i64,
            None => -1, // no skipping
        };

        let data = read_lines_of_types::<T>(tsv_file, delim, hdr_line)?;
        rows_to_dmatrix(tsv_file, data)
    }

    fn read_file_delim_with_header(
        file: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<(Vec<Box<str>>, Self::Mat)> {
        let data = read_lines_of_types::<T>(file, delim, 0)?;
        let header = data.header.clone();
        let mat = rows_to_dmatrix(file, data)?;

        if header.len() != mat.ncols() {
            return Err(anyhow::anyhow!(
                "{}: {} column names for {} columns",
                file,
                header.len(),
                mat.ncols()
            ));
        }

        Ok((header, mat))
    }

    fn write_file_delim(&self, tsv_file: &str, delim: &str) -> anyhow::Result<()> {
        write_lines(&format_rows(self, delim), tsv_file)?;
        Ok(())
    }

    fn write_file_delim_with_header(
        &self,
        file: &str,
        header: &[Box<str>],
        delim: &str,
    ) -> anyhow::Result<()> {
        if header.len() != self.ncols() {
            return Err(anyhow::anyhow!(
                "{}: {} column names for {} columns",
                file,
                header.len(),
                self.ncols()
            ));
        }

        let mut lines = Vec::with_capacity(self.nrows() + 1);
        lines.push(header.join(delim).into_boxed_str());
        lines.extend(format_rows(self, delim));

        write_lines(&lines, file)?;
        Ok(())
    }
}

fn format_rows<T>(mat: &DMatrix<T>, delim: &str) -> Vec<Box<str>>
where
    T: nalgebra::Scalar + Display,
{
    // par_iter() or par_bridge() will
    // mess up the order of the rows
    mat.row_iter()
        .map(|row| {
            row.iter()
                .map(|x| format!("{}", x))
                .collect::<Vec<String>>()
                .join(delim)
                .into_boxed_str()
        })
        .collect()
}
