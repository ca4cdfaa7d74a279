//! Nulling-interferometry extensions: transfer matrix, field of view,
//! kernel matrices, modulation series and output tables.

use ndarray::{ArrayD, Axis};
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::extension::{ArrayExt, CpxArrayExt, TableExt};
use crate::header::Header;
use crate::table::{Column, ColumnData, Table};
use crate::value::Value;

/// NI_CATM: the complex amplitude transfer matrix of the combiner, shaped
/// `(n_channels, n_outputs, n_inputs)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NiCatm {
    pub ext: CpxArrayExt,
}

impl NiCatm {
    pub fn new(ext: CpxArrayExt) -> Self {
        NiCatm { ext }
    }

    pub fn matrix(&self) -> &ArrayD<Complex64> {
        &self.ext.array
    }

    /// Check the matrix dimensions against a raw-output table.
    ///
    /// The matrix must be rank 3 and its channel and output counts must
    /// match the shape of the output cells.
    pub fn check_against_iout(&self, iout: &NiIout) -> Result<()> {
        let shape = self.ext.array.shape();
        if shape.len() != 3 {
            return Err(Error::Structural(format!(
                "NI_CATM must be rank 3, found shape {shape:?}"
            )));
        }
        let cell = iout.cell_shape()?;
        if cell != [shape[0], shape[1]] {
            return Err(Error::Structural(format!(
                "NI_CATM shape {:?} does not match NI_IOUT cells {:?}",
                shape, cell
            )));
        }
        Ok(())
    }
}

/// NI_FOV: chromatic field-of-view response.
#[derive(Debug, Clone, PartialEq)]
pub struct NiFov {
    pub ext: TableExt,
}

impl NiFov {
    pub fn new(ext: TableExt) -> Self {
        NiFov { ext }
    }

    fn default_header() -> Header {
        let mut header = Header::new();
        header.set(
            "FOV_MODE",
            Value::String(String::from("diameter_gaussian_radial")),
        );
        header.set("FOV_TELDIAM", Value::Float(8.0));
        header.set("FOV_TELDIAM_UNIT", Value::String(String::from("m")));
        header
    }

    /// Build a basic Gaussian-radial response: one row per frame with
    /// zeroed pointing offsets for each spectral channel.
    pub fn from_scratch(n_channels: usize, n_frames: usize) -> Result<Self> {
        let mut table = Table::new();
        table.push_column(Column::scalar(
            "INDEX",
            ColumnData::Int((0..n_frames as i64).collect()),
        ))?;
        table.push_column(Column::array(
            "offsets",
            vec![n_channels, 2],
            ColumnData::Float(vec![0.0; n_frames * n_channels * 2]),
        ))?;
        Ok(NiFov {
            ext: TableExt::new(table, Self::default_header()),
        })
    }

    /// FOV_MODE header value.
    pub fn mode(&self) -> Option<&str> {
        self.ext.header.str_value("FOV_MODE")
    }

    pub fn telescope_diameter(&self) -> Option<f64> {
        self.ext.header.float_value("FOV_TELDIAM")
    }

    /// Pointing offsets shaped `(n_frames, n_channels, 2)`.
    pub fn all_offsets(&self) -> Result<ArrayD<f64>> {
        self.ext.table.array_column_f64("offsets")
    }

    /// Pointing offsets for one frame, shaped `(n_channels, 2)`.
    pub fn offsets(&self, frame: usize) -> Result<ArrayD<f64>> {
        let all = self.all_offsets()?;
        if frame >= all.shape()[0] {
            return Err(Error::Structural(format!(
                "frame {frame} out of range, table has {} rows",
                all.shape()[0]
            )));
        }
        Ok(all.index_axis(Axis(0), frame).to_owned())
    }
}

/// NI_KMAT: the real kernel post-processing matrix, shaped
/// `(n_kernel_outputs, n_outputs)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NiKmat {
    pub ext: ArrayExt,
}

impl NiKmat {
    pub fn new(ext: ArrayExt) -> Self {
        NiKmat { ext }
    }

    pub fn matrix(&self) -> &ArrayD<f64> {
        &self.ext.array
    }
}

/// NI_KCOV: covariance of the kernel-processed outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct NiKcov {
    pub ext: ArrayExt,
}

impl NiKcov {
    pub fn new(ext: ArrayExt) -> Self {
        NiKcov { ext }
    }

    pub fn kcov(&self) -> &ArrayD<f64> {
        &self.ext.array
    }
}

/// NI_MOD: per-frame modulation phasors and projected array geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct NiMod {
    pub ext: TableExt,
}

impl NiMod {
    pub fn new(ext: TableExt) -> Self {
        NiMod { ext }
    }

    /// Header carrying the unit conventions of the MOD_PHAS and ARRCOL
    /// columns.
    pub fn default_header() -> Header {
        let mut header = Header::new();
        header.set("MOD_PHAS_UNITS", Value::String(String::from("rad")));
        header.set("ARRCOL_UNITS", Value::String(String::from("m^2")));
        header
    }

    /// Number of observation frames.
    pub fn n_series(&self) -> usize {
        self.ext.table.nrows()
    }

    pub fn app_index(&self) -> Result<Vec<i64>> {
        self.ext.table.i64_column("APP_INDEX")
    }

    pub fn target_ids(&self) -> Result<Vec<i64>> {
        self.ext.table.i64_column("TARGET_ID")
    }

    pub fn times(&self) -> Result<Vec<f64>> {
        self.ext.table.f64_column("TIME")
    }

    pub fn mjds(&self) -> Result<Vec<f64>> {
        self.ext.table.f64_column("MJD")
    }

    /// Per-frame integration times, s.
    pub fn int_times(&self) -> Result<Vec<f64>> {
        self.ext.table.f64_column("INT_TIME")
    }

    /// Modulation phasors shaped `(n_frames, n_channels, n_apertures)`.
    pub fn all_phasors(&self) -> Result<ArrayD<Complex64>> {
        self.ext.table.array_column_complex("MOD_PHAS")
    }

    /// Projected aperture positions shaped `(n_frames, n_apertures, 2)`.
    pub fn appxy(&self) -> Result<ArrayD<f64>> {
        self.ext.table.array_column_f64("APPXY")
    }

    /// Collecting areas shaped `(n_frames, n_apertures)`.
    pub fn arrcol(&self) -> Result<ArrayD<f64>> {
        self.ext.table.array_column_f64("ARRCOL")
    }

    pub fn fov_index(&self) -> Result<ArrayD<f64>> {
        self.ext.table.array_column_f64("FOV_INDEX")
    }
}

/// Flux values from an output table's `value` column, shaped
/// `(n_frames, n_channels, n_outputs)`.
fn output_values(ext: &TableExt) -> Result<ArrayD<f64>> {
    ext.table.array_column_f64("value")
}

fn output_cell_shape(ext: &TableExt) -> Result<Vec<usize>> {
    let col = ext
        .table
        .column("value")
        .ok_or_else(|| Error::MissingColumn(String::from("value")))?;
    Ok(col.cell_shape.clone())
}

/// NI_IOUT: raw detector outputs per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NiIout {
    pub ext: TableExt,
}

impl NiIout {
    pub fn new(ext: TableExt) -> Self {
        NiIout { ext }
    }

    /// Header carrying the flux unit of the `value` column.
    pub fn default_header() -> Header {
        let mut header = Header::new();
        header.set("UNITS", Value::String(String::from("ADU")));
        header
    }

    pub fn unit(&self) -> Option<&str> {
        self.ext.header.str_value("UNITS")
    }

    pub fn iout(&self) -> Result<ArrayD<f64>> {
        output_values(&self.ext)
    }

    pub(crate) fn cell_shape(&self) -> Result<Vec<usize>> {
        output_cell_shape(&self.ext)
    }
}

/// NI_KIOUT: kernel-processed outputs per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NiKiout {
    pub ext: TableExt,
}

impl NiKiout {
    pub fn new(ext: TableExt) -> Self {
        NiKiout { ext }
    }

    pub fn unit(&self) -> Option<&str> {
        self.ext.header.str_value("UNITS")
    }

    pub fn kiout(&self) -> Result<ArrayD<f64>> {
        output_values(&self.ext)
    }
}

/// Build an output table holding `values` shaped
/// `(n_frames, n_channels, n_outputs)`.
pub fn output_table(values: &ArrayD<f64>) -> Result<Table> {
    let shape = values.shape();
    if shape.len() != 3 {
        return Err(Error::Structural(format!(
            "output values must be rank 3, found shape {shape:?}"
        )));
    }
    let mut table = Table::new();
    table.push_column(Column::array(
        "value",
        vec![shape[1], shape[2]],
        ColumnData::Float(values.iter().copied().collect()),
    ))?;
    Ok(table)
}
