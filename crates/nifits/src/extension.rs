//! Extension kind registry and typed payload wrappers.
//!
//! Each NIFITS extension kind maps to a fixed EXTNAME, a payload variant
//! (table, real array or complex array) and a partition (static
//! instrument description versus per-frame dynamic data). The wrappers
//! decode an [`Hdu`] into a typed payload and re-encode it with the
//! structural header cards regenerated from the payload, carrying every
//! other card through unchanged.

use ndarray::{ArrayD, Axis, IxDyn};
use num_complex::Complex64;

use crate::bintable;
use crate::error::{Error, Result};
use crate::hdulist::{Hdu, Payload};
use crate::header::{Card, Header};
use crate::image;
use crate::table::Table;
use crate::value::Value;

/// Payload layout of an extension kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadVariant {
    Table,
    Array,
    ComplexArray,
}

/// Whether an extension belongs to the static instrument description or
/// the per-observation dynamic data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Static,
    Dynamic,
}

/// The ten extension kinds of a nulling-interferometry data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    /// Collector geometry (OI_ARRAY).
    ArrayGeometry,
    /// Spectral channel definitions (OI_WAVELENGTH).
    WavelengthGrid,
    /// Complex amplitude transfer matrix (NI_CATM).
    TransferMatrix,
    /// Field-of-view chromatic response (NI_FOV).
    FieldOfView,
    /// Kernel post-processing matrix (NI_KMAT).
    KernelMatrix,
    /// Per-frame modulation phasors and projected geometry (NI_MOD).
    ModulationSeries,
    /// Raw detector outputs (NI_IOUT).
    RawOutput,
    /// Kernel-processed outputs (NI_KIOUT).
    KernelOutput,
    /// Covariance of the processed outputs (NI_KCOV).
    OutputCovariance,
    /// Observed target catalogue (OI_TARGET).
    TargetList,
}

impl ExtensionKind {
    /// All kinds, in canonical file order.
    pub const ALL: [ExtensionKind; 10] = [
        ExtensionKind::ArrayGeometry,
        ExtensionKind::WavelengthGrid,
        ExtensionKind::TransferMatrix,
        ExtensionKind::FieldOfView,
        ExtensionKind::KernelMatrix,
        ExtensionKind::ModulationSeries,
        ExtensionKind::RawOutput,
        ExtensionKind::KernelOutput,
        ExtensionKind::OutputCovariance,
        ExtensionKind::TargetList,
    ];

    /// EXTNAME value carried by this kind.
    pub fn extname(&self) -> &'static str {
        match self {
            ExtensionKind::ArrayGeometry => "OI_ARRAY",
            ExtensionKind::WavelengthGrid => "OI_WAVELENGTH",
            ExtensionKind::TransferMatrix => "NI_CATM",
            ExtensionKind::FieldOfView => "NI_FOV",
            ExtensionKind::KernelMatrix => "NI_KMAT",
            ExtensionKind::ModulationSeries => "NI_MOD",
            ExtensionKind::RawOutput => "NI_IOUT",
            ExtensionKind::KernelOutput => "NI_KIOUT",
            ExtensionKind::OutputCovariance => "NI_KCOV",
            ExtensionKind::TargetList => "OI_TARGET",
        }
    }

    pub fn variant(&self) -> PayloadVariant {
        match self {
            ExtensionKind::TransferMatrix => PayloadVariant::ComplexArray,
            ExtensionKind::KernelMatrix | ExtensionKind::OutputCovariance => {
                PayloadVariant::Array
            }
            _ => PayloadVariant::Table,
        }
    }

    pub fn partition(&self) -> Partition {
        match self {
            ExtensionKind::ArrayGeometry
            | ExtensionKind::WavelengthGrid
            | ExtensionKind::TransferMatrix
            | ExtensionKind::FieldOfView
            | ExtensionKind::TargetList => Partition::Static,
            ExtensionKind::KernelMatrix
            | ExtensionKind::ModulationSeries
            | ExtensionKind::RawOutput
            | ExtensionKind::KernelOutput
            | ExtensionKind::OutputCovariance => Partition::Dynamic,
        }
    }

    /// Kind for an EXTNAME value, if recognized.
    pub fn from_extname(extname: &str) -> Option<ExtensionKind> {
        ExtensionKind::ALL
            .iter()
            .copied()
            .find(|k| k.extname() == extname)
    }
}

/// True for cards that are regenerated from the payload on encode.
fn is_structural_card(keyword: &str) -> bool {
    matches!(
        keyword,
        "SIMPLE" | "EXTEND" | "XTENSION" | "BITPIX" | "NAXIS" | "GCOUNT" | "PCOUNT"
            | "TFIELDS" | "EXTNAME"
    ) || is_indexed(keyword, "NAXIS")
        || is_indexed(keyword, "TFORM")
        || is_indexed(keyword, "TTYPE")
        || is_indexed(keyword, "TDIM")
}

fn is_indexed(keyword: &str, prefix: &str) -> bool {
    keyword
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Rebuild a header from regenerated structural cards, the EXTNAME card
/// and the carried-through remainder of the previous header.
fn resync_header(structural: Vec<Card>, extname: &str, previous: &Header) -> Header {
    let mut cards = structural;
    cards.push(Card::new("EXTNAME", Value::String(extname.to_string())));
    for card in previous.cards() {
        if !is_structural_card(&card.keyword) {
            cards.push(card.clone());
        }
    }
    Header::from_cards(cards)
}

/// A table-valued extension: decoded rows plus the non-structural header.
#[derive(Debug, Clone, PartialEq)]
pub struct TableExt {
    pub table: Table,
    pub header: Header,
}

impl TableExt {
    pub fn new(table: Table, header: Header) -> Self {
        TableExt { table, header }
    }

    pub fn from_hdu(hdu: &Hdu) -> Result<Self> {
        match &hdu.payload {
            Payload::Table(table) => Ok(TableExt {
                table: table.clone(),
                header: hdu.header.clone(),
            }),
            _ => Err(Error::Structural(format!(
                "{}: expected a binary table payload",
                hdu.extname().unwrap_or("?")
            ))),
        }
    }

    /// Encode to an HDU, regenerating structural cards from the table.
    /// The stored header is replaced with the regenerated one.
    pub fn to_hdu(&mut self, extname: &str) -> Result<Hdu> {
        let header = resync_header(
            bintable::build_table_cards(&self.table),
            extname,
            &self.header,
        );
        self.header = header.clone();
        Ok(Hdu {
            header,
            payload: Payload::Table(self.table.clone()),
        })
    }
}

/// A real-array extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExt {
    pub array: ArrayD<f64>,
    pub header: Header,
}

impl ArrayExt {
    pub fn new(array: ArrayD<f64>, header: Header) -> Self {
        ArrayExt { array, header }
    }

    pub fn from_hdu(hdu: &Hdu) -> Result<Self> {
        match &hdu.payload {
            Payload::Array(array) => Ok(ArrayExt {
                array: array.clone(),
                header: hdu.header.clone(),
            }),
            _ => Err(Error::Structural(format!(
                "{}: expected an image payload",
                hdu.extname().unwrap_or("?")
            ))),
        }
    }

    pub fn to_hdu(&mut self, extname: &str) -> Result<Hdu> {
        let header = resync_header(
            image::build_array_cards(self.array.shape()),
            extname,
            &self.header,
        );
        self.header = header.clone();
        Ok(Hdu {
            header,
            payload: Payload::Array(self.array.clone()),
        })
    }
}

/// A complex-array extension.
///
/// On disk, a complex array of shape `S` is stored as a real array of shape
/// `[2] + S` where plane 0 holds the real parts and plane 1 the imaginary
/// parts.
#[derive(Debug, Clone, PartialEq)]
pub struct CpxArrayExt {
    pub array: ArrayD<Complex64>,
    pub header: Header,
}

impl CpxArrayExt {
    pub fn new(array: ArrayD<Complex64>, header: Header) -> Self {
        CpxArrayExt { array, header }
    }

    pub fn from_hdu(hdu: &Hdu) -> Result<Self> {
        let real = match &hdu.payload {
            Payload::Array(array) => array,
            _ => {
                return Err(Error::Structural(format!(
                    "{}: expected an image payload",
                    hdu.extname().unwrap_or("?")
                )))
            }
        };

        if real.ndim() < 1 || real.shape()[0] != 2 {
            return Err(Error::Structural(format!(
                "{}: complex storage requires a leading axis of length 2, found shape {:?}",
                hdu.extname().unwrap_or("?"),
                real.shape()
            )));
        }

        let re = real.index_axis(Axis(0), 0);
        let im = real.index_axis(Axis(0), 1);
        let values: Vec<Complex64> = re
            .iter()
            .zip(im.iter())
            .map(|(&r, &i)| Complex64::new(r, i))
            .collect();
        let array = ArrayD::from_shape_vec(IxDyn(re.shape()), values)
            .map_err(|e| Error::Structural(format!("complex array shape: {e}")))?;

        Ok(CpxArrayExt {
            array,
            header: hdu.header.clone(),
        })
    }

    pub fn to_hdu(&mut self, extname: &str) -> Result<Hdu> {
        let mut shape = vec![2];
        shape.extend_from_slice(self.array.shape());

        let mut values = Vec::with_capacity(2 * self.array.len());
        values.extend(self.array.iter().map(|z| z.re));
        values.extend(self.array.iter().map(|z| z.im));
        let real = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| Error::Structural(format!("complex array shape: {e}")))?;

        let header = resync_header(image::build_array_cards(&shape), extname, &self.header);
        self.header = header.clone();
        Ok(Hdu {
            header,
            payload: Payload::Array(real),
        })
    }
}
