//! Reader and writer for NIFITS, the FITS-based data exchange format for
//! nulling interferometry.
//!
//! A NIFITS file carries up to ten extensions: the OIFITS-heritage static
//! instrument description (array geometry, wavelength grid, target list),
//! the nulling-specific static description (complex amplitude transfer
//! matrix, field-of-view response) and the per-observation dynamic data
//! (modulation series, raw and kernel outputs, kernel matrix and output
//! covariance).
//!
//! The entry point is [`Nifits`]:
//!
//! ```no_run
//! use nifits::{Nifits, WriteOptions, WriteSelection};
//!
//! # fn main() -> nifits::Result<()> {
//! let (mut file, report) = Nifits::open("observation.nifits")?;
//! for kind in report.missing() {
//!     eprintln!("absent: {}", kind.extname());
//! }
//! if let Some(wl) = &file.oi_wavelength {
//!     println!("{} spectral channels", wl.n_channels());
//! }
//! file.write(
//!     "instrument.nifits",
//!     WriteSelection::StaticOnly,
//!     &WriteOptions::default(),
//!     true,
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod bintable;
pub mod block;
pub mod container;
pub mod endian;
pub mod error;
pub mod extension;
pub mod hdulist;
pub mod header;
pub mod image;
pub mod ni;
pub mod oifits;
pub mod station;
pub mod table;
pub mod value;

pub use container::{
    KindStatus, LoadReport, Nifits, WriteOptions, WriteReport, WriteSelection, WriteStatus,
};
pub use error::{Error, Result};
pub use extension::{
    ArrayExt, CpxArrayExt, ExtensionKind, Partition, PayloadVariant, TableExt,
};
pub use hdulist::{Hdu, Payload};
pub use header::{Card, Header};
pub use ni::{NiCatm, NiFov, NiIout, NiKcov, NiKiout, NiKmat, NiMod};
pub use oifits::{OiArray, OiTarget, OiWavelength, Target, C_M_S};
pub use station::OiStation;
pub use table::{CellValue, Column, ColumnData, Table};
pub use value::Value;
