//! The NIFITS container: typed access to all ten extensions, partial-load
//! reporting and partition-aware saving.

use std::path::Path;

use crate::error::{Error, Result};
use crate::extension::{ArrayExt, CpxArrayExt, ExtensionKind, Partition, TableExt};
use crate::hdulist::{self, Hdu, Payload};
use crate::header::{Card, Header};
use crate::ni::{NiCatm, NiFov, NiIout, NiKcov, NiKiout, NiKmat, NiMod};
use crate::oifits::{OiArray, OiTarget, OiWavelength};
use crate::value::Value;

/// Which partition of the container to serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteSelection {
    /// All populated extensions.
    #[default]
    Full,
    /// Only the static instrument description.
    StaticOnly,
    /// Only the per-observation dynamic data.
    DynamicOnly,
}

impl WriteSelection {
    /// True when the selection covers the given kind.
    pub fn includes(&self, kind: ExtensionKind) -> bool {
        match self {
            WriteSelection::Full => true,
            WriteSelection::StaticOnly => kind.partition() == Partition::Static,
            WriteSelection::DynamicOnly => kind.partition() == Partition::Dynamic,
        }
    }
}

/// Options for serialization.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Optional identifier of the static instrument configuration a
    /// dynamic-only file refers to. Accepted for forward compatibility;
    /// not validated.
    pub static_hash: Option<String>,
}

/// Outcome of loading one extension kind.
#[derive(Debug)]
pub enum KindStatus {
    /// The extension was found and decoded.
    Present,
    /// No HDU carried this kind's EXTNAME.
    Missing,
    /// The HDU was found but its payload did not decode.
    Failed(Error),
}

/// Per-kind account of a load. Decoding failures do not abort the load;
/// they are recorded here and the remaining kinds are still read.
#[derive(Debug, Default)]
pub struct LoadReport {
    entries: Vec<(ExtensionKind, KindStatus)>,
}

impl LoadReport {
    pub fn entries(&self) -> &[(ExtensionKind, KindStatus)] {
        &self.entries
    }

    pub fn status(&self, kind: ExtensionKind) -> Option<&KindStatus> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| s)
    }

    pub fn present(&self) -> Vec<ExtensionKind> {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, KindStatus::Present))
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn missing(&self) -> Vec<ExtensionKind> {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, KindStatus::Missing))
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn failed(&self) -> Vec<(ExtensionKind, &Error)> {
        self.entries
            .iter()
            .filter_map(|(k, s)| match s {
                KindStatus::Failed(e) => Some((*k, e)),
                _ => None,
            })
            .collect()
    }

    /// True when every kind decoded.
    pub fn is_complete(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, s)| matches!(s, KindStatus::Present))
    }
}

/// Whether a kind was written to the file or recorded as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Included,
    NotIncluded,
}

/// Per-kind account of a save.
#[derive(Debug, Default)]
pub struct WriteReport {
    entries: Vec<(ExtensionKind, WriteStatus)>,
}

impl WriteReport {
    pub fn entries(&self) -> &[(ExtensionKind, WriteStatus)] {
        &self.entries
    }

    pub fn status(&self, kind: ExtensionKind) -> Option<WriteStatus> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| *s)
    }

    pub fn included(&self) -> Vec<ExtensionKind> {
        self.entries
            .iter()
            .filter(|(_, s)| *s == WriteStatus::Included)
            .map(|(k, _)| *k)
            .collect()
    }
}

/// An in-memory NIFITS file.
///
/// Every extension slot is optional so that partial files (static-only
/// instrument descriptions, dynamic-only observation blocks) round-trip
/// without loss.
#[derive(Debug, Default)]
pub struct Nifits {
    /// Primary header, carried through verbatim apart from the structural
    /// cards and the extension manifest, which are regenerated on save.
    pub header: Header,
    pub oi_array: Option<OiArray>,
    pub oi_wavelength: Option<OiWavelength>,
    pub ni_catm: Option<NiCatm>,
    pub ni_fov: Option<NiFov>,
    pub ni_kmat: Option<NiKmat>,
    pub ni_mod: Option<NiMod>,
    pub ni_iout: Option<NiIout>,
    pub ni_kiout: Option<NiKiout>,
    pub ni_kcov: Option<NiKcov>,
    pub oi_target: Option<OiTarget>,
}

impl Nifits {
    /// Decode a parsed HDU sequence.
    ///
    /// The first HDU provides the primary header. Each kind is looked up
    /// by EXTNAME; kinds that are absent or fail to decode are recorded in
    /// the report and the load continues.
    pub fn from_hdus(hdus: &[Hdu]) -> Result<(Self, LoadReport)> {
        let primary = hdus.first().ok_or(Error::UnexpectedEof)?;
        let mut nifits = Nifits {
            header: primary.header.clone(),
            ..Nifits::default()
        };
        let mut report = LoadReport::default();

        for kind in ExtensionKind::ALL {
            let hdu = hdus[1..]
                .iter()
                .find(|h| h.extname() == Some(kind.extname()));
            let status = match hdu {
                None => {
                    log::warn!("extension {} not found in file", kind.extname());
                    KindStatus::Missing
                }
                Some(hdu) => match nifits.decode_kind(kind, hdu) {
                    Ok(()) => KindStatus::Present,
                    Err(e) => {
                        log::warn!("extension {} failed to decode: {e}", kind.extname());
                        KindStatus::Failed(e)
                    }
                },
            };
            report.entries.push((kind, status));
        }

        Ok((nifits, report))
    }

    fn decode_kind(&mut self, kind: ExtensionKind, hdu: &Hdu) -> Result<()> {
        match kind {
            ExtensionKind::ArrayGeometry => {
                self.oi_array = Some(OiArray::new(TableExt::from_hdu(hdu)?));
            }
            ExtensionKind::WavelengthGrid => {
                self.oi_wavelength = Some(OiWavelength::new(TableExt::from_hdu(hdu)?));
            }
            ExtensionKind::TransferMatrix => {
                self.ni_catm = Some(NiCatm::new(CpxArrayExt::from_hdu(hdu)?));
            }
            ExtensionKind::FieldOfView => {
                self.ni_fov = Some(NiFov::new(TableExt::from_hdu(hdu)?));
            }
            ExtensionKind::KernelMatrix => {
                self.ni_kmat = Some(NiKmat::new(ArrayExt::from_hdu(hdu)?));
            }
            ExtensionKind::ModulationSeries => {
                self.ni_mod = Some(NiMod::new(TableExt::from_hdu(hdu)?));
            }
            ExtensionKind::RawOutput => {
                self.ni_iout = Some(NiIout::new(TableExt::from_hdu(hdu)?));
            }
            ExtensionKind::KernelOutput => {
                self.ni_kiout = Some(NiKiout::new(TableExt::from_hdu(hdu)?));
            }
            ExtensionKind::OutputCovariance => {
                self.ni_kcov = Some(NiKcov::new(ArrayExt::from_hdu(hdu)?));
            }
            ExtensionKind::TargetList => {
                self.oi_target = Some(OiTarget::new(TableExt::from_hdu(hdu)?));
            }
        }
        Ok(())
    }

    /// Parse a complete FITS byte stream.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, LoadReport)> {
        let hdus = hdulist::parse(data)?;
        Self::from_hdus(&hdus)
    }

    /// Read and decode a NIFITS file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<(Self, LoadReport)> {
        let hdus = hdulist::open(path)?;
        Self::from_hdus(&hdus)
    }

    /// True when the slot for the given kind is populated.
    pub fn has(&self, kind: ExtensionKind) -> bool {
        match kind {
            ExtensionKind::ArrayGeometry => self.oi_array.is_some(),
            ExtensionKind::WavelengthGrid => self.oi_wavelength.is_some(),
            ExtensionKind::TransferMatrix => self.ni_catm.is_some(),
            ExtensionKind::FieldOfView => self.ni_fov.is_some(),
            ExtensionKind::KernelMatrix => self.ni_kmat.is_some(),
            ExtensionKind::ModulationSeries => self.ni_mod.is_some(),
            ExtensionKind::RawOutput => self.ni_iout.is_some(),
            ExtensionKind::KernelOutput => self.ni_kiout.is_some(),
            ExtensionKind::OutputCovariance => self.ni_kcov.is_some(),
            ExtensionKind::TargetList => self.oi_target.is_some(),
        }
    }

    fn encode_kind(&mut self, kind: ExtensionKind) -> Result<Option<Hdu>> {
        let extname = kind.extname();
        let hdu = match kind {
            ExtensionKind::ArrayGeometry => match &mut self.oi_array {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
            ExtensionKind::WavelengthGrid => match &mut self.oi_wavelength {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
            ExtensionKind::TransferMatrix => match &mut self.ni_catm {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
            ExtensionKind::FieldOfView => match &mut self.ni_fov {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
            ExtensionKind::KernelMatrix => match &mut self.ni_kmat {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
            ExtensionKind::ModulationSeries => match &mut self.ni_mod {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
            ExtensionKind::RawOutput => match &mut self.ni_iout {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
            ExtensionKind::KernelOutput => match &mut self.ni_kiout {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
            ExtensionKind::OutputCovariance => match &mut self.ni_kcov {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
            ExtensionKind::TargetList => match &mut self.oi_target {
                Some(x) => Some(x.ext.to_hdu(extname)?),
                None => None,
            },
        };
        Ok(hdu)
    }

    /// Regenerate the primary header: structural cards, carried-through
    /// user cards, then one manifest card per extension kind.
    fn primary_header(&self, statuses: &[(ExtensionKind, WriteStatus)]) -> Header {
        let mut cards = vec![
            Card::with_comment(
                "SIMPLE",
                Value::Logical(true),
                "conforms to FITS standard",
            ),
            Card::new("BITPIX", Value::Integer(8)),
            Card::new("NAXIS", Value::Integer(0)),
            Card::new("EXTEND", Value::Logical(true)),
        ];

        for card in self.header.cards() {
            let is_structural = matches!(
                card.keyword.as_str(),
                "SIMPLE" | "BITPIX" | "NAXIS" | "EXTEND"
            );
            let is_manifest = ExtensionKind::from_extname(&card.keyword).is_some();
            if !is_structural && !is_manifest {
                cards.push(card.clone());
            }
        }

        for (kind, status) in statuses {
            let text = match status {
                WriteStatus::Included => "Included",
                WriteStatus::NotIncluded => "Not included",
            };
            cards.push(Card::new(
                kind.extname(),
                Value::String(String::from(text)),
            ));
        }

        Header::from_cards(cards)
    }

    /// Encode the container into an HDU sequence.
    ///
    /// Every kind the selection covers and the container holds is written;
    /// all ten kinds are recorded in the primary-header manifest either
    /// way. Encoding resynchronizes each written extension's stored header
    /// with its payload.
    pub fn to_hdus(
        &mut self,
        selection: WriteSelection,
        options: &WriteOptions,
    ) -> Result<(Vec<Hdu>, WriteReport)> {
        if let Some(hash) = &options.static_hash {
            log::debug!("static configuration hash supplied: {hash}");
        }

        let mut extensions = Vec::new();
        let mut report = WriteReport::default();

        for kind in ExtensionKind::ALL {
            let status = if selection.includes(kind) {
                match self.encode_kind(kind)? {
                    Some(hdu) => {
                        extensions.push(hdu);
                        WriteStatus::Included
                    }
                    None => WriteStatus::NotIncluded,
                }
            } else {
                WriteStatus::NotIncluded
            };
            report.entries.push((kind, status));
        }

        let mut hdus = vec![Hdu {
            header: self.primary_header(&report.entries),
            payload: Payload::Empty,
        }];
        hdus.extend(extensions);
        Ok((hdus, report))
    }

    /// Serialize the container to FITS bytes.
    pub fn to_bytes(
        &mut self,
        selection: WriteSelection,
        options: &WriteOptions,
    ) -> Result<(Vec<u8>, WriteReport)> {
        let (hdus, report) = self.to_hdus(selection, options)?;
        Ok((hdulist::to_bytes(&hdus)?, report))
    }

    /// Serialize and write the container to a file.
    ///
    /// Refuses to replace an existing file unless `overwrite` is set.
    pub fn write<P: AsRef<Path>>(
        &mut self,
        path: P,
        selection: WriteSelection,
        options: &WriteOptions,
        overwrite: bool,
    ) -> Result<WriteReport> {
        let (hdus, report) = self.to_hdus(selection, options)?;
        hdulist::write(path, &hdus, overwrite)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Partition;
    use crate::header::Header;
    use crate::ni::output_table;
    use crate::oifits::Target;
    use crate::table::{Column, ColumnData, Table};
    use ndarray::{ArrayD, IxDyn};
    use num_complex::Complex64;

    fn sample_container() -> Nifits {
        let mut nifits = Nifits::default();

        let mut wl_table = Table::new();
        wl_table
            .push_column(Column::scalar(
                "EFF_WAVE",
                ColumnData::Float(vec![3.5e-6, 4.0e-6]),
            ))
            .unwrap();
        wl_table
            .push_column(Column::scalar(
                "EFF_BAND",
                ColumnData::Float(vec![1.0e-7, 1.0e-7]),
            ))
            .unwrap();
        nifits.oi_wavelength = Some(OiWavelength::new(TableExt::new(
            wl_table,
            Header::new(),
        )));

        let catm = ArrayD::from_shape_vec(
            IxDyn(&[2, 3, 2]),
            (0..12)
                .map(|i| Complex64::new(i as f64, 0.5 * i as f64))
                .collect(),
        )
        .unwrap();
        nifits.ni_catm = Some(NiCatm::new(CpxArrayExt::new(catm, Header::new())));

        let iout = ArrayD::from_shape_vec(
            IxDyn(&[4, 2, 3]),
            (0..24).map(f64::from).collect(),
        )
        .unwrap();
        nifits.ni_iout = Some(NiIout::new(TableExt::new(
            output_table(&iout).unwrap(),
            NiIout::default_header(),
        )));

        let mut targets = OiTarget::from_scratch();
        targets.add_target(Target::default()).unwrap();
        nifits.oi_target = Some(targets);

        nifits
    }

    #[test]
    fn selection_partitions() {
        assert!(WriteSelection::Full.includes(ExtensionKind::KernelMatrix));
        assert!(WriteSelection::StaticOnly.includes(ExtensionKind::TransferMatrix));
        assert!(!WriteSelection::StaticOnly.includes(ExtensionKind::KernelMatrix));
        assert!(WriteSelection::DynamicOnly.includes(ExtensionKind::RawOutput));
        assert!(!WriteSelection::DynamicOnly.includes(ExtensionKind::TargetList));
    }

    #[test]
    fn full_roundtrip_with_report() {
        let mut nifits = sample_container();
        let (bytes, wreport) = nifits
            .to_bytes(WriteSelection::Full, &WriteOptions::default())
            .unwrap();
        assert_eq!(wreport.included().len(), 4);

        let (back, lreport) = Nifits::from_bytes(&bytes).unwrap();
        assert_eq!(lreport.present().len(), 4);
        assert_eq!(lreport.missing().len(), 6);
        assert!(!lreport.is_complete());

        let wl = back.oi_wavelength.unwrap();
        assert_eq!(wl.lambs().unwrap(), vec![3.5e-6, 4.0e-6]);

        let catm = back.ni_catm.unwrap();
        assert_eq!(catm.matrix().shape(), &[2, 3, 2]);
        assert_eq!(catm.matrix()[[1, 2, 1]], Complex64::new(11.0, 5.5));

        let iout = back.ni_iout.unwrap();
        assert_eq!(iout.iout().unwrap().shape(), &[4, 2, 3]);
    }

    #[test]
    fn manifest_covers_all_kinds() {
        let mut nifits = sample_container();
        let (hdus, _) = nifits
            .to_hdus(WriteSelection::StaticOnly, &WriteOptions::default())
            .unwrap();

        let primary = &hdus[0].header;
        // Populated static kinds are marked Included.
        assert_eq!(primary.str_value("OI_WAVELENGTH"), Some("Included"));
        assert_eq!(primary.str_value("NI_CATM"), Some("Included"));
        assert_eq!(primary.str_value("OI_TARGET"), Some("Included"));
        // Everything else, populated or not, is marked Not included.
        assert_eq!(primary.str_value("NI_IOUT"), Some("Not included"));
        assert_eq!(primary.str_value("OI_ARRAY"), Some("Not included"));
        for kind in ExtensionKind::ALL {
            assert!(primary.str_value(kind.extname()).is_some());
        }
    }

    #[test]
    fn static_only_omits_dynamic_extensions() {
        let mut nifits = sample_container();
        let (hdus, report) = nifits
            .to_hdus(WriteSelection::StaticOnly, &WriteOptions::default())
            .unwrap();

        // Primary plus the three populated static kinds.
        assert_eq!(hdus.len(), 4);
        assert!(report
            .included()
            .iter()
            .all(|k| k.partition() == Partition::Static));
        assert_eq!(
            report.status(ExtensionKind::RawOutput),
            Some(WriteStatus::NotIncluded)
        );
    }

    #[test]
    fn dynamic_only_with_static_hash() {
        let mut nifits = sample_container();
        let options = WriteOptions {
            static_hash: Some(String::from("abc123")),
        };
        let (hdus, report) = nifits
            .to_hdus(WriteSelection::DynamicOnly, &options)
            .unwrap();

        assert_eq!(hdus.len(), 2);
        assert_eq!(report.included(), vec![ExtensionKind::RawOutput]);
    }

    #[test]
    fn primary_header_cards_carry_through() {
        let mut nifits = sample_container();
        nifits
            .header
            .set("INSTRUME", Value::String(String::from("NOTT")));

        let (bytes, _) = nifits
            .to_bytes(WriteSelection::Full, &WriteOptions::default())
            .unwrap();
        let (back, _) = Nifits::from_bytes(&bytes).unwrap();
        assert_eq!(back.header.str_value("INSTRUME"), Some("NOTT"));
        assert_eq!(back.header.logical_value("SIMPLE"), Some(true));
    }

    #[test]
    fn resave_does_not_duplicate_manifest() {
        let mut nifits = sample_container();
        let (bytes, _) = nifits
            .to_bytes(WriteSelection::Full, &WriteOptions::default())
            .unwrap();
        let (mut back, _) = Nifits::from_bytes(&bytes).unwrap();
        let (bytes2, _) = back
            .to_bytes(WriteSelection::Full, &WriteOptions::default())
            .unwrap();

        let (again, _) = Nifits::from_bytes(&bytes2).unwrap();
        let manifest_cards = again
            .header
            .cards()
            .iter()
            .filter(|c| c.keyword == "OI_WAVELENGTH")
            .count();
        assert_eq!(manifest_cards, 1);
        // The second save is byte-identical to the first.
        assert_eq!(bytes, bytes2);
    }

    #[test]
    fn corrupt_extension_is_reported_and_load_continues() {
        let mut nifits = sample_container();
        let (mut hdus, _) = nifits
            .to_hdus(WriteSelection::Full, &WriteOptions::default())
            .unwrap();

        // Break the complex-array contract: NI_CATM with a bad leading axis.
        let catm_pos = hdus
            .iter()
            .position(|h| h.extname() == Some("NI_CATM"))
            .unwrap();
        let bad = ArrayD::from_shape_vec(IxDyn(&[3, 2]), (0..6).map(f64::from).collect())
            .unwrap();
        let mut header = hdus[catm_pos].header.clone();
        header.set("NAXIS", Value::Integer(2));
        header.set("NAXIS1", Value::Integer(2));
        header.set("NAXIS2", Value::Integer(3));
        header.remove("NAXIS3");
        hdus[catm_pos] = Hdu {
            header,
            payload: Payload::Array(bad),
        };

        let (back, report) = Nifits::from_hdus(&hdus).unwrap();
        assert!(back.ni_catm.is_none());
        assert!(matches!(
            report.status(ExtensionKind::TransferMatrix),
            Some(KindStatus::Failed(Error::Structural(_)))
        ));
        // The other kinds still decode.
        assert!(back.oi_wavelength.is_some());
        assert!(back.ni_iout.is_some());
    }

    #[test]
    fn file_roundtrip_with_overwrite_guard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.nifits");

        let mut nifits = sample_container();
        nifits
            .write(&path, WriteSelection::Full, &WriteOptions::default(), false)
            .unwrap();
        assert!(nifits
            .write(&path, WriteSelection::Full, &WriteOptions::default(), false)
            .is_err());
        nifits
            .write(&path, WriteSelection::Full, &WriteOptions::default(), true)
            .unwrap();

        let (back, report) = Nifits::open(&path).unwrap();
        assert_eq!(report.present().len(), 4);
        assert!(back.oi_target.is_some());
    }
}
