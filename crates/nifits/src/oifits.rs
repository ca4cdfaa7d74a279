//! OIFITS-heritage extensions: array geometry, wavelength grid and target
//! list.

use crate::error::{Error, Result};
use crate::extension::TableExt;
use crate::station::OiStation;
use crate::table::{CellValue, Column, ColumnData, Table};

/// Speed of light in vacuum, m/s.
pub const C_M_S: f64 = 299_792_458.0;

/// OI_ARRAY: collector geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct OiArray {
    pub ext: TableExt,
}

impl OiArray {
    pub fn new(ext: TableExt) -> Self {
        OiArray { ext }
    }

    /// Table revision, defaulting to 1 when the OI_REVN card is absent.
    pub fn revision(&self) -> i64 {
        self.ext.header.int_value("OI_REVN").unwrap_or(1)
    }

    /// Number of collectors.
    pub fn n_stations(&self) -> usize {
        self.ext.table.nrows()
    }

    /// Decode the rows into typed station descriptions.
    pub fn stations(&self) -> Result<Vec<OiStation>> {
        let table = &self.ext.table;
        let revision = self.revision();
        let tel_names = table.text_column("TEL_NAME")?;
        let sta_names = table.text_column("STA_NAME")?;
        let diameters = table.f64_column("DIAMETER")?;
        let staxyz = table.array_column_f64("STAXYZ")?;
        if staxyz.ndim() != 2 || staxyz.shape()[1] != 3 {
            return Err(Error::Structural(format!(
                "STAXYZ cells must hold 3 coordinates, found shape {:?}",
                staxyz.shape()
            )));
        }

        let fovs = if revision >= 2 {
            table.f64_column("FOV").ok()
        } else {
            None
        };
        let fovtypes = if revision >= 2 {
            table.text_column("FOVTYPE").ok()
        } else {
            None
        };

        let mut stations = Vec::with_capacity(table.nrows());
        for i in 0..table.nrows() {
            stations.push(OiStation::new(
                revision,
                tel_names[i].clone(),
                sta_names[i].clone(),
                diameters[i],
                [staxyz[[i, 0]], staxyz[[i, 1]], staxyz[[i, 2]]],
                fovs.as_ref().map(|v| v[i]),
                fovtypes.as_ref().map(|v| v[i].clone()),
            ));
        }
        Ok(stations)
    }
}

/// OI_WAVELENGTH: the spectral channel grid shared by every chromatic
/// payload in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct OiWavelength {
    pub ext: TableExt,
}

impl OiWavelength {
    pub fn new(ext: TableExt) -> Self {
        OiWavelength { ext }
    }

    /// Number of spectral channels.
    pub fn n_channels(&self) -> usize {
        self.ext.table.nrows()
    }

    /// Effective channel wavelengths, m.
    pub fn lambs(&self) -> Result<Vec<f64>> {
        self.ext.table.f64_column("EFF_WAVE")
    }

    /// Effective channel bandwidths, m.
    pub fn dlambs(&self) -> Result<Vec<f64>> {
        self.ext.table.f64_column("EFF_BAND")
    }

    /// Channel center frequencies, Hz.
    pub fn nus(&self) -> Result<Vec<f64>> {
        Ok(self.lambs()?.iter().map(|&l| C_M_S / l).collect())
    }

    /// Channel bandwidths in frequency space, Hz.
    pub fn dnus(&self) -> Result<Vec<f64>> {
        let lambs = self.lambs()?;
        let dlambs = self.dlambs()?;
        Ok(lambs
            .iter()
            .zip(dlambs.iter())
            .map(|(&l, &dl)| C_M_S * dl / (l * l))
            .collect())
    }
}

/// One catalogue entry for [`OiTarget::add_target`].
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub target_id: i64,
    pub target: String,
    pub raep0: f64,
    pub decep0: f64,
    pub equinox: f64,
    pub ra_err: f64,
    pub dec_err: f64,
    pub sysvel: f64,
    pub veltyp: String,
    pub veldef: String,
    pub pmra: f64,
    pub pmdec: f64,
    pub pmra_err: f64,
    pub pmdec_err: f64,
    pub parallax: f64,
    pub para_err: f64,
    pub spectyp: String,
    pub category: String,
}

impl Default for Target {
    fn default() -> Self {
        Target {
            target_id: 0,
            target: String::from("MyTarget"),
            raep0: 0.0,
            decep0: 0.0,
            equinox: 0.0,
            ra_err: 0.0,
            dec_err: 0.0,
            sysvel: 0.0,
            veltyp: String::new(),
            veldef: String::new(),
            pmra: 0.0,
            pmdec: 0.0,
            pmra_err: 0.0,
            pmdec_err: 0.0,
            parallax: 0.0,
            para_err: 0.0,
            spectyp: String::new(),
            category: String::new(),
        }
    }
}

/// OI_TARGET: the observed target catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct OiTarget {
    pub ext: TableExt,
}

/// Names of the text-valued target columns, with their default widths.
const TARGET_TEXT_COLUMNS: [(&str, usize); 5] = [
    ("TARGET", 16),
    ("VELTYP", 8),
    ("VELDEF", 8),
    ("SPECTYP", 16),
    ("CATEGORY", 3),
];

/// Names of the float-valued target columns, in schema order after TARGET.
const TARGET_FLOAT_COLUMNS: [&str; 12] = [
    "RAEP0", "DECEP0", "EQUINOX", "RA_ERR", "DEC_ERR", "SYSVEL", "PMRA", "PMDEC", "PMRA_ERR",
    "PMDEC_ERR", "PARALLAX", "PARA_ERR",
];

impl OiTarget {
    pub fn new(ext: TableExt) -> Self {
        OiTarget { ext }
    }

    /// Build an empty catalogue with the full 18-column schema.
    pub fn from_scratch() -> Self {
        let mut table = Table::new();
        let text_width = |name: &str| {
            TARGET_TEXT_COLUMNS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, w)| *w)
                .unwrap_or(16)
        };

        // Schema order follows the OIFITS standard.
        let names = [
            "TARGET_ID", "TARGET", "RAEP0", "DECEP0", "EQUINOX", "RA_ERR", "DEC_ERR",
            "SYSVEL", "VELTYP", "VELDEF", "PMRA", "PMDEC", "PMRA_ERR", "PMDEC_ERR",
            "PARALLAX", "PARA_ERR", "SPECTYP", "CATEGORY",
        ];
        for name in names {
            let data = if name == "TARGET_ID" {
                ColumnData::Int(Vec::new())
            } else if TARGET_FLOAT_COLUMNS.contains(&name) {
                ColumnData::Float(Vec::new())
            } else {
                ColumnData::Text {
                    width: text_width(name),
                    values: Vec::new(),
                }
            };
            // Columns agree on the (zero) row count by construction.
            let _ = table.push_column(Column::scalar(name, data));
        }

        OiTarget {
            ext: TableExt::new(table, crate::header::Header::new()),
        }
    }

    pub fn n_targets(&self) -> usize {
        self.ext.table.nrows()
    }

    pub fn target_ids(&self) -> Result<Vec<i64>> {
        self.ext.table.i64_column("TARGET_ID")
    }

    pub fn target_names(&self) -> Result<Vec<String>> {
        self.ext.table.text_column("TARGET")
    }

    /// Append a catalogue row. Duplicate TARGET_ID values are accepted.
    pub fn add_target(&mut self, target: Target) -> Result<()> {
        self.ext.table.add_row(vec![
            CellValue::Int(target.target_id),
            CellValue::Text(target.target),
            CellValue::Float(target.raep0),
            CellValue::Float(target.decep0),
            CellValue::Float(target.equinox),
            CellValue::Float(target.ra_err),
            CellValue::Float(target.dec_err),
            CellValue::Float(target.sysvel),
            CellValue::Text(target.veltyp),
            CellValue::Text(target.veldef),
            CellValue::Float(target.pmra),
            CellValue::Float(target.pmdec),
            CellValue::Float(target.pmra_err),
            CellValue::Float(target.pmdec_err),
            CellValue::Float(target.parallax),
            CellValue::Float(target.para_err),
            CellValue::Text(target.spectyp),
            CellValue::Text(target.category),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use crate::value::Value;

    fn wavelength_ext() -> OiWavelength {
        let mut table = Table::new();
        table
            .push_column(Column::scalar(
                "EFF_WAVE",
                ColumnData::Float(vec![3.0e-6, 4.0e-6]),
            ))
            .unwrap();
        table
            .push_column(Column::scalar(
                "EFF_BAND",
                ColumnData::Float(vec![1.0e-7, 1.0e-7]),
            ))
            .unwrap();
        OiWavelength::new(TableExt::new(table, Header::new()))
    }

    #[test]
    fn wavelength_accessors() {
        let wl = wavelength_ext();
        assert_eq!(wl.n_channels(), 2);
        assert_eq!(wl.lambs().unwrap(), vec![3.0e-6, 4.0e-6]);

        let nus = wl.nus().unwrap();
        assert!((nus[0] - C_M_S / 3.0e-6).abs() < 1.0);

        let dnus = wl.dnus().unwrap();
        assert!((dnus[1] - C_M_S * 1.0e-7 / 16.0e-12).abs() < 1.0);
    }

    #[test]
    fn wavelength_missing_column() {
        let mut table = Table::new();
        table
            .push_column(Column::scalar("EFF_WAVE", ColumnData::Float(vec![1.0e-6])))
            .unwrap();
        let wl = OiWavelength::new(TableExt::new(table, Header::new()));
        assert!(matches!(wl.dlambs(), Err(Error::MissingColumn(_))));
    }

    fn array_ext(revision: i64, with_fov: bool) -> OiArray {
        let mut table = Table::new();
        table
            .push_column(Column::scalar(
                "TEL_NAME",
                ColumnData::Text {
                    width: 16,
                    values: vec!["UT1".into(), "UT2".into()],
                },
            ))
            .unwrap();
        table
            .push_column(Column::scalar(
                "STA_NAME",
                ColumnData::Text {
                    width: 16,
                    values: vec!["U1".into(), "U2".into()],
                },
            ))
            .unwrap();
        table
            .push_column(Column::scalar(
                "DIAMETER",
                ColumnData::Float(vec![8.2, 8.2]),
            ))
            .unwrap();
        table
            .push_column(Column::array(
                "STAXYZ",
                vec![3],
                ColumnData::Float(vec![0.0, 0.0, 0.0, 10.0, 20.0, 0.0]),
            ))
            .unwrap();
        if with_fov {
            table
                .push_column(Column::scalar("FOV", ColumnData::Float(vec![1.5, 1.5])))
                .unwrap();
            table
                .push_column(Column::scalar(
                    "FOVTYPE",
                    ColumnData::Text {
                        width: 8,
                        values: vec!["RADIUS".into(), "RADIUS".into()],
                    },
                ))
                .unwrap();
        }
        let mut header = Header::new();
        header.set("OI_REVN", Value::Integer(revision));
        OiArray::new(TableExt::new(table, header))
    }

    #[test]
    fn stations_revision_2_with_fov() {
        let arr = array_ext(2, true);
        let stations = arr.stations().unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].sta_name, "U2");
        assert_eq!(stations[1].staxyz, [10.0, 20.0, 0.0]);
        assert_eq!(stations[0].fov, Some(1.5));
        assert_eq!(stations[0].fovtype.as_deref(), Some("RADIUS"));
    }

    #[test]
    fn stations_revision_1_ignores_fov_columns() {
        let arr = array_ext(1, true);
        let stations = arr.stations().unwrap();
        assert!(stations[0].fov.is_none());
        assert!(stations[0].fovtype.is_none());
    }

    #[test]
    fn stations_missing_column() {
        let mut table = Table::new();
        table
            .push_column(Column::scalar(
                "TEL_NAME",
                ColumnData::Text {
                    width: 16,
                    values: vec!["UT1".into()],
                },
            ))
            .unwrap();
        let arr = OiArray::new(TableExt::new(table, Header::new()));
        assert!(matches!(arr.stations(), Err(Error::MissingColumn(_))));
    }

    #[test]
    fn target_from_scratch_and_add() {
        let mut targets = OiTarget::from_scratch();
        assert_eq!(targets.ext.table.ncols(), 18);
        assert_eq!(targets.n_targets(), 0);

        targets.add_target(Target::default()).unwrap();
        targets
            .add_target(Target {
                target_id: 1,
                target: "GJ 86".into(),
                raep0: 32.6,
                decep0: -50.8,
                ..Target::default()
            })
            .unwrap();

        assert_eq!(targets.n_targets(), 2);
        assert_eq!(targets.target_ids().unwrap(), vec![0, 1]);
        assert_eq!(
            targets.target_names().unwrap(),
            vec!["MyTarget", "GJ 86"]
        );
    }

    #[test]
    fn duplicate_target_ids_are_accepted() {
        let mut targets = OiTarget::from_scratch();
        targets.add_target(Target::default()).unwrap();
        targets.add_target(Target::default()).unwrap();
        assert_eq!(targets.target_ids().unwrap(), vec![0, 0]);
    }
}
