//! Collector station description.

use std::fmt;

/// One collector (telescope) of the array, as described by an OI_ARRAY row.
///
/// The FOV columns were introduced in table revision 2; for earlier
/// revisions they are always absent.
#[derive(Debug, Clone, PartialEq)]
pub struct OiStation {
    pub revision: i64,
    pub tel_name: String,
    pub sta_name: String,
    pub diameter: f64,
    pub staxyz: [f64; 3],
    pub fov: Option<f64>,
    pub fovtype: Option<String>,
}

impl OiStation {
    /// Build a station, normalizing the FOV fields against the revision.
    ///
    /// Revisions below 2 do not define FOV columns, so any supplied values
    /// are discarded. Revisions above 2 are accepted with a warning.
    pub fn new(
        revision: i64,
        tel_name: String,
        sta_name: String,
        diameter: f64,
        staxyz: [f64; 3],
        fov: Option<f64>,
        fovtype: Option<String>,
    ) -> Self {
        if revision > 2 {
            log::warn!("OI_ARRAY revision {revision} is newer than revision 2");
        }
        let (fov, fovtype) = if revision < 2 { (None, None) } else { (fov, fovtype) };
        OiStation {
            revision,
            tel_name,
            sta_name,
            diameter,
            staxyz,
            fov,
            fovtype,
        }
    }
}

impl fmt::Display for OiStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "station {} ({}), diameter {} m at [{}, {}, {}]",
            self.sta_name,
            self.tel_name,
            self.diameter,
            self.staxyz[0],
            self.staxyz[1],
            self.staxyz[2],
        )
    }
}
