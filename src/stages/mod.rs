pub mod agat;
pub mod busco;
pub mod lai;
pub mod rnaseq;

use std::fs;

use camino::Utf8Path;

use crate::error::GaqetError;

pub(crate) fn read_report(path: &Utf8Path) -> Result<String, GaqetError> {
    fs::read_to_string(path.as_std_path()).map_err(|err| GaqetError::ReportRead {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    })
}
