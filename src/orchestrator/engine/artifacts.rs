use std::path::{Path, PathBuf};

use tracing::debug;

use crate::orchestrator::constants::{ENGINE_LIBRARY_CANDIDATES, WRAPPER_LIBRARY};
use crate::orchestrator::error::DriverError;

/// The two binaries a native session needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineArtifacts {
    pub engine_library: PathBuf,
    pub wrapper_library: PathBuf,
}

/// Finds the engine library (first existing candidate wins) and the wrapper.
pub fn locate_artifacts(base: &Path) -> Result<EngineArtifacts, DriverError> {
    let engine_library = ENGINE_LIBRARY_CANDIDATES
        .iter()
        .map(|candidate| base.join(candidate))
        .find(|path| path.is_file())
        .ok_or_else(|| DriverError::EngineLibraryMissing {
            searched: base.to_path_buf(),
        })?;

    let wrapper_library = base.join(WRAPPER_LIBRARY);
    if !wrapper_library.is_file() {
        return Err(DriverError::WrapperLibraryMissing {
            path: wrapper_library,
        });
    }

    debug!(
        target: "speech_driver",
        engine = %engine_library.display(),
        wrapper = %wrapper_library.display(),
        "located engine artifacts"
    );
    Ok(EngineArtifacts {
        engine_library,
        wrapper_library,
    })
}

pub fn artifacts_available(base: &Path) -> bool {
    locate_artifacts(base).is_ok()
}
