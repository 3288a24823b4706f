use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The pixmap could not be allocated at the requested size.
    #[error("cannot allocate a {width}x{height} raster surface")]
    InvalidViewport { width: u32, height: u32 },

    #[error("failed to launch {program}: {source}")]
    FfmpegSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind control listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_viewport_display() {
        let err = Error::InvalidViewport {
            width: 0,
            height: 10,
        };
        assert_eq!(err.to_string(), "cannot allocate a 0x10 raster surface");
    }

    #[test]
    fn test_spawn_error_names_program() {
        let err = Error::FfmpegSpawn {
            program: PathBuf::from("/opt/ffmpeg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/opt/ffmpeg"));
    }
}
