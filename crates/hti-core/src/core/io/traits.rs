use crate::core::models::system::SystemData;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing atomic configuration formats.
///
/// Implementors handle the format-specific parsing and serialization; the path
/// helpers are shared.
pub trait ConfigurationFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a configuration from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<SystemData, Self::Error>;

    /// Writes a configuration to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(system: &SystemData, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<SystemData, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a configuration to a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(system: &SystemData, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(system, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
