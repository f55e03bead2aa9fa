pub mod device_directory;

pub use device_directory::{DeviceDirectory, DirectoryError};
