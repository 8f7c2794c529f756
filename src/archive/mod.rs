pub mod zip;

pub use zip::ZipStreamWriter;
