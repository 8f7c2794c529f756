pub mod directory;
pub mod resource;

pub use directory::DirectoryService;
pub use resource::{Download, DownloadHeaders, ResourceService, UploadFile};
