mod file_service;

pub use file_service::{
    BatchDeleteOutcome, FileService, PresignedUrl, StorageState, SweepReport,
    UploadRequest,
};
