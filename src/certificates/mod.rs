mod storage;

pub use storage::{CertificateStorage, CertificateStorageError, ReplacedBlob, stored_filename};
