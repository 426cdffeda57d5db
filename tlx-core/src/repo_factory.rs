use std::path::PathBuf;

use crate::repo::BundleRepo;
use crate::repo_fs::FsBundleRepo;

pub enum Backend {
    Fs,
}

pub fn open_repo(backend: Backend, root: PathBuf) -> Box<dyn BundleRepo> {
    match backend {
        Backend::Fs => Box::new(FsBundleRepo::new(root)),
    }
}
