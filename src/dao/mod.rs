/// Remote archive abstraction and its backends.
pub mod archive;
/// Backend-neutral storage errors.
pub mod storage;
