pub mod atomic;

pub use atomic::{fsync_parent_dir, is_tmp_artifact, write_atomic};
