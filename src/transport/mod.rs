/// Filesystem walking and extension matching.
pub mod fs;
