pub mod ids;
pub mod error;
pub mod validation;
pub mod size;
pub mod fs;
pub mod disk;

#[cfg(test)]
pub(crate) fn string_to_len(length: usize) -> String {
    "a".repeat(length)
}
