// Checksums used for block matching.
//
// This module provides:
// - The weak rolling checksum (full computation and O(1) slide)
// - The strong 128-bit block hash
// - A weak-checksum index preserving catalog order

pub mod rolling;
pub mod strong;
pub mod table;
