//! Cross-crate integration tests: scenarios from `spec.md` §8 that exercise
//! more than one of the `twinstore-*` crates together. Per-crate unit tests
//! live alongside their implementation; this crate is for the seams between
//! them, mirroring the teacher's own top-level `tests` package.

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod dual_rendering_test;
#[cfg(test)]
mod cache_concurrency_test;
#[cfg(test)]
mod batch_cap_test;
