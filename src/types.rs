//! Core identifier types shared by the catalog, identity, and state layers.

/// CourseId: remote identifier of an enrolled course, stable across runs
pub type CourseId = u64;

/// ModuleId: remote identifier of a course module, stable across runs
pub type ModuleId = u64;
